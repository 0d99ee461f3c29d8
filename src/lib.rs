//! midihub — small MIDI input device manager for Rust.
//!
//! Opens every available MIDI input device, keeps the set current as devices
//! come and go, and funnels every captured message into one pollable FIFO
//! queue. The platform delivers notifications on threads it owns; midihub
//! hides that behind a non-blocking poll on the caller's thread.
//!
//! ```no_run
//! use midihub::MidiDeviceManager;
//!
//! # #[cfg(windows)] {
//! let manager = MidiDeviceManager::discover();
//! manager.open_all_devices();
//! loop {
//!     let msg = manager.poll_next_message();
//!     if !msg.is_empty() {
//!         println!("{msg}");
//!     }
//! }
//! # }
//! ```

pub mod backend;
pub mod backends;
pub mod manager;
pub mod message;
pub mod metadata;
mod registry;

pub use backend::*;
pub use manager::*;
pub use message::*;
pub use metadata::*;
