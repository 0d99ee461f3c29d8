//! MIDI input backends for `midihub`.
//!
//! Implementations of [`MidiBackend`](crate::backend::MidiBackend) for the
//! platforms and test rigs midihub can read from.
//!
//! - [`winmm`] — the Windows multimedia MIDI-in API (`midiIn*`), Windows only.
//! - [`virtual_input`] — an in-process scriptable backend for tests, demos,
//!   and platforms without a native backend.
//!
//! Most users should not interact with these modules directly. Prefer the
//! high-level [`MidiDeviceManager`](crate::manager::MidiDeviceManager) API:
//! `discover()` on Windows, or `with_backend()` to supply a backend
//! explicitly.

pub mod virtual_input;

#[cfg(windows)]
#[cfg_attr(docsrs, doc(cfg(windows)))]
pub mod winmm;
