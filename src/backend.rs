//! Backend seam between the manager and a platform MIDI-in subsystem.
//!
//! A [`MidiBackend`] owns device enumeration and the open/start/close
//! lifecycle, and delivers asynchronous [`Notification`]s through a sink
//! closure registered at open time. The sink is invoked on a thread the
//! backend owns, so implementations and callers alike must treat it as
//! cross-thread: midihub's manager only pushes into locked shared state from
//! it and returns.
//!
//! Implementations:
//! - [`backends::winmm`](crate::backends::winmm) — the Windows multimedia
//!   MIDI-in API (Windows only).
//! - [`backends::virtual_input`](crate::backends::virtual_input) — an
//!   in-process scriptable backend for tests and demos.

use std::fmt;
use std::sync::Arc;

/// Opaque identifier for one open device session, owned by the backend.
///
/// The wrapped value is a platform word (a `HMIDIIN` on Windows, a slot
/// number for the virtual backend); nothing outside the owning backend may
/// interpret it. Stable for the lifetime of the session and usable as a map
/// key.
///
/// The default value is the null handle, which never names an open session.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DeviceHandle(pub(crate) usize);

impl fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceHandle({:#x})", self.0)
    }
}

/// Asynchronous notification from the backend about one open device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notification {
    /// A short MIDI event arrived, packed into a 32-bit word
    /// (status byte lowest).
    Data(u32),
    /// The device disconnected (or its session is being torn down).
    Closed,
}

/// Sink for backend notifications.
///
/// Registered per device at [`MidiBackend::open`]; invoked on an arbitrary
/// backend-owned thread, potentially concurrently for different devices.
/// Implementations must return promptly and must not call back into the
/// backend's lifecycle methods.
pub type NotificationSink = Arc<dyn Fn(DeviceHandle, Notification) + Send + Sync>;

/// Failure reported by a backend operation.
///
/// The manager treats every variant as non-fatal: open/start failures skip
/// the device, name failures fall back to a placeholder string.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The platform refused to open the device at this enumeration ordinal.
    #[error("failed to open MIDI input {ordinal} (status {code})")]
    Open { ordinal: u32, code: u32 },

    /// The device opened but could not be started.
    #[error("failed to start MIDI input {handle:?} (status {code})")]
    Start { handle: DeviceHandle, code: u32 },

    /// The platform reported an error closing the device.
    #[error("failed to close MIDI input {handle:?} (status {code})")]
    Close { handle: DeviceHandle, code: u32 },

    /// The capability/name query failed (stale handle, platform error).
    #[error("failed to query device name for {handle:?} (status {code})")]
    Name { handle: DeviceHandle, code: u32 },

    /// The ordinal does not name a currently enumerable device.
    #[error("no MIDI input at ordinal {ordinal}")]
    NoSuchDevice { ordinal: u32 },
}

/// A platform MIDI-in subsystem.
///
/// Mirrors the fixed contract of the OS layer: enumeration count, lifecycle
/// per device, a name query, and sink registration. All methods take `&self`;
/// implementations handle their own interior locking and must be callable
/// from the manager's thread while notifications are in flight.
pub trait MidiBackend: Send + Sync {
    /// Number of currently enumerable input devices.
    fn device_count(&self) -> u32;

    /// Open the device at `ordinal` and register `sink` for its
    /// notifications. The device delivers nothing until [`start`] succeeds.
    ///
    /// [`start`]: Self::start
    fn open(&self, ordinal: u32, sink: NotificationSink) -> Result<DeviceHandle, BackendError>;

    /// Begin input on an opened device. After this returns `Ok`, the sink may
    /// be invoked at any time on a backend-owned thread.
    fn start(&self, handle: DeviceHandle) -> Result<(), BackendError>;

    /// Close an open device and release its session. The sink may still
    /// receive a final [`Notification::Closed`] during this call.
    fn close(&self, handle: DeviceHandle) -> Result<(), BackendError>;

    /// Human-readable display name for an open device.
    fn device_name(&self, handle: DeviceHandle) -> Result<String, BackendError>;
}

/// Backend-agnostic helper: resolve a name, degrading to `"Unknown Device"`
/// when the query fails. The manager's name lookups all funnel through this
/// so callers always get a usable string.
pub(crate) fn name_or_unknown(backend: &dyn MidiBackend, handle: DeviceHandle) -> String {
    match backend.device_name(handle) {
        Ok(name) => name,
        Err(err) => {
            log::debug!("device name query failed: {err}");
            "Unknown Device".to_string()
        }
    }
}
