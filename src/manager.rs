//! Device lifecycle and message consumption.
//!
//! [`MidiDeviceManager`] is the crate's hub. It owns a [`MidiBackend`], keeps
//! the registry of open devices, and exposes the pollable message queue the
//! backend's notification sink feeds from its own thread.
//!
//! # Threading
//! Two roles touch the shared state:
//! - the **sink**, invoked by the backend on a thread it owns, pushes
//!   messages and disconnect reports;
//! - the **caller's thread**, which performs every open, close, and
//!   reconciliation pass.
//!
//! A single non-reentrant mutex serializes the two. The manager never holds
//! that lock across a backend call, so a backend that delivers its final
//! close notification synchronously from inside `close()` (winmm does) can
//! re-acquire it without deadlocking.
//!
//! # Polling
//! [`poll_next_message`](MidiDeviceManager::poll_next_message) reconciles
//! disconnects and re-scans for new devices before popping, so a caller
//! sitting in a poll loop gets hotplug handling for free. Nothing blocks: an
//! empty queue yields the empty sentinel message.

use std::collections::VecDeque;
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::Mutex;

use crate::backend::{
    name_or_unknown, BackendError, DeviceHandle, MidiBackend, Notification, NotificationSink,
};
use crate::message::{DeviceId, MidiMessage};
use crate::metadata::DeviceInfo;
use crate::registry::DeviceRegistry;

/// State shared between the notification sink and the manager's methods.
#[derive(Default)]
struct Shared {
    /// FIFO of captured messages, in arrival order across all devices.
    queue: VecDeque<MidiMessage>,
    /// Disconnects reported by the sink, awaiting reconciliation. A handle
    /// appears at most once between two reconciliation passes.
    pending_close: Vec<DeviceHandle>,
    registry: DeviceRegistry,
}

/// Manages a changing set of MIDI input devices and queues their messages.
///
/// All methods take `&self`; the manager is `Send + Sync` and cheap to share,
/// though opens, closes, and polling are expected to happen from one thread.
pub struct MidiDeviceManager {
    backend: Arc<dyn MidiBackend>,
    shared: Arc<Mutex<Shared>>,
    sink: NotificationSink,
}

impl MidiDeviceManager {
    /// Build a manager over an explicit backend. No devices are opened yet;
    /// call [`open_all_devices`](Self::open_all_devices) or let the first
    /// poll do it.
    pub fn with_backend(backend: Arc<dyn MidiBackend>) -> Self {
        let shared = Arc::new(Mutex::new(Shared::default()));
        let sink = Self::make_sink(&shared);
        Self {
            backend,
            shared,
            sink,
        }
    }

    /// Manager over the platform's native MIDI-in subsystem.
    #[cfg(windows)]
    pub fn discover() -> Self {
        Self::with_backend(Arc::new(crate::backends::winmm::WinMmBackend::new()))
    }

    /// The notification sink registered with the backend for every device.
    ///
    /// Runs on a backend-owned thread: it takes the shared lock briefly,
    /// records what arrived, and returns. It never calls back into the
    /// backend and never mutates the registry — closing is deferred to
    /// reconciliation on the caller's thread, so the backend cannot reuse a
    /// handle while a callback for it is still in flight.
    fn make_sink(shared: &Arc<Mutex<Shared>>) -> NotificationSink {
        let shared = Arc::clone(shared);
        Arc::new(move |handle, notification| {
            let mut s = shared.lock();
            match notification {
                Notification::Data(raw) => {
                    // A payload racing with a close has no id to be labeled
                    // with; drop it.
                    if let Some(id) = s.registry.id_of(handle) {
                        s.queue.push_back(MidiMessage::new(id, raw));
                    }
                }
                Notification::Closed => {
                    if s.registry.contains(handle) && !s.pending_close.contains(&handle) {
                        s.pending_close.push(handle);
                    }
                }
            }
        })
    }

    /// Open and start the device at enumeration ordinal `ordinal`.
    ///
    /// On success the device is registered and its notifications begin
    /// flowing immediately. A start failure rolls the open back: the device
    /// is unregistered and closed, leaving no partial state.
    pub fn open_device(&self, ordinal: u32) -> Result<DeviceId, BackendError> {
        let handle = self.backend.open(ordinal, Arc::clone(&self.sink))?;
        // Register before start: data may arrive the instant start succeeds,
        // and the sink needs the id mapping to label it.
        let id = self.shared.lock().registry.insert(handle, ordinal);
        if let Err(err) = self.backend.start(handle) {
            self.shared.lock().registry.remove(handle);
            if let Err(close_err) = self.backend.close(handle) {
                warn!("rollback close failed: {close_err}");
            }
            return Err(err);
        }
        debug!("opened MIDI input {ordinal} as device {id}");
        Ok(id)
    }

    /// Close a device and drop it from the registry.
    ///
    /// The handle is unregistered *before* the backend close, so a final
    /// close notification delivered synchronously from inside `close()` is
    /// ignored by the sink rather than re-queued — each handle is closed at
    /// most once. Unknown handles leave the registry untouched.
    pub fn close_device(&self, handle: DeviceHandle) {
        let removed = self.shared.lock().registry.remove(handle);
        if let Err(err) = self.backend.close(handle) {
            warn!("close failed: {err}");
        }
        if let Some(id) = removed {
            debug!("closed device {id}");
        }
    }

    /// Open every enumerable device not already open. Best-effort: a device
    /// that fails to open is skipped and will be retried on the next pass.
    pub fn open_all_devices(&self) {
        let count = self.backend.device_count();
        for ordinal in 0..count {
            if self.shared.lock().registry.is_ordinal_open(ordinal) {
                continue;
            }
            if let Err(err) = self.open_device(ordinal) {
                debug!("skipping MIDI input {ordinal}: {err}");
            }
        }
    }

    /// Reconcile: close every device reported disconnected since the last
    /// pass, then pick up any newly available devices.
    ///
    /// Always runs on the calling thread — this is the only place handles
    /// are released in normal operation.
    pub fn refresh_devices(&self) {
        let pending = std::mem::take(&mut self.shared.lock().pending_close);
        for handle in pending {
            debug!("reconciling disconnect of {handle:?}");
            self.close_device(handle);
        }
        self.open_all_devices();
    }

    /// Close every open device, oldest first. Racing notifications for the
    /// devices being torn down may be dropped.
    pub fn close_all_devices(&self) {
        loop {
            // Bind outside the loop condition so the lock is not held across
            // the backend close below.
            let front = self.shared.lock().registry.front();
            let Some(handle) = front else { break };
            self.close_device(handle);
        }
    }

    /// Number of currently open devices.
    pub fn active_device_count(&self) -> usize {
        self.shared.lock().registry.len()
    }

    /// Whether at least one captured message is waiting to be polled.
    pub fn has_pending_messages(&self) -> bool {
        !self.shared.lock().queue.is_empty()
    }

    /// Reconcile devices, then pop the oldest captured message.
    ///
    /// Never blocks: when the queue is empty this returns the sentinel
    /// [`MidiMessage::default`] (`encode() == 0`). Callers drive this in a
    /// loop at whatever cadence they choose.
    pub fn poll_next_message(&self) -> MidiMessage {
        self.refresh_devices();
        self.shared.lock().queue.pop_front().unwrap_or_default()
    }

    /// Discard every queued message without processing it. Safe to call at
    /// any time, including on an already-empty queue.
    pub fn clear_pending_messages(&self) {
        self.shared.lock().queue.clear();
    }

    /// Id of the device at `position` in order of opening, or `None` when
    /// fewer devices are open.
    pub fn device_id_at(&self, position: usize) -> Option<DeviceId> {
        self.shared.lock().registry.id_at(position)
    }

    /// Display name of the device at `position` in order of opening.
    /// Falls back to `"Unknown Device"` for out-of-range positions or a
    /// failed platform query; never errors.
    pub fn device_name(&self, position: usize) -> String {
        let handle = self.shared.lock().registry.handle_at(position);
        match handle {
            Some(handle) => name_or_unknown(&*self.backend, handle),
            None => "Unknown Device".to_string(),
        }
    }

    /// Display name for a specific handle, with the same fallback behavior
    /// as [`device_name`](Self::device_name).
    pub fn device_name_for(&self, handle: DeviceHandle) -> String {
        name_or_unknown(&*self.backend, handle)
    }

    /// Snapshot of every open device, in order of opening.
    pub fn devices(&self) -> Vec<DeviceInfo> {
        // Collect under the lock, resolve names outside it.
        let entries: Vec<_> = self.shared.lock().registry.iter().collect();
        entries
            .into_iter()
            .map(|(id, handle, ordinal)| DeviceInfo {
                id,
                ordinal,
                name: name_or_unknown(&*self.backend, handle),
            })
            .collect()
    }
}

impl Drop for MidiDeviceManager {
    fn drop(&mut self) {
        self.close_all_devices();
    }
}
