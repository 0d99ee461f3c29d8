//! In-process scriptable MIDI backend.
//!
//! [`VirtualMidiBackend`] implements [`MidiBackend`] without touching any
//! hardware: tests and demos plug in named device slots, feed raw payloads,
//! and unplug slots to simulate disconnects. Notifications are delivered
//! through the registered sink exactly like a platform backend would deliver
//! them — including the final `Closed` notification fired from inside
//! [`close`](MidiBackend::close), which mirrors how the Windows backend
//! behaves and exercises the manager's close-race handling.
//!
//! Slots keep their enumeration ordinal for the life of the backend; an
//! unplugged slot stays enumerable but refuses to open, like a vacated port.
//! Feeding and unplugging may be done from any thread.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::{
    BackendError, DeviceHandle, MidiBackend, Notification, NotificationSink,
};

/// One open session on a slot.
struct Session {
    handle: DeviceHandle,
    sink: NotificationSink,
    started: bool,
}

struct Slot {
    name: String,
    plugged: bool,
    fail_next_start: bool,
    session: Option<Session>,
    /// Sink and handle of the most recent session, retained after close so
    /// tests can replay late notifications against a stale handle.
    last_sink: Option<NotificationSink>,
    last_handle: Option<DeviceHandle>,
    /// Number of times a session on this slot has been closed.
    closes: u32,
}

#[derive(Default)]
struct Inner {
    slots: Vec<Slot>,
    next_handle: usize,
}

/// Scriptable [`MidiBackend`] for tests and demos.
#[derive(Default)]
pub struct VirtualMidiBackend {
    inner: Mutex<Inner>,
}

impl VirtualMidiBackend {
    /// Backend with no devices. Managers over it see an empty world until
    /// something is [`plug`](Self::plug)ged in.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a device slot; returns the enumeration ordinal it will answer at.
    pub fn plug(&self, name: &str) -> u32 {
        let mut inner = self.inner.lock();
        inner.slots.push(Slot {
            name: name.to_string(),
            plugged: true,
            fail_next_start: false,
            session: None,
            last_sink: None,
            last_handle: None,
            closes: 0,
        });
        (inner.slots.len() - 1) as u32
    }

    /// Simulate a disconnect: the slot stops accepting opens and, if a
    /// session is active, its sink is told the device closed.
    pub fn unplug(&self, ordinal: u32) {
        let notify = {
            let mut inner = self.inner.lock();
            let Some(slot) = inner.slots.get_mut(ordinal as usize) else {
                return;
            };
            slot.plugged = false;
            slot.session
                .as_ref()
                .map(|s| (Arc::clone(&s.sink), s.handle))
        };
        // Deliver outside our own lock, as a platform thread would.
        if let Some((sink, handle)) = notify {
            sink(handle, Notification::Closed);
        }
    }

    /// Deliver a raw 32-bit payload from the slot's device. Returns `false`
    /// when no started session exists to deliver through.
    pub fn feed(&self, ordinal: u32, raw: u32) -> bool {
        let notify = {
            let inner = self.inner.lock();
            inner
                .slots
                .get(ordinal as usize)
                .and_then(|slot| slot.session.as_ref())
                .filter(|s| s.started)
                .map(|s| (Arc::clone(&s.sink), s.handle))
        };
        match notify {
            Some((sink, handle)) => {
                sink(handle, Notification::Data(raw));
                true
            }
            None => false,
        }
    }

    /// Replay a notification through the slot's most recent sink, even after
    /// its session was closed. Simulates a platform callback that was
    /// already in flight when the device went away.
    pub fn replay(&self, ordinal: u32, notification: Notification) -> bool {
        let notify = {
            let inner = self.inner.lock();
            inner.slots.get(ordinal as usize).and_then(|slot| {
                Some((Arc::clone(slot.last_sink.as_ref()?), slot.last_handle?))
            })
        };
        match notify {
            Some((sink, handle)) => {
                sink(handle, notification);
                true
            }
            None => false,
        }
    }

    /// Arrange for the next `start` on this slot to fail.
    pub fn fail_next_start(&self, ordinal: u32) {
        if let Some(slot) = self.inner.lock().slots.get_mut(ordinal as usize) {
            slot.fail_next_start = true;
        }
    }

    /// Handle of the slot's active session, if any.
    pub fn open_handle(&self, ordinal: u32) -> Option<DeviceHandle> {
        self.inner
            .lock()
            .slots
            .get(ordinal as usize)
            .and_then(|slot| slot.session.as_ref().map(|s| s.handle))
    }

    /// How many times a session on this slot has been closed.
    pub fn close_count(&self, ordinal: u32) -> u32 {
        self.inner
            .lock()
            .slots
            .get(ordinal as usize)
            .map(|slot| slot.closes)
            .unwrap_or(0)
    }

    fn slot_by_handle(inner: &mut Inner, handle: DeviceHandle) -> Option<&mut Slot> {
        inner
            .slots
            .iter_mut()
            .find(|slot| slot.session.as_ref().is_some_and(|s| s.handle == handle))
    }
}

impl MidiBackend for VirtualMidiBackend {
    fn device_count(&self) -> u32 {
        self.inner.lock().slots.len() as u32
    }

    fn open(&self, ordinal: u32, sink: NotificationSink) -> Result<DeviceHandle, BackendError> {
        let mut inner = self.inner.lock();
        inner.next_handle += 1;
        let handle = DeviceHandle(inner.next_handle);
        let Some(slot) = inner.slots.get_mut(ordinal as usize) else {
            return Err(BackendError::NoSuchDevice { ordinal });
        };
        if !slot.plugged || slot.session.is_some() {
            return Err(BackendError::Open { ordinal, code: 0 });
        }
        slot.last_sink = Some(Arc::clone(&sink));
        slot.last_handle = Some(handle);
        slot.session = Some(Session {
            handle,
            sink,
            started: false,
        });
        Ok(handle)
    }

    fn start(&self, handle: DeviceHandle) -> Result<(), BackendError> {
        let mut inner = self.inner.lock();
        let Some(slot) = Self::slot_by_handle(&mut inner, handle) else {
            return Err(BackendError::Start { handle, code: 0 });
        };
        if slot.fail_next_start {
            slot.fail_next_start = false;
            return Err(BackendError::Start { handle, code: 1 });
        }
        if let Some(session) = slot.session.as_mut() {
            session.started = true;
        }
        Ok(())
    }

    fn close(&self, handle: DeviceHandle) -> Result<(), BackendError> {
        let sink = {
            let mut inner = self.inner.lock();
            let Some(slot) = Self::slot_by_handle(&mut inner, handle) else {
                return Err(BackendError::Close { handle, code: 0 });
            };
            let session = slot.session.take();
            slot.closes += 1;
            session.map(|s| s.sink)
        };
        // Final notification, delivered synchronously from inside close like
        // the Windows backend does.
        if let Some(sink) = sink {
            sink(handle, Notification::Closed);
        }
        Ok(())
    }

    fn device_name(&self, handle: DeviceHandle) -> Result<String, BackendError> {
        let mut inner = self.inner.lock();
        match Self::slot_by_handle(&mut inner, handle) {
            Some(slot) => Ok(slot.name.clone()),
            None => Err(BackendError::Name { handle, code: 0 }),
        }
    }
}
