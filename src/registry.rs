//! Registry of currently open devices.
//!
//! Maps between three ways of naming a device:
//! - its opaque [`DeviceHandle`] (backend-owned session identifier),
//! - its [`DeviceId`] (small stable integer used to label messages),
//! - its position in order of opening (what `device_name(0)` means in a
//!   "list the devices" loop).
//!
//! Ids come from a monotonically increasing counter starting at `1`, so an
//! id is never reused within a manager's lifetime and `0` never names a real
//! device — lookups for absent entries return `None` rather than a value a
//! caller could mistake for a device. The registry deliberately does not peek
//! inside handles; the id-to-handle association is an explicit table, not a
//! reinterpretation of the handle's bits.

use crate::backend::DeviceHandle;
use crate::message::DeviceId;

#[derive(Clone, Copy, Debug)]
struct Entry {
    id: DeviceId,
    handle: DeviceHandle,
    /// Enumeration ordinal the device was opened at. Used to skip ordinals
    /// that are already open when reconciliation re-scans the device list.
    ordinal: u32,
}

/// Open-device table, ordered by time of opening.
pub(crate) struct DeviceRegistry {
    entries: Vec<Entry>,
    next_id: DeviceId,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRegistry {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }

    /// Register a newly opened device and assign it the next id.
    pub(crate) fn insert(&mut self, handle: DeviceHandle, ordinal: u32) -> DeviceId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            handle,
            ordinal,
        });
        id
    }

    /// Remove the entry for `handle`, if present. Unknown handles are a
    /// no-op, which makes double-removal during close races harmless.
    pub(crate) fn remove(&mut self, handle: DeviceHandle) -> Option<DeviceId> {
        let pos = self.entries.iter().position(|e| e.handle == handle)?;
        Some(self.entries.remove(pos).id)
    }

    pub(crate) fn id_of(&self, handle: DeviceHandle) -> Option<DeviceId> {
        self.entries
            .iter()
            .find(|e| e.handle == handle)
            .map(|e| e.id)
    }

    pub(crate) fn contains(&self, handle: DeviceHandle) -> bool {
        self.entries.iter().any(|e| e.handle == handle)
    }

    /// Handle of the device at `position` (order of opening).
    pub(crate) fn handle_at(&self, position: usize) -> Option<DeviceHandle> {
        self.entries.get(position).map(|e| e.handle)
    }

    /// Id of the device at `position` (order of opening).
    pub(crate) fn id_at(&self, position: usize) -> Option<DeviceId> {
        self.entries.get(position).map(|e| e.id)
    }

    /// Whether some open device was opened at this enumeration ordinal.
    pub(crate) fn is_ordinal_open(&self, ordinal: u32) -> bool {
        self.entries.iter().any(|e| e.ordinal == ordinal)
    }

    /// Handle currently at the front of the table (oldest open device).
    pub(crate) fn front(&self) -> Option<DeviceHandle> {
        self.entries.first().map(|e| e.handle)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (DeviceId, DeviceHandle, u32)> + '_ {
        self.entries.iter().map(|e| (e.id, e.handle, e.ordinal))
    }
}
