//! Device metadata snapshot.
//!
//! [`DeviceInfo`] is a lightweight, cloneable description of one open device
//! suitable for UI display and logging. It is a snapshot: the device may
//! disconnect the moment after it was taken, and the name is whatever the
//! platform reported at capture time (`"Unknown Device"` when the query
//! failed).
//!
//! `id` is stable for the life of the manager and is the same identifier that
//! labels [`MidiMessage`](crate::message::MidiMessage)s, so a UI can
//! correlate message traffic to a listed device. `ordinal` is the platform
//! enumeration slot; it can shift as devices come and go, so treat it as
//! diagnostic first, identity second.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::message::DeviceId;

/// Snapshot of one open device.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Stable message-labeling identifier (never `0`).
    pub id: DeviceId,
    /// Platform enumeration ordinal the device was opened at.
    pub ordinal: u32,
    /// Display name reported by the platform.
    pub name: String,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.id, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trip() {
        let info = DeviceInfo {
            id: 3,
            ordinal: 1,
            name: "USB MIDI Keyboard".to_string(),
        };
        let json = serde_json::to_string(&info).unwrap();
        assert_eq!(serde_json::from_str::<DeviceInfo>(&json).unwrap(), info);
    }

    #[test]
    fn display_shows_id_and_name() {
        let info = DeviceInfo {
            id: 2,
            ordinal: 0,
            name: "Launchpad".to_string(),
        };
        assert_eq!(info.to_string(), "[2] Launchpad");
    }
}
