//! Raw MIDI messages.
//!
//! midihub represents every notification from a device as a [`MidiMessage`]:
//! the three data bytes of a short MIDI event plus the [`DeviceId`] of the
//! device it was captured from. Messages are immutable once constructed and
//! flow from the notification sink into the manager's queue, where they are
//! consumed exactly once by [`poll_next_message`].
//!
//! ## Value conventions
//! - **`status`** carries the MIDI status byte (message kind + channel).
//! - **`data1`/`data2`** are the two data bytes (e.g. key and velocity for
//!   note messages). Messages with fewer data bytes leave the rest zero, as
//!   delivered by the platform.
//! - The all-zero message is a sentinel meaning "no message"; it is what a
//!   poll returns when the queue is empty, and it [`encode`]s to `0`.
//!
//! The packed [`encode`]/[`decode`] form exists so a message can cross FFI or
//! IPC boundaries as a single `u64` without loss.
//!
//! [`poll_next_message`]: crate::manager::MidiDeviceManager::poll_next_message
//! [`encode`]: MidiMessage::encode
//! [`decode`]: MidiMessage::decode

use std::fmt;

/// Stable small-integer identifier for an open device.
///
/// Assigned by the manager's registry in order of opening, starting at `1`;
/// `0` is reserved to mean "unknown source". A `DeviceId` labels messages and
/// stays valid as a label even after the device it names has been closed.
pub type DeviceId = u32;

/// One short MIDI event captured from one device.
///
/// The default value is the empty sentinel (`encode() == 0`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MidiMessage {
    /// Device the message was captured from (at capture time; the device may
    /// since have been unplugged).
    pub source_device: DeviceId,
    /// MIDI status byte.
    pub status: u8,
    /// First data byte (key number for note messages).
    pub data1: u8,
    /// Second data byte (velocity for note messages).
    pub data2: u8,
}

impl MidiMessage {
    /// Build a message from the raw 32-bit payload the platform packs a short
    /// MIDI event into: status in the low byte, then data1, then data2.
    pub fn new(source_device: DeviceId, raw: u32) -> Self {
        Self {
            source_device,
            status: raw as u8,
            data1: (raw >> 8) as u8,
            data2: (raw >> 16) as u8,
        }
    }

    /// Pack the message into a single `u64`.
    ///
    /// Layout: `source_device` in bits `[0, 32)`, `status` in `[32, 40)`,
    /// `data1` in `[40, 48)`, `data2` in `[48, 56)`. The top byte is unused.
    /// The empty sentinel packs to `0`, so callers can test `encode() > 0`
    /// to skip it.
    pub fn encode(&self) -> u64 {
        u64::from(self.source_device)
            | u64::from(self.status) << 32
            | u64::from(self.data1) << 40
            | u64::from(self.data2) << 48
    }

    /// Inverse of [`encode`](Self::encode). Lossless for every message.
    pub fn decode(packed: u64) -> Self {
        Self {
            source_device: packed as u32,
            status: (packed >> 32) as u8,
            data1: (packed >> 40) as u8,
            data2: (packed >> 48) as u8,
        }
    }

    /// `true` for the "no message" sentinel returned by an empty poll.
    pub fn is_empty(&self) -> bool {
        self.encode() == 0
    }
}

/// Diagnostic rendering; the field labels assume a note-style message.
impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Device({:X}) Channel/Status: {:02X} Key: {:02X} Velocity: {:02X}",
            self.source_device, self.status, self.data1, self.data2
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_payload_splits_into_bytes() {
        let msg = MidiMessage::new(7, 0x003C_4A90);
        assert_eq!(msg.source_device, 7);
        assert_eq!(msg.status, 0x90);
        assert_eq!(msg.data1, 0x4A);
        assert_eq!(msg.data2, 0x3C);
    }

    #[test]
    fn encode_decode_round_trip() {
        let msg = MidiMessage::new(0xFFFF_FFFF, 0x007F_7FFE);
        assert_eq!(MidiMessage::decode(msg.encode()), msg);

        let note_off = MidiMessage::new(3, 0x0000_4A80);
        assert_eq!(MidiMessage::decode(note_off.encode()), note_off);
    }

    #[test]
    fn encode_bit_layout() {
        let msg = MidiMessage::new(7, 0x003C_4A90);
        let packed = msg.encode();
        assert_eq!(packed & 0xFFFF_FFFF, 7);
        assert_eq!((packed >> 32) & 0xFF, 0x90);
        assert_eq!((packed >> 40) & 0xFF, 0x4A);
        assert_eq!((packed >> 48) & 0xFF, 0x3C);
    }

    #[test]
    fn default_is_empty_sentinel() {
        let empty = MidiMessage::default();
        assert_eq!(empty.encode(), 0);
        assert!(empty.is_empty());

        // Any nonzero field makes the message distinguishable from the sentinel.
        assert!(MidiMessage::new(1, 0).encode() > 0);
        assert!(MidiMessage::new(0, 0x90).encode() > 0);
        assert!(!MidiMessage::new(0, 0x90).is_empty());
    }

    #[test]
    fn display_renders_upper_hex() {
        let msg = MidiMessage::new(7, 0x003C_4A90);
        assert_eq!(
            msg.to_string(),
            "Device(7) Channel/Status: 90 Key: 4A Velocity: 3C"
        );
    }
}
