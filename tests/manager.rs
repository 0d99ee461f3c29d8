//! Manager lifecycle and queue behavior, driven through the virtual backend.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use midihub::backends::virtual_input::VirtualMidiBackend;
use midihub::{DeviceHandle, MidiDeviceManager, MidiMessage, Notification};

fn rig() -> (Arc<VirtualMidiBackend>, MidiDeviceManager) {
    let backend = Arc::new(VirtualMidiBackend::new());
    let manager = MidiDeviceManager::with_backend(Arc::clone(&backend) as _);
    (backend, manager)
}

// Note-on for key 0x4A, velocity 0x3C: status in the low byte.
const NOTE_ON: u32 = 0x003C_4A90;

#[test]
fn opens_every_plugged_device() {
    let (backend, manager) = rig();
    backend.plug("Keystation 61");
    backend.plug("Launchpad Mini");

    manager.open_all_devices();

    assert_eq!(manager.active_device_count(), 2);
    assert_eq!(manager.device_name(0), "Keystation 61");
    assert_eq!(manager.device_name(1), "Launchpad Mini");
    assert_eq!(manager.device_id_at(0), Some(1));
    assert_eq!(manager.device_id_at(1), Some(2));

    let infos = manager.devices();
    assert_eq!(infos.len(), 2);
    assert_eq!(infos[0].id, 1);
    assert_eq!(infos[0].ordinal, 0);
    assert_eq!(infos[1].name, "Launchpad Mini");
}

#[test]
fn out_of_range_lookups_degrade() {
    let (_backend, manager) = rig();
    assert_eq!(manager.device_id_at(0), None);
    assert_eq!(manager.device_name(5), "Unknown Device");
    assert_eq!(manager.device_name_for(DeviceHandle::default()), "Unknown Device");
}

#[test]
fn messages_pop_in_arrival_order() {
    let (backend, manager) = rig();
    backend.plug("A");
    backend.plug("B");
    manager.open_all_devices();

    assert!(backend.feed(0, 0x0000_0190));
    assert!(backend.feed(1, 0x0000_0291));
    assert!(backend.feed(0, 0x0000_0380));

    assert!(manager.has_pending_messages());
    let first = manager.poll_next_message();
    let second = manager.poll_next_message();
    let third = manager.poll_next_message();
    assert_eq!(
        (first.status, second.status, third.status),
        (0x90, 0x91, 0x80)
    );
    // Arrival order, even though the middle message came from another device.
    assert_eq!(first.source_device, 1);
    assert_eq!(second.source_device, 2);
    assert_eq!(third.source_device, 1);

    assert!(manager.poll_next_message().is_empty());
}

#[test]
fn poll_with_no_devices_returns_sentinel() {
    let (_backend, manager) = rig();
    for _ in 0..100 {
        let msg = manager.poll_next_message();
        assert_eq!(msg, MidiMessage::default());
        assert_eq!(msg.encode(), 0);
    }
    assert_eq!(manager.active_device_count(), 0);
}

#[test]
fn clear_pending_messages_is_idempotent() {
    let (backend, manager) = rig();
    backend.plug("A");
    manager.open_all_devices();
    backend.feed(0, NOTE_ON);
    backend.feed(0, NOTE_ON);

    manager.clear_pending_messages();
    assert!(!manager.has_pending_messages());
    manager.clear_pending_messages();
    assert!(!manager.has_pending_messages());
    assert!(manager.poll_next_message().is_empty());
}

#[test]
fn closing_unknown_handle_is_a_noop() {
    let (backend, manager) = rig();
    backend.plug("A");
    manager.open_all_devices();
    assert_eq!(manager.active_device_count(), 1);

    manager.close_device(DeviceHandle::default());
    assert_eq!(manager.active_device_count(), 1);
}

#[test]
fn start_failure_leaves_no_partial_state_and_retries() {
    let (backend, manager) = rig();
    backend.plug("Flaky");
    backend.fail_next_start(0);

    manager.open_all_devices();
    assert_eq!(manager.active_device_count(), 0);
    assert_eq!(backend.open_handle(0), None);

    // Every poll re-scans; the failure was one-shot, so the next cycle
    // succeeds.
    let msg = manager.poll_next_message();
    assert!(msg.is_empty());
    assert_eq!(manager.active_device_count(), 1);
}

#[test]
fn duplicate_disconnect_reports_close_once() {
    let (backend, manager) = rig();
    backend.plug("A");
    manager.open_all_devices();

    backend.unplug(0);
    // The platform reports the same disconnect again before reconciliation.
    backend.replay(0, Notification::Closed);

    assert!(manager.poll_next_message().is_empty());
    assert_eq!(manager.active_device_count(), 0);
    assert_eq!(backend.close_count(0), 1);

    // A stale report after reconciliation changes nothing.
    backend.replay(0, Notification::Closed);
    assert!(manager.poll_next_message().is_empty());
    assert_eq!(backend.close_count(0), 1);
}

#[test]
fn data_racing_a_close_is_dropped() {
    let (backend, manager) = rig();
    backend.plug("A");
    manager.open_all_devices();

    backend.feed(0, NOTE_ON);
    assert!(!manager.poll_next_message().is_empty());

    manager.close_all_devices();
    // A callback already in flight delivers data for the stale handle.
    backend.replay(0, Notification::Data(NOTE_ON));
    assert!(!manager.has_pending_messages());
}

#[test]
fn newly_plugged_devices_appear_on_next_poll() {
    let (backend, manager) = rig();
    backend.plug("A");
    manager.open_all_devices();
    assert_eq!(manager.active_device_count(), 1);

    backend.plug("B");
    manager.poll_next_message();
    assert_eq!(manager.active_device_count(), 2);
    // The device already open kept its session; only the new one was opened.
    assert_eq!(manager.device_id_at(0), Some(1));
    assert_eq!(manager.device_id_at(1), Some(2));
}

#[test]
fn unplugged_device_is_reaped_and_name_degrades() {
    let (backend, manager) = rig();
    backend.plug("A");
    manager.open_all_devices();
    let handle = backend.open_handle(0).unwrap();

    backend.unplug(0);
    assert!(manager.poll_next_message().is_empty());
    assert_eq!(manager.active_device_count(), 0);
    assert_eq!(manager.device_name(0), "Unknown Device");
    assert_eq!(manager.device_name_for(handle), "Unknown Device");
}

#[test]
fn messages_are_labeled_with_the_capturing_device() {
    let (backend, manager) = rig();
    backend.plug("A");
    backend.plug("B");
    manager.open_all_devices();

    backend.feed(1, NOTE_ON);
    let msg = manager.poll_next_message();
    assert_eq!(Some(msg.source_device), manager.device_id_at(1));
    assert_eq!(msg.to_string(), "Device(2) Channel/Status: 90 Key: 4A Velocity: 3C");
}

#[test]
fn cross_thread_producer_preserves_order() {
    let (backend, manager) = rig();
    backend.plug("A");
    manager.open_all_devices();

    let producer = {
        let backend = Arc::clone(&backend);
        thread::spawn(move || {
            for key in 0..50u32 {
                assert!(backend.feed(0, 0x90 | (key << 8)));
            }
        })
    };

    let mut keys = Vec::new();
    let mut spins = 0;
    while keys.len() < 50 {
        let msg = manager.poll_next_message();
        if msg.is_empty() {
            spins += 1;
            assert!(spins < 10_000, "producer stalled");
            thread::sleep(Duration::from_millis(1));
        } else {
            keys.push(u32::from(msg.data1));
        }
    }
    producer.join().unwrap();
    assert_eq!(keys, (0..50).collect::<Vec<_>>());
}

#[test]
fn drop_closes_everything() {
    let (backend, manager) = rig();
    backend.plug("A");
    backend.plug("B");
    manager.open_all_devices();

    drop(manager);
    assert_eq!(backend.close_count(0), 1);
    assert_eq!(backend.close_count(1), 1);
    assert_eq!(backend.open_handle(0), None);
}
