//! MIDI monitor: open every input device, list them, then print every
//! captured message until killed.

use std::thread;
use std::time::Duration;

use midihub::MidiDeviceManager;

fn main() {
    env_logger::init();

    #[cfg(windows)]
    let manager = MidiDeviceManager::discover();
    #[cfg(not(windows))]
    let manager = MidiDeviceManager::with_backend(std::sync::Arc::new(
        midihub::backends::virtual_input::VirtualMidiBackend::new(),
    ));

    manager.open_all_devices();
    for info in manager.devices() {
        println!("{}", info.name);
    }

    loop {
        let msg = manager.poll_next_message();
        if !msg.is_empty() {
            println!("{msg}");
        } else {
            thread::sleep(Duration::from_millis(1));
        }
    }
}
