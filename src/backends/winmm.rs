#![cfg(windows)]

//! Windows multimedia MIDI-in backend.
//!
//! Wraps the `midiIn*` family from winmm (`windows-sys`,
//! `Win32_Media_Audio`). The OS invokes [`midi_in_proc`] on a thread it
//! owns; the `dwInstance` word carries a heap-allocated clone of the
//! registered [`NotificationSink`], so no pointer to midihub structures ever
//! crosses the callback other than that one context allocation. The context
//! is freed after `midiInClose` returns — winmm delivers the final
//! `MIM_CLOSE` callback synchronously from inside `midiInClose`, and no
//! callback for the handle can arrive after it returns.
//!
//! Device names come from `midiInGetDevCapsW`, which accepts an open handle
//! in place of an enumeration ordinal.

use std::collections::HashMap;
use std::mem;

use parking_lot::Mutex;
use windows_sys::Win32::Media::Audio::{
    midiInClose, midiInGetDevCapsW, midiInGetNumDevs, midiInOpen, midiInStart, HMIDIIN,
    MIDIINCAPSW, CALLBACK_FUNCTION, MMSYSERR_NOERROR,
};

use crate::backend::{BackendError, DeviceHandle, MidiBackend, Notification, NotificationSink};

// Input-callback message codes from mmsystem.h (MM_MIM_*).
const MM_MIM_CLOSE: u32 = 0x3C2;
const MM_MIM_DATA: u32 = 0x3C3;

/// The winmm MIDI-in subsystem.
///
/// Holds one leaked sink context per open handle so the OS callback can reach
/// the sink without referencing the backend itself.
#[derive(Default)]
pub struct WinMmBackend {
    /// Open handle word -> address of the leaked `NotificationSink` context.
    contexts: Mutex<HashMap<usize, usize>>,
}

impl WinMmBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MidiBackend for WinMmBackend {
    fn device_count(&self) -> u32 {
        unsafe { midiInGetNumDevs() }
    }

    fn open(&self, ordinal: u32, sink: NotificationSink) -> Result<DeviceHandle, BackendError> {
        let ctx = Box::into_raw(Box::new(sink)) as usize;
        let mut handle: HMIDIIN = std::ptr::null_mut();
        // SAFETY: `ctx` points to a live boxed sink; it outlives the handle
        // because it is only reclaimed after a successful midiInClose.
        let status = unsafe {
            midiInOpen(
                &mut handle,
                ordinal,
                midi_in_proc as usize,
                ctx,
                CALLBACK_FUNCTION,
            )
        };
        if status != MMSYSERR_NOERROR {
            // SAFETY: the OS rejected the open, so it holds no reference to
            // the context; reclaim it.
            drop(unsafe { Box::from_raw(ctx as *mut NotificationSink) });
            return Err(BackendError::Open {
                ordinal,
                code: status,
            });
        }
        let word = handle as usize;
        self.contexts.lock().insert(word, ctx);
        Ok(DeviceHandle(word))
    }

    fn start(&self, handle: DeviceHandle) -> Result<(), BackendError> {
        let status = unsafe { midiInStart(handle.0 as HMIDIIN) };
        if status != MMSYSERR_NOERROR {
            return Err(BackendError::Start {
                handle,
                code: status,
            });
        }
        Ok(())
    }

    fn close(&self, handle: DeviceHandle) -> Result<(), BackendError> {
        let status = unsafe { midiInClose(handle.0 as HMIDIIN) };
        if status != MMSYSERR_NOERROR {
            // Keep the context alive: the OS may still invoke the callback
            // for a handle it refused to close.
            return Err(BackendError::Close {
                handle,
                code: status,
            });
        }
        if let Some(ctx) = self.contexts.lock().remove(&handle.0) {
            // SAFETY: midiInClose returned, so the final MIM_CLOSE has been
            // delivered and the OS will not touch the context again.
            drop(unsafe { Box::from_raw(ctx as *mut NotificationSink) });
        }
        Ok(())
    }

    fn device_name(&self, handle: DeviceHandle) -> Result<String, BackendError> {
        let mut caps: MIDIINCAPSW = unsafe { mem::zeroed() };
        let status = unsafe {
            midiInGetDevCapsW(
                handle.0,
                &mut caps,
                mem::size_of::<MIDIINCAPSW>() as u32,
            )
        };
        if status != MMSYSERR_NOERROR {
            return Err(BackendError::Name {
                handle,
                code: status,
            });
        }
        let len = caps
            .szPname
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(caps.szPname.len());
        Ok(String::from_utf16_lossy(&caps.szPname[..len]))
    }
}

/// Drop leaked sink contexts for any handles still open when the backend
/// itself goes away. Handles should already have been closed by the manager;
/// anything left here is a session the OS refused to close.
impl Drop for WinMmBackend {
    fn drop(&mut self) {
        for (_, ctx) in self.contexts.lock().drain() {
            // SAFETY: the backend is the only holder of these context
            // addresses; at drop time nothing can register new callbacks.
            drop(unsafe { Box::from_raw(ctx as *mut NotificationSink) });
        }
    }
}

/// winmm input callback. Runs on an OS-owned thread.
///
/// Translates the raw message codes into [`Notification`]s and forwards them
/// to the sink carried in `dw_instance`. Anything other than data and close
/// (open acknowledgments, long-message buffers, error reports) is ignored.
unsafe extern "system" fn midi_in_proc(
    hmidiin: HMIDIIN,
    umsg: u32,
    dw_instance: usize,
    dw_param1: usize,
    _dw_param2: usize,
) {
    if dw_instance == 0 {
        return;
    }
    // SAFETY: dw_instance is the boxed sink installed by `open`, kept alive
    // until after the final MIM_CLOSE.
    let sink = &*(dw_instance as *const NotificationSink);
    let handle = DeviceHandle(hmidiin as usize);
    match umsg {
        MM_MIM_DATA => sink(handle, Notification::Data(dw_param1 as u32)),
        MM_MIM_CLOSE => sink(handle, Notification::Closed),
        _ => {}
    }
}
