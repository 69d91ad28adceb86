//! WonderSwan Cartridge RTC Core
//!
//! This crate provides the cartridge real-time clock as a self-contained
//! emulator component with a stable C ABI. The host emulator routes I/O port
//! accesses to it and reports executed CPU cycles.
//!
//! # Architecture
//!
//! - `peripherals`: I/O port dispatch and the RTC controller
//! - `time_source`: host clock abstraction and UTC calendar conversion
//! - `log`: event logging through a host-installed callback
//!
//! # I/O Ports
//!
//! | Port | Register    |
//! |------|-------------|
//! | 0xCA | RTC command |
//! | 0xCB | RTC data    |

pub mod log;
pub mod peripherals;
pub mod time_source;

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::*;

#[cfg(test)]
mod rtc_integration_test;

use std::os::raw::c_char;
use std::slice;
use std::sync::{Mutex, MutexGuard};

pub use log::log_event;
pub use peripherals::rtc::{to_bcd, CMD_READ_DATETIME, COMMAND_PORT, CYCLES_PER_SECOND, DATA_PORT};
pub use peripherals::{Peripherals, RtcConfig, RtcController};
pub use time_source::{CalendarTime, ManualClock, SystemClock, TimeSource};

/// Thread-safe wrapper for the RTC block.
/// All FFI calls go through this mutex so a UI thread and the emulation
/// thread can share one instance.
/// This is an opaque type from C's perspective (used via void*).
pub struct SyncRtc {
    inner: Mutex<Peripherals>,
}

impl SyncRtc {
    fn new(config: RtcConfig) -> Self {
        Self {
            inner: Mutex::new(Peripherals::new(config)),
        }
    }

    /// Recovers the state from a poisoned lock
    fn lock(&self) -> MutexGuard<'_, Peripherals> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Create a new RTC instance.
/// use_realtime: non-zero to follow the host clock.
#[cfg_attr(not(feature = "ios_prefixed"), no_mangle)]
#[cfg_attr(feature = "ios_prefixed", export_name = "rust_rtc_create")]
pub extern "C" fn rtc_create(initial_time: u64, use_realtime: i32) -> *mut SyncRtc {
    let rtc = Box::new(SyncRtc::new(RtcConfig {
        initial_time,
        use_realtime: use_realtime != 0,
    }));
    Box::into_raw(rtc)
}

/// Destroy an RTC instance.
/// Safe to call with null pointer.
#[cfg_attr(not(feature = "ios_prefixed"), no_mangle)]
#[cfg_attr(feature = "ios_prefixed", export_name = "rust_rtc_destroy")]
pub extern "C" fn rtc_destroy(rtc: *mut SyncRtc) {
    if !rtc.is_null() {
        unsafe {
            drop(Box::from_raw(rtc));
        }
    }
}

/// Set an optional log callback for RTC events.
/// The callback is called with a null-terminated C string.
#[cfg_attr(not(feature = "ios_prefixed"), no_mangle)]
#[cfg_attr(feature = "ios_prefixed", export_name = "rust_rtc_set_log_callback")]
pub extern "C" fn rtc_set_log_callback(cb: Option<extern "C" fn(*const c_char)>) {
    log::set_log_callback(cb);
}

/// Re-initialise the clock (power-on).
/// Command and data registers are left untouched.
#[cfg_attr(not(feature = "ios_prefixed"), no_mangle)]
#[cfg_attr(feature = "ios_prefixed", export_name = "rust_rtc_init")]
pub extern "C" fn rtc_init(rtc: *mut SyncRtc, initial_time: u64, use_realtime: i32) {
    if rtc.is_null() {
        return;
    }

    let sync_rtc = unsafe { &*rtc };
    sync_rtc.lock().init(initial_time, use_realtime != 0);
}

/// Reset registers and clock to the creation settings.
#[cfg_attr(not(feature = "ios_prefixed"), no_mangle)]
#[cfg_attr(feature = "ios_prefixed", export_name = "rust_rtc_reset")]
pub extern "C" fn rtc_reset(rtc: *mut SyncRtc) {
    if rtc.is_null() {
        return;
    }

    let sync_rtc = unsafe { &*rtc };
    sync_rtc.lock().reset();
}

/// Write a byte to an I/O port.
#[cfg_attr(not(feature = "ios_prefixed"), no_mangle)]
#[cfg_attr(feature = "ios_prefixed", export_name = "rust_rtc_port_write")]
pub extern "C" fn rtc_port_write(rtc: *mut SyncRtc, port: u32, value: u8) {
    if rtc.is_null() {
        return;
    }

    let sync_rtc = unsafe { &*rtc };
    sync_rtc.lock().write(port, value);
}

/// Read a byte from an I/O port.
/// Returns 0 if the RTC pointer is null or the port is unmapped.
#[cfg_attr(not(feature = "ios_prefixed"), no_mangle)]
#[cfg_attr(feature = "ios_prefixed", export_name = "rust_rtc_port_read")]
pub extern "C" fn rtc_port_read(rtc: *mut SyncRtc, port: u32) -> u8 {
    if rtc.is_null() {
        return 0;
    }

    let sync_rtc = unsafe { &*rtc };
    sync_rtc.lock().read(port)
}

/// Advance the clock by the number of CPU cycles just executed.
#[cfg_attr(not(feature = "ios_prefixed"), no_mangle)]
#[cfg_attr(feature = "ios_prefixed", export_name = "rust_rtc_advance")]
pub extern "C" fn rtc_advance(rtc: *mut SyncRtc, cycles: u32) {
    if rtc.is_null() {
        return;
    }

    let sync_rtc = unsafe { &*rtc };
    sync_rtc.lock().tick(cycles);
}

/// Get the emulated Unix time in seconds.
/// Returns 0 if the RTC pointer is null.
#[cfg_attr(not(feature = "ios_prefixed"), no_mangle)]
#[cfg_attr(feature = "ios_prefixed", export_name = "rust_rtc_current_time")]
pub extern "C" fn rtc_current_time(rtc: *const SyncRtc) -> u64 {
    if rtc.is_null() {
        return 0;
    }

    let sync_rtc = unsafe { &*rtc };
    sync_rtc.lock().rtc.current_time()
}

/// Get the size needed for a save state buffer.
#[cfg_attr(not(feature = "ios_prefixed"), no_mangle)]
#[cfg_attr(feature = "ios_prefixed", export_name = "rust_rtc_save_state_size")]
pub extern "C" fn rtc_save_state_size(rtc: *const SyncRtc) -> usize {
    if rtc.is_null() {
        return 0;
    }

    let sync_rtc = unsafe { &*rtc };
    sync_rtc.lock().save_state_size()
}

/// Save RTC state to a buffer.
/// Returns bytes written on success, negative error code on failure.
#[cfg_attr(not(feature = "ios_prefixed"), no_mangle)]
#[cfg_attr(feature = "ios_prefixed", export_name = "rust_rtc_save_state")]
pub extern "C" fn rtc_save_state(rtc: *const SyncRtc, out: *mut u8, cap: usize) -> i32 {
    if rtc.is_null() || out.is_null() {
        return -1;
    }

    let sync_rtc = unsafe { &*rtc };
    let buffer = unsafe { slice::from_raw_parts_mut(out, cap) };

    match sync_rtc.lock().save_state(buffer) {
        Ok(size) => size as i32,
        Err(code) => code,
    }
}

/// Load RTC state from a buffer.
/// Returns 0 on success, negative error code on failure.
#[cfg_attr(not(feature = "ios_prefixed"), no_mangle)]
#[cfg_attr(feature = "ios_prefixed", export_name = "rust_rtc_load_state")]
pub extern "C" fn rtc_load_state(rtc: *mut SyncRtc, data: *const u8, len: usize) -> i32 {
    if rtc.is_null() || data.is_null() {
        return -1;
    }

    let sync_rtc = unsafe { &*rtc };
    let buffer = unsafe { slice::from_raw_parts(data, len) };

    match sync_rtc.lock().load_state(buffer) {
        Ok(()) => 0,
        Err(code) => code,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    #[test]
    fn test_create_destroy() {
        let rtc = rtc_create(0, 0);
        assert!(!rtc.is_null());
        rtc_destroy(rtc);
        rtc_destroy(ptr::null_mut());
    }

    #[test]
    fn test_null_pointers() {
        rtc_init(ptr::null_mut(), 0, 0);
        rtc_reset(ptr::null_mut());
        rtc_port_write(ptr::null_mut(), COMMAND_PORT, 0x15);
        rtc_advance(ptr::null_mut(), 1000);
        assert_eq!(rtc_port_read(ptr::null_mut(), COMMAND_PORT), 0);
        assert_eq!(rtc_current_time(ptr::null()), 0);
        assert_eq!(rtc_save_state_size(ptr::null()), 0);
        assert_eq!(rtc_save_state(ptr::null(), ptr::null_mut(), 0), -1);
        assert_eq!(rtc_load_state(ptr::null_mut(), ptr::null(), 0), -1);
    }

    #[test]
    fn test_advance_via_ffi() {
        let rtc = rtc_create(946_684_800, 0);
        rtc_advance(rtc, 1_536_000);
        rtc_advance(rtc, 1_536_000);
        assert_eq!(rtc_current_time(rtc), 946_684_801);
        rtc_destroy(rtc);
    }

    #[test]
    fn test_thread_safety() {
        use std::thread;

        let rtc = rtc_create(0, 0);
        let rtc_ptr = rtc as usize; // Convert to usize for Send

        let handles: Vec<_> = (0..4).map(|i| {
            thread::spawn(move || {
                let rtc = rtc_ptr as *mut SyncRtc;
                for _ in 0..100 {
                    if i % 2 == 0 {
                        rtc_port_write(rtc, DATA_PORT, i as u8);
                        rtc_port_read(rtc, DATA_PORT);
                    } else {
                        rtc_advance(rtc, 30_720);
                    }
                }
            })
        }).collect();

        for h in handles {
            h.join().unwrap();
        }

        // Two threads x 100 batches x 30_720 cycles = 2 seconds
        assert_eq!(rtc_current_time(rtc), 2);
        rtc_destroy(rtc);
    }
}
