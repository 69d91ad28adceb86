//! WebAssembly bindings for the WonderSwan RTC
//!
//! This module provides JavaScript-friendly APIs using wasm-bindgen.

use wasm_bindgen::prelude::*;
use crate::peripherals::{Peripherals, RtcConfig};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    fn warn(s: &str);
    #[wasm_bindgen(js_namespace = console)]
    fn log(s: &str);
}

/// WASM-friendly wrapper around the RTC port block.
/// Unlike the C FFI, this owns the state directly without mutex
/// since WASM is single-threaded.
#[wasm_bindgen]
pub struct WasmRtc {
    inner: Peripherals,
}

#[wasm_bindgen]
impl WasmRtc {
    /// Create a new RTC instance.
    #[wasm_bindgen(constructor)]
    pub fn new(initial_time: u64, use_realtime: bool) -> WasmRtc {
        // Set up console panic hook for better error messages
        console_error_panic_hook::set_once();

        WasmRtc {
            inner: Peripherals::new(RtcConfig {
                initial_time,
                use_realtime,
            }),
        }
    }

    /// Re-initialise the clock (power-on).
    #[wasm_bindgen]
    pub fn init(&mut self, initial_time: u64, use_realtime: bool) {
        log(&format!("[WASM] init: time={} realtime={}", initial_time, use_realtime));
        self.inner.init(initial_time, use_realtime);
    }

    /// Reset registers and clock to the creation settings.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.inner.reset();
    }

    /// Write a byte to an I/O port.
    #[wasm_bindgen]
    pub fn port_write(&mut self, port: u32, value: u8) {
        self.inner.write(port, value);
    }

    /// Read a byte from an I/O port.
    #[wasm_bindgen]
    pub fn port_read(&mut self, port: u32) -> u8 {
        self.inner.read(port)
    }

    /// Advance the clock by the number of CPU cycles just executed.
    #[wasm_bindgen]
    pub fn advance(&mut self, cycles: u32) {
        self.inner.tick(cycles);
    }

    /// Emulated Unix time in seconds.
    #[wasm_bindgen]
    pub fn current_time(&self) -> u64 {
        self.inner.rtc.current_time()
    }

    /// Get the size needed for a save state buffer.
    #[wasm_bindgen]
    pub fn save_state_size(&self) -> usize {
        self.inner.save_state_size()
    }

    /// Save RTC state to a byte array.
    /// Returns the state data or an empty array on failure.
    #[wasm_bindgen]
    pub fn save_state(&self) -> Vec<u8> {
        let size = self.inner.save_state_size();
        let mut buffer = vec![0u8; size];
        match self.inner.save_state(&mut buffer) {
            Ok(written) => {
                buffer.truncate(written);
                buffer
            }
            Err(_) => Vec::new(),
        }
    }

    /// Load RTC state from a byte array.
    /// Returns 0 on success, negative error code on failure.
    #[wasm_bindgen]
    pub fn load_state(&mut self, data: &[u8]) -> i32 {
        log(&format!("[WASM] load_state: {} bytes", data.len()));
        match self.inner.load_state(data) {
            Ok(()) => 0,
            Err(code) => {
                warn(&format!("[WASM] load_state FAILED: error {}", code));
                code
            }
        }
    }

    /// Dump diagnostic state for debugging.
    #[wasm_bindgen]
    pub fn dump_state(&self) -> String {
        let rtc = &self.inner.rtc;
        format!(
            "command={:02X} data={:02X} cursor={} realtime={} time={} cycles={}",
            rtc.command(), rtc.data(), rtc.cursor(),
            rtc.is_realtime(), rtc.current_time(), rtc.cycle_accumulator(),
        )
    }
}

impl Default for WasmRtc {
    fn default() -> Self {
        Self::new(crate::peripherals::rtc::Y2K_EPOCH, false)
    }
}
