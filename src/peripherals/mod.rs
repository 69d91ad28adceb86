//! WonderSwan Cartridge I/O Block
//!
//! Owns the cartridge peripherals reached through the I/O port space:
//! - RTC (0xCA command, 0xCB data)
//!
//! Ports not mapped here are ignored on write and read back as 0.

pub mod rtc;

pub use rtc::{RtcConfig, RtcController};

use crate::log::log_event;
use crate::time_source::{SystemClock, TimeSource};

/// Port address regions
const RTC_BASE: u32 = rtc::COMMAND_PORT; // 0xCA
const RTC_END: u32 = rtc::DATA_PORT + 1; // 0xCC

/// Cartridge peripheral block
#[derive(Debug, Clone)]
pub struct Peripherals<C: TimeSource = SystemClock> {
    /// RTC controller
    pub rtc: RtcController<C>,
}

impl Peripherals<SystemClock> {
    /// Create the peripheral block backed by the host clock
    pub fn new(config: RtcConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: TimeSource> Peripherals<C> {
    pub fn with_clock(config: RtcConfig, clock: C) -> Self {
        Self {
            rtc: RtcController::with_clock(config, clock),
        }
    }

    /// Power-on initialisation of the clock
    pub fn init(&mut self, initial_time: u64, use_realtime: bool) {
        self.rtc.init(initial_time, use_realtime);
    }

    /// Reset all peripherals
    pub fn reset(&mut self) {
        self.rtc.reset();
        log_event("PERIPHERALS: reset");
    }

    /// Read from an I/O port
    pub fn read(&mut self, port: u32) -> u8 {
        match port {
            // RTC (0xCA - 0xCB)
            p if (RTC_BASE..RTC_END).contains(&p) => self.rtc.read(p),

            // Unmapped
            _ => 0x00,
        }
    }

    /// Write to an I/O port
    pub fn write(&mut self, port: u32, value: u8) {
        match port {
            // RTC (0xCA - 0xCB)
            p if (RTC_BASE..RTC_END).contains(&p) => self.rtc.write(p, value),

            // Unmapped
            _ => {}
        }
    }

    /// Advance peripherals by a batch of executed CPU cycles
    pub fn tick(&mut self, cycles: u32) {
        self.rtc.advance(cycles);
    }
}

// ========== State Persistence ==========

impl<C: TimeSource> Peripherals<C> {
    /// Magic bytes for state identification
    const STATE_MAGIC: [u8; 4] = *b"WSRT";
    /// State format version
    const STATE_VERSION: u32 = 1;
    /// Header size: magic(4) + version(4) = 8
    const STATE_HEADER_SIZE: usize = 8;

    /// Get size required for save state buffer
    pub fn save_state_size(&self) -> usize {
        Self::STATE_HEADER_SIZE + rtc::SNAPSHOT_SIZE
    }

    /// Save peripheral state to buffer
    /// Returns number of bytes written on success
    pub fn save_state(&self, buffer: &mut [u8]) -> Result<usize, i32> {
        let required = self.save_state_size();
        if buffer.len() < required {
            return Err(-101); // Buffer too small
        }

        let mut pos = 0;

        buffer[pos..pos+4].copy_from_slice(&Self::STATE_MAGIC);
        pos += 4;
        buffer[pos..pos+4].copy_from_slice(&Self::STATE_VERSION.to_le_bytes());
        pos += 4;

        let rtc_bytes = self.rtc.to_bytes();
        buffer[pos..pos+rtc_bytes.len()].copy_from_slice(&rtc_bytes);
        pos += rtc_bytes.len();

        log_event(&format!("STATE_SAVED: {} bytes", pos));
        Ok(pos)
    }

    /// Load peripheral state from buffer
    pub fn load_state(&mut self, buffer: &[u8]) -> Result<(), i32> {
        if buffer.len() < Self::STATE_HEADER_SIZE {
            return Err(-102); // Invalid magic / too small
        }

        let mut pos = 0;

        if buffer[pos..pos+4] != Self::STATE_MAGIC {
            return Err(-102); // Invalid magic
        }
        pos += 4;

        let version = u32::from_le_bytes([buffer[pos], buffer[pos+1], buffer[pos+2], buffer[pos+3]]);
        if version != Self::STATE_VERSION {
            return Err(-103); // Version mismatch
        }
        pos += 4;

        self.rtc.from_bytes(&buffer[pos..])?;

        log_event(&format!(
            "STATE_LOADED: rtc time={} command=0x{:02X}",
            self.rtc.current_time(),
            self.rtc.command()
        ));
        Ok(())
    }
}
