//! WonderSwan Cartridge Real-Time Clock
//!
//! I/O ports 0xCA (command) and 0xCB (data).
//!
//! The chip exposes a single usable command, 0x15, which streams the current
//! date and time out of the data port one BCD byte per read:
//!
//! | Read | Field                 |
//! |------|-----------------------|
//! | 0    | year - 2000           |
//! | 1    | month (0-based)       |
//! | 2    | day of month          |
//! | 3    | day of week (0 = Sun) |
//! | 4    | hour                  |
//! | 5    | minute                |
//! | 6    | second                |
//!
//! After the seventh byte the cursor wraps and the next read starts over at the
//! year. Any other command just echoes the data register back.
//!
//! Time either follows the host clock (real-time mode) or is a seconds counter
//! driven by emulated CPU cycles at 3.072 MHz (simulated mode).

use crate::log::log_event;
use crate::time_source::{CalendarTime, SystemClock, TimeSource};

/// Command register port
pub const COMMAND_PORT: u32 = 0xCA;
/// Data register port
pub const DATA_PORT: u32 = 0xCB;

/// Command that streams the date/time out of the data port
pub const CMD_READ_DATETIME: u8 = 0x15;

/// Status bit forced on in command and data reads (chip always reports ready)
const STATUS_READY: u8 = 0x80;

/// Emulated CPU cycles per RTC second
pub const CYCLES_PER_SECOND: u64 = 3_072_000;

/// Number of fields in a date/time stream
pub const DATETIME_FIELDS: u8 = 7;

/// Unix time of 2000-01-01T00:00:00Z, the chip's year zero
pub const Y2K_EPOCH: u64 = 946_684_800;

/// Encode a value 0-99 as two BCD digits.
/// Values above 99 wrap modulo 100.
pub fn to_bcd(value: u8) -> u8 {
    let value = value % 100;
    ((value / 10) << 4) | (value % 10)
}

/// Power-on configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtcConfig {
    /// Starting Unix time for simulated mode (ignored in real-time mode)
    pub initial_time: u64,
    /// Follow the host clock instead of counting emulated cycles
    pub use_realtime: bool,
}

impl Default for RtcConfig {
    fn default() -> Self {
        Self {
            initial_time: Y2K_EPOCH,
            use_realtime: false,
        }
    }
}

/// RTC Controller
#[derive(Debug, Clone)]
pub struct RtcController<C: TimeSource = SystemClock> {
    /// Last value written to the command port
    command: u8,
    /// Last value written to the data port
    data: u8,
    /// Next field of the date/time stream (0-6)
    cursor: u8,
    /// Real-time passthrough (true) or cycle-driven (false)
    use_realtime: bool,
    /// Emulated Unix time in seconds
    current_time: u64,
    /// Cycles not yet converted into a whole second
    cycle_accumulator: u64,
    /// Power-on settings, reapplied by reset()
    config: RtcConfig,
    /// Host wall clock
    clock: C,
}

impl RtcController<SystemClock> {
    /// Create an RTC backed by the host system clock
    pub fn new(config: RtcConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: TimeSource> RtcController<C> {
    /// Create an RTC with an explicit host clock
    pub fn with_clock(config: RtcConfig, clock: C) -> Self {
        let mut rtc = Self {
            command: 0,
            data: 0,
            cursor: 0,
            use_realtime: config.use_realtime,
            current_time: config.initial_time,
            cycle_accumulator: 0,
            config,
            clock,
        };
        rtc.init(config.initial_time, config.use_realtime);
        rtc
    }

    /// Power-on initialisation.
    /// The command and data registers keep their values.
    pub fn init(&mut self, initial_time: u64, use_realtime: bool) {
        self.use_realtime = use_realtime;
        self.current_time = if use_realtime {
            self.clock.now()
        } else {
            initial_time
        };
        self.cycle_accumulator = 0;
        self.cursor = 0;
        self.config = RtcConfig {
            initial_time,
            use_realtime,
        };

        log_event(&format!(
            "RTC: init mode={} time={}",
            if use_realtime { "realtime" } else { "simulated" },
            self.current_time
        ));
    }

    /// Clear the registers and re-run init with the last configuration
    pub fn reset(&mut self) {
        self.command = 0;
        self.data = 0;
        let RtcConfig {
            initial_time,
            use_realtime,
        } = self.config;
        self.init(initial_time, use_realtime);
    }

    /// Write a register byte. Ports other than 0xCA/0xCB are ignored.
    pub fn write(&mut self, port: u32, value: u8) {
        match port {
            COMMAND_PORT => {
                if value == CMD_READ_DATETIME {
                    self.cursor = 0;
                }
                let old = self.command;
                self.command = value;
                if old != value {
                    log_event(&format!("RTC: command 0x{:02X} -> 0x{:02X}", old, value));
                }
            }
            DATA_PORT => self.data = value,
            _ => {}
        }
    }

    /// Read a register byte. Ports other than 0xCA/0xCB read as 0.
    pub fn read(&mut self, port: u32) -> u8 {
        match port {
            COMMAND_PORT => self.command | STATUS_READY,
            DATA_PORT => {
                if self.command == CMD_READ_DATETIME {
                    self.next_datetime_byte()
                } else {
                    self.data | STATUS_READY
                }
            }
            _ => 0,
        }
    }

    /// Emit the field under the cursor and advance it.
    ///
    /// The calendar is recomputed on every read, so a slow reader straddling a
    /// second boundary sees fields from two different instants.
    fn next_datetime_byte(&mut self) -> u8 {
        let now = CalendarTime::from_epoch(self.now());

        let value = match self.cursor {
            0 => (now.year - 2000).rem_euclid(100) as u8,
            1 => now.month0,
            2 => now.day,
            3 => now.weekday,
            4 => now.hour,
            5 => now.minute,
            6 => now.second,
            _ => {
                // Unreachable unless restored from a corrupt snapshot
                self.cursor = 0;
                return 0;
            }
        };

        self.cursor = if self.cursor + 1 >= DATETIME_FIELDS {
            0
        } else {
            self.cursor + 1
        };

        to_bcd(value)
    }

    /// Advance emulated time by a batch of CPU cycles.
    /// No-op in real-time mode.
    pub fn advance(&mut self, cycles: u32) {
        if self.use_realtime {
            return;
        }

        self.cycle_accumulator += cycles as u64;
        // Carry whole seconds; the remainder stays below CYCLES_PER_SECOND
        while self.cycle_accumulator >= CYCLES_PER_SECOND {
            self.cycle_accumulator -= CYCLES_PER_SECOND;
            self.current_time = self.current_time.wrapping_add(1);
        }
    }

    /// Time the date/time stream reports right now
    fn now(&self) -> u64 {
        if self.use_realtime {
            self.clock.now()
        } else {
            self.current_time
        }
    }

    /// Emulated Unix time in seconds.
    /// In real-time mode this is the host time captured at init.
    pub fn current_time(&self) -> u64 {
        self.current_time
    }

    pub fn command(&self) -> u8 {
        self.command
    }

    pub fn data(&self) -> u8 {
        self.data
    }

    pub fn cursor(&self) -> u8 {
        self.cursor
    }

    pub fn is_realtime(&self) -> bool {
        self.use_realtime
    }

    pub fn cycle_accumulator(&self) -> u64 {
        self.cycle_accumulator
    }

    /// Whether the date/time command is latched
    pub fn is_streaming(&self) -> bool {
        self.command == CMD_READ_DATETIME
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

impl Default for RtcController<SystemClock> {
    fn default() -> Self {
        Self::new(RtcConfig::default())
    }
}

// ========== State Persistence ==========

/// Size of RTC state snapshot in bytes
/// 1 (command) + 1 (data) + 1 (cursor) + 1 (mode) + 8 (time) + 8 (accumulator) = 20, round to 24
pub const SNAPSHOT_SIZE: usize = 24;

impl<C: TimeSource> RtcController<C> {
    /// Save RTC state to bytes
    pub fn to_bytes(&self) -> [u8; SNAPSHOT_SIZE] {
        let mut buf = [0u8; SNAPSHOT_SIZE];
        let mut pos = 0;

        buf[pos] = self.command; pos += 1;
        buf[pos] = self.data; pos += 1;
        buf[pos] = self.cursor; pos += 1;
        buf[pos] = self.use_realtime as u8; pos += 1;
        buf[pos..pos+8].copy_from_slice(&self.current_time.to_le_bytes()); pos += 8;
        buf[pos..pos+8].copy_from_slice(&self.cycle_accumulator.to_le_bytes());

        buf
    }

    /// Load RTC state from bytes
    pub fn from_bytes(&mut self, buf: &[u8]) -> Result<(), i32> {
        if buf.len() < SNAPSHOT_SIZE {
            return Err(-105);
        }

        let mut pos = 0;

        self.command = buf[pos]; pos += 1;
        self.data = buf[pos]; pos += 1;
        self.cursor = buf[pos]; pos += 1;
        self.use_realtime = buf[pos] != 0; pos += 1;
        self.current_time = read_u64(buf, pos)?; pos += 8;
        self.cycle_accumulator = read_u64(buf, pos)?;

        if self.cursor >= DATETIME_FIELDS {
            self.cursor = 0;
        }
        self.config.use_realtime = self.use_realtime;

        Ok(())
    }
}

fn read_u64(buf: &[u8], pos: usize) -> Result<u64, i32> {
    buf.get(pos..pos + 8)
        .and_then(|b| b.try_into().ok())
        .map(u64::from_le_bytes)
        .ok_or(-105)
}
