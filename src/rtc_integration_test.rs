//! Integration test for the RTC port pipeline
//! Drives the RTC the way cartridge code does: OUT/IN on ports 0xCA/0xCB
//! interleaved with CPU cycle batches, through both the port block and the C ABI.

#[cfg(test)]
mod tests {
    use crate::peripherals::rtc::{CMD_READ_DATETIME, CYCLES_PER_SECOND, Y2K_EPOCH};
    use crate::peripherals::{Peripherals, RtcConfig};
    use crate::time_source::ManualClock;
    use chrono::{DateTime, Datelike, Timelike, Utc};

    const RTC_COMMAND: u32 = 0xCA;
    const RTC_DATA: u32 = 0xCB;

    /// Cycles the host reports per frame (75.47 Hz at 3.072 MHz)
    const CYCLES_PER_FRAME: u32 = 40_704;

    fn simulated(initial_time: u64) -> Peripherals<ManualClock> {
        Peripherals::with_clock(
            RtcConfig {
                initial_time,
                use_realtime: false,
            },
            ManualClock::new(0),
        )
    }

    /// Issue the date/time command and read all seven fields
    fn read_datetime(ports: &mut Peripherals<ManualClock>) -> [u8; 7] {
        ports.write(RTC_COMMAND, CMD_READ_DATETIME);
        let mut out = [0u8; 7];
        for byte in &mut out {
            *byte = ports.read(RTC_DATA);
        }
        out
    }

    fn from_bcd(value: u8) -> u32 {
        ((value >> 4) * 10 + (value & 0x0F)) as u32
    }

    /// Expected stream computed independently with chrono
    fn expected_stream(seconds: u64) -> [u8; 7] {
        let dt = DateTime::<Utc>::from_timestamp(seconds as i64, 0).unwrap();
        let bcd = |v: u32| (((v / 10) << 4) | (v % 10)) as u8;
        [
            bcd((dt.year() - 2000) as u32),
            bcd(dt.month0()),
            bcd(dt.day()),
            bcd(dt.weekday().num_days_from_sunday()),
            bcd(dt.hour()),
            bcd(dt.minute()),
            bcd(dt.second()),
        ]
    }

    #[test]
    fn test_stream_matches_chrono_across_range() {
        // One sample every ~37 days from 2000 through 2099
        let mut seconds = Y2K_EPOCH;
        while seconds < 4_102_444_800 {
            let mut ports = simulated(seconds);
            assert_eq!(read_datetime(&mut ports), expected_stream(seconds), "t={}", seconds);
            seconds += 3_214_567;
        }
    }

    #[test]
    fn test_clock_runs_from_cpu_frames() {
        let mut ports = simulated(Y2K_EPOCH);

        // 10 emulated minutes worth of frames, split the way a frontend reports them
        let total_cycles = CYCLES_PER_SECOND * 600;
        let mut executed = 0u64;
        while executed + CYCLES_PER_FRAME as u64 <= total_cycles {
            ports.tick(CYCLES_PER_FRAME);
            executed += CYCLES_PER_FRAME as u64;
        }
        ports.tick((total_cycles - executed) as u32);

        let fields = read_datetime(&mut ports);
        assert_eq!(fields[4], 0x00); // hour
        assert_eq!(fields[5], 0x10); // minute
        assert_eq!(fields[6], 0x00); // second
        assert_eq!(ports.rtc.current_time(), Y2K_EPOCH + 600);
    }

    #[test]
    fn test_game_polling_loop() {
        // Games poll once per frame: re-issue 0x15, read seven bytes
        let mut ports = simulated(Y2K_EPOCH + 23 * 3600 + 59 * 60 + 58);

        let mut last_second = None;
        let mut rollovers = 0;
        for _ in 0..300 {
            let fields = read_datetime(&mut ports);
            for byte in fields {
                assert!(byte >> 4 <= 9 && byte & 0x0F <= 9);
            }
            let second = from_bcd(fields[6]);
            if let Some(prev) = last_second {
                if second != prev {
                    rollovers += 1;
                }
            }
            last_second = Some(second);
            ports.tick(CYCLES_PER_FRAME);
        }

        // 300 frames = 12_211_200 cycles = 3 whole seconds
        assert_eq!(rollovers, 3);
        // Crossed midnight into 2000-01-02 (Sunday)
        let fields = read_datetime(&mut ports);
        assert_eq!(&fields[..4], &[0x00, 0x00, 0x02, 0x00]);
    }

    #[test]
    fn test_command_switch_mid_stream() {
        let mut ports = simulated(Y2K_EPOCH);
        ports.write(RTC_DATA, 0x3C);
        ports.write(RTC_COMMAND, CMD_READ_DATETIME);
        assert_eq!(ports.read(RTC_DATA), 0x00); // year

        // Switching command falls back to the data echo
        ports.write(RTC_COMMAND, 0x14);
        assert_eq!(ports.read(RTC_COMMAND), 0x94);
        assert_eq!(ports.read(RTC_DATA), 0xBC);

        // Switching back restarts at the year
        ports.write(RTC_COMMAND, CMD_READ_DATETIME);
        assert_eq!(ports.read(RTC_DATA), 0x00);
        assert_eq!(ports.read(RTC_DATA), 0x00); // month
        assert_eq!(ports.read(RTC_DATA), 0x01); // day
    }

    #[test]
    fn test_realtime_mode_tracks_host() {
        let clock = ManualClock::new(Y2K_EPOCH);
        let mut ports = Peripherals::with_clock(
            RtcConfig {
                initial_time: 0,
                use_realtime: true,
            },
            clock.clone(),
        );

        let before = read_datetime(&mut ports);
        ports.tick(CYCLES_PER_SECOND as u32 * 10);
        assert_eq!(read_datetime(&mut ports), before);

        clock.advance(3661);
        assert_eq!(read_datetime(&mut ports), expected_stream(Y2K_EPOCH + 3661));
    }

    #[test]
    fn test_save_state_mid_stream_resumes() {
        let mut ports = simulated(Y2K_EPOCH + 86_400 * 45);
        ports.write(RTC_COMMAND, CMD_READ_DATETIME);
        let head = [ports.read(RTC_DATA), ports.read(RTC_DATA), ports.read(RTC_DATA)];
        ports.tick(1_000_000);

        let mut state = vec![0u8; ports.save_state_size()];
        ports.save_state(&mut state).unwrap();
        let expected_tail: Vec<u8> = (0..4).map(|_| ports.read(RTC_DATA)).collect();

        let mut restored = simulated(0);
        restored.load_state(&state).unwrap();
        let tail: Vec<u8> = (0..4).map(|_| restored.read(RTC_DATA)).collect();
        assert_eq!(tail, expected_tail);
        assert_eq!(head, [0x00, 0x01, 0x15]); // 2000-02-15

        // Accumulated cycles survive: 2_072_000 more cycles completes the second
        restored.tick(2_072_000);
        assert_eq!(restored.rtc.current_time(), Y2K_EPOCH + 86_400 * 45 + 1);
    }

    #[test]
    fn test_ffi_stream() {
        use crate::{rtc_create, rtc_destroy, rtc_port_read, rtc_port_write};

        let rtc = rtc_create(Y2K_EPOCH, 0);
        rtc_port_write(rtc, RTC_COMMAND, CMD_READ_DATETIME);
        let fields: Vec<u8> = (0..7).map(|_| rtc_port_read(rtc, RTC_DATA)).collect();
        assert_eq!(fields, vec![0x00, 0x00, 0x01, 0x06, 0x00, 0x00, 0x00]);
        assert_eq!(rtc_port_read(rtc, 0x00), 0);
        rtc_destroy(rtc);
    }

    #[test]
    fn test_ffi_save_load_round_trip() {
        use crate::{
            rtc_advance, rtc_create, rtc_current_time, rtc_destroy, rtc_load_state,
            rtc_save_state, rtc_save_state_size,
        };

        let src = rtc_create(Y2K_EPOCH, 0);
        rtc_advance(src, 3_072_000 * 5);
        let size = rtc_save_state_size(src);
        let mut buf = vec![0u8; size];
        assert_eq!(rtc_save_state(src, buf.as_mut_ptr(), buf.len()), size as i32);
        assert_eq!(rtc_save_state(src, buf.as_mut_ptr(), 4), -101);

        let dst = rtc_create(0, 0);
        assert_eq!(rtc_load_state(dst, buf.as_ptr(), buf.len()), 0);
        assert_eq!(rtc_current_time(dst), Y2K_EPOCH + 5);

        buf[0] = 0;
        assert_eq!(rtc_load_state(dst, buf.as_ptr(), buf.len()), -102);

        rtc_destroy(src);
        rtc_destroy(dst);
    }
}
