//! ESP32 time adapter.
//!
//! Provides monotonic time queries plus the wall-clock reading that
//! stamps detection results.
//!
//! - **`target_os = "espidf"`** — wraps `esp_timer_get_time()` for
//!   uptime and `gettimeofday()` for wall-clock (valid once NTP or a
//!   modem time sync has run).
//! - **`not(target_os = "espidf")`** — uses `std::time` for host-side
//!   testing and simulation.

/// Time adapter for the ESP32-S3 platform.
pub struct Esp32TimeAdapter {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for Esp32TimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32TimeAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Seconds since boot (monotonic).
    #[cfg(target_os = "espidf")]
    pub fn uptime_secs(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000_000
    }

    /// Seconds since boot (monotonic).
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_secs(&self) -> u64 {
        self.start.elapsed().as_secs()
    }

    /// Unix seconds, or 0 when the wall clock is obviously unsynced.
    /// Detection results carry this value in `detected_at`.
    #[cfg(target_os = "espidf")]
    pub fn unix_secs(&self) -> u64 {
        use core::ptr;
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, ptr::null_mut()) } != 0 {
            return 0;
        }
        // Reject obviously unsynced time (e.g. before 2020-01-01)
        const EPOCH_2020: i64 = 1_577_836_800;
        if tv.tv_sec < EPOCH_2020 {
            return 0;
        }
        tv.tv_sec as u64
    }

    /// Unix seconds from the host clock.
    #[cfg(not(target_os = "espidf"))]
    pub fn unix_secs(&self) -> u64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

// ── Wall-clock formatting ─────────────────────────────────────

/// Render unix seconds as UTC `YYYY-MM-DD HH:MM:SS`.
///
/// `0` (unsynced clock) renders as `"time unsynced"` so alert texts
/// stay honest instead of claiming 1970.
pub fn format_unix_utc(secs: u64) -> heapless::String<20> {
    let mut out = heapless::String::new();
    if secs == 0 {
        let _ = out.push_str("time unsynced");
        return out;
    }

    let days = (secs / 86_400) as i64;
    let tod = secs % 86_400;
    let (y, m, d) = civil_from_days(days);
    // 19 chars max; cannot overflow the 20-byte buffer.
    let _ = core::fmt::Write::write_fmt(
        &mut out,
        format_args!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            y,
            m,
            d,
            tod / 3600,
            (tod % 3600) / 60,
            tod % 60
        ),
    );
    out
}

/// Days-since-epoch → (year, month, day), proleptic Gregorian.
fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if m <= 2 { y + 1 } else { y }, m, d)
}
