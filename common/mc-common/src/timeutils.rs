//! Wall-clock helpers for the native frontend's frame pacing loop.
//!
//! The emulation core itself never reads the wall clock; all timing inside the
//! core is in emulated cycles. This module only exists to let a host loop
//! throttle itself to the emulated frame rate.

use std::thread;
use std::time::{Duration, SystemTime};

/// Nanoseconds since the Unix epoch, or 0 if the system clock is somehow
/// before the epoch.
#[must_use]
pub fn current_time_nanos() -> u128 {
    SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default().as_nanos()
}

/// Sleep until at least the given time, returning the current time in
/// nanoseconds after waking. Sleeps to 1ms before the target and busy-waits
/// the remainder, since `thread::sleep` only guarantees sleeping *at least*
/// the requested duration (observed to overshoot noticeably on some hosts).
#[allow(clippy::must_use_candidate)]
pub fn sleep_until(time_nanos: u128) -> u128 {
    loop {
        let now = current_time_nanos();
        if now >= time_nanos {
            return now;
        }

        let duration = Duration::from_nanos((time_nanos - now) as u64);
        if duration > Duration::from_millis(1) {
            thread::sleep(duration - Duration::from_millis(1));
        }
    }
}

/// Days in a given month (1-12), for cartridge RTC chips. Only the every-4th-year
/// leap rule is applied, matching the simplified logic real RTC chips implement.
#[must_use]
pub fn days_in_month(month: u8, year: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if year % 4 == 0 { 29 } else { 28 }
        }
        _ => {
            log::error!("Invalid month: {month}, defaulting to 31 days in month");
            31
        }
    }
}
