use chrono::Utc;
use tokio::time::Instant;

const SECONDS_PER_DAY: u64 = 60 * 60 * 24;

/// Whole days contained in `seconds`, rounded down.
pub fn seconds_to_days(seconds: u64) -> u64 {
    seconds / SECONDS_PER_DAY
}

pub fn now_i64() -> i64 {
    Utc::now().timestamp()
}

pub fn get_instant() -> Instant {
    Instant::now()
}
