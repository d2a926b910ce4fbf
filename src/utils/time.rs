use chrono::{FixedOffset, Local, SecondsFormat};
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the Unix epoch; 0 if the clock is set before it.
pub fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// Local wall-clock time with millisecond precision, e.g. `2024-05-01T12:00:00.000+02:00`.
///
/// Follows `TZ` when it is set.
pub fn local_timestamp() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Millis, false)
}

/// Name of the local time zone: `TZ` if set, otherwise the current UTC offset.
pub fn local_time_zone() -> String {
    zone_label(std::env::var("TZ").ok(), *Local::now().offset())
}

fn zone_label(tz: Option<String>, offset: FixedOffset) -> String {
    tz.filter(|tz| !tz.is_empty())
        .unwrap_or_else(|| offset.to_string())
}
