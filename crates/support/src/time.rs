use chrono::{Local, TimeZone};

/// Render a wall-clock timestamp in milliseconds since the epoch as an
/// ISO-8601 string with the local UTC offset, e.g. `2017-08-14T10:01:50-0700`.
pub fn wall_clock_ms_to_str(ms: i64) -> String {
    match Local.timestamp_millis_opt(ms).single() {
        Some(datetime) => datetime.format("%FT%T%z").to_string(),
        None => format!("<invalid time {ms}>"),
    }
}
