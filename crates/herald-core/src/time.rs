//! Canonical-timezone date-time parsing and rendering.
//!
//! User input arrives as `YYYY-MM-DD HH:MM` interpreted in one fixed zone,
//! is normalized to UTC for storage and comparison, and is rendered back in
//! the same zone with the same format.

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Wire/display format for user-facing date-times.
pub const LOCAL_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Parse `YYYY-MM-DD HH:MM` in `tz` and normalize to UTC.
///
/// Returns `None` for malformed strings and for local times that do not
/// exist or are ambiguous in `tz` (DST gap/fold).
pub fn parse_local(input: &str, tz: Tz) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(input.trim(), LOCAL_FORMAT).ok()?;
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        _ => None,
    }
}

/// Render a UTC instant as `YYYY-MM-DD HH:MM` in `tz`.
pub fn render_local(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format(LOCAL_FORMAT).to_string()
}
