//! Human-readable durations and timestamps for alert text.

use chrono::DateTime;
use chrono_tz::Tz;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

/// Render an elapsed time as `Xd Yh Zm`, `Xh Ym` or `Xm`.
///
/// Below one hour a partial minute counts as a whole one, so a short outage
/// never reads as `0m`. From one hour on, leftover seconds are dropped.
pub fn format_duration(secs: u64) -> String {
    if secs < HOUR {
        let minutes = secs.div_ceil(MINUTE);
        if minutes < 60 {
            return format!("{minutes}m");
        }
        return "1h 0m".to_string();
    }

    let days = secs / DAY;
    let hours = (secs % DAY) / HOUR;
    let minutes = (secs % HOUR) / MINUTE;
    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else {
        format!("{hours}h {minutes}m")
    }
}

/// Render a Unix timestamp as `Month DD, YYYY HH:MM:SS TZ` in `tz`.
pub fn format_timestamp(epoch_secs: u64, tz: Tz) -> String {
    i64::try_from(epoch_secs)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| {
            dt.with_timezone(&tz)
                .format("%B %d, %Y %H:%M:%S %Z")
                .to_string()
        })
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minutes_round_up_below_an_hour() {
        assert_eq!(format_duration(0), "0m");
        assert_eq!(format_duration(1), "1m");
        assert_eq!(format_duration(60), "1m");
        assert_eq!(format_duration(125), "3m");
        assert_eq!(format_duration(3540), "59m");
    }

    #[test]
    fn rounding_carries_into_hours() {
        assert_eq!(format_duration(3599), "1h 0m");
    }

    #[test]
    fn hours_and_minutes() {
        assert_eq!(format_duration(3600), "1h 0m");
        assert_eq!(format_duration(3661), "1h 1m");
        assert_eq!(format_duration(2 * HOUR + 59 * MINUTE + 59), "2h 59m");
    }

    #[test]
    fn days_keep_all_units() {
        assert_eq!(format_duration(90_000), "1d 1h 0m");
        assert_eq!(format_duration(DAY), "1d 0h 0m");
        assert_eq!(format_duration(3 * DAY + 5 * MINUTE), "3d 0h 5m");
    }

    #[test]
    fn timestamp_in_utc() {
        assert_eq!(
            format_timestamp(0, chrono_tz::UTC),
            "January 01, 1970 00:00:00 UTC"
        );
    }

    #[test]
    fn timestamp_in_named_zone() {
        assert_eq!(
            format_timestamp(1_700_000_000, chrono_tz::Europe::Berlin),
            "November 14, 2023 23:13:20 CET"
        );
        assert_eq!(
            format_timestamp(1_690_000_000, chrono_tz::America::New_York),
            "July 22, 2023 00:26:40 EDT"
        );
    }

    #[test]
    fn timestamp_out_of_range() {
        assert_eq!(format_timestamp(u64::MAX, chrono_tz::UTC), "unknown");
    }
}
