//! Subject and body text for each alert kind.

use chrono_tz::Tz;

use sitewatch_core::{target_host, AlertEvent, SummaryEntry};

use crate::format::{format_duration, format_timestamp};

/// A rendered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub subject: String,
    pub body: String,
}

/// Render an alert event. Timestamps are shown in `tz`.
pub fn render(event: &AlertEvent, tz: Tz) -> Message {
    match event {
        AlertEvent::Down {
            target,
            since,
            code,
        } => Message {
            subject: format!("🔴 [{}] DOWN Alert", target_host(target)),
            body: format!(
                "{target} is down since {}.\n\nHTTP code: {code}",
                format_timestamp(*since, tz)
            ),
        },
        AlertEvent::Up {
            target,
            at,
            downtime_secs,
        } => Message {
            subject: format!("✅ [{}] UP Alert", target_host(target)),
            body: format!(
                "{target} is UP again at {}, after {} of downtime.",
                format_timestamp(*at, tz),
                format_duration(*downtime_secs)
            ),
        },
        AlertEvent::Summary { entries } => Message {
            subject: "🔴 DOWN Alert Summary".to_string(),
            body: format!(
                "The following sites are down:\n\n{}",
                entries
                    .iter()
                    .map(|entry| summary_line(entry, tz))
                    .collect::<Vec<_>>()
                    .join("\n")
            ),
        },
    }
}

fn summary_line(entry: &SummaryEntry, tz: Tz) -> String {
    format!(
        "{} is down since {}, down for {}",
        entry.target,
        format_timestamp(entry.since, tz),
        format_duration(entry.downtime_secs)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitewatch_core::HttpCode;

    #[test]
    fn down_message() {
        let event = AlertEvent::Down {
            target: "https://shop.example.com/health".to_string(),
            since: 0,
            code: HttpCode(503),
        };
        let msg = render(&event, chrono_tz::UTC);
        assert_eq!(msg.subject, "🔴 [shop.example.com] DOWN Alert");
        assert_eq!(
            msg.body,
            "https://shop.example.com/health is down since January 01, 1970 00:00:00 UTC.\n\nHTTP code: 503"
        );
    }

    #[test]
    fn down_message_without_response() {
        let event = AlertEvent::Down {
            target: "https://x".to_string(),
            since: 0,
            code: HttpCode::NO_RESPONSE,
        };
        let msg = render(&event, chrono_tz::UTC);
        assert!(msg.body.ends_with("HTTP code: 000"));
        assert_eq!(msg.subject, "🔴 [x] DOWN Alert");
    }

    #[test]
    fn up_message() {
        let event = AlertEvent::Up {
            target: "https://x".to_string(),
            at: 3661,
            downtime_secs: 3661,
        };
        let msg = render(&event, chrono_tz::UTC);
        assert_eq!(msg.subject, "✅ [x] UP Alert");
        assert_eq!(
            msg.body,
            "https://x is UP again at January 01, 1970 01:01:01 UTC, after 1h 1m of downtime."
        );
    }

    #[test]
    fn summary_message() {
        let event = AlertEvent::Summary {
            entries: vec![
                SummaryEntry {
                    target: "https://a".to_string(),
                    since: 0,
                    downtime_secs: 125,
                },
                SummaryEntry {
                    target: "https://b".to_string(),
                    since: 60,
                    downtime_secs: 90_000,
                },
            ],
        };
        let msg = render(&event, chrono_tz::UTC);
        assert_eq!(msg.subject, "🔴 DOWN Alert Summary");
        assert_eq!(
            msg.body,
            "The following sites are down:\n\n\
             https://a is down since January 01, 1970 00:00:00 UTC, down for 3m\n\
             https://b is down since January 01, 1970 00:01:00 UTC, down for 1d 1h 0m"
        );
    }
}
