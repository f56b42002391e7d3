//! Status transition engine.
//!
//! Combines the previous record for a target with a fresh probe result and
//! decides the new record and whether an alert fires.
//!
//! | previous | observed | new record                     | alert                      |
//! |----------|----------|--------------------------------|----------------------------|
//! | none     | DOWN     | DOWN(1), since = now           | DOWN if grace == 1         |
//! | none     | UP       | UP, since = now                | none                       |
//! | DOWN(k)  | DOWN     | DOWN(k+1), since kept          | DOWN if k+1 == grace       |
//! | UP       | DOWN     | DOWN(1), since = now           | DOWN if grace == 1         |
//! | DOWN(k)  | UP       | UP, since = now                | UP if k >= grace           |
//! | UP       | UP       | unchanged                      | none                       |

use tracing::{debug, info, warn};

use sitewatch_core::{AlertEvent, HttpCode, Status, StatusRecord};

/// Outcome of feeding one observation into the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub record: StatusRecord,
    pub alert: Option<AlertEvent>,
}

/// Debounces probe results against a consecutive-failure threshold.
#[derive(Debug, Clone, Copy)]
pub struct TransitionEngine {
    grace_period: u32,
}

impl TransitionEngine {
    /// A grace period below 1 is treated as 1.
    pub fn new(grace_period: u32) -> Self {
        Self {
            grace_period: grace_period.max(1),
        }
    }

    pub fn grace_period(&self) -> u32 {
        self.grace_period
    }

    /// Apply the observation `code` for `target` at time `now`.
    pub fn apply(
        &self,
        target: &str,
        previous: Option<&StatusRecord>,
        code: HttpCode,
        now: u64,
    ) -> Transition {
        let observed = Status::from_code(code);

        match (previous, observed) {
            // New streak of failures.
            (None, Status::Down)
            | (
                Some(StatusRecord {
                    status: Status::Up, ..
                }),
                Status::Down,
            ) => {
                let record = StatusRecord::down(now, 1);
                debug!(%target, %code, "target went down");
                Transition {
                    record,
                    alert: self.down_alert(target, &record, code),
                }
            }

            (None, Status::Up) => {
                debug!(%target, "first observation, target up");
                Transition {
                    record: StatusRecord::up(now),
                    alert: None,
                }
            }

            // Still down: extend the streak, keep its start.
            (Some(prev), Status::Down) => {
                let record = StatusRecord::down(prev.since, prev.failure_count.saturating_add(1));
                debug!(%target, %code, failures = record.failure_count, "target still down");
                Transition {
                    record,
                    alert: self.down_alert(target, &record, code),
                }
            }

            // Recovery.
            (Some(prev), Status::Up) if prev.is_down() => {
                let alert = if prev.failure_count >= self.grace_period {
                    let downtime_secs = now.saturating_sub(prev.since);
                    info!(%target, failures = prev.failure_count, downtime_secs, "target recovered");
                    Some(AlertEvent::Up {
                        target: target.to_string(),
                        at: now,
                        downtime_secs,
                    })
                } else {
                    debug!(
                        %target,
                        failures = prev.failure_count,
                        threshold = self.grace_period,
                        "target recovered within grace period"
                    );
                    None
                };
                Transition {
                    record: StatusRecord::up(now),
                    alert,
                }
            }

            (Some(prev), Status::Up) => Transition {
                record: StatusRecord::up(prev.since),
                alert: None,
            },
        }
    }

    /// A DOWN alert, only on the observation that reaches the threshold.
    fn down_alert(&self, target: &str, record: &StatusRecord, code: HttpCode) -> Option<AlertEvent> {
        if record.failure_count != self.grace_period {
            return None;
        }
        warn!(
            %target,
            %code,
            failures = record.failure_count,
            threshold = self.grace_period,
            "target down past grace period"
        );
        Some(AlertEvent::Down {
            target: target.to_string(),
            since: record.since,
            code,
        })
    }
}
