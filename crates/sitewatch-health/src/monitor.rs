//! Monitor: one regular or summary run over the configured targets.
//!
//! A regular run holds the execution lock for the whole
//! load → probe → transition → notify → save cycle. A summary run only
//! reads the store.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info};

use sitewatch_core::{AlertEvent, SummaryEntry, WatchConfig};
use sitewatch_notify::Notifier;
use sitewatch_state::{ExecutionLock, StatusMap, StatusStore};

use crate::checker::Prober;
use crate::error::MonitorResult;
use crate::transition::TransitionEngine;

/// Source of the current Unix time in seconds.
pub type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

/// What a regular run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Targets probed.
    pub checked: usize,
    /// Targets whose new record is DOWN.
    pub down: usize,
    /// Alerts fired, in target order.
    pub alerts: Vec<AlertEvent>,
}

pub struct Monitor {
    targets: Vec<String>,
    prober: Prober,
    engine: TransitionEngine,
    store: Arc<dyn StatusStore>,
    notifier: Notifier,
    clock: Clock,
}

impl Monitor {
    pub fn new(
        config: &WatchConfig,
        prober: Prober,
        store: Arc<dyn StatusStore>,
        notifier: Notifier,
    ) -> Self {
        let mut seen = HashSet::new();
        let targets = config
            .targets
            .iter()
            .filter(|t| seen.insert(t.as_str()))
            .cloned()
            .collect();

        Self {
            targets,
            prober,
            engine: TransitionEngine::new(config.alerting.grace_period),
            store,
            notifier,
            clock: Arc::new(epoch_secs),
        }
    }

    /// Replace the wall clock (for testing).
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    /// Probe every target, fire alerts, and rewrite the store.
    ///
    /// Fails with `LockHeld` before touching the store if another run owns
    /// `lock`. The rewritten store holds exactly the configured targets.
    pub async fn run_checks(&self, lock: &ExecutionLock) -> MonitorResult<RunReport> {
        let _guard = lock.acquire()?;

        let previous = self.store.load()?;
        let mut next = StatusMap::new();
        let mut report = RunReport::default();

        for target in &self.targets {
            let code = self.prober.probe(target).await;
            let now = (self.clock)();
            let transition = self.engine.apply(target, previous.get(target), code, now);

            if transition.record.is_down() {
                report.down += 1;
            }
            debug!(
                %target,
                %code,
                status = %transition.record.status,
                failures = transition.record.failure_count,
                "target checked"
            );
            next.insert(target.clone(), transition.record);
            report.checked += 1;

            if let Some(alert) = transition.alert {
                self.notifier.notify(&alert).await;
                // No await between here and the save, so a cancelled run
                // never forgets an alert it already sent.
                self.checkpoint(&previous, &next)?;
                report.alerts.push(alert);
            }
        }

        let dropped = previous.keys().filter(|k| !next.contains_key(*k)).count();
        if dropped > 0 {
            debug!(dropped, "dropping records for targets no longer configured");
        }
        self.store.save(&next)?;

        info!(
            checked = report.checked,
            down = report.down,
            alerts = report.alerts.len(),
            "check run complete"
        );
        Ok(report)
    }

    /// Persist the records produced so far on top of the ones loaded at the
    /// start of the run. Targets not yet probed keep their old record.
    fn checkpoint(&self, previous: &StatusMap, next: &StatusMap) -> MonitorResult<()> {
        let mut merged = previous.clone();
        merged.extend(next.iter().map(|(target, record)| (target.clone(), *record)));
        self.store.save(&merged)?;
        Ok(())
    }

    /// Send one consolidated alert for every stored target past the grace
    /// period. Returns the alert, or `None` when nothing is down.
    pub async fn run_summary(&self) -> MonitorResult<Option<AlertEvent>> {
        let records = self.store.load()?;
        let now = (self.clock)();
        let grace = self.engine.grace_period();

        let entries: Vec<SummaryEntry> = records
            .iter()
            .filter(|(_, record)| record.past_grace(grace))
            .map(|(target, record)| SummaryEntry {
                target: target.clone(),
                since: record.since,
                downtime_secs: now.saturating_sub(record.since),
            })
            .collect();

        if entries.is_empty() {
            info!("summary: no targets down");
            return Ok(None);
        }

        info!(down = entries.len(), "summary: sending down report");
        let alert = AlertEvent::Summary { entries };
        self.notifier.notify(&alert).await;
        Ok(Some(alert))
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
