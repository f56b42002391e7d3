//! Run modes and the wiring they share.

pub mod check;
pub mod summary;

use std::sync::Arc;

use anyhow::Context;

use sitewatch_core::WatchConfig;
use sitewatch_health::{Monitor, Prober, ReqwestTransport};
use sitewatch_notify::{CommandMailer, Notifier};
use sitewatch_state::FileStatusStore;

/// Assemble a monitor over the real network, store file, and mail command.
pub fn build_monitor(config: &WatchConfig) -> anyhow::Result<Monitor> {
    let transport =
        ReqwestTransport::new(&config.probe).context("failed to build HTTP client")?;
    let prober = Prober::from_config(Arc::new(transport), &config.probe);

    let mailer = CommandMailer::from_command_line(&config.mail.command)?;
    let notifier = Notifier::new(Arc::new(mailer), config.recipients.clone(), config.tz()?);

    let store = Arc::new(FileStatusStore::new(&config.paths.status_file));
    Ok(Monitor::new(config, prober, store, notifier))
}

// ── Termination signals ────────────────────────────────────────────

/// SIGINT, SIGTERM and SIGHUP, installed up front so a failure to register
/// is reported before any work starts.
pub struct TerminationSignals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
    hangup: tokio::signal::unix::Signal,
}

impl TerminationSignals {
    pub fn install() -> anyhow::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt()).context("failed to install SIGINT handler")?,
            terminate: signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?,
            hangup: signal(SignalKind::hangup()).context("failed to install SIGHUP handler")?,
        })
    }

    /// Wait for the next signal and return its number.
    pub async fn recv(&mut self) -> i32 {
        use tokio::signal::unix::SignalKind;

        let kind = tokio::select! {
            _ = self.interrupt.recv() => SignalKind::interrupt(),
            _ = self.terminate.recv() => SignalKind::terminate(),
            _ = self.hangup.recv() => SignalKind::hangup(),
        };
        kind.as_raw_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_from_minimal_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = WatchConfig::from_toml_str(&format!(
            "targets = [\"https://example.com\"]\n[paths]\nstatus_file = \"{}\"\n",
            dir.path().join("status").display()
        ))
        .unwrap();

        let monitor = build_monitor(&config).unwrap();
        assert_eq!(monitor.targets(), ["https://example.com".to_string()]);
    }

    #[test]
    fn empty_mail_command_is_rejected() {
        let mut config = WatchConfig::from_toml_str("targets = [\"https://example.com\"]").unwrap();
        config.mail.command = "  ".to_string();
        assert!(build_monitor(&config).is_err());
    }
}
