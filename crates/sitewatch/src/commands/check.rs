//! Regular run: probe every target under the execution lock.

use tracing::debug;

use sitewatch_core::WatchConfig;
use sitewatch_state::ExecutionLock;

pub async fn run(config: &WatchConfig) -> anyhow::Result<()> {
    let monitor = super::build_monitor(config)?;
    let lock = ExecutionLock::for_file(&config.paths.lock_file);
    debug!(pid = lock.pid(), lock = %config.paths.lock_file.display(), "starting check run");

    let report = monitor.run_checks(&lock).await?;
    debug!(
        checked = report.checked,
        down = report.down,
        alerts = report.alerts.len(),
        "check run finished"
    );
    Ok(())
}
