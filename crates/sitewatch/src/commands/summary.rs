//! Summary run: report stored DOWN targets without probing.

use tracing::debug;

use sitewatch_core::WatchConfig;

pub async fn run(config: &WatchConfig) -> anyhow::Result<()> {
    let monitor = super::build_monitor(config)?;
    match monitor.run_summary().await? {
        Some(alert) => debug!(kind = alert.kind(), "summary sent"),
        None => debug!("nothing to summarise"),
    }
    Ok(())
}
