//! sitewatch: scheduled HTTP uptime checks.
//!
//! Meant to be run from cron or a systemd timer. Each invocation either
//! probes every configured target once or mails a summary of what is down.
//!
//! # Usage
//!
//! ```text
//! sitewatch                      # regular run
//! sitewatch --summary            # mail a report of targets currently down
//! sitewatch --debug --config ./sitewatch.toml
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, info};

use sitewatch_core::{WatchConfig, config::DEFAULT_CONFIG_PATH};

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "sitewatch",
    about = "Check that websites are up and mail an alert when they are not",
    version
)]
struct Cli {
    /// Mail a summary of targets that are currently down, without probing.
    #[arg(long)]
    summary: bool,

    /// Print debug-level logs to stderr.
    #[arg(long)]
    debug: bool,

    /// Path to the configuration file.
    #[arg(long, env = "SITEWATCH_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

/// How a run ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Completed,
    /// Cancelled by the given signal number.
    Interrupted(i32),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = usage_exit_code(&e);
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    init_tracing(cli.debug);

    match run(&cli).await {
        Ok(Outcome::Completed) => ExitCode::SUCCESS,
        Ok(Outcome::Interrupted(signo)) => {
            info!(signo, "run cancelled by signal");
            ExitCode::from(signal_exit_code(signo))
        }
        Err(e) => {
            eprintln!("sitewatch: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<Outcome> {
    let config = WatchConfig::from_file(&cli.config)?;
    debug!(
        path = %cli.config.display(),
        targets = config.targets.len(),
        recipients = config.recipients.len(),
        grace_period = config.alerting.grace_period,
        "configuration loaded"
    );

    let work = async {
        if cli.summary {
            commands::summary::run(&config).await
        } else {
            commands::check::run(&config).await
        }
    };

    let mut signals = commands::TerminationSignals::install()?;

    // Dropping `work` on a signal drops the lock guard with it.
    tokio::select! {
        result = work => result.map(|()| Outcome::Completed),
        signo = signals.recv() => Ok(Outcome::Interrupted(signo)),
    }
}

/// stderr logging; `RUST_LOG` wins when set.
fn init_tracing(debug: bool) {
    let default = if debug { "warn,sitewatch=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .init();
}

/// Help and version exit 0; every other parse error exits 1.
fn usage_exit_code(err: &clap::Error) -> u8 {
    if err.use_stderr() { 1 } else { 0 }
}

fn signal_exit_code(signo: i32) -> u8 {
    u8::try_from(128 + signo).unwrap_or(u8::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_flags_is_a_regular_run() {
        let cli = Cli::try_parse_from(["sitewatch", "--config", "/tmp/s.toml"]).unwrap();
        assert!(!cli.summary);
        assert!(!cli.debug);
        assert_eq!(cli.config, PathBuf::from("/tmp/s.toml"));
    }

    #[test]
    fn summary_and_debug_combine() {
        let cli = Cli::try_parse_from(["sitewatch", "--debug", "--summary"]).unwrap();
        assert!(cli.summary);
        assert!(cli.debug);
    }

    #[test]
    fn unknown_argument_exits_one() {
        let err = Cli::try_parse_from(["sitewatch", "--bogus"]).unwrap_err();
        assert_eq!(usage_exit_code(&err), 1);

        let err = Cli::try_parse_from(["sitewatch", "extra"]).unwrap_err();
        assert_eq!(usage_exit_code(&err), 1);
    }

    #[test]
    fn help_and_version_exit_zero() {
        let err = Cli::try_parse_from(["sitewatch", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
        assert_eq!(usage_exit_code(&err), 0);

        let err = Cli::try_parse_from(["sitewatch", "-V"]).unwrap_err();
        assert_eq!(usage_exit_code(&err), 0);
    }

    #[test]
    fn signal_exit_codes() {
        assert_eq!(signal_exit_code(2), 130);
        assert_eq!(signal_exit_code(15), 143);
        assert_eq!(signal_exit_code(1), 129);
    }
}
