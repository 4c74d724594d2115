//! ---
//! volta_section: "01-core-functionality"
//! volta_subsection: "module"
//! volta_type: "source"
//! volta_scope: "code"
//! volta_description: "Shared primitives and utilities for the core runtime."
//! volta_version: "v0.0.0-prealpha"
//! volta_owner: "tbd"
//! ---
use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{info, Subscriber};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "VOLTA_LOG";
const DAEMON_DIRECTIVE: &str = "info,tower_http=warn";
const CLI_DIRECTIVE: &str = "warn";

/// Writer guards; dropping them would lose buffered lines.
static GUARDS: OnceCell<Vec<WorkerGuard>> = OnceCell::new();

/// Stdout encodings the daemon can emit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    StructuredJson,
    Pretty,
}

/// Install the daemon subscriber: stdout in `config.format` plus a daily
/// JSON file `<prefix>.log` under `config.directory`.
///
/// The filter comes from `VOLTA_LOG`, then `RUST_LOG`, then
/// `info,tower_http=warn`. Calling this twice keeps the first subscriber.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<()> {
    std::fs::create_dir_all(&config.directory).with_context(|| {
        format!("unable to create log directory {}", config.directory.display())
    })?;
    let prefix = config.file_prefix.as_deref().unwrap_or(service_name);

    let (file_writer, file_guard) =
        tracing_appender::non_blocking(daily(&config.directory, format!("{prefix}.log")));
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let _ = GUARDS.set(vec![file_guard, stdout_guard]);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .json()
        .with_writer(file_writer)
        .boxed();

    let installed = tracing_subscriber::registry()
        .with(env_filter(DAEMON_DIRECTIVE))
        .with(stdout_layer(config.format, stdout_writer))
        .with(file_layer)
        .try_init()
        .is_ok();

    if installed {
        info!(
            service = %service_name,
            log_dir = %config.directory.display(),
            format = ?config.format,
            "tracing initialised"
        );
    }
    Ok(())
}

/// Subscriber for one-shot subcommands whose stdout carries JSON output:
/// pretty lines on stderr, warnings only unless the environment says more.
pub fn init_cli_tracing() {
    let _ = tracing_subscriber::registry()
        .with(env_filter(CLI_DIRECTIVE))
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .try_init();
}

fn env_filter(fallback: &str) -> EnvFilter {
    match std::env::var(LOG_ENV) {
        Ok(directive) => EnvFilter::try_new(&directive).unwrap_or_else(|err| {
            eprintln!("ignoring invalid {LOG_ENV}={directive:?} ({err})");
            EnvFilter::new(fallback)
        }),
        Err(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
    }
}

fn stdout_layer<S>(format: LogFormat, writer: NonBlocking) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    let layer = fmt::layer()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_writer(writer);
    match format {
        LogFormat::StructuredJson => layer.with_target(false).json().boxed(),
        LogFormat::Pretty => layer.with_target(true).boxed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_creates_log_directory_and_is_repeatable() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = LoggingConfig {
            directory: dir.path().join("logs"),
            format: LogFormat::Pretty,
            file_prefix: Some("volta-test".into()),
        };
        init_tracing("volta-test", &config)?;
        init_tracing("volta-test", &config)?;
        init_cli_tracing();
        assert!(config.directory.is_dir());
        Ok(())
    }

    #[test]
    fn log_format_uses_kebab_case() {
        let format: LogFormat = serde_json::from_str("\"structured-json\"").unwrap();
        assert_eq!(format, LogFormat::StructuredJson);
        assert_eq!(serde_json::to_string(&LogFormat::Pretty).unwrap(), "\"pretty\"");
    }
}
