//! ---
//! volta_section: "01-core-functionality"
//! volta_subsection: "module"
//! volta_type: "source"
//! volta_scope: "code"
//! volta_description: "Shared primitives and utilities for the core runtime."
//! volta_version: "v0.0.0-prealpha"
//! volta_owner: "tbd"
//! ---
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use tracing::debug;

use crate::logging::LogFormat;

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8090))
}

fn default_observer_buffer() -> usize {
    64
}

fn default_tick_interval() -> Duration {
    Duration::from_millis(100)
}

fn default_duration() -> Duration {
    Duration::from_millis(30_000)
}

fn default_batch_steps() -> usize {
    100
}

fn default_max_batch_steps() -> usize {
    100_000
}

fn default_batch_time_step() -> f64 {
    0.001
}

fn default_designs_directory() -> PathBuf {
    PathBuf::from("designs")
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

/// Primary configuration object for the Volta daemon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub designs: DesignsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    /// `None` when no file was found and built-in defaults are in effect.
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "VOLTA_CONFIG";

    /// Load configuration from disk, respecting the `VOLTA_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration together with the effective source path.
    ///
    /// An explicit `VOLTA_CONFIG` path must exist. Otherwise the first existing
    /// candidate wins, and defaults apply when none of them is present.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        debug!(
            inspected = %candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
            "no configuration file found; using defaults"
        );
        Ok(LoadedAppConfig {
            config: AppConfig::default(),
            source: None,
        })
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        contents
            .parse::<AppConfig>()
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        if self.server.observer_buffer == 0 {
            return Err(anyhow!("server.observer_buffer must be at least 1"));
        }
        self.simulation.validate()
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// Depth of each observer's outbound message queue.
    #[serde(default = "default_observer_buffer")]
    pub observer_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            observer_buffer: default_observer_buffer(),
        }
    }
}

/// Defaults applied to streaming and batch runs when a request omits them.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_tick_interval", rename = "tick_interval_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub tick_interval: Duration,
    #[serde(default = "default_duration", rename = "duration_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub duration: Duration,
    #[serde(default = "default_batch_steps")]
    pub batch_steps: usize,
    #[serde(default = "default_batch_time_step")]
    pub batch_time_step: f64,
    /// Upper bound on `steps` accepted from a batch request.
    #[serde(default = "default_max_batch_steps")]
    pub max_batch_steps: usize,
    /// Fixed seed for every session's noise source. Entropy when unset.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval: default_tick_interval(),
            duration: default_duration(),
            batch_steps: default_batch_steps(),
            batch_time_step: default_batch_time_step(),
            max_batch_steps: default_max_batch_steps(),
            seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval.is_zero() {
            return Err(anyhow!("simulation.tick_interval_ms must be positive"));
        }
        if self.duration.is_zero() {
            return Err(anyhow!("simulation.duration_ms must be positive"));
        }
        if !(self.batch_time_step.is_finite() && self.batch_time_step > 0.0) {
            return Err(anyhow!(
                "simulation.batch_time_step must be a positive number, got {}",
                self.batch_time_step
            ));
        }
        if self.batch_steps > self.max_batch_steps {
            return Err(anyhow!(
                "simulation.batch_steps ({}) exceeds simulation.max_batch_steps ({})",
                self.batch_steps,
                self.max_batch_steps
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignsConfig {
    #[serde(default = "default_designs_directory")]
    pub directory: PathBuf,
}

impl Default for DesignsConfig {
    fn default() -> Self {
        Self {
            directory: default_designs_directory(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}
