//! ---
//! volta_section: "01-core-functionality"
//! volta_subsection: "binary"
//! volta_type: "source"
//! volta_scope: "code"
//! volta_description: "Binary entrypoint for the Volta daemon."
//! volta_version: "v0.0.0-prealpha"
//! volta_owner: "tbd"
//! ---
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{info, warn};
use volta_common::config::AppConfig;
use volta_common::logging::{init_cli_tracing, init_tracing};
use volta_core::{
    BatchDefaults, BatchRequest, BatchService, InMemoryDesignStore, SessionRegistry, StreamConfig,
};
use volta_net::ServerBuilder;
use volta_sim::{Design, SeededNoise};

#[derive(Debug, Parser)]
#[command(author, version, about = "Volta simulation daemon", long_about = None)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Serve streaming and batch simulations (default)")]
    Serve {
        #[arg(long, help = "Override the listen address")]
        listen: Option<SocketAddr>,
    },
    #[command(about = "Run one batch simulation and print the report as JSON")]
    Batch {
        #[arg(long, value_name = "FILE", help = "Design JSON file")]
        design: PathBuf,
        #[arg(long, help = "Number of snapshots")]
        steps: Option<usize>,
        #[arg(long, help = "Step size in seconds")]
        time_step: Option<f64>,
        #[arg(long, help = "Seed for the noise source")]
        seed: Option<u64>,
    },
    #[command(about = "Print the component-type catalog as JSON")]
    Catalog,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/volta.toml"));
    let loaded = AppConfig::load_with_source(&candidates)?;

    match cli.command.unwrap_or(Commands::Serve { listen: None }) {
        Commands::Serve { listen } => {
            let mut config = loaded.config;
            if let Some(listen) = listen {
                config.server.listen = listen;
            }
            init_tracing("voltad", &config.logging)?;
            match &loaded.source {
                Some(path) => info!(path = %path.display(), "configuration loaded"),
                None => info!("no configuration file found; using defaults"),
            }
            serve(config).await?
        }
        Commands::Batch {
            design,
            steps,
            time_step,
            seed,
        } => {
            init_cli_tracing();
            let config = loaded.config;
            let design = read_design(&design)?;
            let noise = SeededNoise::factory(seed.or(config.simulation.seed));
            let service = BatchService::new(
                Arc::new(InMemoryDesignStore::new()),
                noise,
                BatchDefaults::from(&config.simulation),
            );
            let report = service.run_design(&design, BatchRequest { steps, time_step })?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Catalog => {
            println!("{}", serde_json::to_string_pretty(volta_sim::catalog())?);
        }
    }

    Ok(())
}

async fn serve(config: AppConfig) -> Result<()> {
    let store = Arc::new(InMemoryDesignStore::new());
    let directory = &config.designs.directory;
    if directory.is_dir() {
        store
            .load_dir(directory)
            .with_context(|| format!("failed to load designs from {}", directory.display()))?;
    } else {
        warn!(directory = %directory.display(), "design directory missing; starting with an empty store");
    }

    let noise = SeededNoise::factory(config.simulation.seed);
    let registry = SessionRegistry::new(
        store.clone(),
        noise.clone(),
        StreamConfig::from(&config.simulation),
    );
    let batch = BatchService::new(store.clone(), noise, BatchDefaults::from(&config.simulation));

    let server = ServerBuilder::new(config.server.listen, registry, batch)
        .with_observer_buffer(config.server.observer_buffer)
        .spawn()
        .await?;
    info!(
        address = %server.local_addr(),
        designs = store.len(),
        "daemon running; waiting for termination signal"
    );

    signal::ctrl_c().await?;
    info!("ctrl-c received; shutting down");
    server.shutdown().await?;
    Ok(())
}

fn read_design(path: &Path) -> Result<Design> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read design {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse design {}", path.display()))
}
