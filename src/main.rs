//! fragcache - maintenance tool for a file-backed fragment cache
//!
//! Flushes names, inspects key registries and resolved configuration, and
//! purges expired entries. Cooperates with running applications through the
//! same advisory lock file.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fragcache::{CacheFacade, ConfigMap, FacadeSettings, FileStore};

#[derive(Debug, Parser)]
#[command(name = "fragcache", version, about = "Fragment cache maintenance")]
struct Cli {
    /// Directory of the file store
    #[arg(long, env = "FRAGCACHE_STORE_DIR")]
    store_dir: Option<PathBuf>,

    /// JSON file mapping names to their cache options
    #[arg(long, env = "FRAGCACHE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Delete every key registered under a name
    Flush { name: String },
    /// Delete everything in the store
    FlushAll,
    /// List the keys registered under a name with their key information
    Keys { name: String },
    /// Print the combined configuration of a name
    Config { name: String },
    /// Remove expired entries from the store
    PurgeExpired,
}

/// Entry point for the maintenance tool.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load facade settings from environment variables
/// 3. Open the file store and the config map
/// 4. Run the requested command
fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fragcache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let settings = FacadeSettings::from_env();
    let store_dir = cli
        .store_dir
        .unwrap_or_else(|| env::temp_dir().join("fragcache-store"));
    let store = FileStore::open(&store_dir)
        .with_context(|| format!("opening store at {}", store_dir.display()))?;
    let config_map = match &cli.config {
        Some(path) => ConfigMap::from_path(path)
            .with_context(|| format!("loading config map {}", path.display()))?,
        None => ConfigMap::new(),
    };
    info!(
        "Store at {}, lock at {}, {} configured names",
        store_dir.display(),
        settings.lock_path.display(),
        config_map.len()
    );

    let facade = CacheFacade::with_settings(Arc::new(store.clone()), config_map, settings);

    match cli.command {
        Command::Flush { name } => {
            if !facade.flush_by_name(&name) {
                bail!("flushing {name} failed, see log for details");
            }
            info!("Flushed all keys of {}", name);
        }
        Command::FlushAll => {
            if !facade.flush_all() {
                bail!("flushing the store failed, see log for details");
            }
            info!("Flushed store");
        }
        Command::Keys { name } => {
            let registry = facade.registry(&name)?;
            for key in registry.keys() {
                match registry.information(&key) {
                    Some(Value::Bool(true)) | None => println!("{key}"),
                    Some(information) => println!("{key}\t{information}"),
                }
            }
        }
        Command::Config { name } => {
            let options = facade.combined_config(&name)?;
            println!("{}", serde_json::to_string_pretty(&options)?);
        }
        Command::PurgeExpired => {
            let removed = store.purge_expired()?;
            info!("Purged {} expired entries", removed);
        }
    }

    Ok(())
}
