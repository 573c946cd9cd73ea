use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use geofencing::cache::GeofenceCache;
use geofencing::config::Config;
use geofencing::storage::SqliteStore;

#[derive(Parser)]
#[command(
    name = "geofencing",
    version,
    about = "Inspect and maintain the persisted geofence registration cache",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (TOML); environment variables are used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format; overrides `logging.format` from the config
    #[arg(long, global = true, value_parser = ["text", "json"])]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List ids of cached geofences
    Ids,

    /// Print the cached spec of one geofence
    Show {
        /// Geofence id
        id: String,
    },

    /// Set the dispatcher token
    Init {
        /// Dispatcher token
        #[arg(allow_hyphen_values = true)]
        token: i64,
    },

    /// Print the dispatcher token
    Token,

    /// Show what reboot recovery would replay
    Plan,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    config.validate()?;

    let log_format = cli.log_format.as_deref().unwrap_or(&config.logging.format);
    setup_tracing(&config.logging.filter_directive(cli.verbose), log_format)?;

    let store = SqliteStore::open(&config.storage.sqlite_path, config.storage.namespace.clone())
        .with_context(|| {
            format!(
                "Failed to open geofence store: {}",
                config.storage.sqlite_path.display()
            )
        })?;
    let cache = Arc::new(GeofenceCache::new(store));

    tracing::debug!(path = %config.storage.sqlite_path.display(), "Opened geofence cache");

    match cli.command {
        Commands::Ids => ids(&cache).await?,
        Commands::Show { id } => show(&cache, &id).await?,
        Commands::Init { token } => init(&cache, token).await?,
        Commands::Token => token(&cache).await?,
        Commands::Plan => plan(&cache).await?,
    }

    Ok(())
}

fn setup_tracing(directive: &str, format: &str) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_new(directive)
        .with_context(|| format!("Invalid log filter: {directive}"))?;

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}

async fn ids(cache: &GeofenceCache) -> Result<()> {
    let mut ids: Vec<String> = cache.list_ids().await?.into_iter().collect();
    ids.sort();
    for id in ids {
        println!("{id}");
    }
    Ok(())
}

async fn show(cache: &GeofenceCache, id: &str) -> Result<()> {
    match cache.get(id).await? {
        Some(spec) => println!("{}", serde_json::to_string_pretty(&spec.to_args())?),
        None => anyhow::bail!("No cached geofence with id '{id}'"),
    }
    Ok(())
}

async fn init(cache: &GeofenceCache, token: i64) -> Result<()> {
    cache.set_dispatcher_token(token).await?;
    tracing::info!(dispatcher_token = token, "Dispatcher token stored");
    Ok(())
}

async fn token(cache: &GeofenceCache) -> Result<()> {
    match cache.dispatcher_token().await? {
        Some(token) => println!("{token}"),
        None => println!("(not initialized)"),
    }
    Ok(())
}

async fn plan(cache: &GeofenceCache) -> Result<()> {
    let snapshot = cache.snapshot().await?;

    println!("Replay on reboot: {} geofence(s)", snapshot.specs.len());
    for spec in &snapshot.specs {
        println!(
            "  {} ({:.6}, {:.6}) r={}m triggers={} expires={}",
            spec.id,
            spec.center.latitude,
            spec.center.longitude,
            spec.radius_meters,
            spec.transition_triggers,
            spec.expiration
                .duration()
                .map(|d| format!("{}s", d.as_secs()))
                .unwrap_or_else(|| "never".to_string()),
        );
    }

    if !snapshot.gaps.is_empty() {
        println!("Skipped: {} id(s)", snapshot.gaps.len());
        for gap in &snapshot.gaps {
            println!("  {gap}");
        }
    }

    Ok(())
}
