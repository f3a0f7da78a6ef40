//! Superheroes API server
//!
//! Reads configuration from the environment, prepares the SQLite store and
//! serves until Ctrl+C or SIGTERM.

use anyhow::Context;
use superheroes_core::{build_server, Config, LogFormat, Store};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "superheroes=info,superheroes_core=info";

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let _ = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("invalid configuration")?;
    init_tracing(config.log_format);

    let store = Store::connect(&config.database_url, Some(config.max_connections))
        .await
        .with_context(|| format!("cannot open database {}", config.database_url))?;
    store
        .create_schema()
        .await
        .context("cannot create schema")?;
    if config.seed && store.seed().await.context("cannot seed database")? {
        info!("Seeded empty database");
    }

    let server = build_server(&store, config.server).context("cannot build routes")?;
    server.serve().await.context("server failed")?;

    store.close().await;
    info!("Shutdown complete");
    Ok(())
}
