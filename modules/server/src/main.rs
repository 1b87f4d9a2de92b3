#![forbid(clippy::unwrap_used)]
#![forbid(unsafe_code)]
#![forbid(clippy::expect_used)]
#![forbid(clippy::panic)]

mod app;
mod config;

use clap::Parser;
use config::AppConfig;
use framework::sqlx::DatabaseProcessor;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "delivery-server", about = "Food delivery ordering API")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, env = "DELIVERY_CONFIG")]
    config: Option<PathBuf>,

    /// Skip applying pending migrations at start-up.
    #[arg(long)]
    no_migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    framework::telemetry::init(&config.log);
    info!(bind = %config.http.bind, "starting");

    let options = PgConnectOptions::from_str(&config.database.url)?.options([("timezone", "UTC")]);
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect_with(options)
        .await?;
    if !cli.no_migrate {
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("migrations applied");
    }

    let router = app::app(&config, DatabaseProcessor::new(pool))?;
    let listener = tokio::net::TcpListener::bind(config.http.bind).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(framework::shutdown::signal())
        .await?;
    info!("stopped");
    Ok(())
}
