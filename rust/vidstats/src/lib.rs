pub mod config;
pub mod db;
pub mod error;
pub mod query;
pub mod range;
pub mod request;
pub mod schema;
pub mod server;
pub mod state;
pub mod telemetry;

use crate::{config::AppConfig, server::Server};

/// Bootstraps the analytics service using environment configuration.
pub async fn run() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    Server::new(config).await?.run().await
}
