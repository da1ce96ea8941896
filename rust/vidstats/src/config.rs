use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    net::{SocketAddr, ToSocketAddrs},
    time::Duration,
};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub database_url: String,
    pub max_pool_size: u32,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    vidstats_listen_addr: Option<String>,
    #[serde(default)]
    vidstats_listen_host: Option<String>,
    #[serde(default)]
    vidstats_listen_port: Option<u16>,
    #[serde(default)]
    vidstats_database_url: Option<String>,
    #[serde(default)]
    database_url: Option<String>,
    #[serde(default = "default_pool_size")]
    vidstats_max_pool_size: u32,
    #[serde(default)]
    vidstats_api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    vidstats_request_timeout_secs: u64,
}

const fn default_pool_size() -> u32 {
    10
}

const fn default_timeout_secs() -> u64 {
    30
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let raw: RawConfig =
            envy::from_env().context("failed to parse VIDSTATS_* environment variables")?;
        Self::from_raw(raw)
    }

    /// Configuration for running against a known database without a listener
    /// of its own, e.g. from tests.
    pub fn embedded(database_url: String) -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            database_url,
            max_pool_size: default_pool_size(),
            api_key: None,
            request_timeout: Duration::from_secs(default_timeout_secs()),
        }
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        let listen_addr = resolve_addr(
            raw.vidstats_listen_addr,
            raw.vidstats_listen_host,
            raw.vidstats_listen_port,
        )?;

        let database_url = raw
            .vidstats_database_url
            .or(raw.database_url)
            .context("VIDSTATS_DATABASE_URL or DATABASE_URL must be set")?;

        let api_key = raw
            .vidstats_api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        Ok(Self {
            listen_addr,
            database_url,
            max_pool_size: raw.vidstats_max_pool_size.max(1),
            api_key,
            request_timeout: Duration::from_secs(raw.vidstats_request_timeout_secs.max(1)),
        })
    }
}

fn resolve_addr(
    addr: Option<String>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<SocketAddr> {
    if let Some(addr) = addr {
        return addr
            .to_socket_addrs()
            .context("invalid VIDSTATS_LISTEN_ADDR value")?
            .next()
            .context("VIDSTATS_LISTEN_ADDR resolved to no addresses");
    }

    let host = host.unwrap_or_else(|| "0.0.0.0".to_string());
    let port = port.unwrap_or(8490);
    format!("{host}:{port}")
        .to_socket_addrs()
        .context("invalid listen host/port combination")?
        .next()
        .context("listen address resolved to no targets")
}
