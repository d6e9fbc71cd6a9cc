//! Configuration management
//!
//! Layered: built-in defaults, then an optional `config/default.toml`, then
//! `QUILL_*` environment variables (`__` separates sections, so
//! `QUILL_STORE__URL` sets `store.url`). A `.env` file is read first if present.

use std::net::SocketAddr;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Error;
use crate::server::DEFAULT_BODY_LIMIT;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub store: StoreSettings,
    #[serde(default)]
    pub session: SessionSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Largest request body accepted, in bytes.
    pub max_body: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreSettings {
    /// `memory://` or `file://PATH`.
    pub url: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SessionSettings {
    /// Cookie-signing secret. Generated per process when absent.
    pub secret: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, Error> {
        // A missing .env is the normal case outside development.
        let _ = dotenvy::dotenv();
        Self::from_sources(env_source())
    }

    fn from_sources(env: Environment) -> Result<Self, Error> {
        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5000_i64)?
            .set_default("server.max_body", DEFAULT_BODY_LIMIT as i64)?
            .set_default("store.url", "memory://")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(env)
            .build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, Error> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| Error::Setting {
                key: "server.host",
                reason: e.to_string(),
            })
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("QUILL")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
