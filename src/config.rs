//! Process configuration from the environment.

use crate::error::ConfigError;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_RESOURCE_SCHEMA: &str = "public";
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 1024 * 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    /// `None` means in-memory repositories.
    pub database_url: Option<String>,
    pub bind_addr: SocketAddr,
    /// PostgreSQL schema holding entity tables.
    pub resource_schema: String,
    pub db_max_connections: u32,
    pub body_limit_bytes: usize,
}

impl ServerConfig {
    /// Read `DATABASE_URL`, `BIND_ADDR`, `RESOURCE_SCHEMA`, `DB_MAX_CONNECTIONS` and
    /// `BODY_LIMIT_BYTES`, after loading a `.env` file when one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let bind_addr = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into());
        Ok(ServerConfig {
            database_url: get("DATABASE_URL"),
            bind_addr: bind_addr
                .parse()
                .map_err(|e| ConfigError::Env(format!("BIND_ADDR '{}': {}", bind_addr, e)))?,
            resource_schema: get("RESOURCE_SCHEMA").unwrap_or_else(|| DEFAULT_RESOURCE_SCHEMA.into()),
            db_max_connections: number(get("DB_MAX_CONNECTIONS"), "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?,
            body_limit_bytes: number(get("BODY_LIMIT_BYTES"), "BODY_LIMIT_BYTES", DEFAULT_BODY_LIMIT_BYTES)?,
        })
    }

    /// Connection pool when a database is configured.
    pub async fn connect(&self) -> Result<Option<PgPool>, sqlx::Error> {
        let Some(url) = &self.database_url else {
            return Ok(None);
        };
        let pool = PgPoolOptions::new()
            .max_connections(self.db_max_connections)
            .connect(url)
            .await?;
        Ok(Some(pool))
    }
}

fn number<N: std::str::FromStr>(raw: Option<String>, key: &str, default: N) -> Result<N, ConfigError>
where
    N::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(v) => v
            .parse()
            .map_err(|e| ConfigError::Env(format!("{} '{}': {}", key, v, e))),
    }
}

/// Install the global `tracing` subscriber. `RUST_LOG` wins over `default_directives`.
pub fn init_tracing(default_directives: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
