use anyhow::Context;
use serde::Deserialize;

/// Work factor used when `PASSWORD_HASH_COST` is not set.
pub const DEFAULT_HASH_COST: u32 = 12;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub password_hash_cost: u32,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);
        let password_hash_cost = match std::env::var("PASSWORD_HASH_COST") {
            Ok(v) => v
                .parse::<u32>()
                .context("PASSWORD_HASH_COST must be a positive integer")?,
            Err(_) => DEFAULT_HASH_COST,
        };
        if password_hash_cost == 0 {
            anyhow::bail!("PASSWORD_HASH_COST must be at least 1");
        }
        let host = std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = std::env::var("APP_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(8080);

        Ok(Self {
            database_url,
            max_connections,
            password_hash_cost,
            host,
            port,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
