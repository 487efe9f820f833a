use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    /// `None` selects the ephemeral in-memory ledger
    pub database: Option<DatabaseConfig>,
    pub cors: CorsConfig,
    pub frontend: FrontendConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub max_connections: u32,
    /// Upper bound for a single ledger operation, pool acquisition included
    pub timeout_ms: u64,
    /// Encrypt the connection without verifying the server certificate
    pub require_tls: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontendConfig {
    /// Directory holding the static site served for every non-API path
    pub static_dir: String,
}

impl DatabaseConfig {
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
    pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl DatabaseBackend {
    /// Pick the backend from the connection string scheme
    pub fn from_url(url: &str) -> Option<Self> {
        let url = url.to_ascii_lowercase();
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Some(Self::Postgres)
        } else if url.starts_with("sqlite:") {
            Some(Self::Sqlite)
        } else {
            None
        }
    }
}

impl CorsConfig {
    pub fn from_list(list: &str) -> Self {
        let allowed_origins = list
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(|origin| origin.trim_end_matches('/').to_string())
            .collect();

        Self { allowed_origins }
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|allowed| allowed == origin)
    }
}

fn requires_tls(url: &str) -> bool {
    let url = url.to_ascii_lowercase();
    url.contains("sslmode=require") || url.contains("ssl=true")
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = var("PORT").unwrap_or_else(|| "3000".to_string());
        let port = port
            .trim()
            .parse::<u16>()
            .with_context(|| format!("PORT must be a valid port number, got '{port}'"))?;

        let database = match var("DATABASE_URL").filter(|url| !url.trim().is_empty()) {
            Some(url) => {
                let url = url.trim().to_string();
                let Some(backend) = DatabaseBackend::from_url(&url) else {
                    bail!("DATABASE_URL must start with postgres://, postgresql:// or sqlite:");
                };

                let max_connections = var("DATABASE_MAX_CONNECTIONS")
                    .and_then(|v| v.trim().parse::<u32>().ok())
                    .filter(|n| *n > 0)
                    .unwrap_or(DatabaseConfig::DEFAULT_MAX_CONNECTIONS);
                let timeout_ms = var("DATABASE_TIMEOUT_MS")
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .filter(|ms| *ms > 0)
                    .unwrap_or(DatabaseConfig::DEFAULT_TIMEOUT_MS);
                let require_tls = backend == DatabaseBackend::Postgres && requires_tls(&url);

                Some(DatabaseConfig {
                    backend,
                    url,
                    max_connections,
                    timeout_ms,
                    require_tls,
                })
            }
            None => None,
        };

        let cors = var("ALLOWED_ORIGINS")
            .map(|list| CorsConfig::from_list(&list))
            .unwrap_or_default();

        let static_dir = var("STATIC_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .unwrap_or_else(|| "public".to_string());

        Ok(Config {
            server: ServerConfig { host, port },
            database,
            cors,
            frontend: FrontendConfig { static_dir },
        })
    }
}
