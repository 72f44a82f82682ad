//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source database connection (the desired schema shape).
    pub source: EndpointConfig,

    /// Target database connection (the schema to be transformed).
    pub target: EndpointConfig,

    /// Sync behavior configuration.
    #[serde(default)]
    pub sync: SyncConfig,
}

/// One PostgreSQL connection endpoint.
#[derive(Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 5432).
    #[serde(default = "default_pg_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password. Prefer the PGSYNC_SOURCE_PASSWORD / PGSYNC_TARGET_PASSWORD
    /// environment variables over putting this in the file.
    #[serde(default, skip_serializing)]
    pub password: String,

    /// Schema to compare (default: "public").
    #[serde(default = "default_public_schema")]
    pub schema: String,

    /// SSL mode: disable, require, verify-ca, verify-full (default: "require").
    #[serde(default = "default_require")]
    pub ssl_mode: String,
}

impl std::fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("schema", &self.schema)
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

impl EndpointConfig {
    /// Build a connection string for tokio-postgres.
    pub fn connection_string(&self) -> String {
        format!(
            "host={} port={} dbname={} user={} password={} sslmode={}",
            self.host, self.port, self.database, self.user, self.password, self.ssl_mode
        )
    }

    /// Short label for logs and error context, without credentials.
    pub fn label(&self) -> String {
        format!(
            "postgres://{}:{}/{}#{}",
            self.host, self.port, self.database, self.schema
        )
    }
}

/// Sync behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Output file for the generated script. None means stdout.
    #[serde(default)]
    pub output: Option<PathBuf>,

    /// Maximum connections per endpoint pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            output: None,
            max_connections: default_max_connections(),
        }
    }
}

fn default_pg_port() -> u16 {
    5432
}

fn default_public_schema() -> String {
    "public".to_string()
}

fn default_require() -> String {
    "require".to_string()
}

fn default_max_connections() -> usize {
    4
}
