//! Configuration validation.

use super::Config;
use crate::error::{Result, SyncError};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    for (side, endpoint) in [("source", &config.source), ("target", &config.target)] {
        if endpoint.host.is_empty() {
            return Err(SyncError::Config(format!("{}.host is required", side)));
        }
        if endpoint.database.is_empty() {
            return Err(SyncError::Config(format!("{}.database is required", side)));
        }
        if endpoint.user.is_empty() {
            return Err(SyncError::Config(format!("{}.user is required", side)));
        }
        if endpoint.schema.is_empty() {
            return Err(SyncError::Config(format!("{}.schema is required", side)));
        }
    }

    // Comparing a schema against itself always yields an empty script.
    if config.source.host == config.target.host
        && config.source.port == config.target.port
        && config.source.database == config.target.database
        && config.source.schema == config.target.schema
    {
        return Err(SyncError::Config(
            "source and target cannot be the same schema of the same database".into(),
        ));
    }

    if config.sync.max_connections == 0 {
        return Err(SyncError::Config(
            "sync.max_connections must be at least 1".into(),
        ));
    }

    Ok(())
}
