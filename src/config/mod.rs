//! Configuration management for vault-ingest
//!
//! Settings are layered, lowest priority first:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables
//!
//! # Usage
//!
//! ```no_run
//! use vault_ingest::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Watching inbox: {}", config.ingest.inbox.display());
//! ```
//!
//! # Environment Variables
//!
//! Any key can be overridden with `VAULT_INGEST__<section>__<key>`:
//! - `VAULT_INGEST__INGEST__INBOX=/var/opt/ingest/inbox`
//! - `VAULT_INGEST__CATALOG__URL=http://catalog:20305/`
//! - `VAULT_INGEST__WORKERS__COUNT=4`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/vault-ingest.toml`.
//! This can be overridden using the `VAULT_INGEST_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use models::{
    CatalogConfig, Config, IngestConfig, PackageConfig, ServerConfig, ValidatorConfig,
    WorkersConfig,
};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the file is malformed or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
