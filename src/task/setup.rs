use super::conversion::ConversionTask;
use crate::bag::PackageAssembler;
use crate::clients::{HttpBagValidator, HttpError, HttpVaultCatalog, UuidIdMinter};
use crate::config::Config;
use crate::deposit::{CommonDepositLoader, DepositManager, DirectoryOutbox, OutboxError};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Cannot prepare outbox: {0}")]
    Outbox(#[from] OutboxError),

    #[error("Cannot create HTTP client: {0}")]
    Http(#[from] HttpError),

    #[error("Cannot create bag output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ConversionTask {
    /// Wire the task to the directories and services named in `config`
    pub fn from_config(config: &Config) -> Result<Self, SetupError> {
        let ingest = &config.ingest;

        std::fs::create_dir_all(&ingest.bag_output_dir).map_err(|source| SetupError::OutputDir {
            path: ingest.bag_output_dir.clone(),
            source,
        })?;

        let loader = CommonDepositLoader::new(ingest.detect_updates, ingest.data_suppliers.clone());
        let outbox = DirectoryOutbox::new(ingest.outbox.clone())?;
        let validator = HttpBagValidator::new(&config.validator.url, config.validator.http())?;
        let catalog = HttpVaultCatalog::new(&config.catalog.url, config.catalog.http())?;

        info!(
            outbox = %ingest.outbox.display(),
            bags = %ingest.bag_output_dir.display(),
            validator = %config.validator.url,
            catalog = %config.catalog.url,
            "Conversion task configured"
        );

        Ok(ConversionTask::builder()
            .manager(DepositManager::new(Arc::new(loader)))
            .outbox(Arc::new(outbox))
            .validator(Arc::new(validator))
            .catalog(Arc::new(catalog))
            .minter(Arc::new(UuidIdMinter::new(ingest.nbn_prefix.clone())))
            .assembler(PackageAssembler::new(
                config.package.algorithms.clone(),
                config.package.publisher.clone(),
            ))
            .output_dir(ingest.bag_output_dir.clone())
            .build())
    }
}
