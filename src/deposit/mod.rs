//! Deposits as they arrive in the inbox
//!
//! A deposit directory holds a `deposit.properties` file and exactly one bag
//! directory. [`DepositLoader`] turns such a directory into a [`Deposit`];
//! [`DepositManager`] persists its state back; [`Outbox`] moves it out of the
//! inbox once it reached a terminal state.

pub mod loader;
pub mod manager;
pub mod model;
pub mod outbox;
pub mod paths;
pub mod properties;

pub use loader::{CommonDepositLoader, DepositLoader};
pub use manager::DepositManager;
pub use model::{Author, Deposit, FileSource, MetadataFile, PayloadFile, State};
pub use outbox::{DirectoryOutbox, Outbox, OutboxError};
pub use properties::Properties;

use crate::bag::checksum::DigestAlgorithm;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const PROPERTIES_FILE: &str = "deposit.properties";

#[derive(Debug, Error)]
pub enum DepositError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no bag directory found in {0}")]
    NoBagDirectory(PathBuf),

    #[error("more than one bag directory found in {0}")]
    AmbiguousBagDirectory(PathBuf),

    #[error("required file is missing: {0}")]
    MissingFile(PathBuf),

    #[error("required property '{0}' is missing from deposit.properties")]
    MissingProperty(&'static str),

    #[error("invalid XML in {path}: {message}")]
    Xml { path: PathBuf, message: String },

    #[error("dataset metadata has no title")]
    MissingTitle,

    #[error("invalid payload path '{0}'")]
    InvalidPayloadPath(String),

    #[error("payload paths collide after normalization: '{0}'")]
    DuplicatePayloadPath(String),

    #[error("invalid deposit state: {0}")]
    InvalidState(String),

    #[error("bag id '{0}' cannot be used to name an archive")]
    InvalidBagId(String),

    #[error("invalid {algorithm} digest '{digest}' for {path}")]
    InvalidDigest {
        algorithm: DigestAlgorithm,
        path: String,
        digest: String,
    },
}

pub type Result<T> = std::result::Result<T, DepositError>;

pub(crate) fn io_error(path: &Path) -> impl FnOnce(io::Error) -> DepositError + '_ {
    move |source| DepositError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// The single subdirectory of a deposit directory
pub fn find_bag_dir(deposit_dir: &Path) -> Result<PathBuf> {
    let mut found = None;

    for entry in fs::read_dir(deposit_dir).map_err(io_error(deposit_dir))? {
        let entry = entry.map_err(io_error(deposit_dir))?;
        if !entry.path().is_dir() {
            continue;
        }
        if found.is_some() {
            return Err(DepositError::AmbiguousBagDirectory(deposit_dir.to_path_buf()));
        }
        found = Some(entry.path());
    }

    found.ok_or_else(|| DepositError::NoBagDirectory(deposit_dir.to_path_buf()))
}
