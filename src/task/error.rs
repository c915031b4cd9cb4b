use crate::bag::{ArchiveError, AssemblyError};
use crate::clients::{CatalogError, ValidatorError};
use crate::deposit::{DepositError, OutboxError, State};
use thiserror::Error;

/// Why a conversion did not end in ACCEPTED, reduced to the two terminal
/// outcomes a deposit can have
#[derive(Debug, Error)]
pub enum ConversionError {
    /// Caused by the deposit's content; resubmission is needed
    #[error("{0}")]
    ContentInvalid(String),

    /// Internal or environmental failure; the deposit may be retried as is
    #[error("{0}")]
    SystemFailure(String),
}

impl ConversionError {
    pub fn state(&self) -> State {
        match self {
            ConversionError::ContentInvalid(_) => State::Rejected,
            ConversionError::SystemFailure(_) => State::Failed,
        }
    }
}

impl From<ValidatorError> for ConversionError {
    fn from(e: ValidatorError) -> Self {
        match e {
            ValidatorError::Invalid(detail) => {
                ConversionError::ContentInvalid(format!("Bag is not valid: {}", detail))
            }
            ValidatorError::Unavailable(e) => {
                ConversionError::SystemFailure(format!("Validation could not be performed: {}", e))
            }
        }
    }
}

impl From<DepositError> for ConversionError {
    fn from(e: DepositError) -> Self {
        ConversionError::SystemFailure(format!("Error loading deposit: {}", e))
    }
}

impl From<CatalogError> for ConversionError {
    fn from(e: CatalogError) -> Self {
        ConversionError::SystemFailure(format!("Vault catalog error: {}", e))
    }
}

impl From<AssemblyError> for ConversionError {
    fn from(e: AssemblyError) -> Self {
        ConversionError::SystemFailure(format!("Error writing bag: {}", e))
    }
}

impl From<ArchiveError> for ConversionError {
    fn from(e: ArchiveError) -> Self {
        AssemblyError::from(e).into()
    }
}

impl From<OutboxError> for ConversionError {
    fn from(e: OutboxError) -> Self {
        ConversionError::SystemFailure(format!("Error moving deposit: {}", e))
    }
}

impl From<tokio::task::JoinError> for ConversionError {
    fn from(e: tokio::task::JoinError) -> Self {
        ConversionError::SystemFailure(format!("Blocking task failed: {}", e))
    }
}
