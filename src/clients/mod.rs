//! Adapters for the services a conversion talks to

pub mod catalog;
pub mod http;
pub mod minter;
pub mod validator;

pub use catalog::{CatalogDeposit, CatalogError, HttpVaultCatalog, RegisteredDeposit, VaultCatalog};
pub use http::{HttpConfig, HttpError};
pub use minter::{DEFAULT_NBN_PREFIX, IdMinter, UuidIdMinter};
pub use validator::{BagValidator, HttpBagValidator, ValidatorError};
