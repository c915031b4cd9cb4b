use super::http::{HttpConfig, HttpError, check_status, with_retry, with_retry_if};
use crate::deposit::Deposit;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Http(#[from] HttpError),

    #[error("deposit {0} has no archival identifier to register")]
    MissingIdentifier(String),
}

/// A deposit as recorded in the vault catalog
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDeposit {
    pub nbn: String,
    pub data_supplier: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredDeposit {
    pub object_version: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterDepositCommand<'a> {
    nbn: &'a str,
    bag_id: String,
    sword_token: String,
    data_supplier: &'a str,
    depositor: &'a str,
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    doi: Option<&'a str>,
}

/// Service of record for archival identifiers and their versions
#[async_trait]
pub trait VaultCatalog: Send + Sync {
    /// Look up an earlier deposit by its reference token
    async fn find_predecessor(&self, token: &str) -> Result<Option<CatalogDeposit>, CatalogError>;

    /// Register a new version under the deposit's NBN
    async fn register(&self, deposit: &Deposit) -> Result<RegisteredDeposit, CatalogError>;
}

pub struct HttpVaultCatalog {
    client: Client,
    base_url: Url,
    config: HttpConfig,
}

impl HttpVaultCatalog {
    pub fn new(base_url: &str, config: HttpConfig) -> Result<Self, HttpError> {
        let base_url =
            Url::parse(base_url).map_err(|e| HttpError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(HttpError::InvalidUrl(base_url.to_string()));
        }

        let client = config.build_client()?;
        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, HttpError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| HttpError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn find_once(&self, url: &Url) -> Result<Option<CatalogDeposit>, HttpError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(HttpError::from_reqwest)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        check_status(response)
            .await?
            .json::<CatalogDeposit>()
            .await
            .map(Some)
            .map_err(|e| HttpError::Decode(e.to_string()))
    }

    async fn register_once(
        &self,
        url: &Url,
        command: &RegisterDepositCommand<'_>,
    ) -> Result<RegisteredDeposit, HttpError> {
        let response = self
            .client
            .post(url.clone())
            .json(command)
            .send()
            .await
            .map_err(HttpError::from_reqwest)?;

        check_status(response)
            .await?
            .json::<RegisteredDeposit>()
            .await
            .map_err(|e| HttpError::Decode(e.to_string()))
    }
}

#[async_trait]
impl VaultCatalog for HttpVaultCatalog {
    async fn find_predecessor(&self, token: &str) -> Result<Option<CatalogDeposit>, CatalogError> {
        let url = self.endpoint(&["deposits", token])?;
        let url = &url;

        debug!(token, "Looking up predecessor in catalog");
        let found = with_retry(&self.config, "find_predecessor", move || self.find_once(url)).await?;
        Ok(found)
    }

    async fn register(&self, deposit: &Deposit) -> Result<RegisteredDeposit, CatalogError> {
        let nbn = deposit
            .nbn
            .as_deref()
            .ok_or_else(|| CatalogError::MissingIdentifier(deposit.id.clone()))?;

        let command = RegisterDepositCommand {
            nbn,
            bag_id: deposit.bag_id(),
            sword_token: deposit.reference_token(),
            data_supplier: deposit.supplier(),
            depositor: &deposit.depositor_id,
            title: &deposit.title,
            doi: deposit.doi.as_deref(),
        };
        let url = self.endpoint(&["deposits"])?;
        let (url, command) = (&url, &command);

        // Registering is not idempotent; only retry when nothing was sent
        let registered = with_retry_if(&self.config, "register", HttpError::is_connect, move || {
            self.register_once(url, command)
        })
        .await?;

        info!(
            deposit_id = %deposit.id,
            nbn,
            object_version = registered.object_version,
            "Deposit registered in catalog"
        );
        Ok(registered)
    }
}
