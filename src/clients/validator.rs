use super::http::{HttpConfig, HttpError, check_status, with_retry};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ValidatorError {
    /// The bag itself is wrong; resubmitting the same bytes will not help
    #[error("bag is not compliant: {0}")]
    Invalid(String),

    #[error("validator unavailable: {0}")]
    Unavailable(#[from] HttpError),
}

/// Checks a bag directory before it is converted
#[async_trait]
pub trait BagValidator: Send + Sync {
    async fn validate(&self, bag_dir: &Path) -> Result<(), ValidatorError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidateCommand {
    bag_location: String,
    package_type: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResult {
    pub is_compliant: bool,
    #[serde(default)]
    pub rule_violations: Vec<RuleViolation>,
}

#[derive(Debug, Deserialize)]
pub struct RuleViolation {
    pub rule: String,
    pub violation: String,
}

impl ValidateResult {
    fn violations(&self) -> String {
        self.rule_violations
            .iter()
            .map(|v| format!("{}: {}", v.rule, v.violation))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Validator reached over HTTP (`POST` a bag location, get a compliance report)
pub struct HttpBagValidator {
    client: Client,
    url: Url,
    config: HttpConfig,
}

impl HttpBagValidator {
    pub fn new(url: &str, config: HttpConfig) -> Result<Self, HttpError> {
        let url = Url::parse(url).map_err(|e| HttpError::InvalidUrl(format!("{}: {}", url, e)))?;
        let client = config.build_client()?;
        Ok(Self {
            client,
            url,
            config,
        })
    }

    async fn validate_once(&self, command: &ValidateCommand) -> Result<ValidateResult, HttpError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(command)
            .send()
            .await
            .map_err(HttpError::from_reqwest)?;

        check_status(response)
            .await?
            .json::<ValidateResult>()
            .await
            .map_err(|e| HttpError::Decode(e.to_string()))
    }
}

#[async_trait]
impl BagValidator for HttpBagValidator {
    async fn validate(&self, bag_dir: &Path) -> Result<(), ValidatorError> {
        let location = std::path::absolute(bag_dir).unwrap_or_else(|_| bag_dir.to_path_buf());
        let command = ValidateCommand {
            bag_location: location.to_string_lossy().into_owned(),
            package_type: "DEPOSIT",
        };

        debug!(bag = %location.display(), "Validating bag");
        let command = &command;
        let result = with_retry(&self.config, "validate", move || self.validate_once(command)).await?;

        if result.is_compliant {
            info!(bag = %location.display(), "Bag is compliant");
            Ok(())
        } else {
            Err(ValidatorError::Invalid(result.violations()))
        }
    }
}
