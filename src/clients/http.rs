//! Shared HTTP plumbing for the external services

use reqwest::{Client, Response};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Could not connect: {0}")]
    Connect(String),

    #[error("Connection timeout")]
    Timeout,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response body: {0}")]
    Decode(String),
}

impl HttpError {
    /// Worth another attempt: connection problems, timeouts, 5xx and 429
    pub fn is_transient(&self) -> bool {
        match self {
            HttpError::RequestFailed(_) | HttpError::Connect(_) | HttpError::Timeout => true,
            HttpError::Status { status, .. } => *status >= 500 || *status == 429,
            HttpError::InvalidUrl(_) | HttpError::Decode(_) => false,
        }
    }

    /// The request never reached the server
    pub fn is_connect(&self) -> bool {
        matches!(self, HttpError::Connect(_))
    }

    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_connect() {
            HttpError::Connect(e.to_string())
        } else if e.is_timeout() {
            HttpError::Timeout
        } else if e.is_decode() {
            HttpError::Decode(e.to_string())
        } else {
            HttpError::RequestFailed(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, HttpError>;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Additional attempts after the first one fails transiently
    pub max_retries: u32,
    /// Delay before the first retry, doubled for each further one
    pub initial_backoff: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            user_agent: concat!("vault-ingest/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpConfig {
    pub fn build_client(&self) -> Result<Client> {
        Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .user_agent(&self.user_agent)
            .build()
            .map_err(|e| HttpError::RequestFailed(e.to_string()))
    }
}

/// Run `request` until it succeeds, fails permanently or runs out of retries
pub async fn with_retry<T, F, Fut>(config: &HttpConfig, operation: &str, request: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    with_retry_if(config, operation, HttpError::is_transient, request).await
}

/// Like [`with_retry`], retrying only the errors `retryable` accepts
pub async fn with_retry_if<T, F, Fut>(
    config: &HttpConfig,
    operation: &str,
    retryable: fn(&HttpError) -> bool,
    mut request: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;

        match request().await {
            Ok(value) => {
                if attempts > 1 {
                    debug!(operation, attempts, "Request succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if retryable(&e) && attempts <= config.max_retries => {
                warn!(operation, attempts, error = %e, "Request failed, retrying");

                // Exponential backoff: 1x, 2x, 4x, ...
                let backoff = config.initial_backoff * 2u32.saturating_pow(attempts - 1);
                tokio::time::sleep(backoff).await;
            }
            Err(e) => {
                warn!(operation, attempts, error = %e, "Request failed");
                return Err(e);
            }
        }
    }
}

/// Turn a non-2xx response into [`HttpError::Status`]
pub async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(HttpError::Status {
        status: status.as_u16(),
        body: if body.is_empty() {
            status.canonical_reason().unwrap_or("Unknown").to_string()
        } else {
            body
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config(max_retries: u32) -> HttpConfig {
        HttpConfig {
            max_retries,
            initial_backoff: Duration::from_millis(1),
            ..HttpConfig::default()
        }
    }

    #[test]
    fn test_http_config_defaults() {
        let config = HttpConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.max_retries, 3);
        assert!(config.user_agent.starts_with("vault-ingest/"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(HttpError::Timeout.is_transient());
        assert!(HttpError::Status { status: 503, body: String::new() }.is_transient());
        assert!(HttpError::Status { status: 429, body: String::new() }.is_transient());
        assert!(!HttpError::Status { status: 400, body: String::new() }.is_transient());
        assert!(!HttpError::Decode("bad".into()).is_transient());
        assert!(HttpError::Connect("refused".into()).is_transient());
        assert!(HttpError::Connect("refused".into()).is_connect());
        assert!(!HttpError::Timeout.is_connect());
    }

    #[tokio::test]
    async fn test_retry_if_only_retries_accepted_errors() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<()> = with_retry_if(&fast_config(3), "test", HttpError::is_connect, || async move {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(HttpError::Connect("refused".into()))
            } else {
                Err(HttpError::Timeout)
            }
        })
        .await;

        assert!(matches!(result, Err(HttpError::Timeout)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_until_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = with_retry(&fast_config(3), "test", || async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(HttpError::Timeout)
            } else {
                Ok(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<()> = with_retry(&fast_config(2), "test", || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(HttpError::RequestFailed("refused".into()))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<()> = with_retry(&fast_config(5), "test", || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(HttpError::Status { status: 400, body: "bad".into() })
        })
        .await;

        assert!(matches!(result, Err(HttpError::Status { status: 400, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
