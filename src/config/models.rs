use crate::bag::DigestAlgorithm;
use crate::clients::{DEFAULT_NBN_PREFIX, HttpConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub package: PackageConfig,
    #[serde(default)]
    pub validator: ValidatorConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub workers: WorkersConfig,
}

/// Health and metrics endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080))
}

/// Where deposits come from and where they go
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestConfig {
    #[serde(default = "default_inbox")]
    pub inbox: PathBuf,
    #[serde(default = "default_outbox")]
    pub outbox: PathBuf,
    #[serde(default = "default_bag_output_dir")]
    pub bag_output_dir: PathBuf,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Treat deposits with `Is-Version-Of` as updates of an existing dataset
    #[serde(default)]
    pub detect_updates: bool,
    /// Depositor id to data supplier name
    #[serde(default)]
    pub data_suppliers: HashMap<String, String>,
    #[serde(default = "default_nbn_prefix")]
    pub nbn_prefix: String,
}

impl IngestConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            inbox: default_inbox(),
            outbox: default_outbox(),
            bag_output_dir: default_bag_output_dir(),
            poll_interval_ms: default_poll_interval_ms(),
            detect_updates: false,
            data_suppliers: HashMap::new(),
            nbn_prefix: default_nbn_prefix(),
        }
    }
}

fn default_inbox() -> PathBuf {
    PathBuf::from("data/inbox")
}

fn default_outbox() -> PathBuf {
    PathBuf::from("data/outbox")
}

fn default_bag_output_dir() -> PathBuf {
    PathBuf::from("data/bags")
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_nbn_prefix() -> String {
    DEFAULT_NBN_PREFIX.to_string()
}

/// Archive contents
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PackageConfig {
    #[serde(default = "default_algorithms")]
    pub algorithms: Vec<DigestAlgorithm>,
    #[serde(default = "default_publisher")]
    pub publisher: String,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            algorithms: default_algorithms(),
            publisher: default_publisher(),
        }
    }
}

fn default_algorithms() -> Vec<DigestAlgorithm> {
    vec![DigestAlgorithm::Sha1, DigestAlgorithm::Md5]
}

fn default_publisher() -> String {
    "DANS".to_string()
}

/// Bag validation service
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ValidatorConfig {
    #[serde(default = "default_validator_url")]
    pub url: String,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl ValidatorConfig {
    pub fn http(&self) -> HttpConfig {
        http_config(
            self.connect_timeout_ms,
            self.request_timeout_ms,
            self.max_retries,
            self.retry_backoff_ms,
        )
    }
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            url: default_validator_url(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

fn default_validator_url() -> String {
    "http://localhost:20330/validate".to_string()
}

/// Vault catalog service
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_url")]
    pub url: String,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl CatalogConfig {
    pub fn http(&self) -> HttpConfig {
        http_config(
            self.connect_timeout_ms,
            self.request_timeout_ms,
            self.max_retries,
            self.retry_backoff_ms,
        )
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: default_catalog_url(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

fn default_catalog_url() -> String {
    "http://localhost:20305/".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_request_timeout_ms() -> u64 {
    60_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1_000
}

fn http_config(connect_ms: u64, request_ms: u64, max_retries: u32, backoff_ms: u64) -> HttpConfig {
    HttpConfig {
        connect_timeout: Duration::from_millis(connect_ms),
        request_timeout: Duration::from_millis(request_ms),
        max_retries,
        initial_backoff: Duration::from_millis(backoff_ms),
        ..HttpConfig::default()
    }
}

/// Worker pool sizing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkersConfig {
    #[serde(default = "default_worker_count")]
    pub count: usize,
    /// Deposits buffered per worker before the inbox waits
    #[serde(default = "default_channel_size")]
    pub channel_size: usize,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            count: default_worker_count(),
            channel_size: default_channel_size(),
        }
    }
}

fn default_worker_count() -> usize {
    2
}

fn default_channel_size() -> usize {
    16
}
