use super::models::Config;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("At least one digest algorithm must be configured")]
    NoAlgorithms,

    #[error("Digest algorithm '{0}' is configured more than once")]
    DuplicateAlgorithm(String),

    #[error("Directories '{first}' and '{second}' must be distinct")]
    OverlappingDirectories { first: String, second: String },

    #[error("{field} must be positive")]
    NotPositive { field: &'static str },

    #[error("Invalid URL for {field}: '{url}', expected http:// or https://")]
    InvalidUrl { field: &'static str, url: String },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_package(config)?;
    validate_directories(config)?;
    validate_workers(config)?;
    validate_url("validator.url", &config.validator.url)?;
    validate_url("catalog.url", &config.catalog.url)?;
    Ok(())
}

fn validate_package(config: &Config) -> Result<(), ValidationError> {
    if config.package.algorithms.is_empty() {
        return Err(ValidationError::NoAlgorithms);
    }

    let mut seen = HashSet::new();
    for algorithm in &config.package.algorithms {
        if !seen.insert(algorithm) {
            return Err(ValidationError::DuplicateAlgorithm(algorithm.to_string()));
        }
    }

    Ok(())
}

/// Inbox, outbox and bag output must not be the same directory
fn validate_directories(config: &Config) -> Result<(), ValidationError> {
    let dirs: [&Path; 3] = [
        &config.ingest.inbox,
        &config.ingest.outbox,
        &config.ingest.bag_output_dir,
    ];

    for (i, first) in dirs.iter().enumerate() {
        for second in &dirs[i + 1..] {
            if first == second {
                return Err(ValidationError::OverlappingDirectories {
                    first: first.display().to_string(),
                    second: second.display().to_string(),
                });
            }
        }
    }

    Ok(())
}

fn validate_workers(config: &Config) -> Result<(), ValidationError> {
    if config.workers.count == 0 {
        return Err(ValidationError::NotPositive {
            field: "workers.count",
        });
    }
    if config.workers.channel_size == 0 {
        return Err(ValidationError::NotPositive {
            field: "workers.channel_size",
        });
    }
    if config.ingest.poll_interval_ms == 0 {
        return Err(ValidationError::NotPositive {
            field: "ingest.poll_interval_ms",
        });
    }
    Ok(())
}

fn validate_url(field: &'static str, url: &str) -> Result<(), ValidationError> {
    let scheme = url.split("://").next().unwrap_or_default();
    if url.contains("://") && matches!(scheme, "http" | "https") {
        Ok(())
    } else {
        Err(ValidationError::InvalidUrl {
            field,
            url: url.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bag::DigestAlgorithm;
    use std::path::PathBuf;

    #[test]
    fn test_valid_config() {
        let config = Config::default();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_no_algorithms() {
        let mut config = Config::default();
        config.package.algorithms.clear();

        let result = validate(&config);
        assert!(matches!(result, Err(ValidationError::NoAlgorithms)));
    }

    #[test]
    fn test_duplicate_algorithm() {
        let mut config = Config::default();
        config.package.algorithms = vec![DigestAlgorithm::Md5, DigestAlgorithm::Md5];

        let result = validate(&config);
        assert!(matches!(result, Err(ValidationError::DuplicateAlgorithm(a)) if a == "md5"));
    }

    #[test]
    fn test_inbox_equals_outbox() {
        let mut config = Config::default();
        config.ingest.outbox = PathBuf::from("data/inbox");

        let result = validate(&config);
        assert!(matches!(
            result,
            Err(ValidationError::OverlappingDirectories { .. })
        ));
    }

    #[test]
    fn test_zero_workers() {
        let mut config = Config::default();
        config.workers.count = 0;

        let result = validate(&config);
        assert!(matches!(
            result,
            Err(ValidationError::NotPositive {
                field: "workers.count"
            })
        ));
    }

    #[test]
    fn test_invalid_catalog_scheme() {
        let mut config = Config::default();
        config.catalog.url = "ftp://catalog:20305".to_string();

        let result = validate(&config);
        assert!(matches!(
            result,
            Err(ValidationError::InvalidUrl {
                field: "catalog.url",
                ..
            })
        ));
    }
}
