use uuid::Uuid;

pub const DEFAULT_NBN_PREFIX: &str = "urn:nbn:nl:ui:13-";

/// Source of fresh archival identifiers
pub trait IdMinter: Send + Sync {
    fn mint(&self) -> String;
}

/// URN:NBN minted from a random UUID
#[derive(Debug, Clone)]
pub struct UuidIdMinter {
    prefix: String,
}

impl UuidIdMinter {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for UuidIdMinter {
    fn default() -> Self {
        Self::new(DEFAULT_NBN_PREFIX)
    }
}

impl IdMinter for UuidIdMinter {
    fn mint(&self) -> String {
        format!("{}{}", self.prefix, Uuid::new_v4())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_mint_format() {
        let nbn = UuidIdMinter::default().mint();
        let uuid = nbn.strip_prefix(DEFAULT_NBN_PREFIX).unwrap();
        assert!(Uuid::parse_str(uuid).is_ok());
    }

    #[test]
    fn test_never_repeats() {
        let minter = UuidIdMinter::new("urn:test:");
        let minted: HashSet<String> = (0..1000).map(|_| minter.mint()).collect();
        assert_eq!(minted.len(), 1000);
    }
}
