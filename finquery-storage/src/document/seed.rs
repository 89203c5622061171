//! JSON seed data for the in-memory document store.
//!
//! A seed file is one JSON object keyed by collection name:
//!
//! ```json
//! {
//!   "users": [{ "id": "user_1", "name": "Asha" }],
//!   "bank_transactions": [{ "id": "t1", "tenantId": "user_1", "amount": 2500, ... }],
//!   "mutual_fund_holdings": [],
//!   "equity_holdings": []
//! }
//! ```

use std::path::{Path, PathBuf};

use finquery_core::{Collection, Record, TENANT_FIELD};
use serde::Deserialize;

/// Errors loading seed data.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Failed to read seed file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse seed data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid document in {collection}: {reason}")]
    InvalidDocument {
        collection: Collection,
        reason: String,
    },
}

/// Documents for each of the four collections.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedData {
    #[serde(default)]
    pub users: Vec<Record>,
    #[serde(default)]
    pub bank_transactions: Vec<Record>,
    #[serde(default)]
    pub mutual_fund_holdings: Vec<Record>,
    #[serde(default)]
    pub equity_holdings: Vec<Record>,
}

const DEMO_SEED: &str = include_str!("../../data/demo_seed.json");

impl SeedData {
    /// Parse and validate seed data from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, SeedError> {
        let seed: SeedData = serde_json::from_str(json)?;
        seed.validate()?;
        Ok(seed)
    }

    /// Read and validate a seed file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SeedError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Built-in demo data: three users with transactions and holdings.
    pub fn demo() -> Result<Self, SeedError> {
        Self::from_json_str(DEMO_SEED)
    }

    pub fn documents(&self, collection: Collection) -> &[Record] {
        match collection {
            Collection::Users => &self.users,
            Collection::BankTransactions => &self.bank_transactions,
            Collection::MutualFundHoldings => &self.mutual_fund_holdings,
            Collection::EquityHoldings => &self.equity_holdings,
        }
    }

    /// Every document must be an object; tenant-owned documents must carry a
    /// string tenant id.
    fn validate(&self) -> Result<(), SeedError> {
        for collection in Collection::ALL {
            for (i, doc) in self.documents(collection).iter().enumerate() {
                let invalid = |reason: String| SeedError::InvalidDocument { collection, reason };
                if !doc.is_object() {
                    return Err(invalid(format!("document {} is not an object", i)));
                }
                if collection.is_tenant_scoped()
                    && !doc.get(TENANT_FIELD).is_some_and(|t| t.is_string())
                {
                    return Err(invalid(format!(
                        "document {} has no string {}",
                        i, TENANT_FIELD
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_seed_is_valid() {
        let seed = SeedData::demo().unwrap();
        assert!(!seed.users.is_empty());
        assert!(!seed.bank_transactions.is_empty());
        assert!(!seed.equity_holdings.is_empty());
    }

    #[test]
    fn test_missing_collections_default_to_empty() {
        let seed = SeedData::from_json_str(r#"{ "users": [{ "id": "u", "name": "U" }] }"#).unwrap();
        assert_eq!(seed.users.len(), 1);
        assert!(seed.documents(Collection::EquityHoldings).is_empty());
    }

    #[test]
    fn test_tenant_owned_document_without_tenant_rejected() {
        let err = SeedData::from_json_str(r#"{ "bank_transactions": [{ "id": "t1", "amount": 5 }] }"#)
            .unwrap_err();
        assert!(matches!(
            err,
            SeedError::InvalidDocument {
                collection: Collection::BankTransactions,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_collection_rejected() {
        assert!(matches!(
            SeedData::from_json_str(r#"{ "accounts": [] }"#),
            Err(SeedError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            SeedData::from_path("/definitely/not/here.json"),
            Err(SeedError::Io { .. })
        ));
    }
}
