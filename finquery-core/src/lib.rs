//! FINQUERY Core - Pipeline Data Types
//!
//! Pure data structures shared by every other crate: the structured query
//! contract, tenant identity, the query result payload, the static schema
//! descriptor and the error taxonomy. This crate performs no I/O.

pub mod config;
pub mod error;
pub mod query;
pub mod result;
pub mod schema;
pub mod tenant;
pub mod validation;

pub use config::FinqueryConfig;
pub use error::{
    CacheError, ConfigError, FinqueryError, FinqueryResult, LlmError, QueryError,
    TranslationError, ValidationError,
};
pub use query::{Collection, Operation, StructuredQuery, TENANT_FIELD};
pub use result::QueryResult;
pub use schema::{CollectionSchema, FieldDescriptor, FieldKind, TransactionCategory};
pub use tenant::{TenantContext, TenantId, TenantInfo};
pub use validation::{validate_question, validate_tenant};

use chrono::{DateTime, Utc};

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// A single document returned by the document store.
pub type Record = serde_json::Value;
