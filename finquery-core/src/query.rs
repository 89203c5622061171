//! The structured query contract between the translation collaborator and
//! the rest of the pipeline.
//!
//! A `StructuredQuery` is produced by a probabilistic external process and
//! is untrusted until it has passed the isolation guard and the executor.
//! `collection` and `operation` are therefore kept as the raw strings the
//! collaborator produced; [`StructuredQuery::collection_kind`] and
//! [`StructuredQuery::operation_kind`] are the only way to turn them into the
//! closed enums, and they fail with the offending value.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::QueryError;

/// Document field carrying the owning tenant's identifier.
pub const TENANT_FIELD: &str = "tenantId";

/// The fixed allow-list of collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Users,
    BankTransactions,
    MutualFundHoldings,
    EquityHoldings,
}

impl Collection {
    /// Every allow-listed collection.
    pub const ALL: [Collection; 4] = [
        Collection::Users,
        Collection::BankTransactions,
        Collection::MutualFundHoldings,
        Collection::EquityHoldings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::BankTransactions => "bank_transactions",
            Collection::MutualFundHoldings => "mutual_fund_holdings",
            Collection::EquityHoldings => "equity_holdings",
        }
    }

    /// Parse a collection name. Exact match only.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }

    /// Whether rows in this collection belong to a single tenant.
    ///
    /// `users` is the only globally readable collection.
    pub fn is_tenant_scoped(&self) -> bool {
        !matches!(self, Collection::Users)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three supported query shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Find,
    FindOne,
    Aggregate,
}

impl Operation {
    pub const ALL: [Operation; 3] = [Operation::Find, Operation::FindOne, Operation::Aggregate];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Find => "find",
            Operation::FindOne => "find_one",
            Operation::Aggregate => "aggregate",
        }
    }

    /// Parse an operation name. `findOne` is accepted as an alias of
    /// `find_one` since document-store drivers commonly spell it that way.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "find" => Some(Operation::Find),
            "find_one" | "findOne" => Some(Operation::FindOne),
            "aggregate" => Some(Operation::Aggregate),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A machine-readable query over one of the four collections.
///
/// Exactly one of `filter` (for `find`/`find_one`) or `pipeline` (for
/// `aggregate`) is meaningful; the other is ignored by the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct StructuredQuery {
    /// Target collection, as produced by the translator.
    pub collection: String,

    /// Query shape, as produced by the translator.
    pub operation: String,

    /// Field predicates for `find`/`find_one`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub filter: Option<Map<String, Value>>,

    /// Optional field restriction for `find`/`find_one`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub projection: Option<Map<String, Value>>,

    /// Ordered aggregation stages for `aggregate`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Vec<Object>>))]
    pub pipeline: Option<Vec<Value>>,
}

impl StructuredQuery {
    /// A `find` query with the given filter.
    pub fn find(collection: Collection, filter: Map<String, Value>) -> Self {
        Self {
            collection: collection.as_str().to_string(),
            operation: Operation::Find.as_str().to_string(),
            filter: Some(filter),
            projection: None,
            pipeline: None,
        }
    }

    /// A `find_one` query with the given filter.
    pub fn find_one(collection: Collection, filter: Map<String, Value>) -> Self {
        Self {
            operation: Operation::FindOne.as_str().to_string(),
            ..Self::find(collection, filter)
        }
    }

    /// An `aggregate` query with the given pipeline.
    pub fn aggregate(collection: Collection, pipeline: Vec<Value>) -> Self {
        Self {
            collection: collection.as_str().to_string(),
            operation: Operation::Aggregate.as_str().to_string(),
            filter: None,
            projection: None,
            pipeline: Some(pipeline),
        }
    }

    /// Restrict returned fields.
    pub fn with_projection(mut self, projection: Map<String, Value>) -> Self {
        self.projection = Some(projection);
        self
    }

    /// Resolve the collection against the allow-list.
    pub fn collection_kind(&self) -> Result<Collection, QueryError> {
        Collection::parse(&self.collection).ok_or_else(|| QueryError::InvalidCollection {
            collection: self.collection.clone(),
        })
    }

    /// Resolve the operation against the supported set.
    pub fn operation_kind(&self) -> Result<Operation, QueryError> {
        Operation::parse(&self.operation).ok_or_else(|| QueryError::UnsupportedOperation {
            operation: self.operation.clone(),
        })
    }

    /// Whether this query is an aggregation. Unknown operations are not.
    pub fn is_aggregate(&self) -> bool {
        matches!(Operation::parse(&self.operation), Some(Operation::Aggregate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collection_parse_roundtrip() {
        for collection in Collection::ALL {
            assert_eq!(Collection::parse(collection.as_str()), Some(collection));
        }
        assert_eq!(Collection::parse("accounts"), None);
        assert_eq!(Collection::parse("Users"), None);
    }

    #[test]
    fn test_only_users_is_global() {
        assert!(!Collection::Users.is_tenant_scoped());
        assert!(Collection::BankTransactions.is_tenant_scoped());
        assert!(Collection::MutualFundHoldings.is_tenant_scoped());
        assert!(Collection::EquityHoldings.is_tenant_scoped());
    }

    #[test]
    fn test_operation_parse_accepts_camel_case_alias() {
        assert_eq!(Operation::parse("findOne"), Some(Operation::FindOne));
        assert_eq!(Operation::parse("find_one"), Some(Operation::FindOne));
        assert_eq!(Operation::parse("deleteMany"), None);
    }

    #[test]
    fn test_kind_errors_carry_offending_value() {
        let query = StructuredQuery {
            collection: "accounts".to_string(),
            operation: "drop".to_string(),
            filter: None,
            projection: None,
            pipeline: None,
        };

        assert_eq!(
            query.collection_kind(),
            Err(QueryError::InvalidCollection {
                collection: "accounts".to_string()
            })
        );
        assert_eq!(
            query.operation_kind(),
            Err(QueryError::UnsupportedOperation {
                operation: "drop".to_string()
            })
        );
    }

    #[test]
    fn test_deserialize_translator_output() {
        let raw = json!({
            "collection": "bank_transactions",
            "operation": "aggregate",
            "pipeline": [
                { "$match": { "category": "food" } },
                { "$group": { "_id": null, "total": { "$sum": "$amount" } } }
            ]
        });

        let query: StructuredQuery = serde_json::from_value(raw).unwrap();
        assert_eq!(query.collection_kind(), Ok(Collection::BankTransactions));
        assert!(query.is_aggregate());
        assert!(query.filter.is_none());
        assert_eq!(query.pipeline.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn test_constructors_set_exactly_one_shape() {
        let find = StructuredQuery::find(Collection::EquityHoldings, Map::new());
        assert!(find.filter.is_some());
        assert!(find.pipeline.is_none());

        let one = StructuredQuery::find_one(Collection::Users, Map::new());
        assert_eq!(one.operation_kind(), Ok(Operation::FindOne));

        let agg = StructuredQuery::aggregate(Collection::BankTransactions, vec![]);
        assert!(agg.filter.is_none());
        assert!(agg.pipeline.is_some());
    }
}
