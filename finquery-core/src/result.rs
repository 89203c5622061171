//! The answer payload produced by one pipeline run.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::query::StructuredQuery;
use crate::tenant::TenantContext;
use crate::{Record, Timestamp};

/// Full result of answering a question.
///
/// Produced fresh on a cache miss and replayed verbatim on a hit, with only
/// `from_cache` flipped. Stored in the cache with `from_cache == false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub question: String,
    pub tenant: TenantContext,
    pub answer: String,
    pub executed_query: StructuredQuery,
    #[cfg_attr(feature = "openapi", schema(value_type = Vec<Object>))]
    pub retrieved_data: Vec<Record>,
    #[serde(default)]
    pub from_cache: bool,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub generated_at: Timestamp,
}

impl QueryResult {
    pub fn new(
        question: impl Into<String>,
        tenant: TenantContext,
        answer: impl Into<String>,
        executed_query: StructuredQuery,
        retrieved_data: Vec<Record>,
    ) -> Self {
        Self {
            question: question.into(),
            tenant,
            answer: answer.into(),
            executed_query,
            retrieved_data,
            from_cache: false,
            generated_at: Utc::now(),
        }
    }

    /// Mark a replayed result as served from cache.
    pub fn into_cached(mut self) -> Self {
        self.from_cache = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Collection;
    use serde_json::{json, Map};

    #[test]
    fn test_cached_replay_only_flips_flag() {
        let fresh = QueryResult::new(
            "how much did i spend on food",
            TenantContext::new("user_1", "Asha"),
            "You spent 4300 on food.",
            StructuredQuery::find(Collection::BankTransactions, Map::new()),
            vec![json!({ "amount": 4300 })],
        );
        assert!(!fresh.from_cache);

        let replay = fresh.clone().into_cached();
        assert!(replay.from_cache);
        assert_eq!(replay.answer, fresh.answer);
        assert_eq!(replay.retrieved_data, fresh.retrieved_data);
        assert_eq!(replay.generated_at, fresh.generated_at);
    }

    #[test]
    fn test_missing_from_cache_defaults_to_false() {
        let fresh = QueryResult::new(
            "q",
            TenantContext::new("user_1", "Asha"),
            "a",
            StructuredQuery::find(Collection::Users, Map::new()),
            vec![],
        );
        let mut json = serde_json::to_value(&fresh).unwrap();
        json.as_object_mut().unwrap().remove("fromCache");

        let parsed: QueryResult = serde_json::from_value(json).unwrap();
        assert!(!parsed.from_cache);
        assert_eq!(parsed.executed_query, fresh.executed_query);
    }

    #[cfg(feature = "openapi")]
    #[test]
    fn test_generated_at_schema_is_date_time() {
        use utoipa::PartialSchema;

        let schema = serde_json::to_value(QueryResult::schema()).unwrap();
        let generated_at = &schema["properties"]["generatedAt"];
        assert_eq!(generated_at["type"], "string");
        assert_eq!(generated_at["format"], "date-time");
    }
}
