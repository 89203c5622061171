//! Tenant isolation guard.
//!
//! Translator output is untrusted: it may omit the tenant filter, carry a
//! foreign tenant id, or be malformed. [`enforce`] rewrites it so that every
//! read of a tenant-owned collection is restricted to one tenant:
//!
//! - `users` is returned unchanged; it holds no tenant-owned rows.
//! - `aggregate`: the first stage must be a `$match` pinning the tenant field
//!   to the tenant id (literal or `{"$eq": id}`). Otherwise a new match stage
//!   is prepended. An existing first-stage match that targets another tenant
//!   is left in place behind the new one, where it can only narrow the rows.
//! - everything else: the tenant field of `filter` is set to the tenant id,
//!   overwriting any value the translator supplied and keeping other fields.
//!
//! Only the first stage is inspected. A later stage that pulls rows in from
//! outside the matched set is not detected here; the document store rejects
//! the stages that could do so (`$lookup`, `$unionWith`).
//!
//! The only way to obtain an [`IsolatedQuery`] is through [`enforce`], and
//! the executor accepts nothing else.

use finquery_core::{Collection, Operation, StructuredQuery, TenantId, TENANT_FIELD};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

/// A structured query that has passed through the isolation guard.
#[derive(Debug, Clone, PartialEq)]
pub struct IsolatedQuery(StructuredQuery);

impl IsolatedQuery {
    pub fn as_query(&self) -> &StructuredQuery {
        &self.0
    }

    pub fn into_inner(self) -> StructuredQuery {
        self.0
    }
}

impl AsRef<StructuredQuery> for IsolatedQuery {
    fn as_ref(&self) -> &StructuredQuery {
        &self.0
    }
}

/// Scope `query` to `tenant_id`.
///
/// Idempotent: enforcing an already isolated query for the same tenant
/// returns it unchanged.
pub fn enforce(mut query: StructuredQuery, tenant_id: &TenantId) -> IsolatedQuery {
    if query.collection_kind() == Ok(Collection::Users) {
        return IsolatedQuery(query);
    }

    if query.operation_kind() == Ok(Operation::Aggregate) {
        let mut pipeline = query.pipeline.take().unwrap_or_default();
        if !pipeline.first().is_some_and(|stage| is_tenant_match(stage, tenant_id)) {
            debug!(
                collection = %query.collection,
                tenant_id = %tenant_id,
                "Prepending tenant match stage"
            );
            pipeline.insert(0, tenant_match_stage(tenant_id));
        }
        query.pipeline = Some(pipeline);
    } else {
        let mut filter = query.filter.take().unwrap_or_default();
        let scoped = json!(tenant_id.as_str());
        if let Some(previous) = filter.insert(TENANT_FIELD.to_string(), scoped.clone()) {
            if previous != scoped {
                warn!(
                    collection = %query.collection,
                    tenant_id = %tenant_id,
                    supplied = %previous,
                    "Overwrote tenant filter supplied by translator"
                );
            }
        }
        query.filter = Some(filter);
    }

    IsolatedQuery(query)
}

/// `{"$match": {"tenantId": <id>}}`
pub fn tenant_match_stage(tenant_id: &TenantId) -> Value {
    let mut filter = Map::new();
    filter.insert(TENANT_FIELD.to_string(), json!(tenant_id.as_str()));
    json!({ "$match": filter })
}

/// Whether `stage` is a `$match` whose tenant predicate is equality with
/// `tenant_id`. Other keys in the match are ANDed and can only narrow it.
fn is_tenant_match(stage: &Value, tenant_id: &TenantId) -> bool {
    let Some(stage) = stage.as_object() else {
        return false;
    };
    if stage.len() != 1 {
        return false;
    }
    let Some(Value::Object(filter)) = stage.get("$match") else {
        return false;
    };

    match filter.get(TENANT_FIELD) {
        Some(Value::String(id)) => id == tenant_id.as_str(),
        Some(Value::Object(predicate)) => {
            predicate.len() == 1
                && predicate.get("$eq").and_then(Value::as_str) == Some(tenant_id.as_str())
        }
        _ => false,
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use finquery_test_utils::generators::{arb_tenant_id, arb_untrusted_query};
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_enforce_is_idempotent(query in arb_untrusted_query(), tenant in arb_tenant_id()) {
            let once = enforce(query, &tenant).into_inner();
            let twice = enforce(once.clone(), &tenant).into_inner();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_aggregate_starts_with_tenant_match(
            query in arb_untrusted_query(),
            tenant in arb_tenant_id(),
        ) {
            let isolated = enforce(query, &tenant).into_inner();
            if isolated.is_aggregate() {
                let pipeline = isolated.pipeline.unwrap();
                prop_assert!(is_tenant_match(&pipeline[0], &tenant));
            } else {
                let filter = isolated.filter.unwrap();
                prop_assert_eq!(&filter[TENANT_FIELD], &json!(tenant.as_str()));
            }
        }
    }
}
