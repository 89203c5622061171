//! Filter evaluation over JSON documents.
//!
//! Supports implicit equality, the comparison operators `$eq $ne $gt $gte
//! $lt $lte`, set membership `$in $nin`, `$regex` (with `$options: "i"`),
//! `$exists`, and the logical combinators `$and $or`. Field paths may be
//! dotted. An array-valued field matches equality if any element matches.

use std::cmp::Ordering;

use finquery_core::QueryError;
use regex::RegexBuilder;
use serde_json::{Map, Value};

pub(crate) fn unsupported(what: &str, name: &str) -> QueryError {
    QueryError::ExecutionFailed {
        reason: format!("unsupported {} {}", what, name),
    }
}

pub(crate) fn malformed(reason: impl Into<String>) -> QueryError {
    QueryError::ExecutionFailed {
        reason: reason.into(),
    }
}

/// Resolve a dotted field path.
pub fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |value, segment| value.get(segment))
}

/// Whether `doc` satisfies every predicate in `filter`.
pub fn matches(doc: &Value, filter: &Map<String, Value>) -> Result<bool, QueryError> {
    for (key, condition) in filter {
        let ok = match key.as_str() {
            "$and" => all_of(doc, condition)?.iter().all(|m| *m),
            "$or" => all_of(doc, condition)?.iter().any(|m| *m),
            op if op.starts_with('$') => return Err(unsupported("filter operator", op)),
            path => field_matches(lookup(doc, path), condition)?,
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn all_of(doc: &Value, clauses: &Value) -> Result<Vec<bool>, QueryError> {
    let clauses = clauses
        .as_array()
        .ok_or_else(|| malformed("$and/$or expects an array of filters"))?;
    clauses
        .iter()
        .map(|clause| match clause {
            Value::Object(filter) => matches(doc, filter),
            _ => Err(malformed("$and/$or clauses must be objects")),
        })
        .collect()
}

fn is_operator_object(condition: &Value) -> Option<&Map<String, Value>> {
    match condition {
        Value::Object(map) if !map.is_empty() && map.keys().all(|k| k.starts_with('$')) => {
            Some(map)
        }
        _ => None,
    }
}

fn field_matches(value: Option<&Value>, condition: &Value) -> Result<bool, QueryError> {
    let Some(ops) = is_operator_object(condition) else {
        return Ok(equals(value, condition));
    };

    for (op, arg) in ops {
        let ok = match op.as_str() {
            "$eq" => equals(value, arg),
            "$ne" => !equals(value, arg),
            "$gt" => compares(value, arg, |o| o == Ordering::Greater),
            "$gte" => compares(value, arg, |o| o != Ordering::Less),
            "$lt" => compares(value, arg, |o| o == Ordering::Less),
            "$lte" => compares(value, arg, |o| o != Ordering::Greater),
            "$in" => members(arg)?.iter().any(|candidate| equals(value, candidate)),
            "$nin" => !members(arg)?.iter().any(|candidate| equals(value, candidate)),
            "$exists" => value.is_some() == truthy(arg),
            "$regex" => regex_matches(value, arg, ops.get("$options"))?,
            "$options" => true,
            other => return Err(unsupported("filter operator", other)),
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn members(arg: &Value) -> Result<&Vec<Value>, QueryError> {
    arg.as_array()
        .ok_or_else(|| malformed("$in/$nin expects an array"))
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::Null => false,
        _ => true,
    }
}

fn regex_matches(
    value: Option<&Value>,
    pattern: &Value,
    options: Option<&Value>,
) -> Result<bool, QueryError> {
    let pattern = pattern
        .as_str()
        .ok_or_else(|| malformed("$regex expects a string"))?;
    let case_insensitive = options
        .and_then(Value::as_str)
        .is_some_and(|o| o.contains('i'));
    let re = RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| malformed(format!("invalid $regex: {}", e)))?;

    Ok(match value {
        Some(Value::String(s)) => re.is_match(s),
        Some(Value::Array(items)) => items
            .iter()
            .any(|item| item.as_str().is_some_and(|s| re.is_match(s))),
        _ => false,
    })
}

/// Equality with numeric coercion. A missing field equals `null`; an array
/// field equals a scalar if any element does.
fn equals(value: Option<&Value>, expected: &Value) -> bool {
    match value {
        None => expected.is_null(),
        Some(Value::Array(items)) if !expected.is_array() => {
            items.iter().any(|item| scalar_eq(item, expected))
        }
        Some(actual) => scalar_eq(actual, expected),
    }
}

fn scalar_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn compares(value: Option<&Value>, bound: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .any(|item| compare(item, bound).is_some_and(&accept)),
        Some(actual) => compare(actual, bound).is_some_and(accept),
        None => false,
    }
}

/// Compare two values of the same kind. `None` for mixed kinds.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Total order across kinds, used by `$sort`, `$min` and `$max`:
/// missing/null < numbers < strings < objects < arrays < booleans.
pub fn sort_order(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Number(_)) => 1,
            Some(Value::String(_)) => 2,
            Some(Value::Object(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Bool(_)) => 5,
        }
    }
    match (a, b) {
        (Some(x), Some(y)) => compare(x, y).unwrap_or_else(|| rank(a).cmp(&rank(b))),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn filter(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn txn() -> Value {
        json!({
            "id": "t1",
            "tenantId": "user_1",
            "amount": 2500,
            "category": "food",
            "merchant": "Swiggy",
            "date": "2024-03-05",
            "tags": ["weekend", "delivery"],
            "meta": { "channel": "upi" }
        })
    }

    #[test]
    fn test_implicit_equality_and_numeric_coercion() {
        let doc = txn();
        assert!(matches(&doc, &filter(json!({ "category": "food" }))).unwrap());
        assert!(matches(&doc, &filter(json!({ "amount": 2500.0 }))).unwrap());
        assert!(!matches(&doc, &filter(json!({ "category": "travel" }))).unwrap());
        assert!(matches(&doc, &filter(json!({ "tags": "weekend" }))).unwrap());
        assert!(matches(&doc, &filter(json!({ "meta.channel": "upi" }))).unwrap());
    }

    #[test]
    fn test_comparison_operators() {
        let doc = txn();
        assert!(matches(&doc, &filter(json!({ "amount": { "$gt": 2000, "$lte": 2500 } }))).unwrap());
        assert!(!matches(&doc, &filter(json!({ "amount": { "$lt": 2500 } }))).unwrap());
        assert!(matches(&doc, &filter(json!({ "date": { "$gte": "2024-03-01", "$lt": "2024-04-01" } }))).unwrap());
        assert!(!matches(&doc, &filter(json!({ "missing": { "$gt": 0 } }))).unwrap());
    }

    #[test]
    fn test_membership_exists_and_regex() {
        let doc = txn();
        assert!(matches(&doc, &filter(json!({ "category": { "$in": ["food", "bills"] } }))).unwrap());
        assert!(matches(&doc, &filter(json!({ "category": { "$nin": ["travel"] } }))).unwrap());
        assert!(matches(&doc, &filter(json!({ "merchant": { "$exists": true } }))).unwrap());
        assert!(matches(&doc, &filter(json!({ "refund": { "$exists": false } }))).unwrap());
        assert!(matches(&doc, &filter(json!({ "merchant": { "$regex": "^swig", "$options": "i" } }))).unwrap());
        assert!(!matches(&doc, &filter(json!({ "merchant": { "$regex": "^swig" } }))).unwrap());
    }

    #[test]
    fn test_logical_combinators() {
        let doc = txn();
        assert!(matches(
            &doc,
            &filter(json!({ "$or": [{ "category": "travel" }, { "amount": 2500 }] }))
        )
        .unwrap());
        assert!(!matches(
            &doc,
            &filter(json!({ "$and": [{ "category": "food" }, { "amount": 1 }] }))
        )
        .unwrap());
    }

    #[test]
    fn test_unknown_operator_is_an_error() {
        let err = matches(&txn(), &filter(json!({ "$where": "1 == 1" }))).unwrap_err();
        assert!(matches!(err, QueryError::ExecutionFailed { .. }));
        assert!(matches(&txn(), &filter(json!({ "amount": { "$mod": [2, 0] } }))).is_err());
    }

    #[test]
    fn test_sort_order_across_kinds() {
        assert_eq!(sort_order(None, Some(&json!(1))), Ordering::Less);
        assert_eq!(sort_order(Some(&json!(2)), Some(&json!(10))), Ordering::Less);
        assert_eq!(sort_order(Some(&json!("a")), Some(&json!(10))), Ordering::Greater);
    }
}
