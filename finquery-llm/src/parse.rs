//! Parsing model output into a [`StructuredQuery`].
//!
//! Models often wrap JSON in Markdown code fences or add a sentence before
//! it. Parsing strips fences first, then falls back to the outermost `{...}`
//! span. Anything else is a [`TranslationError::ParseError`] carrying the
//! raw text.

use finquery_core::{StructuredQuery, TranslationError};

/// Strip a Markdown code fence, returning the fenced body. Text without a
/// fence is returned trimmed.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(open) = trimmed.find("```") else {
        return trimmed;
    };

    // Skip the opening fence and its info string (e.g. "json"). The info
    // string is alphabetic, so a one-line fence like ```{...}``` keeps its
    // body intact.
    let after_open = &trimmed[open + 3..];
    let info_len = after_open
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(after_open.len());
    let body = &after_open[info_len..];

    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

/// Parse translator output into a structured query.
pub fn parse_structured_query(raw: &str) -> Result<StructuredQuery, TranslationError> {
    let body = strip_code_fences(raw);

    let first_err = match serde_json::from_str::<StructuredQuery>(body) {
        Ok(query) => return Ok(query),
        Err(e) => e,
    };

    // Outermost `{...}` span, inside the fence first, then in the raw text.
    if let Some(query) = [body, raw].into_iter().find_map(outermost_object) {
        return Ok(query);
    }

    Err(TranslationError::ParseError {
        reason: first_err.to_string(),
        raw: raw.to_string(),
    })
}

fn outermost_object(text: &str) -> Option<StructuredQuery> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if start >= end {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use finquery_core::Collection;

    #[test]
    fn test_strip_json_fence() {
        let raw = "```json\n{\"collection\": \"users\"}\n```";
        assert_eq!(strip_code_fences(raw), "{\"collection\": \"users\"}");
    }

    #[test]
    fn test_strip_bare_fence_with_preamble() {
        let raw = "Here is the query:\n```\n{\"a\": 1}\n```\nLet me know!";
        assert_eq!(strip_code_fences(raw), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_single_line_fence() {
        assert_eq!(strip_code_fences("```{\"a\": 1}```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```json{\"a\": 1}```"), "{\"a\": 1}");
    }

    #[test]
    fn test_parse_single_line_fence() {
        let raw = r#"```{"collection":"users","operation":"find","filter":{}}```"#;
        let query = parse_structured_query(raw).unwrap();
        assert_eq!(query.collection_kind().ok(), Some(Collection::Users));
        assert_eq!(query.filter, Some(serde_json::Map::new()));
    }

    #[test]
    fn test_parse_falls_back_to_raw_text() {
        // Fence info string with a digit; the body keeps a stray "5".
        let raw = "```json5\n{\"collection\":\"users\",\"operation\":\"find\"}\n```";
        let query = parse_structured_query(raw).unwrap();
        assert_eq!(query.collection, "users");
    }

    #[test]
    fn test_no_fence_is_trimmed() {
        assert_eq!(strip_code_fences("  {\"a\": 1}\n"), "{\"a\": 1}");
    }

    #[test]
    fn test_parse_fenced_query() {
        let raw = r#"```json
{
  "collection": "bank_transactions",
  "operation": "aggregate",
  "pipeline": [
    { "$match": { "tenantId": "user_1", "category": "food" } },
    { "$group": { "_id": null, "total": { "$sum": "$amount" } } }
  ]
}
```"#;
        let query = parse_structured_query(raw).unwrap();
        assert_eq!(query.collection_kind(), Ok(Collection::BankTransactions));
        assert!(query.is_aggregate());
    }

    #[test]
    fn test_parse_with_surrounding_prose() {
        let raw = r#"Sure! {"collection": "users", "operation": "find", "filter": {}} Hope that helps."#;
        let query = parse_structured_query(raw).unwrap();
        assert_eq!(query.collection, "users");
    }

    #[test]
    fn test_unparsable_output_keeps_raw() {
        let raw = "I'm sorry, I can't help with that.";
        match parse_structured_query(raw) {
            Err(TranslationError::ParseError { raw: kept, .. }) => assert_eq!(kept, raw),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_required_field_rejected() {
        assert!(parse_structured_query(r#"{"operation": "find"}"#).is_err());
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use finquery_core::Collection;
    use proptest::prelude::*;

    fn arb_wrapping() -> impl Strategy<Value = (String, String)> {
        prop_oneof![
            Just((String::new(), String::new())),
            Just(("```json\n".to_string(), "\n```".to_string())),
            Just(("```\n".to_string(), "\n```".to_string())),
            Just(("```".to_string(), "```".to_string())),
            Just(("```json".to_string(), "```".to_string())),
            Just(("Here you go:\n```json\n".to_string(), "\n```\nDone.".to_string())),
        ]
    }

    proptest! {
        /// Any fence style around a valid query parses to the same query.
        #[test]
        fn prop_wrapped_query_parses(
            (open, close) in arb_wrapping(),
            collection in prop::sample::select(Collection::ALL.to_vec()),
            category in "[a-z]{1,10}",
            pretty in any::<bool>(),
        ) {
            let mut filter = serde_json::Map::new();
            filter.insert("category".to_string(), serde_json::json!(category));
            let query = StructuredQuery::find(collection, filter);
            let json = if pretty {
                serde_json::to_string_pretty(&query).unwrap()
            } else {
                serde_json::to_string(&query).unwrap()
            };

            let parsed = parse_structured_query(&format!("{open}{json}{close}")).unwrap();
            prop_assert_eq!(parsed, query);
        }
    }
}
