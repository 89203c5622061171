//! Offline provider: keyword-based translation and template synthesis.
//!
//! Lets the service run end to end without an API key. Covers the common
//! question shapes (spend totals, per-category breakdowns, largest
//! transactions, portfolio value, holding lists); anything else falls back
//! to listing the tenant's transactions.

use async_trait::async_trait;
use finquery_core::{
    Collection, FinqueryResult, Record, StructuredQuery, TenantId, TransactionCategory,
    TENANT_FIELD,
};
use serde_json::{json, Map, Value};

use crate::{AnswerSynthesizer, QueryTranslator};

/// Rows listed individually in a template answer.
const MAX_LISTED_ROWS: usize = 5;

/// Translates questions by keyword matching.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordTranslator;

fn mentions(question: &str, words: &[&str]) -> bool {
    words.iter().any(|w| question.contains(w))
}

fn tenant_match(tenant_id: &TenantId) -> Map<String, Value> {
    let mut filter = Map::new();
    filter.insert(TENANT_FIELD.to_string(), json!(tenant_id.as_str()));
    filter
}

fn category(question: &str) -> Option<TransactionCategory> {
    const SYNONYMS: &[(&str, TransactionCategory)] = &[
        ("restaurant", TransactionCategory::Food),
        ("dining", TransactionCategory::Food),
        ("grocer", TransactionCategory::Food),
        ("flight", TransactionCategory::Travel),
        ("trip", TransactionCategory::Travel),
        ("cab", TransactionCategory::Travel),
        ("bill", TransactionCategory::Bills),
        ("utilit", TransactionCategory::Bills),
    ];
    TransactionCategory::ALL
        .into_iter()
        .find(|c| question.contains(c.as_str()))
        .or_else(|| {
            SYNONYMS
                .iter()
                .find(|(word, _)| question.contains(word))
                .map(|(_, c)| *c)
        })
}

impl KeywordTranslator {
    pub fn new() -> Self {
        Self
    }

    fn transactions(&self, tenant_id: &TenantId, q: &str) -> StructuredQuery {
        let mut filter = tenant_match(tenant_id);
        if let Some(c) = category(q) {
            filter.insert("category".to_string(), json!(c.as_str()));
        }

        if mentions(q, &["by category", "breakdown", "each category", "per category"]) {
            return StructuredQuery::aggregate(
                Collection::BankTransactions,
                vec![
                    json!({ "$match": filter }),
                    json!({ "$group": { "_id": "$category", "total": { "$sum": "$amount" } } }),
                    json!({ "$sort": { "total": -1 } }),
                ],
            );
        }
        if mentions(q, &["largest", "biggest", "highest", "top", "most expensive"]) {
            return StructuredQuery::aggregate(
                Collection::BankTransactions,
                vec![
                    json!({ "$match": filter }),
                    json!({ "$sort": { "amount": -1 } }),
                    json!({ "$limit": MAX_LISTED_ROWS }),
                ],
            );
        }
        if mentions(q, &["how much", "total", "spend", "spent", "sum"]) {
            return StructuredQuery::aggregate(
                Collection::BankTransactions,
                vec![
                    json!({ "$match": filter }),
                    json!({ "$group": {
                        "_id": null,
                        "total": { "$sum": "$amount" },
                        "count": { "$count": {} }
                    } }),
                ],
            );
        }
        StructuredQuery::find(Collection::BankTransactions, filter)
    }

    fn mutual_funds(&self, tenant_id: &TenantId, q: &str) -> StructuredQuery {
        if mentions(q, &["total", "worth", "value", "how much", "portfolio", "return", "gain"]) {
            return StructuredQuery::aggregate(
                Collection::MutualFundHoldings,
                vec![
                    json!({ "$match": tenant_match(tenant_id) }),
                    json!({ "$group": {
                        "_id": null,
                        "invested": { "$sum": "$investedValue" },
                        "current": { "$sum": "$currentValue" }
                    } }),
                    json!({ "$addFields": { "gain": { "$subtract": ["$current", "$invested"] } } }),
                ],
            );
        }
        StructuredQuery::find(Collection::MutualFundHoldings, tenant_match(tenant_id))
    }

    fn equities(&self, tenant_id: &TenantId, q: &str) -> StructuredQuery {
        let value = json!({ "$multiply": ["$quantity", "$currentPrice"] });
        if mentions(q, &["total", "worth", "value", "how much", "portfolio"]) {
            return StructuredQuery::aggregate(
                Collection::EquityHoldings,
                vec![
                    json!({ "$match": tenant_match(tenant_id) }),
                    json!({ "$group": { "_id": null, "value": { "$sum": value } } }),
                ],
            );
        }
        StructuredQuery::aggregate(
            Collection::EquityHoldings,
            vec![
                json!({ "$match": tenant_match(tenant_id) }),
                json!({ "$addFields": { "value": value } }),
                json!({ "$project": { "_id": 0, "stockName": 1, "quantity": 1, "currentPrice": 1, "value": 1 } }),
            ],
        )
    }
}

#[async_trait]
impl QueryTranslator for KeywordTranslator {
    async fn translate(
        &self,
        _schema: &str,
        tenant_id: &TenantId,
        question: &str,
    ) -> FinqueryResult<StructuredQuery> {
        let q = question.to_lowercase();
        Ok(if mentions(&q, &["mutual fund", "fund", "sip", "scheme"]) {
            self.mutual_funds(tenant_id, &q)
        } else if mentions(&q, &["stock", "share", "equit"]) {
            self.equities(tenant_id, &q)
        } else if mentions(&q, &["which users", "list users", "all users", "tenants"]) {
            StructuredQuery::find(Collection::Users, Map::new())
        } else {
            self.transactions(tenant_id, &q)
        })
    }
}

/// Renders retrieved rows into a plain-text answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateSynthesizer;

impl TemplateSynthesizer {
    pub fn new() -> Self {
        Self
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() != 0.0 => format!("{:.2}", f),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

fn render_row(row: &Record) -> String {
    let Some(fields) = row.as_object() else {
        return render_value(row);
    };
    fields
        .iter()
        .filter(|(k, v)| {
            !(k.as_str() == "id" || k.as_str() == TENANT_FIELD || (k.as_str() == "_id" && v.is_null()))
        })
        .map(|(k, v)| format!("{}: {}", k, render_value(v)))
        .collect::<Vec<_>>()
        .join(", ")
}

#[async_trait]
impl AnswerSynthesizer for TemplateSynthesizer {
    async fn synthesize(
        &self,
        tenant_name: &str,
        _question: &str,
        retrieved: &[Record],
    ) -> FinqueryResult<String> {
        Ok(match retrieved {
            [] => format!("Hi {}, I couldn't find any matching records.", tenant_name),
            [row] => format!("Hi {}, here's what I found: {}.", tenant_name, render_row(row)),
            rows => {
                let mut answer = format!("Hi {}, I found {} records:", tenant_name, rows.len());
                for row in rows.iter().take(MAX_LISTED_ROWS) {
                    answer.push_str("\n- ");
                    answer.push_str(&render_row(row));
                }
                if rows.len() > MAX_LISTED_ROWS {
                    answer.push_str(&format!("\n...and {} more.", rows.len() - MAX_LISTED_ROWS));
                }
                answer
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn translate(question: &str) -> StructuredQuery {
        KeywordTranslator::new()
            .translate("", &TenantId::new("user_1"), question)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_food_spend_is_scoped_sum() {
        let query = translate("How much did I spend on food?").await;
        assert_eq!(query.collection_kind(), Ok(Collection::BankTransactions));
        let pipeline = query.pipeline.unwrap();
        assert_eq!(
            pipeline[0],
            json!({ "$match": { "tenantId": "user_1", "category": "food" } })
        );
        assert_eq!(pipeline[1]["$group"]["total"], json!({ "$sum": "$amount" }));
    }

    #[tokio::test]
    async fn test_collection_routing() {
        assert_eq!(
            translate("What is my mutual fund portfolio worth?").await.collection,
            "mutual_fund_holdings"
        );
        assert_eq!(translate("Show my stocks").await.collection, "equity_holdings");
        assert_eq!(translate("list users").await.collection, "users");
        assert_eq!(translate("show my transactions").await.operation, "find");
    }

    #[tokio::test]
    async fn test_template_answers() {
        let synth = TemplateSynthesizer::new();
        let none = synth.synthesize("Asha", "q", &[]).await.unwrap();
        assert!(none.contains("couldn't find"));

        let total = synth
            .synthesize("Asha", "q", &[json!({ "_id": null, "total": 4300, "count": 2 })])
            .await
            .unwrap();
        assert!(total.contains("total: 4300"));
        assert!(!total.contains("_id"));

        let rows: Vec<Record> = (0..7).map(|i| json!({ "id": i, "amount": 100 * i })).collect();
        let many = synth.synthesize("Asha", "q", &rows).await.unwrap();
        assert!(many.contains("7 records"));
        assert!(many.contains("and 2 more"));
    }
}
