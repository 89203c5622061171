//! FINQUERY Test Utilities
//!
//! Shared test infrastructure for the FINQUERY workspace:
//! - Scripted translation/synthesis collaborators with call counters
//! - Cache and document store doubles (unreachable, counting, stalled)
//! - Fixtures: two tenants with known transactions and holdings
//! - Proptest generators for untrusted, adversarial structured queries
//! - Custom assertions for FINQUERY error variants

pub use finquery_core::{
    Collection, FinqueryError, FinqueryResult, Operation, QueryError, Record, StructuredQuery,
    TenantContext, TenantId, TENANT_FIELD,
};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use finquery_core::CacheError;
use finquery_llm::{parse_structured_query, AnswerSynthesizer, QueryTranslator};
use finquery_storage::{CacheStore, DocumentStore};
use serde_json::{Map, Value};

// ============================================================================
// SCRIPTED COLLABORATORS
// ============================================================================

type BuildQuery = dyn Fn(&TenantId, &str) -> StructuredQuery + Send + Sync;

enum TranslatorReply {
    Query(StructuredQuery),
    Raw(String),
    Build(Arc<BuildQuery>),
    Fail(FinqueryError),
    Hang,
}

/// Translator double with a fixed reply and a call counter.
pub struct ScriptedTranslator {
    reply: TranslatorReply,
    calls: AtomicUsize,
    questions: Mutex<Vec<String>>,
}

impl ScriptedTranslator {
    fn with_reply(reply: TranslatorReply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            questions: Mutex::new(Vec::new()),
        }
    }

    /// Always return `query`, whatever the tenant.
    pub fn returning(query: StructuredQuery) -> Self {
        Self::with_reply(TranslatorReply::Query(query))
    }

    /// Reply with raw model text, parsed the way a real model reply is.
    pub fn raw(text: impl Into<String>) -> Self {
        Self::with_reply(TranslatorReply::Raw(text.into()))
    }

    /// Build the reply from the tenant and question.
    pub fn from_fn(
        build: impl Fn(&TenantId, &str) -> StructuredQuery + Send + Sync + 'static,
    ) -> Self {
        Self::with_reply(TranslatorReply::Build(Arc::new(build)))
    }

    pub fn failing(error: FinqueryError) -> Self {
        Self::with_reply(TranslatorReply::Fail(error))
    }

    /// Never completes.
    pub fn hanging() -> Self {
        Self::with_reply(TranslatorReply::Hang)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Questions seen, in call order.
    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl QueryTranslator for ScriptedTranslator {
    async fn translate(
        &self,
        _schema: &str,
        tenant_id: &TenantId,
        question: &str,
    ) -> FinqueryResult<StructuredQuery> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut questions) = self.questions.lock() {
            questions.push(question.to_string());
        }
        match &self.reply {
            TranslatorReply::Query(query) => Ok(query.clone()),
            TranslatorReply::Raw(text) => Ok(parse_structured_query(text)?),
            TranslatorReply::Build(build) => Ok(build(tenant_id, question)),
            TranslatorReply::Fail(error) => Err(error.clone()),
            TranslatorReply::Hang => std::future::pending().await,
        }
    }
}

enum SynthesizerReply {
    Fixed(String),
    Echo,
    Fail(FinqueryError),
    Hang,
}

/// Synthesizer double with a call counter.
pub struct ScriptedSynthesizer {
    reply: SynthesizerReply,
    calls: AtomicUsize,
}

impl ScriptedSynthesizer {
    fn with_reply(reply: SynthesizerReply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn fixed(answer: impl Into<String>) -> Self {
        Self::with_reply(SynthesizerReply::Fixed(answer.into()))
    }

    /// Answer with the tenant name and the retrieved rows as JSON, so tests
    /// can assert on the numbers the answer was built from.
    pub fn echoing() -> Self {
        Self::with_reply(SynthesizerReply::Echo)
    }

    pub fn failing(error: FinqueryError) -> Self {
        Self::with_reply(SynthesizerReply::Fail(error))
    }

    pub fn hanging() -> Self {
        Self::with_reply(SynthesizerReply::Hang)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnswerSynthesizer for ScriptedSynthesizer {
    async fn synthesize(
        &self,
        tenant_name: &str,
        _question: &str,
        retrieved: &[Record],
    ) -> FinqueryResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            SynthesizerReply::Fixed(answer) => Ok(answer.clone()),
            SynthesizerReply::Echo => Ok(format!(
                "{}: {}",
                tenant_name,
                serde_json::to_string(retrieved).unwrap_or_default()
            )),
            SynthesizerReply::Fail(error) => Err(error.clone()),
            SynthesizerReply::Hang => std::future::pending().await,
        }
    }
}

// ============================================================================
// STORE DOUBLES
// ============================================================================

/// Cache store whose every call fails as if the server were down.
#[derive(Debug, Default)]
pub struct UnreachableCacheStore {
    calls: AtomicUsize,
}

impl UnreachableCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn refuse(&self) -> CacheError {
        self.calls.fetch_add(1, Ordering::SeqCst);
        CacheError::Unavailable {
            reason: "connection refused".to_string(),
        }
    }
}

#[async_trait]
impl CacheStore for UnreachableCacheStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(self.refuse())
    }

    async fn set_with_expiry(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        Err(self.refuse())
    }

    async fn keys_matching(&self, _pattern: &str) -> Result<Vec<String>, CacheError> {
        Err(self.refuse())
    }

    async fn delete(&self, _keys: &[String]) -> Result<u64, CacheError> {
        Err(self.refuse())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Err(self.refuse())
    }

    fn name(&self) -> &'static str {
        "unreachable"
    }
}

/// Document store wrapper counting calls per operation.
pub struct CountingDocumentStore {
    inner: Arc<dyn DocumentStore>,
    finds: AtomicUsize,
    find_ones: AtomicUsize,
    aggregates: AtomicUsize,
    stalled: bool,
}

impl CountingDocumentStore {
    pub fn new(inner: Arc<dyn DocumentStore>) -> Self {
        Self {
            inner,
            finds: AtomicUsize::new(0),
            find_ones: AtomicUsize::new(0),
            aggregates: AtomicUsize::new(0),
            stalled: false,
        }
    }

    /// Count calls but never answer them.
    pub fn stalled(inner: Arc<dyn DocumentStore>) -> Self {
        Self {
            stalled: true,
            ..Self::new(inner)
        }
    }

    pub fn finds(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }

    pub fn find_ones(&self) -> usize {
        self.find_ones.load(Ordering::SeqCst)
    }

    pub fn aggregates(&self) -> usize {
        self.aggregates.load(Ordering::SeqCst)
    }

    /// Query calls of any kind.
    pub fn calls(&self) -> usize {
        self.finds() + self.find_ones() + self.aggregates()
    }

    async fn stall(&self) {
        if self.stalled {
            std::future::pending::<()>().await;
        }
    }
}

#[async_trait]
impl DocumentStore for CountingDocumentStore {
    async fn find(
        &self,
        collection: Collection,
        filter: &Map<String, Value>,
        projection: Option<&Map<String, Value>>,
    ) -> FinqueryResult<Vec<Record>> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.stall().await;
        self.inner.find(collection, filter, projection).await
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Map<String, Value>,
        projection: Option<&Map<String, Value>>,
    ) -> FinqueryResult<Option<Record>> {
        self.find_ones.fetch_add(1, Ordering::SeqCst);
        self.stall().await;
        self.inner.find_one(collection, filter, projection).await
    }

    async fn aggregate(&self, collection: Collection, pipeline: &[Value]) -> FinqueryResult<Vec<Record>> {
        self.aggregates.fetch_add(1, Ordering::SeqCst);
        self.stall().await;
        self.inner.aggregate(collection, pipeline).await
    }

    async fn ping(&self) -> FinqueryResult<()> {
        self.inner.ping().await
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Two tenants with known data. Tenant A has exactly two `food`
    //! transactions, 2500 and 1800.

    use super::*;
    use finquery_storage::{InMemoryDocumentStore, SeedData};
    use serde_json::json;

    pub const TENANT_A: &str = "tenant_a";
    pub const TENANT_B: &str = "tenant_b";
    pub const TENANT_A_NAME: &str = "Asha";
    pub const TENANT_B_NAME: &str = "Rahul";

    /// Sum of tenant A's food transactions.
    pub const TENANT_A_FOOD_TOTAL: i64 = 4300;

    pub fn tenant_a() -> TenantContext {
        TenantContext::new(TENANT_A, TENANT_A_NAME)
    }

    pub fn tenant_b() -> TenantContext {
        TenantContext::new(TENANT_B, TENANT_B_NAME)
    }

    pub fn seed() -> SeedData {
        SeedData {
            users: vec![
                json!({ "id": TENANT_A, "name": TENANT_A_NAME }),
                json!({ "id": TENANT_B, "name": TENANT_B_NAME }),
            ],
            bank_transactions: vec![
                json!({ "id": "t1", "tenantId": TENANT_A, "amount": 2500, "category": "food", "merchant": "Swiggy", "date": "2024-03-05" }),
                json!({ "id": "t2", "tenantId": TENANT_A, "amount": 1800, "category": "food", "merchant": "Zomato", "date": "2024-03-12" }),
                json!({ "id": "t3", "tenantId": TENANT_A, "amount": 14200, "category": "travel", "merchant": "IndiGo", "date": "2024-02-18" }),
                json!({ "id": "t4", "tenantId": TENANT_B, "amount": 9999, "category": "food", "merchant": "Taj", "date": "2024-03-07" }),
                json!({ "id": "t5", "tenantId": TENANT_B, "amount": 650, "category": "bills", "merchant": "Airtel", "date": "2024-03-01" }),
            ],
            mutual_fund_holdings: vec![
                json!({ "id": "m1", "tenantId": TENANT_A, "schemeName": "Axis Bluechip", "investedValue": 80000, "currentValue": 91200 }),
                json!({ "id": "m2", "tenantId": TENANT_B, "schemeName": "Mirae Large Cap", "investedValue": 60000, "currentValue": 57800 }),
            ],
            equity_holdings: vec![
                json!({ "id": "e1", "tenantId": TENANT_A, "stockName": "INFY", "quantity": 40, "currentPrice": 1500 }),
                json!({ "id": "e2", "tenantId": TENANT_B, "stockName": "TCS", "quantity": 10, "currentPrice": 3890 }),
            ],
        }
    }

    pub fn document_store() -> InMemoryDocumentStore {
        InMemoryDocumentStore::from_seed(&seed())
    }

    /// "How much did I spend on food?" as a well-behaved translator emits it.
    pub fn food_spend_query(tenant_id: &TenantId) -> StructuredQuery {
        StructuredQuery::aggregate(
            Collection::BankTransactions,
            vec![
                json!({ "$match": { "tenantId": tenant_id.as_str(), "category": "food" } }),
                json!({ "$group": { "_id": null, "total": { "$sum": "$amount" } } }),
            ],
        )
    }

    /// The same question with the tenant filter left out entirely.
    pub fn unscoped_food_query() -> StructuredQuery {
        let mut filter = Map::new();
        filter.insert("category".to_string(), json!("food"));
        StructuredQuery::find(Collection::BankTransactions, filter)
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Strategies for untrusted translator output.
    //!
    //! Generated stages keep every row's tenant field intact (no `$group`,
    //! no field rewrites), so scoping can be checked on the returned rows.

    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    pub fn arb_tenant_id() -> impl Strategy<Value = TenantId> {
        prop_oneof![
            Just(TenantId::new(fixtures::TENANT_A)),
            Just(TenantId::new(fixtures::TENANT_B)),
            "[a-z0-9_:*]{1,12}".prop_map(TenantId::new),
        ]
    }

    pub fn arb_tenant_collection() -> impl Strategy<Value = Collection> {
        prop_oneof![
            Just(Collection::BankTransactions),
            Just(Collection::MutualFundHoldings),
            Just(Collection::EquityHoldings),
        ]
    }

    /// Values a forged tenant predicate might use.
    pub fn arb_forged_tenant_predicate() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(json!(fixtures::TENANT_A)),
            Just(json!(fixtures::TENANT_B)),
            Just(json!({ "$ne": fixtures::TENANT_A })),
            Just(json!({ "$in": [fixtures::TENANT_A, fixtures::TENANT_B] })),
            Just(json!({ "$exists": true })),
            Just(json!({ "$regex": ".*" })),
        ]
    }

    /// A find filter that may omit or forge the tenant field.
    pub fn arb_filter() -> impl Strategy<Value = Map<String, Value>> {
        (
            proptest::option::of(arb_forged_tenant_predicate()),
            proptest::option::of(prop_oneof![Just("food"), Just("travel"), Just("bills")]),
            proptest::option::of(0i64..20_000),
            any::<bool>(),
        )
            .prop_map(|(tenant, category, min_amount, or_clause)| {
                let mut filter = Map::new();
                if let Some(t) = tenant {
                    filter.insert(TENANT_FIELD.to_string(), t);
                }
                if let Some(c) = category {
                    filter.insert("category".to_string(), json!(c));
                }
                if let Some(n) = min_amount {
                    filter.insert("amount".to_string(), json!({ "$gte": n }));
                }
                if or_clause {
                    filter.insert(
                        "$or".to_string(),
                        json!([{ "tenantId": fixtures::TENANT_B }, { "amount": { "$gt": 0 } }]),
                    );
                }
                filter
            })
    }

    /// A single row-preserving aggregation stage.
    pub fn arb_stage() -> impl Strategy<Value = Value> {
        prop_oneof![
            arb_forged_tenant_predicate().prop_map(|p| json!({ "$match": { "tenantId": p } })),
            Just(json!({ "$match": {} })),
            Just(json!({ "$match": { "$or": [{ "tenantId": fixtures::TENANT_B }, { "tenantId": fixtures::TENANT_A }] } })),
            Just(json!({ "$sort": { "amount": -1 } })),
            (1i64..10).prop_map(|n| json!({ "$limit": n })),
            (0i64..3).prop_map(|n| json!({ "$skip": n })),
            Just(json!({ "$project": { "tenantId": 1, "amount": 1 } })),
        ]
    }

    pub fn arb_pipeline() -> impl Strategy<Value = Vec<Value>> {
        proptest::collection::vec(arb_stage(), 0..5)
    }

    /// Any query against a tenant-owned collection, trusted or not.
    pub fn arb_untrusted_query() -> impl Strategy<Value = StructuredQuery> {
        (arb_tenant_collection(), prop_oneof![Just(0u8), Just(1u8), Just(2u8)], arb_filter(), arb_pipeline())
            .prop_map(|(collection, op, filter, pipeline)| match op {
                0 => StructuredQuery::find(collection, filter),
                1 => StructuredQuery::find_one(collection, filter),
                _ => StructuredQuery::aggregate(collection, pipeline),
            })
    }

    /// Questions that differ from `base` only in case, whitespace and
    /// trailing `?`/`!`/`.` punctuation.
    pub fn arb_question_variant(base: &'static str) -> impl Strategy<Value = String> {
        let stem = base.trim_end_matches(['?', '!', '.']);
        (
            0usize..3,
            0usize..3,
            any::<bool>(),
            prop::sample::select(vec!["", "?", "??", "!", ".", " ?"]),
        )
            .prop_map(move |(lead, trail, upper, punct)| {
                let body = if upper { stem.to_uppercase() } else { stem.to_string() };
                let spaced = body.split(' ').collect::<Vec<_>>().join("  ");
                format!("{}{}{}{}", " ".repeat(lead), spaced, punct, "\t".repeat(trail))
            })
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    use super::*;
    use finquery_core::{TranslationError, ValidationError};

    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &FinqueryResult<T>) {
        match result {
            Err(FinqueryError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_question_too_long<T: std::fmt::Debug>(result: &FinqueryResult<T>) {
        match result {
            Err(FinqueryError::Validation(ValidationError::QuestionTooLong { .. })) => {}
            other => panic!("Expected QuestionTooLong, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_translation_parse_error<T: std::fmt::Debug>(result: &FinqueryResult<T>) {
        match result {
            Err(FinqueryError::Translation(TranslationError::ParseError { .. })) => {}
            other => panic!("Expected translation ParseError, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_invalid_collection<T: std::fmt::Debug>(result: &FinqueryResult<T>) {
        match result {
            Err(FinqueryError::Query(QueryError::InvalidCollection { .. })) => {}
            other => panic!("Expected InvalidCollection, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_timeout<T: std::fmt::Debug>(result: &FinqueryResult<T>, expected_stage: &str) {
        match result {
            Err(FinqueryError::Timeout { stage, .. }) => assert_eq!(stage, expected_stage),
            other => panic!("Expected Timeout in {}, got: {:?}", expected_stage, other),
        }
    }

    /// Every row carries the tenant field set to `tenant_id`.
    #[track_caller]
    pub fn assert_rows_scoped_to(rows: &[Record], tenant_id: &TenantId) {
        for row in rows {
            assert_eq!(
                row.get(TENANT_FIELD).and_then(Value::as_str),
                Some(tenant_id.as_str()),
                "row escaped tenant scope: {}",
                row
            );
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
