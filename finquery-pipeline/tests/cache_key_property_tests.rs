//! Property tests for question normalization through the cache.

use std::sync::Arc;
use std::time::Duration;

use finquery_core::FinqueryConfig;
use finquery_pipeline::QueryOrchestrator;
use finquery_storage::{InMemoryCacheStore, ResponseCache};
use finquery_test_utils::generators::arb_question_variant;
use finquery_test_utils::{fixtures, ScriptedSynthesizer, ScriptedTranslator};
use proptest::prelude::*;

const FOOD_QUESTION: &str = "How much did I spend on food?";

fn run<T>(fut: impl std::future::Future<Output = T>) -> T {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("runtime")
        .block_on(fut)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A rephrasing that differs only in case, spacing or trailing
    /// punctuation is answered from the cache without a second translation.
    #[test]
    fn prop_question_variants_share_cache_entry(variant in arb_question_variant(FOOD_QUESTION)) {
        let translator = Arc::new(ScriptedTranslator::from_fn(|tenant, _| {
            fixtures::food_spend_query(tenant)
        }));
        let cache = ResponseCache::new(
            Arc::new(InMemoryCacheStore::new()),
            Duration::from_secs(3600),
            Duration::from_secs(1),
        );
        let orchestrator = QueryOrchestrator::new(
            translator.clone(),
            Arc::new(ScriptedSynthesizer::echoing()),
            Arc::new(fixtures::document_store()),
            Some(cache),
            FinqueryConfig::default(),
        );
        let tenant = fixtures::tenant_a();

        let (first, second) = run(async {
            let first = orchestrator.process_query(FOOD_QUESTION, &tenant).await;
            let second = orchestrator.process_query(&variant, &tenant).await;
            (first, second)
        });

        let first = first.unwrap();
        let second = second.unwrap();
        prop_assert!(!first.from_cache);
        prop_assert!(second.from_cache, "variant {:?} missed the cache", variant);
        prop_assert_eq!(second.answer, first.answer);
        prop_assert_eq!(translator.calls(), 1);
    }
}
