//! Pipeline checkpoint hooks.
//!
//! The orchestrator reports stage exits, cache lookups and request outcomes
//! to every registered [`PipelineObserver`]. Observers are synchronous and
//! must not block; they run inline on the request path.

use std::time::Duration;

use finquery_core::FinqueryError;
use tracing::{debug, info, warn};

/// A step of the request state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    CacheLookup,
    Translate,
    Isolate,
    Execute,
    Synthesize,
    CacheStore,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::CacheLookup => "cache_lookup",
            Stage::Translate => "translate",
            Stage::Isolate => "isolate",
            Stage::Execute => "execute",
            Stage::Synthesize => "synthesize",
            Stage::CacheStore => "cache_store",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of consulting the response cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheLookup {
    Hit,
    /// Not cached, or the cache store failed.
    Miss,
    /// No response cache is configured.
    Bypassed,
}

impl CacheLookup {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheLookup::Hit => "hit",
            CacheLookup::Miss => "miss",
            CacheLookup::Bypassed => "bypassed",
        }
    }
}

/// How a request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryOutcome {
    Answered,
    Cached,
    /// Failed input validation before any external call.
    Rejected,
    Failed,
}

impl QueryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryOutcome::Answered => "answered",
            QueryOutcome::Cached => "cached",
            QueryOutcome::Rejected => "rejected",
            QueryOutcome::Failed => "failed",
        }
    }
}

/// Receives pipeline checkpoints. All methods default to no-ops.
pub trait PipelineObserver: Send + Sync {
    /// A stage finished, successfully or not.
    fn on_stage(&self, _stage: Stage, _elapsed: Duration, _outcome: Result<(), &FinqueryError>) {}

    fn on_cache(&self, _lookup: CacheLookup) {}

    /// A request finished.
    fn on_query(&self, _outcome: QueryOutcome, _elapsed: Duration) {}
}

/// Logs checkpoints through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_stage(&self, stage: Stage, elapsed: Duration, outcome: Result<(), &FinqueryError>) {
        let elapsed_ms = elapsed.as_millis() as u64;
        match outcome {
            Ok(()) => debug!(stage = %stage, elapsed_ms, "Stage complete"),
            Err(e) => warn!(stage = %stage, elapsed_ms, error = %e, "Stage failed"),
        }
    }

    fn on_cache(&self, lookup: CacheLookup) {
        debug!(lookup = lookup.as_str(), "Cache lookup");
    }

    fn on_query(&self, outcome: QueryOutcome, elapsed: Duration) {
        info!(
            outcome = outcome.as_str(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Query finished"
        );
    }
}

/// Fans checkpoints out to several observers.
#[derive(Clone, Default)]
pub(crate) struct ObserverChain {
    observers: Vec<std::sync::Arc<dyn PipelineObserver>>,
}

impl ObserverChain {
    pub(crate) fn add(&mut self, observer: std::sync::Arc<dyn PipelineObserver>) {
        self.observers.push(observer);
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }
}

impl PipelineObserver for ObserverChain {
    fn on_stage(&self, stage: Stage, elapsed: Duration, outcome: Result<(), &FinqueryError>) {
        for observer in &self.observers {
            observer.on_stage(stage, elapsed, outcome);
        }
    }

    fn on_cache(&self, lookup: CacheLookup) {
        for observer in &self.observers {
            observer.on_cache(lookup);
        }
    }

    fn on_query(&self, outcome: QueryOutcome, elapsed: Duration) {
        for observer in &self.observers {
            observer.on_query(outcome, elapsed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Counting {
        stages: AtomicUsize,
        lookups: AtomicUsize,
    }

    impl PipelineObserver for Counting {
        fn on_stage(&self, _: Stage, _: Duration, _: Result<(), &FinqueryError>) {
            self.stages.fetch_add(1, Ordering::SeqCst);
        }
        fn on_cache(&self, _: CacheLookup) {
            self.lookups.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_chain_fans_out() {
        let a = Arc::new(Counting::default());
        let b = Arc::new(Counting::default());
        let mut chain = ObserverChain::default();
        chain.add(a.clone());
        chain.add(b.clone());
        assert_eq!(chain.len(), 2);

        chain.on_stage(Stage::Translate, Duration::from_millis(3), Ok(()));
        chain.on_cache(CacheLookup::Miss);
        chain.on_query(QueryOutcome::Answered, Duration::from_millis(9));

        assert_eq!(a.stages.load(Ordering::SeqCst), 1);
        assert_eq!(b.lookups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_labels() {
        assert_eq!(Stage::CacheStore.to_string(), "cache_store");
        assert_eq!(CacheLookup::Bypassed.as_str(), "bypassed");
        assert_eq!(QueryOutcome::Rejected.as_str(), "rejected");
    }
}
