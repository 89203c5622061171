//! FINQUERY Pipeline - Question to Answer
//!
//! The request path of the service:
//!
//! ```text
//! question -> cache lookup -> [miss] translate -> isolate -> execute
//!          -> synthesize -> cache store -> QueryResult
//! ```
//!
//! - [`guard`]: rewrites untrusted translator output so every tenant-owned
//!   read is filtered to the requesting tenant.
//! - [`executor`]: allow-list checks and execution against the document store.
//! - [`orchestrator`]: drives one request through the stages above.
//! - [`observer`]: checkpoint hooks for logging and metrics.

pub mod executor;
pub mod guard;
pub mod observer;
pub mod orchestrator;

pub use executor::QueryExecutor;
pub use guard::{enforce, IsolatedQuery};
pub use observer::{CacheLookup, PipelineObserver, QueryOutcome, Stage, TracingObserver};
pub use orchestrator::QueryOrchestrator;
