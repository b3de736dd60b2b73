//! Batched, checkpointed extraction from a remote SPARQL endpoint
//!
//! Data flows driver -> fetcher -> (repair on decode failure) -> validator -> plan merge
//! -> checkpoint manager. Everything runs on a single logical task.

pub mod catalog;
pub mod checkpoint;
pub mod driver;
pub mod fetcher;
pub mod plan;
pub mod query;
pub mod record;
pub mod repair;
pub mod retry;
pub mod schema;
pub mod validator;

pub use checkpoint::{CheckpointLocation, CheckpointManager, CheckpointManifest};
pub use driver::{DriverPhase, PaginationDriver, RunSummary};
pub use fetcher::{
    BatchFetcher, FetchError, FetchOutcome, HttpSparqlTransport, SparqlTransport, TransportError,
};
pub use plan::{CausalityPlan, EntityPlan, ExtractionPlan, InfluencePlan};
pub use query::QueryTemplate;
pub use retry::{RetryDecision, RetryPolicy};
