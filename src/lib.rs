//! # Causeway
//!
//! Causeway pulls causal and influence relationships between entities (people, works,
//! ideologies, events) out of the Wikidata SPARQL endpoint, cleans and deduplicates them,
//! loads them into a graph store and serves a small read-only query API over the result.
//!
//! The interesting part is the extraction pipeline: paginated `LIMIT`/`OFFSET` queries
//! against a rate-limited public endpoint, lenient repair of broken response bodies,
//! per-record validation, and periodic checkpoints so a run can be resumed after a failure.
//!
//! ## Example
//!
//! ```rust,no_run
//! use causeway::config::{EndpointConfig, ExtractionConfig};
//! use causeway::extraction::{
//!     driver::PaginationDriver, fetcher::BatchFetcher, fetcher::HttpSparqlTransport,
//!     plan::CausalityPlan, retry::RetryPolicy,
//! };
//!
//! # async fn run() -> causeway::Result<()> {
//! let transport = HttpSparqlTransport::new(EndpointConfig::from_env())?;
//! let fetcher = BatchFetcher::new(transport, RetryPolicy::default());
//! let mut driver = PaginationDriver::new(fetcher, CausalityPlan::new(), ExtractionConfig::default())?;
//! let summary = driver.run().await?;
//! println!("{} nodes, {} edges", summary.nodes, summary.edges);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::needless_pass_by_value)]

/// Core data structures: identifiers, nodes, edges and pipeline state
pub mod core;

/// Configuration objects shared by the pipeline and the binaries
pub mod config;

/// Error types and result alias
pub mod error;

/// Batched, checkpointed extraction from the remote SPARQL endpoint
pub mod extraction;

/// CSV table contract for nodes and edges
pub mod tabular;

/// Post-extraction cleaning of node and relationship tables
pub mod cleaning;

/// In-memory graph store that cleaned tables are imported into
pub mod graph;

/// Read-only HTTP query API
pub mod http;

// Re-export commonly used types
pub use error::{Error, Result};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Config("batch_size must be greater than zero".to_string());
        assert_eq!(
            format!("{}", err),
            "Configuration error: batch_size must be greater than zero"
        );
    }
}
