//! HTTP API module for Causeway
//!
//! Provides read-only REST endpoints over the imported graph:
//! - Search by label
//! - Entity detail and one-hop neighbors
//! - Graph statistics

pub mod server;

pub use server::{
    create_server, start_server, AppState, EntitySummary, ErrorResponse, NeighborsResponse,
    SearchParams, SuccessResponse,
};
