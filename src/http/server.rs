//! HTTP API Server for Causeway
//!
//! Read-only endpoints over an imported [`GraphStore`]: label search, entity detail and
//! one-hop neighborhoods.

use crate::{
    core::EntityId,
    graph::{GraphNode, GraphStats, GraphStore, Neighbor},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub const DEFAULT_SEARCH_LIMIT: usize = 20;
pub const MAX_SEARCH_LIMIT: usize = 100;

/// Query string of `GET /search`
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub limit: Option<usize>,
}

/// One search hit
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntitySummary {
    pub id: String,
    pub label: String,
}

/// Response for `GET /entities/:id/neighbors`
#[derive(Debug, Serialize)]
pub struct NeighborsResponse {
    pub entity: GraphNode,
    pub outgoing: Vec<Neighbor>,
    pub incoming: Vec<Neighbor>,
}

/// Generic success response
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Shared application state
pub struct AppState {
    pub graph: Arc<GraphStore>,
}

/// Custom error type for API errors
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

/// Create the HTTP server with all routes
pub fn create_server(graph: Arc<GraphStore>) -> Router {
    let state = Arc::new(AppState { graph });

    // Configure CORS
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/search", get(search))
        .route("/entities/:id", get(get_entity))
        .route("/entities/:id/neighbors", get(get_neighbors))
        .route("/stats", get(stats))
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(SuccessResponse { message: "Causeway HTTP API is running".to_string() })
}

/// GET /search?q=<term>&limit=<n> - Case-insensitive label search
async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<EntitySummary>>, ApiError> {
    let term = params
        .q
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Query parameter 'q' must not be empty".to_string()))?;

    let limit = params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    if !(1..=MAX_SEARCH_LIMIT).contains(&limit) {
        return Err(ApiError::BadRequest(format!(
            "Query parameter 'limit' must be between 1 and {}",
            MAX_SEARCH_LIMIT
        )));
    }

    let hits = state
        .graph
        .search(&term, limit)
        .into_iter()
        .map(|node| EntitySummary { id: node.id.to_string(), label: node.label.clone() })
        .collect();

    Ok(Json(hits))
}

fn parse_id(raw: &str) -> Result<EntityId, ApiError> {
    EntityId::new(raw).ok_or_else(|| ApiError::BadRequest("Entity id must not be empty".to_string()))
}

/// GET /entities/:id - Entity detail
async fn get_entity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<GraphNode>, ApiError> {
    let entity_id = parse_id(&id)?;
    let node = state
        .graph
        .entity(&entity_id)
        .ok_or_else(|| ApiError::NotFound(format!("Entity '{}' not found", id)))?;

    Ok(Json(node.clone()))
}

/// GET /entities/:id/neighbors - One-hop neighborhood
async fn get_neighbors(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<NeighborsResponse>, ApiError> {
    let entity_id = parse_id(&id)?;
    let hood = state
        .graph
        .neighbors(&entity_id)
        .ok_or_else(|| ApiError::NotFound(format!("Entity '{}' not found", id)))?;

    Ok(Json(NeighborsResponse {
        entity: hood.entity.clone(),
        outgoing: hood.outgoing,
        incoming: hood.incoming,
    }))
}

/// GET /stats - Node and edge counts
async fn stats(State(state): State<Arc<AppState>>) -> Json<GraphStats> {
    Json(state.graph.stats())
}

/// Start the HTTP server
pub async fn start_server(
    addr: &str,
    graph: Arc<GraphStore>,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_server(graph);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Causeway HTTP API server listening on http://{}", addr);
    tracing::info!("  GET /search?q=<term>&limit=<n>  - Search entities by label");
    tracing::info!("  GET /entities/:id              - Entity detail");
    tracing::info!("  GET /entities/:id/neighbors    - One-hop neighbors");
    tracing::info!("  GET /stats                     - Graph statistics");
    tracing::info!("  GET /health                    - Health check");

    axum::serve(listener, app).await?;

    Ok(())
}
