//! qcat-api library interface
//!
//! Exposes the router and application state so integration tests can drive
//! the service without binding a socket.

pub mod api;
pub mod error;
pub mod extract;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use qcat_common::config::PaginationConfig;
use qcat_common::PageRequest;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Page size bounds applied to every listing
    pub pagination: PaginationConfig,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, pagination: PaginationConfig) -> Self {
        Self {
            db,
            pagination,
            startup_time: Utc::now(),
        }
    }

    /// Apply the configured page size bounds to a client request
    pub fn page_request(&self, request: PageRequest) -> PageRequest {
        request.bounded(
            self.pagination.default_page_size,
            self.pagination.max_page_size,
        )
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::algorithm_routes())
        .merge(api::relation_routes())
        .merge(api::pattern_routes())
        .merge(api::implementation_routes())
        .merge(api::property_routes())
        .merge(api::package_routes())
        .merge(api::tag_routes())
        .merge(api::publication_routes())
        .merge(api::problem_type_routes())
        .merge(api::lookup_routes())
        .merge(api::platform_routes())
        .merge(api::discussion_routes())
        .merge(api::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
