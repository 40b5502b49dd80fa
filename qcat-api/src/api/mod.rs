//! HTTP API handlers
//!
//! Every collection lives under `/v1`. The first path parameter under a
//! collection is always named `id` so nested routes share one router node.

pub mod algorithms;
pub mod discussions;
pub mod health;
pub mod implementations;
pub mod links;
pub mod lookups;
pub mod packages;
pub mod patterns;
pub mod platforms;
pub mod problem_types;
pub mod properties;
pub mod publications;
pub mod relations;
pub mod tags;

pub use algorithms::algorithm_routes;
pub use discussions::discussion_routes;
pub use health::health_routes;
pub use implementations::implementation_routes;
pub use lookups::lookup_routes;
pub use packages::package_routes;
pub use patterns::pattern_routes;
pub use platforms::platform_routes;
pub use problem_types::problem_type_routes;
pub use properties::property_routes;
pub use publications::publication_routes;
pub use relations::relation_routes;
pub use tags::tag_routes;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// 201 with a `Location` header pointing at the new resource
pub(crate) fn created<T: Serialize>(location: String, body: T) -> Response {
    (StatusCode::CREATED, [(header::LOCATION, location)], Json(body)).into_response()
}
