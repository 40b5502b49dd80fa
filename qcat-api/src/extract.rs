//! Extractors whose rejections use the API error body
//!
//! The stock axum extractors answer malformed input with plain-text 4xx
//! responses (422 for JSON that misses a field). These wrappers turn every
//! rejection into a 400 `ApiError::BadRequest`.

use axum::extract::{FromRequest, FromRequestParts};

use crate::ApiError;

/// JSON request body
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

/// Path parameters
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct AppPath<T>(pub T);

/// Query string parameters
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct AppQuery<T>(pub T);
