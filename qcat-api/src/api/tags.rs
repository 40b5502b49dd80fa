//! Tag endpoints
//!
//! Tags are addressed by their value.

use axum::{extract::State, http::StatusCode, response::Response, routing::get, Json, Router};
use qcat_common::db::tags;
use qcat_common::models::{Algorithm, Implementation, Tag};
use qcat_common::{Page, PageRequest};

use super::created;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::{ApiResult, AppState};

pub async fn list_tags(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PageRequest>,
) -> ApiResult<Json<Page<Tag>>> {
    let request = state.page_request(query);
    Ok(Json(tags::find_all(&state.db, &request).await?))
}

/// POST /v1/tags
///
/// 409 when the value already exists.
pub async fn create_tag(
    State(state): State<AppState>,
    AppJson(tag): AppJson<Tag>,
) -> ApiResult<Response> {
    let tag = tags::create(&state.db, &tag).await?;
    Ok(created(format!("/v1/tags/{}", tag.value), tag))
}

pub async fn get_tag(
    State(state): State<AppState>,
    AppPath(value): AppPath<String>,
) -> ApiResult<Json<Tag>> {
    Ok(Json(tags::find_by_value(&state.db, &value).await?))
}

/// PUT /v1/tags/:value
///
/// Only the category can change; a different value is rejected with 400.
pub async fn update_tag(
    State(state): State<AppState>,
    AppPath(value): AppPath<String>,
    AppJson(tag): AppJson<Tag>,
) -> ApiResult<Json<Tag>> {
    Ok(Json(tags::update(&state.db, &value, &tag).await?))
}

pub async fn delete_tag(
    State(state): State<AppState>,
    AppPath(value): AppPath<String>,
) -> ApiResult<StatusCode> {
    tags::delete(&state.db, &value).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_tagged_algorithms(
    State(state): State<AppState>,
    AppPath(value): AppPath<String>,
    AppQuery(query): AppQuery<PageRequest>,
) -> ApiResult<Json<Page<Algorithm>>> {
    let request = state.page_request(query);
    Ok(Json(tags::find_algorithms(&state.db, &value, &request).await?))
}

pub async fn list_tagged_implementations(
    State(state): State<AppState>,
    AppPath(value): AppPath<String>,
    AppQuery(query): AppQuery<PageRequest>,
) -> ApiResult<Json<Page<Implementation>>> {
    let request = state.page_request(query);
    Ok(Json(
        tags::find_implementations(&state.db, &value, &request).await?,
    ))
}

/// Build tag routes
pub fn tag_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/tags", get(list_tags).post(create_tag))
        .route(
            "/v1/tags/:value",
            get(get_tag).put(update_tag).delete(delete_tag),
        )
        .route("/v1/tags/:value/algorithms", get(list_tagged_algorithms))
        .route(
            "/v1/tags/:value/implementations",
            get(list_tagged_implementations),
        )
}
