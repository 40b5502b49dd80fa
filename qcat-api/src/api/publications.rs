//! Publication endpoints

use axum::{extract::State, http::StatusCode, response::Response, routing::get, Json, Router};
use qcat_common::db::publications;
use qcat_common::models::{Algorithm, Implementation, Publication, PublicationInput};
use qcat_common::{Page, PageRequest};
use uuid::Uuid;

use super::created;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::{ApiResult, AppState};

pub async fn list_publications(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PageRequest>,
) -> ApiResult<Json<Page<Publication>>> {
    let request = state.page_request(query);
    Ok(Json(publications::find_all(&state.db, &request).await?))
}

pub async fn create_publication(
    State(state): State<AppState>,
    AppJson(input): AppJson<PublicationInput>,
) -> ApiResult<Response> {
    let publication = publications::create(&state.db, &input).await?;
    Ok(created(
        format!("/v1/publications/{}", publication.id),
        publication,
    ))
}

pub async fn get_publication(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Json<Publication>> {
    Ok(Json(publications::find_by_id(&state.db, id).await?))
}

pub async fn update_publication(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(input): AppJson<PublicationInput>,
) -> ApiResult<Json<Publication>> {
    Ok(Json(publications::update(&state.db, id, &input).await?))
}

pub async fn delete_publication(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<StatusCode> {
    publications::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_algorithms(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppQuery(query): AppQuery<PageRequest>,
) -> ApiResult<Json<Page<Algorithm>>> {
    let request = state.page_request(query);
    Ok(Json(
        publications::find_algorithms(&state.db, id, &request).await?,
    ))
}

pub async fn list_implementations(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppQuery(query): AppQuery<PageRequest>,
) -> ApiResult<Json<Page<Implementation>>> {
    let request = state.page_request(query);
    Ok(Json(
        publications::find_implementations(&state.db, id, &request).await?,
    ))
}

/// Build publication routes
pub fn publication_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/publications",
            get(list_publications).post(create_publication),
        )
        .route(
            "/v1/publications/:id",
            get(get_publication)
                .put(update_publication)
                .delete(delete_publication),
        )
        .route("/v1/publications/:id/algorithms", get(list_algorithms))
        .route(
            "/v1/publications/:id/implementations",
            get(list_implementations),
        )
}
