//! Algorithm endpoints
//!
//! CRUD on `/v1/algorithms` plus the classification links owned by an
//! algorithm. Relations, properties and implementations have their own
//! modules.

use axum::{
    extract::State,
    http::StatusCode,
    response::Response,
    routing::{delete, get},
    Json, Router,
};
use qcat_common::db::associations::{self, Association, Direction};
use qcat_common::db::{algorithms, lookups, problem_types, publications, tags};
use qcat_common::models::{Algorithm, AlgorithmInput, Tag};
use qcat_common::{Page, PageRequest};
use uuid::Uuid;

use super::{created, links::link_routes};
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::{ApiResult, AppState};

/// GET /v1/algorithms
pub async fn list_algorithms(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PageRequest>,
) -> ApiResult<Json<Page<Algorithm>>> {
    let request = state.page_request(query);
    Ok(Json(algorithms::find_all(&state.db, &request).await?))
}

/// POST /v1/algorithms
pub async fn create_algorithm(
    State(state): State<AppState>,
    AppJson(input): AppJson<AlgorithmInput>,
) -> ApiResult<Response> {
    let algorithm = algorithms::create(&state.db, &input).await?;
    Ok(created(format!("/v1/algorithms/{}", algorithm.id), algorithm))
}

/// GET /v1/algorithms/:id
pub async fn get_algorithm(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Json<Algorithm>> {
    Ok(Json(algorithms::find_by_id(&state.db, id).await?))
}

/// PUT /v1/algorithms/:id
pub async fn update_algorithm(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(input): AppJson<AlgorithmInput>,
) -> ApiResult<Json<Algorithm>> {
    Ok(Json(algorithms::update(&state.db, id, &input).await?))
}

/// DELETE /v1/algorithms/:id
///
/// 409 while implementations still reference the algorithm.
pub async fn delete_algorithm(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<StatusCode> {
    algorithms::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/algorithms/:id/tags
pub async fn list_tags(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppQuery(query): AppQuery<PageRequest>,
) -> ApiResult<Json<Page<Tag>>> {
    let request = state.page_request(query);
    let page = associations::fetch_linked(
        &state.db,
        Association::AlgorithmTag,
        Direction::Forward,
        &id.to_string(),
        &request,
        tags::map_tag,
    )
    .await?;
    Ok(Json(page))
}

/// POST /v1/algorithms/:id/tags
///
/// Body is a tag; unknown values are created on the fly.
pub async fn add_tag(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(tag): AppJson<Tag>,
) -> ApiResult<StatusCode> {
    algorithms::link_tag(&state.db, id, &tag).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /v1/algorithms/:id/tags/:value
pub async fn remove_tag(
    State(state): State<AppState>,
    AppPath((id, value)): AppPath<(Uuid, String)>,
) -> ApiResult<StatusCode> {
    algorithms::unlink_tag(&state.db, id, &value).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Build algorithm routes
pub fn algorithm_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/algorithms", get(list_algorithms).post(create_algorithm))
        .route(
            "/v1/algorithms/:id",
            get(get_algorithm)
                .put(update_algorithm)
                .delete(delete_algorithm),
        )
        .route("/v1/algorithms/:id/tags", get(list_tags).post(add_tag))
        .route("/v1/algorithms/:id/tags/:value", delete(remove_tag))
        .merge(link_routes(
            "/v1/algorithms/:id/publications",
            Association::AlgorithmPublication,
            Direction::Forward,
            publications::map_publication,
        ))
        .merge(link_routes(
            "/v1/algorithms/:id/problem-types",
            Association::AlgorithmProblemType,
            Direction::Forward,
            problem_types::map_problem_type,
        ))
        .merge(link_routes(
            "/v1/algorithms/:id/application-areas",
            Association::AlgorithmApplicationArea,
            Direction::Forward,
            lookups::map_named,
        ))
        .merge(link_routes(
            "/v1/algorithms/:id/learning-methods",
            Association::AlgorithmLearningMethod,
            Direction::Forward,
            lookups::map_named,
        ))
}
