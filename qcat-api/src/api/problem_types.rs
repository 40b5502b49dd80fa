//! Problem type endpoints

use axum::{extract::State, http::StatusCode, response::Response, routing::get, Json, Router};
use qcat_common::db::problem_types;
use qcat_common::models::{Algorithm, ProblemType, ProblemTypeInput};
use qcat_common::{Page, PageRequest};
use uuid::Uuid;

use super::created;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::{ApiResult, AppState};

pub async fn list_problem_types(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PageRequest>,
) -> ApiResult<Json<Page<ProblemType>>> {
    let request = state.page_request(query);
    Ok(Json(problem_types::find_all(&state.db, &request).await?))
}

pub async fn create_problem_type(
    State(state): State<AppState>,
    AppJson(input): AppJson<ProblemTypeInput>,
) -> ApiResult<Response> {
    let problem_type = problem_types::create(&state.db, &input).await?;
    Ok(created(
        format!("/v1/problem-types/{}", problem_type.id),
        problem_type,
    ))
}

pub async fn get_problem_type(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Json<ProblemType>> {
    Ok(Json(problem_types::find_by_id(&state.db, id).await?))
}

/// PUT /v1/problem-types/:id
///
/// 400 when the new parent would close a cycle.
pub async fn update_problem_type(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(input): AppJson<ProblemTypeInput>,
) -> ApiResult<Json<ProblemType>> {
    Ok(Json(problem_types::update(&state.db, id, &input).await?))
}

pub async fn delete_problem_type(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<StatusCode> {
    problem_types::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/problem-types/:id/problem-type-parent-tree
///
/// Ancestors of the problem type, nearest parent first.
pub async fn get_parent_tree(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Json<Vec<ProblemType>>> {
    Ok(Json(problem_types::find_parent_tree(&state.db, id).await?))
}

pub async fn list_algorithms(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppQuery(query): AppQuery<PageRequest>,
) -> ApiResult<Json<Page<Algorithm>>> {
    let request = state.page_request(query);
    Ok(Json(
        problem_types::find_algorithms(&state.db, id, &request).await?,
    ))
}

/// Build problem type routes
pub fn problem_type_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/problem-types",
            get(list_problem_types).post(create_problem_type),
        )
        .route(
            "/v1/problem-types/:id",
            get(get_problem_type)
                .put(update_problem_type)
                .delete(delete_problem_type),
        )
        .route(
            "/v1/problem-types/:id/problem-type-parent-tree",
            get(get_parent_tree),
        )
        .route("/v1/problem-types/:id/algorithms", get(list_algorithms))
}
