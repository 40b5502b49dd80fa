//! Pattern relation endpoints
//!
//! A pattern relation points from an algorithm to an external pattern URI.

use axum::{extract::State, http::StatusCode, response::Response, routing::get, Json, Router};
use qcat_common::db::patterns;
use qcat_common::models::{
    PatternRelation, PatternRelationInput, PatternRelationType, PatternRelationTypeInput,
};
use qcat_common::{Page, PageRequest};
use uuid::Uuid;

use super::created;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::{ApiResult, AppState};

pub async fn list_relations(
    State(state): State<AppState>,
    AppPath(algorithm_id): AppPath<Uuid>,
    AppQuery(query): AppQuery<PageRequest>,
) -> ApiResult<Json<Page<PatternRelation>>> {
    let request = state.page_request(query);
    Ok(Json(
        patterns::find_by_algorithm(&state.db, algorithm_id, &request).await?,
    ))
}

pub async fn add_relation(
    State(state): State<AppState>,
    AppPath(algorithm_id): AppPath<Uuid>,
    AppJson(input): AppJson<PatternRelationInput>,
) -> ApiResult<Response> {
    let relation = patterns::add_relation(&state.db, algorithm_id, &input).await?;
    Ok(created(
        format!(
            "/v1/algorithms/{}/pattern-relations/{}",
            algorithm_id, relation.id
        ),
        relation,
    ))
}

pub async fn get_relation(
    State(state): State<AppState>,
    AppPath((algorithm_id, relation_id)): AppPath<(Uuid, Uuid)>,
) -> ApiResult<Json<PatternRelation>> {
    Ok(Json(
        patterns::find_relation(&state.db, algorithm_id, relation_id).await?,
    ))
}

pub async fn update_relation(
    State(state): State<AppState>,
    AppPath((algorithm_id, relation_id)): AppPath<(Uuid, Uuid)>,
    AppJson(input): AppJson<PatternRelationInput>,
) -> ApiResult<Json<PatternRelation>> {
    Ok(Json(
        patterns::update_relation(&state.db, algorithm_id, relation_id, &input).await?,
    ))
}

pub async fn remove_relation(
    State(state): State<AppState>,
    AppPath((algorithm_id, relation_id)): AppPath<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    patterns::remove_relation(&state.db, algorithm_id, relation_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_types(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PageRequest>,
) -> ApiResult<Json<Page<PatternRelationType>>> {
    let request = state.page_request(query);
    Ok(Json(patterns::find_all_types(&state.db, &request).await?))
}

pub async fn create_type(
    State(state): State<AppState>,
    AppJson(input): AppJson<PatternRelationTypeInput>,
) -> ApiResult<Response> {
    let relation_type = patterns::create_type(&state.db, &input).await?;
    Ok(created(
        format!("/v1/pattern-relation-types/{}", relation_type.id),
        relation_type,
    ))
}

pub async fn get_type(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Json<PatternRelationType>> {
    Ok(Json(patterns::find_type(&state.db, id).await?))
}

pub async fn update_type(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(input): AppJson<PatternRelationTypeInput>,
) -> ApiResult<Json<PatternRelationType>> {
    Ok(Json(patterns::update_type(&state.db, id, &input).await?))
}

pub async fn delete_type(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<StatusCode> {
    patterns::delete_type(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Build pattern relation routes
pub fn pattern_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/algorithms/:id/pattern-relations",
            get(list_relations).post(add_relation),
        )
        .route(
            "/v1/algorithms/:id/pattern-relations/:relation_id",
            get(get_relation)
                .put(update_relation)
                .delete(remove_relation),
        )
        .route(
            "/v1/pattern-relation-types",
            get(list_types).post(create_type),
        )
        .route(
            "/v1/pattern-relation-types/:id",
            get(get_type).put(update_type).delete(delete_type),
        )
}
