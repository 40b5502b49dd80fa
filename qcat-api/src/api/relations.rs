//! Algorithm relation endpoints and the relation type vocabulary

use axum::{extract::State, http::StatusCode, response::Response, routing::get, Json, Router};
use qcat_common::db::relations;
use qcat_common::models::{
    AlgoRelationType, AlgoRelationTypeInput, AlgorithmRelation, AlgorithmRelationInput,
};
use qcat_common::{Page, PageRequest};
use uuid::Uuid;

use super::created;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::{ApiResult, AppState};

/// GET /v1/algorithms/:id/algorithm-relations
///
/// Relations where the algorithm is either source or target.
pub async fn list_relations(
    State(state): State<AppState>,
    AppPath(algorithm_id): AppPath<Uuid>,
    AppQuery(query): AppQuery<PageRequest>,
) -> ApiResult<Json<Page<AlgorithmRelation>>> {
    let request = state.page_request(query);
    Ok(Json(
        relations::find_by_algorithm(&state.db, algorithm_id, &request).await?,
    ))
}

/// POST /v1/algorithms/:id/algorithm-relations
pub async fn add_relation(
    State(state): State<AppState>,
    AppPath(algorithm_id): AppPath<Uuid>,
    AppJson(input): AppJson<AlgorithmRelationInput>,
) -> ApiResult<Response> {
    let relation = relations::add_relation(&state.db, algorithm_id, &input).await?;
    Ok(created(
        format!(
            "/v1/algorithms/{}/algorithm-relations/{}",
            algorithm_id, relation.id
        ),
        relation,
    ))
}

pub async fn get_relation(
    State(state): State<AppState>,
    AppPath((algorithm_id, relation_id)): AppPath<(Uuid, Uuid)>,
) -> ApiResult<Json<AlgorithmRelation>> {
    Ok(Json(
        relations::find_relation(&state.db, algorithm_id, relation_id).await?,
    ))
}

pub async fn update_relation(
    State(state): State<AppState>,
    AppPath((algorithm_id, relation_id)): AppPath<(Uuid, Uuid)>,
    AppJson(input): AppJson<AlgorithmRelationInput>,
) -> ApiResult<Json<AlgorithmRelation>> {
    Ok(Json(
        relations::update_relation(&state.db, algorithm_id, relation_id, &input).await?,
    ))
}

/// DELETE /v1/algorithms/:id/algorithm-relations/:relation_id
///
/// Removing an absent relation is a no-op.
pub async fn remove_relation(
    State(state): State<AppState>,
    AppPath((algorithm_id, relation_id)): AppPath<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    relations::remove_relation(&state.db, algorithm_id, relation_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_types(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PageRequest>,
) -> ApiResult<Json<Page<AlgoRelationType>>> {
    let request = state.page_request(query);
    Ok(Json(relations::find_all_types(&state.db, &request).await?))
}

pub async fn create_type(
    State(state): State<AppState>,
    AppJson(input): AppJson<AlgoRelationTypeInput>,
) -> ApiResult<Response> {
    let relation_type = relations::create_type(&state.db, &input).await?;
    Ok(created(
        format!("/v1/algo-relation-types/{}", relation_type.id),
        relation_type,
    ))
}

pub async fn get_type(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Json<AlgoRelationType>> {
    Ok(Json(relations::find_type(&state.db, id).await?))
}

pub async fn update_type(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(input): AppJson<AlgoRelationTypeInput>,
) -> ApiResult<Json<AlgoRelationType>> {
    Ok(Json(relations::update_type(&state.db, id, &input).await?))
}

/// DELETE /v1/algo-relation-types/:id
///
/// 409 while any relation uses the type.
pub async fn delete_type(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<StatusCode> {
    relations::delete_type(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Build algorithm relation routes
pub fn relation_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/algorithms/:id/algorithm-relations",
            get(list_relations).post(add_relation),
        )
        .route(
            "/v1/algorithms/:id/algorithm-relations/:relation_id",
            get(get_relation)
                .put(update_relation)
                .delete(remove_relation),
        )
        .route("/v1/algo-relation-types", get(list_types).post(create_type))
        .route(
            "/v1/algo-relation-types/:id",
            get(get_type).put(update_type).delete(delete_type),
        )
}
