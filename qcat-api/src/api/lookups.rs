//! Application area and learning method endpoints
//!
//! Both collections share one shape, so their routes come from one builder.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use qcat_common::db::lookups::{self, Lookup};
use qcat_common::models::NamedEntityInput;
use qcat_common::PageRequest;
use uuid::Uuid;

use super::created;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::{ApiError, AppState};

fn collection_routes(base: &'static str, lookup: Lookup) -> Router<AppState> {
    let list = move |State(state): State<AppState>,
                     AppQuery(query): AppQuery<PageRequest>| async move {
        let request = state.page_request(query);
        let page = lookups::find_all(&state.db, lookup, &request).await?;
        Ok::<_, ApiError>(Json(page))
    };

    let create = move |State(state): State<AppState>,
                       AppJson(input): AppJson<NamedEntityInput>| async move {
        let entity = lookups::create(&state.db, lookup, &input).await?;
        Ok::<_, ApiError>(created(format!("{}/{}", base, entity.id), entity))
    };

    let fetch = move |State(state): State<AppState>, AppPath(id): AppPath<Uuid>| async move {
        let entity = lookups::find_by_id(&state.db, lookup, id).await?;
        Ok::<_, ApiError>(Json(entity))
    };

    let update = move |State(state): State<AppState>,
                       AppPath(id): AppPath<Uuid>,
                       AppJson(input): AppJson<NamedEntityInput>| async move {
        let entity = lookups::update(&state.db, lookup, id, &input).await?;
        Ok::<_, ApiError>(Json(entity))
    };

    let remove = move |State(state): State<AppState>, AppPath(id): AppPath<Uuid>| async move {
        lookups::delete(&state.db, lookup, id).await?;
        Ok::<_, ApiError>(StatusCode::NO_CONTENT)
    };

    let algorithms = move |State(state): State<AppState>,
                           AppPath(id): AppPath<Uuid>,
                           AppQuery(query): AppQuery<PageRequest>| async move {
        let request = state.page_request(query);
        let page = lookups::find_algorithms(&state.db, lookup, id, &request).await?;
        Ok::<_, ApiError>(Json(page))
    };

    Router::new()
        .route(base, get(list).post(create))
        .route(
            &format!("{}/:id", base),
            get(fetch).put(update).delete(remove),
        )
        .route(&format!("{}/:id/algorithms", base), get(algorithms))
}

/// Build application area and learning method routes
pub fn lookup_routes() -> Router<AppState> {
    Router::new()
        .merge(collection_routes(
            "/v1/application-areas",
            Lookup::ApplicationArea,
        ))
        .merge(collection_routes(
            "/v1/learning-methods",
            Lookup::LearningMethod,
        ))
}
