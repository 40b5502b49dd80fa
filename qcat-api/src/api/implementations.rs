//! Implementation endpoints
//!
//! Implementations are nested under the algorithm they implement. Every
//! nested operation first checks that the implementation belongs to the
//! algorithm in the path and answers 404 otherwise.

use axum::{
    extract::State,
    http::StatusCode,
    response::Response,
    routing::{delete, get},
    Json, Router,
};
use qcat_common::db::associations::{self, Association, Direction};
use qcat_common::db::{implementations, platforms, publications, tags};
use qcat_common::models::{EntityReference, Implementation, ImplementationInput, Tag};
use qcat_common::{Page, PageRequest};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use uuid::Uuid;

use super::created;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::{ApiError, ApiResult, AppState};

/// GET /v1/implementations
pub async fn list_all_implementations(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PageRequest>,
) -> ApiResult<Json<Page<Implementation>>> {
    let request = state.page_request(query);
    Ok(Json(implementations::find_all(&state.db, &request).await?))
}

/// GET /v1/algorithms/:id/implementations
pub async fn list_implementations(
    State(state): State<AppState>,
    AppPath(algorithm_id): AppPath<Uuid>,
    AppQuery(query): AppQuery<PageRequest>,
) -> ApiResult<Json<Page<Implementation>>> {
    let request = state.page_request(query);
    Ok(Json(
        implementations::find_by_algorithm(&state.db, algorithm_id, &request).await?,
    ))
}

/// POST /v1/algorithms/:id/implementations
pub async fn create_implementation(
    State(state): State<AppState>,
    AppPath(algorithm_id): AppPath<Uuid>,
    AppJson(input): AppJson<ImplementationInput>,
) -> ApiResult<Response> {
    let implementation = implementations::create(&state.db, algorithm_id, &input).await?;
    Ok(created(
        format!(
            "/v1/algorithms/{}/implementations/{}",
            algorithm_id, implementation.id
        ),
        implementation,
    ))
}

pub async fn get_implementation(
    State(state): State<AppState>,
    AppPath((algorithm_id, implementation_id)): AppPath<(Uuid, Uuid)>,
) -> ApiResult<Json<Implementation>> {
    Ok(Json(
        implementations::check_implementation_of_algorithm(
            &state.db,
            algorithm_id,
            implementation_id,
        )
        .await?,
    ))
}

pub async fn update_implementation(
    State(state): State<AppState>,
    AppPath((algorithm_id, implementation_id)): AppPath<(Uuid, Uuid)>,
    AppJson(input): AppJson<ImplementationInput>,
) -> ApiResult<Json<Implementation>> {
    Ok(Json(
        implementations::update(&state.db, algorithm_id, implementation_id, &input).await?,
    ))
}

pub async fn delete_implementation(
    State(state): State<AppState>,
    AppPath((algorithm_id, implementation_id)): AppPath<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    implementations::delete(&state.db, algorithm_id, implementation_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_tags(
    State(state): State<AppState>,
    AppPath((algorithm_id, implementation_id)): AppPath<(Uuid, Uuid)>,
    AppQuery(query): AppQuery<PageRequest>,
) -> ApiResult<Json<Page<Tag>>> {
    implementations::check_implementation_of_algorithm(&state.db, algorithm_id, implementation_id)
        .await?;
    let request = state.page_request(query);
    let page = associations::fetch_linked(
        &state.db,
        Association::ImplementationTag,
        Direction::Forward,
        &implementation_id.to_string(),
        &request,
        tags::map_tag,
    )
    .await?;
    Ok(Json(page))
}

pub async fn add_tag(
    State(state): State<AppState>,
    AppPath((algorithm_id, implementation_id)): AppPath<(Uuid, Uuid)>,
    AppJson(tag): AppJson<Tag>,
) -> ApiResult<StatusCode> {
    implementations::link_tag(&state.db, algorithm_id, implementation_id, &tag).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_tag(
    State(state): State<AppState>,
    AppPath((algorithm_id, implementation_id, value)): AppPath<(Uuid, Uuid, String)>,
) -> ApiResult<StatusCode> {
    implementations::unlink_tag(&state.db, algorithm_id, implementation_id, &value).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List/link/unlink routes for an implementation-owned association
///
/// `segment` is appended to the nested implementation path.
fn implementation_link_routes<T>(
    segment: &str,
    association: Association,
    map: fn(&SqliteRow) -> qcat_common::Result<T>,
) -> Router<AppState>
where
    T: Serialize + Send + 'static,
{
    let base = format!("/v1/algorithms/:id/implementations/:implementation_id/{}", segment);

    let list = move |State(state): State<AppState>,
                     AppPath((algorithm_id, implementation_id)): AppPath<(Uuid, Uuid)>,
                     AppQuery(query): AppQuery<PageRequest>| async move {
        implementations::check_implementation_of_algorithm(
            &state.db,
            algorithm_id,
            implementation_id,
        )
        .await?;
        let request = state.page_request(query);
        let page = associations::fetch_linked(
            &state.db,
            association,
            Direction::Forward,
            &implementation_id.to_string(),
            &request,
            map,
        )
        .await?;
        Ok::<_, ApiError>(Json(page))
    };

    let add = move |State(state): State<AppState>,
                    AppPath((algorithm_id, implementation_id)): AppPath<(Uuid, Uuid)>,
                    AppJson(target): AppJson<EntityReference>| async move {
        implementations::check_implementation_of_algorithm(
            &state.db,
            algorithm_id,
            implementation_id,
        )
        .await?;
        associations::link(
            &state.db,
            association,
            &implementation_id.to_string(),
            &target.id.to_string(),
        )
        .await?;
        Ok::<_, ApiError>(StatusCode::NO_CONTENT)
    };

    let remove = move |State(state): State<AppState>,
                       AppPath((algorithm_id, implementation_id, linked_id)): AppPath<(
        Uuid,
        Uuid,
        Uuid,
    )>| async move {
        implementations::check_implementation_of_algorithm(
            &state.db,
            algorithm_id,
            implementation_id,
        )
        .await?;
        associations::unlink(
            &state.db,
            association,
            &implementation_id.to_string(),
            &linked_id.to_string(),
        )
        .await?;
        Ok::<_, ApiError>(StatusCode::NO_CONTENT)
    };

    Router::new()
        .route(&base, get(list).post(add))
        .route(&format!("{}/:linked_id", base), delete(remove))
}

/// Build implementation routes
pub fn implementation_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/implementations", get(list_all_implementations))
        .route(
            "/v1/algorithms/:id/implementations",
            get(list_implementations).post(create_implementation),
        )
        .route(
            "/v1/algorithms/:id/implementations/:implementation_id",
            get(get_implementation)
                .put(update_implementation)
                .delete(delete_implementation),
        )
        .route(
            "/v1/algorithms/:id/implementations/:implementation_id/tags",
            get(list_tags).post(add_tag),
        )
        .route(
            "/v1/algorithms/:id/implementations/:implementation_id/tags/:value",
            delete(remove_tag),
        )
        .merge(implementation_link_routes(
            "publications",
            Association::ImplementationPublication,
            publications::map_publication,
        ))
        .merge(implementation_link_routes(
            "software-platforms",
            Association::ImplementationSoftwarePlatform,
            platforms::map_software_platform,
        ))
}
