//! Implementation package and TOSCA application endpoints

use axum::{extract::State, http::StatusCode, response::Response, routing::get, Json, Router};
use qcat_common::db::{implementations, packages};
use qcat_common::models::{
    ImplementationPackage, ImplementationPackageInput, ToscaApplication, ToscaApplicationInput,
};
use qcat_common::{Page, PageRequest};
use uuid::Uuid;

use super::created;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::{ApiResult, AppState};

pub async fn list_packages(
    State(state): State<AppState>,
    AppPath((algorithm_id, implementation_id)): AppPath<(Uuid, Uuid)>,
    AppQuery(query): AppQuery<PageRequest>,
) -> ApiResult<Json<Page<ImplementationPackage>>> {
    implementations::check_implementation_of_algorithm(&state.db, algorithm_id, implementation_id)
        .await?;
    let request = state.page_request(query);
    Ok(Json(
        packages::find_by_implementation(&state.db, implementation_id, &request).await?,
    ))
}

pub async fn create_package(
    State(state): State<AppState>,
    AppPath((algorithm_id, implementation_id)): AppPath<(Uuid, Uuid)>,
    AppJson(input): AppJson<ImplementationPackageInput>,
) -> ApiResult<Response> {
    implementations::check_implementation_of_algorithm(&state.db, algorithm_id, implementation_id)
        .await?;
    let package = packages::create_package(&state.db, implementation_id, &input).await?;
    Ok(created(
        format!(
            "/v1/algorithms/{}/implementations/{}/implementation-packages/{}",
            algorithm_id, implementation_id, package.id
        ),
        package,
    ))
}

pub async fn get_package(
    State(state): State<AppState>,
    AppPath((algorithm_id, implementation_id, package_id)): AppPath<(Uuid, Uuid, Uuid)>,
) -> ApiResult<Json<ImplementationPackage>> {
    implementations::check_implementation_of_algorithm(&state.db, algorithm_id, implementation_id)
        .await?;
    Ok(Json(
        packages::find_package(&state.db, implementation_id, package_id).await?,
    ))
}

pub async fn update_package(
    State(state): State<AppState>,
    AppPath((algorithm_id, implementation_id, package_id)): AppPath<(Uuid, Uuid, Uuid)>,
    AppJson(input): AppJson<ImplementationPackageInput>,
) -> ApiResult<Json<ImplementationPackage>> {
    implementations::check_implementation_of_algorithm(&state.db, algorithm_id, implementation_id)
        .await?;
    Ok(Json(
        packages::update_package(&state.db, implementation_id, package_id, &input).await?,
    ))
}

pub async fn delete_package(
    State(state): State<AppState>,
    AppPath((algorithm_id, implementation_id, package_id)): AppPath<(Uuid, Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    implementations::check_implementation_of_algorithm(&state.db, algorithm_id, implementation_id)
        .await?;
    packages::delete_package(&state.db, implementation_id, package_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_tosca_applications(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PageRequest>,
) -> ApiResult<Json<Page<ToscaApplication>>> {
    let request = state.page_request(query);
    Ok(Json(
        packages::find_all_tosca_applications(&state.db, &request).await?,
    ))
}

pub async fn create_tosca_application(
    State(state): State<AppState>,
    AppJson(input): AppJson<ToscaApplicationInput>,
) -> ApiResult<Response> {
    let application = packages::create_tosca_application(&state.db, &input).await?;
    Ok(created(
        format!("/v1/tosca-applications/{}", application.id),
        application,
    ))
}

pub async fn get_tosca_application(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Json<ToscaApplication>> {
    Ok(Json(packages::find_tosca_application(&state.db, id).await?))
}

pub async fn update_tosca_application(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(input): AppJson<ToscaApplicationInput>,
) -> ApiResult<Json<ToscaApplication>> {
    Ok(Json(
        packages::update_tosca_application(&state.db, id, &input).await?,
    ))
}

/// DELETE /v1/tosca-applications/:id
///
/// 409 while a TOSCA package references the application.
pub async fn delete_tosca_application(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<StatusCode> {
    packages::delete_tosca_application(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Build package routes
pub fn package_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/algorithms/:id/implementations/:implementation_id/implementation-packages",
            get(list_packages).post(create_package),
        )
        .route(
            "/v1/algorithms/:id/implementations/:implementation_id/implementation-packages/:package_id",
            get(get_package).put(update_package).delete(delete_package),
        )
        .route(
            "/v1/tosca-applications",
            get(list_tosca_applications).post(create_tosca_application),
        )
        .route(
            "/v1/tosca-applications/:id",
            get(get_tosca_application)
                .put(update_tosca_application)
                .delete(delete_tosca_application),
        )
}
