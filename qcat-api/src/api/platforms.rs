//! Software platform, cloud service and compute resource endpoints
//!
//! The three entities form a mesh; every link can be managed from either
//! side and each side lists its counterparts from the same join table.

use axum::{extract::State, http::StatusCode, response::Response, routing::get, Json, Router};
use qcat_common::db::associations::{Association, Direction};
use qcat_common::db::platforms;
use qcat_common::models::{
    CloudService, CloudServiceInput, ComputeResource, ComputeResourceInput, Implementation,
    SoftwarePlatform, SoftwarePlatformInput,
};
use qcat_common::{Page, PageRequest};
use uuid::Uuid;

use super::{created, links::link_routes};
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::{ApiResult, AppState};

// Software platforms

pub async fn list_platforms(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PageRequest>,
) -> ApiResult<Json<Page<SoftwarePlatform>>> {
    let request = state.page_request(query);
    Ok(Json(platforms::find_all_platforms(&state.db, &request).await?))
}

pub async fn create_platform(
    State(state): State<AppState>,
    AppJson(input): AppJson<SoftwarePlatformInput>,
) -> ApiResult<Response> {
    let platform = platforms::create_platform(&state.db, &input).await?;
    Ok(created(
        format!("/v1/software-platforms/{}", platform.id),
        platform,
    ))
}

pub async fn get_platform(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Json<SoftwarePlatform>> {
    Ok(Json(platforms::find_platform(&state.db, id).await?))
}

pub async fn update_platform(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(input): AppJson<SoftwarePlatformInput>,
) -> ApiResult<Json<SoftwarePlatform>> {
    Ok(Json(platforms::update_platform(&state.db, id, &input).await?))
}

pub async fn delete_platform(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<StatusCode> {
    platforms::delete_platform(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/software-platforms/:id/implementations
pub async fn list_platform_implementations(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppQuery(query): AppQuery<PageRequest>,
) -> ApiResult<Json<Page<Implementation>>> {
    let request = state.page_request(query);
    Ok(Json(
        platforms::find_platform_implementations(&state.db, id, &request).await?,
    ))
}

// Cloud services

pub async fn list_cloud_services(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PageRequest>,
) -> ApiResult<Json<Page<CloudService>>> {
    let request = state.page_request(query);
    Ok(Json(
        platforms::find_all_cloud_services(&state.db, &request).await?,
    ))
}

pub async fn create_cloud_service(
    State(state): State<AppState>,
    AppJson(input): AppJson<CloudServiceInput>,
) -> ApiResult<Response> {
    let service = platforms::create_cloud_service(&state.db, &input).await?;
    Ok(created(format!("/v1/cloud-services/{}", service.id), service))
}

pub async fn get_cloud_service(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Json<CloudService>> {
    Ok(Json(platforms::find_cloud_service(&state.db, id).await?))
}

pub async fn update_cloud_service(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(input): AppJson<CloudServiceInput>,
) -> ApiResult<Json<CloudService>> {
    Ok(Json(
        platforms::update_cloud_service(&state.db, id, &input).await?,
    ))
}

pub async fn delete_cloud_service(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<StatusCode> {
    platforms::delete_cloud_service(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Compute resources

pub async fn list_compute_resources(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PageRequest>,
) -> ApiResult<Json<Page<ComputeResource>>> {
    let request = state.page_request(query);
    Ok(Json(
        platforms::find_all_compute_resources(&state.db, &request).await?,
    ))
}

pub async fn create_compute_resource(
    State(state): State<AppState>,
    AppJson(input): AppJson<ComputeResourceInput>,
) -> ApiResult<Response> {
    let resource = platforms::create_compute_resource(&state.db, &input).await?;
    Ok(created(
        format!("/v1/compute-resources/{}", resource.id),
        resource,
    ))
}

pub async fn get_compute_resource(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Json<ComputeResource>> {
    Ok(Json(platforms::find_compute_resource(&state.db, id).await?))
}

pub async fn update_compute_resource(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(input): AppJson<ComputeResourceInput>,
) -> ApiResult<Json<ComputeResource>> {
    Ok(Json(
        platforms::update_compute_resource(&state.db, id, &input).await?,
    ))
}

pub async fn delete_compute_resource(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<StatusCode> {
    platforms::delete_compute_resource(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Build platform mesh routes
pub fn platform_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/software-platforms",
            get(list_platforms).post(create_platform),
        )
        .route(
            "/v1/software-platforms/:id",
            get(get_platform)
                .put(update_platform)
                .delete(delete_platform),
        )
        .route(
            "/v1/software-platforms/:id/implementations",
            get(list_platform_implementations),
        )
        .route(
            "/v1/cloud-services",
            get(list_cloud_services).post(create_cloud_service),
        )
        .route(
            "/v1/cloud-services/:id",
            get(get_cloud_service)
                .put(update_cloud_service)
                .delete(delete_cloud_service),
        )
        .route(
            "/v1/compute-resources",
            get(list_compute_resources).post(create_compute_resource),
        )
        .route(
            "/v1/compute-resources/:id",
            get(get_compute_resource)
                .put(update_compute_resource)
                .delete(delete_compute_resource),
        )
        .merge(link_routes(
            "/v1/software-platforms/:id/cloud-services",
            Association::SoftwarePlatformCloudService,
            Direction::Forward,
            platforms::map_cloud_service,
        ))
        .merge(link_routes(
            "/v1/software-platforms/:id/compute-resources",
            Association::SoftwarePlatformComputeResource,
            Direction::Forward,
            platforms::map_compute_resource,
        ))
        .merge(link_routes(
            "/v1/cloud-services/:id/software-platforms",
            Association::SoftwarePlatformCloudService,
            Direction::Reverse,
            platforms::map_software_platform,
        ))
        .merge(link_routes(
            "/v1/cloud-services/:id/compute-resources",
            Association::CloudServiceComputeResource,
            Direction::Forward,
            platforms::map_compute_resource,
        ))
        .merge(link_routes(
            "/v1/compute-resources/:id/software-platforms",
            Association::SoftwarePlatformComputeResource,
            Direction::Reverse,
            platforms::map_software_platform,
        ))
        .merge(link_routes(
            "/v1/compute-resources/:id/cloud-services",
            Association::CloudServiceComputeResource,
            Direction::Reverse,
            platforms::map_cloud_service,
        ))
}
