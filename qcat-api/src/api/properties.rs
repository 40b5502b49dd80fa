//! Compute resource property endpoints
//!
//! Properties hang off exactly one owner: an algorithm, an implementation or
//! a compute resource. Values are checked against the type's datatype.

use axum::{extract::State, http::StatusCode, response::Response, routing::get, Json, Router};
use qcat_common::db::{implementations, properties};
use qcat_common::models::{
    ComputeResourceProperty, ComputeResourcePropertyInput, ComputeResourcePropertyType,
    ComputeResourcePropertyTypeInput, PropertyOwner,
};
use qcat_common::{Page, PageRequest};
use uuid::Uuid;

use super::created;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::{ApiResult, AppState};

// Shared by every owner kind

async fn list_for(
    state: &AppState,
    owner: PropertyOwner,
    query: PageRequest,
) -> ApiResult<Json<Page<ComputeResourceProperty>>> {
    let request = state.page_request(query);
    Ok(Json(properties::find_by_owner(&state.db, owner, &request).await?))
}

async fn add_for(
    state: &AppState,
    owner: PropertyOwner,
    location: String,
    input: ComputeResourcePropertyInput,
) -> ApiResult<Response> {
    let property = properties::add_property(&state.db, owner, &input).await?;
    Ok(created(format!("{}/{}", location, property.id), property))
}

fn algorithm_location(algorithm_id: Uuid) -> String {
    format!("/v1/algorithms/{}/compute-resource-properties", algorithm_id)
}

fn implementation_location(algorithm_id: Uuid, implementation_id: Uuid) -> String {
    format!(
        "/v1/algorithms/{}/implementations/{}/compute-resource-properties",
        algorithm_id, implementation_id
    )
}

fn compute_resource_location(resource_id: Uuid) -> String {
    format!("/v1/compute-resources/{}/compute-resource-properties", resource_id)
}

// Algorithm-owned

pub async fn list_algorithm_properties(
    State(state): State<AppState>,
    AppPath(algorithm_id): AppPath<Uuid>,
    AppQuery(query): AppQuery<PageRequest>,
) -> ApiResult<Json<Page<ComputeResourceProperty>>> {
    list_for(&state, PropertyOwner::Algorithm(algorithm_id), query).await
}

pub async fn add_algorithm_property(
    State(state): State<AppState>,
    AppPath(algorithm_id): AppPath<Uuid>,
    AppJson(input): AppJson<ComputeResourcePropertyInput>,
) -> ApiResult<Response> {
    add_for(
        &state,
        PropertyOwner::Algorithm(algorithm_id),
        algorithm_location(algorithm_id),
        input,
    )
    .await
}

pub async fn get_algorithm_property(
    State(state): State<AppState>,
    AppPath((algorithm_id, property_id)): AppPath<(Uuid, Uuid)>,
) -> ApiResult<Json<ComputeResourceProperty>> {
    let owner = PropertyOwner::Algorithm(algorithm_id);
    Ok(Json(properties::find_property(&state.db, owner, property_id).await?))
}

pub async fn update_algorithm_property(
    State(state): State<AppState>,
    AppPath((algorithm_id, property_id)): AppPath<(Uuid, Uuid)>,
    AppJson(input): AppJson<ComputeResourcePropertyInput>,
) -> ApiResult<Json<ComputeResourceProperty>> {
    let owner = PropertyOwner::Algorithm(algorithm_id);
    Ok(Json(
        properties::update_property(&state.db, owner, property_id, &input).await?,
    ))
}

pub async fn remove_algorithm_property(
    State(state): State<AppState>,
    AppPath((algorithm_id, property_id)): AppPath<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    let owner = PropertyOwner::Algorithm(algorithm_id);
    properties::remove_property(&state.db, owner, property_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Implementation-owned

pub async fn list_implementation_properties(
    State(state): State<AppState>,
    AppPath((algorithm_id, implementation_id)): AppPath<(Uuid, Uuid)>,
    AppQuery(query): AppQuery<PageRequest>,
) -> ApiResult<Json<Page<ComputeResourceProperty>>> {
    implementations::check_implementation_of_algorithm(&state.db, algorithm_id, implementation_id)
        .await?;
    list_for(&state, PropertyOwner::Implementation(implementation_id), query).await
}

pub async fn add_implementation_property(
    State(state): State<AppState>,
    AppPath((algorithm_id, implementation_id)): AppPath<(Uuid, Uuid)>,
    AppJson(input): AppJson<ComputeResourcePropertyInput>,
) -> ApiResult<Response> {
    implementations::check_implementation_of_algorithm(&state.db, algorithm_id, implementation_id)
        .await?;
    add_for(
        &state,
        PropertyOwner::Implementation(implementation_id),
        implementation_location(algorithm_id, implementation_id),
        input,
    )
    .await
}

pub async fn get_implementation_property(
    State(state): State<AppState>,
    AppPath((algorithm_id, implementation_id, property_id)): AppPath<(Uuid, Uuid, Uuid)>,
) -> ApiResult<Json<ComputeResourceProperty>> {
    implementations::check_implementation_of_algorithm(&state.db, algorithm_id, implementation_id)
        .await?;
    let owner = PropertyOwner::Implementation(implementation_id);
    Ok(Json(properties::find_property(&state.db, owner, property_id).await?))
}

pub async fn update_implementation_property(
    State(state): State<AppState>,
    AppPath((algorithm_id, implementation_id, property_id)): AppPath<(Uuid, Uuid, Uuid)>,
    AppJson(input): AppJson<ComputeResourcePropertyInput>,
) -> ApiResult<Json<ComputeResourceProperty>> {
    implementations::check_implementation_of_algorithm(&state.db, algorithm_id, implementation_id)
        .await?;
    let owner = PropertyOwner::Implementation(implementation_id);
    Ok(Json(
        properties::update_property(&state.db, owner, property_id, &input).await?,
    ))
}

pub async fn remove_implementation_property(
    State(state): State<AppState>,
    AppPath((algorithm_id, implementation_id, property_id)): AppPath<(Uuid, Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    implementations::check_implementation_of_algorithm(&state.db, algorithm_id, implementation_id)
        .await?;
    let owner = PropertyOwner::Implementation(implementation_id);
    properties::remove_property(&state.db, owner, property_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Compute-resource-owned

pub async fn list_resource_properties(
    State(state): State<AppState>,
    AppPath(resource_id): AppPath<Uuid>,
    AppQuery(query): AppQuery<PageRequest>,
) -> ApiResult<Json<Page<ComputeResourceProperty>>> {
    list_for(&state, PropertyOwner::ComputeResource(resource_id), query).await
}

pub async fn add_resource_property(
    State(state): State<AppState>,
    AppPath(resource_id): AppPath<Uuid>,
    AppJson(input): AppJson<ComputeResourcePropertyInput>,
) -> ApiResult<Response> {
    add_for(
        &state,
        PropertyOwner::ComputeResource(resource_id),
        compute_resource_location(resource_id),
        input,
    )
    .await
}

pub async fn get_resource_property(
    State(state): State<AppState>,
    AppPath((resource_id, property_id)): AppPath<(Uuid, Uuid)>,
) -> ApiResult<Json<ComputeResourceProperty>> {
    let owner = PropertyOwner::ComputeResource(resource_id);
    Ok(Json(properties::find_property(&state.db, owner, property_id).await?))
}

pub async fn update_resource_property(
    State(state): State<AppState>,
    AppPath((resource_id, property_id)): AppPath<(Uuid, Uuid)>,
    AppJson(input): AppJson<ComputeResourcePropertyInput>,
) -> ApiResult<Json<ComputeResourceProperty>> {
    let owner = PropertyOwner::ComputeResource(resource_id);
    Ok(Json(
        properties::update_property(&state.db, owner, property_id, &input).await?,
    ))
}

pub async fn remove_resource_property(
    State(state): State<AppState>,
    AppPath((resource_id, property_id)): AppPath<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    let owner = PropertyOwner::ComputeResource(resource_id);
    properties::remove_property(&state.db, owner, property_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Property types

pub async fn list_types(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PageRequest>,
) -> ApiResult<Json<Page<ComputeResourcePropertyType>>> {
    let request = state.page_request(query);
    Ok(Json(properties::find_all_types(&state.db, &request).await?))
}

pub async fn create_type(
    State(state): State<AppState>,
    AppJson(input): AppJson<ComputeResourcePropertyTypeInput>,
) -> ApiResult<Response> {
    let property_type = properties::create_type(&state.db, &input).await?;
    Ok(created(
        format!("/v1/compute-resource-property-types/{}", property_type.id),
        property_type,
    ))
}

pub async fn get_type(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Json<ComputeResourcePropertyType>> {
    Ok(Json(properties::find_type(&state.db, id).await?))
}

/// PUT /v1/compute-resource-property-types/:id
///
/// 409 when a new datatype would invalidate stored values.
pub async fn update_type(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(input): AppJson<ComputeResourcePropertyTypeInput>,
) -> ApiResult<Json<ComputeResourcePropertyType>> {
    Ok(Json(properties::update_type(&state.db, id, &input).await?))
}

/// DELETE /v1/compute-resource-property-types/:id
///
/// 409 while any property uses the type.
pub async fn delete_type(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<StatusCode> {
    properties::delete_type(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Build property and property type routes
pub fn property_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/algorithms/:id/compute-resource-properties",
            get(list_algorithm_properties).post(add_algorithm_property),
        )
        .route(
            "/v1/algorithms/:id/compute-resource-properties/:property_id",
            get(get_algorithm_property)
                .put(update_algorithm_property)
                .delete(remove_algorithm_property),
        )
        .route(
            "/v1/algorithms/:id/implementations/:implementation_id/compute-resource-properties",
            get(list_implementation_properties).post(add_implementation_property),
        )
        .route(
            "/v1/algorithms/:id/implementations/:implementation_id/compute-resource-properties/:property_id",
            get(get_implementation_property)
                .put(update_implementation_property)
                .delete(remove_implementation_property),
        )
        .route(
            "/v1/compute-resources/:id/compute-resource-properties",
            get(list_resource_properties).post(add_resource_property),
        )
        .route(
            "/v1/compute-resources/:id/compute-resource-properties/:property_id",
            get(get_resource_property)
                .put(update_resource_property)
                .delete(remove_resource_property),
        )
        .route(
            "/v1/compute-resource-property-types",
            get(list_types).post(create_type),
        )
        .route(
            "/v1/compute-resource-property-types/:id",
            get(get_type).put(update_type).delete(delete_type),
        )
}
