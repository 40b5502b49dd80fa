//! Software platforms, cloud services and compute resources
//!
//! The three form a mesh: platform <-> cloud service, platform <-> compute
//! resource and cloud service <-> compute resource, each one join table.
//! Implementations link to platforms. Links are managed through
//! [`associations`](super::associations); this module owns the entities.

use super::associations::{self, Association, Direction};
use super::implementations::map_implementation;
use super::list_named;
use crate::models::{
    CloudService, CloudServiceInput, ComputeResource, ComputeResourceInput, Implementation,
    SoftwarePlatform, SoftwarePlatformInput,
};
use crate::pagination::{Page, PageRequest};
use crate::uuid_utils;
use crate::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;
use uuid::Uuid;

pub fn map_software_platform(row: &SqliteRow) -> Result<SoftwarePlatform> {
    let id: String = row.try_get("id")?;
    Ok(SoftwarePlatform {
        id: uuid_utils::parse_column("software_platforms.id", &id)?,
        name: row.try_get("name")?,
        link: row.try_get("link")?,
        license: row.try_get("license")?,
        version: row.try_get("version")?,
    })
}

pub fn map_cloud_service(row: &SqliteRow) -> Result<CloudService> {
    let id: String = row.try_get("id")?;
    Ok(CloudService {
        id: uuid_utils::parse_column("cloud_services.id", &id)?,
        name: row.try_get("name")?,
        provider: row.try_get("provider")?,
        url: row.try_get("url")?,
        description: row.try_get("description")?,
        cost_model: row.try_get("cost_model")?,
    })
}

pub fn map_compute_resource(row: &SqliteRow) -> Result<ComputeResource> {
    let id: String = row.try_get("id")?;
    let kind: String = row.try_get("kind")?;
    let model: Option<String> = row.try_get("quantum_computation_model")?;
    Ok(ComputeResource {
        id: uuid_utils::parse_column("compute_resources.id", &id)?,
        name: row.try_get("name")?,
        vendor: row.try_get("vendor")?,
        technology: row.try_get("technology")?,
        quantum_computation_model: model
            .as_deref()
            .map(|m| crate::models::parse_stored("quantum_computation_model", m))
            .transpose()?,
        kind: crate::models::parse_stored("compute_resources.kind", &kind)?,
    })
}

async fn delete_row(pool: &SqlitePool, table: &str, entity: &str, id: Uuid) -> Result<()> {
    let sql = format!("DELETE FROM {} WHERE id = ?", table);
    let result = sqlx::query(&sql)
        .bind(id.to_string())
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found(entity, id));
    }
    info!("Deleted {} {}", entity.to_lowercase(), id);
    Ok(())
}

// Software platforms

pub async fn find_all_platforms(
    pool: &SqlitePool,
    request: &PageRequest,
) -> Result<Page<SoftwarePlatform>> {
    list_named(pool, "software_platforms", request, map_software_platform).await
}

pub async fn find_platform(pool: &SqlitePool, id: Uuid) -> Result<SoftwarePlatform> {
    let row = sqlx::query("SELECT * FROM software_platforms WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::not_found("Software platform", id))?;
    map_software_platform(&row)
}

pub async fn create_platform(
    pool: &SqlitePool,
    input: &SoftwarePlatformInput,
) -> Result<SoftwarePlatform> {
    input.validate()?;
    let input = input.normalized();
    let id = uuid_utils::generate();

    sqlx::query(
        "INSERT INTO software_platforms (id, name, link, license, version) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(&input.name)
    .bind(&input.link)
    .bind(&input.license)
    .bind(&input.version)
    .execute(pool)
    .await?;

    info!("Created software platform {} ({})", input.name, id);
    find_platform(pool, id).await
}

pub async fn update_platform(
    pool: &SqlitePool,
    id: Uuid,
    input: &SoftwarePlatformInput,
) -> Result<SoftwarePlatform> {
    input.validate()?;
    let input = input.normalized();

    let result = sqlx::query(
        "UPDATE software_platforms SET name = ?, link = ?, license = ?, version = ? WHERE id = ?",
    )
    .bind(&input.name)
    .bind(&input.link)
    .bind(&input.license)
    .bind(&input.version)
    .bind(id.to_string())
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found("Software platform", id));
    }
    find_platform(pool, id).await
}

pub async fn delete_platform(pool: &SqlitePool, id: Uuid) -> Result<()> {
    delete_row(pool, "software_platforms", "Software platform", id).await
}

/// Implementations running on a platform
pub async fn find_platform_implementations(
    pool: &SqlitePool,
    id: Uuid,
    request: &PageRequest,
) -> Result<Page<Implementation>> {
    associations::fetch_linked(
        pool,
        Association::ImplementationSoftwarePlatform,
        Direction::Reverse,
        &id.to_string(),
        request,
        map_implementation,
    )
    .await
}

// Cloud services

pub async fn find_all_cloud_services(
    pool: &SqlitePool,
    request: &PageRequest,
) -> Result<Page<CloudService>> {
    list_named(pool, "cloud_services", request, map_cloud_service).await
}

pub async fn find_cloud_service(pool: &SqlitePool, id: Uuid) -> Result<CloudService> {
    let row = sqlx::query("SELECT * FROM cloud_services WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::not_found("Cloud service", id))?;
    map_cloud_service(&row)
}

pub async fn create_cloud_service(
    pool: &SqlitePool,
    input: &CloudServiceInput,
) -> Result<CloudService> {
    input.validate()?;
    let input = input.normalized();
    let id = uuid_utils::generate();

    sqlx::query(
        r#"
        INSERT INTO cloud_services (id, name, provider, url, description, cost_model)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(&input.name)
    .bind(&input.provider)
    .bind(&input.url)
    .bind(&input.description)
    .bind(&input.cost_model)
    .execute(pool)
    .await?;

    info!("Created cloud service {} ({})", input.name, id);
    find_cloud_service(pool, id).await
}

pub async fn update_cloud_service(
    pool: &SqlitePool,
    id: Uuid,
    input: &CloudServiceInput,
) -> Result<CloudService> {
    input.validate()?;
    let input = input.normalized();

    let result = sqlx::query(
        r#"
        UPDATE cloud_services SET name = ?, provider = ?, url = ?, description = ?, cost_model = ?
        WHERE id = ?
        "#,
    )
    .bind(&input.name)
    .bind(&input.provider)
    .bind(&input.url)
    .bind(&input.description)
    .bind(&input.cost_model)
    .bind(id.to_string())
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found("Cloud service", id));
    }
    find_cloud_service(pool, id).await
}

pub async fn delete_cloud_service(pool: &SqlitePool, id: Uuid) -> Result<()> {
    delete_row(pool, "cloud_services", "Cloud service", id).await
}

// Compute resources

pub async fn find_all_compute_resources(
    pool: &SqlitePool,
    request: &PageRequest,
) -> Result<Page<ComputeResource>> {
    list_named(pool, "compute_resources", request, map_compute_resource).await
}

pub async fn find_compute_resource(pool: &SqlitePool, id: Uuid) -> Result<ComputeResource> {
    let row = sqlx::query("SELECT * FROM compute_resources WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::not_found("Compute resource", id))?;
    map_compute_resource(&row)
}

pub async fn create_compute_resource(
    pool: &SqlitePool,
    input: &ComputeResourceInput,
) -> Result<ComputeResource> {
    input.validate()?;
    let input = input.normalized();
    let id = uuid_utils::generate();

    sqlx::query(
        r#"
        INSERT INTO compute_resources (id, name, vendor, technology, quantum_computation_model, kind)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(&input.name)
    .bind(&input.vendor)
    .bind(&input.technology)
    .bind(input.quantum_computation_model.map(|m| m.as_str()))
    .bind(input.kind.as_str())
    .execute(pool)
    .await?;

    info!("Created {} compute resource {} ({})", input.kind, input.name, id);
    find_compute_resource(pool, id).await
}

pub async fn update_compute_resource(
    pool: &SqlitePool,
    id: Uuid,
    input: &ComputeResourceInput,
) -> Result<ComputeResource> {
    input.validate()?;
    let input = input.normalized();

    let result = sqlx::query(
        r#"
        UPDATE compute_resources SET
            name = ?, vendor = ?, technology = ?, quantum_computation_model = ?, kind = ?
        WHERE id = ?
        "#,
    )
    .bind(&input.name)
    .bind(&input.vendor)
    .bind(&input.technology)
    .bind(input.quantum_computation_model.map(|m| m.as_str()))
    .bind(input.kind.as_str())
    .bind(id.to_string())
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found("Compute resource", id));
    }
    find_compute_resource(pool, id).await
}

/// Delete a compute resource with its properties and links
pub async fn delete_compute_resource(pool: &SqlitePool, id: Uuid) -> Result<()> {
    delete_row(pool, "compute_resources", "Compute resource", id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_database;
    use crate::models::{ComputeResourceKind, QuantumComputationModel};

    #[tokio::test]
    async fn test_compute_resource_roundtrip() {
        let pool = init_memory_database().await.unwrap();
        let mut input = ComputeResourceInput::new("ibmq_lima", ComputeResourceKind::Qpu);
        input.quantum_computation_model = Some(QuantumComputationModel::GateBased);
        input.vendor = Some("IBM".to_string());

        let created = create_compute_resource(&pool, &input).await.unwrap();
        assert_eq!(created.kind, ComputeResourceKind::Qpu);
        assert_eq!(
            created.quantum_computation_model,
            Some(QuantumComputationModel::GateBased)
        );

        let mut input = ComputeResourceInput::new("qasm_simulator", ComputeResourceKind::Simulator);
        input.vendor = Some("IBM".to_string());
        let updated = update_compute_resource(&pool, created.id, &input).await.unwrap();
        assert_eq!(updated.kind, ComputeResourceKind::Simulator);
        assert_eq!(updated.quantum_computation_model, None);
    }

    #[tokio::test]
    async fn test_mesh_links_visible_from_both_sides() {
        let pool = init_memory_database().await.unwrap();
        let platform = create_platform(&pool, &SoftwarePlatformInput::new("Qiskit"))
            .await
            .unwrap();
        let service = create_cloud_service(&pool, &CloudServiceInput::new("IBM Quantum"))
            .await
            .unwrap();
        let resource = create_compute_resource(
            &pool,
            &ComputeResourceInput::new("ibmq_lima", ComputeResourceKind::Qpu),
        )
        .await
        .unwrap();

        associations::link(
            &pool,
            Association::SoftwarePlatformCloudService,
            &platform.id.to_string(),
            &service.id.to_string(),
        )
        .await
        .unwrap();
        associations::link(
            &pool,
            Association::CloudServiceComputeResource,
            &service.id.to_string(),
            &resource.id.to_string(),
        )
        .await
        .unwrap();

        let platforms = associations::fetch_linked(
            &pool,
            Association::SoftwarePlatformCloudService,
            Direction::Reverse,
            &service.id.to_string(),
            &PageRequest::default(),
            map_software_platform,
        )
        .await
        .unwrap();
        assert_eq!(platforms.content, vec![platform.clone()]);

        let services = associations::fetch_linked(
            &pool,
            Association::CloudServiceComputeResource,
            Direction::Reverse,
            &resource.id.to_string(),
            &PageRequest::default(),
            map_cloud_service,
        )
        .await
        .unwrap();
        assert_eq!(services.content, vec![service.clone()]);

        delete_cloud_service(&pool, service.id).await.unwrap();
        let services = associations::fetch_linked(
            &pool,
            Association::SoftwarePlatformCloudService,
            Direction::Forward,
            &platform.id.to_string(),
            &PageRequest::default(),
            map_cloud_service,
        )
        .await
        .unwrap();
        assert!(services.content.is_empty());
    }
}
