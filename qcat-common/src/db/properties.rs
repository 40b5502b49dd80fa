//! Compute-resource property types and typed property values

use super::retry::{retry_on_lock, LOCK_WAIT};
use super::{count_references, ensure_exists, list_named, map_constraint_error};
use crate::models::{
    ComputeResourceProperty, ComputeResourcePropertyInput, ComputeResourcePropertyType,
    ComputeResourcePropertyTypeInput, Datatype, PropertyOwner,
};
use crate::pagination::{Page, PageRequest};
use crate::uuid_utils;
use crate::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::{info, warn};
use uuid::Uuid;

pub(crate) fn map_property_type(row: &SqliteRow) -> Result<ComputeResourcePropertyType> {
    let id: String = row.try_get("id")?;
    let datatype: String = row.try_get("datatype")?;
    Ok(ComputeResourcePropertyType {
        id: uuid_utils::parse_column("compute_resource_property_types.id", &id)?,
        name: row.try_get("name")?,
        datatype: crate::models::parse_stored("datatype", &datatype)?,
        description: row.try_get("description")?,
    })
}

pub(crate) fn map_property(row: &SqliteRow) -> Result<ComputeResourceProperty> {
    let id: String = row.try_get("id")?;
    let type_id: String = row.try_get("type_id")?;
    Ok(ComputeResourceProperty {
        id: uuid_utils::parse_column("compute_resource_properties.id", &id)?,
        value: row.try_get("value")?,
        type_id: uuid_utils::parse_column("compute_resource_properties.type_id", &type_id)?,
        owner: PropertyOwner::from_columns(
            uuid_utils::parse_optional_column("algorithm_id", row.try_get("algorithm_id")?)?,
            uuid_utils::parse_optional_column(
                "implementation_id",
                row.try_get("implementation_id")?,
            )?,
            uuid_utils::parse_optional_column(
                "compute_resource_id",
                row.try_get("compute_resource_id")?,
            )?,
        )?,
    })
}

/// Entity table and display name of an owner
fn owner_table(owner: &PropertyOwner) -> (&'static str, &'static str) {
    match owner {
        PropertyOwner::Algorithm(_) => ("algorithms", "Algorithm"),
        PropertyOwner::Implementation(_) => ("implementations", "Implementation"),
        PropertyOwner::ComputeResource(_) => ("compute_resources", "Compute resource"),
    }
}

async fn ensure_owner(conn: &mut SqliteConnection, owner: &PropertyOwner) -> Result<()> {
    let (table, entity) = owner_table(owner);
    ensure_exists(conn, table, "id", &owner.id().to_string(), entity).await
}

// Property types

pub async fn find_all_types(
    pool: &SqlitePool,
    request: &PageRequest,
) -> Result<Page<ComputeResourcePropertyType>> {
    list_named(pool, "compute_resource_property_types", request, map_property_type).await
}

pub async fn find_type(pool: &SqlitePool, id: Uuid) -> Result<ComputeResourcePropertyType> {
    let mut conn = pool.acquire().await?;
    find_type_in(&mut conn, id).await
}

async fn find_type_in(
    conn: &mut SqliteConnection,
    id: Uuid,
) -> Result<ComputeResourcePropertyType> {
    let row = sqlx::query("SELECT * FROM compute_resource_property_types WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::not_found("Compute resource property type", id))?;
    map_property_type(&row)
}

pub async fn create_type(
    pool: &SqlitePool,
    input: &ComputeResourcePropertyTypeInput,
) -> Result<ComputeResourcePropertyType> {
    input.validate()?;
    let id = uuid_utils::generate();

    sqlx::query(
        "INSERT INTO compute_resource_property_types (id, name, datatype, description) VALUES (?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(input.name.trim())
    .bind(input.datatype.as_str())
    .bind(input.description())
    .execute(pool)
    .await?;

    info!(
        "Created property type {} ({}, {})",
        input.name.trim(),
        input.datatype,
        id
    );
    find_type(pool, id).await
}

/// Update a property type
///
/// Changing the datatype is refused when stored values would no longer parse.
pub async fn update_type(
    pool: &SqlitePool,
    id: Uuid,
    input: &ComputeResourcePropertyTypeInput,
) -> Result<ComputeResourcePropertyType> {
    retry_on_lock("properties::update_type", LOCK_WAIT, || update_type_once(pool, id, input)).await
}

async fn update_type_once(
    pool: &SqlitePool,
    id: Uuid,
    input: &ComputeResourcePropertyTypeInput,
) -> Result<ComputeResourcePropertyType> {
    input.validate()?;
    let mut tx = pool.begin().await?;
    let current = find_type_in(&mut tx, id).await?;

    if current.datatype != input.datatype {
        let values: Vec<String> =
            sqlx::query_scalar("SELECT value FROM compute_resource_properties WHERE type_id = ?")
                .bind(id.to_string())
                .fetch_all(&mut *tx)
                .await?;
        for value in &values {
            input.datatype.validate_value(value).map_err(|_| {
                Error::Conflict(format!(
                    "Existing value \"{}\" of property type {} is not a valid {}",
                    value, id, input.datatype
                ))
            })?;
        }
    }

    sqlx::query(
        "UPDATE compute_resource_property_types SET name = ?, datatype = ?, description = ? WHERE id = ?",
    )
    .bind(input.name.trim())
    .bind(input.datatype.as_str())
    .bind(input.description())
    .bind(id.to_string())
    .execute(&mut *tx)
    .await?;

    let updated = find_type_in(&mut tx, id).await?;
    tx.commit().await?;
    Ok(updated)
}

/// Delete a property type; refused while properties use it
pub async fn delete_type(pool: &SqlitePool, id: Uuid) -> Result<()> {
    retry_on_lock("properties::delete_type", LOCK_WAIT, || delete_type_once(pool, id)).await
}

async fn delete_type_once(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let key = id.to_string();
    let mut tx = pool.begin().await?;
    ensure_exists(
        &mut tx,
        "compute_resource_property_types",
        "id",
        &key,
        "Compute resource property type",
    )
    .await?;

    let usages = count_references(&mut tx, "compute_resource_properties", "type_id", &key).await?;
    if usages > 0 {
        warn!("Refusing to delete property type {}: used by {} propert(ies)", id, usages);
        return Err(Error::Conflict(format!(
            "Compute resource property type {} is used by {} property value(s)",
            id, usages
        )));
    }

    sqlx::query("DELETE FROM compute_resource_property_types WHERE id = ?")
        .bind(&key)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!("Deleted property type {}", id);
    Ok(())
}

// Properties

/// Page of properties owned by `owner`; NotFound if the owner is absent
pub async fn find_by_owner(
    pool: &SqlitePool,
    owner: PropertyOwner,
    request: &PageRequest,
) -> Result<Page<ComputeResourceProperty>> {
    let mut conn = pool.acquire().await?;
    ensure_owner(&mut conn, &owner).await?;

    let count_sql = format!(
        "SELECT COUNT(*) FROM compute_resource_properties WHERE {} = ?",
        owner.column()
    );
    let total: i64 = sqlx::query_scalar(&count_sql)
        .bind(owner.id().to_string())
        .fetch_one(&mut *conn)
        .await?;

    let pagination = request.pagination(total);
    let rows_sql = format!(
        "SELECT * FROM compute_resource_properties WHERE {} = ? ORDER BY rowid LIMIT ? OFFSET ?",
        owner.column()
    );
    let rows = sqlx::query(&rows_sql)
        .bind(owner.id().to_string())
        .bind(pagination.size)
        .bind(pagination.offset)
        .fetch_all(&mut *conn)
        .await?;

    let content = rows.iter().map(map_property).collect::<Result<Vec<_>>>()?;
    Ok(Page::new(content, pagination, total))
}

async fn find_property_in(
    conn: &mut SqliteConnection,
    owner: &PropertyOwner,
    id: Uuid,
) -> Result<ComputeResourceProperty> {
    let sql = format!(
        "SELECT * FROM compute_resource_properties WHERE id = ? AND {} = ?",
        owner.column()
    );
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .bind(owner.id().to_string())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::not_found("Compute resource property", id))?;
    map_property(&row)
}

pub async fn find_property(
    pool: &SqlitePool,
    owner: PropertyOwner,
    id: Uuid,
) -> Result<ComputeResourceProperty> {
    let mut conn = pool.acquire().await?;
    ensure_owner(&mut conn, &owner).await?;
    find_property_in(&mut conn, &owner, id).await
}

/// Resolve the type, then check the value against its datatype
async fn validated_datatype(
    conn: &mut SqliteConnection,
    input: &ComputeResourcePropertyInput,
) -> Result<Datatype> {
    let property_type = find_type_in(conn, input.type_id).await?;
    property_type.datatype.validate_value(&input.value)?;
    Ok(property_type.datatype)
}

pub async fn add_property(
    pool: &SqlitePool,
    owner: PropertyOwner,
    input: &ComputeResourcePropertyInput,
) -> Result<ComputeResourceProperty> {
    retry_on_lock("properties::add_property", LOCK_WAIT, || {
        add_property_once(pool, owner, input)
    })
    .await
}

async fn add_property_once(
    pool: &SqlitePool,
    owner: PropertyOwner,
    input: &ComputeResourcePropertyInput,
) -> Result<ComputeResourceProperty> {
    let id = uuid_utils::generate();
    let mut tx = pool.begin().await?;
    ensure_owner(&mut tx, &owner).await?;
    let datatype = validated_datatype(&mut tx, input).await?;

    let sql = format!(
        "INSERT INTO compute_resource_properties (id, value, type_id, {}) VALUES (?, ?, ?, ?)",
        owner.column()
    );
    sqlx::query(&sql)
        .bind(id.to_string())
        .bind(input.value.trim())
        .bind(input.type_id.to_string())
        .bind(owner.id().to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_constraint_error(e, "Compute resource property"))?;

    let created = find_property_in(&mut tx, &owner, id).await?;
    tx.commit().await?;

    info!("Added {} property {} to {:?}", datatype, id, owner);
    Ok(created)
}

pub async fn update_property(
    pool: &SqlitePool,
    owner: PropertyOwner,
    id: Uuid,
    input: &ComputeResourcePropertyInput,
) -> Result<ComputeResourceProperty> {
    retry_on_lock("properties::update_property", LOCK_WAIT, || {
        update_property_once(pool, owner, id, input)
    })
    .await
}

async fn update_property_once(
    pool: &SqlitePool,
    owner: PropertyOwner,
    id: Uuid,
    input: &ComputeResourcePropertyInput,
) -> Result<ComputeResourceProperty> {
    let mut tx = pool.begin().await?;
    ensure_owner(&mut tx, &owner).await?;
    find_property_in(&mut tx, &owner, id).await?;
    validated_datatype(&mut tx, input).await?;

    sqlx::query("UPDATE compute_resource_properties SET value = ?, type_id = ? WHERE id = ?")
        .bind(input.value.trim())
        .bind(input.type_id.to_string())
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

    let updated = find_property_in(&mut tx, &owner, id).await?;
    tx.commit().await?;
    Ok(updated)
}

pub async fn remove_property(pool: &SqlitePool, owner: PropertyOwner, id: Uuid) -> Result<()> {
    retry_on_lock("properties::remove_property", LOCK_WAIT, || {
        remove_property_once(pool, owner, id)
    })
    .await
}

async fn remove_property_once(pool: &SqlitePool, owner: PropertyOwner, id: Uuid) -> Result<()> {
    let mut tx = pool.begin().await?;
    ensure_owner(&mut tx, &owner).await?;
    find_property_in(&mut tx, &owner, id).await?;

    sqlx::query("DELETE FROM compute_resource_properties WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!("Removed property {} from {:?}", id, owner);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{algorithms, init_memory_database};
    use crate::models::{AlgorithmInput, AlgorithmKind};

    async fn float_type(pool: &SqlitePool) -> ComputeResourcePropertyType {
        create_type(
            pool,
            &ComputeResourcePropertyTypeInput {
                name: "T1 time".to_string(),
                datatype: Datatype::Float,
                description: None,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_invalid_value_is_rejected_and_not_persisted() {
        let pool = init_memory_database().await.unwrap();
        let alg = algorithms::create(&pool, &AlgorithmInput::new("alg1", AlgorithmKind::Classic))
            .await
            .unwrap();
        let property_type = float_type(&pool).await;
        let owner = PropertyOwner::Algorithm(alg.id);

        let err = add_property(
            &pool,
            owner,
            &ComputeResourcePropertyInput {
                value: "Hallo Welt".to_string(),
                type_id: property_type.id,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let page = find_by_owner(&pool, owner, &PageRequest::default()).await.unwrap();
        assert_eq!(page.page.total_elements, 0);
    }

    #[tokio::test]
    async fn test_type_in_use_cannot_be_deleted() {
        let pool = init_memory_database().await.unwrap();
        let alg = algorithms::create(&pool, &AlgorithmInput::new("alg1", AlgorithmKind::Classic))
            .await
            .unwrap();
        let property_type = float_type(&pool).await;
        let owner = PropertyOwner::Algorithm(alg.id);

        let property = add_property(
            &pool,
            owner,
            &ComputeResourcePropertyInput {
                value: "81.5".to_string(),
                type_id: property_type.id,
            },
        )
        .await
        .unwrap();
        assert_eq!(property.owner, owner);

        let err = delete_type(&pool, property_type.id).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        remove_property(&pool, owner, property.id).await.unwrap();
        delete_type(&pool, property_type.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_datatype_change_checks_existing_values() {
        let pool = init_memory_database().await.unwrap();
        let alg = algorithms::create(&pool, &AlgorithmInput::new("alg1", AlgorithmKind::Classic))
            .await
            .unwrap();
        let property_type = float_type(&pool).await;
        add_property(
            &pool,
            PropertyOwner::Algorithm(alg.id),
            &ComputeResourcePropertyInput {
                value: "0.5".to_string(),
                type_id: property_type.id,
            },
        )
        .await
        .unwrap();

        let err = update_type(
            &pool,
            property_type.id,
            &ComputeResourcePropertyTypeInput {
                name: "T1 time".to_string(),
                datatype: Datatype::Integer,
                description: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_property_scoped_to_owner() {
        let pool = init_memory_database().await.unwrap();
        let a = algorithms::create(&pool, &AlgorithmInput::new("a", AlgorithmKind::Classic))
            .await
            .unwrap();
        let b = algorithms::create(&pool, &AlgorithmInput::new("b", AlgorithmKind::Classic))
            .await
            .unwrap();
        let property_type = float_type(&pool).await;
        let property = add_property(
            &pool,
            PropertyOwner::Algorithm(a.id),
            &ComputeResourcePropertyInput {
                value: "1.0".to_string(),
                type_id: property_type.id,
            },
        )
        .await
        .unwrap();

        let err = find_property(&pool, PropertyOwner::Algorithm(b.id), property.id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
