//! Algorithm relation types and algorithm-to-algorithm relations

use super::retry::{retry_on_lock, LOCK_WAIT};
use super::{count_references, ensure_exists, list_named};
use crate::models::{
    normalize_optional, AlgoRelationType, AlgoRelationTypeInput, AlgorithmRelation,
    AlgorithmRelationInput,
};
use crate::pagination::{Page, PageRequest};
use crate::uuid_utils;
use crate::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub(crate) fn map_relation_type(row: &SqliteRow) -> Result<AlgoRelationType> {
    let id: String = row.try_get("id")?;
    Ok(AlgoRelationType {
        id: uuid_utils::parse_column("algo_relation_types.id", &id)?,
        name: row.try_get("name")?,
        inverse_type_name: row.try_get("inverse_type_name")?,
    })
}

pub(crate) fn map_relation(row: &SqliteRow) -> Result<AlgorithmRelation> {
    let id: String = row.try_get("id")?;
    let source: String = row.try_get("source_algorithm_id")?;
    let target: String = row.try_get("target_algorithm_id")?;
    let relation_type: String = row.try_get("algo_relation_type_id")?;
    Ok(AlgorithmRelation {
        id: uuid_utils::parse_column("algorithm_relations.id", &id)?,
        source_algorithm_id: uuid_utils::parse_column("source_algorithm_id", &source)?,
        target_algorithm_id: uuid_utils::parse_column("target_algorithm_id", &target)?,
        algo_relation_type_id: uuid_utils::parse_column("algo_relation_type_id", &relation_type)?,
        description: row.try_get("description")?,
    })
}

// ---------------------------------------------------------------------------
// Relation types
// ---------------------------------------------------------------------------

pub async fn find_all_types(
    pool: &SqlitePool,
    request: &PageRequest,
) -> Result<Page<AlgoRelationType>> {
    list_named(pool, "algo_relation_types", request, map_relation_type).await
}

pub async fn find_type(pool: &SqlitePool, id: Uuid) -> Result<AlgoRelationType> {
    let row = sqlx::query("SELECT * FROM algo_relation_types WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::not_found("Algorithm relation type", id))?;
    map_relation_type(&row)
}

pub async fn create_type(
    pool: &SqlitePool,
    input: &AlgoRelationTypeInput,
) -> Result<AlgoRelationType> {
    input.validate()?;
    let id = uuid_utils::generate();

    sqlx::query("INSERT INTO algo_relation_types (id, name, inverse_type_name) VALUES (?, ?, ?)")
        .bind(id.to_string())
        .bind(input.name.trim())
        .bind(normalize_optional(&input.inverse_type_name))
        .execute(pool)
        .await?;

    info!("Created algorithm relation type {} ({})", input.name.trim(), id);
    find_type(pool, id).await
}

pub async fn update_type(
    pool: &SqlitePool,
    id: Uuid,
    input: &AlgoRelationTypeInput,
) -> Result<AlgoRelationType> {
    input.validate()?;

    let result =
        sqlx::query("UPDATE algo_relation_types SET name = ?, inverse_type_name = ? WHERE id = ?")
            .bind(input.name.trim())
            .bind(normalize_optional(&input.inverse_type_name))
            .bind(id.to_string())
            .execute(pool)
            .await?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found("Algorithm relation type", id));
    }
    find_type(pool, id).await
}

/// Delete a relation type; refused while relations use it
pub async fn delete_type(pool: &SqlitePool, id: Uuid) -> Result<()> {
    retry_on_lock("relations::delete_type", LOCK_WAIT, || delete_type_once(pool, id)).await
}

async fn delete_type_once(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let key = id.to_string();
    let mut tx = pool.begin().await?;
    ensure_exists(&mut tx, "algo_relation_types", "id", &key, "Algorithm relation type").await?;

    let usages =
        count_references(&mut tx, "algorithm_relations", "algo_relation_type_id", &key).await?;
    if usages > 0 {
        warn!("Refusing to delete algorithm relation type {}: used by {} relation(s)", id, usages);
        return Err(Error::Conflict(format!(
            "Algorithm relation type {} is used by {} relation(s)",
            id, usages
        )));
    }

    sqlx::query("DELETE FROM algo_relation_types WHERE id = ?")
        .bind(&key)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!("Deleted algorithm relation type {}", id);
    Ok(())
}

// ---------------------------------------------------------------------------
// Algorithm relations
// ---------------------------------------------------------------------------

/// Relations where the algorithm is source or target
pub async fn find_by_algorithm(
    pool: &SqlitePool,
    algorithm_id: Uuid,
    request: &PageRequest,
) -> Result<Page<AlgorithmRelation>> {
    let key = algorithm_id.to_string();
    let mut conn = pool.acquire().await?;
    ensure_exists(&mut conn, "algorithms", "id", &key, "Algorithm").await?;

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM algorithm_relations WHERE source_algorithm_id = ?1 OR target_algorithm_id = ?1",
    )
    .bind(&key)
    .fetch_one(&mut *conn)
    .await?;

    let pagination = request.pagination(total);
    let rows = sqlx::query(
        r#"
        SELECT * FROM algorithm_relations
        WHERE source_algorithm_id = ?1 OR target_algorithm_id = ?1
        ORDER BY rowid
        LIMIT ?2 OFFSET ?3
        "#,
    )
    .bind(&key)
    .bind(pagination.size)
    .bind(pagination.offset)
    .fetch_all(&mut *conn)
    .await?;

    let content = rows.iter().map(map_relation).collect::<Result<Vec<_>>>()?;
    Ok(Page::new(content, pagination, total))
}

async fn find_relation_in(
    conn: &mut SqliteConnection,
    algorithm_id: Uuid,
    relation_id: Uuid,
) -> Result<Option<AlgorithmRelation>> {
    let row = sqlx::query(
        r#"
        SELECT * FROM algorithm_relations
        WHERE id = ?1 AND (source_algorithm_id = ?2 OR target_algorithm_id = ?2)
        "#,
    )
    .bind(relation_id.to_string())
    .bind(algorithm_id.to_string())
    .fetch_optional(&mut *conn)
    .await?;
    row.as_ref().map(map_relation).transpose()
}

pub async fn find_relation(
    pool: &SqlitePool,
    algorithm_id: Uuid,
    relation_id: Uuid,
) -> Result<AlgorithmRelation> {
    let mut conn = pool.acquire().await?;
    ensure_exists(&mut conn, "algorithms", "id", &algorithm_id.to_string(), "Algorithm").await?;
    find_relation_in(&mut conn, algorithm_id, relation_id)
        .await?
        .ok_or_else(|| Error::not_found("Algorithm relation", relation_id))
}

/// Resolve everything a relation payload references
async fn check_relation_input(
    conn: &mut SqliteConnection,
    algorithm_id: Uuid,
    input: &AlgorithmRelationInput,
) -> Result<()> {
    ensure_exists(conn, "algorithms", "id", &algorithm_id.to_string(), "Algorithm").await?;
    input.validate_for(algorithm_id)?;
    for other in [input.source_algorithm_id, input.target_algorithm_id] {
        ensure_exists(conn, "algorithms", "id", &other.to_string(), "Algorithm").await?;
    }
    ensure_exists(
        conn,
        "algo_relation_types",
        "id",
        &input.algo_relation_type_id.to_string(),
        "Algorithm relation type",
    )
    .await
}

pub async fn add_relation(
    pool: &SqlitePool,
    algorithm_id: Uuid,
    input: &AlgorithmRelationInput,
) -> Result<AlgorithmRelation> {
    retry_on_lock("relations::add_relation", LOCK_WAIT, || {
        add_relation_once(pool, algorithm_id, input)
    })
    .await
}

async fn add_relation_once(
    pool: &SqlitePool,
    algorithm_id: Uuid,
    input: &AlgorithmRelationInput,
) -> Result<AlgorithmRelation> {
    let id = uuid_utils::generate();
    let mut tx = pool.begin().await?;
    check_relation_input(&mut tx, algorithm_id, input).await?;

    sqlx::query(
        r#"
        INSERT INTO algorithm_relations (
            id, source_algorithm_id, target_algorithm_id, algo_relation_type_id, description
        ) VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(input.source_algorithm_id.to_string())
    .bind(input.target_algorithm_id.to_string())
    .bind(input.algo_relation_type_id.to_string())
    .bind(input.description())
    .execute(&mut *tx)
    .await?;

    let created = find_relation_in(&mut tx, algorithm_id, id)
        .await?
        .ok_or_else(|| Error::Internal(format!("Relation {} vanished after insert", id)))?;
    tx.commit().await?;

    info!(
        "Added algorithm relation {} -> {} ({})",
        input.source_algorithm_id, input.target_algorithm_id, id
    );
    Ok(created)
}

pub async fn update_relation(
    pool: &SqlitePool,
    algorithm_id: Uuid,
    relation_id: Uuid,
    input: &AlgorithmRelationInput,
) -> Result<AlgorithmRelation> {
    retry_on_lock("relations::update_relation", LOCK_WAIT, || {
        update_relation_once(pool, algorithm_id, relation_id, input)
    })
    .await
}

async fn update_relation_once(
    pool: &SqlitePool,
    algorithm_id: Uuid,
    relation_id: Uuid,
    input: &AlgorithmRelationInput,
) -> Result<AlgorithmRelation> {
    let mut tx = pool.begin().await?;
    check_relation_input(&mut tx, algorithm_id, input).await?;
    if find_relation_in(&mut tx, algorithm_id, relation_id).await?.is_none() {
        return Err(Error::not_found("Algorithm relation", relation_id));
    }

    sqlx::query(
        r#"
        UPDATE algorithm_relations SET
            source_algorithm_id = ?, target_algorithm_id = ?,
            algo_relation_type_id = ?, description = ?
        WHERE id = ?
        "#,
    )
    .bind(input.source_algorithm_id.to_string())
    .bind(input.target_algorithm_id.to_string())
    .bind(input.algo_relation_type_id.to_string())
    .bind(input.description())
    .bind(relation_id.to_string())
    .execute(&mut *tx)
    .await?;

    let updated = find_relation_in(&mut tx, algorithm_id, relation_id)
        .await?
        .ok_or_else(|| Error::not_found("Algorithm relation", relation_id))?;
    tx.commit().await?;
    Ok(updated)
}

/// Remove a relation of the algorithm; an absent relation is a no-op
pub async fn remove_relation(
    pool: &SqlitePool,
    algorithm_id: Uuid,
    relation_id: Uuid,
) -> Result<()> {
    retry_on_lock("relations::remove_relation", LOCK_WAIT, || {
        remove_relation_once(pool, algorithm_id, relation_id)
    })
    .await
}

async fn remove_relation_once(
    pool: &SqlitePool,
    algorithm_id: Uuid,
    relation_id: Uuid,
) -> Result<()> {
    let mut tx = pool.begin().await?;
    ensure_exists(&mut tx, "algorithms", "id", &algorithm_id.to_string(), "Algorithm").await?;

    let result = sqlx::query(
        r#"
        DELETE FROM algorithm_relations
        WHERE id = ?1 AND (source_algorithm_id = ?2 OR target_algorithm_id = ?2)
        "#,
    )
    .bind(relation_id.to_string())
    .bind(algorithm_id.to_string())
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    debug!(
        "Removed algorithm relation {} of {} (existed: {})",
        relation_id,
        algorithm_id,
        result.rows_affected() > 0
    );
    Ok(())
}
