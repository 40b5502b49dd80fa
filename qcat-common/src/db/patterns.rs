//! Pattern relation types and algorithm-to-pattern relations

use super::retry::{retry_on_lock, LOCK_WAIT};
use super::{count_references, ensure_exists, list_named};
use crate::models::{
    PatternRelation, PatternRelationInput, PatternRelationType, PatternRelationTypeInput,
};
use crate::pagination::{Page, PageRequest};
use crate::uuid_utils;
use crate::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub(crate) fn map_pattern_relation_type(row: &SqliteRow) -> Result<PatternRelationType> {
    let id: String = row.try_get("id")?;
    Ok(PatternRelationType {
        id: uuid_utils::parse_column("pattern_relation_types.id", &id)?,
        name: row.try_get("name")?,
    })
}

pub(crate) fn map_pattern_relation(row: &SqliteRow) -> Result<PatternRelation> {
    let id: String = row.try_get("id")?;
    let algorithm_id: String = row.try_get("algorithm_id")?;
    let type_id: String = row.try_get("pattern_relation_type_id")?;
    Ok(PatternRelation {
        id: uuid_utils::parse_column("pattern_relations.id", &id)?,
        algorithm_id: uuid_utils::parse_column("pattern_relations.algorithm_id", &algorithm_id)?,
        pattern: row.try_get("pattern")?,
        pattern_relation_type_id: uuid_utils::parse_column("pattern_relation_type_id", &type_id)?,
        description: row.try_get("description")?,
    })
}

pub async fn find_all_types(
    pool: &SqlitePool,
    request: &PageRequest,
) -> Result<Page<PatternRelationType>> {
    list_named(pool, "pattern_relation_types", request, map_pattern_relation_type).await
}

pub async fn find_type(pool: &SqlitePool, id: Uuid) -> Result<PatternRelationType> {
    let row = sqlx::query("SELECT * FROM pattern_relation_types WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::not_found("Pattern relation type", id))?;
    map_pattern_relation_type(&row)
}

pub async fn create_type(
    pool: &SqlitePool,
    input: &PatternRelationTypeInput,
) -> Result<PatternRelationType> {
    input.validate()?;
    let id = uuid_utils::generate();

    sqlx::query("INSERT INTO pattern_relation_types (id, name) VALUES (?, ?)")
        .bind(id.to_string())
        .bind(input.name.trim())
        .execute(pool)
        .await?;

    info!("Created pattern relation type {} ({})", input.name.trim(), id);
    find_type(pool, id).await
}

pub async fn update_type(
    pool: &SqlitePool,
    id: Uuid,
    input: &PatternRelationTypeInput,
) -> Result<PatternRelationType> {
    input.validate()?;

    let result = sqlx::query("UPDATE pattern_relation_types SET name = ? WHERE id = ?")
        .bind(input.name.trim())
        .bind(id.to_string())
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found("Pattern relation type", id));
    }
    find_type(pool, id).await
}

/// Delete a pattern relation type; refused while pattern relations use it
pub async fn delete_type(pool: &SqlitePool, id: Uuid) -> Result<()> {
    retry_on_lock("patterns::delete_type", LOCK_WAIT, || delete_type_once(pool, id)).await
}

async fn delete_type_once(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let key = id.to_string();
    let mut tx = pool.begin().await?;
    ensure_exists(&mut tx, "pattern_relation_types", "id", &key, "Pattern relation type").await?;

    let usages =
        count_references(&mut tx, "pattern_relations", "pattern_relation_type_id", &key).await?;
    if usages > 0 {
        warn!("Refusing to delete pattern relation type {}: used by {} relation(s)", id, usages);
        return Err(Error::Conflict(format!(
            "Pattern relation type {} is used by {} pattern relation(s)",
            id, usages
        )));
    }

    sqlx::query("DELETE FROM pattern_relation_types WHERE id = ?")
        .bind(&key)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!("Deleted pattern relation type {}", id);
    Ok(())
}

pub async fn find_by_algorithm(
    pool: &SqlitePool,
    algorithm_id: Uuid,
    request: &PageRequest,
) -> Result<Page<PatternRelation>> {
    let key = algorithm_id.to_string();
    let mut conn = pool.acquire().await?;
    ensure_exists(&mut conn, "algorithms", "id", &key, "Algorithm").await?;

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pattern_relations WHERE algorithm_id = ?",
    )
    .bind(&key)
    .fetch_one(&mut *conn)
    .await?;

    let pagination = request.pagination(total);
    let rows = sqlx::query(
        "SELECT * FROM pattern_relations WHERE algorithm_id = ? ORDER BY rowid LIMIT ? OFFSET ?",
    )
    .bind(&key)
    .bind(pagination.size)
    .bind(pagination.offset)
    .fetch_all(&mut *conn)
    .await?;

    let content = rows
        .iter()
        .map(map_pattern_relation)
        .collect::<Result<Vec<_>>>()?;
    Ok(Page::new(content, pagination, total))
}

async fn find_relation_in(
    conn: &mut SqliteConnection,
    algorithm_id: Uuid,
    relation_id: Uuid,
) -> Result<PatternRelation> {
    let row = sqlx::query("SELECT * FROM pattern_relations WHERE id = ? AND algorithm_id = ?")
        .bind(relation_id.to_string())
        .bind(algorithm_id.to_string())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::not_found("Pattern relation", relation_id))?;
    map_pattern_relation(&row)
}

pub async fn find_relation(
    pool: &SqlitePool,
    algorithm_id: Uuid,
    relation_id: Uuid,
) -> Result<PatternRelation> {
    let mut conn = pool.acquire().await?;
    ensure_exists(&mut conn, "algorithms", "id", &algorithm_id.to_string(), "Algorithm").await?;
    find_relation_in(&mut conn, algorithm_id, relation_id).await
}

async fn check_input(
    conn: &mut SqliteConnection,
    algorithm_id: Uuid,
    input: &PatternRelationInput,
) -> Result<()> {
    ensure_exists(conn, "algorithms", "id", &algorithm_id.to_string(), "Algorithm").await?;
    input.validate()?;
    ensure_exists(
        conn,
        "pattern_relation_types",
        "id",
        &input.pattern_relation_type_id.to_string(),
        "Pattern relation type",
    )
    .await
}

pub async fn add_relation(
    pool: &SqlitePool,
    algorithm_id: Uuid,
    input: &PatternRelationInput,
) -> Result<PatternRelation> {
    retry_on_lock("patterns::add_relation", LOCK_WAIT, || {
        add_relation_once(pool, algorithm_id, input)
    })
    .await
}

async fn add_relation_once(
    pool: &SqlitePool,
    algorithm_id: Uuid,
    input: &PatternRelationInput,
) -> Result<PatternRelation> {
    let id = uuid_utils::generate();
    let mut tx = pool.begin().await?;
    check_input(&mut tx, algorithm_id, input).await?;

    sqlx::query(
        r#"
        INSERT INTO pattern_relations (id, algorithm_id, pattern, pattern_relation_type_id, description)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(algorithm_id.to_string())
    .bind(input.pattern.trim())
    .bind(input.pattern_relation_type_id.to_string())
    .bind(input.description())
    .execute(&mut *tx)
    .await?;

    let created = find_relation_in(&mut tx, algorithm_id, id).await?;
    tx.commit().await?;

    info!("Added pattern relation {} -> {} ({})", algorithm_id, created.pattern, id);
    Ok(created)
}

pub async fn update_relation(
    pool: &SqlitePool,
    algorithm_id: Uuid,
    relation_id: Uuid,
    input: &PatternRelationInput,
) -> Result<PatternRelation> {
    retry_on_lock("patterns::update_relation", LOCK_WAIT, || {
        update_relation_once(pool, algorithm_id, relation_id, input)
    })
    .await
}

async fn update_relation_once(
    pool: &SqlitePool,
    algorithm_id: Uuid,
    relation_id: Uuid,
    input: &PatternRelationInput,
) -> Result<PatternRelation> {
    let mut tx = pool.begin().await?;
    check_input(&mut tx, algorithm_id, input).await?;
    find_relation_in(&mut tx, algorithm_id, relation_id).await?;

    sqlx::query(
        r#"
        UPDATE pattern_relations SET pattern = ?, pattern_relation_type_id = ?, description = ?
        WHERE id = ?
        "#,
    )
    .bind(input.pattern.trim())
    .bind(input.pattern_relation_type_id.to_string())
    .bind(input.description())
    .bind(relation_id.to_string())
    .execute(&mut *tx)
    .await?;

    let updated = find_relation_in(&mut tx, algorithm_id, relation_id).await?;
    tx.commit().await?;
    Ok(updated)
}

/// Remove a pattern relation; an absent relation is a no-op
pub async fn remove_relation(
    pool: &SqlitePool,
    algorithm_id: Uuid,
    relation_id: Uuid,
) -> Result<()> {
    retry_on_lock("patterns::remove_relation", LOCK_WAIT, || {
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

    let result = sqlx::query("DELETE FROM pattern_relations WHERE id = ? AND algorithm_id = ?")
        .bind(relation_id.to_string())
        .bind(algorithm_id.to_string())
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    debug!(
        "Removed pattern relation {} of {} (existed: {})",
        relation_id,
        algorithm_id,
        result.rows_affected() > 0
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{algorithms, init_memory_database};
    use crate::models::{AlgorithmInput, AlgorithmKind};

    #[tokio::test]
    async fn test_pattern_relation_lifecycle() {
        let pool = init_memory_database().await.unwrap();
        let alg = algorithms::create(&pool, &AlgorithmInput::new("Grover", AlgorithmKind::Classic))
            .await
            .unwrap();
        let relation_type = create_type(
            &pool,
            &PatternRelationTypeInput {
                name: "usesPattern".to_string(),
            },
        )
        .await
        .unwrap();

        let input = PatternRelationInput {
            pattern: "https://patterns.example.org/amplitude-amplification".to_string(),
            pattern_relation_type_id: relation_type.id,
            description: Some("core step".to_string()),
        };
        let created = add_relation(&pool, alg.id, &input).await.unwrap();
        assert_eq!(created.algorithm_id, alg.id);

        let err = delete_type(&pool, relation_type.id).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        remove_relation(&pool, alg.id, created.id).await.unwrap();
        let page = find_by_algorithm(&pool, alg.id, &PageRequest::default()).await.unwrap();
        assert!(page.content.is_empty());
        delete_type(&pool, relation_type.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_relative_pattern_rejected() {
        let pool = init_memory_database().await.unwrap();
        let alg = algorithms::create(&pool, &AlgorithmInput::new("Grover", AlgorithmKind::Classic))
            .await
            .unwrap();
        let relation_type = create_type(
            &pool,
            &PatternRelationTypeInput {
                name: "usesPattern".to_string(),
            },
        )
        .await
        .unwrap();

        let input = PatternRelationInput {
            pattern: "amplitude-amplification".to_string(),
            pattern_relation_type_id: relation_type.id,
            description: None,
        };
        let err = add_relation(&pool, alg.id, &input).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
