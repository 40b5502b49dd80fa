//! Problem type hierarchy
//!
//! Parent references must never form a cycle; every write walks the chain
//! upward from the proposed parent before committing.

use super::algorithms::map_algorithm;
use super::associations::{self, Association, Direction};
use super::list_named;
use super::retry::{retry_on_lock, LOCK_WAIT};
use crate::models::{Algorithm, ProblemType, ProblemTypeInput};
use crate::pagination::{Page, PageRequest};
use crate::uuid_utils;
use crate::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::HashSet;
use tracing::info;
use uuid::Uuid;

pub fn map_problem_type(row: &SqliteRow) -> Result<ProblemType> {
    let id: String = row.try_get("id")?;
    Ok(ProblemType {
        id: uuid_utils::parse_column("problem_types.id", &id)?,
        name: row.try_get("name")?,
        parent_problem_type_id: uuid_utils::parse_optional_column(
            "problem_types.parent_problem_type_id",
            row.try_get("parent_problem_type_id")?,
        )?,
    })
}

pub async fn find_all(pool: &SqlitePool, request: &PageRequest) -> Result<Page<ProblemType>> {
    list_named(pool, "problem_types", request, map_problem_type).await
}

pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<ProblemType> {
    let mut conn = pool.acquire().await?;
    find_in(&mut conn, id).await
}

async fn find_in(conn: &mut SqliteConnection, id: Uuid) -> Result<ProblemType> {
    let row = sqlx::query("SELECT * FROM problem_types WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::not_found("Problem type", id))?;
    map_problem_type(&row)
}

/// Ancestors of a problem type, nearest parent first
pub async fn find_parent_tree(pool: &SqlitePool, id: Uuid) -> Result<Vec<ProblemType>> {
    let mut conn = pool.acquire().await?;
    let start = find_in(&mut conn, id).await?;

    let mut ancestors = Vec::new();
    let mut seen = HashSet::from([start.id]);
    let mut next = start.parent_problem_type_id;
    while let Some(parent_id) = next {
        if !seen.insert(parent_id) {
            return Err(Error::Internal(format!(
                "Cycle in problem type hierarchy at {}",
                parent_id
            )));
        }
        let parent = find_in(&mut conn, parent_id).await?;
        next = parent.parent_problem_type_id;
        ancestors.push(parent);
    }
    Ok(ancestors)
}

/// Reject `parent` when it is `id` itself or one of its descendants
async fn check_parent(conn: &mut SqliteConnection, id: Uuid, parent: Option<Uuid>) -> Result<()> {
    let mut next = parent;
    while let Some(current) = next {
        if current == id {
            return Err(Error::InvalidInput(format!(
                "Problem type {} cannot be its own ancestor",
                id
            )));
        }
        next = find_in(conn, current).await?.parent_problem_type_id;
    }
    Ok(())
}

pub async fn create(pool: &SqlitePool, input: &ProblemTypeInput) -> Result<ProblemType> {
    retry_on_lock("problem_types::create", LOCK_WAIT, || create_once(pool, input)).await
}

async fn create_once(pool: &SqlitePool, input: &ProblemTypeInput) -> Result<ProblemType> {
    input.validate()?;
    let id = uuid_utils::generate();

    let mut tx = pool.begin().await?;
    if let Some(parent) = input.parent_problem_type_id {
        find_in(&mut tx, parent).await?;
    }

    sqlx::query("INSERT INTO problem_types (id, name, parent_problem_type_id) VALUES (?, ?, ?)")
        .bind(id.to_string())
        .bind(input.name.trim())
        .bind(input.parent_problem_type_id.map(|p| p.to_string()))
        .execute(&mut *tx)
        .await?;

    let created = find_in(&mut tx, id).await?;
    tx.commit().await?;

    info!("Created problem type {} ({})", created.name, id);
    Ok(created)
}

pub async fn update(pool: &SqlitePool, id: Uuid, input: &ProblemTypeInput) -> Result<ProblemType> {
    retry_on_lock("problem_types::update", LOCK_WAIT, || update_once(pool, id, input)).await
}

async fn update_once(pool: &SqlitePool, id: Uuid, input: &ProblemTypeInput) -> Result<ProblemType> {
    input.validate()?;

    let mut tx = pool.begin().await?;
    find_in(&mut tx, id).await?;
    check_parent(&mut tx, id, input.parent_problem_type_id).await?;

    sqlx::query("UPDATE problem_types SET name = ?, parent_problem_type_id = ? WHERE id = ?")
        .bind(input.name.trim())
        .bind(input.parent_problem_type_id.map(|p| p.to_string()))
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

    let updated = find_in(&mut tx, id).await?;
    tx.commit().await?;
    Ok(updated)
}

/// Delete a problem type
///
/// Children lose their parent and algorithm links are removed.
pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM problem_types WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found("Problem type", id));
    }
    info!("Deleted problem type {}", id);
    Ok(())
}

pub async fn find_algorithms(
    pool: &SqlitePool,
    id: Uuid,
    request: &PageRequest,
) -> Result<Page<Algorithm>> {
    associations::fetch_linked(
        pool,
        Association::AlgorithmProblemType,
        Direction::Reverse,
        &id.to_string(),
        request,
        map_algorithm,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_database;

    #[tokio::test]
    async fn test_parent_tree_nearest_first() {
        let pool = init_memory_database().await.unwrap();
        let root = create(&pool, &ProblemTypeInput::new("Optimization", None)).await.unwrap();
        let mid = create(&pool, &ProblemTypeInput::new("Combinatorial", Some(root.id)))
            .await
            .unwrap();
        let leaf = create(&pool, &ProblemTypeInput::new("MaxCut", Some(mid.id)))
            .await
            .unwrap();

        let tree = find_parent_tree(&pool, leaf.id).await.unwrap();
        let names: Vec<_> = tree.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Combinatorial", "Optimization"]);
    }

    #[tokio::test]
    async fn test_cycle_rejected() {
        let pool = init_memory_database().await.unwrap();
        let a = create(&pool, &ProblemTypeInput::new("A", None)).await.unwrap();
        let b = create(&pool, &ProblemTypeInput::new("B", Some(a.id))).await.unwrap();

        let err = update(&pool, a.id, &ProblemTypeInput::new("A", Some(b.id)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let err = update(&pool, a.id, &ProblemTypeInput::new("A", Some(a.id)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_delete_clears_child_parent() {
        let pool = init_memory_database().await.unwrap();
        let parent = create(&pool, &ProblemTypeInput::new("Search", None)).await.unwrap();
        let child = create(&pool, &ProblemTypeInput::new("Unstructured search", Some(parent.id)))
            .await
            .unwrap();

        delete(&pool, parent.id).await.unwrap();

        let child = find_by_id(&pool, child.id).await.unwrap();
        assert_eq!(child.parent_problem_type_id, None);
    }

    #[tokio::test]
    async fn test_missing_parent_is_not_found() {
        let pool = init_memory_database().await.unwrap();
        let err = create(&pool, &ProblemTypeInput::new("X", Some(Uuid::new_v4())))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
