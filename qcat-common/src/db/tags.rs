//! Tag persistence
//!
//! Tags are keyed by their value. Deleting a tag removes its links.

use super::algorithms::map_algorithm;
use super::associations::{self, Association, Direction};
use super::implementations::map_implementation;
use super::{list_named_by, map_constraint_error};
use crate::models::{Algorithm, Implementation, Tag};
use crate::pagination::{Page, PageRequest};
use crate::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::info;

pub fn map_tag(row: &SqliteRow) -> Result<Tag> {
    Ok(Tag {
        value: row.try_get("value")?,
        category: row.try_get("category")?,
    })
}

pub async fn find_all(pool: &SqlitePool, request: &PageRequest) -> Result<Page<Tag>> {
    list_named_by(pool, "tags", "value", request, map_tag).await
}

pub async fn find_by_value(pool: &SqlitePool, value: &str) -> Result<Tag> {
    let row = sqlx::query("SELECT * FROM tags WHERE value = ?")
        .bind(value)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Tag with value {} does not exist", value)))?;
    map_tag(&row)
}

/// Create a tag; an existing value is a Conflict
pub async fn create(pool: &SqlitePool, tag: &Tag) -> Result<Tag> {
    tag.validate()?;
    let tag = tag.normalized();

    sqlx::query("INSERT INTO tags (value, category) VALUES (?, ?)")
        .bind(&tag.value)
        .bind(&tag.category)
        .execute(pool)
        .await
        .map_err(|e| map_constraint_error(e, &format!("Tag {}", tag.value)))?;

    info!("Created tag {}", tag.value);
    Ok(tag)
}

/// Update the category of an existing tag
///
/// The value is the key and cannot be changed.
pub async fn update(pool: &SqlitePool, value: &str, tag: &Tag) -> Result<Tag> {
    tag.validate()?;
    let tag = tag.normalized();
    if tag.value != value {
        return Err(Error::InvalidInput(format!(
            "Tag value cannot be changed ({} -> {})",
            value, tag.value
        )));
    }

    let result = sqlx::query("UPDATE tags SET category = ? WHERE value = ?")
        .bind(&tag.category)
        .bind(value)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Tag with value {} does not exist", value)));
    }
    Ok(tag)
}

pub async fn delete(pool: &SqlitePool, value: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM tags WHERE value = ?")
        .bind(value)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Tag with value {} does not exist", value)));
    }
    info!("Deleted tag {}", value);
    Ok(())
}

/// Return the stored tag for `tag.value`, inserting it first when absent
pub(crate) async fn ensure_tag(conn: &mut SqliteConnection, tag: &Tag) -> Result<Tag> {
    tag.validate()?;
    let tag = tag.normalized();

    let inserted = sqlx::query("INSERT OR IGNORE INTO tags (value, category) VALUES (?, ?)")
        .bind(&tag.value)
        .bind(&tag.category)
        .execute(&mut *conn)
        .await?;
    if inserted.rows_affected() > 0 {
        info!("Created tag {} while linking", tag.value);
    }

    let row = sqlx::query("SELECT * FROM tags WHERE value = ?")
        .bind(&tag.value)
        .fetch_one(&mut *conn)
        .await?;
    map_tag(&row)
}

pub async fn find_algorithms(
    pool: &SqlitePool,
    value: &str,
    request: &PageRequest,
) -> Result<Page<Algorithm>> {
    associations::fetch_linked(
        pool,
        Association::AlgorithmTag,
        Direction::Reverse,
        value,
        request,
        map_algorithm,
    )
    .await
}

pub async fn find_implementations(
    pool: &SqlitePool,
    value: &str,
    request: &PageRequest,
) -> Result<Page<Implementation>> {
    associations::fetch_linked(
        pool,
        Association::ImplementationTag,
        Direction::Reverse,
        value,
        request,
        map_implementation,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{algorithms, init_memory_database};
    use crate::models::{AlgorithmInput, AlgorithmKind};

    #[tokio::test]
    async fn test_duplicate_tag_is_conflict() {
        let pool = init_memory_database().await.unwrap();
        create(&pool, &Tag::new("optimization", None)).await.unwrap();

        let err = create(&pool, &Tag::new(" optimization ", Some("x")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_cannot_rename() {
        let pool = init_memory_database().await.unwrap();
        create(&pool, &Tag::new("qml", None)).await.unwrap();

        let updated = update(&pool, "qml", &Tag::new("qml", Some("learning")))
            .await
            .unwrap();
        assert_eq!(updated.category.as_deref(), Some("learning"));

        let err = update(&pool, "qml", &Tag::new("ml", None)).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_delete_removes_links_only() {
        let pool = init_memory_database().await.unwrap();
        let alg = algorithms::create(&pool, &AlgorithmInput::new("alg1", AlgorithmKind::Classic))
            .await
            .unwrap();
        algorithms::link_tag(&pool, alg.id, &Tag::new("sorting", None))
            .await
            .unwrap();

        let page = find_algorithms(&pool, "sorting", &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.content.len(), 1);

        delete(&pool, "sorting").await.unwrap();
        assert!(algorithms::find_by_id(&pool, alg.id).await.is_ok());
        assert!(matches!(
            find_by_value(&pool, "sorting").await.unwrap_err(),
            Error::NotFound(_)
        ));
    }
}
