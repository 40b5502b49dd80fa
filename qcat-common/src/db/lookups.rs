//! Application areas and learning methods
//!
//! Both are plain id + name rows linked to algorithms; deleting one removes
//! its links.

use super::algorithms::map_algorithm;
use super::associations::{self, Association, Direction};
use super::list_named;
use crate::models::{Algorithm, NamedEntity, NamedEntityInput};
use crate::pagination::{Page, PageRequest};
use crate::uuid_utils;
use crate::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;
use uuid::Uuid;

/// Lookup tables sharing the id + name shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    ApplicationArea,
    LearningMethod,
}

impl Lookup {
    fn table(&self) -> &'static str {
        match self {
            Self::ApplicationArea => "application_areas",
            Self::LearningMethod => "learning_methods",
        }
    }

    fn entity(&self) -> &'static str {
        match self {
            Self::ApplicationArea => "Application area",
            Self::LearningMethod => "Learning method",
        }
    }

    pub fn association(&self) -> Association {
        match self {
            Self::ApplicationArea => Association::AlgorithmApplicationArea,
            Self::LearningMethod => Association::AlgorithmLearningMethod,
        }
    }
}

pub fn map_named(row: &SqliteRow) -> Result<NamedEntity> {
    let id: String = row.try_get("id")?;
    Ok(NamedEntity {
        id: uuid_utils::parse_column("id", &id)?,
        name: row.try_get("name")?,
    })
}

pub async fn find_all(
    pool: &SqlitePool,
    lookup: Lookup,
    request: &PageRequest,
) -> Result<Page<NamedEntity>> {
    list_named(pool, lookup.table(), request, map_named).await
}

pub async fn find_by_id(pool: &SqlitePool, lookup: Lookup, id: Uuid) -> Result<NamedEntity> {
    let sql = format!("SELECT * FROM {} WHERE id = ?", lookup.table());
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::not_found(lookup.entity(), id))?;
    map_named(&row)
}

pub async fn create(
    pool: &SqlitePool,
    lookup: Lookup,
    input: &NamedEntityInput,
) -> Result<NamedEntity> {
    input.validate()?;
    let id = uuid_utils::generate();

    let sql = format!("INSERT INTO {} (id, name) VALUES (?, ?)", lookup.table());
    sqlx::query(&sql)
        .bind(id.to_string())
        .bind(input.name.trim())
        .execute(pool)
        .await?;

    info!("Created {} {} ({})", lookup.entity().to_lowercase(), input.name.trim(), id);
    find_by_id(pool, lookup, id).await
}

pub async fn update(
    pool: &SqlitePool,
    lookup: Lookup,
    id: Uuid,
    input: &NamedEntityInput,
) -> Result<NamedEntity> {
    input.validate()?;

    let sql = format!("UPDATE {} SET name = ? WHERE id = ?", lookup.table());
    let result = sqlx::query(&sql)
        .bind(input.name.trim())
        .bind(id.to_string())
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found(lookup.entity(), id));
    }
    find_by_id(pool, lookup, id).await
}

pub async fn delete(pool: &SqlitePool, lookup: Lookup, id: Uuid) -> Result<()> {
    let sql = format!("DELETE FROM {} WHERE id = ?", lookup.table());
    let result = sqlx::query(&sql)
        .bind(id.to_string())
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found(lookup.entity(), id));
    }
    info!("Deleted {} {}", lookup.entity().to_lowercase(), id);
    Ok(())
}

pub async fn find_algorithms(
    pool: &SqlitePool,
    lookup: Lookup,
    id: Uuid,
    request: &PageRequest,
) -> Result<Page<Algorithm>> {
    associations::fetch_linked(
        pool,
        lookup.association(),
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
    use crate::db::{algorithms, init_memory_database};
    use crate::models::{AlgorithmInput, AlgorithmKind};

    #[tokio::test]
    async fn test_delete_keeps_algorithm() {
        let pool = init_memory_database().await.unwrap();
        let alg = algorithms::create(&pool, &AlgorithmInput::new("VQE", AlgorithmKind::Classic))
            .await
            .unwrap();
        let area = create(&pool, Lookup::ApplicationArea, &NamedEntityInput::new("Chemistry"))
            .await
            .unwrap();

        associations::link(
            &pool,
            Association::AlgorithmApplicationArea,
            &alg.id.to_string(),
            &area.id.to_string(),
        )
        .await
        .unwrap();
        let page = find_algorithms(&pool, Lookup::ApplicationArea, area.id, &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.content.len(), 1);

        delete(&pool, Lookup::ApplicationArea, area.id).await.unwrap();
        assert!(algorithms::find_by_id(&pool, alg.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_lookups_are_separate_tables() {
        let pool = init_memory_database().await.unwrap();
        let method = create(&pool, Lookup::LearningMethod, &NamedEntityInput::new("Supervised"))
            .await
            .unwrap();

        let err = find_by_id(&pool, Lookup::ApplicationArea, method.id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let page = find_all(
            &pool,
            Lookup::LearningMethod,
            &PageRequest::default().with_search("super"),
        )
        .await
        .unwrap();
        assert_eq!(page.page.total_elements, 1);
    }
}
