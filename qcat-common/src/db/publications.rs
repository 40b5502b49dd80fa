//! Publication persistence
//!
//! Authors are stored as a JSON array in a single column.

use super::algorithms::map_algorithm;
use super::associations::{self, Association, Direction};
use super::implementations::map_implementation;
use super::list_named_by;
use crate::models::{Algorithm, Implementation, Publication, PublicationInput};
use crate::pagination::{Page, PageRequest};
use crate::uuid_utils;
use crate::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;
use uuid::Uuid;

pub fn map_publication(row: &SqliteRow) -> Result<Publication> {
    let id: String = row.try_get("id")?;
    let authors: String = row.try_get("authors")?;
    Ok(Publication {
        id: uuid_utils::parse_column("publications.id", &id)?,
        title: row.try_get("title")?,
        doi: row.try_get("doi")?,
        url: row.try_get("url")?,
        authors: serde_json::from_str(&authors)
            .map_err(|e| Error::Internal(format!("Invalid authors JSON for {}: {}", id, e)))?,
    })
}

fn authors_json(authors: &[String]) -> Result<String> {
    serde_json::to_string(authors)
        .map_err(|e| Error::Internal(format!("Failed to encode authors: {}", e)))
}

/// Page of publications, optionally filtered by title
pub async fn find_all(pool: &SqlitePool, request: &PageRequest) -> Result<Page<Publication>> {
    list_named_by(pool, "publications", "title", request, map_publication).await
}

pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Publication> {
    let row = sqlx::query("SELECT * FROM publications WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::not_found("Publication", id))?;
    map_publication(&row)
}

pub async fn create(pool: &SqlitePool, input: &PublicationInput) -> Result<Publication> {
    input.validate()?;
    let input = input.normalized();
    let id = uuid_utils::generate();

    sqlx::query("INSERT INTO publications (id, title, doi, url, authors) VALUES (?, ?, ?, ?, ?)")
        .bind(id.to_string())
        .bind(&input.title)
        .bind(&input.doi)
        .bind(&input.url)
        .bind(authors_json(&input.authors)?)
        .execute(pool)
        .await?;

    info!("Created publication {} ({})", input.title, id);
    find_by_id(pool, id).await
}

pub async fn update(pool: &SqlitePool, id: Uuid, input: &PublicationInput) -> Result<Publication> {
    input.validate()?;
    let input = input.normalized();

    let result =
        sqlx::query("UPDATE publications SET title = ?, doi = ?, url = ?, authors = ? WHERE id = ?")
            .bind(&input.title)
            .bind(&input.doi)
            .bind(&input.url)
            .bind(authors_json(&input.authors)?)
            .bind(id.to_string())
            .execute(pool)
            .await?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found("Publication", id));
    }
    find_by_id(pool, id).await
}

/// Delete a publication and its links
pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM publications WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found("Publication", id));
    }
    info!("Deleted publication {}", id);
    Ok(())
}

pub async fn find_algorithms(
    pool: &SqlitePool,
    id: Uuid,
    request: &PageRequest,
) -> Result<Page<Algorithm>> {
    associations::fetch_linked(
        pool,
        Association::AlgorithmPublication,
        Direction::Reverse,
        &id.to_string(),
        request,
        map_algorithm,
    )
    .await
}

pub async fn find_implementations(
    pool: &SqlitePool,
    id: Uuid,
    request: &PageRequest,
) -> Result<Page<Implementation>> {
    associations::fetch_linked(
        pool,
        Association::ImplementationPublication,
        Direction::Reverse,
        &id.to_string(),
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
    async fn test_authors_roundtrip() {
        let pool = init_memory_database().await.unwrap();
        let input = PublicationInput {
            title: "Polynomial-Time Algorithms for Prime Factorization".to_string(),
            doi: Some("10.1137/S0097539795293172".to_string()),
            authors: vec!["Peter W. Shor".to_string()],
            ..Default::default()
        };

        let created = create(&pool, &input).await.unwrap();
        assert_eq!(created.authors, vec!["Peter W. Shor"]);
        assert_eq!(find_by_id(&pool, created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_linked_algorithms_visible_and_removed_on_delete() {
        let pool = init_memory_database().await.unwrap();
        let alg = algorithms::create(&pool, &AlgorithmInput::new("Shor", AlgorithmKind::Classic))
            .await
            .unwrap();
        let publication = create(&pool, &PublicationInput::new("Shor 1997")).await.unwrap();

        associations::link(
            &pool,
            Association::AlgorithmPublication,
            &alg.id.to_string(),
            &publication.id.to_string(),
        )
        .await
        .unwrap();

        let page = find_algorithms(&pool, publication.id, &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.content[0].id, alg.id);

        delete(&pool, publication.id).await.unwrap();
        let linked: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM algorithm_publications")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(linked, 0);
    }
}
