//! Algorithm persistence
//!
//! The specialization (`computationModel`) is stored in a discriminator
//! column; quantum-only fields are NULL for classic algorithms.

use super::associations::{self, Association};
use super::retry::{retry_on_lock, LOCK_WAIT};
use super::{ensure_exists, tags};
use crate::models::{Algorithm, AlgorithmInput, AlgorithmKind, Tag};
use crate::pagination::{Page, PageRequest};
use crate::uuid_utils;
use crate::{Error, Result};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::{info, warn};
use uuid::Uuid;

pub fn map_algorithm(row: &SqliteRow) -> Result<Algorithm> {
    let id: String = row.try_get("id")?;
    let computation_model: String = row.try_get("computation_model")?;

    Ok(Algorithm {
        id: uuid_utils::parse_column("algorithms.id", &id)?,
        name: row.try_get("name")?,
        acronym: row.try_get("acronym")?,
        intent: row.try_get("intent")?,
        problem: row.try_get("problem")?,
        input_format: row.try_get("input_format")?,
        algo_parameter: row.try_get("algo_parameter")?,
        output_format: row.try_get("output_format")?,
        solution: row.try_get("solution")?,
        assumptions: row.try_get("assumptions")?,
        kind: AlgorithmKind::from_columns(
            &computation_model,
            row.try_get("nisq_ready")?,
            row.try_get("quantum_computation_model")?,
            row.try_get("speed_up")?,
        )?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Column values of the specialization
struct KindColumns {
    computation_model: &'static str,
    nisq_ready: Option<bool>,
    quantum_computation_model: Option<&'static str>,
    speed_up: Option<String>,
}

impl From<&AlgorithmKind> for KindColumns {
    fn from(kind: &AlgorithmKind) -> Self {
        let details = kind.quantum_details();
        Self {
            computation_model: kind.computation_model(),
            nisq_ready: details.map(|d| d.nisq_ready),
            quantum_computation_model: details.map(|d| d.quantum_computation_model.as_str()),
            speed_up: details.and_then(|d| d.speed_up.clone()),
        }
    }
}

/// Page of algorithms, optionally filtered by name or acronym
pub async fn find_all(pool: &SqlitePool, request: &PageRequest) -> Result<Page<Algorithm>> {
    let pattern = request.like_pattern();

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM algorithms
        WHERE (?1 IS NULL OR name LIKE ?1 ESCAPE '\' OR acronym LIKE ?1 ESCAPE '\')
        "#,
    )
    .bind(pattern.as_deref())
    .fetch_one(pool)
    .await?;

    let pagination = request.pagination(total);
    let rows = sqlx::query(
        r#"
        SELECT * FROM algorithms
        WHERE (?1 IS NULL OR name LIKE ?1 ESCAPE '\' OR acronym LIKE ?1 ESCAPE '\')
        ORDER BY rowid
        LIMIT ?2 OFFSET ?3
        "#,
    )
    .bind(pattern.as_deref())
    .bind(pagination.size)
    .bind(pagination.offset)
    .fetch_all(pool)
    .await?;

    let content = rows.iter().map(map_algorithm).collect::<Result<Vec<_>>>()?;
    Ok(Page::new(content, pagination, total))
}

pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Algorithm> {
    let mut conn = pool.acquire().await?;
    find_in(&mut conn, id).await
}

pub(crate) async fn find_in(conn: &mut SqliteConnection, id: Uuid) -> Result<Algorithm> {
    let row = sqlx::query("SELECT * FROM algorithms WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::not_found("Algorithm", id))?;
    map_algorithm(&row)
}

pub async fn create(pool: &SqlitePool, input: &AlgorithmInput) -> Result<Algorithm> {
    input.validate()?;
    let input = input.normalized();
    let id = uuid_utils::generate();
    let now = Utc::now();
    let kind = KindColumns::from(&input.kind);

    sqlx::query(
        r#"
        INSERT INTO algorithms (
            id, name, acronym, intent, problem, input_format, algo_parameter,
            output_format, solution, assumptions, computation_model, nisq_ready,
            quantum_computation_model, speed_up, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(&input.name)
    .bind(&input.acronym)
    .bind(&input.intent)
    .bind(&input.problem)
    .bind(&input.input_format)
    .bind(&input.algo_parameter)
    .bind(&input.output_format)
    .bind(&input.solution)
    .bind(&input.assumptions)
    .bind(kind.computation_model)
    .bind(kind.nisq_ready)
    .bind(kind.quantum_computation_model)
    .bind(&kind.speed_up)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    info!("Created {} algorithm {} ({})", kind.computation_model, input.name, id);
    find_by_id(pool, id).await
}

/// Overwrite scalar fields and the specialization; links are untouched
pub async fn update(pool: &SqlitePool, id: Uuid, input: &AlgorithmInput) -> Result<Algorithm> {
    input.validate()?;
    let input = input.normalized();
    let kind = KindColumns::from(&input.kind);

    let result = sqlx::query(
        r#"
        UPDATE algorithms SET
            name = ?, acronym = ?, intent = ?, problem = ?, input_format = ?,
            algo_parameter = ?, output_format = ?, solution = ?, assumptions = ?,
            computation_model = ?, nisq_ready = ?, quantum_computation_model = ?,
            speed_up = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&input.name)
    .bind(&input.acronym)
    .bind(&input.intent)
    .bind(&input.problem)
    .bind(&input.input_format)
    .bind(&input.algo_parameter)
    .bind(&input.output_format)
    .bind(&input.solution)
    .bind(&input.assumptions)
    .bind(kind.computation_model)
    .bind(kind.nisq_ready)
    .bind(kind.quantum_computation_model)
    .bind(&kind.speed_up)
    .bind(Utc::now())
    .bind(id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::not_found("Algorithm", id));
    }
    find_by_id(pool, id).await
}

/// Delete an algorithm and everything it owns
///
/// Refused while implementations still reference it. Relations, pattern
/// relations, properties and link rows cascade; linked tags, publications,
/// problem types, application areas and learning methods survive.
pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<()> {
    retry_on_lock("algorithms::delete", LOCK_WAIT, || delete_once(pool, id)).await
}

async fn delete_once(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let key = id.to_string();
    let mut tx = pool.begin().await?;
    ensure_exists(&mut tx, "algorithms", "id", &key, "Algorithm").await?;

    let implementations =
        super::count_references(&mut tx, "implementations", "implemented_algorithm_id", &key)
            .await?;
    if implementations > 0 {
        warn!(
            "Refusing to delete algorithm {}: {} implementation(s) reference it",
            id, implementations
        );
        return Err(Error::Conflict(format!(
            "Algorithm {} is still implemented by {} implementation(s)",
            id, implementations
        )));
    }

    sqlx::query("DELETE FROM algorithms WHERE id = ?")
        .bind(&key)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!("Deleted algorithm {}", id);
    Ok(())
}

/// Link a tag by value, creating the tag when it does not exist yet
pub async fn link_tag(pool: &SqlitePool, algorithm_id: Uuid, tag: &Tag) -> Result<Tag> {
    retry_on_lock("algorithms::link_tag", LOCK_WAIT, || {
        link_tag_once(pool, algorithm_id, tag)
    })
    .await
}

async fn link_tag_once(pool: &SqlitePool, algorithm_id: Uuid, tag: &Tag) -> Result<Tag> {
    let mut tx = pool.begin().await?;
    let tag = tags::ensure_tag(&mut tx, tag).await?;
    associations::link_in(
        &mut tx,
        Association::AlgorithmTag,
        &algorithm_id.to_string(),
        &tag.value,
    )
    .await?;
    tx.commit().await?;
    Ok(tag)
}

pub async fn unlink_tag(pool: &SqlitePool, algorithm_id: Uuid, value: &str) -> Result<()> {
    associations::unlink(pool, Association::AlgorithmTag, &algorithm_id.to_string(), value).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_database;
    use crate::models::{QuantumAlgorithmDetails, QuantumComputationModel};

    fn shor() -> AlgorithmInput {
        AlgorithmInput::new(
            "Shor",
            AlgorithmKind::Quantum(QuantumAlgorithmDetails {
                nisq_ready: false,
                quantum_computation_model: QuantumComputationModel::GateBased,
                speed_up: Some("superpolynomial".to_string()),
            }),
        )
    }

    #[tokio::test]
    async fn test_create_and_find_quantum_algorithm() {
        let pool = init_memory_database().await.unwrap();

        let created = create(&pool, &shor()).await.unwrap();
        let found = find_by_id(&pool, created.id).await.unwrap();

        assert_eq!(found, created);
        assert_eq!(found.kind.computation_model(), "QUANTUM");
        assert_eq!(
            found.kind.quantum_details().unwrap().speed_up.as_deref(),
            Some("superpolynomial")
        );
    }

    #[tokio::test]
    async fn test_update_switches_specialization() {
        let pool = init_memory_database().await.unwrap();
        let created = create(&pool, &shor()).await.unwrap();

        let mut input = AlgorithmInput::new("Shor (classic part)", AlgorithmKind::Classic);
        input.acronym = Some("SCP".to_string());
        let updated = update(&pool, created.id, &input).await.unwrap();

        assert_eq!(updated.kind, AlgorithmKind::Classic);
        assert_eq!(updated.acronym.as_deref(), Some("SCP"));
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let pool = init_memory_database().await.unwrap();
        let err = update(&pool, Uuid::new_v4(), &shor()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_search_matches_name_or_acronym() {
        let pool = init_memory_database().await.unwrap();
        create(&pool, &shor()).await.unwrap();
        let mut grover = AlgorithmInput::new("Grover search", AlgorithmKind::Classic);
        grover.acronym = Some("GSA".to_string());
        create(&pool, &grover).await.unwrap();

        let page = find_all(&pool, &PageRequest::default().with_search("gsa"))
            .await
            .unwrap();
        assert_eq!(page.page.total_elements, 1);
        assert_eq!(page.content[0].name, "Grover search");

        let page = find_all(&pool, &PageRequest::default().with_search("s"))
            .await
            .unwrap();
        assert_eq!(page.page.total_elements, 2);
    }

    #[tokio::test]
    async fn test_link_tag_creates_tag() {
        let pool = init_memory_database().await.unwrap();
        let alg = create(&pool, &shor()).await.unwrap();

        link_tag(&pool, alg.id, &Tag::new("factoring", Some("math")))
            .await
            .unwrap();

        let tag = tags::find_by_value(&pool, "factoring").await.unwrap();
        assert_eq!(tag.category.as_deref(), Some("math"));

        unlink_tag(&pool, alg.id, "factoring").await.unwrap();
        // Tag survives the unlink
        assert!(tags::find_by_value(&pool, "factoring").await.is_ok());
    }
}
