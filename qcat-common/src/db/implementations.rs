//! Implementation persistence
//!
//! Implementations are filed under the algorithm they implement. Every
//! nested operation first checks that the implementation really belongs to
//! the algorithm in the request path.

use super::associations::{self, Association};
use super::retry::{retry_on_lock, LOCK_WAIT};
use super::{algorithms, ensure_exists, tags};
use crate::models::{Implementation, ImplementationInput, ImplementationKind, Tag};
use crate::pagination::{Page, PageRequest};
use crate::uuid_utils;
use crate::{Error, Result};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;

pub fn map_implementation(row: &SqliteRow) -> Result<Implementation> {
    let id: String = row.try_get("id")?;
    let algorithm_id: String = row.try_get("implemented_algorithm_id")?;
    let kind: String = row.try_get("kind")?;

    Ok(Implementation {
        id: uuid_utils::parse_column("implementations.id", &id)?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        contributors: row.try_get("contributors")?,
        assumptions: row.try_get("assumptions")?,
        parameter: row.try_get("parameter")?,
        dependencies: row.try_get("dependencies")?,
        link: row.try_get("link")?,
        version: row.try_get("version")?,
        license: row.try_get("license")?,
        technology: row.try_get("technology")?,
        problem_statement: row.try_get("problem_statement")?,
        input_format: row.try_get("input_format")?,
        output_format: row.try_get("output_format")?,
        implemented_algorithm_id: uuid_utils::parse_column(
            "implementations.implemented_algorithm_id",
            &algorithm_id,
        )?,
        kind: crate::models::parse_stored("implementations.kind", &kind)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

async fn fetch_page(
    pool: &SqlitePool,
    algorithm_id: Option<Uuid>,
    request: &PageRequest,
) -> Result<Page<Implementation>> {
    let pattern = request.like_pattern();
    let algorithm_key = algorithm_id.map(|id| id.to_string());

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM implementations
        WHERE (?1 IS NULL OR implemented_algorithm_id = ?1)
          AND (?2 IS NULL OR name LIKE ?2 ESCAPE '\')
        "#,
    )
    .bind(algorithm_key.as_deref())
    .bind(pattern.as_deref())
    .fetch_one(pool)
    .await?;

    let pagination = request.pagination(total);
    let rows = sqlx::query(
        r#"
        SELECT * FROM implementations
        WHERE (?1 IS NULL OR implemented_algorithm_id = ?1)
          AND (?2 IS NULL OR name LIKE ?2 ESCAPE '\')
        ORDER BY rowid
        LIMIT ?3 OFFSET ?4
        "#,
    )
    .bind(algorithm_key.as_deref())
    .bind(pattern.as_deref())
    .bind(pagination.size)
    .bind(pagination.offset)
    .fetch_all(pool)
    .await?;

    let content = rows.iter().map(map_implementation).collect::<Result<Vec<_>>>()?;
    Ok(Page::new(content, pagination, total))
}

/// Every implementation in the catalog
pub async fn find_all(pool: &SqlitePool, request: &PageRequest) -> Result<Page<Implementation>> {
    fetch_page(pool, None, request).await
}

/// Implementations of one algorithm; NotFound if the algorithm is absent
pub async fn find_by_algorithm(
    pool: &SqlitePool,
    algorithm_id: Uuid,
    request: &PageRequest,
) -> Result<Page<Implementation>> {
    let mut conn = pool.acquire().await?;
    ensure_exists(&mut conn, "algorithms", "id", &algorithm_id.to_string(), "Algorithm").await?;
    drop(conn);

    fetch_page(pool, Some(algorithm_id), request).await
}

pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Implementation> {
    let mut conn = pool.acquire().await?;
    find_in(&mut conn, id).await
}

pub(crate) async fn find_in(conn: &mut SqliteConnection, id: Uuid) -> Result<Implementation> {
    let row = sqlx::query("SELECT * FROM implementations WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::not_found("Implementation", id))?;
    map_implementation(&row)
}

/// Fail with NotFound unless the implementation exists and implements the algorithm
pub async fn check_implementation_of_algorithm(
    pool: &SqlitePool,
    algorithm_id: Uuid,
    implementation_id: Uuid,
) -> Result<Implementation> {
    let mut conn = pool.acquire().await?;
    check_in(&mut conn, algorithm_id, implementation_id).await
}

pub(crate) async fn check_in(
    conn: &mut SqliteConnection,
    algorithm_id: Uuid,
    implementation_id: Uuid,
) -> Result<Implementation> {
    ensure_exists(conn, "algorithms", "id", &algorithm_id.to_string(), "Algorithm").await?;
    let implementation = find_in(conn, implementation_id).await?;
    if implementation.implemented_algorithm_id != algorithm_id {
        return Err(Error::NotFound(format!(
            "Implementation {} does not implement algorithm {}",
            implementation_id, algorithm_id
        )));
    }
    Ok(implementation)
}

/// Create an implementation of `algorithm_id`
///
/// When the input has no kind, a quantum or hybrid algorithm yields a
/// quantum implementation and a classic one a classic implementation.
pub async fn create(
    pool: &SqlitePool,
    algorithm_id: Uuid,
    input: &ImplementationInput,
) -> Result<Implementation> {
    retry_on_lock("implementations::create", LOCK_WAIT, || {
        create_once(pool, algorithm_id, input)
    })
    .await
}

async fn create_once(
    pool: &SqlitePool,
    algorithm_id: Uuid,
    input: &ImplementationInput,
) -> Result<Implementation> {
    input.validate()?;
    let input = input.normalized();
    let id = uuid_utils::generate();
    let now = Utc::now();

    let mut tx = pool.begin().await?;
    let algorithm = algorithms::find_in(&mut tx, algorithm_id).await?;
    let kind = input.kind.unwrap_or(if algorithm.kind.is_quantum() {
        ImplementationKind::Quantum
    } else {
        ImplementationKind::Classic
    });

    sqlx::query(
        r#"
        INSERT INTO implementations (
            id, name, description, contributors, assumptions, parameter,
            dependencies, link, version, license, technology, problem_statement,
            input_format, output_format, implemented_algorithm_id, kind,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(&input.name)
    .bind(&input.description)
    .bind(&input.contributors)
    .bind(&input.assumptions)
    .bind(&input.parameter)
    .bind(&input.dependencies)
    .bind(&input.link)
    .bind(&input.version)
    .bind(&input.license)
    .bind(&input.technology)
    .bind(&input.problem_statement)
    .bind(&input.input_format)
    .bind(&input.output_format)
    .bind(algorithm_id.to_string())
    .bind(kind.as_str())
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let created = find_in(&mut tx, id).await?;
    tx.commit().await?;

    info!(
        "Created {} implementation {} of algorithm {} ({})",
        kind, created.name, algorithm.name, id
    );
    Ok(created)
}

/// Overwrite scalar fields; an omitted kind keeps the stored one
pub async fn update(
    pool: &SqlitePool,
    algorithm_id: Uuid,
    implementation_id: Uuid,
    input: &ImplementationInput,
) -> Result<Implementation> {
    retry_on_lock("implementations::update", LOCK_WAIT, || {
        update_once(pool, algorithm_id, implementation_id, input)
    })
    .await
}

async fn update_once(
    pool: &SqlitePool,
    algorithm_id: Uuid,
    implementation_id: Uuid,
    input: &ImplementationInput,
) -> Result<Implementation> {
    input.validate()?;
    let input = input.normalized();

    let mut tx = pool.begin().await?;
    let current = check_in(&mut tx, algorithm_id, implementation_id).await?;
    let kind = input.kind.unwrap_or(current.kind);

    sqlx::query(
        r#"
        UPDATE implementations SET
            name = ?, description = ?, contributors = ?, assumptions = ?,
            parameter = ?, dependencies = ?, link = ?, version = ?, license = ?,
            technology = ?, problem_statement = ?, input_format = ?,
            output_format = ?, kind = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&input.name)
    .bind(&input.description)
    .bind(&input.contributors)
    .bind(&input.assumptions)
    .bind(&input.parameter)
    .bind(&input.dependencies)
    .bind(&input.link)
    .bind(&input.version)
    .bind(&input.license)
    .bind(&input.technology)
    .bind(&input.problem_statement)
    .bind(&input.input_format)
    .bind(&input.output_format)
    .bind(kind.as_str())
    .bind(Utc::now())
    .bind(implementation_id.to_string())
    .execute(&mut *tx)
    .await?;

    let updated = find_in(&mut tx, implementation_id).await?;
    tx.commit().await?;
    Ok(updated)
}

/// Delete an implementation with its packages, properties and link rows
pub async fn delete(pool: &SqlitePool, algorithm_id: Uuid, implementation_id: Uuid) -> Result<()> {
    retry_on_lock("implementations::delete", LOCK_WAIT, || {
        delete_once(pool, algorithm_id, implementation_id)
    })
    .await
}

async fn delete_once(pool: &SqlitePool, algorithm_id: Uuid, implementation_id: Uuid) -> Result<()> {
    let mut tx = pool.begin().await?;
    check_in(&mut tx, algorithm_id, implementation_id).await?;

    sqlx::query("DELETE FROM implementations WHERE id = ?")
        .bind(implementation_id.to_string())
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!("Deleted implementation {}", implementation_id);
    Ok(())
}

/// Link a tag by value, creating the tag when it does not exist yet
pub async fn link_tag(
    pool: &SqlitePool,
    algorithm_id: Uuid,
    implementation_id: Uuid,
    tag: &Tag,
) -> Result<Tag> {
    retry_on_lock("implementations::link_tag", LOCK_WAIT, || {
        link_tag_once(pool, algorithm_id, implementation_id, tag)
    })
    .await
}

async fn link_tag_once(
    pool: &SqlitePool,
    algorithm_id: Uuid,
    implementation_id: Uuid,
    tag: &Tag,
) -> Result<Tag> {
    let mut tx = pool.begin().await?;
    check_in(&mut tx, algorithm_id, implementation_id).await?;
    let tag = tags::ensure_tag(&mut tx, tag).await?;
    associations::link_in(
        &mut tx,
        Association::ImplementationTag,
        &implementation_id.to_string(),
        &tag.value,
    )
    .await?;
    tx.commit().await?;
    Ok(tag)
}

pub async fn unlink_tag(
    pool: &SqlitePool,
    algorithm_id: Uuid,
    implementation_id: Uuid,
    value: &str,
) -> Result<()> {
    check_implementation_of_algorithm(pool, algorithm_id, implementation_id).await?;
    associations::unlink(
        pool,
        Association::ImplementationTag,
        &implementation_id.to_string(),
        value,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_database;
    use crate::models::{
        AlgorithmInput, AlgorithmKind, QuantumAlgorithmDetails, QuantumComputationModel,
    };

    async fn classic_algorithm(pool: &SqlitePool, name: &str) -> Uuid {
        algorithms::create(pool, &AlgorithmInput::new(name, AlgorithmKind::Classic))
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_create_references_algorithm() {
        let pool = init_memory_database().await.unwrap();
        let alg = classic_algorithm(&pool, "alg1").await;

        let implementation = create(&pool, alg, &ImplementationInput::new("impl1"))
            .await
            .unwrap();
        assert_eq!(implementation.implemented_algorithm_id, alg);
        assert_eq!(implementation.kind, ImplementationKind::Classic);

        let err = algorithms::delete(&pool, alg).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_kind_defaults_from_quantum_algorithm() {
        let pool = init_memory_database().await.unwrap();
        let alg = algorithms::create(
            &pool,
            &AlgorithmInput::new(
                "QAOA",
                AlgorithmKind::Hybrid(QuantumAlgorithmDetails {
                    nisq_ready: true,
                    quantum_computation_model: QuantumComputationModel::GateBased,
                    speed_up: None,
                }),
            ),
        )
        .await
        .unwrap();

        let implementation = create(&pool, alg.id, &ImplementationInput::new("qaoa-qiskit"))
            .await
            .unwrap();
        assert_eq!(implementation.kind, ImplementationKind::Quantum);
    }

    #[tokio::test]
    async fn test_create_for_missing_algorithm_is_not_found() {
        let pool = init_memory_database().await.unwrap();
        let err = create(&pool, Uuid::new_v4(), &ImplementationInput::new("orphan"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_cross_algorithm_access_is_not_found() {
        let pool = init_memory_database().await.unwrap();
        let alg1 = classic_algorithm(&pool, "alg1").await;
        let alg2 = classic_algorithm(&pool, "alg2").await;
        let implementation = create(&pool, alg1, &ImplementationInput::new("impl1"))
            .await
            .unwrap();

        let err = check_implementation_of_algorithm(&pool, alg2, implementation.id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let err = delete(&pool, alg2, implementation.id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_by_algorithm() {
        let pool = init_memory_database().await.unwrap();
        let alg1 = classic_algorithm(&pool, "alg1").await;
        let alg2 = classic_algorithm(&pool, "alg2").await;
        create(&pool, alg1, &ImplementationInput::new("a")).await.unwrap();
        create(&pool, alg1, &ImplementationInput::new("b")).await.unwrap();
        create(&pool, alg2, &ImplementationInput::new("c")).await.unwrap();

        let page = find_by_algorithm(&pool, alg1, &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.page.total_elements, 2);

        let all = find_all(&pool, &PageRequest::default()).await.unwrap();
        assert_eq!(all.page.total_elements, 3);
    }

    #[tokio::test]
    async fn test_update_keeps_kind_when_omitted() {
        let pool = init_memory_database().await.unwrap();
        let alg = classic_algorithm(&pool, "alg1").await;
        let mut input = ImplementationInput::new("impl1");
        input.kind = Some(ImplementationKind::Quantum);
        let created = create(&pool, alg, &input).await.unwrap();

        let mut input = ImplementationInput::new("impl1 v2");
        input.version = Some("2.0".to_string());
        let updated = update(&pool, alg, created.id, &input).await.unwrap();
        assert_eq!(updated.kind, ImplementationKind::Quantum);
        assert_eq!(updated.version.as_deref(), Some("2.0"));
    }
}
