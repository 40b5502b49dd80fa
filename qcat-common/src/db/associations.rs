//! Many-to-many links between catalog entities
//!
//! Each association is one join table. Both directions are answered by
//! querying that table, so a link is always visible from either side.
//! Linking is idempotent and so is unlinking: removing a link that does not
//! exist succeeds, provided both entities exist.

use super::ensure_exists;
use super::retry::{retry_on_lock, LOCK_WAIT};
use crate::pagination::{Page, PageRequest};
use crate::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

/// One end of an association
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct End {
    /// Entity table
    pub table: &'static str,
    /// Key column in the entity table
    pub key: &'static str,
    /// Column in the join table referencing `table.key`
    pub join_column: &'static str,
    /// Entity name used in NotFound messages
    pub entity: &'static str,
}

const ALGORITHM: (&str, &str, &str) = ("algorithms", "algorithm_id", "Algorithm");
const IMPLEMENTATION: (&str, &str, &str) =
    ("implementations", "implementation_id", "Implementation");
const SOFTWARE_PLATFORM: (&str, &str, &str) =
    ("software_platforms", "software_platform_id", "Software platform");
const CLOUD_SERVICE: (&str, &str, &str) = ("cloud_services", "cloud_service_id", "Cloud service");
const COMPUTE_RESOURCE: (&str, &str, &str) =
    ("compute_resources", "compute_resource_id", "Compute resource");
const PUBLICATION: (&str, &str, &str) = ("publications", "publication_id", "Publication");
const PROBLEM_TYPE: (&str, &str, &str) = ("problem_types", "problem_type_id", "Problem type");
const APPLICATION_AREA: (&str, &str, &str) =
    ("application_areas", "application_area_id", "Application area");
const LEARNING_METHOD: (&str, &str, &str) =
    ("learning_methods", "learning_method_id", "Learning method");

const fn by_id((table, join_column, entity): (&'static str, &'static str, &'static str)) -> End {
    End {
        table,
        key: "id",
        join_column,
        entity,
    }
}

const TAG: End = End {
    table: "tags",
    key: "value",
    join_column: "tag_value",
    entity: "Tag",
};

/// Every many-to-many relationship in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Association {
    AlgorithmTag,
    AlgorithmPublication,
    AlgorithmProblemType,
    AlgorithmApplicationArea,
    AlgorithmLearningMethod,
    ImplementationTag,
    ImplementationPublication,
    ImplementationSoftwarePlatform,
    SoftwarePlatformComputeResource,
    SoftwarePlatformCloudService,
    CloudServiceComputeResource,
}

impl Association {
    pub fn join_table(&self) -> &'static str {
        match self {
            Self::AlgorithmTag => "algorithm_tags",
            Self::AlgorithmPublication => "algorithm_publications",
            Self::AlgorithmProblemType => "algorithm_problem_types",
            Self::AlgorithmApplicationArea => "algorithm_application_areas",
            Self::AlgorithmLearningMethod => "algorithm_learning_methods",
            Self::ImplementationTag => "implementation_tags",
            Self::ImplementationPublication => "implementation_publications",
            Self::ImplementationSoftwarePlatform => "implementation_software_platforms",
            Self::SoftwarePlatformComputeResource => "software_platform_compute_resources",
            Self::SoftwarePlatformCloudService => "software_platform_cloud_services",
            Self::CloudServiceComputeResource => "cloud_service_compute_resources",
        }
    }

    /// The side named first in the join table
    pub fn left(&self) -> End {
        match self {
            Self::AlgorithmTag
            | Self::AlgorithmPublication
            | Self::AlgorithmProblemType
            | Self::AlgorithmApplicationArea
            | Self::AlgorithmLearningMethod => by_id(ALGORITHM),
            Self::ImplementationTag
            | Self::ImplementationPublication
            | Self::ImplementationSoftwarePlatform => by_id(IMPLEMENTATION),
            Self::SoftwarePlatformComputeResource | Self::SoftwarePlatformCloudService => {
                by_id(SOFTWARE_PLATFORM)
            }
            Self::CloudServiceComputeResource => by_id(CLOUD_SERVICE),
        }
    }

    pub fn right(&self) -> End {
        match self {
            Self::AlgorithmTag | Self::ImplementationTag => TAG,
            Self::AlgorithmPublication | Self::ImplementationPublication => by_id(PUBLICATION),
            Self::AlgorithmProblemType => by_id(PROBLEM_TYPE),
            Self::AlgorithmApplicationArea => by_id(APPLICATION_AREA),
            Self::AlgorithmLearningMethod => by_id(LEARNING_METHOD),
            Self::ImplementationSoftwarePlatform => by_id(SOFTWARE_PLATFORM),
            Self::SoftwarePlatformComputeResource | Self::CloudServiceComputeResource => {
                by_id(COMPUTE_RESOURCE)
            }
            Self::SoftwarePlatformCloudService => by_id(CLOUD_SERVICE),
        }
    }
}

/// Which end the given key belongs to when listing the other end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Key is on the left; list right-hand entities
    Forward,
    /// Key is on the right; list left-hand entities
    Reverse,
}

impl Direction {
    fn ends(&self, association: Association) -> (End, End) {
        match self {
            Self::Forward => (association.left(), association.right()),
            Self::Reverse => (association.right(), association.left()),
        }
    }
}

/// Link two existing entities
pub async fn link(
    pool: &SqlitePool,
    association: Association,
    left_key: &str,
    right_key: &str,
) -> Result<()> {
    retry_on_lock("associations::link", LOCK_WAIT, || {
        link_once(pool, association, left_key, right_key)
    })
    .await
}

async fn link_once(
    pool: &SqlitePool,
    association: Association,
    left_key: &str,
    right_key: &str,
) -> Result<()> {
    let mut tx = pool.begin().await?;
    link_in(&mut tx, association, left_key, right_key).await?;
    tx.commit().await?;
    Ok(())
}

/// Link inside a caller-owned transaction
pub(crate) async fn link_in(
    conn: &mut SqliteConnection,
    association: Association,
    left_key: &str,
    right_key: &str,
) -> Result<()> {
    ensure_ends_exist(conn, association, left_key, right_key).await?;

    let sql = format!(
        "INSERT OR IGNORE INTO {} ({}, {}) VALUES (?, ?)",
        association.join_table(),
        association.left().join_column,
        association.right().join_column
    );
    let result = sqlx::query(&sql)
        .bind(left_key)
        .bind(right_key)
        .execute(&mut *conn)
        .await?;

    debug!(
        "Linked {} {} <-> {} {} (new: {})",
        association.left().entity,
        left_key,
        association.right().entity,
        right_key,
        result.rows_affected() > 0
    );
    Ok(())
}

/// Remove a link; removing an absent link is a no-op
pub async fn unlink(
    pool: &SqlitePool,
    association: Association,
    left_key: &str,
    right_key: &str,
) -> Result<()> {
    retry_on_lock("associations::unlink", LOCK_WAIT, || {
        unlink_once(pool, association, left_key, right_key)
    })
    .await
}

async fn unlink_once(
    pool: &SqlitePool,
    association: Association,
    left_key: &str,
    right_key: &str,
) -> Result<()> {
    let mut tx = pool.begin().await?;
    ensure_ends_exist(&mut tx, association, left_key, right_key).await?;

    let sql = format!(
        "DELETE FROM {} WHERE {} = ? AND {} = ?",
        association.join_table(),
        association.left().join_column,
        association.right().join_column
    );
    let result = sqlx::query(&sql)
        .bind(left_key)
        .bind(right_key)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    debug!(
        "Unlinked {} {} <-> {} {} (removed: {})",
        association.left().entity,
        left_key,
        association.right().entity,
        right_key,
        result.rows_affected() > 0
    );
    Ok(())
}

pub async fn is_linked(
    pool: &SqlitePool,
    association: Association,
    left_key: &str,
    right_key: &str,
) -> Result<bool> {
    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ? AND {} = ?)",
        association.join_table(),
        association.left().join_column,
        association.right().join_column
    );
    let linked: bool = sqlx::query_scalar(&sql)
        .bind(left_key)
        .bind(right_key)
        .fetch_one(pool)
        .await?;
    Ok(linked)
}

/// Page of entities linked to `key`, in link order
///
/// Fails with NotFound when `key` itself does not exist.
pub async fn fetch_linked<T>(
    pool: &SqlitePool,
    association: Association,
    direction: Direction,
    key: &str,
    request: &PageRequest,
    map: fn(&SqliteRow) -> Result<T>,
) -> Result<Page<T>> {
    let (from, to) = direction.ends(association);
    let mut conn = pool.acquire().await?;
    ensure_exists(&mut conn, from.table, from.key, key, from.entity).await?;

    let count_sql = format!(
        "SELECT COUNT(*) FROM {} WHERE {} = ?",
        association.join_table(),
        from.join_column
    );
    let total: i64 = sqlx::query_scalar(&count_sql)
        .bind(key)
        .fetch_one(&mut *conn)
        .await?;

    let pagination = request.pagination(total);
    let rows_sql = format!(
        r#"
        SELECT e.* FROM {entities} e
        JOIN {join} j ON j.{to_col} = e.{to_key}
        WHERE j.{from_col} = ?
        ORDER BY j.rowid
        LIMIT ? OFFSET ?
        "#,
        entities = to.table,
        join = association.join_table(),
        to_col = to.join_column,
        to_key = to.key,
        from_col = from.join_column,
    );
    let rows = sqlx::query(&rows_sql)
        .bind(key)
        .bind(pagination.size)
        .bind(pagination.offset)
        .fetch_all(&mut *conn)
        .await?;

    let content = rows.iter().map(map).collect::<Result<Vec<_>>>()?;
    Ok(Page::new(content, pagination, total))
}

async fn ensure_ends_exist(
    conn: &mut SqliteConnection,
    association: Association,
    left_key: &str,
    right_key: &str,
) -> Result<()> {
    let left = association.left();
    let right = association.right();
    ensure_exists(conn, left.table, left.key, left_key, left.entity).await?;
    ensure_exists(conn, right.table, right.key, right_key, right.entity).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_database;
    use crate::Error;
    use sqlx::Row;

    async fn insert_named(pool: &SqlitePool, table: &str, id: &str, name: &str) {
        sqlx::query(&format!("INSERT INTO {} (id, name) VALUES (?, ?)", table))
            .bind(id)
            .bind(name)
            .execute(pool)
            .await
            .unwrap();
    }

    fn map_name(row: &SqliteRow) -> Result<String> {
        Ok(row.get("name"))
    }

    #[tokio::test]
    async fn test_link_is_visible_from_both_sides() {
        let pool = init_memory_database().await.unwrap();
        insert_named(&pool, "software_platforms", "sp1", "Qiskit").await;
        insert_named(&pool, "cloud_services", "cs1", "IBM Quantum").await;

        let assoc = Association::SoftwarePlatformCloudService;
        link(&pool, assoc, "sp1", "cs1").await.unwrap();
        // Linking twice is harmless
        link(&pool, assoc, "sp1", "cs1").await.unwrap();

        let request = PageRequest::default();
        let services = fetch_linked(&pool, assoc, Direction::Forward, "sp1", &request, map_name)
            .await
            .unwrap();
        assert_eq!(services.content, vec!["IBM Quantum"]);
        assert_eq!(services.page.total_elements, 1);

        let platforms = fetch_linked(&pool, assoc, Direction::Reverse, "cs1", &request, map_name)
            .await
            .unwrap();
        assert_eq!(platforms.content, vec!["Qiskit"]);
    }

    #[tokio::test]
    async fn test_unlink_absent_link_is_noop() {
        let pool = init_memory_database().await.unwrap();
        insert_named(&pool, "software_platforms", "sp1", "Qiskit").await;
        sqlx::query(
            "INSERT INTO compute_resources (id, name, kind) VALUES ('cr1', 'ibmq_lima', 'QPU')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let assoc = Association::SoftwarePlatformComputeResource;
        unlink(&pool, assoc, "sp1", "cr1").await.unwrap();
        assert!(!is_linked(&pool, assoc, "sp1", "cr1").await.unwrap());
    }

    #[tokio::test]
    async fn test_link_requires_both_entities() {
        let pool = init_memory_database().await.unwrap();
        insert_named(&pool, "software_platforms", "sp1", "Qiskit").await;

        let err = link(&pool, Association::SoftwarePlatformCloudService, "sp1", "missing")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let err = fetch_linked(
            &pool,
            Association::SoftwarePlatformCloudService,
            Direction::Reverse,
            "missing",
            &PageRequest::default(),
            map_name,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
