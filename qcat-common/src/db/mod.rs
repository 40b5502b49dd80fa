//! Database schema and per-aggregate service operations
//!
//! Every public operation takes the pool, resolves referenced entities
//! (NotFound), validates input (InvalidInput), checks reference constraints
//! (Conflict) and performs multi-statement mutations inside one transaction.

pub mod algorithms;
pub mod associations;
pub mod discussions;
pub mod implementations;
pub mod init;
pub mod lookups;
pub mod migrations;
pub mod packages;
pub mod patterns;
pub mod platforms;
pub mod problem_types;
pub mod properties;
pub mod publications;
pub mod relations;
pub mod retry;
pub mod tags;

pub use associations::Association;
pub use init::{init_database, init_memory_database};
pub use migrations::run_migrations;

use crate::pagination::{Page, PageRequest};
use crate::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{SqliteConnection, SqlitePool};

/// Fail with NotFound unless `table.key_column = key` exists
///
/// `table` and `key_column` are always compile-time constants.
pub(crate) async fn ensure_exists(
    conn: &mut SqliteConnection,
    table: &str,
    key_column: &str,
    key: &str,
    entity: &str,
) -> Result<()> {
    if exists(conn, table, key_column, key).await? {
        Ok(())
    } else {
        Err(Error::not_found(entity, key))
    }
}

pub(crate) async fn exists(
    conn: &mut SqliteConnection,
    table: &str,
    key_column: &str,
    key: &str,
) -> Result<bool> {
    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?)",
        table, key_column
    );
    let found: bool = sqlx::query_scalar(&sql)
        .bind(key)
        .fetch_one(&mut *conn)
        .await?;
    Ok(found)
}

/// Number of rows in `table` whose `column` equals `key`
pub(crate) async fn count_references(
    conn: &mut SqliteConnection,
    table: &str,
    column: &str,
    key: &str,
) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {} WHERE {} = ?", table, column);
    let count: i64 = sqlx::query_scalar(&sql)
        .bind(key)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

/// Paginated listing of a whole table, optionally filtered on `name`
pub(crate) async fn list_named<T>(
    pool: &SqlitePool,
    table: &str,
    request: &PageRequest,
    map: fn(&SqliteRow) -> Result<T>,
) -> Result<Page<T>> {
    list_named_by(pool, table, "name", request, map).await
}

/// Paginated listing of a whole table, optionally filtered on `column`
///
/// Ordered by insertion (rowid).
pub(crate) async fn list_named_by<T>(
    pool: &SqlitePool,
    table: &str,
    column: &str,
    request: &PageRequest,
    map: fn(&SqliteRow) -> Result<T>,
) -> Result<Page<T>> {
    let pattern = request.like_pattern();

    let count_sql = format!(
        r#"SELECT COUNT(*) FROM {} WHERE (?1 IS NULL OR {} LIKE ?1 ESCAPE '\')"#,
        table, column
    );
    let total: i64 = sqlx::query_scalar(&count_sql)
        .bind(pattern.as_deref())
        .fetch_one(pool)
        .await?;

    let pagination = request.pagination(total);
    let rows_sql = format!(
        r#"SELECT * FROM {} WHERE (?1 IS NULL OR {} LIKE ?1 ESCAPE '\')
           ORDER BY rowid LIMIT ?2 OFFSET ?3"#,
        table, column
    );
    let rows = sqlx::query(&rows_sql)
        .bind(pattern.as_deref())
        .bind(pagination.size)
        .bind(pagination.offset)
        .fetch_all(pool)
        .await?;

    let content = rows.iter().map(map).collect::<Result<Vec<_>>>()?;
    Ok(Page::new(content, pagination, total))
}

/// Translate constraint failures the explicit checks did not anticipate
pub(crate) fn map_constraint_error(err: sqlx::Error, context: &str) -> Error {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return Error::Conflict(format!("{} already exists", context));
        }
        if db_err.is_foreign_key_violation() {
            return Error::Conflict(format!("{} is still referenced", context));
        }
        if db_err.is_check_violation() {
            return Error::InvalidInput(format!("{} violates a schema constraint", context));
        }
    }
    Error::Database(err)
}
