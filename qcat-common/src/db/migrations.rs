//! Database schema migrations
//!
//! Versioned, idempotent schema migrations tracked in `schema_version`.
//!
//! # Migration Guidelines
//!
//! 1. **Never modify existing migrations** - databases created by older builds depend on them
//! 2. **Always add new migrations** - one function per schema change, bump `CURRENT_SCHEMA_VERSION`
//! 3. **Stay idempotent** - `IF NOT EXISTS` everywhere, safe to re-run
//! 4. **Use ALTER TABLE** - prefer it over DROP/CREATE to preserve data

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Catalog tables, in dependency order
///
/// Ownership is expressed with foreign keys: owned rows use
/// `ON DELETE CASCADE`, references that must block deletion use
/// `ON DELETE RESTRICT`. Many-to-many relationships are stored once, in a
/// join table, and read from either side.
const SCHEMA_V1: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS algorithms (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        acronym TEXT,
        intent TEXT,
        problem TEXT,
        input_format TEXT,
        algo_parameter TEXT,
        output_format TEXT,
        solution TEXT,
        assumptions TEXT,
        computation_model TEXT NOT NULL
            CHECK (computation_model IN ('CLASSIC', 'QUANTUM', 'HYBRID')),
        nisq_ready INTEGER,
        quantum_computation_model TEXT,
        speed_up TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        CHECK (computation_model = 'CLASSIC' OR quantum_computation_model IS NOT NULL)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS implementations (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT,
        contributors TEXT,
        assumptions TEXT,
        parameter TEXT,
        dependencies TEXT,
        link TEXT,
        version TEXT,
        license TEXT,
        technology TEXT,
        problem_statement TEXT,
        input_format TEXT,
        output_format TEXT,
        implemented_algorithm_id TEXT NOT NULL
            REFERENCES algorithms(id) ON DELETE RESTRICT,
        kind TEXT NOT NULL CHECK (kind IN ('CLASSIC', 'QUANTUM')),
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS algo_relation_types (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        inverse_type_name TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS algorithm_relations (
        id TEXT PRIMARY KEY,
        source_algorithm_id TEXT NOT NULL REFERENCES algorithms(id) ON DELETE CASCADE,
        target_algorithm_id TEXT NOT NULL REFERENCES algorithms(id) ON DELETE CASCADE,
        algo_relation_type_id TEXT NOT NULL
            REFERENCES algo_relation_types(id) ON DELETE RESTRICT,
        description TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS pattern_relation_types (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS pattern_relations (
        id TEXT PRIMARY KEY,
        algorithm_id TEXT NOT NULL REFERENCES algorithms(id) ON DELETE CASCADE,
        pattern TEXT NOT NULL,
        pattern_relation_type_id TEXT NOT NULL
            REFERENCES pattern_relation_types(id) ON DELETE RESTRICT,
        description TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS compute_resources (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        vendor TEXT,
        technology TEXT,
        quantum_computation_model TEXT,
        kind TEXT NOT NULL CHECK (kind IN ('QPU', 'SIMULATOR'))
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS compute_resource_property_types (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        datatype TEXT NOT NULL CHECK (datatype IN ('INTEGER', 'FLOAT', 'STRING', 'BOOLEAN')),
        description TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS compute_resource_properties (
        id TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        type_id TEXT NOT NULL
            REFERENCES compute_resource_property_types(id) ON DELETE RESTRICT,
        algorithm_id TEXT REFERENCES algorithms(id) ON DELETE CASCADE,
        implementation_id TEXT REFERENCES implementations(id) ON DELETE CASCADE,
        compute_resource_id TEXT REFERENCES compute_resources(id) ON DELETE CASCADE,
        CHECK ((algorithm_id IS NOT NULL)
             + (implementation_id IS NOT NULL)
             + (compute_resource_id IS NOT NULL) = 1)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS problem_types (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        parent_problem_type_id TEXT REFERENCES problem_types(id) ON DELETE SET NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS application_areas (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS learning_methods (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tags (
        value TEXT PRIMARY KEY,
        category TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS publications (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        doi TEXT,
        url TEXT,
        authors TEXT NOT NULL DEFAULT '[]'
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS software_platforms (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        link TEXT,
        license TEXT,
        version TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS cloud_services (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        provider TEXT,
        url TEXT,
        description TEXT,
        cost_model TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS discussion_topics (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT,
        status TEXT NOT NULL CHECK (status IN ('OPEN', 'CLOSED')),
        date TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS discussion_comments (
        id TEXT PRIMARY KEY,
        topic_id TEXT NOT NULL REFERENCES discussion_topics(id) ON DELETE CASCADE,
        text TEXT NOT NULL,
        date TEXT NOT NULL,
        reply_to_id TEXT REFERENCES discussion_comments(id) ON DELETE SET NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tosca_applications (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        tosca_id TEXT,
        tosca_namespace TEXT,
        tosca_name TEXT,
        wine_url TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS implementation_packages (
        id TEXT PRIMARY KEY,
        implementation_id TEXT NOT NULL REFERENCES implementations(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        description TEXT,
        package_type TEXT NOT NULL CHECK (package_type IN ('FILE', 'TOSCA', 'FUNCTION')),
        file_name TEXT,
        mime_type TEXT,
        file_url TEXT,
        tosca_application_id TEXT REFERENCES tosca_applications(id) ON DELETE RESTRICT,
        endpoint TEXT
    )
    "#,
    // Join tables
    r#"
    CREATE TABLE IF NOT EXISTS algorithm_tags (
        algorithm_id TEXT NOT NULL REFERENCES algorithms(id) ON DELETE CASCADE,
        tag_value TEXT NOT NULL REFERENCES tags(value) ON DELETE CASCADE,
        PRIMARY KEY (algorithm_id, tag_value)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS algorithm_publications (
        algorithm_id TEXT NOT NULL REFERENCES algorithms(id) ON DELETE CASCADE,
        publication_id TEXT NOT NULL REFERENCES publications(id) ON DELETE CASCADE,
        PRIMARY KEY (algorithm_id, publication_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS algorithm_problem_types (
        algorithm_id TEXT NOT NULL REFERENCES algorithms(id) ON DELETE CASCADE,
        problem_type_id TEXT NOT NULL REFERENCES problem_types(id) ON DELETE CASCADE,
        PRIMARY KEY (algorithm_id, problem_type_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS algorithm_application_areas (
        algorithm_id TEXT NOT NULL REFERENCES algorithms(id) ON DELETE CASCADE,
        application_area_id TEXT NOT NULL REFERENCES application_areas(id) ON DELETE CASCADE,
        PRIMARY KEY (algorithm_id, application_area_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS algorithm_learning_methods (
        algorithm_id TEXT NOT NULL REFERENCES algorithms(id) ON DELETE CASCADE,
        learning_method_id TEXT NOT NULL REFERENCES learning_methods(id) ON DELETE CASCADE,
        PRIMARY KEY (algorithm_id, learning_method_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS implementation_tags (
        implementation_id TEXT NOT NULL REFERENCES implementations(id) ON DELETE CASCADE,
        tag_value TEXT NOT NULL REFERENCES tags(value) ON DELETE CASCADE,
        PRIMARY KEY (implementation_id, tag_value)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS implementation_publications (
        implementation_id TEXT NOT NULL REFERENCES implementations(id) ON DELETE CASCADE,
        publication_id TEXT NOT NULL REFERENCES publications(id) ON DELETE CASCADE,
        PRIMARY KEY (implementation_id, publication_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS implementation_software_platforms (
        implementation_id TEXT NOT NULL REFERENCES implementations(id) ON DELETE CASCADE,
        software_platform_id TEXT NOT NULL REFERENCES software_platforms(id) ON DELETE CASCADE,
        PRIMARY KEY (implementation_id, software_platform_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS software_platform_compute_resources (
        software_platform_id TEXT NOT NULL REFERENCES software_platforms(id) ON DELETE CASCADE,
        compute_resource_id TEXT NOT NULL REFERENCES compute_resources(id) ON DELETE CASCADE,
        PRIMARY KEY (software_platform_id, compute_resource_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS software_platform_cloud_services (
        software_platform_id TEXT NOT NULL REFERENCES software_platforms(id) ON DELETE CASCADE,
        cloud_service_id TEXT NOT NULL REFERENCES cloud_services(id) ON DELETE CASCADE,
        PRIMARY KEY (software_platform_id, cloud_service_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS cloud_service_compute_resources (
        cloud_service_id TEXT NOT NULL REFERENCES cloud_services(id) ON DELETE CASCADE,
        compute_resource_id TEXT NOT NULL REFERENCES compute_resources(id) ON DELETE CASCADE,
        PRIMARY KEY (cloud_service_id, compute_resource_id)
    )
    "#,
];

/// Indexes on foreign-key columns and on the second column of each join table
const SCHEMA_V2: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_implementations_algorithm ON implementations(implemented_algorithm_id)",
    "CREATE INDEX IF NOT EXISTS idx_algorithm_relations_source ON algorithm_relations(source_algorithm_id)",
    "CREATE INDEX IF NOT EXISTS idx_algorithm_relations_target ON algorithm_relations(target_algorithm_id)",
    "CREATE INDEX IF NOT EXISTS idx_algorithm_relations_type ON algorithm_relations(algo_relation_type_id)",
    "CREATE INDEX IF NOT EXISTS idx_pattern_relations_algorithm ON pattern_relations(algorithm_id)",
    "CREATE INDEX IF NOT EXISTS idx_pattern_relations_type ON pattern_relations(pattern_relation_type_id)",
    "CREATE INDEX IF NOT EXISTS idx_properties_type ON compute_resource_properties(type_id)",
    "CREATE INDEX IF NOT EXISTS idx_properties_algorithm ON compute_resource_properties(algorithm_id)",
    "CREATE INDEX IF NOT EXISTS idx_properties_implementation ON compute_resource_properties(implementation_id)",
    "CREATE INDEX IF NOT EXISTS idx_properties_compute_resource ON compute_resource_properties(compute_resource_id)",
    "CREATE INDEX IF NOT EXISTS idx_problem_types_parent ON problem_types(parent_problem_type_id)",
    "CREATE INDEX IF NOT EXISTS idx_comments_topic ON discussion_comments(topic_id)",
    "CREATE INDEX IF NOT EXISTS idx_comments_reply_to ON discussion_comments(reply_to_id)",
    "CREATE INDEX IF NOT EXISTS idx_packages_implementation ON implementation_packages(implementation_id)",
    "CREATE INDEX IF NOT EXISTS idx_packages_tosca ON implementation_packages(tosca_application_id)",
    "CREATE INDEX IF NOT EXISTS idx_algorithm_tags_tag ON algorithm_tags(tag_value)",
    "CREATE INDEX IF NOT EXISTS idx_algorithm_publications_pub ON algorithm_publications(publication_id)",
    "CREATE INDEX IF NOT EXISTS idx_algorithm_problem_types_pt ON algorithm_problem_types(problem_type_id)",
    "CREATE INDEX IF NOT EXISTS idx_algorithm_application_areas_aa ON algorithm_application_areas(application_area_id)",
    "CREATE INDEX IF NOT EXISTS idx_algorithm_learning_methods_lm ON algorithm_learning_methods(learning_method_id)",
    "CREATE INDEX IF NOT EXISTS idx_implementation_tags_tag ON implementation_tags(tag_value)",
    "CREATE INDEX IF NOT EXISTS idx_implementation_publications_pub ON implementation_publications(publication_id)",
    "CREATE INDEX IF NOT EXISTS idx_implementation_platforms_sp ON implementation_software_platforms(software_platform_id)",
    "CREATE INDEX IF NOT EXISTS idx_platform_resources_cr ON software_platform_compute_resources(compute_resource_id)",
    "CREATE INDEX IF NOT EXISTS idx_platform_services_cs ON software_platform_cloud_services(cloud_service_id)",
    "CREATE INDEX IF NOT EXISTS idx_service_resources_cr ON cloud_service_compute_resources(compute_resource_id)",
];

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Get current schema version from database
///
/// Returns 0 if schema_version has no rows
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

/// Apply one migration's statements and record its version atomically
async fn apply(pool: &SqlitePool, version: i32, statements: &[&str]) -> Result<()> {
    let mut tx = pool.begin().await?;

    for statement in statements {
        sqlx::query(statement).execute(&mut *tx).await?;
    }

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        warn!("This may indicate a downgrade. Proceeding with caution.");
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        apply(pool, 1, SCHEMA_V1).await?;
        info!("✓ Migration v1 completed (catalog tables)");
    }

    if current_version < 2 {
        apply(pool, 2, SCHEMA_V2).await?;
        info!("✓ Migration v2 completed (indexes)");
    }

    info!("All migrations completed successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let pool = crate::db::init_memory_database().await.unwrap();
        assert_eq!(get_schema_version(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION);

        run_migrations(&pool).await.unwrap();
        let versions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_version")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(versions, CURRENT_SCHEMA_VERSION as i64);
    }

    #[tokio::test]
    async fn test_property_owner_check_constraint() {
        let pool = crate::db::init_memory_database().await.unwrap();

        sqlx::query(
            "INSERT INTO compute_resource_property_types (id, name, datatype) VALUES ('t1', 'qubits', 'INTEGER')",
        )
        .execute(&pool)
        .await
        .unwrap();

        // No owner at all must be rejected by the table itself
        let result = sqlx::query(
            "INSERT INTO compute_resource_properties (id, value, type_id) VALUES ('p1', '5', 't1')",
        )
        .execute(&pool)
        .await;
        assert!(result.is_err());
    }
}
