//! Implementation packages and TOSCA applications
//!
//! Packages are owned by an implementation. A TOSCA package references a
//! TOSCA application, which cannot be deleted while referenced.

use super::retry::{retry_on_lock, LOCK_WAIT};
use super::{count_references, ensure_exists, list_named, map_constraint_error};
use crate::models::{
    ImplementationPackage, ImplementationPackageInput, PackageKind, ToscaApplication,
    ToscaApplicationInput,
};
use crate::pagination::{Page, PageRequest};
use crate::uuid_utils;
use crate::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::{info, warn};
use uuid::Uuid;

pub(crate) fn map_package(row: &SqliteRow) -> Result<ImplementationPackage> {
    let id: String = row.try_get("id")?;
    let implementation_id: String = row.try_get("implementation_id")?;
    let package_type: String = row.try_get("package_type")?;
    Ok(ImplementationPackage {
        id: uuid_utils::parse_column("implementation_packages.id", &id)?,
        implementation_id: uuid_utils::parse_column(
            "implementation_packages.implementation_id",
            &implementation_id,
        )?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        package: PackageKind::from_columns(
            &package_type,
            row.try_get("file_name")?,
            row.try_get("mime_type")?,
            row.try_get("file_url")?,
            uuid_utils::parse_optional_column(
                "tosca_application_id",
                row.try_get("tosca_application_id")?,
            )?,
            row.try_get("endpoint")?,
        )?,
    })
}

pub(crate) fn map_tosca_application(row: &SqliteRow) -> Result<ToscaApplication> {
    let id: String = row.try_get("id")?;
    Ok(ToscaApplication {
        id: uuid_utils::parse_column("tosca_applications.id", &id)?,
        name: row.try_get("name")?,
        tosca_id: row.try_get("tosca_id")?,
        tosca_namespace: row.try_get("tosca_namespace")?,
        tosca_name: row.try_get("tosca_name")?,
        wine_url: row.try_get("wine_url")?,
    })
}

/// Variant columns in table order: file_name, mime_type, file_url, tosca_application_id, endpoint
type VariantColumns = (
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

fn variant_columns(package: &PackageKind) -> VariantColumns {
    match package {
        PackageKind::File {
            file_name,
            mime_type,
            file_url,
        } => (
            Some(file_name.trim().to_string()),
            mime_type.clone(),
            file_url.clone(),
            None,
            None,
        ),
        PackageKind::Tosca {
            tosca_application_id,
        } => (None, None, None, Some(tosca_application_id.to_string()), None),
        PackageKind::Function { endpoint } => {
            (None, None, None, None, Some(endpoint.trim().to_string()))
        }
    }
}

// Packages

pub async fn find_by_implementation(
    pool: &SqlitePool,
    implementation_id: Uuid,
    request: &PageRequest,
) -> Result<Page<ImplementationPackage>> {
    let key = implementation_id.to_string();
    let mut conn = pool.acquire().await?;
    ensure_exists(&mut conn, "implementations", "id", &key, "Implementation").await?;

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM implementation_packages WHERE implementation_id = ?",
    )
    .bind(&key)
    .fetch_one(&mut *conn)
    .await?;

    let pagination = request.pagination(total);
    let rows = sqlx::query(
        "SELECT * FROM implementation_packages WHERE implementation_id = ? ORDER BY rowid LIMIT ? OFFSET ?",
    )
    .bind(&key)
    .bind(pagination.size)
    .bind(pagination.offset)
    .fetch_all(&mut *conn)
    .await?;

    let content = rows.iter().map(map_package).collect::<Result<Vec<_>>>()?;
    Ok(Page::new(content, pagination, total))
}

async fn find_package_in(
    conn: &mut SqliteConnection,
    implementation_id: Uuid,
    package_id: Uuid,
) -> Result<ImplementationPackage> {
    let row =
        sqlx::query("SELECT * FROM implementation_packages WHERE id = ? AND implementation_id = ?")
            .bind(package_id.to_string())
            .bind(implementation_id.to_string())
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| Error::not_found("Implementation package", package_id))?;
    map_package(&row)
}

pub async fn find_package(
    pool: &SqlitePool,
    implementation_id: Uuid,
    package_id: Uuid,
) -> Result<ImplementationPackage> {
    let mut conn = pool.acquire().await?;
    find_package_in(&mut conn, implementation_id, package_id).await
}

async fn check_input(
    conn: &mut SqliteConnection,
    implementation_id: Uuid,
    input: &ImplementationPackageInput,
) -> Result<()> {
    ensure_exists(
        conn,
        "implementations",
        "id",
        &implementation_id.to_string(),
        "Implementation",
    )
    .await?;
    input.validate()?;
    if let Some(tosca_id) = input.package.tosca_application_id() {
        ensure_exists(
            conn,
            "tosca_applications",
            "id",
            &tosca_id.to_string(),
            "Tosca application",
        )
        .await?;
    }
    Ok(())
}

pub async fn create_package(
    pool: &SqlitePool,
    implementation_id: Uuid,
    input: &ImplementationPackageInput,
) -> Result<ImplementationPackage> {
    retry_on_lock("packages::create_package", LOCK_WAIT, || {
        create_package_once(pool, implementation_id, input)
    })
    .await
}

async fn create_package_once(
    pool: &SqlitePool,
    implementation_id: Uuid,
    input: &ImplementationPackageInput,
) -> Result<ImplementationPackage> {
    let id = uuid_utils::generate();
    let (file_name, mime_type, file_url, tosca_id, endpoint) = variant_columns(&input.package);

    let mut tx = pool.begin().await?;
    check_input(&mut tx, implementation_id, input).await?;

    sqlx::query(
        r#"
        INSERT INTO implementation_packages (
            id, implementation_id, name, description, package_type,
            file_name, mime_type, file_url, tosca_application_id, endpoint
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(implementation_id.to_string())
    .bind(input.name.trim())
    .bind(input.description())
    .bind(input.package.package_type())
    .bind(file_name)
    .bind(mime_type)
    .bind(file_url)
    .bind(tosca_id)
    .bind(endpoint)
    .execute(&mut *tx)
    .await
    .map_err(|e| map_constraint_error(e, "Implementation package"))?;

    let created = find_package_in(&mut tx, implementation_id, id).await?;
    tx.commit().await?;

    info!(
        "Created {} package {} for implementation {}",
        input.package.package_type(),
        id,
        implementation_id
    );
    Ok(created)
}

/// Replace a package's fields, including its variant
pub async fn update_package(
    pool: &SqlitePool,
    implementation_id: Uuid,
    package_id: Uuid,
    input: &ImplementationPackageInput,
) -> Result<ImplementationPackage> {
    retry_on_lock("packages::update_package", LOCK_WAIT, || {
        update_package_once(pool, implementation_id, package_id, input)
    })
    .await
}

async fn update_package_once(
    pool: &SqlitePool,
    implementation_id: Uuid,
    package_id: Uuid,
    input: &ImplementationPackageInput,
) -> Result<ImplementationPackage> {
    let (file_name, mime_type, file_url, tosca_id, endpoint) = variant_columns(&input.package);

    let mut tx = pool.begin().await?;
    check_input(&mut tx, implementation_id, input).await?;
    find_package_in(&mut tx, implementation_id, package_id).await?;

    sqlx::query(
        r#"
        UPDATE implementation_packages SET
            name = ?, description = ?, package_type = ?, file_name = ?, mime_type = ?,
            file_url = ?, tosca_application_id = ?, endpoint = ?
        WHERE id = ?
        "#,
    )
    .bind(input.name.trim())
    .bind(input.description())
    .bind(input.package.package_type())
    .bind(file_name)
    .bind(mime_type)
    .bind(file_url)
    .bind(tosca_id)
    .bind(endpoint)
    .bind(package_id.to_string())
    .execute(&mut *tx)
    .await
    .map_err(|e| map_constraint_error(e, "Implementation package"))?;

    let updated = find_package_in(&mut tx, implementation_id, package_id).await?;
    tx.commit().await?;
    Ok(updated)
}

pub async fn delete_package(
    pool: &SqlitePool,
    implementation_id: Uuid,
    package_id: Uuid,
) -> Result<()> {
    let result =
        sqlx::query("DELETE FROM implementation_packages WHERE id = ? AND implementation_id = ?")
            .bind(package_id.to_string())
            .bind(implementation_id.to_string())
            .execute(pool)
            .await?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found("Implementation package", package_id));
    }
    info!("Deleted package {} of implementation {}", package_id, implementation_id);
    Ok(())
}

// TOSCA applications

pub async fn find_all_tosca_applications(
    pool: &SqlitePool,
    request: &PageRequest,
) -> Result<Page<ToscaApplication>> {
    list_named(pool, "tosca_applications", request, map_tosca_application).await
}

pub async fn find_tosca_application(pool: &SqlitePool, id: Uuid) -> Result<ToscaApplication> {
    let row = sqlx::query("SELECT * FROM tosca_applications WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::not_found("Tosca application", id))?;
    map_tosca_application(&row)
}

pub async fn create_tosca_application(
    pool: &SqlitePool,
    input: &ToscaApplicationInput,
) -> Result<ToscaApplication> {
    input.validate()?;
    let input = input.normalized();
    let id = uuid_utils::generate();

    sqlx::query(
        r#"
        INSERT INTO tosca_applications (id, name, tosca_id, tosca_namespace, tosca_name, wine_url)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(&input.name)
    .bind(&input.tosca_id)
    .bind(&input.tosca_namespace)
    .bind(&input.tosca_name)
    .bind(&input.wine_url)
    .execute(pool)
    .await?;

    info!("Created TOSCA application {} ({})", input.name, id);
    find_tosca_application(pool, id).await
}

pub async fn update_tosca_application(
    pool: &SqlitePool,
    id: Uuid,
    input: &ToscaApplicationInput,
) -> Result<ToscaApplication> {
    input.validate()?;
    let input = input.normalized();

    let result = sqlx::query(
        r#"
        UPDATE tosca_applications SET
            name = ?, tosca_id = ?, tosca_namespace = ?, tosca_name = ?, wine_url = ?
        WHERE id = ?
        "#,
    )
    .bind(&input.name)
    .bind(&input.tosca_id)
    .bind(&input.tosca_namespace)
    .bind(&input.tosca_name)
    .bind(&input.wine_url)
    .bind(id.to_string())
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found("Tosca application", id));
    }
    find_tosca_application(pool, id).await
}

/// Delete a TOSCA application; refused while packages reference it
pub async fn delete_tosca_application(pool: &SqlitePool, id: Uuid) -> Result<()> {
    retry_on_lock("packages::delete_tosca_application", LOCK_WAIT, || {
        delete_tosca_application_once(pool, id)
    })
    .await
}

async fn delete_tosca_application_once(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let key = id.to_string();
    let mut tx = pool.begin().await?;
    ensure_exists(&mut tx, "tosca_applications", "id", &key, "Tosca application").await?;

    let usages =
        count_references(&mut tx, "implementation_packages", "tosca_application_id", &key).await?;
    if usages > 0 {
        warn!("Refusing to delete TOSCA application {}: {} package(s) reference it", id, usages);
        return Err(Error::Conflict(format!(
            "Tosca application {} is referenced by {} package(s)",
            id, usages
        )));
    }

    sqlx::query("DELETE FROM tosca_applications WHERE id = ?")
        .bind(&key)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!("Deleted TOSCA application {}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{algorithms, implementations, init_memory_database};
    use crate::models::{AlgorithmInput, AlgorithmKind, ImplementationInput};

    async fn implementation(pool: &SqlitePool) -> Uuid {
        let alg = algorithms::create(pool, &AlgorithmInput::new("alg1", AlgorithmKind::Classic))
            .await
            .unwrap();
        implementations::create(pool, alg.id, &ImplementationInput::new("impl1"))
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_referenced_tosca_application_cannot_be_deleted() {
        let pool = init_memory_database().await.unwrap();
        let impl_id = implementation(&pool).await;
        let app = create_tosca_application(&pool, &ToscaApplicationInput::new("shor-deployment"))
            .await
            .unwrap();

        let package = create_package(
            &pool,
            impl_id,
            &ImplementationPackageInput {
                name: "tosca".to_string(),
                description: None,
                package: PackageKind::Tosca {
                    tosca_application_id: app.id,
                },
            },
        )
        .await
        .unwrap();
        assert_eq!(package.package.tosca_application_id(), Some(app.id));

        let err = delete_tosca_application(&pool, app.id).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        delete_package(&pool, impl_id, package.id).await.unwrap();
        delete_tosca_application(&pool, app.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_switches_variant() {
        let pool = init_memory_database().await.unwrap();
        let impl_id = implementation(&pool).await;

        let package = create_package(
            &pool,
            impl_id,
            &ImplementationPackageInput {
                name: "source".to_string(),
                description: None,
                package: PackageKind::File {
                    file_name: "shor.py".to_string(),
                    mime_type: Some("text/x-python".to_string()),
                    file_url: None,
                },
            },
        )
        .await
        .unwrap();

        let updated = update_package(
            &pool,
            impl_id,
            package.id,
            &ImplementationPackageInput {
                name: "faas".to_string(),
                description: Some("hosted".to_string()),
                package: PackageKind::Function {
                    endpoint: "https://faas.example.org/shor".to_string(),
                },
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.package.package_type(), "FUNCTION");

        let page = find_by_implementation(&pool, impl_id, &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.content, vec![updated]);
    }

    #[tokio::test]
    async fn test_unknown_tosca_application_is_not_found() {
        let pool = init_memory_database().await.unwrap();
        let impl_id = implementation(&pool).await;

        let err = create_package(
            &pool,
            impl_id,
            &ImplementationPackageInput {
                name: "tosca".to_string(),
                description: None,
                package: PackageKind::Tosca {
                    tosca_application_id: Uuid::new_v4(),
                },
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
