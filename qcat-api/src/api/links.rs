//! List, link and unlink routes for one side of an association
//!
//! Linking takes `{"id": ...}` and answers 204. Unlinking an absent link is
//! a no-op, but both entities must exist.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use qcat_common::db::associations::{self, Association, Direction};
use qcat_common::models::EntityReference;
use qcat_common::PageRequest;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use uuid::Uuid;

use crate::extract::{AppJson, AppPath, AppQuery};
use crate::{ApiError, AppState};

/// Join-table keys in (left, right) order for a key seen from `direction`
fn ordered(direction: Direction, key: Uuid, other: Uuid) -> (String, String) {
    match direction {
        Direction::Forward => (key.to_string(), other.to_string()),
        Direction::Reverse => (other.to_string(), key.to_string()),
    }
}

/// Routes for `{base}` and `{base}/:linked_id`
///
/// `base` must contain exactly one path parameter, the owning entity's id.
pub fn link_routes<T>(
    base: &str,
    association: Association,
    direction: Direction,
    map: fn(&SqliteRow) -> qcat_common::Result<T>,
) -> Router<AppState>
where
    T: Serialize + Send + 'static,
{
    let list = move |State(state): State<AppState>,
                     AppPath(id): AppPath<Uuid>,
                     AppQuery(query): AppQuery<PageRequest>| async move {
        let request = state.page_request(query);
        let page = associations::fetch_linked(
            &state.db,
            association,
            direction,
            &id.to_string(),
            &request,
            map,
        )
        .await?;
        Ok::<_, ApiError>(Json(page))
    };

    let add = move |State(state): State<AppState>,
                    AppPath(id): AppPath<Uuid>,
                    AppJson(target): AppJson<EntityReference>| async move {
        let (left, right) = ordered(direction, id, target.id);
        associations::link(&state.db, association, &left, &right).await?;
        Ok::<_, ApiError>(StatusCode::NO_CONTENT)
    };

    let remove = move |State(state): State<AppState>,
                       AppPath((id, linked_id)): AppPath<(Uuid, Uuid)>| async move {
        let (left, right) = ordered(direction, id, linked_id);
        associations::unlink(&state.db, association, &left, &right).await?;
        Ok::<_, ApiError>(StatusCode::NO_CONTENT)
    };

    Router::new()
        .route(base, get(list).post(add))
        .route(&format!("{}/:linked_id", base), delete(remove))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordered_swaps_for_reverse() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(
            ordered(Direction::Forward, a, b),
            (a.to_string(), b.to_string())
        );
        assert_eq!(
            ordered(Direction::Reverse, a, b),
            (b.to_string(), a.to_string())
        );
    }
}
