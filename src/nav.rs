use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use tower_sessions::Session;

use crate::auth::current_viewer_role;
use crate::database::Db;
use crate::error::ApiError;
use crate::models::NavItem;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavLink {
    pub title: String,
    pub endpoint: String,
}

#[derive(Debug, Serialize)]
pub struct NavResponse {
    pub nav_items: Vec<NavLink>,
}

pub(crate) fn nav_item_from_row(row: &libsql::Row) -> Result<NavItem, ApiError> {
    Ok(NavItem {
        id: row.get::<String>(0)?,
        title: row.get::<String>(1)?,
        endpoint: row.get::<String>(2)?,
        position: row.get::<i64>(3)?,
        roles_allowed: row.get::<String>(4)?,
        visible: row.get::<i64>(5)? != 0,
    })
}

pub async fn fetch_nav_items(db: &Db) -> Result<Vec<NavItem>, ApiError> {
    let conn = db.read().await;
    let mut rows = conn
        .query(
            "SELECT id, title, endpoint, position, roles_allowed, visible
             FROM nav_items ORDER BY position",
            (),
        )
        .await?;

    let mut items = Vec::new();
    while let Some(row) = rows.next().await? {
        items.push(nav_item_from_row(&row)?);
    }
    Ok(items)
}

/// An empty role list is unrestricted, anonymous viewers included. Any
/// non-empty list denies anonymous viewers and admits exactly the roles it
/// names, compared case-sensitively after trimming. Empty tokens never
/// match, so a separator-only list admits no one.
pub fn role_allows(roles_allowed: &str, viewer_role: Option<&str>) -> bool {
    if roles_allowed.is_empty() {
        return true;
    }
    match viewer_role {
        Some(role) => roles_allowed
            .split(',')
            .map(str::trim)
            .any(|name| !name.is_empty() && name == role),
        None => false,
    }
}

/// Filters to items the viewer may see and orders them by position. Ties keep
/// their stored order.
pub fn visible_nav_items(items: &[NavItem], viewer_role: Option<&str>) -> Vec<NavLink> {
    let mut allowed: Vec<&NavItem> = items
        .iter()
        .filter(|item| item.visible && role_allows(&item.roles_allowed, viewer_role))
        .collect();
    allowed.sort_by_key(|item| item.position);

    allowed
        .into_iter()
        .map(|item| NavLink {
            title: item.title.clone(),
            endpoint: item.endpoint.clone(),
        })
        .collect()
}

/// GET /api/nav. A storage failure serves an empty menu rather than a 500 so
/// pages keep rendering.
pub async fn api_nav(State(db): State<Db>, session: Session) -> (StatusCode, Json<NavResponse>) {
    let viewer_role = current_viewer_role(&db, &session).await;
    let items = match fetch_nav_items(&db).await {
        Ok(items) => items,
        Err(err) => {
            tracing::warn!(error = %err, "failed to load nav items, serving an empty menu");
            Vec::new()
        }
    };

    (
        StatusCode::OK,
        Json(NavResponse {
            nav_items: visible_nav_items(&items, viewer_role.as_deref()),
        }),
    )
}
