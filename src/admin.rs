use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tower_sessions::Session;
use uuid::Uuid;

use crate::auth::get_current_user;
use crate::constants::{ADMIN_ROLE, PLACEHOLDER_PASSWORD};
use crate::database::{Db, find_role_id};
use crate::error::{ApiError, FieldError};
use crate::forms::{validate_nav_item, validate_user};
use crate::models::{NavItem, NavItemPayload, PublicUser, Role, UserPayload, UserWithRole};
use crate::nav::fetch_nav_items;

/// The role comes from the stored user row, not the session snapshot, so a
/// demoted or deleted admin is refused on their next request.
pub(crate) async fn require_admin(db: &Db, session: &Session) -> Result<PublicUser, ApiError> {
    let user = get_current_user(db, session).await?;
    if user.role != ADMIN_ROLE {
        return Err(ApiError::Forbidden);
    }
    Ok(user)
}

fn user_with_role_from_row(row: &libsql::Row) -> Result<UserWithRole, ApiError> {
    Ok(UserWithRole {
        id: row.get::<String>(0)?,
        username: row.get::<String>(1)?,
        email: row.get::<String>(2)?,
        role: row.get::<String>(3)?,
    })
}

pub async fn fetch_users(db: &Db) -> Result<Vec<UserWithRole>, ApiError> {
    let conn = db.read().await;
    let mut rows = conn
        .query(
            "SELECT users.id, users.username, users.email, roles.name
             FROM users JOIN roles ON roles.id = users.role_id
             ORDER BY users.username",
            (),
        )
        .await?;

    let mut users = Vec::new();
    while let Some(row) = rows.next().await? {
        users.push(user_with_role_from_row(&row)?);
    }
    Ok(users)
}

pub async fn fetch_roles(db: &Db) -> Result<Vec<Role>, ApiError> {
    let conn = db.read().await;
    let mut rows = conn
        .query("SELECT id, name FROM roles ORDER BY name", ())
        .await?;

    let mut roles = Vec::new();
    while let Some(row) = rows.next().await? {
        roles.push(Role {
            id: row.get::<String>(0)?,
            name: row.get::<String>(1)?,
        });
    }
    Ok(roles)
}

pub async fn list_users(
    State(db): State<Db>,
    session: Session,
) -> Result<(StatusCode, Json<Vec<UserWithRole>>), ApiError> {
    require_admin(&db, &session).await?;
    let users = fetch_users(&db).await?;
    Ok((StatusCode::OK, Json(users)))
}

/// Admin-created accounts are seeded with the literal placeholder value. It
/// cannot verify as a hash, so the account stays locked out until the next
/// startup rehash turns it into the first-login password.
pub async fn create_user(
    State(db): State<Db>,
    session: Session,
    Json(payload): Json<UserPayload>,
) -> Result<(StatusCode, Json<UserWithRole>), ApiError> {
    require_admin(&db, &session).await?;
    let validated = validate_user(payload)?;

    let conn = db.write().await;
    let Some(role_id) = find_role_id(&conn, &validated.role).await? else {
        return Err(ApiError::Validation(vec![FieldError::new(
            "role",
            format!("role '{}' does not exist", validated.role),
        )]));
    };

    let mut existing = conn
        .query(
            "SELECT id FROM users WHERE username = ?",
            [validated.username.as_str()],
        )
        .await?;
    if existing.next().await?.is_some() {
        return Err(ApiError::Conflict(format!(
            "username '{}' is already taken",
            validated.username
        )));
    }

    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO users (id, username, email, password_hash, role_id)
         VALUES (?, ?, ?, ?, ?)",
        (
            id.as_str(),
            validated.username.as_str(),
            validated.email.as_str(),
            PLACEHOLDER_PASSWORD,
            role_id.as_str(),
        ),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(UserWithRole {
            id,
            username: validated.username,
            email: validated.email,
            role: validated.role,
        }),
    ))
}

pub async fn update_user(
    State(db): State<Db>,
    session: Session,
    Path(id): Path<String>,
    Json(payload): Json<UserPayload>,
) -> Result<(StatusCode, Json<UserWithRole>), ApiError> {
    require_admin(&db, &session).await?;
    let validated = validate_user(payload)?;

    let conn = db.write().await;
    let Some(role_id) = find_role_id(&conn, &validated.role).await? else {
        return Err(ApiError::Validation(vec![FieldError::new(
            "role",
            format!("role '{}' does not exist", validated.role),
        )]));
    };

    let mut clash = conn
        .query(
            "SELECT id FROM users WHERE username = ? AND id != ?",
            (validated.username.as_str(), id.as_str()),
        )
        .await?;
    if clash.next().await?.is_some() {
        return Err(ApiError::Conflict(format!(
            "username '{}' is already taken",
            validated.username
        )));
    }

    let affected = conn
        .execute(
            "UPDATE users SET username = ?, email = ?, role_id = ? WHERE id = ?",
            (
                validated.username.as_str(),
                validated.email.as_str(),
                role_id.as_str(),
                id.as_str(),
            ),
        )
        .await?;
    if affected == 0 {
        return Err(ApiError::NotFound("user"));
    }

    Ok((
        StatusCode::OK,
        Json(UserWithRole {
            id,
            username: validated.username,
            email: validated.email,
            role: validated.role,
        }),
    ))
}

pub async fn delete_user(
    State(db): State<Db>,
    session: Session,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_admin(&db, &session).await?;

    let conn = db.write().await;
    let affected = conn
        .execute("DELETE FROM users WHERE id = ?", [id.as_str()])
        .await?;
    if affected == 0 {
        return Err(ApiError::NotFound("user"));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_roles(
    State(db): State<Db>,
    session: Session,
) -> Result<(StatusCode, Json<Vec<Role>>), ApiError> {
    require_admin(&db, &session).await?;
    let roles = fetch_roles(&db).await?;
    Ok((StatusCode::OK, Json(roles)))
}

/// Unlike the public nav endpoint, this lists every item, hidden ones
/// included.
pub async fn list_nav_items(
    State(db): State<Db>,
    session: Session,
) -> Result<(StatusCode, Json<Vec<NavItem>>), ApiError> {
    require_admin(&db, &session).await?;
    let items = fetch_nav_items(&db).await?;
    Ok((StatusCode::OK, Json(items)))
}

pub async fn create_nav_item(
    State(db): State<Db>,
    session: Session,
    Json(payload): Json<NavItemPayload>,
) -> Result<(StatusCode, Json<NavItem>), ApiError> {
    require_admin(&db, &session).await?;
    let validated = validate_nav_item(payload)?;

    let id = Uuid::new_v4().to_string();
    let conn = db.write().await;
    conn.execute(
        "INSERT INTO nav_items (id, title, endpoint, position, roles_allowed, visible)
         VALUES (?, ?, ?, ?, ?, ?)",
        (
            id.as_str(),
            validated.title.as_str(),
            validated.endpoint.as_str(),
            validated.position,
            validated.roles_allowed.as_str(),
            i64::from(validated.visible),
        ),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(NavItem {
            id,
            title: validated.title,
            endpoint: validated.endpoint,
            position: validated.position,
            roles_allowed: validated.roles_allowed,
            visible: validated.visible,
        }),
    ))
}

pub async fn update_nav_item(
    State(db): State<Db>,
    session: Session,
    Path(id): Path<String>,
    Json(payload): Json<NavItemPayload>,
) -> Result<(StatusCode, Json<NavItem>), ApiError> {
    require_admin(&db, &session).await?;
    let validated = validate_nav_item(payload)?;

    let conn = db.write().await;
    let affected = conn
        .execute(
            "UPDATE nav_items
             SET title = ?, endpoint = ?, position = ?, roles_allowed = ?, visible = ?
             WHERE id = ?",
            (
                validated.title.as_str(),
                validated.endpoint.as_str(),
                validated.position,
                validated.roles_allowed.as_str(),
                i64::from(validated.visible),
                id.as_str(),
            ),
        )
        .await?;
    if affected == 0 {
        return Err(ApiError::NotFound("nav item"));
    }

    Ok((
        StatusCode::OK,
        Json(NavItem {
            id,
            title: validated.title,
            endpoint: validated.endpoint,
            position: validated.position,
            roles_allowed: validated.roles_allowed,
            visible: validated.visible,
        }),
    ))
}

pub async fn delete_nav_item(
    State(db): State<Db>,
    session: Session,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_admin(&db, &session).await?;

    let conn = db.write().await;
    let affected = conn
        .execute("DELETE FROM nav_items WHERE id = ?", [id.as_str()])
        .await?;
    if affected == 0 {
        return Err(ApiError::NotFound("nav item"));
    }
    Ok(StatusCode::NO_CONTENT)
}
