use anyhow::anyhow;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode};
use tower_sessions::Session;
use uuid::Uuid;

use crate::constants::{ARGON2_PREFIX, DEFAULT_ROLE};
use crate::database::{Db, find_role_id};
use crate::error::{ApiError, FieldError};
use crate::forms::validate_registration;
use crate::models::{LoginPayload, PublicUser, RegisterPayload};

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {err}"))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Public view of a user looked up by id, with the role name joined in.
pub async fn find_user_by_id(db: &Db, id: &str) -> Result<Option<PublicUser>, ApiError> {
    let conn = db.read().await;
    let mut rows = conn
        .query(
            "SELECT users.id, users.username, roles.name
             FROM users JOIN roles ON roles.id = users.role_id
             WHERE users.id = ?",
            [id],
        )
        .await?;

    match rows.next().await? {
        Some(row) => Ok(Some(PublicUser {
            id: row.get::<String>(0)?,
            username: row.get::<String>(1)?,
            role: row.get::<String>(2)?,
        })),
        None => Ok(None),
    }
}

/// The session keeps the snapshot taken at login; every request re-reads the
/// row, so role changes and deletions take effect on the viewer's next call.
pub async fn get_current_user(db: &Db, session: &Session) -> Result<PublicUser, ApiError> {
    let snapshot = session
        .get::<PublicUser>("user")
        .await
        .map_err(|err| anyhow!("failed to load session: {err}"))?
        .ok_or(ApiError::Unauthorized)?;

    find_user_by_id(db, &snapshot.id)
        .await?
        .ok_or(ApiError::Unauthorized)
}

/// Role name for nav filtering; `None` for anonymous viewers.
pub async fn current_viewer_role(db: &Db, session: &Session) -> Option<String> {
    get_current_user(db, session).await.ok().map(|user| user.role)
}

pub async fn register(
    State(db): State<Db>,
    Json(payload): Json<RegisterPayload>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    let validated = validate_registration(payload)?;
    let role_name = validated.role.unwrap_or_else(|| DEFAULT_ROLE.to_string());

    let conn = db.write().await;
    let Some(role_id) = find_role_id(&conn, &role_name).await? else {
        return Err(ApiError::Validation(vec![FieldError::new(
            "role",
            format!("role '{role_name}' does not exist"),
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

    let password_hash = hash_password(&validated.password)?;
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO users (id, username, email, password_hash, role_id)
         VALUES (?, ?, ?, ?, ?)",
        (
            id.as_str(),
            validated.username.as_str(),
            validated.email.as_str(),
            password_hash.as_str(),
            role_id.as_str(),
        ),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(PublicUser {
            id,
            username: validated.username,
            role: role_name,
        }),
    ))
}

/// Unknown username and wrong password answer identically.
pub async fn login(
    State(db): State<Db>,
    session: Session,
    Json(payload): Json<LoginPayload>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    let conn = db.read().await;
    let mut rows = conn
        .query(
            "SELECT users.id, users.username, users.password_hash, roles.name
             FROM users JOIN roles ON roles.id = users.role_id
             WHERE users.username = ?",
            [payload.username.as_str()],
        )
        .await?;

    let Some(row) = rows.next().await? else {
        return Err(ApiError::InvalidCredentials);
    };
    let id = row.get::<String>(0)?;
    let username = row.get::<String>(1)?;
    let stored_hash = row.get::<String>(2)?;
    let role = row.get::<String>(3)?;

    if !verify_password(&payload.password, &stored_hash) {
        return Err(ApiError::InvalidCredentials);
    }

    let user = PublicUser { id, username, role };
    session
        .insert("user", &user)
        .await
        .map_err(|err| anyhow!("failed to store session: {err}"))?;

    Ok((StatusCode::OK, Json(user)))
}

pub async fn logout(session: Session) -> StatusCode {
    session.clear().await;
    StatusCode::NO_CONTENT
}

pub async fn me(
    State(db): State<Db>,
    session: Session,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    let user = get_current_user(&db, &session).await?;
    Ok((StatusCode::OK, Json(user)))
}

/// Seed fixtures may ship plaintext passwords; any non-empty value that is
/// not already an argon2 hash gets hashed in place at startup. Empty hashes
/// stay empty, leaving the account unable to log in. Returns how many rows
/// changed.
pub async fn rehash_seed_passwords(db: &Db) -> Result<u64, ApiError> {
    let conn = db.write().await;
    let mut rows = conn.query("SELECT id, password_hash FROM users", ()).await?;

    let mut stale: Vec<(String, String)> = Vec::new();
    while let Some(row) = rows.next().await? {
        let id = row.get::<String>(0)?;
        let stored = row.get::<String>(1)?;
        if !stored.is_empty() && !stored.starts_with(ARGON2_PREFIX) {
            stale.push((id, stored));
        }
    }

    let mut upgraded = 0;
    for (id, plaintext) in stale {
        let hash = hash_password(&plaintext)?;
        conn.execute(
            "UPDATE users SET password_hash = ? WHERE id = ?",
            (hash.as_str(), id.as_str()),
        )
        .await?;
        upgraded += 1;
    }
    Ok(upgraded)
}
