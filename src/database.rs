use anyhow::Result;
use libsql::{Builder, Connection};
use std::{path::Path, sync::Arc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::constants::{ADMIN_ROLE, DEFAULT_ROLE};

const CREATE_ROLES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS roles (
    id    TEXT PRIMARY KEY,
    name  TEXT UNIQUE NOT NULL
);
"#;

const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id             TEXT    PRIMARY KEY,
    username       TEXT    UNIQUE NOT NULL,
    email          TEXT    NOT NULL,
    password_hash  TEXT    NOT NULL,
    role_id        TEXT    NOT NULL REFERENCES roles(id)
);
"#;

const CREATE_NAV_ITEMS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS nav_items (
    id             TEXT    PRIMARY KEY,
    title          TEXT    NOT NULL,
    endpoint       TEXT    NOT NULL,
    position       INTEGER NOT NULL DEFAULT 0,
    roles_allowed  TEXT    NOT NULL DEFAULT '',
    visible        INTEGER NOT NULL DEFAULT 1
);
"#;

// amount holds a canonical decimal string; binary floats never touch it.
const CREATE_RECORDS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    id           TEXT    PRIMARY KEY,
    category     TEXT    NOT NULL,
    subcategory  TEXT    NOT NULL DEFAULT '',
    amount       TEXT    NOT NULL,
    description  TEXT    NOT NULL DEFAULT '',
    recorded_at  INTEGER NOT NULL,
    created_by   TEXT    NOT NULL REFERENCES users(id)
);
"#;

pub type Db = Arc<RwLock<Connection>>;

/// Application database (ledgerette.db): users, roles, nav items, records
/// all live in one file so admin views and nav lookups can join across them.
pub async fn init_db(data_dir: &str) -> Result<Db> {
    tokio::fs::create_dir_all(data_dir).await?;
    let path = Path::new(data_dir).join("ledgerette.db");
    let db = Builder::new_local(path).build().await?;
    let conn = db.connect()?;

    conn.execute(CREATE_ROLES_TABLE, ()).await?;
    conn.execute(CREATE_USERS_TABLE, ()).await?;
    conn.execute(CREATE_NAV_ITEMS_TABLE, ()).await?;
    conn.execute(CREATE_RECORDS_TABLE, ()).await?;
    seed_roles(&conn).await?;

    Ok(Arc::new(RwLock::new(conn)))
}

/// Registration needs role choices, so Admin and User always exist.
async fn seed_roles(conn: &Connection) -> Result<()> {
    for name in [ADMIN_ROLE, DEFAULT_ROLE] {
        let id = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT OR IGNORE INTO roles (id, name) VALUES (?, ?)",
            (id.as_str(), name),
        )
        .await?;
    }
    Ok(())
}

/// Looks a role up by its (unique) name.
pub(crate) async fn find_role_id(
    conn: &Connection,
    name: &str,
) -> Result<Option<String>, libsql::Error> {
    let mut rows = conn
        .query("SELECT id FROM roles WHERE name = ?", [name])
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(row.get::<String>(0)?)),
        None => Ok(None),
    }
}
