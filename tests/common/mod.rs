// Shared across the test binaries; not every suite uses every helper.
#![allow(dead_code)]

use ledgerette::database::{Db, init_db};
use tempfile::{TempDir, tempdir};
use uuid::Uuid;

/// Fresh single-file database in a temp directory. Keep the `TempDir` alive
/// for the duration of the test; dropping it deletes the files.
pub async fn setup_test_db() -> (Db, TempDir) {
    let temp_dir = tempdir().expect("Failed to create temporary directory");
    let data_path = temp_dir
        .path()
        .to_str()
        .expect("Failed to convert path to string")
        .to_string();

    let db = init_db(&data_path)
        .await
        .unwrap_or_else(|e| panic!("Failed to initialize database at {}: {}", data_path, e));

    (db, temp_dir)
}

pub async fn role_id_by_name(db: &Db, name: &str) -> String {
    let conn = db.read().await;
    let mut rows = conn
        .query("SELECT id FROM roles WHERE name = ?", [name])
        .await
        .expect("Failed to query roles");
    let row = rows
        .next()
        .await
        .expect("Failed to read role row")
        .unwrap_or_else(|| panic!("Role '{}' is not seeded", name));
    row.get::<String>(0).expect("Failed to get role id")
}

/// Inserts a user with the given stored hash. Pass a plaintext value to
/// simulate a seeded fixture, or a real argon2 hash for login-style tests.
pub async fn create_test_user(
    db: &Db,
    username: &str,
    role_name: &str,
    password_hash: &str,
) -> String {
    let role_id = role_id_by_name(db, role_name).await;
    let user_id = Uuid::new_v4().to_string();
    let email = format!("{username}@example.com");

    let conn = db.write().await;
    conn.execute(
        "INSERT INTO users (id, username, email, password_hash, role_id) VALUES (?, ?, ?, ?, ?)",
        (
            user_id.as_str(),
            username,
            email.as_str(),
            password_hash,
            role_id.as_str(),
        ),
    )
    .await
    .unwrap_or_else(|e| panic!("Failed to insert test user '{}': {}", username, e));

    user_id
}

/// Inserts a record directly; `amount` is the canonical decimal string the
/// store keeps.
pub async fn create_test_record(
    db: &Db,
    category: &str,
    subcategory: &str,
    amount: &str,
    recorded_at: i64,
    created_by: &str,
) -> String {
    let record_id = Uuid::new_v4().to_string();

    let conn = db.write().await;
    conn.execute(
        "INSERT INTO records (id, category, subcategory, amount, description, recorded_at, created_by)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        (
            record_id.as_str(),
            category,
            subcategory,
            amount,
            "",
            recorded_at,
            created_by,
        ),
    )
    .await
    .unwrap_or_else(|e| panic!("Failed to insert test record '{}': {}", category, e));

    record_id
}

pub async fn create_test_nav_item(
    db: &Db,
    title: &str,
    position: i64,
    roles_allowed: &str,
    visible: bool,
) -> String {
    let item_id = Uuid::new_v4().to_string();
    let endpoint = format!("/{}", title.to_lowercase());

    let conn = db.write().await;
    conn.execute(
        "INSERT INTO nav_items (id, title, endpoint, position, roles_allowed, visible)
         VALUES (?, ?, ?, ?, ?, ?)",
        (
            item_id.as_str(),
            title,
            endpoint.as_str(),
            position,
            roles_allowed,
            i64::from(visible),
        ),
    )
    .await
    .unwrap_or_else(|e| panic!("Failed to insert test nav item '{}': {}", title, e));

    item_id
}
