// Server configuration
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: &str = "5000";
pub const DEFAULT_DATA_PATH: &str = "data";

// Session configuration
pub const SESSION_NAME: &str = "ledgerette_session";
pub const SESSION_EXPIRY_DAYS: i64 = 3;
pub const MIN_SESSION_SECRET_LENGTH: usize = 64;

// Role names; the admin gate and nav role lists match on these
pub const ADMIN_ROLE: &str = "Admin";
pub const DEFAULT_ROLE: &str = "User";

// Argon2 PHC strings carry this prefix; any other non-empty value in
// users.password_hash is a plaintext seed and gets rehashed at startup.
pub const ARGON2_PREFIX: &str = "$argon2";

// Seeded into password_hash for admin-created accounts. The startup rehash
// upgrades it like any plaintext seed, making it the first-login password.
pub const PLACEHOLDER_PASSWORD: &str = "placeholder";

// Validation limits
pub const MAX_CATEGORY_LENGTH: usize = 100;
pub const MAX_DESCRIPTION_LENGTH: usize = 1000;
pub const MAX_TITLE_LENGTH: usize = 100;
pub const MAX_USERNAME_LENGTH: usize = 50;
pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MIN_PASSWORD_LENGTH: usize = 6;

// Reporting limits
pub const RECORDS_LIST_CAP: u64 = 50;
