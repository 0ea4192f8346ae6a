use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A categorized monetary entry. Amounts are exact decimals end to end;
/// conversion to a JSON float happens only when a response is serialized.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub category: String,
    pub subcategory: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: OffsetDateTime,
    pub created_by: String,
}

/// A configurable navigation-menu entry. `roles_allowed` is a comma-separated
/// list of role names; empty means unrestricted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NavItem {
    pub id: String,
    pub title: String,
    pub endpoint: String,
    pub position: i64,
    pub roles_allowed: String,
    pub visible: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Role {
    pub id: String,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role_id: String,
}

/// User as seen by clients and by handlers acting on the session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub role: String,
}

/// Admin listing row; the role is resolved to its name.
#[derive(Serialize, Debug, Clone)]
pub struct UserWithRole {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: String,
}

#[derive(Deserialize, Debug)]
pub struct RegisterPayload {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct LoginPayload {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, Debug)]
pub struct RecordPayload {
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(default)]
    pub description: Option<String>,
    pub recorded_at: String,
}

#[derive(Deserialize, Debug)]
pub struct UserPayload {
    pub username: String,
    pub email: String,
    pub role: String,
}

#[derive(Deserialize, Debug)]
pub struct NavItemPayload {
    pub title: String,
    pub endpoint: String,
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default)]
    pub roles_allowed: Option<String>,
    #[serde(default)]
    pub visible: Option<bool>,
}
