use rust_decimal::Decimal;
use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

use crate::constants::{
    MAX_CATEGORY_LENGTH, MAX_DESCRIPTION_LENGTH, MAX_TITLE_LENGTH, MAX_USERNAME_LENGTH,
    MIN_PASSWORD_LENGTH, MIN_USERNAME_LENGTH,
};
use crate::error::FieldError;
use crate::models::{NavItemPayload, RecordPayload, RegisterPayload, UserPayload};

const DATETIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
pub(crate) const DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRecord {
    pub category: String,
    pub subcategory: String,
    pub amount: Decimal,
    pub description: String,
    pub recorded_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRegistration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedUser {
    pub username: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedNavItem {
    pub title: String,
    pub endpoint: String,
    pub position: i64,
    pub roles_allowed: String,
    pub visible: bool,
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` (assumed UTC), or a bare
/// `YYYY-MM-DD` (midnight UTC).
pub fn parse_recorded_at(value: &str) -> Option<OffsetDateTime> {
    if let Ok(parsed) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(parsed);
    }
    if let Ok(parsed) = PrimitiveDateTime::parse(value, DATETIME_FORMAT) {
        return Some(parsed.assume_utc());
    }
    if let Ok(parsed) = Date::parse(value, DATE_FORMAT) {
        return Some(parsed.midnight().assume_utc());
    }
    None
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

fn check_username(username: &str, errors: &mut Vec<FieldError>) -> String {
    let username = username.trim().to_string();
    // Limits count characters, not bytes.
    let length = username.chars().count();
    if length < MIN_USERNAME_LENGTH {
        errors.push(FieldError::new(
            "username",
            format!("username must be at least {MIN_USERNAME_LENGTH} characters"),
        ));
    } else if length > MAX_USERNAME_LENGTH {
        errors.push(FieldError::new(
            "username",
            format!("username must be at most {MAX_USERNAME_LENGTH} characters"),
        ));
    }
    username
}

fn check_email(email: &str, errors: &mut Vec<FieldError>) -> String {
    let email = email.trim().to_string();
    if email.is_empty() {
        errors.push(FieldError::new("email", "email is required"));
    } else if !looks_like_email(&email) {
        errors.push(FieldError::new("email", "email address is not valid"));
    }
    email
}

/// Checks every field and reports all violations at once rather than
/// stopping at the first.
pub fn validate_record(payload: RecordPayload) -> Result<ValidatedRecord, Vec<FieldError>> {
    let mut errors = Vec::new();

    let category = payload.category.trim().to_string();
    if category.is_empty() {
        errors.push(FieldError::new("category", "category is required"));
    } else if category.chars().count() > MAX_CATEGORY_LENGTH {
        errors.push(FieldError::new(
            "category",
            format!("category must be at most {MAX_CATEGORY_LENGTH} characters"),
        ));
    }

    let subcategory = payload.subcategory.unwrap_or_default().trim().to_string();
    if subcategory.chars().count() > MAX_CATEGORY_LENGTH {
        errors.push(FieldError::new(
            "subcategory",
            format!("subcategory must be at most {MAX_CATEGORY_LENGTH} characters"),
        ));
    }

    let description = payload.description.unwrap_or_default().trim().to_string();
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        errors.push(FieldError::new(
            "description",
            format!("description must be at most {MAX_DESCRIPTION_LENGTH} characters"),
        ));
    }

    let recorded_at = parse_recorded_at(payload.recorded_at.trim());
    if recorded_at.is_none() {
        errors.push(FieldError::new(
            "recorded_at",
            "recorded_at must be an RFC 3339 timestamp, YYYY-MM-DD HH:MM:SS, or YYYY-MM-DD",
        ));
    }

    match (recorded_at, errors.is_empty()) {
        (Some(recorded_at), true) => Ok(ValidatedRecord {
            category,
            subcategory,
            amount: payload.amount,
            description,
            recorded_at,
        }),
        _ => Err(errors),
    }
}

pub fn validate_registration(
    payload: RegisterPayload,
) -> Result<ValidatedRegistration, Vec<FieldError>> {
    let mut errors = Vec::new();

    let username = check_username(&payload.username, &mut errors);
    let email = check_email(&payload.email, &mut errors);

    if payload.password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.push(FieldError::new(
            "password",
            format!("password must be at least {MIN_PASSWORD_LENGTH} characters"),
        ));
    }

    let role = payload
        .role
        .map(|role| role.trim().to_string())
        .filter(|role| !role.is_empty());

    if errors.is_empty() {
        Ok(ValidatedRegistration {
            username,
            email,
            password: payload.password,
            role,
        })
    } else {
        Err(errors)
    }
}

pub fn validate_user(payload: UserPayload) -> Result<ValidatedUser, Vec<FieldError>> {
    let mut errors = Vec::new();

    let username = check_username(&payload.username, &mut errors);
    let email = check_email(&payload.email, &mut errors);

    let role = payload.role.trim().to_string();
    if role.is_empty() {
        errors.push(FieldError::new("role", "role is required"));
    }

    if errors.is_empty() {
        Ok(ValidatedUser {
            username,
            email,
            role,
        })
    } else {
        Err(errors)
    }
}

pub fn validate_nav_item(payload: NavItemPayload) -> Result<ValidatedNavItem, Vec<FieldError>> {
    let mut errors = Vec::new();

    let title = payload.title.trim().to_string();
    if title.is_empty() {
        errors.push(FieldError::new("title", "title is required"));
    } else if title.chars().count() > MAX_TITLE_LENGTH {
        errors.push(FieldError::new(
            "title",
            format!("title must be at most {MAX_TITLE_LENGTH} characters"),
        ));
    }

    let endpoint = payload.endpoint.trim().to_string();
    if endpoint.is_empty() {
        errors.push(FieldError::new("endpoint", "endpoint is required"));
    }

    if errors.is_empty() {
        Ok(ValidatedNavItem {
            title,
            endpoint,
            position: payload.position.unwrap_or(0),
            roles_allowed: payload.roles_allowed.unwrap_or_default(),
            visible: payload.visible.unwrap_or(true),
        })
    } else {
        Err(errors)
    }
}
