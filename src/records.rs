use std::str::FromStr;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use csv::{ReaderBuilder, Trim};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tower_sessions::Session;
use uuid::Uuid;

use crate::auth::get_current_user;
use crate::database::Db;
use crate::error::{ApiError, FieldError};
use crate::forms::{ValidatedRecord, validate_record};
use crate::models::{Record, RecordPayload};

const SELECT_RECORD_COLUMNS: &str =
    "SELECT id, category, subcategory, amount, description, recorded_at, created_by FROM records";

pub fn record_from_row(row: &libsql::Row) -> Result<Record, ApiError> {
    let amount_text = row.get::<String>(3)?;
    let amount = Decimal::from_str(&amount_text)
        .map_err(|err| anyhow::anyhow!("stored amount '{amount_text}' is not a decimal: {err}"))?;
    let unix = row.get::<i64>(5)?;
    let recorded_at = OffsetDateTime::from_unix_timestamp(unix)
        .map_err(|err| anyhow::anyhow!("stored timestamp {unix} is out of range: {err}"))?;

    Ok(Record {
        id: row.get::<String>(0)?,
        category: row.get::<String>(1)?,
        subcategory: row.get::<String>(2)?,
        amount,
        description: row.get::<String>(4)?,
        recorded_at,
        created_by: row.get::<String>(6)?,
    })
}

/// Newest-first snapshot of the records table. `limit` of `None` means all
/// rows (SQLite treats LIMIT -1 as unbounded).
pub async fn fetch_records(db: &Db, limit: Option<u64>) -> Result<Vec<Record>, ApiError> {
    let conn = db.read().await;
    let mut rows = conn
        .query(
            &format!("{SELECT_RECORD_COLUMNS} ORDER BY recorded_at DESC, id LIMIT ?"),
            [limit.map(|n| n as i64).unwrap_or(-1)],
        )
        .await?;

    let mut records = Vec::new();
    while let Some(row) = rows.next().await? {
        records.push(record_from_row(&row)?);
    }
    Ok(records)
}

async fn insert_record(
    conn: &libsql::Connection,
    id: &str,
    validated: &ValidatedRecord,
    created_by: &str,
) -> Result<(), libsql::Error> {
    // Amounts are stored as their canonical decimal string.
    let amount = validated.amount.to_string();
    conn.execute(
        "INSERT INTO records (id, category, subcategory, amount, description, recorded_at, created_by)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        (
            id,
            validated.category.as_str(),
            validated.subcategory.as_str(),
            amount.as_str(),
            validated.description.as_str(),
            validated.recorded_at.unix_timestamp(),
            created_by,
        ),
    )
    .await?;
    Ok(())
}

pub async fn list_records(
    State(db): State<Db>,
    session: Session,
) -> Result<(StatusCode, Json<Vec<Record>>), ApiError> {
    get_current_user(&db, &session).await?;
    let records = fetch_records(&db, None).await?;
    Ok((StatusCode::OK, Json(records)))
}

pub async fn create_record(
    State(db): State<Db>,
    session: Session,
    Json(payload): Json<RecordPayload>,
) -> Result<(StatusCode, Json<Record>), ApiError> {
    let user = get_current_user(&db, &session).await?;
    let validated = validate_record(payload)?;

    let id = Uuid::new_v4().to_string();
    let conn = db.write().await;
    insert_record(&conn, &id, &validated, &user.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(Record {
            id,
            category: validated.category,
            subcategory: validated.subcategory,
            amount: validated.amount,
            description: validated.description,
            recorded_at: validated.recorded_at,
            created_by: user.id,
        }),
    ))
}

pub async fn get_record(
    State(db): State<Db>,
    session: Session,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<Record>), ApiError> {
    get_current_user(&db, &session).await?;

    let conn = db.read().await;
    let mut rows = conn
        .query(
            &format!("{SELECT_RECORD_COLUMNS} WHERE id = ?"),
            [id.as_str()],
        )
        .await?;

    match rows.next().await? {
        Some(row) => Ok((StatusCode::OK, Json(record_from_row(&row)?))),
        None => Err(ApiError::NotFound("record")),
    }
}

/// Full-record edit; `created_by` keeps its original value.
pub async fn update_record(
    State(db): State<Db>,
    session: Session,
    Path(id): Path<String>,
    Json(payload): Json<RecordPayload>,
) -> Result<(StatusCode, Json<Record>), ApiError> {
    get_current_user(&db, &session).await?;
    let validated = validate_record(payload)?;

    let conn = db.write().await;
    let amount = validated.amount.to_string();
    let affected = conn
        .execute(
            "UPDATE records
             SET category = ?, subcategory = ?, amount = ?, description = ?, recorded_at = ?
             WHERE id = ?",
            (
                validated.category.as_str(),
                validated.subcategory.as_str(),
                amount.as_str(),
                validated.description.as_str(),
                validated.recorded_at.unix_timestamp(),
                id.as_str(),
            ),
        )
        .await?;
    if affected == 0 {
        return Err(ApiError::NotFound("record"));
    }

    let mut rows = conn
        .query(
            &format!("{SELECT_RECORD_COLUMNS} WHERE id = ?"),
            [id.as_str()],
        )
        .await?;
    match rows.next().await? {
        Some(row) => Ok((StatusCode::OK, Json(record_from_row(&row)?))),
        None => Err(ApiError::NotFound("record")),
    }
}

pub async fn delete_record(
    State(db): State<Db>,
    session: Session,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    get_current_user(&db, &session).await?;

    let conn = db.write().await;
    let affected = conn
        .execute("DELETE FROM records WHERE id = ?", [id.as_str()])
        .await?;
    if affected == 0 {
        return Err(ApiError::NotFound("record"));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    category: String,
    subcategory: Option<String>,
    amount: String,
    description: Option<String>,
    recorded_at: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub status: &'static str,
    pub inserted: u64,
}

/// Bulk import. Every row is validated up front and the batch is written in
/// one transaction: a single bad row aborts the whole upload and inserts
/// nothing.
pub async fn import_csv(db: &Db, body: &str, created_by: &str) -> Result<u64, ApiError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(body.as_bytes());

    let mut prepared: Vec<(String, ValidatedRecord)> = Vec::new();
    let mut errors: Vec<FieldError> = Vec::new();
    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let line = index + 1;
        let row = match result {
            Ok(row) => row,
            Err(err) => {
                return Err(ApiError::BadRequest(format!("invalid CSV: {err}")));
            }
        };

        let amount = match Decimal::from_str(row.amount.trim()) {
            Ok(amount) => amount,
            Err(_) => {
                errors.push(FieldError::new(
                    "amount",
                    format!("row {line}: amount '{}' is not a decimal number", row.amount),
                ));
                continue;
            }
        };

        let payload = RecordPayload {
            category: row.category,
            subcategory: row.subcategory,
            amount,
            description: row.description,
            recorded_at: row.recorded_at,
        };
        match validate_record(payload) {
            Ok(validated) => prepared.push((Uuid::new_v4().to_string(), validated)),
            Err(row_errors) => {
                errors.extend(row_errors.into_iter().map(|err| FieldError {
                    field: err.field,
                    message: format!("row {line}: {}", err.message),
                }));
            }
        }
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let inserted = prepared.len() as u64;
    let conn = db.write().await;
    let tx = conn.transaction().await?;
    for (id, validated) in &prepared {
        insert_record(&tx, id, validated, created_by).await?;
    }
    tx.commit().await?;
    Ok(inserted)
}

pub async fn upload_csv(
    State(db): State<Db>,
    session: Session,
    body: String,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let user = get_current_user(&db, &session).await?;
    let inserted = import_csv(&db, &body, &user.id).await?;
    Ok((
        StatusCode::OK,
        Json(UploadResponse {
            status: "ok",
            inserted,
        }),
    ))
}
