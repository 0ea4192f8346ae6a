/*!
 * Records Store Integration Tests
 *
 * This module contains integration tests for the records store and the CSV
 * import path, exercised against real database files.
 *
 * Test Categories:
 * - Retrieval (empty store, newest-first ordering, limits and the list cap)
 * - Amount integrity (decimal strings round-trip exactly, no float drift)
 * - Full-record updates (validation reuse, not-found semantics)
 * - CSV import (happy path, single-transaction atomicity, row-numbered errors)
 *
 * All tests use isolated temporary databases for complete test isolation.
 */

mod common;

use std::str::FromStr;

use common::*;
use ledgerette::constants::RECORDS_LIST_CAP;
use ledgerette::database::Db;
use ledgerette::error::ApiError;
use ledgerette::forms::validate_record;
use ledgerette::models::{Record, RecordPayload};
use ledgerette::records::{fetch_records, import_csv, record_from_row};
use rust_decimal::Decimal;
use time::macros::datetime;

// Test data constants - only for widely reused values
const TEST_BASE_TIMESTAMP: i64 = 1700000000; // Nov 14, 2023 22:13:20 UTC
const TEST_TIME_INCREMENT: i64 = 100; // 100 seconds between test records

fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).expect("test literal is a valid decimal")
}

fn payload(category: &str, amount: &str, recorded_at: &str) -> RecordPayload {
    RecordPayload {
        category: category.to_string(),
        subcategory: None,
        amount: dec(amount),
        description: None,
        recorded_at: recorded_at.to_string(),
    }
}

async fn seed_user(db: &Db) -> String {
    create_test_user(db, "tester", "User", "plain-seed-password").await
}

async fn create_sample_records(db: &Db, created_by: &str) {
    create_test_record(db, "food", "groceries", "10.50", TEST_BASE_TIMESTAMP, created_by).await;
    create_test_record(
        db,
        "transport",
        "",
        "25.75",
        TEST_BASE_TIMESTAMP + TEST_TIME_INCREMENT,
        created_by,
    )
    .await;
    create_test_record(
        db,
        "entertainment",
        "",
        "15.25",
        TEST_BASE_TIMESTAMP + TEST_TIME_INCREMENT * 2,
        created_by,
    )
    .await;
}

// Helper functions mirroring the single-record read and full-edit paths
async fn get_single_record_from_db(db: &Db, record_id: &str) -> Option<Record> {
    let conn = db.read().await;
    let mut rows = conn
        .query(
            "SELECT id, category, subcategory, amount, description, recorded_at, created_by
             FROM records WHERE id = ?",
            [record_id],
        )
        .await
        .ok()?;

    match rows.next().await.ok()? {
        Some(row) => record_from_row(&row).ok(),
        None => None,
    }
}

async fn update_record_in_db(
    db: &Db,
    record_id: &str,
    payload: RecordPayload,
) -> Result<Record, String> {
    // Reuse production validation so tests and handlers agree on the rules.
    let validated = validate_record(payload).map_err(|errors| errors[0].message.clone())?;

    let conn = db.write().await;
    let amount = validated.amount.to_string();
    let affected = conn
        .execute(
            "UPDATE records SET category = ?, subcategory = ?, amount = ?, description = ?, recorded_at = ?
             WHERE id = ?",
            (
                validated.category.as_str(),
                validated.subcategory.as_str(),
                amount.as_str(),
                validated.description.as_str(),
                validated.recorded_at.unix_timestamp(),
                record_id,
            ),
        )
        .await
        .map_err(|e| format!("Failed to update record: {}", e))?;
    drop(conn);

    if affected == 0 {
        return Err("Record not found".to_string());
    }
    get_single_record_from_db(db, record_id)
        .await
        .ok_or_else(|| "Record not found after update".to_string())
}

#[tokio::test]
async fn empty_database() {
    let (db, _temp_dir) = setup_test_db().await;

    let records = fetch_records(&db, None).await.expect("fetch failed");
    assert_eq!(records.len(), 0);
}

#[tokio::test]
async fn records_come_back_newest_first() {
    let (db, _temp_dir) = setup_test_db().await;
    let user_id = seed_user(&db).await;
    create_sample_records(&db, &user_id).await;

    let records = fetch_records(&db, None).await.expect("fetch failed");

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].category, "entertainment");
    assert_eq!(records[1].category, "transport");
    assert_eq!(records[2].category, "food");
    assert!(records[0].recorded_at > records[1].recorded_at);
    assert!(records[1].recorded_at > records[2].recorded_at);
}

#[tokio::test]
async fn ordering_consistency_with_close_timestamps() {
    let (db, _temp_dir) = setup_test_db().await;
    let user_id = seed_user(&db).await;

    create_test_record(&db, "first", "", "10", TEST_BASE_TIMESTAMP, &user_id).await;
    create_test_record(&db, "second", "", "20", TEST_BASE_TIMESTAMP + 1, &user_id).await;
    create_test_record(&db, "third", "", "30", TEST_BASE_TIMESTAMP + 2, &user_id).await;

    let records = fetch_records(&db, None).await.expect("fetch failed");

    assert_eq!(records[0].category, "third");
    assert_eq!(records[1].category, "second");
    assert_eq!(records[2].category, "first");
}

#[tokio::test]
async fn stored_amounts_round_trip_exactly() {
    let (db, _temp_dir) = setup_test_db().await;
    let user_id = seed_user(&db).await;

    // Classic float-drift values: 0.1 + 0.2, and a two-decimal price.
    create_test_record(&db, "a", "", "0.1", TEST_BASE_TIMESTAMP, &user_id).await;
    create_test_record(&db, "a", "", "0.2", TEST_BASE_TIMESTAMP + 1, &user_id).await;
    create_test_record(&db, "b", "", "10.10", TEST_BASE_TIMESTAMP + 2, &user_id).await;

    let records = fetch_records(&db, None).await.expect("fetch failed");

    assert_eq!(records[0].amount, dec("10.10"));
    assert_eq!(records[1].amount, dec("0.2"));
    assert_eq!(records[2].amount, dec("0.1"));

    let total = records
        .iter()
        .fold(Decimal::ZERO, |acc, record| acc + record.amount);
    assert_eq!(total, dec("10.40"));
}

#[tokio::test]
async fn limit_caps_results_but_keeps_order() {
    let (db, _temp_dir) = setup_test_db().await;
    let user_id = seed_user(&db).await;
    create_sample_records(&db, &user_id).await;

    let records = fetch_records(&db, Some(2)).await.expect("fetch failed");

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].category, "entertainment");
    assert_eq!(records[1].category, "transport");
}

#[tokio::test]
async fn list_cap_holds_at_fifty() {
    let (db, _temp_dir) = setup_test_db().await;
    let user_id = seed_user(&db).await;

    for i in 0..55 {
        create_test_record(
            &db,
            &format!("category-{}", i),
            "",
            "1",
            TEST_BASE_TIMESTAMP + i,
            &user_id,
        )
        .await;
    }

    let records = fetch_records(&db, Some(RECORDS_LIST_CAP))
        .await
        .expect("fetch failed");

    assert_eq!(records.len(), RECORDS_LIST_CAP as usize);
    // The cap keeps the newest rows.
    assert_eq!(records[0].category, "category-54");
    assert_eq!(records[49].category, "category-5");
}

#[tokio::test]
async fn get_single_record_returns_none_for_unknown_id() {
    let (db, _temp_dir) = setup_test_db().await;

    let found = get_single_record_from_db(&db, "no-such-record").await;
    assert!(found.is_none());
}

#[tokio::test]
async fn update_record_full_edit() {
    let (db, _temp_dir) = setup_test_db().await;
    let user_id = seed_user(&db).await;
    let record_id =
        create_test_record(&db, "food", "groceries", "10.50", TEST_BASE_TIMESTAMP, &user_id).await;

    let updated = update_record_in_db(
        &db,
        &record_id,
        payload("rent", "1200.00", "2024-02-01 09:00:00"),
    )
    .await
    .expect("Failed to update record");

    assert_eq!(updated.id, record_id);
    assert_eq!(updated.category, "rent");
    assert_eq!(updated.amount, dec("1200.00"));
    assert_eq!(updated.recorded_at, datetime!(2024-02-01 9:00 UTC));
    // created_by survives a full edit.
    assert_eq!(updated.created_by, user_id);
}

#[tokio::test]
async fn update_record_rejects_invalid_payload() {
    let (db, _temp_dir) = setup_test_db().await;
    let user_id = seed_user(&db).await;
    let record_id =
        create_test_record(&db, "food", "", "10", TEST_BASE_TIMESTAMP, &user_id).await;

    let result =
        update_record_in_db(&db, &record_id, payload("   ", "5", "2024-02-01 09:00:00")).await;

    assert!(result.is_err());
    assert!(result.unwrap_err().contains("category"));

    // The stored record is untouched.
    let stored = get_single_record_from_db(&db, &record_id)
        .await
        .expect("record should still exist");
    assert_eq!(stored.category, "food");
}

#[tokio::test]
async fn update_nonexistent_record_reports_not_found() {
    let (db, _temp_dir) = setup_test_db().await;

    let result = update_record_in_db(
        &db,
        "no-such-record",
        payload("rent", "1200", "2024-02-01 09:00:00"),
    )
    .await;

    assert!(result.is_err());
    assert!(result.unwrap_err().contains("not found"));
}

#[tokio::test]
async fn csv_import_inserts_all_rows() {
    let (db, _temp_dir) = setup_test_db().await;
    let user_id = seed_user(&db).await;

    let body = "category,subcategory,amount,description,recorded_at\n\
                food,groceries,10.10,weekly shop,2024-01-15 08:30:00\n\
                rent,,1200.00,,2024-01-01 00:00:00\n";

    let inserted = import_csv(&db, body, &user_id).await.expect("import failed");
    assert_eq!(inserted, 2);

    let records = fetch_records(&db, None).await.expect("fetch failed");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].category, "food");
    assert_eq!(records[0].amount, dec("10.10"));
    assert_eq!(records[0].created_by, user_id);
    assert_eq!(records[1].category, "rent");
    assert_eq!(records[1].amount, dec("1200.00"));
}

#[tokio::test]
async fn csv_import_is_atomic_on_bad_row() {
    let (db, _temp_dir) = setup_test_db().await;
    let user_id = seed_user(&db).await;

    // Row 2 has a non-numeric amount; the valid row 1 must not survive.
    let body = "category,subcategory,amount,description,recorded_at\n\
                food,,10.00,,2024-01-15 08:30:00\n\
                rent,,abc,,2024-01-01 00:00:00\n";

    let result = import_csv(&db, body, &user_id).await;
    assert!(matches!(result, Err(ApiError::Validation(_))));

    let records = fetch_records(&db, None).await.expect("fetch failed");
    assert_eq!(records.len(), 0);
}

#[tokio::test]
async fn csv_import_errors_carry_row_numbers() {
    let (db, _temp_dir) = setup_test_db().await;
    let user_id = seed_user(&db).await;

    let body = "category,subcategory,amount,description,recorded_at\n\
                food,,10.00,,2024-01-15 08:30:00\n\
                ,,5.00,,2024-01-16 08:30:00\n\
                rent,,abc,,2024-01-17 08:30:00\n";

    let result = import_csv(&db, body, &user_id).await;
    let Err(ApiError::Validation(errors)) = result else {
        panic!("expected a validation error");
    };

    assert_eq!(errors.len(), 2);
    assert!(errors.iter().any(|e| e.message.starts_with("row 2:")));
    assert!(errors.iter().any(|e| e.message.starts_with("row 3:")));
}

#[tokio::test]
async fn csv_import_accepts_date_only_rows() {
    let (db, _temp_dir) = setup_test_db().await;
    let user_id = seed_user(&db).await;

    let body = "category,subcategory,amount,description,recorded_at\n\
                food,,10.00,,2024-01-15\n";

    let inserted = import_csv(&db, body, &user_id).await.expect("import failed");
    assert_eq!(inserted, 1);

    let records = fetch_records(&db, None).await.expect("fetch failed");
    assert_eq!(records[0].recorded_at, datetime!(2024-01-15 0:00 UTC));
}

#[tokio::test]
async fn csv_import_empty_input_inserts_nothing() {
    let (db, _temp_dir) = setup_test_db().await;
    let user_id = seed_user(&db).await;

    let inserted = import_csv(&db, "", &user_id).await.expect("import failed");
    assert_eq!(inserted, 0);

    let records = fetch_records(&db, None).await.expect("fetch failed");
    assert_eq!(records.len(), 0);
}
