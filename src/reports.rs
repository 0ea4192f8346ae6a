use std::collections::BTreeMap;

use anyhow::anyhow;
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tower_sessions::Session;

use crate::analysis::{Granularity, category_totals, summary_stats, time_series};
use crate::auth::get_current_user;
use crate::constants::RECORDS_LIST_CAP;
use crate::database::Db;
use crate::error::ApiError;
use crate::forms::DATE_FORMAT;
use crate::models::Record;
use crate::records::fetch_records;

// Field names and shapes on these responses are a published contract;
// dashboards parse them as-is.

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_records: u64,
    pub total_value: f64,
    pub categories: u64,
    pub avg_value: f64,
}

#[derive(Debug, Serialize)]
pub struct ChartDataResponse {
    pub categories: Vec<String>,
    pub values: Vec<f64>,
}

#[derive(Debug, Serialize)]
pub struct TimeseriesPoint {
    pub bucket: String,
    pub total: f64,
}

#[derive(Debug, Serialize)]
pub struct TimeseriesResponse {
    pub granularity: &'static str,
    pub points: Vec<TimeseriesPoint>,
}

#[derive(Debug, Deserialize)]
pub struct TimeseriesQuery {
    pub granularity: Option<String>,
}

fn to_float(value: rust_decimal::Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// GET /api/stats. Aggregates are computed on exact decimals and converted
/// to floats only here, at the serialization boundary.
pub async fn api_stats(State(db): State<Db>) -> Result<(StatusCode, Json<StatsResponse>), ApiError> {
    let records = fetch_records(&db, None).await?;
    let stats = summary_stats(&records);

    Ok((
        StatusCode::OK,
        Json(StatsResponse {
            total_records: stats.count,
            total_value: to_float(stats.total),
            categories: stats.distinct_categories,
            avg_value: to_float(stats.mean),
        }),
    ))
}

/// GET /api/chart-data. `categories[i]` and `values[i]` describe the same
/// category; ascending name order keeps the alignment deterministic.
pub async fn api_chart_data(
    State(db): State<Db>,
) -> Result<(StatusCode, Json<ChartDataResponse>), ApiError> {
    let records = fetch_records(&db, None).await?;
    let totals: BTreeMap<String, _> = category_totals(&records).into_iter().collect();

    let mut categories = Vec::with_capacity(totals.len());
    let mut values = Vec::with_capacity(totals.len());
    for (category, total) in totals {
        categories.push(category);
        values.push(to_float(total));
    }

    Ok((
        StatusCode::OK,
        Json(ChartDataResponse { categories, values }),
    ))
}

/// GET /api/records-list. Newest records first, capped.
pub async fn api_records_list(
    State(db): State<Db>,
) -> Result<(StatusCode, Json<Vec<Record>>), ApiError> {
    let records = fetch_records(&db, Some(RECORDS_LIST_CAP)).await?;
    Ok((StatusCode::OK, Json(records)))
}

/// Bucket sums formatted for plotting. An empty input yields a single zero
/// point for today (UTC) so a plotted line is never blank.
pub fn build_timeseries(
    records: &[Record],
    granularity: Granularity,
) -> Result<TimeseriesResponse, ApiError> {
    let series = time_series(records, granularity);

    let mut points = Vec::with_capacity(series.len().max(1));
    for bucket in series {
        points.push(TimeseriesPoint {
            bucket: bucket
                .start
                .format(DATE_FORMAT)
                .map_err(|err| anyhow!("failed to format bucket date: {err}"))?,
            total: to_float(bucket.total),
        });
    }
    if points.is_empty() {
        let today = OffsetDateTime::now_utc().date();
        points.push(TimeseriesPoint {
            bucket: today
                .format(DATE_FORMAT)
                .map_err(|err| anyhow!("failed to format bucket date: {err}"))?,
            total: 0.0,
        });
    }

    Ok(TimeseriesResponse {
        granularity: granularity.as_str(),
        points,
    })
}

/// GET /api/timeseries?granularity=day|week|month.
pub async fn api_timeseries(
    State(db): State<Db>,
    session: Session,
    Query(query): Query<TimeseriesQuery>,
) -> Result<(StatusCode, Json<TimeseriesResponse>), ApiError> {
    get_current_user(&db, &session).await?;

    let granularity = match query.granularity.as_deref() {
        Some(raw) => Granularity::parse(raw).ok_or_else(|| {
            ApiError::BadRequest(format!(
                "granularity '{raw}' is not one of day, week, month"
            ))
        })?,
        None => Granularity::Day,
    };

    let records = fetch_records(&db, None).await?;
    Ok((StatusCode::OK, Json(build_timeseries(&records, granularity)?)))
}
