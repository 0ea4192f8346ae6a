use std::collections::{BTreeMap, HashMap, HashSet};

use rust_decimal::Decimal;
use time::{Date, Duration, UtcOffset};

use crate::models::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Day,
    Week,
    Month,
}

impl Granularity {
    pub fn parse(value: &str) -> Option<Granularity> {
        match value.to_ascii_lowercase().as_str() {
            "day" => Some(Granularity::Day),
            "week" => Some(Granularity::Week),
            "month" => Some(Granularity::Month),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryStats {
    pub count: u64,
    pub total: Decimal,
    pub mean: Decimal,
    pub distinct_categories: u64,
}

impl SummaryStats {
    pub fn empty() -> SummaryStats {
        SummaryStats {
            count: 0,
            total: Decimal::ZERO,
            mean: Decimal::ZERO,
            distinct_categories: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeBucket {
    pub start: Date,
    pub total: Decimal,
}

/// Count, exact total, exact mean, and distinct-category count for a record
/// snapshot. Empty input yields the all-zero summary instead of dividing by
/// zero.
pub fn summary_stats(records: &[Record]) -> SummaryStats {
    if records.is_empty() {
        return SummaryStats::empty();
    }

    let count = records.len() as u64;
    let total = records
        .iter()
        .fold(Decimal::ZERO, |acc, record| acc + record.amount);
    let mean = total / Decimal::from(count);
    let distinct_categories = records
        .iter()
        .map(|record| record.category.as_str())
        .collect::<HashSet<_>>()
        .len() as u64;

    SummaryStats {
        count,
        total,
        mean,
        distinct_categories,
    }
}

/// Sums amounts into calendar buckets. Only buckets containing at least one
/// record appear, ascending by bucket start; gaps are not zero-filled.
pub fn time_series(records: &[Record], granularity: Granularity) -> Vec<TimeBucket> {
    let mut buckets: BTreeMap<Date, Decimal> = BTreeMap::new();
    for record in records {
        let date = record.recorded_at.to_offset(UtcOffset::UTC).date();
        let start = bucket_start(date, granularity);
        *buckets.entry(start).or_insert(Decimal::ZERO) += record.amount;
    }

    buckets
        .into_iter()
        .map(|(start, total)| TimeBucket { start, total })
        .collect()
}

/// Bucket alignment is calendar-based in UTC: the date itself for `Day`, the
/// Monday of the ISO week for `Week`, the first of the month for `Month`.
pub fn bucket_start(date: Date, granularity: Granularity) -> Date {
    match granularity {
        Granularity::Day => date,
        Granularity::Week => {
            date - Duration::days(i64::from(date.weekday().number_days_from_monday()))
        }
        Granularity::Month => date
            .replace_day(1)
            .expect("the first of the month is a valid date"),
    }
}

/// Per-category sums. Categories absent from the input are absent from the
/// result, not zero.
pub fn category_totals(records: &[Record]) -> HashMap<String, Decimal> {
    let mut totals: HashMap<String, Decimal> = HashMap::new();
    for record in records {
        *totals
            .entry(record.category.clone())
            .or_insert(Decimal::ZERO) += record.amount;
    }
    totals
}
