//! Preparation of per-product daily demand series from raw transactions.
//!
//! Raw records arrive one row per (date, product, store) sale. The preparer
//! collapses them to one row per (date, product) and derives the calendar
//! features the per-product model regresses on. Missing days are left
//! missing; the model is responsible for tolerating gaps.

use crate::error::{ForecastError, Result};
use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::BTreeMap;

/// One raw transaction-level sales record.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSaleRecord {
    pub date: NaiveDate,
    pub product_id: String,
    pub store_id: String,
    pub quantity_sold: u32,
    pub unit_price: f64,
    pub promotion_applied: bool,
}

/// One aggregated (date, product) row with calendar features.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySales {
    pub date: NaiveDate,
    pub product_id: String,
    /// Sum of quantity_sold across stores for this day.
    pub total_quantity_sold: f64,
    /// Mean unit price across contributing records.
    pub mean_unit_price: f64,
    /// True if any contributing record had a promotion.
    pub promotion_applied: bool,
    pub day_of_week: Weekday,
    pub month: u32,
    pub quarter: u32,
    pub is_weekend: bool,
}

impl DailySales {
    fn from_group(date: NaiveDate, product_id: String, group: &Accumulator) -> Self {
        let day_of_week = date.weekday();
        DailySales {
            date,
            product_id,
            total_quantity_sold: group.quantity as f64,
            mean_unit_price: group.price_sum / group.n_records as f64,
            promotion_applied: group.any_promotion,
            day_of_week,
            month: date.month(),
            quarter: (date.month() - 1) / 3 + 1,
            is_weekend: matches!(day_of_week, Weekday::Sat | Weekday::Sun),
        }
    }
}

#[derive(Debug, Default)]
struct Accumulator {
    quantity: u64,
    price_sum: f64,
    any_promotion: bool,
    n_records: usize,
}

/// Aggregate raw sales records into one row per (date, product_id).
///
/// Quantities are summed across stores, unit prices averaged, and promotion
/// flags OR-ed. Output rows are sorted by (product_id, date) and carry the
/// derived calendar features. The result is a pure function of the input
/// set: record order does not matter.
///
/// # Errors
/// Returns `InvalidInput` if any record is malformed (empty product id,
/// non-finite or non-positive unit price). Nothing is prepared in that case.
pub fn prepare_daily_series(records: &[RawSaleRecord]) -> Result<Vec<DailySales>> {
    let mut groups: BTreeMap<(String, NaiveDate), Accumulator> = BTreeMap::new();

    for record in records {
        validate_record(record)?;

        let entry = groups
            .entry((record.product_id.clone(), record.date))
            .or_default();
        entry.quantity += u64::from(record.quantity_sold);
        entry.price_sum += record.unit_price;
        entry.any_promotion |= record.promotion_applied;
        entry.n_records += 1;
    }

    Ok(groups
        .into_iter()
        .map(|((product_id, date), acc)| DailySales::from_group(date, product_id, &acc))
        .collect())
}

fn validate_record(record: &RawSaleRecord) -> Result<()> {
    if record.product_id.is_empty() {
        return Err(ForecastError::InvalidInput(
            "sale record has empty product_id".to_string(),
        ));
    }
    if !record.unit_price.is_finite() || record.unit_price <= 0.0 {
        return Err(ForecastError::InvalidInput(format!(
            "sale record for '{}' on {} has invalid unit_price {}",
            record.product_id, record.date, record.unit_price
        )));
    }
    Ok(())
}
