//! Reduction of raw forecast series into reporting summaries.

use crate::model::ForecastPoint;
use crate::stats;

/// Compact forecast summary for one product over a horizon.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSummary {
    pub product_id: String,
    /// Mean daily point estimate over the horizon, clamped to >= 0.
    pub avg_daily_demand: f64,
    /// Sum of point estimates over the horizon, clamped to >= 0.
    pub total_demand_forecast: f64,
    /// Number of forecasted days.
    pub forecast_period_days: usize,
}

/// Reduce a forecast series to a summary row.
///
/// Negative point estimates are a modeling artifact, not a valid demand
/// value, so the aggregates are clamped to zero. Values are rounded to two
/// decimals for reporting. Returns `None` for an empty series.
pub fn summarize(product_id: &str, points: &[ForecastPoint]) -> Option<ForecastSummary> {
    if points.is_empty() {
        return None;
    }

    let estimates: Vec<f64> = points.iter().map(|p| p.point_estimate).collect();
    let avg = stats::mean(&estimates).max(0.0);
    let total = estimates.iter().sum::<f64>().max(0.0);

    Some(ForecastSummary {
        product_id: product_id.to_string(),
        avg_daily_demand: round2(avg),
        total_demand_forecast: round2(total),
        forecast_period_days: points.len(),
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn points(estimates: &[f64]) -> Vec<ForecastPoint> {
        let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        estimates
            .iter()
            .enumerate()
            .map(|(i, &e)| ForecastPoint {
                date: start + chrono::Days::new(i as u64),
                point_estimate: e,
                lower_bound: e - 1.0,
                upper_bound: e + 1.0,
            })
            .collect()
    }

    #[test]
    fn test_summary_statistics() {
        let summary = summarize("P001", &points(&[10.0, 20.0, 30.0])).unwrap();
        assert_eq!(summary.product_id, "P001");
        assert_relative_eq!(summary.avg_daily_demand, 20.0);
        assert_relative_eq!(summary.total_demand_forecast, 60.0);
        assert_eq!(summary.forecast_period_days, 3);
    }

    #[test]
    fn test_negative_estimates_clamp_to_zero() {
        let summary = summarize("P001", &points(&[-5.0, -2.0, -8.0])).unwrap();
        assert_eq!(summary.avg_daily_demand, 0.0);
        assert_eq!(summary.total_demand_forecast, 0.0);
    }

    #[test]
    fn test_total_consistent_with_average() {
        let estimates: Vec<f64> = (0..30).map(|i| 40.0 + (i % 7) as f64 * 1.37).collect();
        let summary = summarize("P001", &points(&estimates)).unwrap();
        assert_relative_eq!(
            summary.total_demand_forecast,
            summary.avg_daily_demand * summary.forecast_period_days as f64,
            epsilon = 0.01 * summary.forecast_period_days as f64
        );
    }

    #[test]
    fn test_empty_series_has_no_summary() {
        assert!(summarize("P001", &[]).is_none());
    }

    #[test]
    fn test_rounding_to_two_decimals() {
        let summary = summarize("P001", &points(&[1.2345, 1.2345])).unwrap();
        assert_relative_eq!(summary.avg_daily_demand, 1.23);
        assert_relative_eq!(summary.total_demand_forecast, 2.47);
    }
}
