//! Batch orchestration: prepare, fit per product, predict, summarize.
//!
//! The forecaster is the public entry point of the crate. A fit pass runs
//! the preparer once over the full sales history, fits one model per
//! catalog product in parallel, and publishes the results into the
//! registry in a single swap. Summaries are read-only against the
//! registry; products without a fitted model are silently omitted because
//! "no forecast for this product" is an expected, user-visible state.

use crate::aggregate::{summarize, ForecastSummary};
use crate::error::{ForecastError, Result};
use crate::model::{DemandModel, ModelConfig};
use crate::registry::ModelRegistry;
use crate::series::{prepare_daily_series, DailySales, RawSaleRecord};
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default forecast horizon in days.
pub const DEFAULT_HORIZON_DAYS: usize = 30;

/// Longest accepted forecast horizon in days.
pub const MAX_HORIZON_DAYS: usize = 365;

/// Outcome counts of a fit pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitReport {
    /// Products in the catalog the pass attempted to fit.
    pub products_attempted: usize,
    /// Products that ended up with a model in the registry.
    pub products_fitted: usize,
}

/// Demand forecaster over a catalog of products.
#[derive(Debug, Default)]
pub struct DemandForecaster {
    config: ModelConfig,
    registry: ModelRegistry,
}

impl DemandForecaster {
    /// Create a forecaster with the default model configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a forecaster with a custom model configuration.
    pub fn with_config(config: ModelConfig) -> Self {
        Self {
            config,
            registry: ModelRegistry::new(),
        }
    }

    /// Fit one model per catalog product from the raw sales history.
    ///
    /// Catalog membership, not sales presence, determines which products
    /// are attempted. Products with too little history or a failed
    /// regression are logged and skipped; they never abort the batch. The
    /// registry is replaced wholesale at the end of the pass, so a re-fit
    /// drops models for products no longer in the catalog.
    ///
    /// # Errors
    /// * `InvalidInput` when the sales history cannot be prepared at all
    ///   (malformed records). The registry is left untouched in that case.
    /// * `InvalidParameter` when the model configuration is itself invalid.
    pub fn fit(&self, sales: &[RawSaleRecord], product_ids: &[String]) -> Result<FitReport> {
        self.config.validate()?;
        let prepared = prepare_daily_series(sales)?;

        let mut by_product: HashMap<String, Vec<DailySales>> = HashMap::new();
        for row in prepared {
            by_product.entry(row.product_id.clone()).or_default().push(row);
        }

        // Each product is independent; fit them in parallel and publish
        // everything in one registry swap.
        let models: HashMap<String, Arc<DemandModel>> = product_ids
            .par_iter()
            .filter_map(|product_id| {
                let rows = by_product
                    .get(product_id)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                match DemandModel::fit(rows, &self.config) {
                    Ok(model) => Some((product_id.clone(), Arc::new(model))),
                    Err(ForecastError::InsufficientData { needed, got }) => {
                        debug!(product_id = %product_id, needed, got, "skipping product: insufficient history");
                        None
                    }
                    Err(err) => {
                        warn!(product_id = %product_id, error = %err, "skipping product: fit failed");
                        None
                    }
                }
            })
            .collect();

        let report = FitReport {
            products_attempted: product_ids.len(),
            products_fitted: models.len(),
        };

        self.registry.replace_all(models);
        info!(
            products_fitted = report.products_fitted,
            products_attempted = report.products_attempted,
            "fitted demand models"
        );

        Ok(report)
    }

    /// Summarize forecasts for the requested products over `days_ahead`.
    ///
    /// Read-only with respect to the registry. Products without a fitted
    /// model are omitted from the result, not zero-filled.
    ///
    /// # Errors
    /// Returns `InvalidParameter` when `days_ahead` is outside 1..=365.
    pub fn get_forecast_summary(
        &self,
        product_ids: &[String],
        days_ahead: usize,
    ) -> Result<Vec<ForecastSummary>> {
        if days_ahead == 0 || days_ahead > MAX_HORIZON_DAYS {
            return Err(ForecastError::InvalidParameter {
                param: "days_ahead".to_string(),
                value: days_ahead.to_string(),
                reason: format!("must be between 1 and {}", MAX_HORIZON_DAYS),
            });
        }

        let mut summaries = Vec::new();
        for product_id in product_ids {
            let Some(model) = self.registry.get(product_id) else {
                continue;
            };
            let points = model.predict(days_ahead);
            if let Some(summary) = summarize(product_id, &points) {
                summaries.push(summary);
            }
        }

        Ok(summaries)
    }

    /// Whether a fit pass has completed, for health/readiness reporting.
    pub fn is_fitted(&self) -> bool {
        self.registry.is_fitted()
    }

    /// Product ids that currently have a fitted model, sorted.
    pub fn fitted_product_ids(&self) -> Vec<String> {
        self.registry.product_ids()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Days, NaiveDate};

    fn sales_for(product_id: &str, start: NaiveDate, n_days: usize) -> Vec<RawSaleRecord> {
        (0..n_days)
            .map(|i| RawSaleRecord {
                date: start.checked_add_days(Days::new(i as u64)).unwrap(),
                product_id: product_id.to_string(),
                store_id: "S001".to_string(),
                quantity_sold: 40 + (i % 6) as u32,
                unit_price: 12.5,
                promotion_applied: i % 10 == 0,
            })
            .collect()
    }

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn start_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn test_forty_days_fit_thirty_day_summary() {
        // 40 daily records for P001, none for P002: only P001 gets a model
        // and only P001 appears in the summary.
        let forecaster = DemandForecaster::new();
        let sales = sales_for("P001", start_date(), 40);

        let report = forecaster.fit(&sales, &ids(&["P001", "P002"])).unwrap();
        assert_eq!(report.products_attempted, 2);
        assert_eq!(report.products_fitted, 1);
        assert!(forecaster.is_fitted());
        assert_eq!(forecaster.fitted_product_ids(), vec!["P001"]);

        let summaries = forecaster
            .get_forecast_summary(&ids(&["P001", "P002"]), 30)
            .unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].product_id, "P001");
        assert_eq!(summaries[0].forecast_period_days, 30);
        assert!(summaries[0].avg_daily_demand >= 0.0);
        assert!(summaries[0].total_demand_forecast >= 0.0);
    }

    #[test]
    fn test_short_history_is_omitted_everywhere() {
        let forecaster = DemandForecaster::new();
        let sales = sales_for("P001", start_date(), 29);

        let report = forecaster.fit(&sales, &ids(&["P001"])).unwrap();
        assert_eq!(report.products_fitted, 0);
        assert!(forecaster.is_fitted());

        let summaries = forecaster.get_forecast_summary(&ids(&["P001"]), 14).unwrap();
        assert!(summaries.is_empty());
    }

    #[test]
    fn test_horizon_range_is_enforced() {
        let forecaster = DemandForecaster::new();
        forecaster
            .fit(&sales_for("P001", start_date(), 40), &ids(&["P001"]))
            .unwrap();

        assert!(matches!(
            forecaster.get_forecast_summary(&ids(&["P001"]), 0),
            Err(ForecastError::InvalidParameter { .. })
        ));
        assert!(matches!(
            forecaster.get_forecast_summary(&ids(&["P001"]), 366),
            Err(ForecastError::InvalidParameter { .. })
        ));
        assert!(forecaster
            .get_forecast_summary(&ids(&["P001"]), MAX_HORIZON_DAYS)
            .is_ok());
    }

    #[test]
    fn test_malformed_records_abort_without_touching_registry() {
        let forecaster = DemandForecaster::new();
        forecaster
            .fit(&sales_for("P001", start_date(), 40), &ids(&["P001"]))
            .unwrap();

        let mut bad = sales_for("P001", start_date(), 40);
        bad[3].unit_price = -1.0;
        let err = forecaster.fit(&bad, &ids(&["P001"])).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidInput(_)));

        // The previous fit is still being served.
        assert_eq!(forecaster.fitted_product_ids(), vec!["P001"]);
    }

    #[test]
    fn test_refit_drops_products_no_longer_in_catalog() {
        let forecaster = DemandForecaster::new();
        let mut sales = sales_for("P001", start_date(), 45);
        sales.extend(sales_for("P002", start_date(), 45));

        forecaster.fit(&sales, &ids(&["P001", "P002"])).unwrap();
        assert_eq!(forecaster.fitted_product_ids(), vec!["P001", "P002"]);

        forecaster.fit(&sales, &ids(&["P002"])).unwrap();
        assert_eq!(forecaster.fitted_product_ids(), vec!["P002"]);
    }

    #[test]
    fn test_catalog_membership_determines_attempts() {
        // Sales exist for P001 but the catalog only lists P002, so nothing
        // is fitted.
        let forecaster = DemandForecaster::new();
        let report = forecaster
            .fit(&sales_for("P001", start_date(), 60), &ids(&["P002"]))
            .unwrap();
        assert_eq!(report.products_attempted, 1);
        assert_eq!(report.products_fitted, 0);
    }

    #[test]
    fn test_unfitted_forecaster_returns_empty_summaries() {
        let forecaster = DemandForecaster::new();
        assert!(!forecaster.is_fitted());
        let summaries = forecaster.get_forecast_summary(&ids(&["P001"]), 30).unwrap();
        assert!(summaries.is_empty());
    }
}
