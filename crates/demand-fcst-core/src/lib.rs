//! Core demand forecasting library for retail replenishment.
//!
//! This crate turns raw transaction-level sales records into short-horizon
//! per-product demand forecasts: it prepares per-product daily series,
//! fits one additive decomposition model per product (changepoint-tolerant
//! trend, weekly and yearly seasonality, promotion and weekend
//! regressors), and reduces out-of-sample predictions into summary rows
//! for inventory and replenishment decisions.

pub mod aggregate;
pub mod changepoint;
pub mod error;
pub mod forecaster;
pub mod model;
pub mod registry;
pub mod series;
pub mod stats;

// Re-exports for convenience
pub use aggregate::{summarize, ForecastSummary};
pub use changepoint::detect_trend_changepoints;
pub use error::{ForecastError, Result};
pub use forecaster::{DemandForecaster, FitReport, DEFAULT_HORIZON_DAYS, MAX_HORIZON_DAYS};
pub use model::{DemandModel, ForecastPoint, ModelConfig};
pub use registry::ModelRegistry;
pub use series::{prepare_daily_series, DailySales, RawSaleRecord};
