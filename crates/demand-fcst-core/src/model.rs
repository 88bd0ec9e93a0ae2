//! Per-product additive demand model.
//!
//! Each product gets one independent model of the form
//!
//! ```text
//! demand(t) = trend(t) + weekly(t) + yearly(t)
//!           + beta_promo * promotion(t) + beta_weekend * is_weekend(t) + noise
//! ```
//!
//! The trend is piecewise linear with hinges at detected changepoints, the
//! seasonal terms are low-order Fourier expansions (period 7 and 365.25),
//! and the two binary regressors enter linearly. Everything is estimated in
//! a single least-squares pass over the design matrix, so a re-fit on the
//! same history reproduces identical parameters.
//!
//! Dates need not be contiguous: each observation contributes one design
//! row at its own position on the time axis, so gaps in the history simply
//! mean missing rows.

use crate::changepoint::detect_trend_changepoints;
use crate::error::{ForecastError, Result};
use crate::series::DailySales;
use crate::stats;
use anofox_regression::prelude::*;
use chrono::{Datelike, Days, NaiveDate, Weekday};
use statrs::distribution::{ContinuousCDF, Normal};
use std::f64::consts::TAU;
use std::time::{Duration, Instant};

/// Days per year used for the yearly seasonal period.
const YEARLY_PERIOD: f64 = 365.25;

/// Days per week used for the weekly seasonal period.
const WEEKLY_PERIOD: f64 = 7.0;

/// Configuration for per-product model fitting.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Minimum observed (date, quantity) points required to fit.
    pub min_observations: usize,
    /// Fourier order for the weekly component. Kept below 3 so the
    /// day-of-week space is not fully spanned and the weekend regressor
    /// stays identifiable next to the intercept.
    pub weekly_fourier_order: usize,
    /// Fourier order for the yearly component. The yearly terms are only
    /// included once the observed span covers a full year.
    pub yearly_fourier_order: usize,
    /// Maximum number of trend changepoints.
    pub max_changepoints: usize,
    /// Minimum observations between two changepoints.
    pub min_changepoint_segment: usize,
    /// Nominal coverage of the prediction interval, in (0, 1).
    pub interval_width: f64,
    /// Per-product fit time budget. An over-budget fit fails that product
    /// only, it never blocks the rest of the batch.
    pub fit_time_budget: Duration,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            min_observations: 30,
            weekly_fourier_order: 2,
            yearly_fourier_order: 2,
            max_changepoints: 5,
            min_changepoint_segment: 7,
            interval_width: 0.80,
            fit_time_budget: Duration::from_secs(5),
        }
    }
}

impl ModelConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.min_observations == 0 {
            return Err(ForecastError::InvalidParameter {
                param: "min_observations".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if !(0.0 < self.interval_width && self.interval_width < 1.0) {
            return Err(ForecastError::InvalidParameter {
                param: "interval_width".to_string(),
                value: format!("{}", self.interval_width),
                reason: "must be in (0, 1)".to_string(),
            });
        }
        Ok(())
    }
}

/// One forecasted future day.
///
/// Raw model output: the point estimate may be negative, clamping to valid
/// demand happens at summary time.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub point_estimate: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

/// Fitted parameters for one product. Immutable after creation; a re-fit
/// builds a fresh model and replaces the old one wholesale.
#[derive(Debug, Clone)]
pub struct DemandModel {
    /// Coefficients for the retained design columns, in column order.
    coefficients: Vec<f64>,
    /// Indices into the full design row (see `design_row`) of the columns
    /// that survived the constant-column filter at fit time.
    active_columns: Vec<usize>,
    intercept: f64,
    /// Changepoint locations on the scaled time axis.
    changepoints: Vec<f64>,
    weekly_order: usize,
    yearly_order: usize,
    /// In-sample residual standard deviation.
    sigma: f64,
    /// Normal quantile matching the configured interval width.
    z_value: f64,
    n_obs: usize,
    train_start: NaiveDate,
    train_end: NaiveDate,
    /// Training span in days, used to scale the time axis to [0, 1].
    span_days: f64,
}

impl DemandModel {
    /// Fit the additive model to one product's daily series.
    ///
    /// # Arguments
    /// * `rows` - The product's (date, quantity) rows; gaps are allowed
    /// * `config` - Fitting configuration
    ///
    /// # Errors
    /// * `InsufficientData` when fewer than `min_observations` rows exist
    /// * `ComputationError` when the regression fails, produces non-finite
    ///   parameters, or exceeds the fit time budget
    pub fn fit(rows: &[DailySales], config: &ModelConfig) -> Result<DemandModel> {
        config.validate()?;

        if rows.len() < config.min_observations {
            return Err(ForecastError::InsufficientData {
                needed: config.min_observations,
                got: rows.len(),
            });
        }

        let started = Instant::now();

        let mut rows: Vec<&DailySales> = rows.iter().collect();
        rows.sort_by_key(|r| r.date);

        let train_start = rows[0].date;
        let train_end = rows[rows.len() - 1].date;
        let span_days = ((train_end - train_start).num_days() as f64).max(1.0);

        let quantities: Vec<f64> = rows.iter().map(|r| r.total_quantity_sold).collect();

        let changepoint_indices = detect_trend_changepoints(
            &quantities,
            config.min_changepoint_segment,
            config.max_changepoints,
        );
        if started.elapsed() > config.fit_time_budget {
            return Err(ForecastError::ComputationError(
                "fit exceeded time budget during changepoint detection".to_string(),
            ));
        }

        let scaled_time: Vec<f64> = rows
            .iter()
            .map(|r| (r.date - train_start).num_days() as f64 / span_days)
            .collect();
        let changepoints: Vec<f64> = changepoint_indices.iter().map(|&i| scaled_time[i]).collect();

        // Yearly seasonality is unidentifiable from a partial cycle.
        let yearly_order = if span_days >= YEARLY_PERIOD {
            config.yearly_fourier_order
        } else {
            0
        };

        let n = rows.len();
        let mut columns: Vec<Vec<f64>> = Vec::new();
        for (i, row) in rows.iter().enumerate() {
            let day_index = (row.date - train_start).num_days() as f64;
            let design = design_row(
                scaled_time[i],
                day_index,
                if row.promotion_applied { 1.0 } else { 0.0 },
                if row.is_weekend { 1.0 } else { 0.0 },
                &changepoints,
                config.weekly_fourier_order,
                yearly_order,
            );
            if columns.is_empty() {
                columns = vec![Vec::with_capacity(n); design.len()];
            }
            for (j, v) in design.into_iter().enumerate() {
                columns[j].push(v);
            }
        }

        // A constant column (a promotion-free history, an always-promoted
        // one, no weekend observations) carries no information and makes
        // the solve rank-deficient. Drop such columns and remember which
        // positions survived so prediction stays aligned; a dropped
        // regressor contributes 0 to the forecast, which for promotion
        // matches the future-promotion-is-0 assumption anyway.
        let active_columns: Vec<usize> = columns
            .iter()
            .enumerate()
            .filter(|(_, col)| col.iter().any(|v| (v - col[0]).abs() > f64::EPSILON))
            .map(|(j, _)| j)
            .collect();

        // Single joint least-squares pass over trend, seasonality and
        // regressors: n rows x k columns, intercept handled by the solver.
        let k = active_columns.len();
        let x_mat = faer::Mat::from_fn(n, k, |i, j| columns[active_columns[j]][i]);
        let y_col = faer::Col::from_fn(n, |i| quantities[i]);

        let fitted = OlsRegressor::builder()
            .with_intercept(true)
            .build()
            .fit(&x_mat, &y_col)
            .map_err(|e| ForecastError::ComputationError(format!("OLS fit failed: {:?}", e)))?;

        let intercept = fitted.intercept().unwrap_or(0.0);
        let coeffs_col = fitted.coefficients();
        let mut coefficients = Vec::with_capacity(k);
        for i in 0..coeffs_col.nrows() {
            coefficients.push(coeffs_col[i]);
        }

        if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ForecastError::ComputationError(
                "regression produced non-finite coefficients".to_string(),
            ));
        }

        let predictions = fitted.predict(&x_mat);
        let residuals: Vec<f64> = (0..n).map(|i| quantities[i] - predictions[i]).collect();
        let sigma = stats::std_dev(&residuals);
        if !sigma.is_finite() {
            return Err(ForecastError::ComputationError(
                "regression produced non-finite residuals".to_string(),
            ));
        }

        if started.elapsed() > config.fit_time_budget {
            return Err(ForecastError::ComputationError(
                "fit exceeded time budget".to_string(),
            ));
        }

        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| ForecastError::ComputationError(format!("normal quantile: {}", e)))?;
        let z_value = normal.inverse_cdf(0.5 + config.interval_width / 2.0);

        Ok(DemandModel {
            coefficients,
            active_columns,
            intercept,
            changepoints,
            weekly_order: config.weekly_fourier_order,
            yearly_order,
            sigma,
            z_value,
            n_obs: n,
            train_start,
            train_end,
            span_days,
        })
    }

    /// Forecast the next `n_days` calendar days after the training range.
    ///
    /// Future dates are contiguous starting the day after the last training
    /// date, regardless of gaps in the history. The future promotion
    /// regressor is assumed 0 (no promotions planned); is_weekend is
    /// derived from the date. Interval half-widths grow with forecast
    /// distance to reflect extrapolation uncertainty.
    pub fn predict(&self, n_days: usize) -> Vec<ForecastPoint> {
        let mut points = Vec::with_capacity(n_days);

        for h in 1..=n_days {
            let Some(date) = self.train_end.checked_add_days(Days::new(h as u64)) else {
                break;
            };
            let day_index = (date - self.train_start).num_days() as f64;
            let t = day_index / self.span_days;
            let is_weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);

            let design = design_row(
                t,
                day_index,
                0.0,
                if is_weekend { 1.0 } else { 0.0 },
                &self.changepoints,
                self.weekly_order,
                self.yearly_order,
            );

            let point_estimate = self.intercept
                + self
                    .active_columns
                    .iter()
                    .zip(self.coefficients.iter())
                    .map(|(&j, b)| design[j] * b)
                    .sum::<f64>();

            let half_width =
                self.z_value * self.sigma * (1.0 + h as f64 / self.n_obs as f64).sqrt();

            points.push(ForecastPoint {
                date,
                point_estimate,
                lower_bound: point_estimate - half_width,
                upper_bound: point_estimate + half_width,
            });
        }

        points
    }

    /// Last date of the training range.
    pub fn train_end(&self) -> NaiveDate {
        self.train_end
    }

    /// First date of the training range.
    pub fn train_start(&self) -> NaiveDate {
        self.train_start
    }

    /// Number of observations the model was trained on.
    pub fn n_obs(&self) -> usize {
        self.n_obs
    }

    /// In-sample residual standard deviation.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Fitted coefficients in design-column order, preceded by the intercept.
    pub fn parameters(&self) -> Vec<f64> {
        let mut params = Vec::with_capacity(self.coefficients.len() + 1);
        params.push(self.intercept);
        params.extend_from_slice(&self.coefficients);
        params
    }

    /// Fitted promotion coefficient. 0 when the history had no variation
    /// in the promotion flag and the column was dropped.
    pub fn beta_promotion(&self) -> f64 {
        // promo is the second-to-last column of the full design row
        self.coefficient_at(self.design_width() - 2)
    }

    /// Fitted weekend coefficient. 0 when the history had no variation in
    /// the weekend flag and the column was dropped.
    pub fn beta_weekend(&self) -> f64 {
        self.coefficient_at(self.design_width() - 1)
    }

    /// Width of the full design row before constant-column filtering.
    fn design_width(&self) -> usize {
        1 + self.changepoints.len() + 2 * (self.weekly_order + self.yearly_order) + 2
    }

    fn coefficient_at(&self, column: usize) -> f64 {
        self.active_columns
            .iter()
            .position(|&j| j == column)
            .map(|p| self.coefficients[p])
            .unwrap_or(0.0)
    }
}

/// Build one design row, without the intercept column.
///
/// Column order: global slope, one hinge per changepoint, weekly Fourier
/// pairs, yearly Fourier pairs (when enabled), promotion, is_weekend.
fn design_row(
    t: f64,
    day_index: f64,
    promotion: f64,
    is_weekend: f64,
    changepoints: &[f64],
    weekly_order: usize,
    yearly_order: usize,
) -> Vec<f64> {
    let mut row =
        Vec::with_capacity(1 + changepoints.len() + 2 * (weekly_order + yearly_order) + 2);

    row.push(t);
    for &cp in changepoints {
        row.push((t - cp).max(0.0));
    }
    for k in 1..=weekly_order {
        let phase = TAU * k as f64 * day_index / WEEKLY_PERIOD;
        row.push(phase.sin());
        row.push(phase.cos());
    }
    for k in 1..=yearly_order {
        let phase = TAU * k as f64 * day_index / YEARLY_PERIOD;
        row.push(phase.sin());
        row.push(phase.cos());
    }
    row.push(promotion);
    row.push(is_weekend);

    row
}
