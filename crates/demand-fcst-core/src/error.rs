//! Error types for the demand forecasting core.

use thiserror::Error;

/// Result type for forecasting operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Error types for demand forecasting operations.
#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid parameter '{param}' = '{value}': {reason}")]
    InvalidParameter {
        param: String,
        value: String,
        reason: String,
    },

    #[error("Insufficient data: need at least {needed} observations, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("Computation error: {0}")]
    ComputationError(String),
}

impl ForecastError {
    /// Whether this is the recognized per-product "cannot fit" outcome
    /// rather than a caller contract violation. Too little history and
    /// numerical failure on plenty of history are treated the same
    /// downstream: the product is skipped, siblings are unaffected.
    pub fn is_skippable_fit_outcome(&self) -> bool {
        matches!(
            self,
            ForecastError::InsufficientData { .. } | ForecastError::ComputationError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ForecastError::InsufficientData { needed: 30, got: 12 };
        assert_eq!(
            format!("{}", err),
            "Insufficient data: need at least 30 observations, got 12"
        );

        let err = ForecastError::InvalidParameter {
            param: "days_ahead".into(),
            value: "0".into(),
            reason: "must be between 1 and 365".into(),
        };
        assert_eq!(
            format!("{}", err),
            "Invalid parameter 'days_ahead' = '0': must be between 1 and 365"
        );

        let err = ForecastError::InvalidInput("unit_price must be positive".into());
        assert_eq!(
            format!("{}", err),
            "Invalid input: unit_price must be positive"
        );
    }

    #[test]
    fn test_skippable_classification() {
        assert!(ForecastError::InsufficientData { needed: 30, got: 5 }.is_skippable_fit_outcome());
        assert!(
            ForecastError::ComputationError("singular design".into()).is_skippable_fit_outcome()
        );
        assert!(!ForecastError::InvalidInput("bad record".into()).is_skippable_fit_outcome());
        assert!(!ForecastError::InvalidParameter {
            param: "days_ahead".into(),
            value: "400".into(),
            reason: "out of range".into(),
        }
        .is_skippable_fit_outcome());
    }
}
