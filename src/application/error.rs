use thiserror::Error;

use crate::domain::{EstimateError, Platform};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid request: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Location not found for '{location}' on platform '{platform}'.")]
    LocationNotFound { location: String, platform: Platform },

    #[error(
        "Missing reference data: {}. Ensure fees:import, fx:usd_hnl, ports, and locations:* are populated.",
        .0.join(", ")
    )]
    MissingReferenceData(Vec<String>),

    #[error("Invalid reference data for '{key}': {}", .problems.join("; "))]
    InvalidReferenceData { key: String, problems: Vec<String> },

    #[error("Computed amounts out of range for the route via '{port}'.")]
    AmountOutOfRange { port: String },

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl From<EstimateError> for AppError {
    fn from(err: EstimateError) -> Self {
        match err {
            EstimateError::LocationNotFound { location, platform } => {
                AppError::LocationNotFound { location, platform }
            }
            EstimateError::AmountOutOfRange { port } => AppError::AmountOutOfRange { port },
        }
    }
}
