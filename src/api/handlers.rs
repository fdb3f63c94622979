use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::application::{AppError, EstimateService, RawEstimateRequest};
use crate::domain::{Estimate, FxRate};

pub const LOCATION_HINT: &str =
    "Pass city and state abbreviation like 'Anaheim Co... (CA)', 'Phoenix (AZ)'.";

/// Successful estimate body: the estimate fields with an `ok` flag alongside.
#[derive(Debug, Serialize)]
pub struct EstimateResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub estimate: Estimate,
}

/// An [`AppError`] on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.0 {
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                json!({ "ok": false, "errors": errors }),
            ),
            AppError::LocationNotFound { .. } => (
                StatusCode::NOT_FOUND,
                json!({ "ok": false, "error": self.0.to_string(), "hint": LOCATION_HINT }),
            ),
            AppError::MissingReferenceData(_)
            | AppError::InvalidReferenceData { .. }
            | AppError::AmountOutOfRange { .. }
            | AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "ok": false, "error": self.0.to_string() }),
            ),
        };

        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self.0, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self.0, "Request rejected");
        }

        (status, Json(body)).into_response()
    }
}

/// POST /api/estimate
pub async fn estimate(
    State(service): State<Arc<EstimateService>>,
    body: Bytes,
) -> Result<Json<EstimateResponse>, ApiError> {
    let raw = parse_body(&body)?;
    let estimate = service.estimate_raw(&raw).await?;
    Ok(Json(EstimateResponse { ok: true, estimate }))
}

/// GET /api/fx
pub async fn fx(State(service): State<Arc<EstimateService>>) -> Result<Json<FxRate>, ApiError> {
    Ok(Json(service.fx().await?))
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

// The body is read leniently: anything that is a JSON object goes on to
// field validation, everything else is a single request error.
fn parse_body(body: &[u8]) -> Result<RawEstimateRequest, AppError> {
    let not_an_object = || AppError::Validation(vec!["body must be a JSON object".to_string()]);

    let value: Value = serde_json::from_slice(body).map_err(|_| not_an_object())?;
    if !value.is_object() {
        return Err(not_an_object());
    }
    serde_json::from_value(value).map_err(|_| not_an_object())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_body_accepts_objects() {
        let raw = parse_body(br#"{"year": 2015, "vin": "1HG"}"#).unwrap();
        assert_eq!(raw.year, Some(json!(2015)));
        assert_eq!(raw.vin, Some(json!("1HG")));
        assert!(raw.price.is_none());
    }

    #[test]
    fn test_parse_body_rejects_non_objects() {
        let bodies: [&[u8]; 4] = [b"[1,2]", b"\"text\"", b"not json", b""];
        for body in bodies {
            match parse_body(body) {
                Err(AppError::Validation(errors)) => {
                    assert_eq!(errors, vec!["body must be a JSON object"])
                }
                other => panic!("expected validation error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_error_status_codes() {
        let status = |err: AppError| ApiError(err).into_response().status();

        assert_eq!(
            status(AppError::Validation(vec!["vin is required".into()])),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(AppError::LocationNotFound {
                location: "Nowhere (ZZ)".into(),
                platform: crate::domain::Platform::Copart,
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(AppError::MissingReferenceData(vec!["ports".into()])),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status(AppError::AmountOutOfRange { port: "Port Everglades".into() }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
