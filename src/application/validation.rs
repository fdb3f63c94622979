use serde::Deserialize;
use serde_json::Value;

use crate::domain::{to_cents, Cents, EstimateRequest, Platform};

use super::AppError;

/// Estimate request as it arrives on the wire, before validation. Fields are
/// loosely typed: numbers may come as numeric strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEstimateRequest {
    #[serde(default)]
    pub year: Option<Value>,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub location: Option<Value>,
    #[serde(default)]
    pub platform: Option<Value>,
    #[serde(default)]
    pub vin: Option<Value>,
    #[serde(default)]
    pub engine_size: Option<Value>,
    #[serde(default)]
    pub vehicle_type: Option<Value>,
}

/// Highest auction price accepted, in whole dollars.
pub const MAX_PRICE_USD: Cents = 10_000_000;

/// Read a JSON value as a number. Numeric strings are accepted; anything
/// else (null, bool, objects, unparsable text) is not a number.
fn as_number(value: Option<&Value>) -> Option<f64> {
    let number = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

/// Read a JSON value as text. Numbers are rendered; null and other types
/// read as empty.
fn as_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Validate a raw request, collecting every field error instead of stopping
/// at the first.
pub fn validate_request(raw: &RawEstimateRequest) -> Result<EstimateRequest, AppError> {
    let mut errors = Vec::new();

    let year = match as_number(raw.year.as_ref()) {
        None => {
            errors.push("year is required".to_string());
            None
        }
        Some(y) if y == 0.0 => {
            errors.push("year is required".to_string());
            None
        }
        Some(y) if y < 0.0 || y.fract() != 0.0 || y > u32::MAX as f64 => {
            errors.push("year must be a positive integer".to_string());
            None
        }
        Some(y) => Some(y as u32),
    };

    let price = match as_number(raw.price.as_ref()).map(to_cents) {
        None | Some(0) => {
            errors.push("price is required".to_string());
            None
        }
        Some(p) if p < 0 => {
            errors.push("price must be a positive number".to_string());
            None
        }
        Some(p) if p > MAX_PRICE_USD * 100 => {
            errors.push(format!("price must be at most {}", MAX_PRICE_USD));
            None
        }
        Some(p) => Some(p),
    };

    let location = as_text(raw.location.as_ref());
    if location.is_empty() {
        errors.push("location is required".to_string());
    }

    let platform = Platform::from_str(&as_text(raw.platform.as_ref()));
    if platform.is_none() {
        errors.push("platform must be 'copart' or 'iaai'".to_string());
    }

    let vin = as_text(raw.vin.as_ref());
    if vin.is_empty() {
        errors.push("vin is required".to_string());
    }

    let engine_size = as_number(raw.engine_size.as_ref());
    let vehicle_type = Some(as_text(raw.vehicle_type.as_ref())).filter(|s| !s.is_empty());

    match (year, price, platform) {
        (Some(year), Some(price), Some(platform)) if errors.is_empty() => Ok(EstimateRequest {
            year,
            price,
            location,
            platform,
            vin,
            engine_size,
            vehicle_type,
        }),
        _ => Err(AppError::Validation(errors)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawEstimateRequest {
        serde_json::from_value(value).unwrap()
    }

    fn errors_of(result: Result<EstimateRequest, AppError>) -> Vec<String> {
        match result {
            Err(AppError::Validation(errors)) => errors,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_request() {
        let request = validate_request(&raw(json!({
            "year": 2015,
            "price": 4000,
            "location": "Dallas (TX)",
            "platform": "Copart",
            "vin": "JA4AZ3A38LZ000000",
            "engineSize": 2.4
        })))
        .unwrap();

        assert_eq!(request.year, 2015);
        assert_eq!(request.price, 4000_00);
        assert_eq!(request.platform, Platform::Copart);
        assert_eq!(request.engine_size, Some(2.4));
        assert_eq!(request.vehicle_type, None);
    }

    #[test]
    fn test_numeric_strings_are_accepted() {
        let request = validate_request(&raw(json!({
            "year": "2018",
            "price": " 1234.56 ",
            "location": "Phoenix (AZ)",
            "platform": "iaai",
            "vin": "1HGCM82633A004352",
            "engineSize": "1.5",
            "vehicleType": "small_cars"
        })))
        .unwrap();

        assert_eq!(request.year, 2018);
        assert_eq!(request.price, 1234_56);
        assert_eq!(request.engine_size, Some(1.5));
        assert_eq!(request.vehicle_type.as_deref(), Some("small_cars"));
    }

    #[test]
    fn test_all_errors_are_reported_together() {
        let errors = errors_of(validate_request(&raw(json!({}))));
        assert_eq!(
            errors,
            vec![
                "year is required",
                "price is required",
                "location is required",
                "platform must be 'copart' or 'iaai'",
                "vin is required",
            ]
        );
    }

    #[test]
    fn test_invalid_values() {
        let errors = errors_of(validate_request(&raw(json!({
            "year": 2015.5,
            "price": -10,
            "location": "   ",
            "platform": "manheim",
            "vin": "1HGCM82633A004352"
        }))));
        assert_eq!(
            errors,
            vec![
                "year must be a positive integer",
                "price must be a positive number",
                "location is required",
                "platform must be 'copart' or 'iaai'",
            ]
        );
    }

    #[test]
    fn test_non_numeric_engine_size_is_ignored() {
        let request = validate_request(&raw(json!({
            "year": 2015,
            "price": "abc5",
            "location": "Dallas (TX)",
            "platform": "copart",
            "vin": "JA4",
            "engineSize": "big"
        })));
        assert_eq!(errors_of(request), vec!["price is required"]);

        let request = validate_request(&raw(json!({
            "year": 2015,
            "price": 5000,
            "location": "Dallas (TX)",
            "platform": "copart",
            "vin": "JA4",
            "engineSize": "big"
        })))
        .unwrap();
        assert_eq!(request.engine_size, None);
    }

    #[test]
    fn test_price_upper_bound() {
        let body = |price: Value| {
            raw(json!({
                "year": 2015,
                "price": price,
                "location": "Dallas (TX)",
                "platform": "copart",
                "vin": "JA4AZ3A38LZ000000"
            }))
        };

        for price in [json!(1e16), json!(1e17), json!("1e300"), json!(10_000_000.01)] {
            assert_eq!(
                errors_of(validate_request(&body(price))),
                vec!["price must be at most 10000000"]
            );
        }
        let request = validate_request(&body(json!(10_000_000))).unwrap();
        assert_eq!(request.price, 10_000_000_00);
    }
}
