use std::fmt;

/// Money is represented as integer cents to avoid floating-point drift across
/// the breakdown. For USD and HNL alike, 1 unit = 100 cents, so $50.00 = 5000.
pub type Cents = i64;

/// Absorbs representation error at the half-cent boundary before rounding
/// (e.g. 1.005 stored as 1.00499999...).
const ROUNDING_EPSILON: f64 = 1e-6;

/// Round an amount already expressed in (fractional) cents to whole cents,
/// half-up. Negative amounts round symmetrically.
pub fn round_cents(raw_cents: f64) -> Cents {
    if raw_cents < 0.0 {
        return -round_cents(-raw_cents);
    }
    (raw_cents + ROUNDING_EPSILON).round() as Cents
}

/// Convert a decimal amount (e.g. 4000.5 USD) to cents, rounding half-up.
pub fn to_cents(amount: f64) -> Cents {
    round_cents(amount * 100.0)
}

/// Convert cents back to a decimal amount.
pub fn from_cents(cents: Cents) -> f64 {
    cents as f64 / 100.0
}

/// Largest magnitude that survives the trip through `f64` and a JSON number
/// without losing a cent. Anything past it is treated as out of range.
pub const MAX_SAFE_CENTS: Cents = 1 << 53;

pub fn is_safe_cents(cents: Cents) -> bool {
    cents.unsigned_abs() <= MAX_SAFE_CENTS.unsigned_abs()
}

/// Add amounts, saturating at the `Cents` bounds instead of overflowing.
pub fn sum_cents(amounts: &[Cents]) -> Cents {
    amounts.iter().fold(0, |acc: Cents, cents| acc.saturating_add(*cents))
}

/// Apply a percentage (e.g. `15.0` for 15%) to an amount in cents.
pub fn percent_of(cents: Cents, pct: f64) -> Cents {
    round_cents(pct / 100.0 * cents as f64)
}

/// Multiply an amount by a plain factor (an FX rate, a flat tax ratio).
pub fn scale(cents: Cents, factor: f64) -> Cents {
    round_cents(cents as f64 * factor)
}

/// Divide an amount by a rate. A non-positive rate yields zero.
pub fn divide(cents: Cents, rate: f64) -> Cents {
    if rate <= 0.0 {
        return 0;
    }
    round_cents(cents as f64 / rate)
}

/// Format cents as a human-readable currency string.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.abs();
    let units = abs_cents / 100;
    let remainder = abs_cents % 100;
    format!("{}{}.{:02}", sign, units, remainder)
}

/// Format cents with thousands separators, e.g. 1234567 -> "12,345.67".
pub fn format_grouped(cents: Cents) -> String {
    let plain = format_cents(cents);
    let (sign, rest) = match plain.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", plain.as_str()),
    };
    let (units, decimals) = rest.split_once('.').unwrap_or((rest, "00"));

    let mut grouped = String::with_capacity(units.len() + units.len() / 3);
    for (i, ch) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}{}.{}", sign, grouped, decimals)
}

/// Parse a decimal string into cents.
/// Example: "50.00" -> 5000, "12.5" -> 1250, "100" -> 10000
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim().replace(',', "");
    let negative = input.starts_with('-');
    let input = input.trim_start_matches('-');

    let parts: Vec<&str> = input.split('.').collect();
    let (units_str, decimal_str) = match parts.as_slice() {
        [units] => (*units, ""),
        [units, decimals] => (*units, *decimals),
        _ => return Err(ParseCentsError::InvalidFormat),
    };

    if units_str.is_empty() && decimal_str.is_empty() {
        return Err(ParseCentsError::InvalidFormat);
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str
            .parse()
            .map_err(|_| ParseCentsError::InvalidFormat)?
    };

    // Two decimals are kept; the third rounds them half-up
    let digits = decimal_str.as_bytes();
    if !digits.iter().all(u8::is_ascii_digit) {
        return Err(ParseCentsError::InvalidFormat);
    }
    let digit = |i: usize| digits.get(i).map_or(0, |d| i64::from(d - b'0'));
    let decimal_cents = digit(0) * 10 + digit(1) + i64::from(digit(2) >= 5);

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(decimal_cents))
        .ok_or(ParseCentsError::OutOfRange)?;
    Ok(if negative { -cents } else { cents })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCentsError {
    InvalidFormat,
    OutOfRange,
}

impl fmt::Display for ParseCentsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCentsError::InvalidFormat => write!(f, "invalid money format"),
            ParseCentsError::OutOfRange => write!(f, "amount out of range"),
        }
    }
}

impl std::error::Error for ParseCentsError {}

/// Serde adapter writing cents as a two-place decimal number (`5310.0`,
/// `796.5`) and reading decimal numbers back into cents.
pub mod as_decimal {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{from_cents, to_cents, Cents};

    pub fn serialize<S: Serializer>(cents: &Cents, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(from_cents(*cents))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Cents, D::Error> {
        let amount = f64::deserialize(deserializer)?;
        Ok(to_cents(amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(5000), "50.00");
        assert_eq!(format_cents(1234), "12.34");
        assert_eq!(format_cents(1), "0.01");
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(-5000), "-50.00");
        assert_eq!(format_cents(-1), "-0.01");
    }

    #[test]
    fn test_format_grouped() {
        assert_eq!(format_grouped(0), "0.00");
        assert_eq!(format_grouped(99999), "999.99");
        assert_eq!(format_grouped(100000), "1,000.00");
        assert_eq!(format_grouped(13009275), "130,092.75");
        assert_eq!(format_grouped(-123456789), "-1,234,567.89");
    }

    #[test]
    fn test_parse_cents() {
        assert_eq!(parse_cents("50.00"), Ok(5000));
        assert_eq!(parse_cents("50"), Ok(5000));
        assert_eq!(parse_cents("12.5"), Ok(1250));
        assert_eq!(parse_cents(".50"), Ok(50));
        assert_eq!(parse_cents("4,000.00"), Ok(400000));
        assert_eq!(parse_cents("-50.00"), Ok(-5000));
    }

    #[test]
    fn test_parse_cents_rounds_like_to_cents() {
        assert_eq!(parse_cents("100.999"), Ok(10100));
        assert_eq!(parse_cents("100.994"), Ok(10099));
        assert_eq!(parse_cents("100.995"), Ok(10100));
        assert_eq!(parse_cents("-1.005"), Ok(-101));
        for input in ["100.999", "100.994", "4000.125", "0.005", "1234.5678"] {
            let amount: f64 = input.parse().unwrap();
            assert_eq!(parse_cents(input), Ok(to_cents(amount)), "{}", input);
        }
    }

    #[test]
    fn test_parse_cents_out_of_range() {
        assert_eq!(parse_cents("92233720368547758.07"), Err(ParseCentsError::OutOfRange));
        assert_eq!(parse_cents("99999999999999999999"), Err(ParseCentsError::InvalidFormat));
    }

    #[test]
    fn test_parse_cents_invalid() {
        assert!(parse_cents("abc").is_err());
        assert!(parse_cents("12.34.56").is_err());
        assert!(parse_cents(".").is_err());
        assert!(parse_cents("").is_err());
        assert!(parse_cents("1.2x").is_err());
    }

    #[test]
    fn test_round_half_up_at_boundary() {
        assert_eq!(to_cents(1.005), 101);
        assert_eq!(to_cents(2.675), 268);
        assert_eq!(to_cents(0.125), 13);
        assert_eq!(to_cents(-1.005), -101);
        assert_eq!(round_cents(79650.0), 79650);
    }

    fn round2(amount: f64) -> f64 {
        from_cents(to_cents(amount))
    }

    #[test]
    fn test_round2_is_idempotent() {
        for value in [0.0, 0.004, 0.005, 1.005, 75.0, 610.645, 5310.0, 1234.5678, -3.335] {
            let once = round2(value);
            assert_eq!(round2(once), once, "round2 not idempotent for {}", value);
        }
    }

    #[test]
    fn test_percent_and_rate_helpers() {
        assert_eq!(percent_of(531000, 15.0), 79650);
        assert_eq!(percent_of(610650, 10.0), 61065);
        assert_eq!(scale(5000, 24.5), 122500);
        assert_eq!(divide(12400, 24.5), 506);
        assert_eq!(divide(12400, 0.0), 0);
    }

    #[test]
    fn test_oversized_amounts_saturate_and_are_flagged() {
        assert_eq!(to_cents(1e17), Cents::MAX);
        assert!(!is_safe_cents(to_cents(1e17)));
        assert!(is_safe_cents(to_cents(1e7)));
        assert!(is_safe_cents(-MAX_SAFE_CENTS));
        assert!(!is_safe_cents(MAX_SAFE_CENTS + 1));

        assert_eq!(sum_cents(&[10, 20, 30]), 60);
        assert_eq!(sum_cents(&[Cents::MAX, 50_00]), Cents::MAX);
        assert_eq!(sum_cents(&[]), 0);
    }
}
