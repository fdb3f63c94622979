use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{CaftaBranch, TaxCategory};

/// Store key of the import fee schedule blob.
pub const FEES_KEY: &str = "fees:import";
/// Store key of the USD -> HNL exchange-rate snapshot.
pub const FX_KEY: &str = "fx:usd_hnl";
/// Store key of the port catalog.
pub const PORTS_KEY: &str = "ports";

/// Auction platform a listing comes from. Each platform has its own
/// location catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Copart,
    Iaai,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Copart, Platform::Iaai];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Copart => "copart",
            Platform::Iaai => "iaai",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "copart" => Some(Platform::Copart),
            "iaai" => Some(Platform::Iaai),
            _ => None,
        }
    }

    /// Store key of this platform's location catalog.
    pub fn locations_key(&self) -> String {
        format!("locations:{}", self.as_str())
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One DAI/SC bracket over CIF value (USD, inclusive bounds).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateBracket {
    pub min: f64,
    pub max: f64,
    /// DAI percentage, e.g. `15.0` for 15%
    pub dai: f64,
    /// SC percentage
    pub sc: f64,
}

impl RateBracket {
    pub fn contains(&self, cif: f64) -> bool {
        cif >= self.min && cif <= self.max
    }
}

/// Ecotasa bracket over CIF value (USD); `amount` is in Lempiras.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EcoTaxBracket {
    pub min: f64,
    pub max: f64,
    pub amount: f64,
}

impl EcoTaxBracket {
    pub fn contains(&self, cif: f64) -> bool {
        cif >= self.min && cif <= self.max
    }
}

/// Brackets per tax category within one CAFTA branch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryBrackets {
    #[serde(rename = "smallEngine_1_5lOrLess", default)]
    pub small_engine: Vec<RateBracket>,
    #[serde(rename = "turismoCamioneta", default)]
    pub turismo_camioneta: Vec<RateBracket>,
}

impl CategoryBrackets {
    pub fn for_category(&self, category: TaxCategory) -> &[RateBracket] {
        match category {
            TaxCategory::SmallEngine => &self.small_engine,
            TaxCategory::TurismoCamioneta => &self.turismo_camioneta,
        }
    }
}

/// Import fee schedule: DAI/SC brackets split by CAFTA branch and tax
/// category, plus the ecotasa brackets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeSchedule {
    #[serde(default)]
    pub with_cafta: CategoryBrackets,
    #[serde(default)]
    pub without_cafta: CategoryBrackets,
    #[serde(default)]
    pub eco_tax_lps: Vec<EcoTaxBracket>,
}

impl FeeSchedule {
    pub fn brackets(&self, branch: CaftaBranch, category: TaxCategory) -> &[RateBracket] {
        match branch {
            CaftaBranch::WithCafta => self.with_cafta.for_category(category),
            CaftaBranch::WithoutCafta => self.without_cafta.for_category(category),
        }
    }

    /// Structural problems that would make lookups ambiguous: inverted or
    /// overlapping ranges within one list.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for branch in [CaftaBranch::WithCafta, CaftaBranch::WithoutCafta] {
            for category in [TaxCategory::SmallEngine, TaxCategory::TurismoCamioneta] {
                let ranges: Vec<(f64, f64)> = self
                    .brackets(branch, category)
                    .iter()
                    .map(|b| (b.min, b.max))
                    .collect();
                let label = format!("{}/{}", branch.as_str(), category.as_str());
                check_ranges(&label, &ranges, &mut problems);
            }
        }
        let eco: Vec<(f64, f64)> = self.eco_tax_lps.iter().map(|b| (b.min, b.max)).collect();
        check_ranges("ecoTaxLps", &eco, &mut problems);
        problems
    }
}

fn check_ranges(label: &str, ranges: &[(f64, f64)], problems: &mut Vec<String>) {
    for (i, (min, max)) in ranges.iter().enumerate() {
        if min > max {
            problems.push(format!("{}[{}]: min {} is greater than max {}", label, i, min, max));
        }
        if let Some((_, prev_max)) = i.checked_sub(1).map(|p| ranges[p]) {
            if *min <= prev_max {
                problems.push(format!(
                    "{}[{}]: range starting at {} overlaps the previous bracket ending at {}",
                    label, i, min, prev_max
                ));
            }
        }
    }
}

/// USD -> HNL exchange-rate snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FxRate {
    pub value: f64,
    /// ISO date (YYYY-MM-DD) the rate applies to
    pub date: String,
}

impl FxRate {
    pub fn new(value: f64, date: NaiveDate) -> Self {
        Self {
            value,
            date: date.format("%Y-%m-%d").to_string(),
        }
    }

    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if !self.value.is_finite() || self.value <= 0.0 {
            problems.push(format!("fx value must be a positive number, got {}", self.value));
        }
        if NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").is_err() {
            problems.push(format!("fx date must be YYYY-MM-DD, got '{}'", self.date));
        }
        problems
    }
}

/// Towing quote from a pickup location to one port (USD).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingCost {
    pub port: String,
    pub price: f64,
}

/// A pickup yard in a platform's location catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// "<City> (<ST>)"
    pub title: String,
    #[serde(default)]
    pub state: Option<String>,
    /// Passed through to clients as stored
    #[serde(default)]
    pub coordinates: Option<serde_json::Value>,
    #[serde(default)]
    pub shipping_cost: Vec<ShippingCost>,
}

/// A destination port with its ocean-freight rate table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub port: String,
    #[serde(default)]
    pub lead_weeks_min: Option<u32>,
    #[serde(default)]
    pub lead_weeks_max: Option<u32>,
    /// Freight in USD keyed by shipping vehicle type (`small_cars`, ...)
    #[serde(default)]
    pub shipping_rates: BTreeMap<String, f64>,
}

/// Everything the estimator reads for one request.
#[derive(Debug, Clone)]
pub struct ReferenceData {
    pub fees: FeeSchedule,
    pub fx: FxRate,
    pub ports: Vec<Port>,
    pub locations: Vec<Location>,
}
