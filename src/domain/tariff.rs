use serde::{Deserialize, Serialize};

use super::{Cents, FeeSchedule};

/// Trade-agreement branch of the fee schedule, inferred from the VIN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaftaBranch {
    #[serde(rename = "withCafta")]
    WithCafta,
    #[serde(rename = "withoutCafta")]
    WithoutCafta,
}

impl CaftaBranch {
    /// VINs whose first character (after trimming) is 1, 4, 5 or 7 were
    /// assembled in a CAFTA-eligible country.
    pub fn from_vin(vin: &str) -> Self {
        match vin.trim().chars().next() {
            Some('1' | '4' | '5' | '7') => CaftaBranch::WithCafta,
            _ => CaftaBranch::WithoutCafta,
        }
    }

    pub fn is_cafta(&self) -> bool {
        matches!(self, CaftaBranch::WithCafta)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CaftaBranch::WithCafta => "withCafta",
            CaftaBranch::WithoutCafta => "withoutCafta",
        }
    }
}

/// Tax category of the vehicle. Independent of the shipping size used to
/// pick a freight rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaxCategory {
    #[serde(rename = "smallEngine_1_5lOrLess")]
    SmallEngine,
    #[serde(rename = "turismoCamioneta")]
    TurismoCamioneta,
}

/// Largest displacement (liters) still taxed as a small engine.
const SMALL_ENGINE_MAX_LITERS: f64 = 1.5;

impl TaxCategory {
    pub fn from_engine_size(engine_size: Option<f64>) -> Self {
        match engine_size {
            Some(size) if size > 0.0 && size <= SMALL_ENGINE_MAX_LITERS => TaxCategory::SmallEngine,
            _ => TaxCategory::TurismoCamioneta,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaxCategory::SmallEngine => "smallEngine_1_5lOrLess",
            TaxCategory::TurismoCamioneta => "turismoCamioneta",
        }
    }
}

impl std::fmt::Display for TaxCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// DAI and SC percentages that apply to a CIF value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TariffRates {
    pub dai_pct: f64,
    pub sc_pct: f64,
}

/// First bracket whose inclusive range holds `cif`; 0%/0% when none does.
pub fn find_dai_and_sc(
    fees: &FeeSchedule,
    branch: CaftaBranch,
    category: TaxCategory,
    cif: Cents,
) -> TariffRates {
    let cif = super::from_cents(cif);
    fees.brackets(branch, category)
        .iter()
        .find(|bracket| bracket.contains(cif))
        .map(|bracket| TariffRates {
            dai_pct: bracket.dai,
            sc_pct: bracket.sc,
        })
        .unwrap_or_default()
}

/// Ecotasa in Lempira cents for a CIF value; zero when no bracket matches.
pub fn find_eco_tax_lps(fees: &FeeSchedule, cif: Cents) -> Cents {
    let cif = super::from_cents(cif);
    fees.eco_tax_lps
        .iter()
        .find(|bracket| bracket.contains(cif))
        .map(|bracket| super::to_cents(bracket.amount))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CategoryBrackets, EcoTaxBracket, RateBracket};

    fn schedule() -> FeeSchedule {
        FeeSchedule {
            with_cafta: CategoryBrackets {
                small_engine: vec![RateBracket { min: 0.0, max: 99999.0, dai: 0.0, sc: 0.0 }],
                turismo_camioneta: vec![RateBracket { min: 0.0, max: 99999.0, dai: 0.0, sc: 10.0 }],
            },
            without_cafta: CategoryBrackets {
                small_engine: vec![RateBracket { min: 0.0, max: 99999.0, dai: 5.0, sc: 10.0 }],
                turismo_camioneta: vec![
                    RateBracket { min: 1000.0, max: 7000.0, dai: 15.0, sc: 10.0 },
                    RateBracket { min: 7000.01, max: 10000.0, dai: 15.0, sc: 15.0 },
                    RateBracket { min: 10000.01, max: 20000.0, dai: 15.0, sc: 20.0 },
                ],
            },
            eco_tax_lps: vec![
                EcoTaxBracket { min: 0.0, max: 15000.0, amount: 5000.0 },
                EcoTaxBracket { min: 15000.01, max: 25000.0, amount: 7000.0 },
            ],
        }
    }

    #[test]
    fn test_cafta_from_vin() {
        for vin in ["1HGCM82633A004352", "4T1BF1FK5CU000000", "5YJ3E1EA7KF000000", "7ZZ", " 1abc"] {
            assert_eq!(CaftaBranch::from_vin(vin), CaftaBranch::WithCafta, "{}", vin);
        }
        for vin in ["WBAFR7C50BC000000", "JA4AZ3A38LZ000000", "0X", "2T", "3VW", "6G", "8A", "9B", "", "   "] {
            assert_eq!(CaftaBranch::from_vin(vin), CaftaBranch::WithoutCafta, "{}", vin);
        }
    }

    #[test]
    fn test_category_from_engine_size() {
        assert_eq!(TaxCategory::from_engine_size(Some(1.5)), TaxCategory::SmallEngine);
        assert_eq!(TaxCategory::from_engine_size(Some(1.0)), TaxCategory::SmallEngine);
        assert_eq!(TaxCategory::from_engine_size(Some(1.6)), TaxCategory::TurismoCamioneta);
        assert_eq!(TaxCategory::from_engine_size(Some(0.0)), TaxCategory::TurismoCamioneta);
        assert_eq!(TaxCategory::from_engine_size(Some(-1.2)), TaxCategory::TurismoCamioneta);
        assert_eq!(TaxCategory::from_engine_size(None), TaxCategory::TurismoCamioneta);
    }

    #[test]
    fn test_bracket_lookup_inside_ranges() {
        let fees = schedule();
        let branch = CaftaBranch::WithoutCafta;
        let category = TaxCategory::TurismoCamioneta;

        for cif in [100000, 531000, 700000] {
            let rates = find_dai_and_sc(&fees, branch, category, cif);
            assert_eq!(rates, TariffRates { dai_pct: 15.0, sc_pct: 10.0 }, "cif {}", cif);
        }
        let rates = find_dai_and_sc(&fees, branch, category, 700001);
        assert_eq!(rates.sc_pct, 15.0);
        let rates = find_dai_and_sc(&fees, branch, category, 2000000);
        assert_eq!(rates.sc_pct, 20.0);
    }

    #[test]
    fn test_bracket_lookup_zero_fallback() {
        let fees = schedule();
        let branch = CaftaBranch::WithoutCafta;
        let category = TaxCategory::TurismoCamioneta;

        // One cent below the lowest bracket is not clamped into it
        assert_eq!(find_dai_and_sc(&fees, branch, category, 99999), TariffRates::default());
        assert_eq!(find_dai_and_sc(&fees, branch, category, 2000001), TariffRates::default());
        assert_eq!(
            find_dai_and_sc(&FeeSchedule::default(), branch, category, 500000),
            TariffRates::default()
        );
    }

    #[test]
    fn test_branch_and_category_select_lists() {
        let fees = schedule();
        let small = find_dai_and_sc(&fees, CaftaBranch::WithoutCafta, TaxCategory::SmallEngine, 500000);
        assert_eq!(small, TariffRates { dai_pct: 5.0, sc_pct: 10.0 });
        let cafta = find_dai_and_sc(&fees, CaftaBranch::WithCafta, TaxCategory::TurismoCamioneta, 500000);
        assert_eq!(cafta, TariffRates { dai_pct: 0.0, sc_pct: 10.0 });
    }

    #[test]
    fn test_eco_tax_lookup() {
        let fees = schedule();
        assert_eq!(find_eco_tax_lps(&fees, 531000), 500000);
        assert_eq!(find_eco_tax_lps(&fees, 1500000), 500000);
        assert_eq!(find_eco_tax_lps(&fees, 1500001), 700000);
        assert_eq!(find_eco_tax_lps(&fees, 9000000), 0);
    }
}
