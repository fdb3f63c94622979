use serde::Serialize;

use super::{
    as_decimal, canonical_port, find_dai_and_sc, find_eco_tax_lps, find_location, is_safe_cents,
    scale, to_cents, Breakdown, CaftaBranch, Cents, Dual, Platform, Port, PortIndex, ReferenceData,
    RouteCosts, TaxCategory, Totals,
};

/// A validated estimate request.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimateRequest {
    pub year: u32,
    /// Auction price, USD cents
    pub price: Cents,
    pub location: String,
    pub platform: Platform,
    pub vin: String,
    /// Engine displacement in liters
    pub engine_size: Option<f64>,
    /// Shipping size the caller is interested in. Echoed only; results always
    /// cover every vehicle type a port prices.
    pub vehicle_type: Option<String>,
}

impl EstimateRequest {
    pub fn cafta_branch(&self) -> CaftaBranch {
        CaftaBranch::from_vin(&self.vin)
    }

    pub fn tax_category(&self) -> TaxCategory {
        TaxCategory::from_engine_size(self.engine_size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EstimateError {
    LocationNotFound { location: String, platform: Platform },
    /// A computed amount saturated or left the exact `f64` range.
    AmountOutOfRange { port: String },
}

impl std::fmt::Display for EstimateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EstimateError::LocationNotFound { location, platform } => write!(
                f,
                "Location not found for '{}' on platform '{}'.",
                location, platform
            ),
            EstimateError::AmountOutOfRange { port } => {
                write!(f, "Computed amounts out of range for the route via '{}'.", port)
            }
        }
    }
}

impl std::error::Error for EstimateError {}

/// Request fields echoed back with the classification derived from them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateInput {
    pub year: u32,
    #[serde(with = "as_decimal")]
    pub price: Cents,
    pub location: String,
    pub platform: Platform,
    pub vin: String,
    pub engine_size: Option<f64>,
    pub vehicle_type: Option<String>,
    pub with_cafta: bool,
    pub category: TaxCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedLocation {
    pub title: String,
    pub state: Option<String>,
    pub coordinates: Option<serde_json::Value>,
}

/// Transit time range for a port; a missing or zero bound is reported as null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LeadWeeks {
    pub min: Option<u32>,
    pub max: Option<u32>,
}

impl LeadWeeks {
    fn of(port: &Port) -> Self {
        Self {
            min: port.lead_weeks_min.filter(|w| *w > 0),
            max: port.lead_weeks_max.filter(|w| *w > 0),
        }
    }
}

/// Full receipt for one vehicle type shipped through one port.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleTypeQuote {
    pub vehicle_type: String,
    pub lead_weeks: LeadWeeks,
    #[serde(rename = "fleteUSD", with = "as_decimal")]
    pub flete_usd: Cents,
    #[serde(with = "as_decimal")]
    pub flete_lps: Cents,
    #[serde(rename = "cifUSD", with = "as_decimal")]
    pub cif_usd: Cents,
    #[serde(with = "as_decimal")]
    pub cif_lps: Cents,
    pub dai_pct: f64,
    pub sc_pct: f64,
    pub breakdown: Dual<Breakdown>,
    pub totals: Dual<Totals>,
}

/// All quotes reachable through one port.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortResult {
    pub port: String,
    pub lead_weeks: LeadWeeks,
    #[serde(rename = "gruaUSD", with = "as_decimal")]
    pub grua_usd: Cents,
    #[serde(with = "as_decimal")]
    pub grua_lps: Cents,
    pub vehicle_type_quotes: Vec<VehicleTypeQuote>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Estimate {
    pub as_of_fx_date: String,
    pub input: EstimateInput,
    pub fx: f64,
    pub matched_location: MatchedLocation,
    pub results: Vec<PortResult>,
    /// Ports named by the location that have no catalog entry. Not part of
    /// the response body.
    #[serde(skip)]
    pub skipped_ports: Vec<String>,
}

impl Estimate {
    /// Quotes for one vehicle type across every port, in port order.
    pub fn quotes_for<'a>(
        &'a self,
        vehicle_type: &str,
    ) -> impl Iterator<Item = (&'a PortResult, &'a VehicleTypeQuote)> {
        self.results.iter().flat_map(move |port| {
            port.vehicle_type_quotes
                .iter()
                .filter(move |q| q.vehicle_type == vehicle_type)
                .map(move |q| (port, q))
        })
    }

    /// Port with the lowest landed cost (CIF + import-side total, USD) for a
    /// vehicle type, if any port prices it.
    pub fn cheapest_for(&self, vehicle_type: &str) -> Option<(&PortResult, &VehicleTypeQuote)> {
        self.quotes_for(vehicle_type)
            .min_by_key(|(_, quote)| quote.totals.usd.total + quote.cif_usd)
    }
}

/// Price every (port, vehicle type) route from the matched location.
///
/// Pure: reads the request and reference data, returns a fresh estimate.
/// A shipping entry whose canonical port is missing from the port catalog
/// contributes nothing to `results`; its name is kept in `skipped_ports`.
/// Fails rather than report an amount that overflowed the cents range.
pub fn build_estimate(
    request: &EstimateRequest,
    reference: &ReferenceData,
) -> Result<Estimate, EstimateError> {
    let location = find_location(&reference.locations, &request.location).ok_or_else(|| {
        EstimateError::LocationNotFound {
            location: request.location.clone(),
            platform: request.platform,
        }
    })?;

    let fx = reference.fx.value;
    let branch = request.cafta_branch();
    let category = request.tax_category();
    let ports = PortIndex::new(&reference.ports);

    let mut results = Vec::new();
    let mut skipped_ports = Vec::new();

    for shipping in &location.shipping_cost {
        let port_name = canonical_port(&shipping.port);
        let Some(port) = ports.get(&port_name) else {
            skipped_ports.push(port_name);
            continue;
        };

        let lead_weeks = LeadWeeks::of(port);
        let grua = to_cents(shipping.price);
        let grua_lps = scale(grua, fx);
        let out_of_range = || EstimateError::AmountOutOfRange {
            port: port_name.clone(),
        };
        if !is_safe_cents(grua_lps) {
            return Err(out_of_range());
        }

        let vehicle_type_quotes = port
            .shipping_rates
            .iter()
            .map(|(vehicle_type, flete)| {
                let route = RouteCosts {
                    price: request.price,
                    grua,
                    flete: to_cents(*flete),
                    fx,
                };
                let cif = route.cif();
                let rates = find_dai_and_sc(&reference.fees, branch, category, cif);
                let eco_tax_lps = find_eco_tax_lps(&reference.fees, cif);
                let breakdown = route.breakdown(rates, eco_tax_lps);
                let totals = Dual {
                    usd: breakdown.usd.totals(),
                    lps: breakdown.lps.totals(),
                };
                let in_range = breakdown.usd.is_in_range()
                    && breakdown.lps.is_in_range()
                    && totals.usd.is_in_range()
                    && totals.lps.is_in_range();
                if !in_range {
                    return Err(out_of_range());
                }

                Ok(VehicleTypeQuote {
                    vehicle_type: vehicle_type.clone(),
                    lead_weeks,
                    flete_usd: route.flete,
                    flete_lps: breakdown.lps.flete,
                    cif_usd: cif,
                    cif_lps: breakdown.lps.cif,
                    dai_pct: rates.dai_pct,
                    sc_pct: rates.sc_pct,
                    breakdown,
                    totals,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        results.push(PortResult {
            port: port_name,
            lead_weeks,
            grua_usd: grua,
            grua_lps,
            vehicle_type_quotes,
        });
    }

    Ok(Estimate {
        as_of_fx_date: reference.fx.date.clone(),
        input: EstimateInput {
            year: request.year,
            price: request.price,
            location: request.location.clone(),
            platform: request.platform,
            vin: request.vin.clone(),
            engine_size: request.engine_size,
            vehicle_type: request.vehicle_type.clone(),
            with_cafta: branch.is_cafta(),
            category,
        },
        fx,
        matched_location: MatchedLocation {
            title: location.title.clone(),
            state: location.state.clone(),
            coordinates: location.coordinates.clone(),
        },
        results,
        skipped_ports,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        CategoryBrackets, EcoTaxBracket, FeeSchedule, FxRate, Location, RateBracket, ShippingCost,
    };
    use std::collections::BTreeMap;

    fn reference() -> ReferenceData {
        let mut wilmington_rates = BTreeMap::new();
        wilmington_rates.insert("regular_suvs".to_string(), 900.0);
        wilmington_rates.insert("small_cars".to_string(), 750.0);

        ReferenceData {
            fees: FeeSchedule {
                without_cafta: CategoryBrackets {
                    small_engine: vec![],
                    turismo_camioneta: vec![RateBracket { min: 0.0, max: 10000.0, dai: 15.0, sc: 10.0 }],
                },
                eco_tax_lps: vec![EcoTaxBracket { min: 0.0, max: 15000.0, amount: 5000.0 }],
                ..Default::default()
            },
            fx: FxRate { value: 24.5, date: "2025-03-01".into() },
            ports: vec![Port {
                port: "Port of Wilmington".into(),
                lead_weeks_min: Some(2),
                lead_weeks_max: Some(0),
                shipping_rates: wilmington_rates,
            }],
            locations: vec![Location {
                title: "Dallas (TX)".into(),
                state: Some("TX".into()),
                coordinates: Some(serde_json::json!({"lat": 32.7, "lng": -96.8})),
                shipping_cost: vec![
                    ShippingCost { port: "Wilmington, DE".into(), price: 300.0 },
                    ShippingCost { port: "Port of Savannah".into(), price: 250.0 },
                ],
            }],
        }
    }

    fn request() -> EstimateRequest {
        EstimateRequest {
            year: 2015,
            price: 4000_00,
            location: "Dallas (TX)".into(),
            platform: Platform::Copart,
            vin: "JA4AZ3A38LZ000000".into(),
            engine_size: Some(2.4),
            vehicle_type: Some("regular_suvs".into()),
        }
    }

    #[test]
    fn test_routes_expand_per_port_and_vehicle_type() {
        let estimate = build_estimate(&request(), &reference()).unwrap();

        assert_eq!(estimate.results.len(), 1);
        let port = &estimate.results[0];
        assert_eq!(port.port, "Port of Wilmington");
        assert_eq!(port.grua_usd, 300_00);
        assert_eq!(port.grua_lps, 7350_00);
        assert_eq!(port.lead_weeks, LeadWeeks { min: Some(2), max: None });

        // Not filtered by the requested vehicle type
        let types: Vec<&str> = port
            .vehicle_type_quotes
            .iter()
            .map(|q| q.vehicle_type.as_str())
            .collect();
        assert_eq!(types, vec!["regular_suvs", "small_cars"]);

        let suv = &port.vehicle_type_quotes[0];
        assert_eq!(suv.cif_usd, 5310_00);
        assert_eq!(suv.breakdown.usd.dai, 796_50);
        assert_eq!(suv.breakdown.usd.sc, 610_65);
        assert_eq!(suv.dai_pct, 15.0);
        assert_eq!(suv.sc_pct, 10.0);
    }

    #[test]
    fn test_unknown_port_is_skipped_not_reported() {
        let estimate = build_estimate(&request(), &reference()).unwrap();
        assert!(estimate.results.iter().all(|r| r.port != "Port of Savannah"));
        assert_eq!(estimate.skipped_ports, vec!["Port of Savannah".to_string()]);

        let mut reference = reference();
        reference.ports.clear();
        let estimate = build_estimate(&request(), &reference).unwrap();
        assert!(estimate.results.is_empty());
    }

    #[test]
    fn test_classification_echoed() {
        let estimate = build_estimate(&request(), &reference()).unwrap();
        assert!(!estimate.input.with_cafta);
        assert_eq!(estimate.input.category, TaxCategory::TurismoCamioneta);
        assert_eq!(estimate.as_of_fx_date, "2025-03-01");
        assert_eq!(estimate.matched_location.title, "Dallas (TX)");
    }

    #[test]
    fn test_location_not_found() {
        let mut req = request();
        req.location = "Miami (FL)".into();
        let err = build_estimate(&req, &reference()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Location not found for 'Miami (FL)' on platform 'copart'."
        );
    }

    #[test]
    fn test_output_is_deterministic() {
        let reference = reference();
        let first = serde_json::to_string(&build_estimate(&request(), &reference).unwrap()).unwrap();
        let second = serde_json::to_string(&build_estimate(&request(), &reference).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_cheapest_for() {
        let estimate = build_estimate(&request(), &reference()).unwrap();
        let (port, quote) = estimate.cheapest_for("small_cars").unwrap();
        assert_eq!(port.port, "Port of Wilmington");
        assert_eq!(quote.flete_usd, 750_00);
        assert!(estimate.cheapest_for("motorcycles").is_none());
    }

    #[test]
    fn test_oversized_freight_is_rejected() {
        let mut reference = reference();
        reference.ports[0]
            .shipping_rates
            .insert("small_cars".to_string(), 1e17);

        let err = build_estimate(&request(), &reference).unwrap_err();
        assert_eq!(
            err,
            EstimateError::AmountOutOfRange {
                port: "Port of Wilmington".into()
            }
        );
    }

    #[test]
    fn test_oversized_towing_is_rejected() {
        let mut reference = reference();
        reference.locations[0].shipping_cost[0].price = 1e17;

        let err = build_estimate(&request(), &reference).unwrap_err();
        assert!(matches!(err, EstimateError::AmountOutOfRange { .. }));
    }
}
