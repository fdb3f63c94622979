use std::collections::HashMap;

use super::Port;

/// Collapse a free-text port name from a location record into the name the
/// port catalog uses. Unknown names pass through unchanged.
pub fn canonical_port(name: &str) -> String {
    let lowered = name.to_lowercase();
    if lowered.contains("everglades") {
        "Port Everglades".to_string()
    } else if lowered.contains("freeport") {
        "Freeport (Houston)".to_string()
    } else if lowered.contains("wilmington") {
        "Port of Wilmington".to_string()
    } else {
        name.to_string()
    }
}

/// Port catalog indexed by exact port name. Later duplicates replace
/// earlier ones.
pub struct PortIndex<'a> {
    by_name: HashMap<&'a str, &'a Port>,
}

impl<'a> PortIndex<'a> {
    pub fn new(ports: &'a [Port]) -> Self {
        let by_name = ports.iter().map(|p| (p.port.as_str(), p)).collect();
        Self { by_name }
    }

    pub fn get(&self, name: &str) -> Option<&'a Port> {
        self.by_name.get(name).copied()
    }
}

/// Shipping size class used to pick an ocean-freight rate. This is not the
/// tax category: a 1.2 l hatchback and a 1.2 l motorcycle share a tax
/// category but ship at different rates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShippingVehicleType {
    SmallCars,
    LargeCars,
    LuxurySedans,
    Motorcycles,
    RegularSuvs,
    LargeSuvs,
    XlSuvs,
    SingleCabTrucks,
    RegularCabHalfTrucks,
    HighCabDoubleTrucks,
    ExtraLargeTrucks,
    /// A rate-table key this build does not know about
    Other(String),
}

impl ShippingVehicleType {
    pub const KNOWN: [ShippingVehicleType; 11] = [
        ShippingVehicleType::SmallCars,
        ShippingVehicleType::LargeCars,
        ShippingVehicleType::LuxurySedans,
        ShippingVehicleType::Motorcycles,
        ShippingVehicleType::RegularSuvs,
        ShippingVehicleType::LargeSuvs,
        ShippingVehicleType::XlSuvs,
        ShippingVehicleType::SingleCabTrucks,
        ShippingVehicleType::RegularCabHalfTrucks,
        ShippingVehicleType::HighCabDoubleTrucks,
        ShippingVehicleType::ExtraLargeTrucks,
    ];

    pub fn from_key(key: &str) -> Self {
        match key {
            "small_cars" => ShippingVehicleType::SmallCars,
            "large_cars" => ShippingVehicleType::LargeCars,
            "luxury_sedans" => ShippingVehicleType::LuxurySedans,
            "motorcycles" => ShippingVehicleType::Motorcycles,
            "regular_suvs" => ShippingVehicleType::RegularSuvs,
            "large_suvs" => ShippingVehicleType::LargeSuvs,
            "xl_suvs" => ShippingVehicleType::XlSuvs,
            "single_cab_trucks" => ShippingVehicleType::SingleCabTrucks,
            "regular_cab_half_trucks" => ShippingVehicleType::RegularCabHalfTrucks,
            "high_cab_double_trucks" => ShippingVehicleType::HighCabDoubleTrucks,
            "extra_large_trucks" => ShippingVehicleType::ExtraLargeTrucks,
            other => ShippingVehicleType::Other(other.to_string()),
        }
    }

    pub fn key(&self) -> &str {
        match self {
            ShippingVehicleType::SmallCars => "small_cars",
            ShippingVehicleType::LargeCars => "large_cars",
            ShippingVehicleType::LuxurySedans => "luxury_sedans",
            ShippingVehicleType::Motorcycles => "motorcycles",
            ShippingVehicleType::RegularSuvs => "regular_suvs",
            ShippingVehicleType::LargeSuvs => "large_suvs",
            ShippingVehicleType::XlSuvs => "xl_suvs",
            ShippingVehicleType::SingleCabTrucks => "single_cab_trucks",
            ShippingVehicleType::RegularCabHalfTrucks => "regular_cab_half_trucks",
            ShippingVehicleType::HighCabDoubleTrucks => "high_cab_double_trucks",
            ShippingVehicleType::ExtraLargeTrucks => "extra_large_trucks",
            ShippingVehicleType::Other(key) => key,
        }
    }

    /// Display label shown on receipts.
    pub fn label(&self) -> &str {
        match self {
            ShippingVehicleType::SmallCars => "Auto pequeño (sedán / hatchback)",
            ShippingVehicleType::LargeCars => "Auto grande (sedán grande)",
            ShippingVehicleType::LuxurySedans => "Sedán de lujo",
            ShippingVehicleType::Motorcycles => "Motocicleta",
            ShippingVehicleType::RegularSuvs => "SUV mediano",
            ShippingVehicleType::LargeSuvs => "SUV grande",
            ShippingVehicleType::XlSuvs => "SUV XL",
            ShippingVehicleType::SingleCabTrucks => "Pickup cabina sencilla",
            ShippingVehicleType::RegularCabHalfTrucks => "Pickup 1/2 tonelada (cabina regular)",
            ShippingVehicleType::HighCabDoubleTrucks => "Camión cabina alta doble",
            ShippingVehicleType::ExtraLargeTrucks => "Camión extra grande",
            ShippingVehicleType::Other(key) => key,
        }
    }
}

impl std::fmt::Display for ShippingVehicleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}
