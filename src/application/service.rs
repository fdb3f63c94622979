use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info};

use crate::domain::{
    build_estimate, Estimate, EstimateRequest, FeeSchedule, FxRate, Location, Platform, Port,
    ReferenceData, FEES_KEY, FX_KEY, PORTS_KEY,
};
use crate::storage::{Repository, StoredBlob};

use super::{validate_request, AppError, RawEstimateRequest};

/// Application service providing high-level operations over the reference
/// store and the estimation engine. This is the primary interface for any
/// client (CLI, HTTP API).
#[derive(Clone)]
pub struct EstimateService {
    repo: Repository,
}

/// Presence of one expected reference key.
#[derive(Debug, Clone)]
pub struct KeyStatus {
    pub key: String,
    pub updated_at: Option<DateTime<Utc>>,
    /// Number of records for list-shaped blobs
    pub entries: Option<usize>,
}

impl KeyStatus {
    pub fn is_present(&self) -> bool {
        self.updated_at.is_some()
    }
}

/// Every key the estimator can read, in display order.
pub fn expected_keys() -> Vec<String> {
    let mut keys = vec![FEES_KEY.to_string(), FX_KEY.to_string(), PORTS_KEY.to_string()];
    keys.extend(Platform::ALL.iter().map(|p| p.locations_key()));
    keys
}

/// Shorten a VIN for logs: the world-manufacturer prefix only.
pub fn mask_vin(vin: &str) -> String {
    let prefix: String = vin.chars().take(3).collect();
    format!("{}***", prefix)
}

impl EstimateService {
    /// Create a new service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    // ========================
    // Estimates
    // ========================

    /// Fetch the four blobs an estimate needs. The reads are independent and
    /// run concurrently; any missing blob fails the whole load.
    pub async fn load_reference(&self, platform: Platform) -> Result<ReferenceData, AppError> {
        let locations_key = platform.locations_key();
        let (fees, fx, ports, locations) = tokio::try_join!(
            self.repo.get::<FeeSchedule>(FEES_KEY),
            self.repo.get::<FxRate>(FX_KEY),
            self.repo.get::<Vec<Port>>(PORTS_KEY),
            self.repo.get::<Vec<Location>>(&locations_key),
        )?;

        let mut missing = Vec::new();
        if fees.is_none() {
            missing.push(FEES_KEY.to_string());
        }
        if fx.is_none() {
            missing.push(FX_KEY.to_string());
        }
        if ports.is_none() {
            missing.push(PORTS_KEY.to_string());
        }
        if locations.is_none() {
            missing.push(locations_key);
        }

        match (fees, fx, ports, locations) {
            (Some(fees), Some(fx), Some(ports), Some(locations)) => {
                debug!(
                    platform = %platform,
                    ports = ports.len(),
                    locations = locations.len(),
                    fx = fx.value,
                    "Loaded reference data"
                );
                Ok(ReferenceData {
                    fees,
                    fx,
                    ports,
                    locations,
                })
            }
            _ => Err(AppError::MissingReferenceData(missing)),
        }
    }

    /// Price a validated request against the current reference data.
    pub async fn estimate(&self, request: &EstimateRequest) -> Result<Estimate, AppError> {
        let reference = self.load_reference(request.platform).await?;
        let estimate = build_estimate(request, &reference)?;

        if !estimate.skipped_ports.is_empty() {
            debug!(
                location = %estimate.matched_location.title,
                skipped = ?estimate.skipped_ports,
                "Routes dropped: ports missing from the port catalog"
            );
        }
        info!(
            vin = %mask_vin(&request.vin),
            platform = %request.platform,
            location = %estimate.matched_location.title,
            ports = estimate.results.len(),
            "Estimate computed"
        );
        Ok(estimate)
    }

    /// Validate a wire request and price it.
    pub async fn estimate_raw(&self, raw: &RawEstimateRequest) -> Result<Estimate, AppError> {
        let request = validate_request(raw)?;
        self.estimate(&request).await
    }

    // ========================
    // Reference data
    // ========================

    /// Current FX snapshot.
    pub async fn fx(&self) -> Result<FxRate, AppError> {
        self.repo
            .get::<FxRate>(FX_KEY)
            .await?
            .ok_or_else(|| AppError::MissingReferenceData(vec![FX_KEY.to_string()]))
    }

    /// Replace the FX snapshot.
    pub async fn set_fx(&self, value: f64, date: NaiveDate) -> Result<FxRate, AppError> {
        let fx = FxRate::new(value, date);
        self.put_fx(&fx).await?;
        Ok(fx)
    }

    pub async fn put_fx(&self, fx: &FxRate) -> Result<(), AppError> {
        reject_problems(FX_KEY, fx.problems())?;
        self.repo.put(FX_KEY, fx).await?;
        info!(value = fx.value, date = %fx.date, "FX snapshot updated");
        Ok(())
    }

    pub async fn put_fees(&self, fees: &FeeSchedule) -> Result<(), AppError> {
        reject_problems(FEES_KEY, fees.problems())?;
        self.repo.put(FEES_KEY, fees).await?;
        Ok(())
    }

    pub async fn put_ports(&self, ports: &[Port]) -> Result<(), AppError> {
        reject_problems(PORTS_KEY, port_problems(ports))?;
        self.repo.put(PORTS_KEY, &ports).await?;
        Ok(())
    }

    pub async fn put_locations(
        &self,
        platform: Platform,
        locations: &[Location],
    ) -> Result<(), AppError> {
        let key = platform.locations_key();
        reject_problems(&key, location_problems(locations))?;
        self.repo.put(&key, &locations).await?;
        Ok(())
    }

    /// Presence and size of every expected key.
    pub async fn status(&self) -> Result<Vec<KeyStatus>, AppError> {
        let mut statuses = Vec::new();
        for key in expected_keys() {
            let status = match self.repo.get_entry(&key).await? {
                Some(entry) => KeyStatus {
                    entries: entry.value.as_array().map(|a| a.len()),
                    updated_at: Some(entry.updated_at),
                    key,
                },
                None => KeyStatus {
                    key,
                    updated_at: None,
                    entries: None,
                },
            };
            statuses.push(status);
        }
        Ok(statuses)
    }

    /// Remove one reference blob. Only the expected keys can be removed.
    /// Returns whether the key was set.
    pub async fn unset(&self, key: &str) -> Result<bool, AppError> {
        if !expected_keys().iter().any(|k| k == key) {
            return Err(AppError::Validation(vec![format!(
                "unknown reference key '{}', expected one of: {}",
                key,
                expected_keys().join(", ")
            )]));
        }
        let removed = self.repo.delete(key).await?;
        if removed {
            info!(key, "Reference data removed");
        }
        Ok(removed)
    }

    /// Every stored blob, for export.
    pub async fn snapshot(&self) -> Result<Vec<StoredBlob>, AppError> {
        Ok(self.repo.list_entries().await?)
    }
}

fn reject_problems(key: &str, problems: Vec<String>) -> Result<(), AppError> {
    if problems.is_empty() {
        Ok(())
    } else {
        Err(AppError::InvalidReferenceData {
            key: key.to_string(),
            problems,
        })
    }
}

/// Names must be present and unique; rates must be non-negative.
pub fn port_problems(ports: &[Port]) -> Vec<String> {
    let mut problems = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for (i, port) in ports.iter().enumerate() {
        if port.port.trim().is_empty() {
            problems.push(format!("ports[{}]: port name is empty", i));
        } else if !seen.insert(port.port.as_str()) {
            problems.push(format!("ports[{}]: duplicate port '{}'", i, port.port));
        }
        if let (Some(min), Some(max)) = (port.lead_weeks_min, port.lead_weeks_max) {
            if min > max {
                problems.push(format!(
                    "ports[{}]: lead_weeks_min {} exceeds lead_weeks_max {}",
                    i, min, max
                ));
            }
        }
        for (vehicle_type, rate) in &port.shipping_rates {
            if !rate.is_finite() || *rate < 0.0 {
                problems.push(format!(
                    "ports[{}]: rate for '{}' must be a non-negative number, got {}",
                    i, vehicle_type, rate
                ));
            }
        }
    }
    problems
}

/// Titles must be present; towing quotes must be non-negative.
pub fn location_problems(locations: &[Location]) -> Vec<String> {
    let mut problems = Vec::new();
    for (i, location) in locations.iter().enumerate() {
        if location.title.trim().is_empty() {
            problems.push(format!("locations[{}]: title is empty", i));
        }
        for cost in &location.shipping_cost {
            if !cost.price.is_finite() || cost.price < 0.0 {
                problems.push(format!(
                    "locations[{}] ({}): towing price to '{}' must be a non-negative number, got {}",
                    i, location.title, cost.port, cost.price
                ));
            }
        }
    }
    problems
}
