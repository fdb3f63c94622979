use anyhow::{bail, Context, Result};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info};

use crate::application::{location_problems, port_problems, EstimateService};
use crate::domain::{
    canonical_port, FeeSchedule, FxRate, Location, Platform, Port, PortIndex, FEES_KEY, FX_KEY,
    PORTS_KEY,
};

/// Which reference blob a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Fees,
    Fx,
    Ports,
    Locations(Platform),
}

impl ReferenceKind {
    /// Load order for a directory: ports before locations so the route
    /// cross-check sees the freshest port catalog.
    pub const ALL: [ReferenceKind; 5] = [
        ReferenceKind::Fees,
        ReferenceKind::Fx,
        ReferenceKind::Ports,
        ReferenceKind::Locations(Platform::Copart),
        ReferenceKind::Locations(Platform::Iaai),
    ];

    /// Parse a kind name as given on the command line. `locations` needs a
    /// platform.
    pub fn parse(kind: &str, platform: Option<Platform>) -> Result<Self> {
        match (kind.trim().to_lowercase().as_str(), platform) {
            ("fees", _) => Ok(ReferenceKind::Fees),
            ("fx", _) => Ok(ReferenceKind::Fx),
            ("ports", _) => Ok(ReferenceKind::Ports),
            ("locations", Some(platform)) => Ok(ReferenceKind::Locations(platform)),
            ("locations", None) => bail!("Loading locations requires --platform copart|iaai"),
            (other, _) => bail!(
                "Unknown reference kind '{}'. Use: fees, fx, ports, locations",
                other
            ),
        }
    }

    /// Store key the blob lives under.
    pub fn key(&self) -> String {
        match self {
            ReferenceKind::Fees => FEES_KEY.to_string(),
            ReferenceKind::Fx => FX_KEY.to_string(),
            ReferenceKind::Ports => PORTS_KEY.to_string(),
            ReferenceKind::Locations(platform) => platform.locations_key(),
        }
    }

    /// Conventional file name inside a reference directory.
    pub fn file_name(&self) -> String {
        match self {
            ReferenceKind::Fees => "fees_import.json".to_string(),
            ReferenceKind::Fx => "fx_usd_hnl.json".to_string(),
            ReferenceKind::Ports => "ports.json".to_string(),
            ReferenceKind::Locations(platform) => format!("locations_{}.json", platform),
        }
    }
}

/// Options for import operations
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Parse and validate only; nothing is written
    pub dry_run: bool,
}

/// Outcome of importing one reference file
#[derive(Debug, Clone)]
pub struct ImportResult {
    pub kind: ReferenceKind,
    pub key: String,
    /// Records in the blob (brackets for fees, 1 for fx)
    pub entries: usize,
    pub stored: bool,
    /// Blocking problems; when non-empty nothing was stored
    pub problems: Vec<String>,
    /// Non-blocking findings, e.g. routes that will never be priced
    pub warnings: Vec<String>,
}

impl ImportResult {
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }
}

enum Parsed {
    Fees(FeeSchedule),
    Fx(FxRate),
    Ports(Vec<Port>),
    Locations(Platform, Vec<Location>),
}

impl Parsed {
    fn read<R: Read>(kind: ReferenceKind, reader: R) -> Result<Self> {
        let parsed = match kind {
            ReferenceKind::Fees => Parsed::Fees(serde_json::from_reader(reader)?),
            ReferenceKind::Fx => Parsed::Fx(serde_json::from_reader(reader)?),
            ReferenceKind::Ports => Parsed::Ports(serde_json::from_reader(reader)?),
            ReferenceKind::Locations(platform) => {
                Parsed::Locations(platform, serde_json::from_reader(reader)?)
            }
        };
        Ok(parsed)
    }

    fn entries(&self) -> usize {
        match self {
            Parsed::Fees(fees) => {
                [&fees.with_cafta, &fees.without_cafta]
                    .iter()
                    .map(|b| b.small_engine.len() + b.turismo_camioneta.len())
                    .sum::<usize>()
                    + fees.eco_tax_lps.len()
            }
            Parsed::Fx(_) => 1,
            Parsed::Ports(ports) => ports.len(),
            Parsed::Locations(_, locations) => locations.len(),
        }
    }

    fn problems(&self) -> Vec<String> {
        match self {
            Parsed::Fees(fees) => fees.problems(),
            Parsed::Fx(fx) => fx.problems(),
            Parsed::Ports(ports) => port_problems(ports),
            Parsed::Locations(_, locations) => location_problems(locations),
        }
    }
}

/// Importer for loading reference files into the store
pub struct Importer<'a> {
    service: &'a EstimateService,
}

impl<'a> Importer<'a> {
    pub fn new(service: &'a EstimateService) -> Self {
        Self { service }
    }

    /// Import one reference blob from a JSON reader.
    pub async fn import_reader<R: Read>(
        &self,
        kind: ReferenceKind,
        reader: R,
        options: &ImportOptions,
    ) -> Result<ImportResult> {
        let parsed = Parsed::read(kind, reader)
            .with_context(|| format!("'{}' does not have the expected shape", kind.key()))?;
        self.import_parsed(kind, parsed, None, options).await
    }

    /// Import one reference blob from a JSON file.
    pub async fn import_file(
        &self,
        kind: ReferenceKind,
        path: &Path,
        options: &ImportOptions,
    ) -> Result<ImportResult> {
        let parsed = read_file(kind, path)?;
        self.import_parsed(kind, parsed, None, options).await
    }

    /// Import every conventional reference file found in `dir`. Missing
    /// files are skipped; a file that fails to parse aborts the load before
    /// any file is stored.
    pub async fn import_dir(
        &self,
        dir: &Path,
        options: &ImportOptions,
    ) -> Result<Vec<ImportResult>> {
        if !dir.is_dir() {
            bail!("'{}' is not a directory", dir.display());
        }

        // Every present file is read before anything is stored, so a file
        // that fails to parse leaves the store untouched.
        let mut parsed_files = Vec::new();
        for kind in ReferenceKind::ALL {
            let path = dir.join(kind.file_name());
            if !path.is_file() {
                debug!(file = %path.display(), "Reference file not present, skipping");
                continue;
            }
            parsed_files.push((kind, read_file(kind, &path)?));
        }

        // Ports parsed in this run, used for the route cross-check even when
        // nothing is written.
        let fresh_ports: Option<Vec<Port>> =
            parsed_files.iter().find_map(|(_, parsed)| match parsed {
                Parsed::Ports(ports) => Some(ports.clone()),
                _ => None,
            });

        let mut results = Vec::new();
        for (kind, parsed) in parsed_files {
            results.push(
                self.import_parsed(kind, parsed, fresh_ports.as_deref(), options)
                    .await?,
            );
        }

        Ok(results)
    }

    async fn import_parsed(
        &self,
        kind: ReferenceKind,
        parsed: Parsed,
        known_ports: Option<&[Port]>,
        options: &ImportOptions,
    ) -> Result<ImportResult> {
        let mut result = ImportResult {
            kind,
            key: kind.key(),
            entries: parsed.entries(),
            stored: false,
            problems: parsed.problems(),
            warnings: Vec::new(),
        };

        if let Parsed::Locations(_, locations) = &parsed {
            result.warnings = match known_ports {
                Some(ports) => unrouted_ports(locations, ports),
                None => {
                    let stored: Vec<Port> = self
                        .service
                        .repository()
                        .get(PORTS_KEY)
                        .await?
                        .unwrap_or_default();
                    unrouted_ports(locations, &stored)
                }
            };
        }

        if !result.is_ok() || options.dry_run {
            return Ok(result);
        }

        match &parsed {
            Parsed::Fees(fees) => self.service.put_fees(fees).await?,
            Parsed::Fx(fx) => self.service.put_fx(fx).await?,
            Parsed::Ports(ports) => self.service.put_ports(ports).await?,
            Parsed::Locations(platform, locations) => {
                self.service.put_locations(*platform, locations).await?
            }
        }
        result.stored = true;
        info!(key = %result.key, entries = result.entries, "Reference data loaded");

        Ok(result)
    }
}

fn read_file(kind: ReferenceKind, path: &Path) -> Result<Parsed> {
    let file = File::open(path).with_context(|| format!("Failed to open '{}'", path.display()))?;
    Parsed::read(kind, BufReader::new(file))
        .with_context(|| format!("'{}' is not a valid {} file", path.display(), kind.key()))
}

/// Ports named by location routes that the port catalog does not know.
/// Those routes are dropped at estimate time.
pub fn unrouted_ports(locations: &[Location], ports: &[Port]) -> Vec<String> {
    let index = PortIndex::new(ports);
    let missing: BTreeSet<String> = locations
        .iter()
        .flat_map(|l| &l.shipping_cost)
        .map(|cost| canonical_port(&cost.port))
        .filter(|name| index.get(name).is_none())
        .collect();

    missing
        .into_iter()
        .map(|name| {
            format!(
                "port '{}' is not in the port catalog; its routes will be skipped",
                name
            )
        })
        .collect()
}
