use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::fs::File;
use std::io::{stdout, Write};
use std::net::SocketAddr;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use crate::application::{EstimateService, KeyStatus, RawEstimateRequest};
use crate::domain::{
    format_cents, format_grouped, from_cents, parse_cents, Estimate, Platform,
    ShippingVehicleType, FEES_KEY, FX_KEY, PORTS_KEY,
};
use crate::io::{
    write_estimate_csv, write_estimate_json, Exporter, ImportOptions, ImportResult, Importer,
    ReferenceKind,
};

/// Aduana - Honduras vehicle import cost estimator
#[derive(Parser)]
#[command(name = "aduana")]
#[command(about = "Landed-cost estimates for auction vehicles imported into Honduras")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "ADUANA_DATABASE", default_value = "aduana.db")]
    pub database: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Load one reference file into the store
    Load {
        /// What the file holds: fees, fx, ports, locations
        kind: String,

        /// JSON file to load
        #[arg(short, long)]
        input: String,

        /// Auction platform (required for locations): copart, iaai
        #[arg(short, long)]
        platform: Option<String>,

        /// Validate without storing
        #[arg(long)]
        dry_run: bool,
    },

    /// Load every reference file found in a directory
    LoadDir {
        /// Directory holding fees_import.json, fx_usd_hnl.json, ports.json,
        /// locations_copart.json, locations_iaai.json
        dir: String,

        /// Validate without storing
        #[arg(long)]
        dry_run: bool,
    },

    /// Exchange-rate snapshot commands
    #[command(subcommand)]
    Fx(FxCommands),

    /// Show which reference data is present
    Status,

    /// Remove one reference blob from the store
    Unset {
        /// Store key: fees:import, fx:usd_hnl, ports, locations:copart, locations:iaai
        key: String,
    },

    /// Estimate the landed cost of a vehicle
    Estimate {
        /// Model year
        #[arg(long)]
        year: u32,

        /// Auction price in USD (e.g., "4500.00" or "4500")
        #[arg(long)]
        price: String,

        /// Pickup location, city and state (e.g., "Dallas (TX)")
        #[arg(short, long)]
        location: String,

        /// Auction platform: copart, iaai
        #[arg(short, long)]
        platform: String,

        /// Vehicle identification number
        #[arg(long)]
        vin: String,

        /// Engine displacement in liters
        #[arg(long)]
        engine_size: Option<f64>,

        /// Shipping size to show (e.g., small_cars, regular_suvs; all if omitted)
        #[arg(long)]
        vehicle_type: Option<String>,

        /// Output format: table, json, csv
        #[arg(long, default_value = "table")]
        format: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Export the whole store as JSON
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Run the HTTP API
    Serve {
        /// Address to listen on
        #[arg(long, env = "ADUANA_BIND", default_value = "127.0.0.1:8787")]
        bind: SocketAddr,
    },
}

#[derive(Subcommand)]
pub enum FxCommands {
    /// Show the current USD -> HNL rate
    Show,

    /// Replace the USD -> HNL rate
    Set {
        /// Lempiras per dollar (e.g., "24.65")
        value: f64,

        /// Date the rate applies to (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },
}

/// Parse `--price` the way the HTTP API reads it: thousands separators are
/// allowed and extra decimals round half-up.
fn price_value(price: &str) -> Result<serde_json::Value> {
    let cents = parse_cents(price).context("Invalid price format. Use '4500.00' or '4500'")?;
    Ok(json!(from_cents(cents)))
}

/// Install the global log subscriber. `RUST_LOG` wins over `--verbose`.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A subscriber may already be installed (tests, embedding); keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        init_tracing(self.verbose);

        match self.command {
            Commands::Init => {
                EstimateService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Load {
                kind,
                input,
                platform,
                dry_run,
            } => {
                let service = EstimateService::connect(&self.database).await?;
                let platform = platform.as_deref().map(parse_platform).transpose()?;
                let kind = ReferenceKind::parse(&kind, platform)?;
                let options = ImportOptions { dry_run };

                let result = Importer::new(&service)
                    .import_file(kind, Path::new(&input), &options)
                    .await?;
                print_import_result(&result, dry_run);
                if !result.is_ok() {
                    bail!("{} was not loaded", result.key);
                }
            }

            Commands::LoadDir { dir, dry_run } => {
                let service = EstimateService::connect(&self.database).await?;
                let options = ImportOptions { dry_run };

                let results = Importer::new(&service)
                    .import_dir(Path::new(&dir), &options)
                    .await?;
                if results.is_empty() {
                    println!("No reference files found in {}", dir);
                }
                for result in &results {
                    print_import_result(result, dry_run);
                }
                let failed = results.iter().filter(|r| !r.is_ok()).count();
                if failed > 0 {
                    bail!("{} of {} reference files were not loaded", failed, results.len());
                }
            }

            Commands::Fx(fx_cmd) => {
                let service = EstimateService::connect(&self.database).await?;
                run_fx_command(&service, fx_cmd).await?;
            }

            Commands::Status => {
                let service = EstimateService::connect(&self.database).await?;
                run_status_command(&service).await?;
            }

            Commands::Unset { key } => {
                let service = EstimateService::connect(&self.database).await?;
                if service.unset(&key).await? {
                    println!("Removed {}", key);
                } else {
                    println!("{} was not set", key);
                }
            }

            Commands::Estimate {
                year,
                price,
                location,
                platform,
                vin,
                engine_size,
                vehicle_type,
                format,
                output,
            } => {
                let service = EstimateService::connect(&self.database).await?;

                let raw = RawEstimateRequest {
                    year: Some(json!(year)),
                    price: Some(price_value(&price)?),
                    location: Some(json!(location)),
                    platform: Some(json!(platform)),
                    vin: Some(json!(vin)),
                    engine_size: engine_size.map(|size| json!(size)),
                    vehicle_type: vehicle_type.map(|key| json!(key)),
                };
                let estimate = service.estimate_raw(&raw).await?;

                run_estimate_output(&estimate, &format, output.as_deref())?;
            }

            Commands::Export { output } => {
                let service = EstimateService::connect(&self.database).await?;
                let writer = open_output(output.as_deref())?;
                let snapshot = Exporter::new(&service).export_snapshot_json(writer).await?;
                if output.is_some() {
                    eprintln!("Exported {} reference entries", snapshot.entries.len());
                }
            }

            Commands::Serve { bind } => {
                let service = EstimateService::connect(&self.database).await?;
                crate::api::serve(bind, service).await?;
            }
        }

        Ok(())
    }
}

async fn run_fx_command(service: &EstimateService, cmd: FxCommands) -> Result<()> {
    match cmd {
        FxCommands::Show => {
            let fx = service.fx().await?;
            println!("USD -> HNL: {} (as of {})", fx.value, fx.date);
        }

        FxCommands::Set { value, date } => {
            let date = match date {
                Some(date_str) => parse_date(&date_str)?,
                None => Utc::now().date_naive(),
            };
            let fx = service.set_fx(value, date).await?;
            println!("FX updated: {} (as of {})", fx.value, fx.date);
        }
    }

    Ok(())
}

async fn run_status_command(service: &EstimateService) -> Result<()> {
    let statuses = service.status().await?;

    println!("{:<20} {:<10} {:>8} {:<25}", "KEY", "STATUS", "ENTRIES", "UPDATED");
    println!("{}", "-".repeat(66));
    for status in &statuses {
        println!(
            "{:<20} {:<10} {:>8} {:<25}",
            status.key,
            if status.is_present() { "present" } else { "missing" },
            status.entries.map(|n| n.to_string()).unwrap_or_default(),
            status
                .updated_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_default()
        );
    }

    let missing = missing_required(&statuses);
    if !missing.is_empty() {
        bail!("Reference data incomplete: {}", missing.join(", "));
    }
    Ok(())
}

/// Shared keys are always required; of the location catalogs, at least one
/// platform must be loaded.
fn missing_required(statuses: &[KeyStatus]) -> Vec<String> {
    let present = |key: &str| statuses.iter().any(|s| s.key == key && s.is_present());

    let mut missing: Vec<String> = [FEES_KEY, FX_KEY, PORTS_KEY]
        .into_iter()
        .filter(|key| !present(key))
        .map(String::from)
        .collect();

    if !Platform::ALL.iter().any(|p| present(&p.locations_key())) {
        missing.push("locations:*".to_string());
    }
    missing
}

fn run_estimate_output(estimate: &Estimate, format: &str, output: Option<&str>) -> Result<()> {
    match format {
        "json" => write_estimate_json(estimate, open_output(output)?)?,
        "csv" => {
            let rows = write_estimate_csv(estimate, open_output(output)?)?;
            if output.is_some() {
                eprintln!("Exported {} quotes", rows);
            }
        }
        "table" => {
            let mut writer = open_output(output)?;
            print_estimate_table(estimate, &mut writer)?;
        }
        other => bail!("Invalid format '{}'. Valid formats: table, json, csv", other),
    }
    Ok(())
}

fn print_estimate_table<W: Write>(estimate: &Estimate, out: &mut W) -> Result<()> {
    let input = &estimate.input;
    writeln!(
        out,
        "Estimate: {} {} on {} ({})",
        input.year,
        input.vin,
        input.platform,
        format_grouped(input.price)
    )?;
    writeln!(out, "Location: {}", estimate.matched_location.title)?;
    writeln!(out, "FX:       {} HNL/USD (as of {})", estimate.fx, estimate.as_of_fx_date)?;
    writeln!(
        out,
        "Tariff:   {}, {}",
        if input.with_cafta { "CAFTA" } else { "no CAFTA" },
        input.category
    )?;

    if estimate.results.is_empty() {
        writeln!(out)?;
        writeln!(out, "No shipping routes are priced from this location.")?;
        return Ok(());
    }

    let wanted = input.vehicle_type.as_deref();

    for port in &estimate.results {
        writeln!(out)?;
        writeln!(
            out,
            "{}  (tow {} USD, {})",
            port.port,
            format_grouped(port.grua_usd),
            lead_weeks_label(port.lead_weeks.min, port.lead_weeks.max)
        )?;
        writeln!(
            out,
            "  {:<28} {:>10} {:>11} {:>6} {:>6} {:>11} {:>11} {:>11} {:>14}",
            "VEHICLE TYPE", "FLETE", "CIF", "DAI%", "SC%", "TAXES", "DUTIES", "TOTAL USD", "TOTAL LPS"
        )?;
        writeln!(out, "  {}", "-".repeat(116))?;

        let quotes = port
            .vehicle_type_quotes
            .iter()
            .filter(|q| wanted.is_none_or(|w| q.vehicle_type == w));
        let mut shown = 0;
        for quote in quotes {
            writeln!(
                out,
                "  {:<28} {:>10} {:>11} {:>6} {:>6} {:>11} {:>11} {:>11} {:>14}",
                truncate(ShippingVehicleType::from_key(&quote.vehicle_type).label(), 28),
                format_grouped(quote.flete_usd),
                format_grouped(quote.cif_usd),
                quote.dai_pct,
                quote.sc_pct,
                format_grouped(quote.totals.usd.taxes),
                format_grouped(quote.totals.usd.duties),
                format_grouped(quote.totals.usd.total),
                format_grouped(quote.totals.lps.total)
            )?;
            shown += 1;
        }
        if shown == 0 {
            writeln!(out, "  (no rate for this vehicle type)")?;
        }
    }

    if let Some((port, quote)) = wanted.and_then(|w| estimate.cheapest_for(w)) {
        writeln!(out)?;
        writeln!(
            out,
            "Cheapest landed cost: {} via {} (CIF {} + import {} USD)",
            format_grouped(quote.cif_usd + quote.totals.usd.total),
            port.port,
            format_cents(quote.cif_usd),
            format_cents(quote.totals.usd.total)
        )?;
    }

    out.flush()?;
    Ok(())
}

fn print_import_result(result: &ImportResult, dry_run: bool) {
    let verb = if !result.is_ok() {
        "Rejected"
    } else if dry_run {
        "Valid"
    } else {
        "Loaded"
    };
    println!("{} {}: {} entries", verb, result.key, result.entries);
    for problem in &result.problems {
        println!("  error: {}", problem);
    }
    for warning in &result.warnings {
        println!("  warning: {}", warning);
    }
}

fn lead_weeks_label(min: Option<u32>, max: Option<u32>) -> String {
    match (min, max) {
        (Some(min), Some(max)) if min == max => format!("{} weeks", min),
        (Some(min), Some(max)) => format!("{}-{} weeks", min, max),
        (Some(min), None) => format!("{}+ weeks", min),
        (None, Some(max)) => format!("up to {} weeks", max),
        (None, None) => "lead time unknown".to_string(),
    }
}

fn open_output(output: Option<&str>) -> Result<Box<dyn Write>> {
    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };
    Ok(writer)
}

fn parse_platform(s: &str) -> Result<Platform> {
    Platform::from_str(s)
        .ok_or_else(|| anyhow::anyhow!("Invalid platform '{}'. Use: copart, iaai", s))
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}

fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .with_context(|| format!("Invalid date format '{}'. Use YYYY-MM-DD", date_str))
}
