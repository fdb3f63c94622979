use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::EstimateService;
use crate::domain::{format_cents, Estimate};

/// Store snapshot for full export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub entries: Vec<SnapshotEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub key: String,
    pub updated_at: DateTime<Utc>,
    pub value: serde_json::Value,
}

/// Exporter for the reference store
pub struct Exporter<'a> {
    service: &'a EstimateService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a EstimateService) -> Self {
        Self { service }
    }

    /// Export every stored blob as one pretty-printed JSON document.
    pub async fn export_snapshot_json<W: Write>(&self, mut writer: W) -> Result<StoreSnapshot> {
        let entries = self
            .service
            .snapshot()
            .await?
            .into_iter()
            .map(|blob| SnapshotEntry {
                key: blob.key,
                updated_at: blob.updated_at,
                value: blob.value,
            })
            .collect();

        let snapshot = StoreSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            entries,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}

/// Write an estimate as the JSON body the HTTP API returns (without `ok`).
pub fn write_estimate_json<W: Write>(estimate: &Estimate, mut writer: W) -> Result<()> {
    let json = serde_json::to_string_pretty(estimate)?;
    writer.write_all(json.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Write an estimate as CSV, one row per (port, vehicle type). Returns the
/// number of rows written.
pub fn write_estimate_csv<W: Write>(estimate: &Estimate, writer: W) -> Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer.write_record([
        "port",
        "vehicle_type",
        "lead_weeks_min",
        "lead_weeks_max",
        "grua_usd",
        "flete_usd",
        "cif_usd",
        "dai_pct",
        "sc_pct",
        "dai_usd",
        "sc_usd",
        "isv_usd",
        "taxes_usd",
        "duties_usd",
        "other_fees_usd",
        "total_usd",
        "cif_lps",
        "taxes_lps",
        "duties_lps",
        "other_fees_lps",
        "total_lps",
    ])?;

    let weeks = |w: Option<u32>| w.map(|w| w.to_string()).unwrap_or_default();

    let mut count = 0;
    for port in &estimate.results {
        for quote in &port.vehicle_type_quotes {
            let usd = &quote.breakdown.usd;
            csv_writer.write_record([
                port.port.clone(),
                quote.vehicle_type.clone(),
                weeks(quote.lead_weeks.min),
                weeks(quote.lead_weeks.max),
                format_cents(port.grua_usd),
                format_cents(quote.flete_usd),
                format_cents(quote.cif_usd),
                quote.dai_pct.to_string(),
                quote.sc_pct.to_string(),
                format_cents(usd.dai),
                format_cents(usd.sc),
                format_cents(usd.isv),
                format_cents(quote.totals.usd.taxes),
                format_cents(quote.totals.usd.duties),
                format_cents(quote.totals.usd.other_fees),
                format_cents(quote.totals.usd.total),
                format_cents(quote.cif_lps),
                format_cents(quote.totals.lps.taxes),
                format_cents(quote.totals.lps.duties),
                format_cents(quote.totals.lps.other_fees),
                format_cents(quote.totals.lps.total),
            ])?;
            count += 1;
        }
    }

    csv_writer.flush()?;
    Ok(count)
}
