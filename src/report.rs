use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use time::{format_description::well_known, OffsetDateTime};
use tokio::sync::mpsc;

use crate::types::ScanOutcome;

/// Sorted outcomes of one completed (or cancelled) scan.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub host: String,
    pub started_at: String,
    pub elapsed_ms: u64,
    /// Number of ports that were queued.
    pub scanned_total: u64,
    /// Set when the scan stopped early; `outcomes` may then be shorter than `scanned_total`.
    pub cancelled: bool,
    pub outcomes: Vec<ScanOutcome>,
}

impl ScanReport {
    pub fn new(
        host: impl Into<String>,
        started_at: String,
        elapsed_ms: u64,
        scanned_total: u64,
        cancelled: bool,
        mut outcomes: Vec<ScanOutcome>,
    ) -> Self {
        sort_outcomes(&mut outcomes);
        Self {
            host: host.into(),
            started_at,
            elapsed_ms,
            scanned_total,
            cancelled,
            outcomes,
        }
    }

    pub fn open_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.open).count()
    }

    pub fn open_ports(&self) -> impl Iterator<Item = &ScanOutcome> {
        self.outcomes.iter().filter(|o| o.open)
    }
}

/// Order by port, then host.
pub fn sort_outcomes(outcomes: &mut [ScanOutcome]) {
    outcomes.sort_by(|a, b| a.port.cmp(&b.port).then_with(|| a.host.cmp(&b.host)));
}

/// Drain `results` until every sender is gone, calling `on_open` as soon as an open
/// outcome arrives. Nothing is dropped or deduplicated.
pub async fn collect_outcomes<F>(
    mut results: mpsc::Receiver<ScanOutcome>,
    capacity: usize,
    mut on_open: F,
) -> Vec<ScanOutcome>
where
    F: FnMut(&ScanOutcome),
{
    let mut out = Vec::with_capacity(capacity);
    while let Some(outcome) = results.recv().await {
        if outcome.open {
            on_open(&outcome);
        }
        out.push(outcome);
    }
    out
}

/// Write the sorted outcomes as a pretty JSON array.
pub fn write_json(path: &Path, report: &ScanReport) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create output file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &report.outcomes)
        .with_context(|| format!("failed to write JSON to {}", path.display()))?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&well_known::Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}
