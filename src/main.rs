use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use portsweep::config::{
    ScanConfig, DEFAULT_BANNER_READ_BYTES, DEFAULT_CONCURRENCY, DEFAULT_DIAL_TIMEOUT_MS,
    DEFAULT_PORT_SPEC,
};
use portsweep::report::{write_json, ScanReport};
use portsweep::{ports, scanner};

/// portsweep — concurrent TCP connect scanner with best-effort banner capture.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "portsweep",
    version,
    about = "Concurrent TCP connect scanner with best-effort banner capture.",
    long_about = None
)]
struct Cli {
    /// Target host (IP or hostname).
    #[arg(long)]
    host: String,

    /// Ports, e.g. 22,80,443 or 1-65535 or 22,80,8000-8100.
    #[arg(long, default_value = DEFAULT_PORT_SPEC)]
    ports: String,

    /// Number of concurrent workers (values above 5000 are reduced to 5000).
    #[arg(short = 'c', long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Dial timeout in milliseconds.
    #[arg(short = 't', long = "timeout-ms", default_value_t = DEFAULT_DIAL_TIMEOUT_MS)]
    timeout_ms: u64,

    /// Banner bytes to read from open ports (0 to skip, at most 65536).
    #[arg(short = 'b', long = "banner-bytes", default_value_t = DEFAULT_BANNER_READ_BYTES)]
    banner_bytes: usize,

    /// Write results as a pretty JSON array to this path.
    #[arg(short = 'o', long, default_value = "scan_results.json")]
    output: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn scan_config(&self) -> ScanConfig {
        ScanConfig::new(self.host.clone(), self.ports.clone())
            .with_concurrency(self.concurrency)
            .with_dial_timeout_ms(self.timeout_ms)
            .with_banner_read_bytes(self.banner_bytes)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.scan_config();
    config.validate()?;
    let port_set = ports::resolve(&config.port_spec).context("invalid ports")?;

    println!(
        "Scanning {} ({} ports, {} workers, {} ms timeout)",
        config.host,
        port_set.len(),
        config.effective_concurrency(port_set.len()),
        config.dial_timeout_ms
    );

    // Ctrl-C stops workers between jobs; whatever finished is still reported.
    let cancel = CancellationToken::new();
    let cancel_ctrlc = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping scan");
            cancel_ctrlc.cancel();
        }
    });

    let report = scanner::run_scan(&config, &port_set, cancel, |o| {
        println!(
            "[OPEN] {}:{} banner={}",
            o.host,
            o.port,
            o.banner.as_deref().map(escape_newlines).unwrap_or_default()
        );
    })
    .await;

    print_results_table(&report);

    write_json(&cli.output, &report)?;
    println!("Scan complete. Results saved to {}", cli.output.display());
    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn escape_newlines(s: &str) -> String {
    s.replace('\n', "\\n").replace('\r', "\\r")
}

fn print_results_table(report: &ScanReport) {
    let mut host_w = "host".len();
    let mut banner_w = "banner".len();
    for o in report.open_ports() {
        host_w = host_w.max(o.host.len());
        if let Some(b) = &o.banner {
            banner_w = banner_w.max(b.len().min(60));
        }
    }
    let port_w = 5usize;
    let dur_w = "duration_ms".len();

    println!(
        "\nOpen ports: {} (scanned: {}/{}, {} ms{})",
        report.open_count(),
        report.outcomes.len(),
        report.scanned_total,
        report.elapsed_ms,
        if report.cancelled { ", cancelled" } else { "" }
    );
    if report.open_count() == 0 {
        return;
    }
    println!(
        "{:<host_w$}  {:>port_w$}  {:>dur_w$}  {:<banner_w$}",
        "host", "port", "duration_ms", "banner"
    );
    println!(
        "{:-<host_w$}  {:-<port_w$}  {:-<dur_w$}  {:-<banner_w$}",
        "", "", "", ""
    );
    for o in report.open_ports() {
        let mut bsnip = o.banner.as_deref().map(escape_newlines).unwrap_or_default();
        if bsnip.chars().count() > 60 {
            bsnip = bsnip.chars().take(60).collect();
        }
        println!(
            "{:<host_w$}  {:>port_w$}  {:>dur_w$}  {:<banner_w$}",
            o.host, o.port, o.duration_ms, bsnip
        );
    }
}
