use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::ports::{self, PortSet};
use crate::probe::probe;
use crate::report::{collect_outcomes, now_rfc3339, ScanReport};
use crate::types::{ScanJob, ScanOutcome};

type JobQueue = Arc<Mutex<mpsc::Receiver<ScanJob>>>;

/// Resolve the configured ports and scan them.
///
/// - A fixed pool of workers drains a pre-filled, closed job queue.
/// - Each port yields exactly one outcome unless the scan is cancelled.
/// - The returned report is sorted by port, then host.
pub async fn scan(config: &ScanConfig) -> Result<ScanReport, ScanError> {
    scan_internal(config, CancellationToken::new(), |_: &ScanOutcome| {}).await
}

/// Variant that accepts a `CancellationToken` to allow external cancellation.
pub async fn scan_with_cancel(
    config: &ScanConfig,
    cancel: CancellationToken,
) -> Result<ScanReport, ScanError> {
    scan_internal(config, cancel, |_: &ScanOutcome| {}).await
}

/// Variant that also calls `on_open` for every open port the moment it is found.
pub async fn scan_with_observer<F>(
    config: &ScanConfig,
    cancel: CancellationToken,
    on_open: F,
) -> Result<ScanReport, ScanError>
where
    F: FnMut(&ScanOutcome),
{
    scan_internal(config, cancel, on_open).await
}

async fn scan_internal<F>(
    config: &ScanConfig,
    cancel: CancellationToken,
    on_open: F,
) -> Result<ScanReport, ScanError>
where
    F: FnMut(&ScanOutcome),
{
    config.validate()?;
    let ports = ports::resolve(&config.port_spec)?;
    Ok(run_scan(config, &ports, cancel, on_open).await)
}

/// Scan an already resolved port set. Never fails; closed and unreachable ports are
/// ordinary outcomes.
pub async fn run_scan<F>(
    config: &ScanConfig,
    ports: &PortSet,
    cancel: CancellationToken,
    on_open: F,
) -> ScanReport
where
    F: FnMut(&ScanOutcome),
{
    let started_at = now_rfc3339();
    let start = Instant::now();
    let host: Arc<str> = Arc::from(config.host.trim());
    let total = ports.len();
    let workers = config.effective_concurrency(total);

    info!(
        host = %host,
        ports = total,
        workers,
        timeout_ms = config.dial_timeout_ms,
        "starting scan"
    );

    // Queue sized to the full job count, filled, then closed for writes.
    let (jobs_tx, jobs_rx) = mpsc::channel::<ScanJob>(total.max(1));
    for port in ports.iter() {
        let job = ScanJob {
            host: host.clone(),
            port,
        };
        if jobs_tx.send(job).await.is_err() {
            break;
        }
    }
    drop(jobs_tx);

    let jobs: JobQueue = Arc::new(Mutex::new(jobs_rx));
    let (results_tx, results_rx) = mpsc::channel::<ScanOutcome>(total.max(1));

    let mut set = JoinSet::new();
    if total > 0 {
        for id in 0..workers {
            set.spawn(worker(
                id,
                jobs.clone(),
                results_tx.clone(),
                cancel.clone(),
                config.dial_timeout(),
                config.banner_read_bytes,
            ));
        }
    }

    // Results stream closes only after every worker has stopped.
    let barrier = async move {
        while let Some(res) = set.join_next().await {
            if let Err(e) = res {
                warn!(error = %e, "scan worker failed");
            }
        }
        drop(results_tx);
    };
    let ((), outcomes) = tokio::join!(barrier, collect_outcomes(results_rx, total, on_open));

    // A token that fires after the last job finished leaves the report complete.
    let cancelled = cancel.is_cancelled() && outcomes.len() < total;
    let report = ScanReport::new(
        &*host,
        started_at,
        start.elapsed().as_millis() as u64,
        total as u64,
        cancelled,
        outcomes,
    );

    info!(
        host = %report.host,
        scanned = report.outcomes.len(),
        open = report.open_count(),
        elapsed_ms = report.elapsed_ms,
        cancelled,
        "scan finished"
    );
    report
}

/// Pull jobs until the queue is empty and closed or `cancel` fires between jobs.
async fn worker(
    id: usize,
    jobs: JobQueue,
    results: mpsc::Sender<ScanOutcome>,
    cancel: CancellationToken,
    dial_timeout: Duration,
    banner_read_bytes: usize,
) {
    let mut done = 0usize;
    loop {
        let job = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(worker = id, done, "worker cancelled");
                return;
            }
            job = next_job(&jobs) => job,
        };
        let Some(job) = job else {
            break;
        };

        let outcome = probe(&job.host, job.port, dial_timeout, banner_read_bytes).await;
        if outcome.open {
            debug!(worker = id, port = outcome.port, "port open");
        }
        if results.send(outcome).await.is_err() {
            warn!(worker = id, "result channel closed early");
            return;
        }
        done += 1;
    }
    debug!(worker = id, done, "worker drained queue");
}

async fn next_job(jobs: &Mutex<mpsc::Receiver<ScanJob>>) -> Option<ScanJob> {
    jobs.lock().await.recv().await
}
