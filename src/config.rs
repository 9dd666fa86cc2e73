use std::time::Duration;

use crate::error::ScanError;

pub const DEFAULT_PORT_SPEC: &str = "1-1024";
pub const DEFAULT_CONCURRENCY: usize = 200;
pub const DEFAULT_DIAL_TIMEOUT_MS: u64 = 300;
pub const DEFAULT_BANNER_READ_BYTES: usize = 128;

/// Upper bound on concurrent workers regardless of what was requested.
pub const MAX_CONCURRENCY: usize = 5_000;

/// Largest banner buffer a probe will allocate.
pub const MAX_BANNER_READ_BYTES: usize = 64 * 1024;

/// Immutable input to a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Target hostname or IP literal.
    pub host: String,
    /// Comma-separated ports and `lo-hi` ranges.
    pub port_spec: String,
    /// Number of concurrent workers.
    pub concurrency: usize,
    /// Connect timeout per port, in milliseconds.
    pub dial_timeout_ms: u64,
    /// Maximum banner bytes to read from an open port; 0 skips the read.
    pub banner_read_bytes: usize,
}

impl ScanConfig {
    pub fn new(host: impl Into<String>, port_spec: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port_spec: port_spec.into(),
            ..Self::default()
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_dial_timeout_ms(mut self, ms: u64) -> Self {
        self.dial_timeout_ms = ms;
        self
    }

    pub fn with_banner_read_bytes(mut self, bytes: usize) -> Self {
        self.banner_read_bytes = bytes;
        self
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_millis(self.dial_timeout_ms)
    }

    /// Worker count actually used for `jobs` queued ports.
    pub fn effective_concurrency(&self, jobs: usize) -> usize {
        self.concurrency.clamp(1, MAX_CONCURRENCY).min(jobs.max(1))
    }

    pub fn validate(&self) -> Result<(), ScanError> {
        if self.host.trim().is_empty() {
            return Err(ScanError::EmptyHost);
        }
        if self.banner_read_bytes > MAX_BANNER_READ_BYTES {
            return Err(ScanError::BannerTooLarge {
                requested: self.banner_read_bytes,
                max: MAX_BANNER_READ_BYTES,
            });
        }
        Ok(())
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port_spec: DEFAULT_PORT_SPEC.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            dial_timeout_ms: DEFAULT_DIAL_TIMEOUT_MS,
            banner_read_bytes: DEFAULT_BANNER_READ_BYTES,
        }
    }
}
