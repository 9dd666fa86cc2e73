use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// One unit of scan work. Consumed by exactly one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanJob {
    pub host: Arc<str>,
    pub port: u16,
}

/// Result of probing a single host:port.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    pub host: String,
    pub port: u16,
    pub open: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
    pub duration_ms: u64,
}
