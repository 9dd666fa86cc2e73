use thiserror::Error;

/// Malformed port specification text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("bad range: {0}")]
    BadRange(String),
    #[error("bad port: {0}")]
    BadPort(String),
}

/// Everything that can stop a scan before the first probe is sent.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("invalid ports: {0}")]
    Ports(#[from] ParseError),
    #[error("target host must not be empty")]
    EmptyHost,
    #[error("banner read of {requested} bytes exceeds the {max} byte limit")]
    BannerTooLarge { requested: usize, max: usize },
}
