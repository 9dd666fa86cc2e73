use std::collections::BTreeSet;

use crate::error::ParseError;

pub const MIN_PORT: i64 = 1;
pub const MAX_PORT: i64 = 65535;

/// Ascending, duplicate-free list of TCP ports in `1..=65535`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortSet(Vec<u16>);

impl PortSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.0.iter().copied()
    }

    pub fn into_vec(self) -> Vec<u16> {
        self.0
    }
}

impl From<BTreeSet<u16>> for PortSet {
    fn from(set: BTreeSet<u16>) -> Self {
        Self(set.into_iter().collect())
    }
}

/// Parse a port specification such as `22,80,8000-8100` into a [`PortSet`].
///
/// Supported tokens, separated by commas:
/// - single port number: `80` (values outside 1..=65535 are skipped)
/// - inclusive range: `8000-8010` (endpoints clamped into 1..=65535)
/// - whitespace around tokens and empty tokens are ignored
///
/// A range whose start ends up above its end after clamping contributes no
/// ports and is not an error.
///
/// Every token must be a whole integer or integer range: trailing text such as
/// `80abc` or `1-2-3` is rejected, never truncated to its numeric prefix.
pub fn resolve(spec: &str) -> Result<PortSet, ParseError> {
    let mut set = BTreeSet::new();

    for token in spec.split(',').map(str::trim) {
        if token.is_empty() {
            continue;
        }

        if token.contains('-') {
            let (lo, hi) = parse_range(token)?;
            let lo = lo.max(MIN_PORT);
            let hi = hi.min(MAX_PORT);
            // Both ends are inside the u16 domain once clamped.
            set.extend((lo..=hi).map(|p| p as u16));
            continue;
        }

        let port: i64 = token
            .parse()
            .map_err(|_| ParseError::BadPort(token.to_string()))?;
        if (MIN_PORT..=MAX_PORT).contains(&port) {
            set.insert(port as u16);
        }
    }

    Ok(PortSet::from(set))
}

/// Split `lo-hi` into its two integers. A leading minus sign belongs to `lo`.
fn parse_range(token: &str) -> Result<(i64, i64), ParseError> {
    let bad = || ParseError::BadRange(token.to_string());

    let sep = token
        .char_indices()
        .skip(1)
        .find(|&(_, c)| c == '-')
        .map(|(i, _)| i)
        .ok_or_else(bad)?;
    let (a, b) = (&token[..sep], &token[sep + 1..]);

    let lo = a.trim().parse::<i64>().map_err(|_| bad())?;
    let hi = b.trim().parse::<i64>().map_err(|_| bad())?;
    Ok((lo, hi))
}
