//! Dotted API version numbers and the compatibility check used at bootstrap.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid version '{0}'")]
pub struct InvalidVersion(pub String);

/// A dotted numeric version such as `1.2` or `1.2.13`.
///
/// Ordering compares segments left to right, treating missing trailing
/// segments as `0`, so `1.2 == 1.2.0`. The original text is preserved for
/// display and for building endpoint URLs.
#[derive(Debug, Clone)]
pub struct ApiVersion {
    raw: String,
    segments: Vec<u64>,
}

impl ApiVersion {
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    fn segment(&self, index: usize) -> u64 {
        self.segments.get(index).copied().unwrap_or(0)
    }
}

impl FromStr for ApiVersion {
    type Err = InvalidVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(InvalidVersion(s.to_string()));
        }
        let segments = raw
            .split('.')
            .map(|segment| segment.parse::<u64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| InvalidVersion(s.to_string()))?;
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }
}

impl Ord for ApiVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        (0..len)
            .map(|i| self.segment(i).cmp(&other.segment(i)))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for ApiVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ApiVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ApiVersion {}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Returns true when `current` is at least `required`.
///
/// Either side failing to parse counts as incompatible.
pub fn check_version(required: &str, current: &str) -> bool {
    match (required.parse::<ApiVersion>(), current.parse::<ApiVersion>()) {
        (Ok(required), Ok(current)) => current >= required,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> ApiVersion {
        s.parse().unwrap()
    }

    #[test]
    fn newer_server_is_compatible() {
        assert!(check_version("1.2", "1.3.0"));
    }

    #[test]
    fn older_server_is_not_compatible() {
        assert!(!check_version("1.3", "1.2.9"));
    }

    #[test]
    fn missing_segments_count_as_zero() {
        assert!(check_version("1.2.0", "1.2"));
        assert!(check_version("1.2", "1.2.0"));
        assert_eq!(v("1.2"), v("1.2.0"));
    }

    #[test]
    fn segments_compare_numerically() {
        assert!(v("1.10") > v("1.9"));
        assert!(v("1.2.13") > v("1.2.2"));
    }

    #[test]
    fn garbage_is_never_compatible() {
        assert!(!check_version("1.2", "latest"));
        assert!(!check_version("", "1.2"));
        assert!(!check_version("1..2", "1.2"));
    }

    #[test]
    fn display_keeps_original_text() {
        assert_eq!(v(" 1.2.13 ").to_string(), "1.2.13");
        assert_eq!(v("1.2").as_str(), "1.2");
    }

    #[test]
    fn parse_error_carries_input() {
        let err = "one.two".parse::<ApiVersion>().unwrap_err();
        assert_eq!(err, InvalidVersion("one.two".to_string()));
    }
}
