use std::fmt;

use serde::Serialize;

use crate::model::StationId;

/// A single page request that did not produce a usable body.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to access {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to access {url}: HTTP {status}")]
    Status { url: String, status: u16 },
}

impl FetchError {
    /// Whether retrying the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport { .. } => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
        }
    }
}

/// Which of a region's two station batches a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    Measurements,
    Intervals,
}

impl fmt::Display for BatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchKind::Measurements => f.write_str("measurement"),
            BatchKind::Intervals => f.write_str("interval"),
        }
    }
}

/// Failure of a bounded-concurrency station batch, or of the merge after it.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("{kind} fetch for station {station} failed: {source}")]
    Station {
        kind: BatchKind,
        station: StationId,
        #[source]
        source: FetchError,
    },
    #[error("station {station} has measurements but no sampling interval")]
    MissingInterval { station: StationId },
    #[error("concurrency limiter closed")]
    LimiterClosed,
}

/// Failure scoped to one region pipeline. Sibling regions are unaffected.
#[derive(Debug, thiserror::Error)]
pub enum RegionError {
    #[error("invalid url for region {region_id}: {source}")]
    InvalidUrl {
        region_id: u32,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to access region {region_id}: {source}")]
    Fetch {
        region_id: u32,
        #[source]
        source: FetchError,
    },
    #[error("failed to gather measurements for {region}: {source}")]
    Batch {
        region_id: u32,
        region: String,
        #[source]
        source: BatchError,
    },
}

impl RegionError {
    pub fn region_id(&self) -> u32 {
        match self {
            RegionError::InvalidUrl { region_id, .. }
            | RegionError::Fetch { region_id, .. }
            | RegionError::Batch { region_id, .. } => *region_id,
        }
    }
}

/// A collection run in which at least one region failed. No partial document
/// is produced alongside it.
#[derive(Debug, thiserror::Error)]
#[error("{} of {total} regions failed: {}", .failures.len(), summarize(.failures))]
pub struct CollectionError {
    pub total: usize,
    pub failures: Vec<RegionError>,
}

impl CollectionError {
    /// The structured `{ "message": ... }` failure handed to callers.
    pub fn report(&self) -> FailureReport {
        FailureReport {
            message: self.to_string(),
        }
    }
}

fn summarize(failures: &[RegionError]) -> String {
    failures
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureReport {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_classified() {
        let err = |status| FetchError::Status {
            url: "http://x/".into(),
            status,
        };
        assert!(err(429).is_transient());
        assert!(err(503).is_transient());
        assert!(!err(404).is_transient());
    }

    #[test]
    fn collection_report_names_failing_regions() {
        let err = CollectionError {
            total: 3,
            failures: vec![RegionError::Batch {
                region_id: 12,
                region: "Haifa".into(),
                source: BatchError::MissingInterval {
                    station: StationId(4),
                },
            }],
        };
        let report = err.report();
        assert!(report.message.starts_with("1 of 3 regions failed"));
        assert!(report.message.contains("Haifa"));
        assert!(report.message.contains("#4"));
    }
}
