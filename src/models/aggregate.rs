//! Requests and results of an aggregation run.

use serde::Serialize;
use std::path::PathBuf;

use super::method::{AggregationMethod, MethodParams};
use super::options::DistanceMetric;
use super::record::{GroupKey, Payload};

pub const DEFAULT_SCROLL_BATCH_SIZE: u32 = 100;
pub const DEFAULT_UPSERT_BATCH_SIZE: usize = 100;

/// How content concatenation went for one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MergeOutcome {
    /// Content was concatenated using the named ordering field.
    Ordered { field: String },
    /// No ordering field or no `page_content`; content left empty.
    Unordered,
    /// Ordering failed; content left empty and the error recorded.
    Degraded { error: String },
}

/// Merged metadata for one group.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedPayload {
    pub payload: Payload,
    pub outcome: MergeOutcome,
}

/// Counters collected while scanning the source collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub pages: u64,
    pub scanned: u64,
    pub grouped: u64,
    pub skipped: u64,
}

/// A group whose content ordering failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DegradedGroup {
    pub key: GroupKey,
    pub error: String,
}

/// Everything needed for one aggregation run.
#[derive(Debug, Clone)]
pub struct AggregateRequest {
    pub input_collection: String,
    pub key_path: String,
    pub output_collection: String,
    pub method: AggregationMethod,
    pub params: MethodParams,
    pub distance: DistanceMetric,
    pub snapshot_path: Option<PathBuf>,
    pub scroll_batch_size: u32,
    pub upsert_batch_size: usize,
}

impl AggregateRequest {
    pub fn new(
        input_collection: impl Into<String>,
        key_path: impl Into<String>,
        output_collection: impl Into<String>,
    ) -> Self {
        Self {
            input_collection: input_collection.into(),
            key_path: key_path.into(),
            output_collection: output_collection.into(),
            method: AggregationMethod::default(),
            params: MethodParams::default(),
            distance: DistanceMetric::default(),
            snapshot_path: None,
            scroll_batch_size: DEFAULT_SCROLL_BATCH_SIZE,
            upsert_batch_size: DEFAULT_UPSERT_BATCH_SIZE,
        }
    }

    #[must_use]
    pub fn with_method(mut self, method: AggregationMethod) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: MethodParams) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn with_distance(mut self, distance: DistanceMetric) -> Self {
        self.distance = distance;
        self
    }

    #[must_use]
    pub fn with_snapshot(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_batch_sizes(mut self, scroll: u32, upsert: usize) -> Self {
        self.scroll_batch_size = scroll;
        self.upsert_batch_size = upsert;
        self
    }
}

/// Result of a completed aggregation run.
#[derive(Debug, Clone, Serialize)]
pub struct AggregationReport {
    pub input_collection: String,
    pub output_collection: String,
    pub method: AggregationMethod,
    pub snapshot_path: Option<PathBuf>,
    pub groups: u64,
    pub vector_size: u64,
    pub scan: ScanStats,
    pub degraded: Vec<DegradedGroup>,
    pub duration_ms: u64,
}

impl AggregationReport {
    /// Source points per output point.
    pub fn compression_ratio(&self) -> f64 {
        if self.groups == 0 {
            0.0
        } else {
            self.scan.grouped as f64 / self.groups as f64
        }
    }
}
