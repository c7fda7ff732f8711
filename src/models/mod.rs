mod aggregate;
mod config;
mod method;
mod options;
mod record;

pub use aggregate::{
    AggregateRequest, AggregationReport, DEFAULT_SCROLL_BATCH_SIZE, DEFAULT_UPSERT_BATCH_SIZE,
    DegradedGroup, MergeOutcome, MergedPayload, ScanStats,
};
pub use config::{
    AggregationConfig, Config, DEFAULT_QDRANT_URL, DEFAULT_TIMEOUT_SECS, ENV_DISTANCE_METRIC,
    ENV_QDRANT_API_KEY, ENV_QDRANT_URL, OutputConfig, ResolvedConfig, VectorStoreConfig,
};
pub use method::{AggregationMethod, DEFAULT_CLUSTERS, DEFAULT_TRIM_PERCENTAGE, MethodParams};
pub use options::{DistanceMetric, OutputFormat};
pub use record::{
    Group, GroupKey, OutputPoint, Payload, PointKey, SourceRecord, payload_from_json,
};
