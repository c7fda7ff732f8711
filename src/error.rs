//! Error types for the vector aggregator.

use thiserror::Error;

/// Errors related to vector store operations.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("failed to connect to Qdrant: {0}")]
    ConnectionError(String),

    #[error("collection error: {0}")]
    CollectionError(String),

    #[error("scroll error: {0}")]
    ScrollError(String),

    #[error("upsert error: {0}")]
    UpsertError(String),

    #[error("collection not found: {0}")]
    NotFound(String),

    #[error("Qdrant client error: {0}")]
    ClientError(String),
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Errors raised by the aggregation engine.
///
/// Only ordering failures inside the metadata merger are absorbed per group;
/// every variant here aborts the run.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid parameter: {0}")]
    Parameter(String),

    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("cannot aggregate an empty group")]
    EmptyGroup,

    #[error("no records resolved the grouping key '{0}'")]
    NoGroups(String),

    #[error("vector store error: {0}")]
    Store(#[from] VectorStoreError),

    #[error("snapshot error: {0}")]
    Snapshot(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_converts_into_aggregate_error() {
        let err: AggregateError = VectorStoreError::ScrollError("timeout".to_string()).into();
        assert!(matches!(err, AggregateError::Store(_)));
        assert_eq!(err.to_string(), "vector store error: scroll error: timeout");
    }

    #[test]
    fn test_dimension_mismatch_message() {
        let err = AggregateError::DimensionMismatch {
            expected: 4,
            found: 3,
        };
        assert_eq!(err.to_string(), "dimension mismatch: expected 4, found 3");
    }
}
