use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::aggregate::{DEFAULT_SCROLL_BATCH_SIZE, DEFAULT_UPSERT_BATCH_SIZE};
use super::method::{AggregationMethod, DEFAULT_CLUSTERS, DEFAULT_TRIM_PERCENTAGE};
use super::options::{DistanceMetric, OutputFormat};
use crate::error::ConfigError;

pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

pub const ENV_QDRANT_URL: &str = "QDRANT_URL";
pub const ENV_QDRANT_API_KEY: &str = "QDRANT_API_KEY";
pub const ENV_DISTANCE_METRIC: &str = "DEFAULT_DISTANCE_METRIC";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    #[serde(default)]
    pub aggregation: AggregationConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Configuration plus where it came from.
#[derive(Debug, Clone, Default)]
pub struct ResolvedConfig {
    pub config: Config,
    pub path: Option<PathBuf>,
    pub env_overrides: Vec<&'static str>,
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("vector-aggregator").join("config.toml"))
    }

    /// Load the config file (if any), then apply `.env` and process environment overrides.
    pub fn load() -> Result<ResolvedConfig, ConfigError> {
        dotenvy::dotenv().ok();

        let mut resolved = ResolvedConfig::default();
        if let Some(path) = Self::config_path()
            && path.exists()
        {
            let content = std::fs::read_to_string(&path)?;
            resolved.config = toml::from_str(&content)?;
            resolved.path = Some(path);
        }

        resolved.env_overrides = resolved
            .config
            .apply_env(|name| std::env::var(name).ok())?;
        resolved.config.validate()?;
        Ok(resolved)
    }

    /// Apply environment overrides and return the names of the variables used.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<Vec<&'static str>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = Vec::new();

        if let Some(url) = lookup(ENV_QDRANT_URL).filter(|v| !v.trim().is_empty()) {
            self.vector_store.url = url;
            applied.push(ENV_QDRANT_URL);
        }

        // An empty key means "no key", not an empty credential.
        if let Some(key) = lookup(ENV_QDRANT_API_KEY) {
            self.vector_store.api_key = Some(key).filter(|k| !k.is_empty());
            applied.push(ENV_QDRANT_API_KEY);
        }

        if let Some(metric) = lookup(ENV_DISTANCE_METRIC).filter(|v| !v.trim().is_empty()) {
            self.aggregation.distance = metric
                .parse()
                .map_err(|e: String| ConfigError::ValidationError(e))?;
            applied.push(ENV_DISTANCE_METRIC);
        }

        Ok(applied)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let agg = &self.aggregation;
        if agg.scroll_batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "aggregation.scroll_batch_size must be at least 1".to_string(),
            ));
        }
        if agg.upsert_batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "aggregation.upsert_batch_size must be at least 1".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&agg.trim_percentage) {
            return Err(ConfigError::ValidationError(format!(
                "aggregation.trim_percentage must be in [0, 1), got {}",
                agg.trim_percentage
            )));
        }
        if agg.clusters == 0 {
            return Err(ConfigError::ValidationError(
                "aggregation.clusters must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::config_path().ok_or_else(|| {
            ConfigError::PathError("could not determine config directory".to_string())
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default = "default_qdrant_url")]
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_qdrant_url() -> String {
    DEFAULT_QDRANT_URL.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            url: default_qdrant_url(),
            api_key: None,
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationConfig {
    #[serde(default)]
    pub method: AggregationMethod,

    #[serde(default = "default_trim_percentage")]
    pub trim_percentage: f32,

    #[serde(default = "default_clusters")]
    pub clusters: usize,

    #[serde(default)]
    pub distance: DistanceMetric,

    #[serde(default = "default_scroll_batch_size")]
    pub scroll_batch_size: u32,

    #[serde(default = "default_upsert_batch_size")]
    pub upsert_batch_size: usize,
}

fn default_trim_percentage() -> f32 {
    DEFAULT_TRIM_PERCENTAGE
}

fn default_clusters() -> usize {
    DEFAULT_CLUSTERS
}

fn default_scroll_batch_size() -> u32 {
    DEFAULT_SCROLL_BATCH_SIZE
}

fn default_upsert_batch_size() -> usize {
    DEFAULT_UPSERT_BATCH_SIZE
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            method: AggregationMethod::default(),
            trim_percentage: default_trim_percentage(),
            clusters: default_clusters(),
            distance: DistanceMetric::default(),
            scroll_batch_size: default_scroll_batch_size(),
            upsert_batch_size: default_upsert_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub default_format: OutputFormat,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.vector_store.url, DEFAULT_QDRANT_URL);
        assert_eq!(config.vector_store.timeout_secs, 120);
        assert_eq!(config.aggregation.method, AggregationMethod::Average);
        assert_eq!(config.aggregation.distance, DistanceMetric::Cosine);
        assert_eq!(config.aggregation.scroll_batch_size, 100);
        assert_eq!(config.aggregation.upsert_batch_size, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_path() {
        let path = Config::config_path();
        assert!(path.is_some());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [aggregation]
            method = "trimmed_mean"
            trim_percentage = 0.2
            "#,
        )
        .unwrap();
        assert_eq!(config.aggregation.method, AggregationMethod::TrimmedMean);
        assert!((config.aggregation.trim_percentage - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.vector_store.url, DEFAULT_QDRANT_URL);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        let applied = config
            .apply_env(env(&[
                (ENV_QDRANT_URL, "http://qdrant:6334"),
                (ENV_QDRANT_API_KEY, "secret"),
                (ENV_DISTANCE_METRIC, "DOT"),
            ]))
            .unwrap();
        assert_eq!(applied.len(), 3);
        assert_eq!(config.vector_store.url, "http://qdrant:6334");
        assert_eq!(config.vector_store.api_key.as_deref(), Some("secret"));
        assert_eq!(config.aggregation.distance, DistanceMetric::Dot);
    }

    #[test]
    fn test_empty_api_key_is_none() {
        let mut config = Config::default();
        config.vector_store.api_key = Some("from-file".to_string());
        config
            .apply_env(env(&[(ENV_QDRANT_API_KEY, "")]))
            .unwrap();
        assert!(config.vector_store.api_key.is_none());
    }

    #[test]
    fn test_invalid_distance_env() {
        let mut config = Config::default();
        let err = config
            .apply_env(env(&[(ENV_DISTANCE_METRIC, "hamming")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_rejects_zero_batches() {
        let mut config = Config::default();
        config.aggregation.upsert_batch_size = 0;
        assert!(config.validate().is_err());
    }
}
