//! Aggregation method names and their parameters.

use serde::{Deserialize, Serialize};

use crate::error::AggregateError;

/// Numeric reducer used to turn a group's vectors into one vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMethod {
    #[default]
    Average,
    WeightedAverage,
    Median,
    MaxPooling,
    TrimmedMean,
    Centroid,
    Pca,
    AttentivePooling,
}

impl AggregationMethod {
    pub const ALL: [AggregationMethod; 8] = [
        AggregationMethod::Average,
        AggregationMethod::WeightedAverage,
        AggregationMethod::Median,
        AggregationMethod::MaxPooling,
        AggregationMethod::TrimmedMean,
        AggregationMethod::Centroid,
        AggregationMethod::Pca,
        AggregationMethod::AttentivePooling,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AggregationMethod::Average => "average",
            AggregationMethod::WeightedAverage => "weighted_average",
            AggregationMethod::Median => "median",
            AggregationMethod::MaxPooling => "max_pooling",
            AggregationMethod::TrimmedMean => "trimmed_mean",
            AggregationMethod::Centroid => "centroid",
            AggregationMethod::Pca => "pca",
            AggregationMethod::AttentivePooling => "attentive_pooling",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AggregationMethod::Average => "Elementwise arithmetic mean",
            AggregationMethod::WeightedAverage => {
                "Elementwise weighted mean (one weight per chunk, in arrival order)"
            }
            AggregationMethod::Median => "Elementwise median",
            AggregationMethod::MaxPooling => "Elementwise maximum",
            AggregationMethod::TrimmedMean => {
                "Mean after dropping trim/2 of the lowest and highest values per dimension"
            }
            AggregationMethod::Centroid => "Centroid of the largest k-means cluster",
            AggregationMethod::Pca => "First principal direction scaled to the mean's norm",
            AggregationMethod::AttentivePooling => {
                "Softmax of cosine similarity to the mean, used as weights"
            }
        }
    }
}

impl std::str::FromStr for AggregationMethod {
    type Err = AggregateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        AggregationMethod::ALL
            .into_iter()
            .find(|m| m.name() == normalized)
            .ok_or_else(|| {
                AggregateError::Configuration(format!(
                    "unknown aggregation method '{}' (expected one of: {})",
                    s,
                    AggregationMethod::ALL
                        .iter()
                        .map(AggregationMethod::name)
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }
}

impl std::fmt::Display for AggregationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

pub const DEFAULT_TRIM_PERCENTAGE: f32 = 0.1;
pub const DEFAULT_CLUSTERS: usize = 1;

/// Parameters consumed by individual methods; the rest ignore them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodParams {
    /// Per-chunk weights for `weighted_average`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<Vec<f32>>,

    /// Total fraction trimmed by `trimmed_mean`, half from each end.
    pub trim_percentage: f32,

    /// Number of clusters for `centroid`.
    pub clusters: usize,
}

impl Default for MethodParams {
    fn default() -> Self {
        Self {
            weights: None,
            trim_percentage: DEFAULT_TRIM_PERCENTAGE,
            clusters: DEFAULT_CLUSTERS,
        }
    }
}

impl MethodParams {
    /// Checks that do not depend on group size, run before any I/O.
    pub fn validate_for(&self, method: AggregationMethod) -> Result<(), AggregateError> {
        match method {
            AggregationMethod::WeightedAverage if self.weights.is_none() => Err(
                AggregateError::Configuration("weighted_average requires weights".to_string()),
            ),
            AggregationMethod::TrimmedMean
                if !(0.0..1.0).contains(&self.trim_percentage)
                    || self.trim_percentage.is_nan() =>
            {
                Err(AggregateError::Configuration(format!(
                    "trim_percentage must be in [0, 1), got {}",
                    self.trim_percentage
                )))
            }
            AggregationMethod::Centroid if self.clusters == 0 => Err(
                AggregateError::Configuration("clusters must be at least 1".to_string()),
            ),
            _ => Ok(()),
        }
    }
}
