//! Numeric reducers turning a group's N x D matrix into one D-vector.
//!
//! Every method is a pure, deterministic function of its inputs. Values are
//! accumulated in `f64` and narrowed back to `f32` at the end.

use ndarray::{Array1, Array2, ArrayView1, Axis};

use crate::error::AggregateError;
use crate::models::{AggregationMethod, MethodParams};

const KMEANS_MAX_ITERATIONS: usize = 100;
const KMEANS_TOLERANCE: f64 = 1e-6;
const POWER_MAX_ITERATIONS: usize = 100;
const POWER_TOLERANCE: f64 = 1e-9;
const ZERO_NORM: f64 = 1e-12;

/// Stack rows into a matrix, rejecting an empty or ragged batch.
pub fn to_matrix(vectors: &[Vec<f32>]) -> Result<Array2<f32>, AggregateError> {
    let first = vectors.first().ok_or(AggregateError::EmptyGroup)?;
    let dim = first.len();

    let mut flat = Vec::with_capacity(vectors.len() * dim);
    for row in vectors {
        if row.len() != dim {
            return Err(AggregateError::DimensionMismatch {
                expected: dim,
                found: row.len(),
            });
        }
        flat.extend_from_slice(row);
    }

    Array2::from_shape_vec((vectors.len(), dim), flat).map_err(|e| {
        AggregateError::Parameter(format!("cannot build a {}x{dim} matrix: {e}", vectors.len()))
    })
}

/// Reduce `vectors` (one row per chunk) with `method`.
pub fn reduce(
    method: AggregationMethod,
    vectors: &Array2<f32>,
    params: &MethodParams,
) -> Result<Array1<f32>, AggregateError> {
    if vectors.nrows() == 0 {
        return Err(AggregateError::EmptyGroup);
    }
    let m = vectors.mapv(f64::from);

    let reduced = match method {
        AggregationMethod::Average => mean(&m),
        AggregationMethod::WeightedAverage => weighted_average(&m, params.weights.as_deref())?,
        AggregationMethod::Median => per_column(&m, median),
        AggregationMethod::MaxPooling => {
            m.fold_axis(Axis(0), f64::NEG_INFINITY, |a, &b| a.max(b))
        }
        AggregationMethod::TrimmedMean => {
            if !(0.0..1.0).contains(&params.trim_percentage) {
                return Err(AggregateError::Parameter(format!(
                    "trim_percentage must be in [0, 1), got {}",
                    params.trim_percentage
                )));
            }
            let fraction = f64::from(params.trim_percentage) / 2.0;
            per_column(&m, |values| trimmed_mean(values, fraction))
        }
        AggregationMethod::Centroid => {
            if params.clusters == 0 {
                return Err(AggregateError::Parameter(
                    "clusters must be at least 1".to_string(),
                ));
            }
            largest_cluster_centroid(&m, params.clusters)
        }
        AggregationMethod::Pca => principal_direction(&m),
        AggregationMethod::AttentivePooling => attentive_pooling(&m),
    };

    Ok(reduced.mapv(|x| x as f32))
}

fn mean(m: &Array2<f64>) -> Array1<f64> {
    let n = m.nrows() as f64;
    m.sum_axis(Axis(0)) / n
}

fn norm(v: &ArrayView1<f64>) -> f64 {
    v.dot(v).sqrt()
}

fn squared_distance(a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn weighted_average(
    m: &Array2<f64>,
    weights: Option<&[f32]>,
) -> Result<Array1<f64>, AggregateError> {
    let weights = weights
        .ok_or_else(|| AggregateError::Parameter("weighted_average requires weights".to_string()))?;
    if weights.len() != m.nrows() {
        return Err(AggregateError::Parameter(format!(
            "expected {} weights (one per chunk), got {}",
            m.nrows(),
            weights.len()
        )));
    }

    let w = Array1::from_iter(weights.iter().map(|&x| f64::from(x)));
    let total = w.sum();
    if total == 0.0 {
        return Err(AggregateError::Parameter("weights sum to zero".to_string()));
    }

    Ok(w.dot(m) / total)
}

/// Apply `f` to the sorted values of every column.
fn per_column<F>(m: &Array2<f64>, f: F) -> Array1<f64>
where
    F: Fn(&[f64]) -> f64,
{
    Array1::from_iter(m.axis_iter(Axis(1)).map(|column| {
        let mut values = column.to_vec();
        values.sort_by(f64::total_cmp);
        f(&values)
    }))
}

fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Drop `floor(n * fraction)` values from each end of `sorted`, then average.
fn trimmed_mean(sorted: &[f64], fraction: f64) -> f64 {
    let n = sorted.len();
    let cut = (n as f64 * fraction).floor() as usize;
    let kept = if 2 * cut >= n {
        sorted
    } else {
        &sorted[cut..n - cut]
    };
    kept.iter().sum::<f64>() / kept.len() as f64
}

/// Farthest-first seeding: row 0, then repeatedly the row farthest from its
/// nearest seed (lowest index on ties).
fn seed_centroids(m: &Array2<f64>, k: usize) -> Vec<Array1<f64>> {
    let mut centroids = vec![m.row(0).to_owned()];
    let mut nearest: Vec<f64> = m
        .rows()
        .into_iter()
        .map(|row| squared_distance(&row, &centroids[0].view()))
        .collect();

    while centroids.len() < k {
        let mut best = 0;
        for (i, &d) in nearest.iter().enumerate() {
            if d > nearest[best] {
                best = i;
            }
        }
        let seed = m.row(best).to_owned();
        for (i, row) in m.rows().into_iter().enumerate() {
            nearest[i] = nearest[i].min(squared_distance(&row, &seed.view()));
        }
        centroids.push(seed);
    }

    centroids
}

fn nearest_centroid(row: &ArrayView1<f64>, centroids: &[Array1<f64>]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (j, centroid) in centroids.iter().enumerate() {
        let d = squared_distance(row, &centroid.view());
        if d < best_distance {
            best_distance = d;
            best = j;
        }
    }
    best
}

/// Lloyd's k-means; returns the centroid of the most populated cluster.
fn largest_cluster_centroid(m: &Array2<f64>, clusters: usize) -> Array1<f64> {
    let k = clusters.min(m.nrows());
    let mut centroids = seed_centroids(m, k);
    let mut assignments = vec![0usize; m.nrows()];

    for iteration in 0..KMEANS_MAX_ITERATIONS {
        for (i, row) in m.rows().into_iter().enumerate() {
            assignments[i] = nearest_centroid(&row, &centroids);
        }

        let mut max_movement: f64 = 0.0;
        for (c, centroid) in centroids.iter_mut().enumerate() {
            let members: Vec<usize> = (0..m.nrows()).filter(|&i| assignments[i] == c).collect();
            // Empty clusters keep their previous centroid.
            let Some(updated) = m.select(Axis(0), &members).mean_axis(Axis(0)) else {
                continue;
            };
            let movement = squared_distance(&centroid.view(), &updated.view()).sqrt();
            max_movement = max_movement.max(movement);
            *centroid = updated;
        }

        if max_movement <= KMEANS_TOLERANCE {
            tracing::trace!(iteration, "k-means converged");
            break;
        }
    }

    for (i, row) in m.rows().into_iter().enumerate() {
        assignments[i] = nearest_centroid(&row, &centroids);
    }

    let mut counts = vec![0usize; k];
    for &a in &assignments {
        counts[a] += 1;
    }
    let mut largest = 0;
    for (c, &count) in counts.iter().enumerate() {
        if count > counts[largest] {
            largest = c;
        }
    }

    centroids.swap_remove(largest)
}

/// First principal direction of the centred rows, oriented towards the mean
/// and scaled to the mean's norm. Degenerates to the mean when the rows have
/// no spread.
fn principal_direction(m: &Array2<f64>) -> Array1<f64> {
    let mu = mean(m);
    let centred = m - &mu;

    let mut seed = 0;
    let mut seed_norm = 0.0;
    for (i, row) in centred.rows().into_iter().enumerate() {
        let n = norm(&row);
        if n > seed_norm {
            seed = i;
            seed_norm = n;
        }
    }
    if seed_norm <= ZERO_NORM {
        return mu;
    }

    let mut v = centred.row(seed).to_owned() / seed_norm;
    for _ in 0..POWER_MAX_ITERATIONS {
        let w = centred.t().dot(&centred.dot(&v));
        let w_norm = norm(&w.view());
        if w_norm <= ZERO_NORM {
            break;
        }
        let next = w / w_norm;
        let delta = norm(&(&next - &v).view());
        v = next;
        if delta < POWER_TOLERANCE {
            break;
        }
    }

    if v.dot(&mu) < 0.0 {
        v.mapv_inplace(|x| -x);
    }
    v * norm(&mu.view())
}

/// Softmax over each row's cosine similarity to the mean, used as weights.
fn attentive_pooling(m: &Array2<f64>) -> Array1<f64> {
    let mu = mean(m);
    let mu_norm = norm(&mu.view());

    let scores: Vec<f64> = m
        .rows()
        .into_iter()
        .map(|row| {
            let row_norm = norm(&row);
            if row_norm <= ZERO_NORM || mu_norm <= ZERO_NORM {
                0.0
            } else {
                row.dot(&mu) / (row_norm * mu_norm)
            }
        })
        .collect();

    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Array1<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let weights = &exps / exps.sum();

    weights.dot(m)
}
