//! Provisions the destination collection and uploads aggregated points.

use crate::error::AggregateError;
use crate::models::{DistanceMetric, OutputPoint, Payload};
use crate::services::vector_store::VectorStore;

/// Turn `(vector, payload)` pairs into points with fresh ids.
///
/// The first vector fixes the dimension; any other length is rejected so the
/// destination is never touched with ragged input.
pub fn build_points(
    aggregated: Vec<(Vec<f32>, Payload)>,
) -> Result<(Vec<OutputPoint>, u64), AggregateError> {
    let Some(expected) = aggregated.first().map(|(vector, _)| vector.len()) else {
        return Ok((Vec::new(), 0));
    };

    let mut points = Vec::with_capacity(aggregated.len());
    for (vector, payload) in aggregated {
        if vector.len() != expected {
            return Err(AggregateError::DimensionMismatch {
                expected,
                found: vector.len(),
            });
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(AggregateError::Parameter(
                "aggregated vector contains non-finite values".to_string(),
            ));
        }
        points.push(OutputPoint::new(vector, payload));
    }

    Ok((points, expected as u64))
}

/// Recreate `collection` and upload `points` in sequential batches.
///
/// `on_progress(written, total)` runs after every acknowledged batch. A
/// failing batch aborts the upload; batches already written stay in place.
pub async fn write_points<F>(
    store: &dyn VectorStore,
    collection: &str,
    points: Vec<OutputPoint>,
    vector_size: u64,
    distance: DistanceMetric,
    batch_size: usize,
    mut on_progress: F,
) -> Result<usize, AggregateError>
where
    F: FnMut(usize, usize) + Send,
{
    if batch_size == 0 {
        return Err(AggregateError::Configuration(
            "upsert batch size must be at least 1".to_string(),
        ));
    }

    store
        .recreate_collection(collection, vector_size, distance)
        .await?;
    tracing::info!(collection, vector_size, %distance, "recreated destination collection");

    let total = points.len();
    let mut written = 0;
    let mut remaining = points;

    while !remaining.is_empty() {
        let rest = remaining.split_off(batch_size.min(remaining.len()));
        let batch = std::mem::replace(&mut remaining, rest);
        let len = batch.len();

        store.upsert(collection, batch).await?;

        written += len;
        tracing::info!(
            "Uploaded {}/{} points ({:.1}%)",
            written,
            total,
            written as f64 / total as f64 * 100.0
        );
        on_progress(written, total);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PointKey, SourceRecord, payload_from_json};
    use crate::services::vector_store::MemoryStore;
    use serde_json::json;

    fn aggregated(n: usize, dim: usize) -> Vec<(Vec<f32>, Payload)> {
        (0..n)
            .map(|i| {
                (
                    vec![i as f32; dim],
                    payload_from_json(json!({"doc": format!("d{i}"), "chunk_count": 1})),
                )
            })
            .collect()
    }

    #[test]
    fn test_build_points_takes_first_dimension() {
        let (points, dim) = build_points(aggregated(3, 4)).unwrap();
        assert_eq!(dim, 4);
        assert_eq!(points.len(), 3);
        assert_eq!(points[1].payload["doc"], json!("d1"));
    }

    #[test]
    fn test_build_points_rejects_ragged_vectors() {
        let mut input = aggregated(2, 4);
        input.push((vec![1.0, 2.0], Payload::new()));

        let err = build_points(input).unwrap_err();

        assert!(matches!(
            err,
            AggregateError::DimensionMismatch {
                expected: 4,
                found: 2
            }
        ));
    }

    #[test]
    fn test_build_points_rejects_non_finite() {
        let input = vec![(vec![f32::NAN, 1.0], Payload::new())];
        assert!(matches!(
            build_points(input),
            Err(AggregateError::Parameter(_))
        ));
    }

    #[tokio::test]
    async fn test_write_recreates_and_batches() {
        let store = MemoryStore::new();
        store
            .insert_collection(
                "out",
                2,
                DistanceMetric::Cosine,
                vec![SourceRecord::new(99, vec![0.0, 0.0], Payload::new())],
            )
            .unwrap();
        let (points, dim) = build_points(aggregated(5, 3)).unwrap();

        let mut progress = Vec::new();
        let written = write_points(
            &store,
            "out",
            points,
            dim,
            DistanceMetric::Dot,
            2,
            |w, t| progress.push((w, t)),
        )
        .await
        .unwrap();

        assert_eq!(written, 5);
        assert_eq!(store.upsert_calls(), 3);
        assert_eq!(progress, vec![(2, 5), (4, 5), (5, 5)]);

        let stored = store.points("out").unwrap();
        assert_eq!(stored.len(), 5);
        assert!(stored.iter().all(|p| p.id != PointKey::Num(99)));
        let info = store.collection_info("out").await.unwrap().unwrap();
        assert_eq!(info.vector_size, Some(3));
        assert_eq!(info.distance, Some(DistanceMetric::Dot));
    }

    #[tokio::test]
    async fn test_failed_batch_keeps_earlier_batches() {
        let store = MemoryStore::new();
        store.fail_upsert_at(1).unwrap();
        let (points, dim) = build_points(aggregated(5, 2)).unwrap();

        let err = write_points(
            &store,
            "out",
            points,
            dim,
            DistanceMetric::Cosine,
            2,
            |_, _| {},
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AggregateError::Store(_)));
        assert_eq!(store.points("out").unwrap().len(), 2);
        assert_eq!(store.upsert_calls(), 2);
    }

    #[tokio::test]
    async fn test_zero_batch_size_leaves_destination_alone() {
        let store = MemoryStore::new();
        let (points, dim) = build_points(aggregated(1, 2)).unwrap();

        let err = write_points(&store, "out", points, dim, DistanceMetric::Cosine, 0, |_, _| {})
            .await
            .unwrap_err();

        assert!(matches!(err, AggregateError::Configuration(_)));
        assert!(store.collection_info("out").await.unwrap().is_none());
    }
}
