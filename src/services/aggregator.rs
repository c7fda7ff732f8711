//! End-to-end aggregation: scan, group, reduce, merge, write.

use std::time::Instant;

use crate::error::AggregateError;
use crate::models::{
    AggregateRequest, AggregationReport, DegradedGroup, GroupKey, MergeOutcome, Payload,
};
use crate::services::grouper::collect_groups;
use crate::services::merger::merge_payloads;
use crate::services::methods::{reduce, to_matrix};
use crate::services::snapshot::save_snapshot;
use crate::services::vector_store::VectorStore;
use crate::services::writer::{build_points, write_points};

/// Run one aggregation with no progress reporting.
pub async fn aggregate(
    store: &dyn VectorStore,
    request: &AggregateRequest,
) -> Result<AggregationReport, AggregateError> {
    aggregate_with_progress(store, request, |_, _| {}).await
}

/// Run one aggregation, calling `on_progress(written, total)` after every
/// uploaded batch.
///
/// Method parameters and batch sizes are validated before any store call.
/// Every vector is reduced and checked before the destination is recreated,
/// so a failure up to that point leaves the destination untouched.
pub async fn aggregate_with_progress<F>(
    store: &dyn VectorStore,
    request: &AggregateRequest,
    on_progress: F,
) -> Result<AggregationReport, AggregateError>
where
    F: FnMut(usize, usize) + Send,
{
    let started = Instant::now();

    request.params.validate_for(request.method)?;
    if request.upsert_batch_size == 0 {
        return Err(AggregateError::Configuration(
            "upsert batch size must be at least 1".to_string(),
        ));
    }

    tracing::info!(
        input = %request.input_collection,
        key = %request.key_path,
        output = %request.output_collection,
        method = %request.method,
        "starting aggregation"
    );

    let grouped = collect_groups(
        store,
        &request.input_collection,
        &request.key_path,
        request.scroll_batch_size,
    )
    .await?;

    if grouped.is_empty() {
        return Err(AggregateError::NoGroups(request.key_path.clone()));
    }

    let scan = grouped.stats;
    let mut aggregated = Vec::with_capacity(grouped.len());
    let mut snapshot: Vec<(GroupKey, Payload)> = Vec::new();
    let mut degraded = Vec::new();

    for group in grouped.into_groups() {
        let matrix = to_matrix(group.vectors())?;
        let vector = reduce(request.method, &matrix, &request.params)?;
        let merged = merge_payloads(group.payloads());

        if let MergeOutcome::Degraded { error } = &merged.outcome {
            tracing::warn!(group = %group.key(), %error, "content ordering failed");
            degraded.push(DegradedGroup {
                key: group.key().clone(),
                error: error.clone(),
            });
        }
        if request.snapshot_path.is_some() {
            snapshot.push((group.key().clone(), merged.payload.clone()));
        }

        aggregated.push((vector.to_vec(), merged.payload));
    }

    let (points, vector_size) = build_points(aggregated)?;
    let groups = points.len() as u64;

    write_points(
        store,
        &request.output_collection,
        points,
        vector_size,
        request.distance,
        request.upsert_batch_size,
        on_progress,
    )
    .await?;

    if let Some(path) = &request.snapshot_path {
        save_snapshot(path, &snapshot)?;
    }

    let report = AggregationReport {
        input_collection: request.input_collection.clone(),
        output_collection: request.output_collection.clone(),
        method: request.method,
        snapshot_path: request.snapshot_path.clone(),
        groups,
        vector_size,
        scan,
        degraded,
        duration_ms: started.elapsed().as_millis() as u64,
    };

    tracing::info!(
        output = %report.output_collection,
        groups = report.groups,
        scanned = report.scan.scanned,
        degraded = report.degraded.len(),
        "aggregation complete"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AggregationMethod, DistanceMetric, MethodParams, SourceRecord, payload_from_json,
    };
    use crate::services::snapshot::load_snapshot;
    use crate::services::vector_store::MemoryStore;
    use serde_json::{Value, json};
    use tempfile::TempDir;

    fn chunk(id: u64, doc: &str, index: u64, vector: [f32; 4]) -> SourceRecord {
        SourceRecord::new(
            id,
            vector.to_vec(),
            payload_from_json(json!({
                "page_content": format!("{doc}-{index}"),
                "metadata": {"doc": doc, "chunk_index": index}
            })),
        )
    }

    fn six_chunk_store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert_collection(
                "chunks",
                4,
                DistanceMetric::Cosine,
                vec![
                    chunk(1, "A", 2, [1.0, 0.0, 0.0, 0.0]),
                    chunk(2, "A", 0, [0.0, 1.0, 0.0, 0.0]),
                    chunk(3, "B", 0, [2.0, 2.0, 2.0, 2.0]),
                    chunk(4, "A", 1, [0.0, 0.0, 1.0, 0.0]),
                    chunk(5, "B", 1, [4.0, 4.0, 4.0, 4.0]),
                    chunk(6, "C", 0, [0.5, 0.5, 0.5, 0.5]),
                ],
            )
            .unwrap();
        store
    }

    fn by_doc(store: &MemoryStore) -> Vec<(String, Vec<f32>, Payload)> {
        store
            .points("docs")
            .unwrap()
            .into_iter()
            .map(|p| {
                let doc = p.payload["metadata"]["doc"].as_str().unwrap().to_string();
                (doc, p.vector, p.payload)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_end_to_end_average() {
        let store = six_chunk_store();
        let request = AggregateRequest::new("chunks", "metadata.doc", "docs");

        let report = aggregate(&store, &request).await.unwrap();

        assert_eq!(report.groups, 3);
        assert_eq!(report.vector_size, 4);
        assert_eq!(report.scan.scanned, 6);
        assert!(report.degraded.is_empty());
        assert_eq!(report.compression_ratio(), 2.0);

        let docs = by_doc(&store);
        let names: Vec<&str> = docs.iter().map(|(d, _, _)| d.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);

        let (_, a_vec, a_payload) = &docs[0];
        let third = 1.0 / 3.0;
        for (got, want) in a_vec.iter().zip([third, third, third, 0.0]) {
            assert!((got - want).abs() < 1e-6);
        }
        assert_eq!(a_payload["chunk_count"], json!(3));
        assert_eq!(a_payload["page_content"], json!("A-0\n\nA-1\n\nA-2"));
        assert_eq!(a_payload["ordering_field"], json!("metadata.chunk_index"));

        assert_eq!(docs[1].1, vec![3.0, 3.0, 3.0, 3.0]);
        assert_eq!(docs[1].2["chunk_count"], json!(2));
        assert_eq!(docs[2].1, vec![0.5, 0.5, 0.5, 0.5]);
        assert_eq!(docs[2].2["chunk_count"], json!(1));
    }

    #[tokio::test]
    async fn test_source_collection_is_untouched() {
        let store = six_chunk_store();
        let before = store.points("chunks").unwrap();

        aggregate(&store, &AggregateRequest::new("chunks", "metadata.doc", "docs"))
            .await
            .unwrap();

        assert_eq!(store.points("chunks").unwrap(), before);
    }

    #[tokio::test]
    async fn test_unknown_method_fails_before_io() {
        let store = six_chunk_store();
        let err = "harmonic".parse::<AggregationMethod>().unwrap_err();
        assert!(matches!(err, AggregateError::Configuration(_)));
        assert_eq!(store.scroll_calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_weights_fail_before_io() {
        let store = six_chunk_store();
        let request = AggregateRequest::new("chunks", "metadata.doc", "docs")
            .with_method(AggregationMethod::WeightedAverage);

        let err = aggregate(&store, &request).await.unwrap_err();

        assert!(matches!(err, AggregateError::Configuration(_)));
        assert_eq!(store.scroll_calls(), 0);
    }

    #[tokio::test]
    async fn test_weight_length_mismatch_leaves_destination_alone() {
        let store = six_chunk_store();
        let request = AggregateRequest::new("chunks", "metadata.doc", "docs")
            .with_method(AggregationMethod::WeightedAverage)
            .with_params(MethodParams {
                weights: Some(vec![1.0, 2.0]),
                ..MethodParams::default()
            });

        let err = aggregate(&store, &request).await.unwrap_err();

        assert!(matches!(err, AggregateError::Parameter(_)));
        assert!(store.collection_info("docs").await.unwrap().is_none());
        assert_eq!(store.upsert_calls(), 0);
    }

    #[tokio::test]
    async fn test_no_groups_is_an_error() {
        let store = six_chunk_store();
        let request = AggregateRequest::new("chunks", "metadata.author", "docs");

        let err = aggregate(&store, &request).await.unwrap_err();

        assert!(matches!(err, AggregateError::NoGroups(_)));
        assert!(store.collection_info("docs").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ragged_input_fails_before_recreate() {
        let store = MemoryStore::new();
        store
            .insert_collection(
                "chunks",
                2,
                DistanceMetric::Cosine,
                vec![
                    SourceRecord::new(1, vec![1.0, 2.0], payload_from_json(json!({"doc": "a"}))),
                    SourceRecord::new(2, vec![1.0], payload_from_json(json!({"doc": "b"}))),
                ],
            )
            .unwrap();
        store
            .insert_collection("docs", 2, DistanceMetric::Cosine, Vec::new())
            .unwrap();

        let err = aggregate(&store, &AggregateRequest::new("chunks", "doc", "docs"))
            .await
            .unwrap_err();

        assert!(matches!(err, AggregateError::DimensionMismatch { .. }));
        assert_eq!(store.upsert_calls(), 0);
    }

    #[tokio::test]
    async fn test_degraded_groups_are_reported() {
        let store = MemoryStore::new();
        store
            .insert_collection(
                "chunks",
                1,
                DistanceMetric::Cosine,
                vec![
                    SourceRecord::new(
                        1,
                        vec![1.0],
                        payload_from_json(json!({"doc": "a", "page": 1, "page_content": "x"})),
                    ),
                    SourceRecord::new(
                        2,
                        vec![2.0],
                        payload_from_json(json!({"doc": "a", "page": "2", "page_content": "y"})),
                    ),
                ],
            )
            .unwrap();

        let report = aggregate(&store, &AggregateRequest::new("chunks", "doc", "docs"))
            .await
            .unwrap();

        assert_eq!(report.degraded.len(), 1);
        assert_eq!(report.degraded[0].key, GroupKey::from("a"));
        let written = store.points("docs").unwrap();
        assert_eq!(written[0].payload["page_content"], json!(""));
        assert!(written[0].payload["ordering_error"].is_string());
    }

    #[tokio::test]
    async fn test_snapshot_and_progress() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("meta/groups.bin");
        let store = six_chunk_store();
        let request = AggregateRequest::new("chunks", "metadata.doc", "docs")
            .with_method(AggregationMethod::Median)
            .with_distance(DistanceMetric::Euclid)
            .with_snapshot(&path)
            .with_batch_sizes(4, 2);

        let mut progress = Vec::new();
        let report = aggregate_with_progress(&store, &request, |w, t| progress.push((w, t)))
            .await
            .unwrap();

        assert_eq!(progress, vec![(2, 3), (3, 3)]);
        assert_eq!(report.scan.pages, 2);
        assert_eq!(report.snapshot_path.as_deref(), Some(path.as_path()));

        let saved = load_snapshot(&path).unwrap();
        let keys: Vec<Value> = saved.iter().map(|(k, _)| k.value().clone()).collect();
        assert_eq!(keys, vec![json!("A"), json!("B"), json!("C")]);
        assert_eq!(saved[1].1["chunk_count"], json!(2));

        let info = store.collection_info("docs").await.unwrap().unwrap();
        assert_eq!(info.distance, Some(DistanceMetric::Euclid));
    }

    #[tokio::test]
    async fn test_rerun_replaces_destination() {
        let store = six_chunk_store();
        let request = AggregateRequest::new("chunks", "metadata.doc", "docs");

        aggregate(&store, &request).await.unwrap();
        aggregate(&store, &request).await.unwrap();

        assert_eq!(store.points("docs").unwrap().len(), 3);
    }
}
