//! Paginated scan of the source collection, bucketing records by key.

use std::collections::HashMap;

use crate::error::AggregateError;
use crate::models::{Group, GroupKey, PointKey, ScanStats};
use crate::services::vector_store::VectorStore;
use crate::utils::resolve_non_null;

/// Groups in first-seen order of their key.
#[derive(Debug, Clone, Default)]
pub struct GroupedRecords {
    groups: Vec<Group>,
    index: HashMap<GroupKey, usize>,
    pub stats: ScanStats,
}

impl GroupedRecords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to its group, creating the group on first sight.
    pub fn insert(&mut self, key: GroupKey, vector: Vec<f32>, payload: crate::models::Payload) {
        match self.index.get(&key) {
            Some(&i) => self.groups[i].push(vector, payload),
            None => {
                self.index.insert(key.clone(), self.groups.len());
                self.groups.push(Group::new(key, vector, payload));
            }
        }
        self.stats.grouped += 1;
    }

    pub fn get(&self, key: &GroupKey) -> Option<&Group> {
        self.index.get(key).map(|&i| &self.groups[i])
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn into_groups(self) -> Vec<Group> {
        self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Scroll through `collection` and group every record whose `key_path`
/// resolves to a non-null value.
///
/// Stops on an empty page or an absent next cursor. Store errors abort the
/// scan; nothing is retried.
pub async fn collect_groups(
    store: &dyn VectorStore,
    collection: &str,
    key_path: &str,
    batch_size: u32,
) -> Result<GroupedRecords, AggregateError> {
    if batch_size == 0 {
        return Err(AggregateError::Configuration(
            "scroll batch size must be at least 1".to_string(),
        ));
    }

    let mut grouped = GroupedRecords::new();
    let mut cursor: Option<PointKey> = None;

    loop {
        let page = store.scroll(collection, batch_size, cursor, true).await?;
        if page.records.is_empty() {
            break;
        }

        grouped.stats.pages += 1;
        grouped.stats.scanned += page.records.len() as u64;

        for record in page.records {
            match resolve_non_null(&record.payload, key_path) {
                Some(value) => {
                    let key = GroupKey::new(value.clone());
                    grouped.insert(key, record.vector, record.payload);
                }
                None => grouped.stats.skipped += 1,
            }
        }

        tracing::debug!(
            collection,
            scanned = grouped.stats.scanned,
            groups = grouped.len(),
            "scanned page"
        );

        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    tracing::info!(
        collection,
        key_path,
        scanned = grouped.stats.scanned,
        skipped = grouped.stats.skipped,
        groups = grouped.len(),
        "grouping complete"
    );

    Ok(grouped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DistanceMetric, SourceRecord, payload_from_json};
    use crate::services::vector_store::MemoryStore;
    use serde_json::{Value, json};

    fn seeded_store(payloads: Vec<Value>) -> MemoryStore {
        let store = MemoryStore::new();
        let records = payloads
            .into_iter()
            .enumerate()
            .map(|(i, p)| SourceRecord::new(i as u64, vec![i as f32, 1.0], payload_from_json(p)))
            .collect();
        store
            .insert_collection("chunks", 2, DistanceMetric::Cosine, records)
            .unwrap();
        store
    }

    fn docs(values: &[&str]) -> Vec<Value> {
        values
            .iter()
            .map(|d| json!({"metadata": {"doc": d}, "page_content": format!("text of {d}")}))
            .collect()
    }

    fn sizes(grouped: &GroupedRecords) -> Vec<(String, usize)> {
        grouped
            .groups()
            .iter()
            .map(|g| (g.key().to_string(), g.len()))
            .collect()
    }

    #[tokio::test]
    async fn test_groups_in_first_seen_order() {
        let store = seeded_store(docs(&["b", "a", "b", "c", "a", "b"]));
        let grouped = collect_groups(&store, "chunks", "metadata.doc", 100)
            .await
            .unwrap();

        assert_eq!(
            sizes(&grouped),
            vec![
                ("b".to_string(), 3),
                ("a".to_string(), 2),
                ("c".to_string(), 1)
            ]
        );
        let b = grouped.get(&GroupKey::from("b")).unwrap();
        assert_eq!(b.vectors(), &[vec![0.0, 1.0], vec![2.0, 1.0], vec![5.0, 1.0]]);
    }

    #[tokio::test]
    async fn test_unresolved_records_are_skipped() {
        let store = seeded_store(vec![
            json!({"metadata": {"doc": "a"}}),
            json!({"metadata": {"other": "x"}}),
            json!({"metadata": "flat"}),
            json!({"metadata": {"doc": null}}),
            json!({}),
            json!({"metadata": {"doc": "a"}}),
        ]);

        let grouped = collect_groups(&store, "chunks", "metadata.doc", 2)
            .await
            .unwrap();

        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped.stats.scanned, 6);
        assert_eq!(grouped.stats.grouped, 2);
        assert_eq!(grouped.stats.skipped, 4);
        assert_eq!(
            grouped.stats.grouped + grouped.stats.skipped,
            grouped.stats.scanned
        );
    }

    #[tokio::test]
    async fn test_batch_size_does_not_change_groups() {
        let values: Vec<String> = (0..37).map(|i| format!("doc-{}", i % 5)).collect();
        let refs: Vec<&str> = values.iter().map(String::as_str).collect();
        let store = seeded_store(docs(&refs));

        let small = collect_groups(&store, "chunks", "metadata.doc", 1)
            .await
            .unwrap();
        let large = collect_groups(&store, "chunks", "metadata.doc", 1000)
            .await
            .unwrap();

        assert_eq!(sizes(&small), sizes(&large));
        assert_eq!(small.stats.pages, 37);
        assert_eq!(large.stats.pages, 1);
        for (a, b) in small.groups().iter().zip(large.groups()) {
            assert_eq!(a.vectors(), b.vectors());
            assert_eq!(a.payloads(), b.payloads());
        }
    }

    #[tokio::test]
    async fn test_top_level_key() {
        let store = seeded_store(vec![
            json!({"source": "x"}),
            json!({"source": "y"}),
            json!({"source": "x"}),
        ]);
        let grouped = collect_groups(&store, "chunks", "source", 100)
            .await
            .unwrap();
        assert_eq!(grouped.len(), 2);
    }

    #[tokio::test]
    async fn test_numeric_keys_group_by_value() {
        let store = seeded_store(vec![
            json!({"doc_id": 1}),
            json!({"doc_id": 1.0}),
            json!({"doc_id": "1"}),
        ]);
        let grouped = collect_groups(&store, "chunks", "doc_id", 100)
            .await
            .unwrap();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped.groups()[0].len(), 2);
    }

    #[tokio::test]
    async fn test_empty_key_path_matches_nothing() {
        let store = seeded_store(docs(&["a", "b"]));
        let grouped = collect_groups(&store, "chunks", "", 100).await.unwrap();
        assert!(grouped.is_empty());
        assert_eq!(grouped.stats.skipped, 2);
    }

    #[tokio::test]
    async fn test_store_error_aborts() {
        let store = MemoryStore::new();
        let err = collect_groups(&store, "missing", "doc", 100)
            .await
            .unwrap_err();
        assert!(matches!(err, AggregateError::Store(_)));
    }
}
