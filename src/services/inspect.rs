//! Read-only diagnostics over source and aggregated collections.

use serde::Serialize;
use serde_json::Value;

use crate::error::{AggregateError, VectorStoreError};
use crate::models::{DEFAULT_SCROLL_BATCH_SIZE, PointKey};
use crate::services::grouper::collect_groups;
use crate::services::vector_store::VectorStore;
use crate::utils::{PREVIEW_CHARS, preview};

/// Size of one group found by [`inspect_groups`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub key: String,
    pub chunks: usize,
}

/// What an aggregation over a collection would produce.
#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub collection: String,
    pub key_path: String,
    pub scanned: u64,
    pub skipped: u64,
    pub groups: usize,
    pub vector_size: Option<usize>,
    pub samples: Vec<GroupSummary>,
}

impl InspectReport {
    pub fn compression_ratio(&self) -> f64 {
        if self.groups == 0 {
            0.0
        } else {
            (self.scanned - self.skipped) as f64 / self.groups as f64
        }
    }
}

/// Scan and group `collection` without writing anything.
pub async fn inspect_groups(
    store: &dyn VectorStore,
    collection: &str,
    key_path: &str,
    batch_size: u32,
    limit: usize,
) -> Result<InspectReport, AggregateError> {
    let grouped = collect_groups(store, collection, key_path, batch_size).await?;

    let vector_size = grouped
        .groups()
        .first()
        .and_then(|g| g.vectors().first())
        .map(Vec::len);
    let samples = grouped
        .groups()
        .iter()
        .take(limit)
        .map(|g| GroupSummary {
            key: g.key().to_string(),
            chunks: g.len(),
        })
        .collect();

    Ok(InspectReport {
        collection: collection.to_string(),
        key_path: key_path.to_string(),
        scanned: grouped.stats.scanned,
        skipped: grouped.stats.skipped,
        groups: grouped.len(),
        vector_size,
        samples,
    })
}

/// One aggregated point as seen by [`verify_collection`].
#[derive(Debug, Clone, Serialize)]
pub struct PointSummary {
    pub id: String,
    pub keys: Vec<String>,
    pub chunk_count: Option<u64>,
    pub has_ordered_content: Option<bool>,
    pub ordering_field: Option<String>,
    pub ordering_error: Option<String>,
    pub content_length: usize,
    pub preview: Option<String>,
}

/// Content statistics of an aggregated collection.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub collection: String,
    pub points: u64,
    pub with_content: u64,
    pub without_content: u64,
    pub degraded: u64,
    /// Mean length in characters of the non-empty contents.
    pub average_content_length: Option<f64>,
    pub samples: Vec<PointSummary>,
}

/// Walk an aggregated collection and summarise its merged content.
pub async fn verify_collection(
    store: &dyn VectorStore,
    collection: &str,
    samples: usize,
) -> Result<VerificationReport, AggregateError> {
    if store.collection_info(collection).await?.is_none() {
        return Err(VectorStoreError::NotFound(collection.to_string()).into());
    }

    let mut report = VerificationReport {
        collection: collection.to_string(),
        points: 0,
        with_content: 0,
        without_content: 0,
        degraded: 0,
        average_content_length: None,
        samples: Vec::new(),
    };
    let mut total_chars: u64 = 0;
    let mut cursor: Option<PointKey> = None;

    loop {
        let page = store
            .scroll(collection, DEFAULT_SCROLL_BATCH_SIZE, cursor, false)
            .await?;
        if page.records.is_empty() {
            break;
        }

        for record in &page.records {
            let payload = &record.payload;
            let content = match payload.get("page_content") {
                Some(Value::String(text)) if !text.is_empty() => Some(text.as_str()),
                _ => None,
            };
            let content_length = content.map_or(0, |c| c.chars().count());

            report.points += 1;
            match content {
                Some(_) => {
                    report.with_content += 1;
                    total_chars += content_length as u64;
                }
                None => report.without_content += 1,
            }
            if payload.contains_key("ordering_error") {
                report.degraded += 1;
            }

            if report.samples.len() < samples {
                report.samples.push(PointSummary {
                    id: record.id.to_string(),
                    keys: payload.keys().cloned().collect(),
                    chunk_count: payload.get("chunk_count").and_then(Value::as_u64),
                    has_ordered_content: payload
                        .get("has_ordered_content")
                        .and_then(Value::as_bool),
                    ordering_field: payload
                        .get("ordering_field")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    ordering_error: payload
                        .get("ordering_error")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    content_length,
                    preview: content.map(|c| preview(c, PREVIEW_CHARS)),
                });
            }
        }

        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    if report.with_content > 0 {
        report.average_content_length = Some(total_chars as f64 / report.with_content as f64);
    }
    Ok(report)
}
