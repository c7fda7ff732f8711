//! In-process vector store.
//!
//! Mirrors the Qdrant semantics the aggregator relies on: cursor-based
//! scrolling in insertion order, destructive recreate, and dimension checks
//! on upsert.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{CollectionInfo, ScrollPage, VectorStore};
use crate::error::VectorStoreError;
use crate::models::{DistanceMetric, OutputPoint, PointKey, SourceRecord};

#[derive(Debug, Clone)]
struct MemoryCollection {
    vector_size: u64,
    distance: DistanceMetric,
    points: Vec<SourceRecord>,
}

/// Vector store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<BTreeMap<String, MemoryCollection>>,
    scroll_calls: AtomicUsize,
    upsert_calls: AtomicUsize,
    fail_upsert_at: Mutex<Option<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or replace) a collection holding `records`.
    pub fn insert_collection(
        &self,
        name: &str,
        vector_size: u64,
        distance: DistanceMetric,
        records: Vec<SourceRecord>,
    ) -> Result<(), VectorStoreError> {
        let mut collections = self.lock()?;
        collections.insert(
            name.to_string(),
            MemoryCollection {
                vector_size,
                distance,
                points: records,
            },
        );
        Ok(())
    }

    /// All points of a collection in insertion order.
    pub fn points(&self, name: &str) -> Result<Vec<SourceRecord>, VectorStoreError> {
        let collections = self.lock()?;
        collections
            .get(name)
            .map(|c| c.points.clone())
            .ok_or_else(|| VectorStoreError::NotFound(name.to_string()))
    }

    /// Make the upsert call with this zero-based index fail.
    pub fn fail_upsert_at(&self, call: usize) -> Result<(), VectorStoreError> {
        *self
            .fail_upsert_at
            .lock()
            .map_err(|_| VectorStoreError::ClientError("store lock poisoned".to_string()))? =
            Some(call);
        Ok(())
    }

    pub fn scroll_calls(&self) -> usize {
        self.scroll_calls.load(Ordering::SeqCst)
    }

    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, MemoryCollection>>, VectorStoreError>
    {
        self.collections
            .lock()
            .map_err(|_| VectorStoreError::ClientError("store lock poisoned".to_string()))
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        Ok(true)
    }

    async fn list_collections(&self) -> Result<Vec<String>, VectorStoreError> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    async fn collection_info(
        &self,
        name: &str,
    ) -> Result<Option<CollectionInfo>, VectorStoreError> {
        Ok(self.lock()?.get(name).map(|c| CollectionInfo {
            name: name.to_string(),
            points_count: c.points.len() as u64,
            vector_size: Some(c.vector_size),
            distance: Some(c.distance),
        }))
    }

    async fn scroll(
        &self,
        collection: &str,
        limit: u32,
        cursor: Option<PointKey>,
        with_vectors: bool,
    ) -> Result<ScrollPage, VectorStoreError> {
        self.scroll_calls.fetch_add(1, Ordering::SeqCst);

        let collections = self.lock()?;
        let stored = collections
            .get(collection)
            .ok_or_else(|| VectorStoreError::NotFound(collection.to_string()))?;

        let start = match cursor {
            None => 0,
            Some(ref key) => stored
                .points
                .iter()
                .position(|p| &p.id == key)
                .ok_or_else(|| VectorStoreError::ScrollError(format!("unknown offset {key}")))?,
        };
        let end = (start + limit as usize).min(stored.points.len());

        let records = stored.points[start..end]
            .iter()
            .map(|p| SourceRecord {
                id: p.id.clone(),
                vector: if with_vectors {
                    p.vector.clone()
                } else {
                    Vec::new()
                },
                payload: p.payload.clone(),
            })
            .collect();

        Ok(ScrollPage {
            records,
            next_cursor: stored.points.get(end).map(|p| p.id.clone()),
        })
    }

    async fn recreate_collection(
        &self,
        name: &str,
        vector_size: u64,
        distance: DistanceMetric,
    ) -> Result<(), VectorStoreError> {
        self.insert_collection(name, vector_size, distance, Vec::new())
    }

    async fn upsert(
        &self,
        collection: &str,
        points: Vec<OutputPoint>,
    ) -> Result<(), VectorStoreError> {
        let call = self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        let fail_at = *self
            .fail_upsert_at
            .lock()
            .map_err(|_| VectorStoreError::ClientError("store lock poisoned".to_string()))?;
        if fail_at == Some(call) {
            return Err(VectorStoreError::UpsertError(format!(
                "injected failure on upsert call {call}"
            )));
        }

        let mut collections = self.lock()?;
        let stored = collections
            .get_mut(collection)
            .ok_or_else(|| VectorStoreError::NotFound(collection.to_string()))?;

        for point in points {
            if point.vector.len() as u64 != stored.vector_size {
                return Err(VectorStoreError::UpsertError(format!(
                    "wrong vector dimension: expected {}, got {}",
                    stored.vector_size,
                    point.vector.len()
                )));
            }
            let id = PointKey::Uuid(point.id);
            let record = SourceRecord {
                id: id.clone(),
                vector: point.vector,
                payload: point.payload,
            };
            match stored.points.iter_mut().find(|p| p.id == id) {
                Some(existing) => *existing = record,
                None => stored.points.push(record),
            }
        }
        Ok(())
    }

    fn location(&self) -> &str {
        "memory"
    }
}
