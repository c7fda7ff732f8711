//! Vector store abstraction layer.
//!
//! The aggregation engine only talks to this trait, so the Qdrant backend
//! and the in-process [`MemoryStore`] are interchangeable.

mod memory;
mod qdrant;

pub use memory::MemoryStore;
pub use qdrant::QdrantBackend;

use async_trait::async_trait;

use crate::error::VectorStoreError;
use crate::models::{DistanceMetric, OutputPoint, PointKey, SourceRecord, VectorStoreConfig};

/// Collection information.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionInfo {
    pub name: String,
    pub points_count: u64,
    /// `None` when the collection uses named vectors.
    pub vector_size: Option<u64>,
    pub distance: Option<DistanceMetric>,
}

/// One page returned by [`VectorStore::scroll`].
#[derive(Debug, Clone, Default)]
pub struct ScrollPage {
    pub records: Vec<SourceRecord>,
    /// `None` signals the end of the collection.
    pub next_cursor: Option<PointKey>,
}

/// Operations the aggregator needs from a vector store.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Check if the vector store is healthy and accessible.
    async fn health_check(&self) -> Result<bool, VectorStoreError>;

    /// Names of all collections.
    async fn list_collections(&self) -> Result<Vec<String>, VectorStoreError>;

    /// Get information about a collection.
    /// Returns None if the collection doesn't exist.
    async fn collection_info(&self, name: &str)
    -> Result<Option<CollectionInfo>, VectorStoreError>;

    /// Read one page of points, starting at `cursor` (or the beginning).
    /// Payloads are always returned; vectors only when `with_vectors` is set.
    async fn scroll(
        &self,
        collection: &str,
        limit: u32,
        cursor: Option<PointKey>,
        with_vectors: bool,
    ) -> Result<ScrollPage, VectorStoreError>;

    /// Drop the collection if it exists and create it empty.
    async fn recreate_collection(
        &self,
        name: &str,
        vector_size: u64,
        distance: DistanceMetric,
    ) -> Result<(), VectorStoreError>;

    /// Insert or replace points, returning once the store acknowledged the write.
    async fn upsert(&self, collection: &str, points: Vec<OutputPoint>)
    -> Result<(), VectorStoreError>;

    /// Human-readable location of the store, for status output.
    fn location(&self) -> &str;
}

/// Create the Qdrant backend from configuration.
pub fn create_backend(config: &VectorStoreConfig) -> Result<Box<dyn VectorStore>, VectorStoreError> {
    let backend = QdrantBackend::new(config)?;
    Ok(Box::new(backend))
}

