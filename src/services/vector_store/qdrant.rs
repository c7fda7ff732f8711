//! Qdrant vector store backend implementation.

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::vectors_config::Config as VectorsConfigKind;
use qdrant_client::qdrant::vectors_output::VectorsOptions;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, ListValue, PointId, PointStruct, RetrievedPoint,
    ScrollPointsBuilder, Struct, UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use super::{CollectionInfo, ScrollPage, VectorStore};
use crate::error::VectorStoreError;
use crate::models::{
    DistanceMetric, OutputPoint, Payload, PointKey, SourceRecord, VectorStoreConfig,
};

/// Qdrant vector store backend.
pub struct QdrantBackend {
    client: Qdrant,
    url: String,
}

impl QdrantBackend {
    /// Create a new Qdrant backend from configuration.
    pub fn new(config: &VectorStoreConfig) -> Result<Self, VectorStoreError> {
        let mut builder =
            Qdrant::from_url(&config.url).timeout(Duration::from_secs(config.timeout_secs));

        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
        }

        let client = builder
            .build()
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl VectorStore for QdrantBackend {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        self.client
            .health_check()
            .await
            .map(|_| true)
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))
    }

    async fn list_collections(&self) -> Result<Vec<String>, VectorStoreError> {
        let response = self
            .client
            .list_collections()
            .await
            .map_err(|e| VectorStoreError::CollectionError(e.to_string()))?;

        let mut names: Vec<String> = response.collections.into_iter().map(|c| c.name).collect();
        names.sort();
        Ok(names)
    }

    async fn collection_info(
        &self,
        name: &str,
    ) -> Result<Option<CollectionInfo>, VectorStoreError> {
        let exists = self
            .client
            .collection_exists(name.to_string())
            .await
            .map_err(|e| VectorStoreError::CollectionError(e.to_string()))?;
        if !exists {
            return Ok(None);
        }

        let info = self
            .client
            .collection_info(name.to_string())
            .await
            .map_err(|e| VectorStoreError::CollectionError(e.to_string()))?;

        let Some(result) = info.result else {
            return Ok(None);
        };

        let params = result
            .config
            .and_then(|c| c.params)
            .and_then(|p| p.vectors_config)
            .and_then(|v| v.config);

        let (vector_size, distance) = match params {
            Some(VectorsConfigKind::Params(params)) => (
                Some(params.size),
                Distance::try_from(params.distance)
                    .ok()
                    .and_then(distance_from_qdrant),
            ),
            _ => (None, None),
        };

        Ok(Some(CollectionInfo {
            name: name.to_string(),
            points_count: result.points_count.unwrap_or(0),
            vector_size,
            distance,
        }))
    }

    async fn scroll(
        &self,
        collection: &str,
        limit: u32,
        cursor: Option<PointKey>,
        with_vectors: bool,
    ) -> Result<ScrollPage, VectorStoreError> {
        let mut scroll_builder = ScrollPointsBuilder::new(collection)
            .limit(limit)
            .with_payload(true)
            .with_vectors(with_vectors);

        if let Some(key) = cursor {
            scroll_builder = scroll_builder.offset(point_id_from_key(key));
        }

        let response = self
            .client
            .scroll(scroll_builder)
            .await
            .map_err(|e| VectorStoreError::ScrollError(e.to_string()))?;

        let records = response
            .result
            .into_iter()
            .map(|point| record_from_point(point, with_vectors))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ScrollPage {
            records,
            next_cursor: response.next_page_offset.and_then(key_from_point_id),
        })
    }

    async fn recreate_collection(
        &self,
        name: &str,
        vector_size: u64,
        distance: DistanceMetric,
    ) -> Result<(), VectorStoreError> {
        let exists = self
            .client
            .collection_exists(name.to_string())
            .await
            .map_err(|e| VectorStoreError::CollectionError(e.to_string()))?;

        if exists {
            self.client
                .delete_collection(name.to_string())
                .await
                .map_err(|e| VectorStoreError::CollectionError(e.to_string()))?;
        }

        let create_collection = CreateCollectionBuilder::new(name).vectors_config(
            VectorParamsBuilder::new(vector_size, distance_to_qdrant(distance)),
        );

        self.client
            .create_collection(create_collection)
            .await
            .map_err(|e| VectorStoreError::CollectionError(e.to_string()))?;

        Ok(())
    }

    async fn upsert(
        &self,
        collection: &str,
        points: Vec<OutputPoint>,
    ) -> Result<(), VectorStoreError> {
        if points.is_empty() {
            return Ok(());
        }

        let points: Vec<PointStruct> = points
            .into_iter()
            .map(|point| {
                let payload: HashMap<String, QdrantValue> = point
                    .payload
                    .into_iter()
                    .map(|(k, v)| (k, json_to_qdrant(v)))
                    .collect();
                PointStruct::new(point.id, point.vector, payload)
            })
            .collect();

        let upsert = UpsertPointsBuilder::new(collection, points).wait(true);

        self.client
            .upsert_points(upsert)
            .await
            .map_err(|e| VectorStoreError::UpsertError(e.to_string()))?;

        Ok(())
    }

    fn location(&self) -> &str {
        &self.url
    }
}

fn distance_to_qdrant(distance: DistanceMetric) -> Distance {
    match distance {
        DistanceMetric::Cosine => Distance::Cosine,
        DistanceMetric::Euclid => Distance::Euclid,
        DistanceMetric::Dot => Distance::Dot,
        DistanceMetric::Manhattan => Distance::Manhattan,
    }
}

fn distance_from_qdrant(distance: Distance) -> Option<DistanceMetric> {
    match distance {
        Distance::Cosine => Some(DistanceMetric::Cosine),
        Distance::Euclid => Some(DistanceMetric::Euclid),
        Distance::Dot => Some(DistanceMetric::Dot),
        Distance::Manhattan => Some(DistanceMetric::Manhattan),
        Distance::UnknownDistance => None,
    }
}

fn point_id_from_key(key: PointKey) -> PointId {
    match key {
        PointKey::Num(n) => PointId::from(n),
        PointKey::Uuid(s) => PointId::from(s),
    }
}

fn key_from_point_id(id: PointId) -> Option<PointKey> {
    match id.point_id_options? {
        PointIdOptions::Num(n) => Some(PointKey::Num(n)),
        PointIdOptions::Uuid(s) => Some(PointKey::Uuid(s)),
    }
}

#[allow(deprecated)]
fn record_from_point(
    point: RetrievedPoint,
    with_vectors: bool,
) -> Result<SourceRecord, VectorStoreError> {
    let id = point
        .id
        .and_then(key_from_point_id)
        .ok_or_else(|| VectorStoreError::ScrollError("point without id".to_string()))?;

    let vector = match point.vectors.and_then(|v| v.vectors_options) {
        Some(VectorsOptions::Vector(v)) => v.data,
        Some(VectorsOptions::Vectors(_)) => {
            return Err(VectorStoreError::ScrollError(format!(
                "point {id} uses named vectors; only a single unnamed vector is supported"
            )));
        }
        None if with_vectors => {
            return Err(VectorStoreError::ScrollError(format!(
                "point {id} was returned without a vector"
            )));
        }
        None => Vec::new(),
    };

    Ok(SourceRecord {
        id,
        vector,
        payload: payload_from_qdrant(point.payload),
    })
}

/// gRPC payload maps are unordered; keys are sorted for a stable base payload.
fn payload_from_qdrant(fields: HashMap<String, QdrantValue>) -> Payload {
    let mut entries: Vec<(String, QdrantValue)> = fields.into_iter().collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries
        .into_iter()
        .map(|(k, v)| (k, qdrant_to_json(v)))
        .collect()
}

fn qdrant_to_json(value: QdrantValue) -> Value {
    match value.kind {
        None | Some(Kind::NullValue(_)) => Value::Null,
        Some(Kind::BoolValue(b)) => Value::Bool(b),
        Some(Kind::IntegerValue(n)) => Value::from(n),
        Some(Kind::DoubleValue(f)) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Some(Kind::StringValue(s)) => Value::String(s),
        Some(Kind::ListValue(list)) => {
            Value::Array(list.values.into_iter().map(qdrant_to_json).collect())
        }
        Some(Kind::StructValue(s)) => Value::Object(payload_from_qdrant(s.fields)),
    }
}

fn json_to_qdrant(value: Value) -> QdrantValue {
    let kind = match value {
        Value::Null => Kind::NullValue(0),
        Value::Bool(b) => Kind::BoolValue(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Kind::IntegerValue(i),
            None => Kind::DoubleValue(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => Kind::StringValue(s),
        Value::Array(items) => Kind::ListValue(ListValue {
            values: items.into_iter().map(json_to_qdrant).collect(),
        }),
        Value::Object(map) => Kind::StructValue(Struct {
            fields: map
                .into_iter()
                .map(|(k, v)| (k, json_to_qdrant(v)))
                .collect(),
        }),
    };
    QdrantValue { kind: Some(kind) }
}
