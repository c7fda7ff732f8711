//! Binary snapshot of the merged metadata of an aggregation run.
//!
//! Entries are stored as canonical JSON text inside a bincode envelope, so
//! arbitrary nested payload values survive the round trip.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::AggregateError;
use crate::models::{GroupKey, Payload};

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    version: u32,
    entries: Vec<SnapshotEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEntry {
    key: String,
    payload: String,
}

/// Write `(key, merged payload)` pairs to `path`, creating parent directories.
pub fn save_snapshot(path: &Path, entries: &[(GroupKey, Payload)]) -> Result<(), AggregateError> {
    let groups = entries.len();
    let entries = entries
        .iter()
        .map(|(key, payload)| {
            Ok(SnapshotEntry {
                key: key.canonical().to_string(),
                payload: serde_json::to_string(payload)
                    .map_err(|e| AggregateError::Snapshot(e.to_string()))?,
            })
        })
        .collect::<Result<Vec<_>, AggregateError>>()?;

    let bytes = bincode::serialize(&SnapshotFile {
        version: SNAPSHOT_VERSION,
        entries,
    })
    .map_err(|e| AggregateError::Snapshot(e.to_string()))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            AggregateError::Snapshot(format!("cannot create {}: {e}", parent.display()))
        })?;
    }
    fs::write(path, bytes)
        .map_err(|e| AggregateError::Snapshot(format!("cannot write {}: {e}", path.display())))?;

    tracing::info!(path = %path.display(), groups, "saved metadata snapshot");
    Ok(())
}

/// Read a snapshot written by [`save_snapshot`], in group order.
pub fn load_snapshot(path: &Path) -> Result<Vec<(GroupKey, Payload)>, AggregateError> {
    let bytes = fs::read(path)
        .map_err(|e| AggregateError::Snapshot(format!("cannot read {}: {e}", path.display())))?;
    let file: SnapshotFile =
        bincode::deserialize(&bytes).map_err(|e| AggregateError::Snapshot(e.to_string()))?;

    if file.version != SNAPSHOT_VERSION {
        return Err(AggregateError::Snapshot(format!(
            "unsupported snapshot version {}",
            file.version
        )));
    }

    file.entries
        .into_iter()
        .map(|entry| {
            let key = GroupKey::from_canonical(&entry.key)
                .map_err(|e| AggregateError::Snapshot(format!("bad group key: {e}")))?;
            let payload = serde_json::from_str(&entry.payload)
                .map_err(|e| AggregateError::Snapshot(format!("bad payload: {e}")))?;
            Ok((key, payload))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::payload_from_json;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_preserves_order_and_nesting() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/dir/metadata.bin");
        let entries = vec![
            (
                GroupKey::from("b.pdf"),
                payload_from_json(json!({
                    "chunk_count": 2,
                    "metadata": {"tags": ["x", 1, null], "score": 0.5}
                })),
            ),
            (
                GroupKey::new(json!(7)),
                payload_from_json(json!({"chunk_count": 1})),
            ),
        ];

        save_snapshot(&path, &entries).unwrap();
        let loaded = load_snapshot(&path).unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].0, GroupKey::from("b.pdf"));
        assert_eq!(loaded[0].1, entries[0].1);
        assert_eq!(loaded[1].0, GroupKey::new(json!(7)));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = load_snapshot(&dir.path().join("absent.bin")).unwrap_err();
        assert!(matches!(err, AggregateError::Snapshot(_)));
    }

    #[test]
    fn test_load_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbage.bin");
        fs::write(&path, b"not a snapshot").unwrap();
        assert!(load_snapshot(&path).is_err());
    }
}
