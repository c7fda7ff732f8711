use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;
use std::path::PathBuf;

use crate::cli::output::{SnapshotGroup, SnapshotListing, get_formatter};
use crate::models::{GroupKey, OutputFormat, Payload};
use crate::services::load_snapshot;

#[derive(Debug, Args)]
pub struct SnapshotArgs {
    #[arg(required = true, help = "Snapshot file written by `vagg aggregate --snapshot`")]
    pub path: PathBuf,
}

pub async fn handle_snapshot(
    args: SnapshotArgs,
    format: OutputFormat,
    _verbose: bool,
) -> Result<()> {
    let formatter = get_formatter(format);

    let entries = load_snapshot(&args.path)
        .with_context(|| format!("failed to read snapshot {}", args.path.display()))?;

    let listing = SnapshotListing {
        path: args.path,
        groups: entries.iter().map(summarize).collect(),
    };

    print!("{}", formatter.format_snapshot(&listing));
    Ok(())
}

fn summarize((key, payload): &(GroupKey, Payload)) -> SnapshotGroup {
    SnapshotGroup {
        key: key.to_string(),
        chunk_count: payload.get("chunk_count").and_then(Value::as_u64),
        has_ordered_content: payload
            .get("has_ordered_content")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        content_length: payload
            .get("page_content")
            .and_then(Value::as_str)
            .map_or(0, |c| c.chars().count()),
        ordering_error: payload
            .get("ordering_error")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}
