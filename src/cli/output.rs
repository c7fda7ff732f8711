use serde::Serialize;
use std::fmt::Write as FmtWrite;
use std::path::PathBuf;

use crate::models::{AggregationMethod, AggregationReport, OutputFormat};
use crate::services::{CollectionInfo, InspectReport, VerificationReport};
use crate::utils::preview;

pub trait Formatter {
    fn format_report(&self, report: &AggregationReport) -> String;
    fn format_inspect(&self, report: &InspectReport) -> String;
    fn format_verification(&self, report: &VerificationReport) -> String;
    fn format_status(&self, status: &StatusInfo) -> String;
    fn format_snapshot(&self, snapshot: &SnapshotListing) -> String;
    fn format_methods(&self, methods: &[AggregationMethod]) -> String;
    fn format_message(&self, message: &str) -> String;
    fn format_error(&self, error: &str) -> String;
}

#[derive(Debug, Clone)]
pub struct StatusInfo {
    pub url: String,
    pub connected: bool,
    pub error: Option<String>,
    pub collections: Vec<String>,
    pub requested: Option<String>,
    pub collection: Option<CollectionInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotGroup {
    pub key: String,
    pub chunk_count: Option<u64>,
    pub has_ordered_content: bool,
    pub content_length: usize,
    pub ordering_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotListing {
    pub path: PathBuf,
    pub groups: Vec<SnapshotGroup>,
}

const KEY_PREVIEW_CHARS: usize = 60;

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_report(&self, report: &AggregationReport) -> String {
        let mut output = String::new();
        writeln!(output, "Aggregation Complete").unwrap();
        writeln!(output, "--------------------").unwrap();
        writeln!(output, "Input:        {}", report.input_collection).unwrap();
        writeln!(output, "Output:       {}", report.output_collection).unwrap();
        writeln!(output, "Method:       {}", report.method).unwrap();
        writeln!(output, "Points read:  {}", report.scan.scanned).unwrap();
        writeln!(output, "Skipped:      {}", report.scan.skipped).unwrap();
        writeln!(output, "Documents:    {}", report.groups).unwrap();
        writeln!(output, "Dimension:    {}", report.vector_size).unwrap();
        writeln!(output, "Compression:  {:.2}x", report.compression_ratio()).unwrap();
        if let Some(ref path) = report.snapshot_path {
            writeln!(output, "Snapshot:     {}", path.display()).unwrap();
        }
        writeln!(output, "Duration:     {}ms", report.duration_ms).unwrap();

        if !report.degraded.is_empty() {
            writeln!(output).unwrap();
            writeln!(
                output,
                "Content ordering failed for {} documents:",
                report.degraded.len()
            )
            .unwrap();
            for group in &report.degraded {
                writeln!(
                    output,
                    "  {}: {}",
                    preview(&group.key.to_string(), KEY_PREVIEW_CHARS),
                    group.error
                )
                .unwrap();
            }
        }

        output
    }

    fn format_inspect(&self, report: &InspectReport) -> String {
        let mut output = String::new();
        writeln!(output, "Collection:    {}", report.collection).unwrap();
        writeln!(output, "Grouping by:   {}", report.key_path).unwrap();
        writeln!(output, "Points:        {}", report.scanned).unwrap();
        writeln!(output, "Skipped:       {}", report.skipped).unwrap();
        writeln!(output, "Groups:        {}", report.groups).unwrap();
        if report.groups > 0 {
            writeln!(output, "Compression:   {:.2}x", report.compression_ratio()).unwrap();
        }
        if let Some(dim) = report.vector_size {
            writeln!(output, "Dimension:     {}", dim).unwrap();
        }

        if !report.samples.is_empty() {
            writeln!(output).unwrap();
            writeln!(output, "Sample groups:").unwrap();
            for (i, group) in report.samples.iter().enumerate() {
                writeln!(
                    output,
                    "  {}. {}",
                    i + 1,
                    preview(&group.key, KEY_PREVIEW_CHARS)
                )
                .unwrap();
                writeln!(output, "     Chunks: {}", group.chunks).unwrap();
            }
        }

        output
    }

    fn format_verification(&self, report: &VerificationReport) -> String {
        let mut output = String::new();
        writeln!(output, "Collection: {}", report.collection).unwrap();
        writeln!(output, "Documents:  {}", report.points).unwrap();

        for (i, sample) in report.samples.iter().enumerate() {
            writeln!(output).unwrap();
            writeln!(output, "{}. Document ID: {}", i + 1, sample.id).unwrap();
            writeln!(output, "   Payload keys: {}", sample.keys.join(", ")).unwrap();
            if let Some(count) = sample.chunk_count {
                writeln!(output, "   Chunks aggregated: {}", count).unwrap();
            }
            if let Some(ordered) = sample.has_ordered_content {
                writeln!(output, "   Has ordered content: {}", ordered).unwrap();
            }
            if let Some(ref field) = sample.ordering_field {
                writeln!(output, "   Ordering field used: {}", field).unwrap();
            }
            if let Some(ref error) = sample.ordering_error {
                writeln!(output, "   Ordering error: {}", error).unwrap();
            }
            match sample.preview {
                Some(ref text) => {
                    writeln!(output, "   Content length: {} characters", sample.content_length)
                        .unwrap();
                    writeln!(output, "   Content preview: {}", text).unwrap();
                }
                None => writeln!(output, "   Content: [EMPTY]").unwrap(),
            }
        }

        writeln!(output).unwrap();
        writeln!(output, "Content Statistics").unwrap();
        writeln!(output, "------------------").unwrap();
        writeln!(output, "With content:    {}", report.with_content).unwrap();
        writeln!(output, "Empty content:   {}", report.without_content).unwrap();
        if report.degraded > 0 {
            writeln!(output, "Ordering errors: {}", report.degraded).unwrap();
        }
        if let Some(avg) = report.average_content_length {
            writeln!(output, "Average length:  {:.0} characters", avg).unwrap();
        }

        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        writeln!(output, "Status").unwrap();
        writeln!(output, "------").unwrap();

        let state = if status.connected {
            "[CONNECTED]"
        } else {
            "[DISCONNECTED]"
        };
        writeln!(output, "Qdrant:        {}", state).unwrap();
        writeln!(output, "  URL:         {}", status.url).unwrap();
        if let Some(ref error) = status.error {
            writeln!(output, "  Error:       {}", error).unwrap();
        }

        if status.connected {
            writeln!(output, "  Collections: {}", status.collections.len()).unwrap();
            for name in &status.collections {
                writeln!(output, "    - {}", name).unwrap();
            }
        }

        if let Some(ref name) = status.requested {
            writeln!(output).unwrap();
            match status.collection {
                Some(ref info) => {
                    writeln!(output, "Collection:    {}", info.name).unwrap();
                    writeln!(output, "  Points:      {}", info.points_count).unwrap();
                    match info.vector_size {
                        Some(size) => writeln!(output, "  Dimension:   {}", size).unwrap(),
                        None => writeln!(output, "  Dimension:   (named vectors)").unwrap(),
                    }
                    if let Some(distance) = info.distance {
                        writeln!(output, "  Distance:    {}", distance).unwrap();
                    }
                }
                None => writeln!(output, "Collection:    {} (not found)", name).unwrap(),
            }
        }

        output
    }

    fn format_snapshot(&self, snapshot: &SnapshotListing) -> String {
        if snapshot.groups.is_empty() {
            return format!("No groups in snapshot: {}\n", snapshot.path.display());
        }

        let mut output = String::new();
        writeln!(output, "Snapshot: {}", snapshot.path.display()).unwrap();
        writeln!(output, "Groups:   {}\n", snapshot.groups.len()).unwrap();
        for group in &snapshot.groups {
            let chunks = group
                .chunk_count
                .map_or_else(|| "?".to_string(), |c| c.to_string());
            let content = if group.has_ordered_content {
                format!("{} chars", group.content_length)
            } else {
                "no content".to_string()
            };
            writeln!(
                output,
                "  {} ({} chunks, {})",
                preview(&group.key, KEY_PREVIEW_CHARS),
                chunks,
                content
            )
            .unwrap();
        }
        output
    }

    fn format_methods(&self, methods: &[AggregationMethod]) -> String {
        let mut output = String::new();
        writeln!(output, "Aggregation Methods").unwrap();
        writeln!(output, "-------------------").unwrap();
        for method in methods {
            writeln!(output, "  {:<18} {}", method.name(), method.description()).unwrap();
        }
        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {}\n", error)
    }
}

pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render<T: Serialize + ?Sized>(&self, value: &T) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.unwrap_or_else(|e| serde_json::json!({"error": e.to_string()}).to_string())
    }
}

impl Formatter for JsonFormatter {
    fn format_report(&self, report: &AggregationReport) -> String {
        let mut json = serde_json::json!(report);
        if let Some(map) = json.as_object_mut() {
            map.insert(
                "compression_ratio".to_string(),
                serde_json::json!(report.compression_ratio()),
            );
        }
        self.render(&json)
    }

    fn format_inspect(&self, report: &InspectReport) -> String {
        let mut json = serde_json::json!(report);
        if let Some(map) = json.as_object_mut() {
            map.insert(
                "compression_ratio".to_string(),
                serde_json::json!(report.compression_ratio()),
            );
        }
        self.render(&json)
    }

    fn format_verification(&self, report: &VerificationReport) -> String {
        self.render(report)
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let collection = status.collection.as_ref().map(|info| {
            serde_json::json!({
                "name": info.name,
                "points": info.points_count,
                "vector_size": info.vector_size,
                "distance": info.distance,
            })
        });

        let json = serde_json::json!({
            "qdrant": {
                "url": status.url,
                "connected": status.connected,
                "error": status.error,
                "collections": status.collections,
            },
            "requested": status.requested,
            "collection": collection,
        });

        self.render(&json)
    }

    fn format_snapshot(&self, snapshot: &SnapshotListing) -> String {
        self.render(snapshot)
    }

    fn format_methods(&self, methods: &[AggregationMethod]) -> String {
        let methods_array: Vec<serde_json::Value> = methods
            .iter()
            .map(|m| serde_json::json!({"name": m.name(), "description": m.description()}))
            .collect();

        self.render(&serde_json::json!({"methods": methods_array}))
    }

    fn format_message(&self, message: &str) -> String {
        serde_json::json!({"message": message}).to_string()
    }

    fn format_error(&self, error: &str) -> String {
        serde_json::json!({"error": error}).to_string()
    }
}

pub struct MarkdownFormatter;

impl Formatter for MarkdownFormatter {
    fn format_report(&self, report: &AggregationReport) -> String {
        let mut output = String::new();
        writeln!(output, "## Aggregation Complete\n").unwrap();
        writeln!(output, "| Metric | Value |").unwrap();
        writeln!(output, "|--------|-------|").unwrap();
        writeln!(output, "| Input | `{}` |", report.input_collection).unwrap();
        writeln!(output, "| Output | `{}` |", report.output_collection).unwrap();
        writeln!(output, "| Method | {} |", report.method).unwrap();
        writeln!(output, "| Points read | {} |", report.scan.scanned).unwrap();
        writeln!(output, "| Skipped | {} |", report.scan.skipped).unwrap();
        writeln!(output, "| Documents | {} |", report.groups).unwrap();
        writeln!(output, "| Dimension | {} |", report.vector_size).unwrap();
        writeln!(
            output,
            "| Compression | {:.2}x |",
            report.compression_ratio()
        )
        .unwrap();
        writeln!(output, "| Duration | {}ms |", report.duration_ms).unwrap();
        if let Some(ref path) = report.snapshot_path {
            writeln!(output, "\n**Snapshot:** `{}`", path.display()).unwrap();
        }

        if !report.degraded.is_empty() {
            writeln!(output, "\n### Ordering Errors\n").unwrap();
            for group in &report.degraded {
                writeln!(output, "- `{}`: {}", group.key, group.error).unwrap();
            }
        }

        output
    }

    fn format_inspect(&self, report: &InspectReport) -> String {
        let mut output = String::new();
        writeln!(output, "## Inspection: `{}`\n", report.collection).unwrap();
        writeln!(output, "- **Grouping by:** `{}`", report.key_path).unwrap();
        writeln!(output, "- **Points:** {}", report.scanned).unwrap();
        writeln!(output, "- **Skipped:** {}", report.skipped).unwrap();
        writeln!(output, "- **Groups:** {}", report.groups).unwrap();
        if report.groups > 0 {
            writeln!(
                output,
                "- **Compression:** {:.2}x",
                report.compression_ratio()
            )
            .unwrap();
        }
        if let Some(dim) = report.vector_size {
            writeln!(output, "- **Dimension:** {}", dim).unwrap();
        }

        if !report.samples.is_empty() {
            writeln!(output, "\n| Group | Chunks |").unwrap();
            writeln!(output, "|-------|--------|").unwrap();
            for group in &report.samples {
                writeln!(
                    output,
                    "| `{}` | {} |",
                    preview(&group.key, KEY_PREVIEW_CHARS),
                    group.chunks
                )
                .unwrap();
            }
        }

        output
    }

    fn format_verification(&self, report: &VerificationReport) -> String {
        let mut output = String::new();
        writeln!(output, "## Verification: `{}`\n", report.collection).unwrap();
        writeln!(output, "| Metric | Value |").unwrap();
        writeln!(output, "|--------|-------|").unwrap();
        writeln!(output, "| Documents | {} |", report.points).unwrap();
        writeln!(output, "| With content | {} |", report.with_content).unwrap();
        writeln!(output, "| Empty content | {} |", report.without_content).unwrap();
        writeln!(output, "| Ordering errors | {} |", report.degraded).unwrap();
        if let Some(avg) = report.average_content_length {
            writeln!(output, "| Average length | {:.0} |", avg).unwrap();
        }

        for sample in &report.samples {
            writeln!(output, "\n### `{}`\n", sample.id).unwrap();
            if let Some(count) = sample.chunk_count {
                writeln!(output, "- **Chunks:** {}", count).unwrap();
            }
            if let Some(ref field) = sample.ordering_field {
                writeln!(output, "- **Ordering field:** `{}`", field).unwrap();
            }
            if let Some(ref error) = sample.ordering_error {
                writeln!(output, "- **Ordering error:** {}", error).unwrap();
            }
            if let Some(ref text) = sample.preview {
                writeln!(output, "\n```").unwrap();
                writeln!(output, "{}", text).unwrap();
                writeln!(output, "```").unwrap();
            }
        }

        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        writeln!(output, "## Status\n").unwrap();

        let state = if status.connected { "✅" } else { "❌" };
        writeln!(output, "### Qdrant {}\n", state).unwrap();
        writeln!(output, "- **URL:** `{}`", status.url).unwrap();
        if let Some(ref error) = status.error {
            writeln!(output, "- **Error:** {}", error).unwrap();
        }
        if status.connected {
            writeln!(output, "- **Collections:** {}", status.collections.len()).unwrap();
            for name in &status.collections {
                writeln!(output, "  - `{}`", name).unwrap();
            }
        }

        if let Some(ref name) = status.requested {
            writeln!(output, "\n### Collection `{}`\n", name).unwrap();
            match status.collection {
                Some(ref info) => {
                    writeln!(output, "- **Points:** {}", info.points_count).unwrap();
                    if let Some(size) = info.vector_size {
                        writeln!(output, "- **Dimension:** {}", size).unwrap();
                    }
                    if let Some(distance) = info.distance {
                        writeln!(output, "- **Distance:** {}", distance).unwrap();
                    }
                }
                None => writeln!(output, "*Not found.*").unwrap(),
            }
        }

        output
    }

    fn format_snapshot(&self, snapshot: &SnapshotListing) -> String {
        let mut output = String::new();
        writeln!(output, "## Snapshot\n").unwrap();
        writeln!(output, "**Path:** `{}`\n", snapshot.path.display()).unwrap();
        if snapshot.groups.is_empty() {
            writeln!(output, "*No groups.*").unwrap();
            return output;
        }

        writeln!(output, "| Group | Chunks | Content |").unwrap();
        writeln!(output, "|-------|--------|---------|").unwrap();
        for group in &snapshot.groups {
            let chunks = group
                .chunk_count
                .map_or_else(|| "?".to_string(), |c| c.to_string());
            writeln!(
                output,
                "| `{}` | {} | {} |",
                preview(&group.key, KEY_PREVIEW_CHARS),
                chunks,
                group.content_length
            )
            .unwrap();
        }
        output
    }

    fn format_methods(&self, methods: &[AggregationMethod]) -> String {
        let mut output = String::new();
        writeln!(output, "## Aggregation Methods\n").unwrap();
        writeln!(output, "| Method | Description |").unwrap();
        writeln!(output, "|--------|-------------|").unwrap();
        for method in methods {
            writeln!(output, "| `{}` | {} |", method.name(), method.description()).unwrap();
        }
        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("> {}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("> ⚠️ **Error:** {}\n", error)
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
        OutputFormat::Markdown => Box::new(MarkdownFormatter),
    }
}
