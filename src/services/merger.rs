//! Merges the payloads of one group into a single payload.
//!
//! The first payload is the base. When the group carries an ordering field
//! and `page_content`, chunk texts are joined in order; otherwise the merged
//! content is left empty.

use serde_json::Value;
use std::cmp::Ordering;

use crate::models::{MergeOutcome, MergedPayload, Payload};
use crate::utils::{is_truthy, type_name};

/// Fields that may carry a chunk's position within its document, in
/// detection priority. `id` is last since it is rarely sequential.
pub const ORDERING_CANDIDATES: [&str; 13] = [
    "chunk_index",
    "chunk_number",
    "chunk_id",
    "chunk",
    "page",
    "page_number",
    "page_num",
    "sequence",
    "seq",
    "order",
    "index",
    "position",
    "id",
];

const CONTENT_FIELD: &str = "page_content";
const METADATA_FIELD: &str = "metadata";
const CONTENT_SEPARATOR: &str = "\n\n";

/// Where the ordering value lives in each payload.
#[derive(Debug, Clone, PartialEq, Eq)]
enum OrderingField {
    TopLevel(&'static str),
    Nested(&'static str),
}

impl OrderingField {
    fn label(&self) -> String {
        match self {
            OrderingField::TopLevel(name) => (*name).to_string(),
            OrderingField::Nested(name) => format!("{METADATA_FIELD}.{name}"),
        }
    }

    /// Ordering value of one payload; `Ok(None)` when absent or null.
    fn resolve<'a>(&self, payload: &'a Payload) -> Result<Option<&'a Value>, String> {
        let value = match self {
            OrderingField::TopLevel(name) => payload.get(*name),
            OrderingField::Nested(name) => match payload.get(METADATA_FIELD) {
                None => None,
                Some(Value::Object(metadata)) => metadata.get(*name),
                Some(other) => {
                    return Err(format!(
                        "'{METADATA_FIELD}' is a {} and has no field '{name}'",
                        type_name(other)
                    ));
                }
            },
        };
        Ok(value.filter(|v| !v.is_null()))
    }
}

/// First candidate found in `payload`, checking the top level before
/// `metadata` for each candidate.
fn detect_ordering_field(payload: &Payload) -> Option<OrderingField> {
    let metadata = payload.get(METADATA_FIELD).and_then(Value::as_object);

    ORDERING_CANDIDATES.iter().find_map(|&name| {
        if payload.contains_key(name) {
            Some(OrderingField::TopLevel(name))
        } else if metadata.is_some_and(|m| m.contains_key(name)) {
            Some(OrderingField::Nested(name))
        } else {
            None
        }
    })
}

/// Merge a group's payloads, in arrival order, into one.
///
/// Never fails: ordering problems are recorded in the payload as
/// `ordering_error` and reported as [`MergeOutcome::Degraded`].
pub fn merge_payloads(payloads: &[Payload]) -> MergedPayload {
    let mut merged = payloads.first().cloned().unwrap_or_default();
    merged.insert("chunk_count".to_string(), Value::from(payloads.len()));

    let field = payloads.first().and_then(|first| {
        detect_ordering_field(first).filter(|_| first.contains_key(CONTENT_FIELD))
    });

    let outcome = match field {
        None => {
            merged.insert(CONTENT_FIELD.to_string(), Value::from(""));
            merged.insert("has_ordered_content".to_string(), Value::Bool(false));
            MergeOutcome::Unordered
        }
        Some(field) => match ordered_content(payloads, &field) {
            Ok(content) => {
                merged.insert(CONTENT_FIELD.to_string(), Value::String(content));
                merged.insert("has_ordered_content".to_string(), Value::Bool(true));
                merged.insert("ordering_field".to_string(), Value::String(field.label()));
                MergeOutcome::Ordered {
                    field: field.label(),
                }
            }
            Err(error) => {
                merged.insert(CONTENT_FIELD.to_string(), Value::from(""));
                merged.insert("has_ordered_content".to_string(), Value::Bool(false));
                merged.insert("ordering_error".to_string(), Value::String(error.clone()));
                MergeOutcome::Degraded { error }
            }
        },
    };

    MergedPayload {
        payload: merged,
        outcome,
    }
}

fn ordered_content(payloads: &[Payload], field: &OrderingField) -> Result<String, String> {
    let mut ordered: Vec<(&Value, &Payload)> = Vec::with_capacity(payloads.len());

    // Binary insertion keeps equal values in arrival order and surfaces the
    // first incomparable pair as an error.
    for payload in payloads {
        let Some(value) = field.resolve(payload)? else {
            continue;
        };
        let mut lo = 0;
        let mut hi = ordered.len();
        while lo < hi {
            let mid = (lo + hi) / 2;
            if compare_values(value, ordered[mid].0)? == Ordering::Less {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        ordered.insert(lo, (value, payload));
    }

    let mut parts = Vec::with_capacity(ordered.len());
    for (_, payload) in ordered {
        match payload.get(CONTENT_FIELD) {
            Some(Value::String(text)) if !text.is_empty() => parts.push(text.as_str()),
            Some(other) if is_truthy(other) => {
                return Err(format!(
                    "{CONTENT_FIELD} must be a string, found {}",
                    type_name(other)
                ));
            }
            _ => {}
        }
    }

    Ok(parts.join(CONTENT_SEPARATOR))
}

/// Total order over the value kinds that can be ranked against each other.
fn compare_values(a: &Value, b: &Value) -> Result<Ordering, String> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
        (Value::Array(xs), Value::Array(ys)) => {
            for (x, y) in xs.iter().zip(ys) {
                if x == y {
                    continue;
                }
                let ord = compare_values(x, y)?;
                if ord != Ordering::Equal {
                    return Ok(ord);
                }
            }
            Ok(xs.len().cmp(&ys.len()))
        }
        _ => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => Ok(x.partial_cmp(&y).unwrap_or(Ordering::Equal)),
            _ => Err(format!(
                "cannot order {} against {}",
                type_name(a),
                type_name(b)
            )),
        },
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::payload_from_json;
    use serde_json::json;

    fn payloads(values: Vec<Value>) -> Vec<Payload> {
        values.into_iter().map(payload_from_json).collect()
    }

    #[test]
    fn test_concatenates_in_order() {
        let input = payloads(vec![
            json!({"doc": "X", "chunk_index": 2, "page_content": "C"}),
            json!({"doc": "X", "chunk_index": 0, "page_content": "A"}),
            json!({"doc": "X", "chunk_index": 1, "page_content": "B"}),
        ]);

        let merged = merge_payloads(&input);
        let p = &merged.payload;

        assert_eq!(p["page_content"], json!("A\n\nB\n\nC"));
        assert_eq!(p["has_ordered_content"], json!(true));
        assert_eq!(p["ordering_field"], json!("chunk_index"));
        assert_eq!(p["chunk_count"], json!(3));
        assert_eq!(p["doc"], json!("X"));
        assert_eq!(
            merged.outcome,
            MergeOutcome::Ordered {
                field: "chunk_index".to_string()
            }
        );
    }

    #[test]
    fn test_nested_ordering_field() {
        let input = payloads(vec![
            json!({"metadata": {"page": 5}, "page_content": "later"}),
            json!({"metadata": {"page": 1}, "page_content": "first"}),
        ]);

        let merged = merge_payloads(&input);

        assert_eq!(merged.payload["page_content"], json!("first\n\nlater"));
        assert_eq!(merged.payload["ordering_field"], json!("metadata.page"));
        assert_eq!(merged.payload["metadata"], json!({"page": 5}));
    }

    #[test]
    fn test_top_level_wins_over_nested_for_same_candidate() {
        let first = payload_from_json(json!({
            "page": 1,
            "metadata": {"chunk_index": 0},
            "page_content": "x"
        }));
        // chunk_index precedes page in priority, so the nested field wins.
        assert_eq!(
            detect_ordering_field(&first),
            Some(OrderingField::Nested("chunk_index"))
        );

        let first = payload_from_json(json!({"seq": 1, "metadata": {"seq": 9}}));
        assert_eq!(
            detect_ordering_field(&first),
            Some(OrderingField::TopLevel("seq"))
        );
    }

    #[test]
    fn test_no_ordering_field() {
        let input = payloads(vec![
            json!({"page_content": "a", "title": "t"}),
            json!({"page_content": "b"}),
        ]);

        let merged = merge_payloads(&input);

        assert_eq!(merged.payload["page_content"], json!(""));
        assert_eq!(merged.payload["has_ordered_content"], json!(false));
        assert!(!merged.payload.contains_key("ordering_field"));
        assert_eq!(merged.outcome, MergeOutcome::Unordered);
    }

    #[test]
    fn test_no_page_content_in_first_payload() {
        let input = payloads(vec![
            json!({"chunk_index": 0}),
            json!({"chunk_index": 1, "page_content": "b"}),
        ]);

        let merged = merge_payloads(&input);

        assert_eq!(merged.payload["page_content"], json!(""));
        assert_eq!(merged.outcome, MergeOutcome::Unordered);
    }

    #[test]
    fn test_incomparable_values_degrade() {
        let input = payloads(vec![
            json!({"chunk_index": 1, "page_content": "a"}),
            json!({"chunk_index": "two", "page_content": "b"}),
        ]);

        let merged = merge_payloads(&input);

        assert_eq!(merged.payload["page_content"], json!(""));
        assert_eq!(merged.payload["has_ordered_content"], json!(false));
        assert!(merged.payload["ordering_error"].is_string());
        assert!(matches!(merged.outcome, MergeOutcome::Degraded { .. }));
        assert_eq!(merged.payload["chunk_count"], json!(2));
    }

    #[test]
    fn test_missing_and_null_order_values_are_dropped() {
        let input = payloads(vec![
            json!({"chunk_index": 1, "page_content": "b"}),
            json!({"page_content": "orphan"}),
            json!({"chunk_index": null, "page_content": "null"}),
            json!({"chunk_index": 0, "page_content": "a"}),
        ]);

        let merged = merge_payloads(&input);

        assert_eq!(merged.payload["page_content"], json!("a\n\nb"));
        assert_eq!(merged.payload["chunk_count"], json!(4));
    }

    #[test]
    fn test_falsy_content_is_skipped() {
        let input = payloads(vec![
            json!({"order": 0, "page_content": "a"}),
            json!({"order": 1, "page_content": ""}),
            json!({"order": 2, "page_content": null}),
            json!({"order": 3}),
            json!({"order": 4, "page_content": "e"}),
        ]);

        let merged = merge_payloads(&input);

        assert_eq!(merged.payload["page_content"], json!("a\n\ne"));
    }

    #[test]
    fn test_non_string_content_degrades() {
        let input = payloads(vec![
            json!({"order": 0, "page_content": "a"}),
            json!({"order": 1, "page_content": 42}),
        ]);

        let merged = merge_payloads(&input);

        assert!(matches!(merged.outcome, MergeOutcome::Degraded { .. }));
        assert_eq!(merged.payload["page_content"], json!(""));
    }

    #[test]
    fn test_non_mapping_metadata_in_later_payload_degrades() {
        let input = payloads(vec![
            json!({"metadata": {"page": 1}, "page_content": "a"}),
            json!({"metadata": "flat", "page_content": "b"}),
        ]);

        let merged = merge_payloads(&input);

        assert!(matches!(merged.outcome, MergeOutcome::Degraded { .. }));
    }

    #[test]
    fn test_equal_order_values_keep_arrival_order() {
        let input = payloads(vec![
            json!({"page": 1, "page_content": "first"}),
            json!({"page": 0, "page_content": "zero"}),
            json!({"page": 1, "page_content": "second"}),
        ]);

        let merged = merge_payloads(&input);

        assert_eq!(
            merged.payload["page_content"],
            json!("zero\n\nfirst\n\nsecond")
        );
    }

    #[test]
    fn test_mixed_numeric_kinds_compare() {
        let input = payloads(vec![
            json!({"page": 2.5, "page_content": "c"}),
            json!({"page": true, "page_content": "b"}),
            json!({"page": 0, "page_content": "a"}),
        ]);

        let merged = merge_payloads(&input);

        assert_eq!(merged.payload["page_content"], json!("a\n\nb\n\nc"));
    }

    #[test]
    fn test_array_order_values() {
        assert_eq!(
            compare_values(&json!([1, "b"]), &json!([1, "c"])),
            Ok(Ordering::Less)
        );
        assert_eq!(
            compare_values(&json!([1]), &json!([1, 0])),
            Ok(Ordering::Less)
        );
        assert!(compare_values(&json!(["a"]), &json!([1])).is_err());
        assert!(compare_values(&json!({"a": 1}), &json!({"a": 2})).is_err());
    }

    #[test]
    fn test_single_payload() {
        let input = payloads(vec![json!({"chunk_id": "only", "page_content": "text"})]);

        let merged = merge_payloads(&input);

        assert_eq!(merged.payload["page_content"], json!("text"));
        assert_eq!(merged.payload["chunk_count"], json!(1));
    }

    #[test]
    fn test_sources_are_untouched() {
        let input = payloads(vec![
            json!({"chunk_index": 1, "page_content": "b"}),
            json!({"chunk_index": 0, "page_content": "a"}),
        ]);
        let before = input.clone();

        let _ = merge_payloads(&input);

        assert_eq!(input, before);
    }
}
