//! Plan preview for `remsync diff`.
//!
//! Renders each planned operation as a unified diff of the pretty-printed
//! record, destination on the left, source on the right. Nothing is written.

use serde_json::{Map, Value};
use similar::TextDiff;

use remsync_core::{Operation, OperationKind, Record, RecordId, RecordSet};

/// One planned operation with its rendered diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationPreview {
    pub kind: OperationKind,
    pub id: RecordId,
    pub unified_diff: String,
}

/// Render `operations` against the records currently in `destination`.
pub fn preview(operations: &[Operation], destination: &RecordSet) -> Vec<OperationPreview> {
    operations
        .iter()
        .map(|op| {
            let existing = destination.get(op.id()).map(render).unwrap_or_default();
            let planned = op.record().map(render).unwrap_or_default();

            let old_header = format!("a/{}", op.id());
            let new_header = format!("b/{}", op.id());
            let unified_diff = TextDiff::from_lines(&existing, &planned)
                .unified_diff()
                .header(&old_header, &new_header)
                .context_radius(3)
                .to_string();

            OperationPreview {
                kind: op.kind(),
                id: op.id().clone(),
                unified_diff,
            }
        })
        .collect()
}

/// Pretty JSON of the comparable fields. Multi-line strings are split so a
/// one-line edit in a long text field shows up as a one-line diff.
fn render(record: &Record) -> String {
    let mut out = String::new();
    for (key, value) in record.without_metadata().fields() {
        match value {
            Value::String(text) if text.contains('\n') => {
                out.push_str(&format!("{key}: |\n"));
                for line in text.lines() {
                    out.push_str("  ");
                    out.push_str(line);
                    out.push('\n');
                }
            }
            other => {
                let mut single = Map::new();
                single.insert(key.clone(), other.clone());
                let rendered = format!("{:#}", Value::Object(single));
                // Drop the surrounding braces of the one-key object.
                for line in rendered.lines().filter(|l| *l != "{" && *l != "}") {
                    out.push_str(line.strip_prefix("  ").unwrap_or(line));
                    out.push('\n');
                }
            }
        }
    }
    out
}
