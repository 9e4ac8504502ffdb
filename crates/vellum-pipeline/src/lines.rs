//! Line edits on the document hierarchy.

use std::collections::HashMap;
use vellum_core::{Record, Value};
use vellum_store::FieldUpdate;

const LEVELS: [&str; 4] = ["pages", "areas", "paragraphs", "lines"];

/// A requested rewrite of one line's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineEdit {
    /// Line uuid.
    pub uuid: String,
    /// Replacement text.
    pub text: String,
}

/// Maps each line uuid to its dotted store path,
/// `pages.{p}.areas.{a}.paragraphs.{q}.lines.{l}`.
pub fn line_paths(document: &Record) -> HashMap<String, String> {
    let mut paths = HashMap::new();
    collect(document, 0, String::new(), &mut paths);
    paths
}

fn collect(record: &Record, depth: usize, prefix: String, paths: &mut HashMap<String, String>) {
    let Some(level) = LEVELS.get(depth) else {
        if let Some(uuid) = record.get("uuid").and_then(Value::as_str) {
            paths.insert(uuid.to_string(), prefix);
        }
        return;
    };
    let Some(items) = record.get(level).and_then(Value::as_array) else {
        return;
    };
    for (index, item) in items.iter().enumerate() {
        if let Some(child) = item.as_document() {
            let path = if prefix.is_empty() {
                format!("{level}.{index}")
            } else {
                format!("{prefix}.{level}.{index}")
            };
            collect(child, depth + 1, path, paths);
        }
    }
}

/// Builds the update for `edits` against `document`.
///
/// Returns the update and the number of edits that name an existing line.
/// Edits for unknown lines are ignored.
pub fn plan_update(document: &Record, edits: &[LineEdit]) -> (FieldUpdate, u64) {
    let paths = line_paths(document);
    let mut update = FieldUpdate::new();
    let mut count = 0;
    for edit in edits {
        if let Some(path) = paths.get(&edit.uuid) {
            update.push(format!("{path}.text"), edit.text.as_str());
            count += 1;
        }
    }
    (update, count)
}
