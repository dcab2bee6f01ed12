//! List/collection virtualization and list mutation operations.
//!
//! The window math only feeds scroll-range estimation; correctness never
//! depends on the per-item size constant. Mutations always act on the full
//! underlying array in the store, so realized item identities stay valid.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use contract::schema::{NamingRule, UiSchema};

use crate::store::ValueStore;

/// Item count above which a repeated structure renders windowed.
pub const VIRTUALIZE_THRESHOLD: usize = 20;
/// Estimated rows per item, used only for scroll-range math.
pub const ITEM_HEIGHT_ESTIMATE: usize = 3;
/// Extra items realized beyond the visible range on each side.
pub const OVERSCAN: usize = 4;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ListError {
    #[error("list is at its allowed-idShort ceiling ({0} items)")]
    AtCeiling(usize),
    #[error("reorder requires the orderRelevant flag")]
    ReorderNotAllowed,
    #[error("index {index} out of bounds (len {len})")]
    OutOfBounds { index: usize, len: usize },
}

/// Realized index window over a long list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListWindow {
    /// First realized item index (inclusive).
    pub start: usize,
    /// One past the last realized item index.
    pub end: usize,
    pub total: usize,
    /// Estimated full height in rows, for scroll-range math only.
    pub estimated_height: usize,
}

impl ListWindow {
    /// Compute the realized window for `total` items given a scroll offset
    /// (in rows) and a viewport height (in rows). Degenerate sizes yield
    /// an empty window rather than panicking.
    pub fn compute(total: usize, scroll_offset: usize, viewport_rows: usize) -> Self {
        if total == 0 || viewport_rows == 0 {
            return Self {
                start: 0,
                end: 0,
                total,
                estimated_height: total * ITEM_HEIGHT_ESTIMATE,
            };
        }
        let first_visible = (scroll_offset / ITEM_HEIGHT_ESTIMATE).min(total.saturating_sub(1));
        let visible = viewport_rows.div_ceil(ITEM_HEIGHT_ESTIMATE);
        let start = first_visible.saturating_sub(OVERSCAN);
        let end = (first_visible + visible + OVERSCAN).min(total);
        Self {
            start,
            end,
            total,
            estimated_height: total * ITEM_HEIGHT_ESTIMATE,
        }
    }

    pub fn realized(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

fn array_at<'a>(store: &'a ValueStore, path: &str) -> Option<&'a Vec<Value>> {
    store.get(path).and_then(Value::as_array)
}

pub fn item_count(store: &ValueStore, path: &str) -> usize {
    array_at(store, path).map_or(0, Vec::len)
}

/// Whether `add` is currently available: a non-empty allowed-idShort
/// whitelist doubles as the cardinality ceiling.
pub fn can_add(schema: Option<&UiSchema>, len: usize) -> bool {
    match schema.map(|s| s.allowed_id_shorts.len()) {
        Some(ceiling) if ceiling > 0 => len < ceiling,
        _ => true,
    }
}

/// Label for the item that `add` would append: the next unused whitelist
/// entry, unless the naming rule allows user labels (then the caller's
/// label wins), falling back to positional `Item{n}`.
pub fn next_item_label(schema: Option<&UiSchema>, len: usize, user_label: Option<&str>) -> String {
    if let Some(schema) = schema {
        if schema.naming_rule == NamingRule::UserEditable {
            if let Some(label) = user_label.filter(|l| !l.is_empty()) {
                return label.to_string();
            }
        }
        if let Some(label) = schema.allowed_id_shorts.get(len) {
            return label.clone();
        }
    }
    format!("Item{}", len + 1)
}

/// Append a new item value; returns the label assigned to it.
pub fn add_item(
    store: &mut ValueStore,
    path: &str,
    schema: Option<&UiSchema>,
    value: Value,
    user_label: Option<&str>,
) -> Result<String, ListError> {
    let mut items = array_at(store, path).cloned().unwrap_or_default();
    if !can_add(schema, items.len()) {
        let ceiling = schema.map_or(0, |s| s.allowed_id_shorts.len());
        return Err(ListError::AtCeiling(ceiling));
    }
    let label = next_item_label(schema, items.len(), user_label);
    items.push(value);
    store.set(path, Value::Array(items));
    Ok(label)
}

pub fn remove_item(store: &mut ValueStore, path: &str, index: usize) -> Result<Value, ListError> {
    let mut items = array_at(store, path).cloned().unwrap_or_default();
    if index >= items.len() {
        return Err(ListError::OutOfBounds {
            index,
            len: items.len(),
        });
    }
    let removed = items.remove(index);
    store.set(path, Value::Array(items));
    Ok(removed)
}

/// Swap-move one position up or down. Only exposed when the node carries
/// the `orderRelevant` flag.
pub fn move_item(
    store: &mut ValueStore,
    path: &str,
    order_relevant: bool,
    from: usize,
    to: usize,
) -> Result<(), ListError> {
    if !order_relevant {
        return Err(ListError::ReorderNotAllowed);
    }
    let mut items = array_at(store, path).cloned().unwrap_or_default();
    let len = items.len();
    if from >= len || to >= len {
        return Err(ListError::OutOfBounds {
            index: from.max(to),
            len,
        });
    }
    items.swap(from, to);
    store.set(path, Value::Array(items));
    Ok(())
}
