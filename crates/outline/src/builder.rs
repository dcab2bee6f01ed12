//! Outline builder: one synchronous walk over the grouping definitions,
//! rolling completion and health counts up from the leaves.
//!
//! Counts are inclusive: a node's `errors`/`warnings` cover every signal
//! at or below its dotted path, and `required_total`/`required_completed`
//! cover every required leaf in its subtree. Completion is derived, never
//! stored.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use classify::{classify_id, UNCATEGORIZED};
use contract::model::order_siblings;
use contract::{qualifiers, DefinitionNode, ModelType};

/// Derived three-way completion state. Zero required descendants counts
/// as complete so purely optional sections do not read as unfinished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Completion {
    Complete,
    Partial,
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A field-level validation outcome fed into the rollup, keyed by the
/// field's dotted path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthSignal {
    pub path: String,
    pub severity: Severity,
}

impl HealthSignal {
    pub fn error(path: impl Into<String>) -> Self {
        Self { path: path.into(), severity: Severity::Error }
    }

    pub fn warning(path: impl Into<String>) -> Self {
        Self { path: path.into(), severity: Severity::Warning }
    }
}

/// Deep-link target for a selected outline node. Groupings carry only
/// their grouping id; sections add the dotted path; fields add the leaf
/// idShort as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineTarget {
    pub route: String,
    pub grouping: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_short: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineNode {
    pub label: String,
    pub path: String,
    pub target: OutlineTarget,
    pub required_total: usize,
    pub required_completed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub completion: Completion,
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    /// Depth-first lookup by dotted path.
    pub fn find(&self, path: &str) -> Option<&OutlineNode> {
        if self.path == path {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(path))
    }
}

/// Builds the navigation outline for a set of groupings, bucketed by
/// category. `values` is the flat path-keyed value map; `signals` are the
/// current validation outcomes; `route` is the consumer's editor route
/// the targets should deep-link into.
pub fn build_outline(
    groupings: &[DefinitionNode],
    values: &BTreeMap<String, Value>,
    signals: &[HealthSignal],
    route: &str,
) -> BTreeMap<String, Vec<OutlineNode>> {
    let mut buckets: BTreeMap<String, Vec<OutlineNode>> = BTreeMap::new();
    for grouping in groupings {
        let category = classify_id(&grouping.id_short, grouping.semantic_id.as_deref())
            .unwrap_or(UNCATEGORIZED);
        if category == UNCATEGORIZED {
            debug!(grouping = %grouping.id_short, "grouping not classified");
        }
        let node = grouping_node(grouping, values, signals, route);
        buckets.entry(category.to_string()).or_default().push(node);
    }
    buckets
}

fn grouping_node(
    grouping: &DefinitionNode,
    values: &BTreeMap<String, Value>,
    signals: &[HealthSignal],
    route: &str,
) -> OutlineNode {
    let path = grouping.id_short.clone();
    let children = order_siblings(&grouping.children)
        .into_iter()
        .map(|child| walk(child, &path, &grouping.id_short, values, signals, route))
        .collect();
    let target = OutlineTarget {
        route: route.to_string(),
        grouping: grouping.id_short.clone(),
        path: None,
        id_short: None,
    };
    finish(grouping.id_short.clone(), path, target, children, None, signals)
}

fn walk(
    node: &DefinitionNode,
    parent_path: &str,
    grouping: &str,
    values: &BTreeMap<String, Value>,
    signals: &[HealthSignal],
    route: &str,
) -> OutlineNode {
    let path = format!("{parent_path}.{}", node.id_short);
    // Operations hold their in/out parameters as children and roll up the
    // same way as the container kinds.
    let section = node.model_type.is_container() || node.model_type == ModelType::Operation;
    if section && !node.children.is_empty() {
        let children = order_siblings(&node.children)
            .into_iter()
            .map(|child| walk(child, &path, grouping, values, signals, route))
            .collect();
        let target = OutlineTarget {
            route: route.to_string(),
            grouping: grouping.to_string(),
            path: Some(path.clone()),
            id_short: None,
        };
        finish(node.id_short.clone(), path, target, children, None, signals)
    } else {
        let target = OutlineTarget {
            route: route.to_string(),
            grouping: grouping.to_string(),
            path: Some(path.clone()),
            id_short: Some(node.id_short.clone()),
        };
        let own = if qualifiers::is_required(node) {
            Some(!is_empty_value(values.get(&path)))
        } else {
            None
        };
        finish(node.id_short.clone(), path, target, Vec::new(), own, signals)
    }
}

/// Rolls the child counts together with the node's own requiredness and
/// derives the completion state. `own` is `Some(satisfied)` for required
/// leaves, `None` otherwise.
fn finish(
    label: String,
    path: String,
    target: OutlineTarget,
    children: Vec<OutlineNode>,
    own: Option<bool>,
    signals: &[HealthSignal],
) -> OutlineNode {
    let mut required_total: usize = children.iter().map(|c| c.required_total).sum();
    let mut required_completed: usize = children.iter().map(|c| c.required_completed).sum();
    if let Some(satisfied) = own {
        required_total += 1;
        if satisfied {
            required_completed += 1;
        }
    }
    let mut errors = 0;
    let mut warnings = 0;
    for signal in signals {
        if signal.path == path || signal.path.starts_with(&format!("{path}.")) {
            match signal.severity {
                Severity::Error => errors += 1,
                Severity::Warning => warnings += 1,
            }
        }
    }
    let completion = if required_total == 0 || required_completed == required_total {
        Completion::Complete
    } else if required_completed == 0 {
        Completion::Empty
    } else {
        Completion::Partial
    };
    OutlineNode {
        label,
        path,
        target,
        required_total,
        required_completed,
        errors,
        warnings,
        completion,
        children,
    }
}

/// Missing, null, empty string, empty array, and empty object all count
/// as unanswered.
fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(_) => false,
    }
}
