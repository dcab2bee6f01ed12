//! Classification engine: single-pass, stateless per call.
//!
//! Resolution is layered: a normalized semantic identifier registered in
//! the registry is authoritative; otherwise the lowercased idShort runs
//! through the category pattern lists, first-match-wins across
//! categories. Elements that resolve neither way inherit their grouping's
//! classification, and only then fall into the uncategorized bucket.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::categories::{CATEGORIES, LEGACY_ALIASES, TEMPLATE_CATEGORIES, UNCATEGORIZED};

/// Normalized semantic-id → category-id map, built once from the direct
/// template assignments plus the legacy aliases (resolved through their
/// target template's category).
pub struct SemanticRegistry {
    map: HashMap<String, &'static str>,
}

static BUILT_IN: LazyLock<SemanticRegistry> = LazyLock::new(SemanticRegistry::build);

impl SemanticRegistry {
    pub fn built_in() -> &'static SemanticRegistry {
        &BUILT_IN
    }

    fn build() -> Self {
        let mut map = HashMap::new();
        for (template, category) in TEMPLATE_CATEGORIES {
            map.insert(normalize(template), *category);
        }
        for (alias, target) in LEGACY_ALIASES {
            let target_category = TEMPLATE_CATEGORIES
                .iter()
                .find(|(template, _)| template == target)
                .map(|(_, category)| *category);
            if let Some(category) = target_category {
                map.insert(normalize(alias), category);
            }
        }
        Self { map }
    }

    pub fn category_of(&self, semantic_id: &str) -> Option<&'static str> {
        self.map.get(&normalize(semantic_id)).copied()
    }
}

/// Trim, strip trailing slashes, lowercase.
fn normalize(semantic_id: &str) -> String {
    semantic_id.trim().trim_end_matches('/').to_ascii_lowercase()
}

/// Two-step classification of one `(idShort, semanticId)` pair. A
/// registry hit short-circuits; the pattern scan is first-match-wins
/// across categories (a documented misclassification risk — changing the
/// ranking is a product decision, not a bug fix).
pub fn classify_id(id_short: &str, semantic_id: Option<&str>) -> Option<&'static str> {
    if let Some(semantic_id) = semantic_id {
        if let Some(category) = SemanticRegistry::built_in().category_of(semantic_id) {
            return Some(category);
        }
    }
    let folded = id_short.to_ascii_lowercase();
    CATEGORIES
        .iter()
        .find(|category| category.patterns.iter().any(|p| folded.contains(p)))
        .map(|category| category.id)
}

/// One classified element; produced fresh per pass, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedNode {
    pub submodel_id_short: String,
    pub path: String,
    pub label: String,
    pub value: Value,
    pub semantic_id: Option<String>,
    pub model_type: Option<String>,
    pub category_id: String,
}

/// Classify raw instance data: a list of groupings (submodels), each
/// `{ "idShort": …, "semanticId": …, "submodelElements": [ … ] }`.
/// Returns a category-id-keyed mapping of classified elements.
pub fn classify_submodels(submodels: &[Value]) -> BTreeMap<String, Vec<ClassifiedNode>> {
    let mut buckets: BTreeMap<String, Vec<ClassifiedNode>> = BTreeMap::new();

    for submodel in submodels {
        let id_short = submodel
            .get("idShort")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let semantic_id = submodel.get("semanticId").and_then(Value::as_str);
        // Grouping-level classification, inherited by elements that have
        // none of their own.
        let fallback = classify_id(id_short, semantic_id);

        let Some(elements) = submodel.get("submodelElements").and_then(Value::as_array) else {
            continue;
        };
        for element in elements {
            classify_element(element, id_short, id_short, fallback, &mut buckets);
        }
    }

    buckets
}

fn classify_element(
    element: &Value,
    submodel_id: &str,
    parent_path: &str,
    fallback: Option<&'static str>,
    buckets: &mut BTreeMap<String, Vec<ClassifiedNode>>,
) {
    let id_short = element
        .get("idShort")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let semantic_id = element.get("semanticId").and_then(Value::as_str);
    let path = format!("{parent_path}.{id_short}");

    // Branch elements recurse; their children classify individually but
    // still inherit the grouping fallback. A scalar-valued array is a
    // multi-valued leaf, not a branch.
    if let Some(children) = element.get("value").and_then(Value::as_array) {
        if !children.is_empty() && children.iter().all(Value::is_object) {
            for child in children {
                classify_element(child, submodel_id, &path, fallback, buckets);
            }
            return;
        }
    }

    let category = match classify_id(id_short, semantic_id).or(fallback) {
        Some(category) => category,
        None => {
            debug!(%path, "element resolved to no category");
            UNCATEGORIZED
        }
    };

    buckets.entry(category.to_string()).or_default().push(ClassifiedNode {
        submodel_id_short: submodel_id.to_string(),
        path,
        label: id_short.to_string(),
        value: element.get("value").cloned().unwrap_or(Value::Null),
        semantic_id: semantic_id.map(str::to_string),
        model_type: element
            .get("modelType")
            .and_then(Value::as_str)
            .map(str::to_string),
        category_id: category.to_string(),
    });
}
