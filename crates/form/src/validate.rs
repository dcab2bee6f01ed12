//! Field and form-level validation.
//!
//! Diagnostics are additive and never block editing; only the explicit
//! save/export action calls [`validate_save`] and requires an empty error
//! set. Field-scoped findings carry the field path; cross-field findings
//! (either-or groups, required-language sets, inverted range contracts)
//! surface at the containing section path because they span multiple field
//! paths.

use std::collections::BTreeMap;

use serde_json::Value;

use contract::model::{DefinitionNode, ModelType};
use contract::qualifiers;
use contract::schema::UiSchema;
use contract::ElementPath;

use crate::store::ValueStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum IssueKind {
    RequiredMissing,
    RangeViolation,
    /// Contract-level defect: declared min exceeds declared max.
    RangeContract,
    NotInChoices,
    EitherOr,
    RequiredLanguage,
    TypeMismatch,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ValidationIssue {
    pub path: String,
    pub severity: Severity,
    pub kind: IssueKind,
    pub message: String,
}

impl ValidationIssue {
    fn error(path: &ElementPath, kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            severity: Severity::Error,
            kind,
            message: message.into(),
        }
    }

    fn warning(path: &ElementPath, kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            severity: Severity::Warning,
            kind,
            message: message.into(),
        }
    }
}

/// Empty means null / `""` / `[]` / `{}` / absent.
pub fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(object)) => object.is_empty(),
        Some(_) => false,
    }
}

/// Validate the whole tree for save/export. Returns every finding; the
/// save is permitted iff no `Severity::Error` entry exists.
pub fn validate_save(
    root: &DefinitionNode,
    schema: &UiSchema,
    store: &ValueStore,
) -> Vec<ValidationIssue> {
    let mut walk = Walk {
        store,
        issues: Vec::new(),
        either_or: BTreeMap::new(),
    };
    let root_path = ElementPath::root().join(root.id_short.clone());
    walk.node(root, &root_path, Some(schema));
    walk.finish_groups();
    walk.issues
}

struct Walk<'a> {
    store: &'a ValueStore,
    issues: Vec<ValidationIssue>,
    /// group id → members as (field path, has a non-empty value).
    either_or: BTreeMap<String, Vec<(ElementPath, bool)>>,
}

impl<'a> Walk<'a> {
    fn node(&mut self, node: &DefinitionNode, path: &ElementPath, schema: Option<&UiSchema>) {
        let value = self.store.get(&path.to_string());

        if let Some(group) = qualifiers::either_or_group(node) {
            self.either_or
                .entry(group)
                .or_default()
                .push((path.clone(), !is_empty_value(value)));
        }

        match &node.model_type {
            ModelType::Collection
            | ModelType::Entity
            | ModelType::Operation
            | ModelType::AnnotatedRelationshipElement => {
                for child in &node.children {
                    let child_path = path.join(child.id_short.clone());
                    self.node(child, &child_path, schema.and_then(|s| s.child(&child.id_short)));
                }
                return;
            }
            ModelType::OrderedList => {
                self.required(node, path, value);
                self.list_items(node, path, value, schema);
                return;
            }
            ModelType::MultiLanguageProperty => {
                self.required(node, path, value);
                self.required_languages(node, path, value);
                return;
            }
            ModelType::Range => {
                self.range_members(node, path, value);
                return;
            }
            _ => {}
        }

        self.required(node, path, value);
        self.numeric(node, path, value, schema);
        self.choices(node, path, value, schema);
    }

    /// Check every current item of a repeated structure against the list
    /// prototype. Scalar prototypes read the array slot directly; container
    /// prototypes recurse with item-path value bindings.
    fn list_items(
        &mut self,
        node: &DefinitionNode,
        path: &ElementPath,
        value: Option<&Value>,
        schema: Option<&UiSchema>,
    ) {
        let Some(prototype) = node.children.first() else {
            return;
        };
        let Some(items) = value.and_then(Value::as_array) else {
            return;
        };
        let item_schema = schema.and_then(|s| s.items.as_deref());
        for (index, item) in items.iter().enumerate() {
            let label = schema
                .and_then(|s| s.allowed_id_shorts.get(index))
                .cloned()
                .unwrap_or_else(|| format!("Item{}", index + 1));
            let item_path = path.join(label);
            match &prototype.model_type {
                ModelType::Collection
                | ModelType::Entity
                | ModelType::Operation
                | ModelType::AnnotatedRelationshipElement
                | ModelType::OrderedList => {
                    self.node(prototype, &item_path, item_schema);
                }
                ModelType::MultiLanguageProperty => {
                    self.required(prototype, &item_path, Some(item));
                    self.required_languages(prototype, &item_path, Some(item));
                }
                ModelType::Range => {
                    self.range_members(prototype, &item_path, Some(item));
                }
                _ => {
                    self.required(prototype, &item_path, Some(item));
                    self.numeric(prototype, &item_path, Some(item), item_schema);
                    self.choices(prototype, &item_path, Some(item), item_schema);
                }
            }
        }
    }

    fn required(&mut self, node: &DefinitionNode, path: &ElementPath, value: Option<&Value>) {
        // Either-or members are checked at group level instead; demanding
        // each member individually would make the group unsatisfiable.
        if qualifiers::either_or_group(node).is_some() {
            return;
        }
        if qualifiers::is_required(node) && is_empty_value(value) {
            self.issues.push(ValidationIssue::error(
                path,
                IssueKind::RequiredMissing,
                format!("'{}' is required", node.id_short),
            ));
        }
    }

    fn required_languages(
        &mut self,
        node: &DefinitionNode,
        path: &ElementPath,
        value: Option<&Value>,
    ) {
        let required = qualifiers::required_languages(node);
        if required.is_empty() {
            return;
        }
        let object = value.and_then(Value::as_object);
        let missing: Vec<&str> = required
            .iter()
            .filter(|code| {
                object
                    .and_then(|o| o.get(code.as_str()))
                    .and_then(Value::as_str)
                    .map_or(true, str::is_empty)
            })
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            self.issues.push(ValidationIssue::error(
                &path.parent(),
                IssueKind::RequiredLanguage,
                format!(
                    "'{}' is missing required language(s): {}",
                    node.id_short,
                    missing.join(", ")
                ),
            ));
        }
    }

    fn numeric(
        &mut self,
        node: &DefinitionNode,
        path: &ElementPath,
        value: Option<&Value>,
        schema: Option<&UiSchema>,
    ) {
        let Some(range) = qualifiers::allowed_range(node) else {
            self.type_hint(path, value, schema);
            return;
        };
        if range.is_inverted() {
            // Never clamp; the save is blocked until the contract is fixed.
            self.issues.push(ValidationIssue::error(
                &path.parent(),
                IssueKind::RangeContract,
                format!("'{}': Min cannot exceed max", node.id_short),
            ));
            return;
        }
        if let Some(number) = numeric(value) {
            if !range.contains(number) {
                self.issues.push(ValidationIssue::error(
                    path,
                    IssueKind::RangeViolation,
                    format!("value {number} is outside the allowed range"),
                ));
            }
        }
        self.type_hint(path, value, schema);
    }

    fn range_members(&mut self, node: &DefinitionNode, path: &ElementPath, value: Option<&Value>) {
        self.required(node, path, value);
        let min = numeric(value.and_then(|v| v.get("min")));
        let max = numeric(value.and_then(|v| v.get("max")));
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                self.issues.push(ValidationIssue::error(
                    &path.parent(),
                    IssueKind::RangeContract,
                    format!("'{}': Min cannot exceed max", node.id_short),
                ));
            }
        }
    }

    fn choices(
        &mut self,
        node: &DefinitionNode,
        path: &ElementPath,
        value: Option<&Value>,
        schema: Option<&UiSchema>,
    ) {
        let options = qualifiers::enumerated_choices(node, schema);
        if options.is_empty() {
            return;
        }
        if let Some(current) = value.and_then(Value::as_str).filter(|s| !s.is_empty()) {
            if !options.iter().any(|o| o == current) {
                self.issues.push(ValidationIssue::error(
                    path,
                    IssueKind::NotInChoices,
                    format!("'{current}' is not one of the allowed choices"),
                ));
            }
        }
    }

    /// Non-blocking signal: declared numeric value type but unparseable
    /// content.
    fn type_hint(&mut self, path: &ElementPath, value: Option<&Value>, schema: Option<&UiSchema>) {
        let numeric_type = schema
            .and_then(|s| s.value_type.as_deref())
            .is_some_and(|t| matches!(t, "xs:double" | "xs:float" | "xs:int" | "xs:integer" | "xs:long"));
        if !numeric_type || is_empty_value(value) {
            return;
        }
        if numeric(value).is_none() {
            self.issues.push(ValidationIssue::warning(
                path,
                IssueKind::TypeMismatch,
                "value is not numeric despite the declared value type",
            ));
        }
    }

    fn finish_groups(&mut self) {
        for (group, members) in std::mem::take(&mut self.either_or) {
            let populated = members.iter().filter(|(_, set)| *set).count();
            if populated == 1 {
                continue;
            }
            let section = members
                .first()
                .map(|(path, _)| path.parent())
                .unwrap_or_default();
            self.issues.push(ValidationIssue::error(
                &section,
                IssueKind::EitherOr,
                format!(
                    "exactly one field of group '{group}' must be set ({populated} currently set)"
                ),
            ));
        }
    }
}

fn numeric(value: Option<&Value>) -> Option<f64> {
    match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}
