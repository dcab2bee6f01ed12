//! Sparse display/validation overlay parallel to the definition tree.
//!
//! Kept intentionally lightweight and mutation-free after resolution: the
//! resolver produces one `UiSchema` per contract version and editing
//! sessions treat it as read-only.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Whether list item labels may be edited by the user or are synthesized
/// from the allowed-idShort whitelist / positional `Item{n}` labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NamingRule {
    #[default]
    Auto,
    UserEditable,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiSchema {
    /// Value type hint, e.g. `xs:string`, `xs:double`, `xs:date`.
    pub value_type: Option<String>,
    /// Format hint for rendering (e.g. `uri`, `date`).
    pub format: Option<String>,
    /// Schema-declared enumeration values (closed-choice rendering).
    pub enum_values: Vec<String>,
    /// Set when a referenced sub-structure could not be expanded.
    pub unresolved: bool,
    /// Human-readable reason accompanying `unresolved`.
    pub reason: Option<String>,
    /// Allowed item labels for list children; doubles as cardinality ceiling.
    pub allowed_id_shorts: Vec<String>,
    pub naming_rule: NamingRule,
    /// Nested schema per child path segment (containers).
    pub properties: IndexMap<String, UiSchema>,
    /// Item prototype schema (lists).
    pub items: Option<Box<UiSchema>>,
}

impl UiSchema {
    pub fn unresolved(reason: impl Into<String>) -> Self {
        Self {
            unresolved: true,
            reason: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn child(&self, segment: &str) -> Option<&UiSchema> {
        self.properties.get(segment)
    }

    pub fn has_choices(&self) -> bool {
        !self.enum_values.is_empty()
    }
}
