//! Rendered field representation: the dispatcher's output.
//!
//! Data-centric, UI-toolkit-free. A consumer (TUI, web bridge, test)
//! receives an ordered tree of `RenderedField`s and binds its widgets to
//! the carried paths.

use serde::{Deserialize, Serialize};

use contract::EntityType;

use crate::list::ListWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

/// Inline, non-blocking diagnostic attached to a rendered field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            message: message.into(),
        }
    }
}

/// One `{type, value}` pair inside a reference's ordered key chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceKey {
    #[serde(rename = "type")]
    pub key_type: String,
    pub value: String,
}

/// Editable `{type, keys[]}` reference structure. Empty `keys` is a valid
/// "not yet set" reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceValue {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ref_type: Option<String>,
    #[serde(default)]
    pub keys: Vec<ReferenceKey>,
}

/// Dispatch result per element kind. Total over the closed model-type set;
/// everything else lands in `Unsupported`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Control {
    Text {
        value: String,
        hint: Option<String>,
    },
    /// Closed-choice selector; rendered instead of free text whenever the
    /// choice union is non-empty.
    Select {
        value: Option<String>,
        options: Vec<String>,
    },
    MultiLanguage {
        /// Required language rows, always present (empty text if unset).
        required: Vec<(String, String)>,
        /// Freely addable/removable extra languages.
        extra: Vec<(String, String)>,
    },
    RangePair {
        min: Option<String>,
        max: Option<String>,
    },
    FileRef {
        content_type: String,
        value: String,
        upload_enabled: bool,
    },
    Reference(ReferenceValue),
    Relationship {
        first: ReferenceValue,
        second: ReferenceValue,
    },
    EntityHeader {
        entity_type: EntityType,
        global_asset_id: String,
    },
    Group {
        /// Windowed rendering plan once the item count crosses the
        /// virtualization threshold.
        virtualized: Option<ListWindow>,
    },
    /// Read-only short-circuit: display-only regardless of kind.
    Display {
        value: String,
    },
    /// Terminal placeholder for unknown kinds / unresolved nodes. Carries
    /// raw diagnostics; never crashes the walk.
    Unsupported {
        raw_model_type: String,
        semantic_id: Option<String>,
    },
}

/// One rendered element with its write-back binding at `path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedField {
    pub path: String,
    pub label: String,
    pub control: Control,
    pub required: bool,
    pub read_only: bool,
    pub diagnostics: Vec<Diagnostic>,
    pub children: Vec<RenderedField>,
}

impl RenderedField {
    /// Depth-first child lookup by path.
    pub fn find(&self, path: &str) -> Option<&RenderedField> {
        if self.path == path {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(path))
    }

    /// Flat iteration order of the subtree (self first).
    pub fn flatten<'a>(&'a self, out: &mut Vec<&'a RenderedField>) {
        out.push(self);
        for child in &self.children {
            child.flatten(out);
        }
    }
}
