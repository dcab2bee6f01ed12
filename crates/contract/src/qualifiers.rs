//! Qualifier engine: pure functions deriving behavioral flags from a
//! node's open qualifier map.
//!
//! Key matching is case-insensitive; value normalization is deliberately
//! forgiving (contracts in the wild spell `ReadOnly`, `read-only` and
//! `READONLY` interchangeably).

use std::collections::BTreeSet;
use std::str::FromStr;

use crate::model::DefinitionNode;
use crate::schema::UiSchema;

pub const Q_CARDINALITY: &str = "Cardinality";
pub const Q_ACCESS_MODE: &str = "AccessMode";
pub const Q_ALLOWED_MIN: &str = "AllowedMin";
pub const Q_ALLOWED_MAX: &str = "AllowedMax";
pub const Q_REQUIRED_LANG: &str = "RequiredLang";
pub const Q_EITHER_OR: &str = "EitherOr";
pub const Q_ALLOWED_VALUES: &str = "AllowedValues";
pub const Q_EXAMPLE_VALUE: &str = "ExampleValue";
pub const Q_DOCUMENTATION: &str = "DocumentationUrl";

/// How many values a node requires/allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    ZeroToOne,
    OneToMany,
    ZeroToMany,
}

impl Cardinality {
    pub fn requires_value(self) -> bool {
        matches!(self, Self::One | Self::OneToMany)
    }
}

impl FromStr for Cardinality {
    type Err = ();

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let folded: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match folded.as_str() {
            "one" => Ok(Self::One),
            "zerotoone" => Ok(Self::ZeroToOne),
            "onetomany" => Ok(Self::OneToMany),
            "zerotomany" => Ok(Self::ZeroToMany),
            _ => Err(()),
        }
    }
}

/// Allowed numeric bounds; each side optional.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AllowedRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl AllowedRange {
    /// `min > max` is a contract defect that must block saving
    /// ("Min cannot exceed max"), never be silently clamped.
    pub fn is_inverted(&self) -> bool {
        matches!((self.min, self.max), (Some(lo), Some(hi)) if lo > hi)
    }

    /// Membership check; meaningless (always true) for inverted ranges,
    /// which are rejected separately.
    pub fn contains(&self, value: f64) -> bool {
        if self.is_inverted() {
            return true;
        }
        self.min.is_none_or(|lo| value >= lo) && self.max.is_none_or(|hi| value <= hi)
    }
}

pub fn cardinality(node: &DefinitionNode) -> Option<Cardinality> {
    node.qualifier(Q_CARDINALITY)
        .and_then(|v| Cardinality::from_str(v).ok())
}

/// True iff the cardinality qualifier is `One` or `OneToMany`.
pub fn is_required(node: &DefinitionNode) -> bool {
    cardinality(node).is_some_and(Cardinality::requires_value)
}

/// True iff the access-mode qualifier normalizes to `readonly`
/// (case-insensitive, hyphens/underscores ignored).
pub fn is_read_only(node: &DefinitionNode) -> bool {
    node.qualifier(Q_ACCESS_MODE).is_some_and(|v| {
        let folded: String = v
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        folded == "readonly"
    })
}

pub fn allowed_range(node: &DefinitionNode) -> Option<AllowedRange> {
    let min = node.qualifier(Q_ALLOWED_MIN).and_then(|v| v.trim().parse().ok());
    let max = node.qualifier(Q_ALLOWED_MAX).and_then(|v| v.trim().parse().ok());
    if min.is_none() && max.is_none() {
        return None;
    }
    Some(AllowedRange { min, max })
}

/// Language codes that must always be present as keys in a multi-language
/// value. Required keys can never be removed, only edited.
pub fn required_languages(node: &DefinitionNode) -> BTreeSet<String> {
    node.qualifier(Q_REQUIRED_LANG)
        .map(|v| {
            v.split(',')
                .map(|code| code.trim().to_string())
                .filter(|code| !code.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Either-or group id; across all nodes sharing an id, exactly one must
/// carry a non-empty value at save time (checked at form level).
pub fn either_or_group(node: &DefinitionNode) -> Option<String> {
    node.qualifier(Q_EITHER_OR)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Union of qualifier-declared choices and schema-declared enum values,
/// stable order, deduplicated. Non-empty means closed-choice rendering.
pub fn enumerated_choices(node: &DefinitionNode, schema: Option<&UiSchema>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    if let Some(raw) = node.qualifier(Q_ALLOWED_VALUES) {
        for choice in raw.split(',') {
            let choice = choice.trim();
            if !choice.is_empty() && !out.iter().any(|c| c == choice) {
                out.push(choice.to_string());
            }
        }
    }
    if let Some(schema) = schema {
        for choice in &schema.enum_values {
            if !out.iter().any(|c| c == choice) {
                out.push(choice.clone());
            }
        }
    }
    out
}

pub fn example_value(node: &DefinitionNode) -> Option<&str> {
    node.qualifier(Q_EXAMPLE_VALUE)
}

pub fn documentation_url(node: &DefinitionNode) -> Option<&str> {
    node.qualifier(Q_DOCUMENTATION)
}
