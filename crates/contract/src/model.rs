//! Core data model of a structural contract: the element kind tag and the
//! definition tree.
//!
//! `DefinitionNode` is intentionally pure / data-centric: it owns its
//! children exclusively (tree by construction, no back-references) and
//! carries the open qualifier map verbatim. All behavior derived from
//! qualifiers lives in [`crate::qualifiers`]; display/validation hints live
//! in the parallel [`crate::schema::UiSchema`] overlay.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Closed variant set of contract element kinds.
///
/// Contract versions evolve; a tag outside the known set parses into
/// `Unknown` (carrying the raw string) instead of failing, so the renderer
/// can degrade to a diagnostic placeholder rather than crash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
pub enum ModelType {
    Property,
    MultiLanguageProperty,
    Range,
    File,
    Blob,
    ReferenceElement,
    RelationshipElement,
    AnnotatedRelationshipElement,
    Entity,
    Collection,
    OrderedList,
    Operation,
    Capability,
    EventSource,
    #[strum(default)]
    Unknown(String),
}

impl ModelType {
    /// Parse a raw wire tag. Never fails; unknown tags become `Unknown`.
    pub fn parse(raw: &str) -> Self {
        // EnumString with a default variant cannot actually error.
        Self::from_str(raw).unwrap_or_else(|_| Self::Unknown(raw.to_string()))
    }

    /// Container kinds recurse into their children during rendering.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            Self::Collection | Self::OrderedList | Self::Entity | Self::AnnotatedRelationshipElement
        )
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl Serialize for ModelType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ModelType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Management mode of an `Entity` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display, strum::EnumString)]
pub enum EntityType {
    #[default]
    SelfManaged,
    CoManaged,
}

impl EntityType {
    pub fn parse(raw: &str) -> Self {
        Self::from_str(raw).unwrap_or_default()
    }
}

/// One element of a structural contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionNode {
    pub model_type: ModelType,
    /// Stable local name, unique among siblings; path segment source.
    pub id_short: String,
    /// Optional globally-unique external identifier.
    pub semantic_id: Option<String>,
    /// Open key→value map (cardinality, access mode, ranges, …).
    pub qualifiers: IndexMap<String, String>,
    /// Optional explicit sort key among siblings.
    pub order: Option<i64>,
    /// Whether list ordering is user-meaningful (enables reorder controls).
    pub order_relevant: bool,
    pub children: Vec<DefinitionNode>,
}

impl DefinitionNode {
    pub fn new(model_type: ModelType, id_short: impl Into<String>) -> Self {
        Self {
            model_type,
            id_short: id_short.into(),
            semantic_id: None,
            qualifiers: IndexMap::new(),
            order: None,
            order_relevant: false,
            children: Vec::new(),
        }
    }

    /// Case-insensitive qualifier lookup.
    pub fn qualifier(&self, key: &str) -> Option<&str> {
        self.qualifiers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn find_child(&self, id_short: &str) -> Option<&DefinitionNode> {
        self.children.iter().find(|c| c.id_short == id_short)
    }

    /// Children in render order: ascending explicit `order` first,
    /// order-less nodes after, case-sensitive lexicographic `id_short`
    /// within the order-less group. Stable across rendering strategies.
    pub fn ordered_children(&self) -> Vec<&DefinitionNode> {
        order_siblings(&self.children)
    }
}

/// Render order over an arbitrary sibling slice; see
/// [`DefinitionNode::ordered_children`].
pub fn order_siblings(nodes: &[DefinitionNode]) -> Vec<&DefinitionNode> {
    let mut out: Vec<&DefinitionNode> = nodes.iter().collect();
    out.sort_by(|a, b| sibling_order(a, b));
    out
}

fn sibling_order(a: &DefinitionNode, b: &DefinitionNode) -> Ordering {
    match (a.order, b.order) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.id_short.cmp(&b.id_short)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.id_short.cmp(&b.id_short),
    }
}

impl fmt::Display for DefinitionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id_short, self.model_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, order: Option<i64>) -> DefinitionNode {
        let mut n = DefinitionNode::new(ModelType::Property, id);
        n.order = order;
        n
    }

    #[test]
    fn unknown_model_type_round_trips_raw_tag() {
        let mt = ModelType::parse("HolographicElement");
        assert_eq!(mt, ModelType::Unknown("HolographicElement".into()));
        assert_eq!(mt.to_string(), "HolographicElement");
        assert!(!mt.is_known());
    }

    #[test]
    fn known_model_type_parses_exactly() {
        assert_eq!(ModelType::parse("MultiLanguageProperty"), ModelType::MultiLanguageProperty);
        assert!(ModelType::Collection.is_container());
        assert!(!ModelType::Property.is_container());
    }

    #[test]
    fn ordered_children_orders_explicit_before_lexicographic() {
        let mut parent = DefinitionNode::new(ModelType::Collection, "Root");
        parent.children = vec![
            node("Zeta", None),
            node("Beta", Some(2)),
            node("Alpha", None),
            node("Gamma", Some(1)),
        ];
        let ids: Vec<&str> = parent
            .ordered_children()
            .iter()
            .map(|n| n.id_short.as_str())
            .collect();
        assert_eq!(ids, vec!["Gamma", "Beta", "Alpha", "Zeta"]);
    }

    #[test]
    fn ordering_is_case_sensitive_for_order_less_nodes() {
        let mut parent = DefinitionNode::new(ModelType::Collection, "Root");
        parent.children = vec![node("alpha", None), node("Beta", None)];
        let ids: Vec<&str> = parent
            .ordered_children()
            .iter()
            .map(|n| n.id_short.as_str())
            .collect();
        // Uppercase sorts before lowercase in a case-sensitive comparison.
        assert_eq!(ids, vec!["Beta", "alpha"]);
    }

    #[test]
    fn qualifier_lookup_is_case_insensitive() {
        let mut n = DefinitionNode::new(ModelType::Property, "Voltage");
        n.qualifiers.insert("Cardinality".into(), "One".into());
        assert_eq!(n.qualifier("cardinality"), Some("One"));
        assert_eq!(n.qualifier("CARDINALITY"), Some("One"));
        assert_eq!(n.qualifier("missing"), None);
    }
}
