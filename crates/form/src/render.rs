//! Recursive renderer/dispatcher over the definition tree.
//!
//! Walks `DefinitionNode`s alongside the `UiSchema` overlay and the live
//! value store, dispatching per element kind into a [`Control`]. The
//! dispatch is total: unknown kinds and unresolved schema fragments become
//! `Unsupported` placeholders carrying their raw diagnostics, and the walk
//! never panics on contract drift.

use std::collections::BTreeMap;

use serde_json::Value;

use contract::model::{order_siblings, DefinitionNode, EntityType, ModelType};
use contract::qualifiers;
use contract::schema::UiSchema;
use contract::ElementPath;

use crate::field::{Control, Diagnostic, ReferenceValue, RenderedField};
use crate::list::{ListWindow, VIRTUALIZE_THRESHOLD};
use crate::store::ValueStore;

/// Capabilities and view state of the surrounding editor session.
#[derive(Debug, Clone)]
pub struct EditorContext {
    /// Upload is only available inside an attached-record session.
    pub attached_record: bool,
    /// Viewport height in rows, for virtualization window math.
    pub viewport_rows: usize,
    /// Scroll offsets (rows) per container path.
    pub scroll: BTreeMap<String, usize>,
}

impl Default for EditorContext {
    fn default() -> Self {
        Self {
            attached_record: false,
            viewport_rows: 24,
            scroll: BTreeMap::new(),
        }
    }
}

impl EditorContext {
    pub fn can_upload(&self) -> bool {
        self.attached_record
    }

    fn scroll_offset(&self, path: &str) -> usize {
        self.scroll.get(path).copied().unwrap_or(0)
    }
}

/// Render a node list under `base_path` against the schema fragment that
/// applies at `base_path`. The single exposed render entry point.
pub fn render_nodes(
    base_path: &ElementPath,
    nodes: &[DefinitionNode],
    schema: &UiSchema,
    store: &ValueStore,
    ctx: &EditorContext,
) -> Vec<RenderedField> {
    order_siblings(nodes)
        .into_iter()
        .map(|node| {
            let path = base_path.join(node.id_short.clone());
            render_node(node, &path, schema.child(&node.id_short), store, ctx)
        })
        .collect()
}

fn render_node(
    node: &DefinitionNode,
    path: &ElementPath,
    schema: Option<&UiSchema>,
    store: &ValueStore,
    ctx: &EditorContext,
) -> RenderedField {
    let mut diagnostics = Vec::new();
    let unresolved = schema.is_some_and(|s| s.unresolved);
    if unresolved {
        let reason = schema
            .and_then(|s| s.reason.as_deref())
            .unwrap_or("structure could not be resolved");
        diagnostics.push(Diagnostic::warning(reason));
    }

    let required = qualifiers::is_required(node);
    let read_only = qualifiers::is_read_only(node);

    // Unresolved nodes are flagged even when read-only; unknown kinds share
    // the same terminal placeholder.
    let control = if unresolved || !node.model_type.is_known() {
        Control::Unsupported {
            raw_model_type: node.model_type.to_string(),
            semantic_id: node.semantic_id.clone(),
        }
    } else if read_only {
        Control::Display {
            value: display_value(store, &path.to_string()),
        }
    } else {
        dispatch(node, path, schema, store, ctx)
    };

    let children = match &control {
        Control::Display { .. } | Control::Unsupported { .. } => Vec::new(),
        _ => container_children(node, path, schema, store, ctx),
    };

    RenderedField {
        path: path.to_string(),
        label: node.id_short.clone(),
        control,
        required,
        read_only,
        diagnostics,
        children,
    }
}

fn dispatch(
    node: &DefinitionNode,
    path: &ElementPath,
    schema: Option<&UiSchema>,
    store: &ValueStore,
    ctx: &EditorContext,
) -> Control {
    let key = path.to_string();
    match &node.model_type {
        ModelType::Property => {
            let choices = qualifiers::enumerated_choices(node, schema);
            if choices.is_empty() {
                Control::Text {
                    value: store.get_str(&key).unwrap_or_default().to_string(),
                    hint: qualifiers::example_value(node).map(str::to_string),
                }
            } else {
                Control::Select {
                    value: store.get_str(&key).map(str::to_string),
                    options: choices,
                }
            }
        }
        ModelType::MultiLanguageProperty => multi_language(node, store, &key),
        ModelType::Range => {
            let value = store.get(&key);
            Control::RangePair {
                min: member_string(value, "min"),
                max: member_string(value, "max"),
            }
        }
        ModelType::File | ModelType::Blob => {
            let value = store.get(&key);
            Control::FileRef {
                content_type: member_string(value, "contentType").unwrap_or_default(),
                value: member_string(value, "value").unwrap_or_default(),
                upload_enabled: ctx.can_upload(),
            }
        }
        ModelType::ReferenceElement => Control::Reference(reference_at(store, &key)),
        ModelType::RelationshipElement | ModelType::AnnotatedRelationshipElement => {
            let value = store.get(&key);
            Control::Relationship {
                first: reference_member(value, "first"),
                second: reference_member(value, "second"),
            }
        }
        ModelType::Entity => {
            let value = store.get(&key);
            Control::EntityHeader {
                entity_type: member_string(value, "entityType")
                    .map(|raw| EntityType::parse(&raw))
                    .unwrap_or_default(),
                global_asset_id: member_string(value, "globalAssetId").unwrap_or_default(),
            }
        }
        ModelType::Collection | ModelType::Operation => Control::Group {
            virtualized: virtualization(node.children.len(), &key, ctx),
        },
        ModelType::OrderedList => Control::Group {
            virtualized: virtualization(crate::list::item_count(store, &key), &key, ctx),
        },
        ModelType::Capability | ModelType::EventSource => Control::Display {
            value: node.semantic_id.clone().unwrap_or_default(),
        },
        // Covered before dispatch; kept so the match stays total.
        ModelType::Unknown(raw) => Control::Unsupported {
            raw_model_type: raw.clone(),
            semantic_id: node.semantic_id.clone(),
        },
    }
}

fn virtualization(count: usize, path: &str, ctx: &EditorContext) -> Option<ListWindow> {
    (count > VIRTUALIZE_THRESHOLD)
        .then(|| ListWindow::compute(count, ctx.scroll_offset(path), ctx.viewport_rows))
}

fn container_children(
    node: &DefinitionNode,
    path: &ElementPath,
    schema: Option<&UiSchema>,
    store: &ValueStore,
    ctx: &EditorContext,
) -> Vec<RenderedField> {
    let render_child = |child: &DefinitionNode| {
        let child_path = path.join(child.id_short.clone());
        let child_schema = schema.and_then(|s| s.child(&child.id_short));
        render_node(child, &child_path, child_schema, store, ctx)
    };
    match &node.model_type {
        // Group kinds claim a window once past the threshold; the realized
        // children must agree with it.
        ModelType::Collection | ModelType::Operation => {
            let ordered = node.ordered_children();
            let realized = match virtualization(ordered.len(), &path.to_string(), ctx) {
                Some(window) => window.realized(),
                None => 0..ordered.len(),
            };
            ordered[realized].iter().copied().map(render_child).collect()
        }
        ModelType::Entity | ModelType::AnnotatedRelationshipElement => node
            .ordered_children()
            .into_iter()
            .map(render_child)
            .collect(),
        ModelType::OrderedList => list_items(node, path, schema, store, ctx),
        _ => Vec::new(),
    }
}

/// List items are realized from the runtime array, using the first
/// definition child as the item prototype. Labels come from the
/// allowed-idShort whitelist when present, positional `Item{n}` otherwise.
/// Above the virtualization threshold only the window is realized; the
/// logical ordering is identical either way.
fn list_items(
    node: &DefinitionNode,
    path: &ElementPath,
    schema: Option<&UiSchema>,
    store: &ValueStore,
    ctx: &EditorContext,
) -> Vec<RenderedField> {
    let Some(prototype) = node.children.first() else {
        return Vec::new();
    };
    let key = path.to_string();
    let count = crate::list::item_count(store, &key);
    let item_schema = schema.and_then(|s| s.items.as_deref());
    let realized = match virtualization(count, &key, ctx) {
        Some(window) => window.realized(),
        None => 0..count,
    };

    realized
        .map(|index| {
            let label = schema
                .and_then(|s| s.allowed_id_shorts.get(index).cloned())
                .unwrap_or_else(|| format!("Item{}", index + 1));
            let item_path = path.join(label.clone());
            let mut rendered = render_item(prototype, &item_path, item_schema, store, ctx, index, &key);
            rendered.label = label;
            rendered
        })
        .collect()
}

fn render_item(
    prototype: &DefinitionNode,
    item_path: &ElementPath,
    item_schema: Option<&UiSchema>,
    store: &ValueStore,
    ctx: &EditorContext,
    index: usize,
    list_key: &str,
) -> RenderedField {
    // Scalar prototypes read straight out of the runtime array; structured
    // prototypes recurse with the item path as their base.
    if prototype.model_type.is_container() {
        return render_node(prototype, item_path, item_schema, store, ctx);
    }
    let value = store
        .get(list_key)
        .and_then(Value::as_array)
        .and_then(|items| items.get(index));
    let mut rendered = render_node(prototype, item_path, item_schema, store, ctx);
    if let Some(item) = value {
        backfill_item_value(&mut rendered.control, item);
    }
    rendered
}

/// Scalar list prototypes read their current value out of the runtime
/// array rather than an item path binding.
fn backfill_item_value(control: &mut Control, item: &Value) {
    match control {
        Control::Text { value, .. } => *value = scalar_string(item),
        Control::Select { value, .. } => {
            *value = item.as_str().map(str::to_string);
        }
        Control::MultiLanguage { required, extra } => {
            let object = item.as_object();
            for (code, text) in required.iter_mut() {
                *text = object
                    .and_then(|o| o.get(code.as_str()))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
            }
            *extra = object
                .map(|o| {
                    o.iter()
                        .filter(|(code, _)| !required.iter().any(|(c, _)| c == *code))
                        .map(|(code, text)| {
                            (code.clone(), text.as_str().unwrap_or_default().to_string())
                        })
                        .collect()
                })
                .unwrap_or_default();
        }
        _ => {}
    }
}

fn multi_language(node: &DefinitionNode, store: &ValueStore, key: &str) -> Control {
    let required_codes = qualifiers::required_languages(node);
    let value = store.get(key).and_then(Value::as_object);

    let required: Vec<(String, String)> = required_codes
        .iter()
        .map(|code| {
            let text = value
                .and_then(|object| object.get(code))
                .and_then(Value::as_str)
                .unwrap_or_default();
            (code.clone(), text.to_string())
        })
        .collect();

    let extra: Vec<(String, String)> = value
        .map(|object| {
            object
                .iter()
                .filter(|(code, _)| !required_codes.contains(*code))
                .map(|(code, text)| {
                    (code.clone(), text.as_str().unwrap_or_default().to_string())
                })
                .collect()
        })
        .unwrap_or_default();

    Control::MultiLanguage { required, extra }
}

/// Set (or add) one language entry in a multi-language value.
pub fn set_language(store: &mut ValueStore, path: &str, code: &str, text: &str) {
    let mut object = store
        .get(path)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    object.insert(code.to_string(), Value::String(text.to_string()));
    store.set(path, Value::Object(object));
}

/// Remove one language entry. Removing a required language is a no-op;
/// required keys can only have their text edited.
pub fn remove_language(node: &DefinitionNode, store: &mut ValueStore, path: &str, code: &str) {
    if qualifiers::required_languages(node).contains(code) {
        return;
    }
    let Some(mut object) = store.get(path).and_then(Value::as_object).cloned() else {
        return;
    };
    if object.remove(code).is_some() {
        store.set(path, Value::Object(object));
    }
}

fn reference_at(store: &ValueStore, key: &str) -> ReferenceValue {
    store
        .get(key)
        .cloned()
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default()
}

fn reference_member(value: Option<&Value>, member: &str) -> ReferenceValue {
    value
        .and_then(|v| v.get(member))
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

fn member_string(value: Option<&Value>, member: &str) -> Option<String> {
    value
        .and_then(|v| v.get(member))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn display_value(store: &ValueStore, key: &str) -> String {
    store.get(key).map(scalar_string).unwrap_or_default()
}

fn scalar_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn property(id: &str) -> DefinitionNode {
        DefinitionNode::new(ModelType::Property, id)
    }

    fn context() -> EditorContext {
        EditorContext::default()
    }

    #[test]
    fn dispatch_is_total_over_unknown_kinds() {
        let mut node = DefinitionNode::new(ModelType::Unknown("Hologram".into()), "X");
        node.semantic_id = Some("urn:example:holo".into());
        let store = ValueStore::new("t", "1");
        let rendered = render_node(&node, &ElementPath::from_slice(&["X"]), None, &store, &context());
        assert_eq!(
            rendered.control,
            Control::Unsupported {
                raw_model_type: "Hologram".into(),
                semantic_id: Some("urn:example:holo".into()),
            }
        );
    }

    #[test]
    fn read_only_short_circuits_to_display() {
        let mut node = property("Serial");
        node.qualifiers.insert("AccessMode".into(), "read-only".into());
        let mut store = ValueStore::new("t", "1");
        store.set("Serial", json!("SN-42"));
        let rendered = render_node(&node, &ElementPath::from_slice(&["Serial"]), None, &store, &context());
        assert!(rendered.read_only);
        assert_eq!(rendered.control, Control::Display { value: "SN-42".into() });
    }

    #[test]
    fn unresolved_wins_over_read_only() {
        let mut node = property("Ghost");
        node.qualifiers.insert("AccessMode".into(), "ReadOnly".into());
        let schema = UiSchema::unresolved("drop-in 'X' not found");
        let store = ValueStore::new("t", "1");
        let rendered = render_node(
            &node,
            &ElementPath::from_slice(&["Ghost"]),
            Some(&schema),
            &store,
            &context(),
        );
        assert!(matches!(rendered.control, Control::Unsupported { .. }));
        assert_eq!(rendered.diagnostics.len(), 1);
    }

    #[test]
    fn enumerated_property_renders_closed_choice() {
        let mut node = property("Protection");
        node.qualifiers.insert("AllowedValues".into(), "IP20,IP54".into());
        let mut store = ValueStore::new("t", "1");
        store.set("Protection", json!("IP54"));
        let rendered = render_node(&node, &ElementPath::from_slice(&["Protection"]), None, &store, &context());
        assert_eq!(
            rendered.control,
            Control::Select {
                value: Some("IP54".into()),
                options: vec!["IP20".into(), "IP54".into()],
            }
        );
    }

    #[test]
    fn multi_language_renders_required_rows_even_when_empty() {
        let mut node = DefinitionNode::new(ModelType::MultiLanguageProperty, "Name");
        node.qualifiers.insert("RequiredLang".into(), "de,en".into());
        let mut store = ValueStore::new("t", "1");
        store.set("Name", json!({ "en": "Pump", "sv": "Pump" }));

        let rendered = render_node(&node, &ElementPath::from_slice(&["Name"]), None, &store, &context());
        let Control::MultiLanguage { required, extra } = rendered.control else {
            panic!("expected multi-language control");
        };
        assert_eq!(required, vec![("de".into(), "".into()), ("en".into(), "Pump".into())]);
        assert_eq!(extra, vec![("sv".to_string(), "Pump".to_string())]);
    }

    #[test]
    fn removing_required_language_is_a_no_op() {
        let mut node = DefinitionNode::new(ModelType::MultiLanguageProperty, "Name");
        node.qualifiers.insert("RequiredLang".into(), "de".into());
        let mut store = ValueStore::new("t", "1");
        store.set("Name", json!({ "de": "Pumpe", "sv": "Pump" }));

        remove_language(&node, &mut store, "Name", "de");
        assert_eq!(store.get("Name"), Some(&json!({ "de": "Pumpe", "sv": "Pump" })));

        remove_language(&node, &mut store, "Name", "sv");
        assert_eq!(store.get("Name"), Some(&json!({ "de": "Pumpe" })));
    }

    #[test]
    fn container_recursion_orders_children() {
        let mut root = DefinitionNode::new(ModelType::Collection, "Root");
        let mut late = property("Alpha");
        late.order = None;
        let mut early = property("Zulu");
        early.order = Some(1);
        root.children = vec![late, early];

        let store = ValueStore::new("t", "1");
        let rendered = render_node(&root, &ElementPath::from_slice(&["Root"]), None, &store, &context());
        let labels: Vec<&str> = rendered.children.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["Zulu", "Alpha"]);
        assert_eq!(rendered.children[0].path, "Root.Zulu");
    }

    #[test]
    fn list_ordering_is_identical_with_and_without_virtualization() {
        let mut list = DefinitionNode::new(ModelType::OrderedList, "Marks");
        list.children = vec![property("Mark")];

        let small: Vec<Value> = (0..5).map(|i| json!(format!("v{i}"))).collect();
        let large: Vec<Value> = (0..30).map(|i| json!(format!("v{i}"))).collect();

        let mut store = ValueStore::new("t", "1");
        let mut ctx = context();
        ctx.viewport_rows = 1000; // realize everything despite windowing

        store.set("Marks", Value::Array(small));
        let direct = render_node(&list, &ElementPath::from_slice(&["Marks"]), None, &store, &ctx);
        assert!(matches!(direct.control, Control::Group { virtualized: None }));
        let direct_labels: Vec<&str> = direct.children.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(&direct_labels[..3], &["Item1", "Item2", "Item3"]);

        store.set("Marks", Value::Array(large));
        let windowed = render_node(&list, &ElementPath::from_slice(&["Marks"]), None, &store, &ctx);
        assert!(matches!(windowed.control, Control::Group { virtualized: Some(_) }));
        let windowed_labels: Vec<&str> = windowed.children.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(&windowed_labels[..5], &["Item1", "Item2", "Item3", "Item4", "Item5"]);
    }

    #[test]
    fn virtualized_list_realizes_only_the_window() {
        let mut list = DefinitionNode::new(ModelType::OrderedList, "Marks");
        list.children = vec![property("Mark")];

        let items: Vec<Value> = (0..100).map(|i| json!(i)).collect();
        let mut store = ValueStore::new("t", "1");
        store.set("Marks", Value::Array(items));

        let ctx = context(); // viewport 24 rows
        let rendered = render_node(&list, &ElementPath::from_slice(&["Marks"]), None, &store, &ctx);
        assert!(rendered.children.len() < 100);
        let Control::Group { virtualized: Some(window) } = rendered.control else {
            panic!("expected a virtualized group");
        };
        assert_eq!(rendered.children.len(), window.realized().len());
    }

    #[test]
    fn virtualized_collection_realizes_only_the_window() {
        let mut root = DefinitionNode::new(ModelType::Collection, "Root");
        root.children = (0..30).map(|i| property(&format!("Field{i:02}"))).collect();

        let store = ValueStore::new("t", "1");
        let rendered = render_node(&root, &ElementPath::from_slice(&["Root"]), None, &store, &context());
        let Control::Group { virtualized: Some(window) } = rendered.control else {
            panic!("expected a virtualized group");
        };
        assert_eq!(rendered.children.len(), window.realized().len());
        assert!(rendered.children.len() < 30);
        assert_eq!(rendered.children[0].label, "Field00");
    }

    #[test]
    fn enumerated_list_items_read_their_array_slot() {
        let mut list = DefinitionNode::new(ModelType::OrderedList, "Marks");
        let mut prototype = property("Mark");
        prototype.qualifiers.insert("AllowedValues".into(), "CE,UKCA".into());
        list.children = vec![prototype];

        let mut store = ValueStore::new("t", "1");
        store.set("Marks", json!(["UKCA"]));

        let rendered = render_node(&list, &ElementPath::from_slice(&["Marks"]), None, &store, &context());
        assert_eq!(
            rendered.children[0].control,
            Control::Select {
                value: Some("UKCA".into()),
                options: vec!["CE".into(), "UKCA".into()],
            }
        );
    }

    #[test]
    fn multi_language_list_items_read_their_array_slot() {
        let mut list = DefinitionNode::new(ModelType::OrderedList, "Statements");
        let mut prototype = DefinitionNode::new(ModelType::MultiLanguageProperty, "Statement");
        prototype.qualifiers.insert("RequiredLang".into(), "de,en".into());
        list.children = vec![prototype];

        let mut store = ValueStore::new("t", "1");
        store.set("Statements", json!([{ "en": "Recyclable", "sv": "Återvinningsbar" }]));

        let rendered = render_node(&list, &ElementPath::from_slice(&["Statements"]), None, &store, &context());
        let Control::MultiLanguage { required, extra } = &rendered.children[0].control else {
            panic!("expected multi-language control");
        };
        assert_eq!(
            required,
            &vec![("de".to_string(), "".to_string()), ("en".to_string(), "Recyclable".to_string())]
        );
        assert_eq!(extra, &vec![("sv".to_string(), "Återvinningsbar".to_string())]);
    }

    #[test]
    fn upload_control_is_gated_by_editor_capability() {
        let node = DefinitionNode::new(ModelType::File, "Manual");
        let store = ValueStore::new("t", "1");

        let detached = render_node(&node, &ElementPath::from_slice(&["Manual"]), None, &store, &context());
        assert!(matches!(
            detached.control,
            Control::FileRef { upload_enabled: false, .. }
        ));

        let mut attached = context();
        attached.attached_record = true;
        let rendered = render_node(&node, &ElementPath::from_slice(&["Manual"]), None, &store, &attached);
        assert!(matches!(
            rendered.control,
            Control::FileRef { upload_enabled: true, .. }
        ));
    }

    #[test]
    fn empty_reference_keys_are_valid() {
        let node = DefinitionNode::new(ModelType::ReferenceElement, "Ref");
        let store = ValueStore::new("t", "1");
        let rendered = render_node(&node, &ElementPath::from_slice(&["Ref"]), None, &store, &context());
        assert_eq!(rendered.control, Control::Reference(ReferenceValue::default()));
    }
}
