//! Definition resolver: raw structural-contract JSON → definition tree +
//! parallel UI schema.
//!
//! Contract: every node of the input maps to exactly one `DefinitionNode`.
//! Anything that cannot be expanded (missing drop-in, circular reference,
//! unknown element kind, malformed child) degrades that node to an
//! `unresolved` schema fragment with a reason string and keeps going. Only
//! a malformed top-level contract is an error.

use serde_json::Value;
use tracing::warn;

use crate::model::{DefinitionNode, ModelType};
use crate::path::ElementPath;
use crate::schema::{NamingRule, UiSchema};

/// Malformed top-level structural contract. Fatal; the caller surfaces it
/// as a non-retryable editor state.
#[derive(Debug, thiserror::Error)]
pub enum ContractParseError {
    #[error("contract root must be a JSON object")]
    NotAnObject,
    #[error("contract is missing the 'definition' element")]
    MissingDefinition,
    #[error("malformed definition root: {0}")]
    MalformedRoot(String),
}

/// One degraded node in the resolution report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedNode {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct ResolvedContract {
    pub definition: DefinitionNode,
    pub schema: UiSchema,
    pub report: Vec<UnresolvedNode>,
}

/// Resolve a raw contract `{ "definition": …, "dropIns": { … } }`.
///
/// Pure transformation: no I/O, no global state.
pub fn resolve_contract(raw: &Value) -> Result<ResolvedContract, ContractParseError> {
    let root = raw.as_object().ok_or(ContractParseError::NotAnObject)?;
    let definition = root
        .get("definition")
        .ok_or(ContractParseError::MissingDefinition)?;
    let element = definition
        .as_object()
        .ok_or_else(|| ContractParseError::MalformedRoot("definition is not an object".into()))?;
    let id_short = element
        .get("idShort")
        .and_then(Value::as_str)
        .ok_or_else(|| ContractParseError::MalformedRoot("definition root has no idShort".into()))?;
    if element.get("modelType").and_then(Value::as_str).is_none() {
        return Err(ContractParseError::MalformedRoot(
            "definition root has no modelType".into(),
        ));
    }

    let drop_ins = root.get("dropIns").and_then(Value::as_object);
    let mut cx = Resolution {
        drop_ins,
        visiting: Vec::new(),
        report: Vec::new(),
    };
    let (node, schema) = cx.element(definition, id_short, &ElementPath::root().join(id_short));

    Ok(ResolvedContract {
        definition: node,
        schema,
        report: cx.report,
    })
}

struct Resolution<'a> {
    drop_ins: Option<&'a serde_json::Map<String, Value>>,
    /// Drop-in names currently being expanded; a re-encounter is a cycle.
    visiting: Vec<String>,
    report: Vec<UnresolvedNode>,
}

impl<'a> Resolution<'a> {
    fn degrade(&mut self, path: &ElementPath, schema: &mut UiSchema, reason: String) {
        warn!(path = %path, %reason, "contract node degraded to unresolved");
        schema.unresolved = true;
        schema.reason = Some(reason.clone());
        self.report.push(UnresolvedNode {
            path: path.to_string(),
            reason,
        });
    }

    fn element(
        &mut self,
        raw: &Value,
        id_short: &str,
        path: &ElementPath,
    ) -> (DefinitionNode, UiSchema) {
        let Some(obj) = raw.as_object() else {
            let node = DefinitionNode::new(ModelType::Unknown("Malformed".into()), id_short);
            let mut schema = UiSchema::default();
            self.degrade(path, &mut schema, "element is not an object".into());
            return (node, schema);
        };

        // Drop-in indirection: expand against the contract's dropIns table.
        if let Some(target) = obj.get("$dropIn").and_then(Value::as_str) {
            return self.drop_in(obj, target, id_short, path);
        }

        let raw_kind = obj.get("modelType").and_then(Value::as_str).unwrap_or("");
        let model_type = ModelType::parse(raw_kind);

        let mut node = DefinitionNode::new(model_type.clone(), id_short);
        node.semantic_id = obj
            .get("semanticId")
            .and_then(Value::as_str)
            .map(str::to_string);
        node.order = obj.get("order").and_then(Value::as_i64);
        node.order_relevant = obj
            .get("orderRelevant")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        read_qualifiers(obj, &mut node);

        let mut schema = UiSchema {
            value_type: obj.get("valueType").and_then(Value::as_str).map(str::to_string),
            format: obj.get("format").and_then(Value::as_str).map(str::to_string),
            enum_values: string_array(obj.get("enum")),
            allowed_id_shorts: string_array(obj.get("allowedIdShort")),
            naming_rule: match obj.get("namingRule").and_then(Value::as_str) {
                Some("UserEditable") => NamingRule::UserEditable,
                _ => NamingRule::Auto,
            },
            ..UiSchema::default()
        };

        if !model_type.is_known() {
            self.degrade(path, &mut schema, format!("unknown model type '{raw_kind}'"));
        }

        if let Some(children) = obj.get("children").and_then(Value::as_array) {
            self.children(children, &mut node, &mut schema, path);
        }

        (node, schema)
    }

    fn drop_in(
        &mut self,
        obj: &serde_json::Map<String, Value>,
        target: &str,
        id_short: &str,
        path: &ElementPath,
    ) -> (DefinitionNode, UiSchema) {
        // Best-known kind when the reference cannot be expanded.
        let declared = obj
            .get("modelType")
            .and_then(Value::as_str)
            .map(ModelType::parse)
            .unwrap_or(ModelType::Collection);

        if self.visiting.iter().any(|seen| seen == target) {
            let node = DefinitionNode::new(declared, id_short);
            let mut schema = UiSchema::default();
            self.degrade(path, &mut schema, format!("circular drop-in reference '{target}'"));
            return (node, schema);
        }

        let Some(expanded) = self.drop_ins.and_then(|table| table.get(target)) else {
            let node = DefinitionNode::new(declared, id_short);
            let mut schema = UiSchema::default();
            self.degrade(path, &mut schema, format!("drop-in '{target}' not found"));
            return (node, schema);
        };

        self.visiting.push(target.to_string());
        let resolved = self.element(expanded, id_short, path);
        self.visiting.pop();
        resolved
    }

    fn children(
        &mut self,
        children: &[Value],
        node: &mut DefinitionNode,
        schema: &mut UiSchema,
        path: &ElementPath,
    ) {
        for (index, raw_child) in children.iter().enumerate() {
            let declared_id = raw_child
                .as_object()
                .and_then(|o| o.get("idShort"))
                .and_then(Value::as_str);

            let mut child_id = match declared_id {
                Some(id) if !id.is_empty() => id.to_string(),
                _ => format!("Element{}", index + 1),
            };

            // idShort must be unique among siblings; repair and report
            // rather than abort (degradable input never throws).
            if node.find_child(&child_id).is_some() {
                let mut n = 2;
                let base = child_id.clone();
                while node.find_child(&format!("{base}_{n}")).is_some() {
                    n += 1;
                }
                child_id = format!("{base}_{n}");
                self.report.push(UnresolvedNode {
                    path: path.join(&base).to_string(),
                    reason: format!("duplicate sibling idShort '{base}' renamed to '{child_id}'"),
                });
            }

            let child_path = path.join(child_id.clone());
            let (mut child_node, child_schema) = self.element(raw_child, &child_id, &child_path);

            if declared_id.is_none() && !matches!(node.model_type, ModelType::OrderedList) {
                // Lists synthesize Item{n} labels at render time; anywhere
                // else a missing idShort is a degraded contract node.
                let mut repaired = child_schema.clone();
                self.degrade(&child_path, &mut repaired, "element has no idShort".into());
                schema.properties.insert(child_id.clone(), repaired);
                child_node.id_short = child_id;
                node.children.push(child_node);
                continue;
            }

            if matches!(node.model_type, ModelType::OrderedList) && schema.items.is_none() {
                schema.items = Some(Box::new(child_schema.clone()));
            }
            schema.properties.insert(child_id, child_schema);
            node.children.push(child_node);
        }
    }
}

fn read_qualifiers(obj: &serde_json::Map<String, Value>, node: &mut DefinitionNode) {
    match obj.get("qualifiers") {
        // Wire form A: [{ "type": "Cardinality", "value": "One" }, …]
        Some(Value::Array(entries)) => {
            for entry in entries {
                let (Some(key), Some(value)) = (
                    entry.get("type").and_then(Value::as_str),
                    entry.get("value").and_then(Value::as_str),
                ) else {
                    continue;
                };
                node.qualifiers.insert(key.to_string(), value.to_string());
            }
        }
        // Wire form B: { "Cardinality": "One", … }
        Some(Value::Object(map)) => {
            for (key, value) in map {
                if let Some(value) = value.as_str() {
                    node.qualifiers.insert(key.clone(), value.to_string());
                }
            }
        }
        _ => {}
    }
}

fn string_array(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn malformed_top_level_is_fatal() {
        assert!(matches!(
            resolve_contract(&json!([])),
            Err(ContractParseError::NotAnObject)
        ));
        assert!(matches!(
            resolve_contract(&json!({})),
            Err(ContractParseError::MissingDefinition)
        ));
        assert!(matches!(
            resolve_contract(&json!({ "definition": { "modelType": "Collection" } })),
            Err(ContractParseError::MalformedRoot(_))
        ));
    }

    #[test]
    fn missing_drop_in_degrades_instead_of_throwing() {
        let contract = json!({
            "definition": {
                "modelType": "Collection",
                "idShort": "Nameplate",
                "children": [
                    { "idShort": "Contact", "$dropIn": "ContactInformation" }
                ]
            }
        });
        let resolved = resolve_contract(&contract).unwrap();
        let contact = resolved.schema.child("Contact").unwrap();
        assert!(contact.unresolved);
        assert!(contact.reason.as_deref().unwrap().contains("ContactInformation"));
        assert_eq!(resolved.definition.children.len(), 1);
        assert_eq!(resolved.report.len(), 1);
    }

    #[test]
    fn circular_drop_in_is_reported_not_recursed() {
        let contract = json!({
            "definition": {
                "modelType": "Collection",
                "idShort": "Root",
                "children": [ { "idShort": "Loop", "$dropIn": "A" } ]
            },
            "dropIns": {
                "A": {
                    "modelType": "Collection",
                    "idShort": "A",
                    "children": [ { "idShort": "Inner", "$dropIn": "A" } ]
                }
            }
        });
        let resolved = resolve_contract(&contract).unwrap();
        let reason = &resolved.report[0].reason;
        assert!(reason.contains("circular"), "unexpected reason: {reason}");
        // The outer expansion itself succeeded.
        assert_eq!(resolved.definition.children[0].children.len(), 1);
    }

    #[test]
    fn duplicate_sibling_id_shorts_are_repaired_and_reported() {
        let contract = json!({
            "definition": {
                "modelType": "Collection",
                "idShort": "Root",
                "children": [
                    { "idShort": "Phone", "modelType": "Property" },
                    { "idShort": "Phone", "modelType": "Property" }
                ]
            }
        });
        let resolved = resolve_contract(&contract).unwrap();
        let ids: Vec<&str> = resolved
            .definition
            .children
            .iter()
            .map(|c| c.id_short.as_str())
            .collect();
        assert_eq!(ids, vec!["Phone", "Phone_2"]);
        assert!(resolved.report[0].reason.contains("duplicate"));
    }

    #[test]
    fn unknown_model_type_keeps_raw_tag_and_marks_unresolved() {
        let contract = json!({
            "definition": {
                "modelType": "Collection",
                "idShort": "Root",
                "children": [ { "idShort": "X", "modelType": "FancyNewKind" } ]
            }
        });
        let resolved = resolve_contract(&contract).unwrap();
        assert_eq!(
            resolved.definition.children[0].model_type,
            ModelType::Unknown("FancyNewKind".into())
        );
        assert!(resolved.schema.child("X").unwrap().unresolved);
    }

    #[test]
    fn qualifiers_and_hints_flow_into_node_and_schema() {
        let contract = json!({
            "definition": {
                "modelType": "Collection",
                "idShort": "TechnicalData",
                "children": [
                    {
                        "idShort": "Voltage",
                        "modelType": "Property",
                        "valueType": "xs:double",
                        "order": 1,
                        "qualifiers": [
                            { "type": "Cardinality", "value": "One" },
                            { "type": "AllowedMax", "value": "400" }
                        ]
                    },
                    {
                        "idShort": "Markings",
                        "modelType": "OrderedList",
                        "orderRelevant": true,
                        "allowedIdShort": ["CE", "UKCA"],
                        "children": [
                            { "idShort": "Marking", "modelType": "Property", "valueType": "xs:string" }
                        ]
                    }
                ]
            }
        });
        let resolved = resolve_contract(&contract).unwrap();
        let voltage = resolved.definition.find_child("Voltage").unwrap();
        assert_eq!(voltage.qualifier("Cardinality"), Some("One"));
        assert_eq!(voltage.order, Some(1));

        let markings = resolved.definition.find_child("Markings").unwrap();
        assert!(markings.order_relevant);
        let markings_schema = resolved.schema.child("Markings").unwrap();
        assert_eq!(markings_schema.allowed_id_shorts, vec!["CE", "UKCA"]);
        assert!(markings_schema.items.is_some());
        assert!(resolved.report.is_empty());
    }
}
