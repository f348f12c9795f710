//! Decision table converter and schema migration.
//!
//! Decision table editor JSON (schema version 3):
//!
//! ```json
//! { "key": "limits", "name": "Limits", "hitIndicator": "FIRST", "modelVersion": "3",
//!   "inputExpressions":  [{ "id": "in1", "label": "Amount", "variableId": "amount", "type": "number" }],
//!   "outputExpressions": [{ "id": "out1", "label": "Approved", "variableId": "approved", "type": "boolean" }],
//!   "rules": [{ "in1_operator": "<", "in1_expression": "100", "out1": "true" }] }
//! ```
//!
//! Version 1 kept the operator and expression of an input cell in one string
//! (`"in1": "< 100"`); version 2 used `IS`-prefixed collection operators.
//! [`migrate_decision_table`] upgrades both in place.

use serde_json::{Map, Value};

use super::xml::{XmlDocument, sanitize_ncname};
use super::{ConversionError, NativeFormatConverter};
use crate::rewrite::{EditorJson, IdResolved, KeyInfoMap, KeyNormalized};

/// Current decision table editor schema version.
pub const MODEL_VERSION: &str = "3";

/// DMN namespace URI.
pub const DMN_NAMESPACE: &str = "https://www.omg.org/spec/DMN/20191111/MODEL/";

const HIT_POLICIES: &[&str] = &[
    "UNIQUE",
    "FIRST",
    "PRIORITY",
    "ANY",
    "COLLECT",
    "RULE ORDER",
    "OUTPUT ORDER",
];

/// Comparison operators, longest first so prefixes match greedily.
const CELL_OPERATORS: &[&str] = &[">=", "<=", "!=", "==", "<", ">"];

/// Version 2 collection operators and their version 3 names.
const RENAMED_OPERATORS: &[(&str, &str)] = &[
    ("IS IN", "IN"),
    ("IS NOT IN", "NOT IN"),
    ("IS ANY OF", "ANY OF"),
    ("IS NOT ANY OF", "NONE OF"),
];

#[derive(Clone, Debug, PartialEq)]
pub struct DecisionInput {
    pub id: String,
    pub label: Option<String>,
    pub variable_id: String,
    pub variable_type: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DecisionOutput {
    pub id: String,
    pub label: Option<String>,
    pub variable_id: String,
    pub variable_type: String,
}

/// One input cell: `operator expression`, or `-` for "any".
#[derive(Clone, Debug, PartialEq)]
pub struct InputEntry {
    pub operator: Option<String>,
    pub expression: Option<String>,
}

impl InputEntry {
    fn text(&self) -> String {
        match (&self.operator, &self.expression) {
            (_, None) => "-".to_string(),
            (None, Some(expression)) => expression.clone(),
            (Some(operator), Some(expression)) => format!("{operator} {expression}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DecisionRule {
    pub inputs: Vec<InputEntry>,
    pub outputs: Vec<String>,
}

/// A decision table in native form.
#[derive(Clone, Debug, PartialEq)]
pub struct DecisionTable {
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub hit_policy: String,
    pub collect_operator: Option<String>,
    pub inputs: Vec<DecisionInput>,
    pub outputs: Vec<DecisionOutput>,
    pub rules: Vec<DecisionRule>,
}

/// Editor JSON ↔ [`DecisionTable`] ↔ DMN XML.
#[derive(Debug, Clone, Copy, Default)]
pub struct DmnConverter;

impl NativeFormatConverter for DmnConverter {
    type Native = DecisionTable;

    fn name(&self) -> &'static str {
        "DMN"
    }

    fn extension(&self) -> &'static str {
        "dmn"
    }

    fn json_to_native(
        &self,
        json: &EditorJson<KeyNormalized>,
    ) -> Result<DecisionTable, ConversionError> {
        let root = json
            .value()
            .as_object()
            .ok_or_else(|| ConversionError::json("decision table JSON must be an object"))?;
        let text = |field: &str| {
            root.get(field)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let key = text("key").ok_or_else(|| ConversionError::missing_property("key"))?;
        let hit_policy = text("hitIndicator").unwrap_or_else(|| "FIRST".to_string());
        if !HIT_POLICIES.contains(&hit_policy.as_str()) {
            return Err(ConversionError::invalid_property(format!(
                "unknown hit indicator {hit_policy}"
            )));
        }

        let inputs = expressions(root, "inputExpressions")?
            .into_iter()
            .map(|(id, label, variable_id, variable_type)| DecisionInput {
                id,
                label,
                variable_id,
                variable_type,
            })
            .collect::<Vec<_>>();
        let outputs = expressions(root, "outputExpressions")?
            .into_iter()
            .map(|(id, label, variable_id, variable_type)| DecisionOutput {
                id,
                label,
                variable_id,
                variable_type,
            })
            .collect::<Vec<_>>();
        if outputs.is_empty() {
            return Err(ConversionError::invalid_property(format!(
                "decision table {key} has no output expressions"
            )));
        }

        let rules = match root.get("rules") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(rules)) => rules
                .iter()
                .enumerate()
                .map(|(index, rule)| parse_rule(index, rule, &inputs, &outputs))
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(ConversionError::invalid_property("rules must be an array")),
        };

        Ok(DecisionTable {
            name: text("name").unwrap_or_else(|| key.clone()),
            key,
            description: text("description"),
            hit_policy,
            collect_operator: text("collectOperator"),
            inputs,
            outputs,
            rules,
        })
    }

    fn native_to_json(
        &self,
        native: &DecisionTable,
        _keys: &KeyInfoMap,
    ) -> Result<EditorJson<IdResolved>, ConversionError> {
        let mut root = Map::new();
        root.insert("key".into(), native.key.clone().into());
        root.insert("name".into(), native.name.clone().into());
        if let Some(description) = &native.description {
            root.insert("description".into(), description.clone().into());
        }
        root.insert("hitIndicator".into(), native.hit_policy.clone().into());
        if let Some(collect) = &native.collect_operator {
            root.insert("collectOperator".into(), collect.clone().into());
        }
        root.insert("modelVersion".into(), MODEL_VERSION.into());
        root.insert(
            "inputExpressions".into(),
            native
                .inputs
                .iter()
                .map(|i| expression_json(&i.id, &i.label, &i.variable_id, &i.variable_type))
                .collect::<Vec<_>>()
                .into(),
        );
        root.insert(
            "outputExpressions".into(),
            native
                .outputs
                .iter()
                .map(|o| expression_json(&o.id, &o.label, &o.variable_id, &o.variable_type))
                .collect::<Vec<_>>()
                .into(),
        );

        let rules = native
            .rules
            .iter()
            .map(|rule| {
                let mut cells = Map::new();
                for (input, entry) in native.inputs.iter().zip(&rule.inputs) {
                    cells.insert(
                        format!("{}_operator", input.id),
                        entry.operator.clone().unwrap_or_default().into(),
                    );
                    cells.insert(
                        format!("{}_expression", input.id),
                        entry.expression.clone().unwrap_or_else(|| "-".into()).into(),
                    );
                }
                for (output, value) in native.outputs.iter().zip(&rule.outputs) {
                    cells.insert(output.id.clone(), value.clone().into());
                }
                Value::Object(cells)
            })
            .collect::<Vec<_>>();
        root.insert("rules".into(), rules.into());

        // Decision tables never reference other models.
        Ok(EditorJson::raw(Value::Object(root)).without_references())
    }

    fn native_to_xml(&self, native: &DecisionTable) -> Result<Vec<u8>, ConversionError> {
        let id = sanitize_ncname(&native.key);
        let definitions_id = format!("definition_{id}");
        let table_id = format!("decisionTable_{id}");

        let mut doc = XmlDocument::new()?;
        doc.start(
            "definitions",
            &[
                ("xmlns", Some(DMN_NAMESPACE)),
                ("id", Some(definitions_id.as_str())),
                ("name", Some(native.name.as_str())),
                ("namespace", Some("http://www.flowable.org/dmn")),
            ],
        )?;
        doc.start(
            "decision",
            &[("id", Some(id.as_str())), ("name", Some(native.name.as_str()))],
        )?;
        if let Some(description) = &native.description {
            doc.text_element("description", &[], description)?;
        }
        doc.start(
            "decisionTable",
            &[
                ("id", Some(table_id.as_str())),
                ("hitPolicy", Some(native.hit_policy.as_str())),
                ("aggregation", native.collect_operator.as_deref()),
            ],
        )?;

        for input in &native.inputs {
            let input_id = sanitize_ncname(&input.id);
            let expression_id = format!("inputExpression_{input_id}");
            doc.start(
                "input",
                &[("id", Some(input_id.as_str())), ("label", input.label.as_deref())],
            )?;
            doc.start(
                "inputExpression",
                &[
                    ("id", Some(expression_id.as_str())),
                    ("typeRef", Some(input.variable_type.as_str())),
                ],
            )?;
            doc.text_element("text", &[], &input.variable_id)?;
            doc.end("inputExpression")?;
            doc.end("input")?;
        }
        for output in &native.outputs {
            let output_id = sanitize_ncname(&output.id);
            doc.empty(
                "output",
                &[
                    ("id", Some(output_id.as_str())),
                    ("label", output.label.as_deref()),
                    ("name", Some(output.variable_id.as_str())),
                    ("typeRef", Some(output.variable_type.as_str())),
                ],
            )?;
        }

        for (index, rule) in native.rules.iter().enumerate() {
            let rule_id = format!("rule{}", index + 1);
            doc.start("rule", &[("id", Some(rule_id.as_str()))])?;
            for (column, entry) in rule.inputs.iter().enumerate() {
                let entry_id = format!("inputEntry_{}_{}", index + 1, column + 1);
                doc.start("inputEntry", &[("id", Some(entry_id.as_str()))])?;
                doc.text_element("text", &[], &entry.text())?;
                doc.end("inputEntry")?;
            }
            for (column, value) in rule.outputs.iter().enumerate() {
                let entry_id = format!("outputEntry_{}_{}", index + 1, column + 1);
                doc.start("outputEntry", &[("id", Some(entry_id.as_str()))])?;
                doc.text_element("text", &[], value)?;
                doc.end("outputEntry")?;
            }
            doc.end("rule")?;
        }

        doc.end("decisionTable")?;
        doc.end("decision")?;
        doc.end("definitions")?;
        Ok(doc.finish())
    }
}

type Expression = (String, Option<String>, String, String);

fn expressions(root: &Map<String, Value>, field: &str) -> Result<Vec<Expression>, ConversionError> {
    let items = match root.get(field) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(ConversionError::invalid_property(format!(
                "{field} must be an array"
            )));
        }
    };
    items
        .iter()
        .map(|item| {
            let id = item
                .get("id")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| ConversionError::missing_property(format!("{field}[].id")))?;
            let text = |f: &str| item.get(f).and_then(Value::as_str).map(str::to_string);
            Ok((
                id.to_string(),
                text("label"),
                text("variableId").unwrap_or_else(|| id.to_string()),
                text("type").unwrap_or_else(|| "string".to_string()),
            ))
        })
        .collect()
}

fn expression_json(id: &str, label: &Option<String>, variable_id: &str, variable_type: &str) -> Value {
    let mut obj = Map::new();
    obj.insert("id".into(), id.into());
    if let Some(label) = label {
        obj.insert("label".into(), label.clone().into());
    }
    obj.insert("variableId".into(), variable_id.into());
    obj.insert("type".into(), variable_type.into());
    Value::Object(obj)
}

fn cell_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() && s != "-" => Some(s.clone()),
        Value::String(_) | Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn parse_rule(
    index: usize,
    rule: &Value,
    inputs: &[DecisionInput],
    outputs: &[DecisionOutput],
) -> Result<DecisionRule, ConversionError> {
    let cells = rule.as_object().ok_or_else(|| {
        ConversionError::invalid_property(format!("rule {} must be an object", index + 1))
    })?;
    let inputs = inputs
        .iter()
        .map(|input| InputEntry {
            operator: cell_text(cells.get(&format!("{}_operator", input.id))),
            expression: cell_text(cells.get(&format!("{}_expression", input.id))),
        })
        .collect();
    let outputs = outputs
        .iter()
        .map(|output| cell_text(cells.get(&output.id)).unwrap_or_default())
        .collect();
    Ok(DecisionRule { inputs, outputs })
}

// ============================================================================
// SCHEMA MIGRATION
// ============================================================================

/// Upgrade decision table editor JSON to [`MODEL_VERSION`] in place.
///
/// Returns whether anything changed. Applying it twice is a no-op.
pub fn migrate_decision_table(value: &mut Value) -> bool {
    let Some(root) = value.as_object_mut() else {
        return false;
    };
    let version = match root.get("modelVersion") {
        Some(Value::String(v)) => v.parse::<u64>().unwrap_or(1),
        Some(Value::Number(n)) => n.as_u64().unwrap_or(1),
        _ => 1,
    };
    if version >= 3 {
        return false;
    }

    let input_ids: Vec<String> = root
        .get("inputExpressions")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|i| i.get("id").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    if let Some(Value::Array(rules)) = root.get_mut("rules") {
        for rule in rules.iter_mut().filter_map(Value::as_object_mut) {
            for id in &input_ids {
                if version < 2 {
                    split_v1_cell(rule, id);
                }
                rename_v2_operator(rule, id);
            }
        }
    }

    root.insert("modelVersion".into(), MODEL_VERSION.into());
    tracing::debug!(from = version, to = MODEL_VERSION, "migrated decision table schema");
    true
}

fn split_v1_cell(rule: &mut Map<String, Value>, input_id: &str) {
    let operator_field = format!("{input_id}_operator");
    if rule.contains_key(&operator_field) {
        return;
    }
    let Some(cell) = rule.remove(input_id) else {
        return;
    };
    let cell = match cell {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    };

    let (operator, expression) = if cell.is_empty() || cell == "-" {
        (String::new(), "-".to_string())
    } else {
        match CELL_OPERATORS.iter().find(|op| cell.starts_with(**op)) {
            Some(op) => (op.to_string(), cell[op.len()..].trim().to_string()),
            None => ("==".to_string(), cell),
        }
    };
    rule.insert(operator_field, operator.into());
    rule.insert(format!("{input_id}_expression"), expression.into());
}

fn rename_v2_operator(rule: &mut Map<String, Value>, input_id: &str) {
    let Some(Value::String(operator)) = rule.get_mut(&format!("{input_id}_operator")) else {
        return;
    };
    if let Some((_, renamed)) = RENAMED_OPERATORS.iter().find(|(old, _)| old == operator) {
        *operator = renamed.to_string();
    }
}
