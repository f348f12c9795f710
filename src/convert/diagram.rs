//! Native diagram model shared by the BPMN and CMMN converters.
//!
//! The modeler stores diagrams as stencil-shape JSON:
//!
//! ```text
//! { properties: { process_id | case_id, name, documentation, ... },
//!   childShapes: [ { resourceId, stencil: { id }, properties, outgoing, target, childShapes } ] }
//! ```
//!
//! Parsing lifts the parts the converters care about (ids, names, model
//! references, event-registry bindings) into typed fields and keeps every
//! other field verbatim so re-encoding does not lose layout or unknown
//! properties.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::ConversionError;
use crate::rewrite::ReferenceKind;

/// A diagram decoded from key-normalized editor JSON.
#[derive(Clone, Debug, PartialEq)]
pub struct DiagramModel {
    /// Process or case id.
    pub id: String,
    pub name: Option<String>,
    pub documentation: Option<String>,
    pub shapes: Vec<Shape>,
    /// Root object without `childShapes`.
    raw: Map<String, Value>,
    id_property: &'static str,
}

/// Reference to another model, by key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyReference {
    pub key: Option<String>,
    pub name: Option<String>,
}

/// Event-registry binding declared on a shape.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventBinding {
    pub event_key: String,
    pub event_name: Option<String>,
    pub channel_key: Option<String>,
    pub channel_name: Option<String>,
    pub channel_type: Option<String>,
    pub channel_destination: Option<String>,
    pub correlation_parameters: Vec<EventField>,
    pub payload: Vec<EventField>,
}

/// One named, typed field of an event payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventField {
    pub name: String,
    pub field_type: String,
}

/// One stencil shape.
#[derive(Clone, Debug, PartialEq)]
pub struct Shape {
    pub resource_id: String,
    pub stencil: String,
    pub name: Option<String>,
    pub override_id: Option<String>,
    pub references: BTreeMap<ReferenceKind, KeyReference>,
    pub event: Option<EventBinding>,
    pub outgoing: Vec<String>,
    pub target: Option<String>,
    pub children: Vec<Shape>,
    /// Shape object without `childShapes`.
    raw: Map<String, Value>,
}

impl Shape {
    /// Id used for the element in XML: the user override if set.
    pub fn element_id(&self) -> &str {
        self.override_id.as_deref().unwrap_or(&self.resource_id)
    }

    pub fn reference_key(&self, kind: ReferenceKind) -> Option<&str> {
        self.references.get(&kind)?.key.as_deref()
    }

    /// Read a string property that the typed fields do not cover.
    pub fn property_str(&self, name: &str) -> Option<&str> {
        self.raw
            .get("properties")?
            .get(name)?
            .as_str()
            .filter(|s| !s.is_empty())
    }

    /// This shape and all nested shapes, depth first.
    pub fn walk(&self) -> Vec<&Shape> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.walk());
        }
        out
    }
}

impl DiagramModel {
    /// Decode editor JSON; `id_property` is `process_id` or `case_id`.
    pub fn parse(
        value: &Value,
        id_property: &'static str,
        default_id: &str,
    ) -> Result<Self, ConversionError> {
        let root = value
            .as_object()
            .ok_or_else(|| ConversionError::json("editor JSON must be an object"))?;
        let properties = root.get("properties");
        let text = |field: &str| {
            properties
                .and_then(|p| p.get(field))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let mut raw = root.clone();
        let shapes = parse_children(raw.remove("childShapes"))?;

        Ok(Self {
            id: text(id_property).unwrap_or_else(|| default_id.to_string()),
            name: text("name"),
            documentation: text("documentation"),
            shapes,
            raw,
            id_property,
        })
    }

    /// Encode back into key-normalized editor JSON.
    pub fn to_json(&self) -> Value {
        let mut root = self.raw.clone();
        let properties = root
            .entry("properties")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(props) = properties {
            props.insert(self.id_property.to_string(), Value::String(self.id.clone()));
        }
        root.insert(
            "childShapes".to_string(),
            Value::Array(self.shapes.iter().map(shape_to_json).collect()),
        );
        Value::Object(root)
    }

    /// Every shape in the diagram, depth first.
    pub fn all_shapes(&self) -> Vec<&Shape> {
        self.shapes.iter().flat_map(Shape::walk).collect()
    }

    /// Source element id of every flow, keyed by flow resource id.
    pub fn flow_sources(&self) -> BTreeMap<&str, &str> {
        let mut sources = BTreeMap::new();
        for shape in self.all_shapes() {
            for flow in &shape.outgoing {
                sources.insert(flow.as_str(), shape.element_id());
            }
        }
        sources
    }

    /// Element id for a resource id, honouring overrides.
    pub fn element_id_of(&self, resource_id: &str) -> Option<&str> {
        self.all_shapes()
            .into_iter()
            .find(|s| s.resource_id == resource_id)
            .map(Shape::element_id)
    }
}

fn parse_children(value: Option<Value>) -> Result<Vec<Shape>, ConversionError> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items.iter().map(parse_shape).collect(),
        Some(_) => Err(ConversionError::invalid_shape("childShapes must be an array")),
    }
}

fn parse_shape(value: &Value) -> Result<Shape, ConversionError> {
    let obj = value
        .as_object()
        .ok_or_else(|| ConversionError::invalid_shape("shape must be an object"))?;
    let resource_id = obj
        .get("resourceId")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ConversionError::missing_property("resourceId"))?
        .to_string();
    let stencil = obj
        .get("stencil")
        .and_then(|s| s.get("id"))
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ConversionError::invalid_shape(format!("shape {resource_id} has no stencil id"))
        })?
        .to_string();

    let properties = obj.get("properties").and_then(Value::as_object);
    let text = |field: &str| {
        properties
            .and_then(|p| p.get(field))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let mut references = BTreeMap::new();
    if let Some(props) = properties {
        for kind in ReferenceKind::ALL {
            if let Some(Value::Object(reference)) = props.get(kind.property()) {
                let field = |f: &str| {
                    reference
                        .get(f)
                        .and_then(Value::as_str)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                };
                references.insert(
                    kind,
                    KeyReference {
                        key: field("key"),
                        name: field("name"),
                    },
                );
            }
        }
    }

    let event = text("eventkey").map(|event_key| EventBinding {
        event_key,
        event_name: text("eventname"),
        channel_key: text("channelkey"),
        channel_name: text("channelname"),
        channel_type: text("channeltype"),
        channel_destination: text("channeldestination"),
        correlation_parameters: event_fields(properties, "eventcorrelationparameters"),
        payload: [
            event_fields(properties, "eventinparameters"),
            event_fields(properties, "eventoutparameters"),
        ]
        .concat(),
    });

    let outgoing = obj
        .get("outgoing")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|o| o.get("resourceId").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let target = obj
        .get("target")
        .and_then(|t| t.get("resourceId"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let mut raw = obj.clone();
    let children = parse_children(raw.remove("childShapes"))?;

    Ok(Shape {
        resource_id,
        stencil,
        name: text("name"),
        override_id: text("overrideid"),
        references,
        event,
        outgoing,
        target,
        children,
        raw,
    })
}

fn event_fields(properties: Option<&Map<String, Value>>, field: &str) -> Vec<EventField> {
    let Some(items) = properties
        .and_then(|p| p.get(field))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let name = item.get("eventName").and_then(Value::as_str)?;
            let field_type = item
                .get("eventType")
                .and_then(Value::as_str)
                .unwrap_or("string");
            Some(EventField {
                name: name.to_string(),
                field_type: field_type.to_string(),
            })
        })
        .collect()
}

fn shape_to_json(shape: &Shape) -> Value {
    let mut obj = shape.raw.clone();
    if !shape.references.is_empty() {
        let properties = obj
            .entry("properties")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(props) = properties {
            for (kind, reference) in &shape.references {
                // Fields other than key and name, such as a dangling id, are kept.
                let mut encoded = match props.remove(kind.property()) {
                    Some(Value::Object(existing)) => existing,
                    _ => Map::new(),
                };
                set_or_remove(&mut encoded, "key", reference.key.as_deref());
                set_or_remove(&mut encoded, "name", reference.name.as_deref());
                props.insert(kind.property().to_string(), Value::Object(encoded));
            }
        }
    }
    if !shape.children.is_empty() {
        obj.insert(
            "childShapes".to_string(),
            Value::Array(shape.children.iter().map(shape_to_json).collect()),
        );
    }
    Value::Object(obj)
}

fn set_or_remove(obj: &mut Map<String, Value>, field: &str, value: Option<&str>) {
    match value {
        Some(value) => {
            obj.insert(field.to_string(), Value::String(value.to_string()));
        }
        None => {
            obj.remove(field);
        }
    }
}
