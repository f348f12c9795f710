//! BPMN 2.0 converter.

use super::diagram::{DiagramModel, Shape};
use super::xml::{XmlDocument, sanitize_ncname};
use super::{ConversionError, NativeFormatConverter};
use crate::rewrite::{EditorJson, IdResolved, KeyInfoMap, KeyNormalized, ReferenceKind, ReferenceRewriter};

/// BPMN namespace URIs.
pub mod namespace {
    pub const MODEL: &str = "http://www.omg.org/spec/BPMN/20100524/MODEL";
    pub const FLOWABLE: &str = "http://flowable.org/bpmn";
    pub const TARGET: &str = "http://www.flowable.org/processdef";
}

/// A process model in native form.
#[derive(Clone, Debug, PartialEq)]
pub struct BpmnModel(pub DiagramModel);

/// Editor JSON ↔ [`BpmnModel`] ↔ BPMN XML.
#[derive(Debug, Clone, Copy, Default)]
pub struct BpmnConverter;

impl NativeFormatConverter for BpmnConverter {
    type Native = BpmnModel;

    fn name(&self) -> &'static str {
        "BPMN"
    }

    fn extension(&self) -> &'static str {
        "bpmn"
    }

    fn json_to_native(&self, json: &EditorJson<KeyNormalized>) -> Result<BpmnModel, ConversionError> {
        DiagramModel::parse(json.value(), "process_id", "process").map(BpmnModel)
    }

    fn native_to_json(
        &self,
        native: &BpmnModel,
        keys: &KeyInfoMap,
    ) -> Result<EditorJson<IdResolved>, ConversionError> {
        let normalized = EditorJson::key_normalized(native.0.to_json());
        Ok(ReferenceRewriter.to_id_space(normalized, keys))
    }

    fn native_to_xml(&self, native: &BpmnModel) -> Result<Vec<u8>, ConversionError> {
        let diagram = &native.0;
        let mut doc = XmlDocument::new()?;
        doc.start(
            "definitions",
            &[
                ("xmlns", Some(namespace::MODEL)),
                ("xmlns:flowable", Some(namespace::FLOWABLE)),
                ("targetNamespace", Some(namespace::TARGET)),
            ],
        )?;

        let process_id = sanitize_ncname(&diagram.id);
        doc.start(
            "process",
            &[
                ("id", Some(process_id.as_str())),
                ("name", diagram.name.as_deref()),
                ("isExecutable", Some("true")),
            ],
        )?;
        if let Some(documentation) = &diagram.documentation {
            doc.text_element("documentation", &[], documentation)?;
        }
        write_shapes(&mut doc, diagram, &diagram.shapes)?;
        doc.end("process")?;
        doc.end("definitions")?;
        Ok(doc.finish())
    }
}

fn element_name(stencil: &str) -> &'static str {
    match stencil {
        "StartNoneEvent" | "StartMessageEvent" | "StartEventRegistryEvent" => "startEvent",
        "EndNoneEvent" | "EndTerminateEvent" | "EndErrorEvent" => "endEvent",
        "UserTask" => "userTask",
        "ServiceTask" | "DecisionTask" | "SendEventTask" => "serviceTask",
        "ScriptTask" => "scriptTask",
        "ExclusiveGateway" => "exclusiveGateway",
        "ParallelGateway" => "parallelGateway",
        "InclusiveGateway" => "inclusiveGateway",
        "EventGateway" => "eventBasedGateway",
        "SubProcess" | "CollapsedSubProcess" => "subProcess",
        "CallActivity" => "callActivity",
        "CatchEventRegistryEvent" | "IntermediateMessageEventCatching" => "intermediateCatchEvent",
        "SequenceFlow" => "sequenceFlow",
        _ => "task",
    }
}

fn is_artifact(stencil: &str) -> bool {
    matches!(stencil, "TextAnnotation" | "Association" | "Pool" | "Lane")
}

fn write_shapes(
    doc: &mut XmlDocument,
    diagram: &DiagramModel,
    shapes: &[Shape],
) -> Result<(), ConversionError> {
    let sources = diagram.flow_sources();
    for shape in shapes {
        if is_artifact(&shape.stencil) {
            tracing::trace!(stencil = %shape.stencil, "skipping artifact shape");
            continue;
        }
        let id = sanitize_ncname(shape.element_id());
        let name = element_name(&shape.stencil);

        if name == "sequenceFlow" {
            let source = sources
                .get(shape.resource_id.as_str())
                .map(|s| sanitize_ncname(s))
                .ok_or_else(|| {
                    ConversionError::invalid_shape(format!(
                        "sequence flow {} has no source",
                        shape.resource_id
                    ))
                })?;
            let target = shape
                .target
                .as_deref()
                .or(shape.outgoing.first().map(String::as_str))
                .and_then(|t| diagram.element_id_of(t))
                .map(sanitize_ncname)
                .ok_or_else(|| {
                    ConversionError::invalid_shape(format!(
                        "sequence flow {} has no target",
                        shape.resource_id
                    ))
                })?;
            let condition = shape.property_str("conditionsequenceflow");
            let attrs = [
                ("id", Some(id.as_str())),
                ("name", shape.name.as_deref()),
                ("sourceRef", Some(source.as_str())),
                ("targetRef", Some(target.as_str())),
            ];
            match condition {
                Some(expression) => {
                    doc.start(name, &attrs)?;
                    doc.text_element("conditionExpression", &[], expression)?;
                    doc.end(name)?;
                }
                None => doc.empty(name, &attrs)?,
            }
            continue;
        }

        let form_key = shape.reference_key(ReferenceKind::Form);
        let decision_key = shape.reference_key(ReferenceKind::DecisionTable);
        let service_type = match shape.stencil.as_str() {
            "DecisionTask" => Some("dmn"),
            "SendEventTask" => Some("send-event"),
            _ => None,
        };
        let event_key = shape.event.as_ref().map(|e| e.event_key.as_str());
        let attrs = [
            ("id", Some(id.as_str())),
            ("name", shape.name.as_deref()),
            ("flowable:formKey", form_key),
            ("flowable:type", service_type),
            ("flowable:assignee", shape.property_str("usertaskassignment")),
            ("calledElement", shape.property_str("callactivitycalledelement")),
        ];

        let has_body = decision_key.is_some() || event_key.is_some() || !shape.children.is_empty();
        if !has_body {
            doc.empty(name, &attrs)?;
            continue;
        }

        doc.start(name, &attrs)?;
        if decision_key.is_some() || event_key.is_some() {
            doc.start("extensionElements", &[])?;
            if let Some(key) = decision_key {
                doc.start(
                    "flowable:field",
                    &[("name", Some("decisionTableReferenceKey"))],
                )?;
                doc.text_element("flowable:string", &[], key)?;
                doc.end("flowable:field")?;
            }
            if let Some(event) = &shape.event {
                doc.text_element("flowable:eventType", &[], &event.event_key)?;
                if let Some(channel) = &event.channel_key {
                    doc.text_element("flowable:channelKey", &[], channel)?;
                }
            }
            doc.end("extensionElements")?;
        }
        write_shapes(doc, diagram, &shape.children)?;
        doc.end(name)?;
    }
    Ok(())
}
