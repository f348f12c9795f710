//! CMMN 1.1 converter.

use super::diagram::{DiagramModel, Shape};
use super::xml::{XmlDocument, sanitize_ncname};
use super::{ConversionError, NativeFormatConverter};
use crate::rewrite::{EditorJson, IdResolved, KeyInfoMap, KeyNormalized, ReferenceKind, ReferenceRewriter};

/// CMMN namespace URIs.
pub mod namespace {
    pub const MODEL: &str = "http://www.omg.org/spec/CMMN/20151109/MODEL";
    pub const FLOWABLE: &str = "http://flowable.org/cmmn";
    pub const TARGET: &str = "http://www.flowable.org/casedef";
}

/// A case model in native form.
#[derive(Clone, Debug, PartialEq)]
pub struct CmmnModel(pub DiagramModel);

/// Editor JSON ↔ [`CmmnModel`] ↔ CMMN XML.
#[derive(Debug, Clone, Copy, Default)]
pub struct CmmnConverter;

impl NativeFormatConverter for CmmnConverter {
    type Native = CmmnModel;

    fn name(&self) -> &'static str {
        "CMMN"
    }

    fn extension(&self) -> &'static str {
        "cmmn"
    }

    fn json_to_native(&self, json: &EditorJson<KeyNormalized>) -> Result<CmmnModel, ConversionError> {
        DiagramModel::parse(json.value(), "case_id", "case").map(CmmnModel)
    }

    fn native_to_json(
        &self,
        native: &CmmnModel,
        keys: &KeyInfoMap,
    ) -> Result<EditorJson<IdResolved>, ConversionError> {
        let normalized = EditorJson::key_normalized(native.0.to_json());
        Ok(ReferenceRewriter.to_id_space(normalized, keys))
    }

    fn native_to_xml(&self, native: &CmmnModel) -> Result<Vec<u8>, ConversionError> {
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

        let case_id = sanitize_ncname(&diagram.id);
        doc.start(
            "case",
            &[("id", Some(case_id.as_str())), ("name", diagram.name.as_deref())],
        )?;
        if let Some(documentation) = &diagram.documentation {
            doc.text_element("documentation", &[], documentation)?;
        }

        // The plan model is usually the single top-level shape; older
        // diagrams put plan items directly under the root.
        match diagram.shapes.as_slice() {
            [plan] if plan.stencil == "CasePlanModel" => {
                let plan_id = sanitize_ncname(plan.element_id());
                doc.start(
                    "casePlanModel",
                    &[("id", Some(plan_id.as_str())), ("name", plan.name.as_deref())],
                )?;
                write_plan_items(&mut doc, &plan.children)?;
                doc.end("casePlanModel")?;
            }
            shapes => {
                doc.start("casePlanModel", &[("id", Some("casePlanModel"))])?;
                write_plan_items(&mut doc, shapes)?;
                doc.end("casePlanModel")?;
            }
        }

        doc.end("case")?;
        doc.end("definitions")?;
        Ok(doc.finish())
    }
}

fn element_name(stencil: &str) -> Option<&'static str> {
    match stencil {
        "HumanTask" => Some("humanTask"),
        "DecisionTask" => Some("decisionTask"),
        "CaseTask" => Some("caseTask"),
        "ProcessTask" => Some("processTask"),
        "ServiceTask" | "SendEventTask" | "ScriptTask" => Some("task"),
        "Stage" | "ExpandedStage" => Some("stage"),
        "Milestone" => Some("milestone"),
        "EventListener" | "GenericEventListener" | "TimerEventListener" => Some("eventListener"),
        "Task" => Some("task"),
        // Sentries, associations and annotations are rendered by the engine
        // from the plan item they decorate.
        _ => None,
    }
}

fn write_plan_items(doc: &mut XmlDocument, shapes: &[Shape]) -> Result<(), ConversionError> {
    for shape in shapes {
        let Some(name) = element_name(&shape.stencil) else {
            tracing::trace!(stencil = %shape.stencil, "skipping non plan item shape");
            continue;
        };
        let id = sanitize_ncname(shape.element_id());
        let plan_item_id = format!("planItem_{id}");
        doc.empty(
            "planItem",
            &[
                ("id", Some(plan_item_id.as_str())),
                ("definitionRef", Some(id.as_str())),
            ],
        )?;

        let attrs = [
            ("id", Some(id.as_str())),
            ("name", shape.name.as_deref()),
            ("flowable:formKey", shape.reference_key(ReferenceKind::Form)),
            ("caseRef", shape.reference_key(ReferenceKind::Case)),
            ("processRef", shape.reference_key(ReferenceKind::Process)),
        ];
        let decision_key = shape.reference_key(ReferenceKind::DecisionTable);
        let has_body = decision_key.is_some() || shape.event.is_some() || !shape.children.is_empty();
        if !has_body {
            doc.empty(name, &attrs)?;
            continue;
        }

        doc.start(name, &attrs)?;
        if let Some(event) = &shape.event {
            doc.start("extensionElements", &[])?;
            doc.text_element("flowable:eventType", &[], &event.event_key)?;
            if let Some(channel) = &event.channel_key {
                doc.text_element("flowable:channelKey", &[], channel)?;
            }
            doc.end("extensionElements")?;
        }
        if let Some(key) = decision_key {
            doc.text_element("decisionRefExpression", &[], key)?;
        }
        write_plan_items(doc, &shape.children)?;
        doc.end(name)?;
    }
    Ok(())
}
