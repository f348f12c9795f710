//! Hand-built archives, as produced by older exporters or by people.

use modeler::archive::ImportArchivePipeline;
use modeler::convert::Converters;
use modeler::model::{AppDefinition, ModelType};
use modeler::store::{MemoryModelStore, ModelStore};
use serde_json::json;

use crate::helpers::*;

fn expense_archive() -> Vec<u8> {
    ZipBuilder::new()
        .json(
            "expense.json",
            &json!({"id": "a1", "key": "expense", "name": "Expense",
                    "editorJson": {"models": [{"id": "p1", "name": "Approve", "version": 4}],
                                   "theme": "theme-1"}}),
        )
        .json(
            "bpmn-models/p1.json",
            &json!({"id": "p1", "key": "approveExpense", "name": "Approve",
                    "editorJson": {
                        "properties": {"process_id": "approveExpense"},
                        "childShapes": [{
                            "resourceId": "task", "stencil": {"id": "UserTask"},
                            "properties": {"formreference": {"id": "f1", "name": "Expense form"}}
                        }]
                    }}),
        )
        .json(
            "form-models/f1.json",
            &json!({"id": "f1", "key": "expenseForm", "name": "Expense form",
                    "editorJson": {"fields": []}}),
        )
        .bytes("form-models/f1.png", b"\x89PNG thumbnail")
        .bytes("bpmn-models/p1.bpmn", b"<definitions/>")
        .build()
}

#[test]
fn test_expense_scenario() {
    init_tracing();
    let store = MemoryModelStore::new();
    let user = admin();
    let app = ImportArchivePipeline::new(&store, Converters::default(), &user)
        .import_portable(expense_archive().as_slice(), "expense.zip", None)
        .unwrap();

    assert_eq!(app.key, "expense");
    assert_eq!(app.model_type, ModelType::App);

    let form = only_model(&store, "expenseForm", ModelType::Form);
    assert_ne!(form.id, "f1");
    assert_eq!(form.thumbnail.as_deref(), Some(&b"\x89PNG thumbnail"[..]));

    let process = only_model(&store, "approveExpense", ModelType::Bpmn);
    let reference = &process.editor_json["childShapes"][0]["properties"]["formreference"];
    assert_eq!(reference["id"], form.id.as_str());
    assert_eq!(reference["key"], "expenseForm");
    assert_eq!(reference["name"], "Expense form");

    let relations = store.find_relations_by_parent_id(&process.id).unwrap();
    assert_eq!(relations.len(), 1);
    assert_eq!(relations[0].child_model_id, form.id);

    let definition = AppDefinition::from_json(&app.editor_json).unwrap();
    assert_eq!(definition.models[0].id, process.id);
    assert_eq!(definition.models[0].version, 1);
    assert_eq!(store.model_count(), 3);
}

#[test]
fn test_unmatched_app_entries_stay_dangling() {
    let archive = ZipBuilder::new()
        .json(
            "app.json",
            &json!({"key": "app", "name": "App",
                    "editorJson": {"models": [{"id": "gone", "name": "Gone"}]}}),
        )
        .build();
    let store = MemoryModelStore::new();
    let user = admin();
    let app = ImportArchivePipeline::new(&store, Converters::default(), &user)
        .import_portable(archive.as_slice(), "app.zip", None)
        .unwrap();

    let definition = AppDefinition::from_json(&app.editor_json).unwrap();
    assert_eq!(definition.models[0].id, "gone");
    assert_eq!(store.model_count(), 1);
}

#[test]
fn test_obsolete_decision_tables_are_migrated() {
    let archive = ZipBuilder::new()
        .json("app.json", &json!({"key": "app", "name": "App", "editorJson": {}}))
        .json(
            "decision-table-models/d1.json",
            &json!({"id": "d1", "key": "limits", "name": "Limits", "editorJson": {
                "inputExpressions": [{"id": "in1"}],
                "outputExpressions": [{"id": "out1"}],
                "rules": [{"in1": "== 5", "out1": "ok"}]
            }}),
        )
        .build();
    let store = MemoryModelStore::new();
    let user = admin();
    ImportArchivePipeline::new(&store, Converters::default(), &user)
        .import_portable(archive.as_slice(), "app.zip", None)
        .unwrap();

    let table = only_model(&store, "limits", ModelType::DecisionTable);
    assert_eq!(table.editor_json["modelVersion"], "3");
    assert_eq!(table.editor_json["rules"][0]["in1_operator"], "==");
    assert_eq!(table.editor_json["rules"][0]["in1_expression"], "5");
}

#[test]
fn test_references_missing_from_archive_resolve_against_store() {
    let store = MemoryModelStore::new();
    let form = create_model(&store, "sharedForm", "Shared form", ModelType::Form, json!({}));
    let archive = ZipBuilder::new()
        .json("app.json", &json!({"key": "app", "name": "App", "editorJson": {}}))
        .json(
            "bpmn-models/p.json",
            &json!({"id": "p", "key": "process", "name": "Process", "editorJson": {
                "childShapes": [{"resourceId": "t", "stencil": {"id": "UserTask"},
                                 "properties": {"formreference": {"key": "sharedForm"}}}]
            }}),
        )
        .build();
    let user = admin();
    ImportArchivePipeline::new(&store, Converters::default(), &user)
        .import_portable(archive.as_slice(), "app.zip", None)
        .unwrap();

    let process = only_model(&store, "process", ModelType::Bpmn);
    assert_eq!(
        process.editor_json["childShapes"][0]["properties"]["formreference"]["id"],
        form.id.as_str()
    );
}

#[test]
fn test_archives_with_data_descriptors_are_imported() {
    let manifest = json!({"key": "streamed", "name": "Streamed", "editorJson": {}});
    let form = json!({"id": "f1", "key": "streamedForm", "name": "Streamed form",
                      "editorJson": {"fields": []}});
    let archive = data_descriptor_zip(&[
        ("streamed.json", serde_json::to_vec(&manifest).unwrap()),
        ("form-models/f1.json", serde_json::to_vec(&form).unwrap()),
    ]);
    let store = MemoryModelStore::new();
    let user = admin();
    let app = ImportArchivePipeline::new(&store, Converters::default(), &user)
        .import_portable(archive.as_slice(), "streamed.zip", None)
        .unwrap();

    assert_eq!(app.key, "streamed");
    assert_eq!(only_model(&store, "streamedForm", ModelType::Form).name, "Streamed form");
}

#[test]
fn test_reference_without_key_keeps_its_id() {
    let archive = ZipBuilder::new()
        .json("app.json", &json!({"key": "app", "name": "App", "editorJson": {}}))
        .json(
            "bpmn-models/p1.json",
            &json!({"id": "p1", "key": "process", "name": "Process", "editorJson": {
                "childShapes": [{"resourceId": "t", "stencil": {"id": "UserTask"},
                                 "properties": {"formreference": {"id": "gone-form-id"}}}]
            }}),
        )
        .build();
    let store = MemoryModelStore::new();
    let user = admin();
    ImportArchivePipeline::new(&store, Converters::default(), &user)
        .import_portable(archive.as_slice(), "app.zip", None)
        .unwrap();

    let process = only_model(&store, "process", ModelType::Bpmn);
    assert_eq!(
        process.editor_json["childShapes"][0]["properties"]["formreference"],
        json!({"id": "gone-form-id"})
    );
    assert!(store.find_relations_by_parent_id(&process.id).unwrap().is_empty());
}
