//! Deployable layout and export graph walk.

use modeler::archive::{AppGraph, ExportArchiveBuilder};
use modeler::convert::Converters;
use modeler::model::ModelType;
use modeler::store::{MemoryModelStore, ModelStore};
use serde_json::json;

use crate::helpers::*;

#[test]
fn test_deployable_layout() {
    let store = MemoryModelStore::new();
    let expense = seed_expense_app(&store);
    let archive = ExportArchiveBuilder::new(&store, Converters::default())
        .export_deployable(&expense.app.id)
        .unwrap();

    assert_eq!(
        entry_names(&archive),
        vec![
            "expense.app",
            "approveExpense.bpmn",
            "claimCase.cmmn",
            "reviewCase.cmmn",
            "form-expenseForm.form",
            "dmn-limits.dmn",
            "event-expenseSubmitted.event",
            "channel-expenseChannel.channel",
        ]
    );

    let manifest = read_json(&archive, "expense.app");
    assert_eq!(
        manifest,
        json!({"key": "expense", "name": "Expense", "theme": "theme-4",
               "icon": "glyphicon-euro", "usersAccess": "kermit"})
    );

    let bpmn = read_text(&archive, "approveExpense.bpmn");
    assert!(bpmn.contains("flowable:formKey=\"expenseForm\""));
    assert!(bpmn.contains("<flowable:string>limits</flowable:string>"));
    assert!(!bpmn.contains(&expense.form.id));

    let cmmn = read_text(&archive, "claimCase.cmmn");
    assert!(cmmn.contains("caseRef=\"reviewCase\""));
    assert!(cmmn.contains("processRef=\"approveExpense\""));

    let dmn = read_text(&archive, "dmn-limits.dmn");
    assert!(dmn.contains("<decision id=\"limits\" name=\"Limits\">"));

    let channel = read_json(&archive, "channel-expenseChannel.channel");
    assert_eq!(channel["type"], "inbound");
    assert_eq!(channel["channelEventKeyDetection"]["fixedValue"], "expenseSubmitted");
}

#[test]
fn test_export_is_deterministic() {
    let store = MemoryModelStore::new();
    let expense = seed_expense_app(&store);
    let builder = ExportArchiveBuilder::new(&store, Converters::default());

    let first = builder.export_portable(&expense.app.id).unwrap();
    let second = builder.export_portable(&expense.app.id).unwrap();
    assert_eq!(entry_names(&first), entry_names(&second));
    for name in entry_names(&first) {
        assert_eq!(read_entry(&first, &name), read_entry(&second, &name), "{name} differs");
    }
}

#[test]
fn test_stale_relations_do_not_drop_children() {
    let store = MemoryModelStore::new();
    let expense = seed_expense_app(&store);
    for model in store.all_models() {
        store.replace_relations(&model.id, Vec::new()).unwrap();
    }

    let app = store.get_required(&expense.app.id).unwrap();
    let graph = AppGraph::collect(&store, app).unwrap();
    assert_eq!(graph.len(), 5);
    assert_eq!(graph.models_of(ModelType::Form)[0].key, "expenseForm");
    assert_eq!(graph.models_of(ModelType::Cmmn).len(), 2);
}

#[test]
fn test_dangling_references_are_skipped() {
    let store = MemoryModelStore::new();
    let process = create_model(
        &store,
        "lonely",
        "Lonely",
        ModelType::Bpmn,
        json!({"childShapes": [{"resourceId": "t", "stencil": {"id": "UserTask"},
                                "properties": {"formreference": {"id": "deleted-form"}}}]}),
    );
    let app = create_model(
        &store,
        "app",
        "App",
        ModelType::App,
        json!({"models": [{"id": process.id}, {"id": "deleted-process"}]}),
    );

    let archive = ExportArchiveBuilder::new(&store, Converters::default())
        .export_portable(&app.id)
        .unwrap();
    assert_eq!(
        entry_names(&archive),
        vec!["app.json", "bpmn-models/lonely.json", "bpmn-models/lonely.bpmn"]
    );
}

#[test]
fn test_thumbnails_travel_with_models() {
    let store = MemoryModelStore::new();
    let expense = seed_expense_app(&store);
    let form = store.get_required(&expense.form.id).unwrap();
    store
        .save_as_new_version(
            &form.id,
            modeler::model::ModelUpdate {
                thumbnail: Some(b"png".to_vec()),
                ..modeler::model::ModelUpdate::unchanged(&form, "thumbnail")
            },
            &admin(),
        )
        .unwrap();

    let archive = ExportArchiveBuilder::new(&store, Converters::default())
        .export_portable(&expense.app.id)
        .unwrap();
    assert_eq!(read_entry(&archive, "form-models/expenseForm.png"), b"png");
}
