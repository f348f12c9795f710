//! Importing into an existing app merges by key.

use modeler::archive::{ExportArchiveBuilder, ImportArchivePipeline};
use modeler::convert::Converters;
use modeler::model::ModelType;
use modeler::store::{MemoryModelStore, ModelStore};
use serde_json::json;

use crate::helpers::*;

#[test]
fn test_reimport_into_same_app_creates_no_duplicates() {
    let store = MemoryModelStore::new();
    let expense = seed_expense_app(&store);
    let archive = ExportArchiveBuilder::new(&store, Converters::default())
        .export_portable(&expense.app.id)
        .unwrap();
    let before = store.model_count();
    let user = admin();
    let pipeline = ImportArchivePipeline::new(&store, Converters::default(), &user);

    let first = pipeline
        .import_portable(archive.as_slice(), "expense.zip", Some(&expense.app))
        .unwrap();
    let second = pipeline
        .import_portable(archive.as_slice(), "expense.zip", Some(&first))
        .unwrap();

    assert_eq!(store.model_count(), before);
    assert_eq!(first.id, expense.app.id);
    assert_eq!(second.version, 3);

    let form = only_model(&store, "expenseForm", ModelType::Form);
    assert_eq!(form.id, expense.form.id);
    assert_eq!(form.version, 3);
    assert_eq!(store.history(&form.id).unwrap().len(), 2);

    let process = only_model(&store, "approveExpense", ModelType::Bpmn);
    assert_eq!(process.id, expense.process.id);
    assert_eq!(process.version, 3);
    assert_eq!(
        process.editor_json["childShapes"][1]["properties"]["formreference"]["id"],
        expense.form.id.as_str()
    );
}

#[test]
fn test_reimport_keeps_relation_shape() {
    let store = MemoryModelStore::new();
    let expense = seed_expense_app(&store);
    let shape = relation_shape(&store);
    let archive = ExportArchiveBuilder::new(&store, Converters::default())
        .export_portable(&expense.app.id)
        .unwrap();
    let user = admin();

    ImportArchivePipeline::new(&store, Converters::default(), &user)
        .import_portable(archive.as_slice(), "expense.zip", Some(&expense.app))
        .unwrap();

    assert_eq!(relation_shape(&store), shape);
    assert_eq!(store.all_relations().len(), shape.len());
}

#[test]
fn test_merge_into_other_store_matches_by_key() {
    let source = MemoryModelStore::new();
    let expense = seed_expense_app(&source);
    let archive = ExportArchiveBuilder::new(&source, Converters::default())
        .export_portable(&expense.app.id)
        .unwrap();

    let target = MemoryModelStore::new();
    let existing_form = create_model(&target, "expenseForm", "Old form", ModelType::Form, json!({}));
    let existing_app = create_model(&target, "expense", "Expense", ModelType::App, json!({}));
    let user = admin();

    let app = ImportArchivePipeline::new(&target, Converters::default(), &user)
        .import_portable(archive.as_slice(), "expense.zip", Some(&existing_app))
        .unwrap();

    assert_eq!(app.id, existing_app.id);
    assert_eq!(app.version, 2);
    let form = only_model(&target, "expenseForm", ModelType::Form);
    assert_eq!(form.id, existing_form.id);
    assert_eq!(form.name, "Expense form");
    assert_eq!(form.version, 2);
    assert_eq!(target.count_of_type(ModelType::Cmmn), 2);
}

#[test]
fn test_import_without_existing_app_never_merges() {
    let store = MemoryModelStore::new();
    let expense = seed_expense_app(&store);
    let archive = ExportArchiveBuilder::new(&store, Converters::default())
        .export_portable(&expense.app.id)
        .unwrap();
    let user = admin();

    ImportArchivePipeline::new(&store, Converters::default(), &user)
        .import_portable(archive.as_slice(), "expense.zip", None)
        .unwrap();

    assert_eq!(store.count_of_type(ModelType::Form), 2);
    assert_eq!(store.count_of_type(ModelType::App), 2);
}
