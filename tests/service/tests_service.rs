//! [`AppDefinitionService`] end to end.

use modeler::config::DeploymentConfig;
use modeler::model::ModelType;
use modeler::store::{MemoryModelStore, ModelStore};
use modeler::{AppDefinitionService, AppError};
use serde_json::json;

use crate::helpers::*;

fn service(transport: &FakeTransport) -> AppDefinitionService<MemoryModelStore, &FakeTransport> {
    AppDefinitionService::new(MemoryModelStore::new(), transport, DeploymentConfig::default())
}

#[test]
fn test_export_then_import_new_version() {
    init_tracing();
    let transport = FakeTransport::answering(201);
    let service = service(&transport);
    let expense = seed_expense_app(service.store());

    let archive = service.export_portable(&expense.app.id).unwrap();
    let app = service
        .import_new_version(&expense.app.id, archive.as_slice(), "expense.zip", &admin())
        .unwrap();

    assert_eq!(app.id, expense.app.id);
    assert_eq!(app.version, 2);
    assert_eq!(service.store().model_count(), 6);
}

#[test]
fn test_import_new_creates_second_app() {
    let transport = FakeTransport::answering(201);
    let service = service(&transport);
    let expense = seed_expense_app(service.store());

    let archive = service.export_portable(&expense.app.id).unwrap();
    let app = service
        .import_new(archive.as_slice(), "expense.zip", &admin())
        .unwrap();

    assert_ne!(app.id, expense.app.id);
    assert_eq!(service.store().count_of_type(ModelType::App), 2);
}

#[test]
fn test_new_version_target_must_be_an_app() {
    let transport = FakeTransport::answering(201);
    let service = service(&transport);
    let expense = seed_expense_app(service.store());
    let archive = service.export_portable(&expense.app.id).unwrap();

    let err = service
        .import_new_version(&expense.form.id, archive.as_slice(), "expense.zip", &admin())
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert!(err.to_string().contains("not an app definition"));
}

#[test]
fn test_new_version_of_missing_app_is_not_found() {
    let transport = FakeTransport::answering(201);
    let service = service(&transport);
    let err = service
        .import_new_version("missing", &b""[..], "expense.zip", &admin())
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound { .. }));
}

#[test]
fn test_failed_import_rolls_back_every_write() {
    let transport = FakeTransport::answering(201);
    let service = service(&transport);
    let archive = ZipBuilder::new()
        .json("app.json", &json!({"key": "app", "name": "App", "editorJson": {}}))
        .json("form-models/f.json", &json!({"id": "f", "key": "form", "name": "Form",
                                            "editorJson": {}}))
        .json("bpmn-models/p.json", &json!({"id": "p", "key": "process", "name": "Process",
                                            "editorJson": {"childShapes": "broken"}}))
        .build();

    let err = service
        .import_new(archive.as_slice(), "app.zip", &admin())
        .unwrap_err();
    assert!(matches!(err, AppError::Internal { .. }));
    assert_eq!(service.store().model_count(), 0);
}

#[test]
fn test_failed_publish_rolls_back_version() {
    let transport = FakeTransport::answering(503);
    let service = service(&transport);
    let expense = seed_expense_app(service.store());

    let err = service
        .publish(&expense.app.id, "release", &admin())
        .unwrap_err();
    assert!(matches!(err, AppError::Internal { .. }));

    let app = service.store().get_required(&expense.app.id).unwrap();
    assert_eq!(app.version, 1);
    assert!(service.store().history(&app.id).unwrap().is_empty());
}

#[test]
fn test_publish_and_deployable_export() {
    let transport = FakeTransport::answering(201);
    let service = service(&transport);
    let expense = seed_expense_app(service.store());

    let published = service
        .publish(&expense.app.id, "release", &admin())
        .unwrap();
    assert_eq!(published.version, 2);

    let archive = service.export_deployable(&expense.app.id).unwrap();
    assert_eq!(entry_names(&archive), entry_names(&transport.requests()[0].archive));
}
