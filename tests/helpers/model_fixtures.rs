//! Model fixtures.
//!
//! The expense app bundles one process and two cases that together reference
//! every kind of model:
//!
//! ```text
//! expense (app)
//! ├── approveExpense (bpmn) ──▶ expenseForm, limits
//! └── claimCase (cmmn) ──▶ reviewCase (cmmn) ──▶ expenseForm
//!                      ├─▶ approveExpense
//!                      └─▶ limits
//! ```

use std::collections::BTreeSet;

use modeler::model::{AppDefinition, AppModelDefinition, Model, ModelType, NewModel, User};
use modeler::rewrite::{EditorJson, ReferenceKind};
use modeler::store::{MemoryModelStore, ModelStore, sync_relations};
use serde_json::{Value, json};

pub fn admin() -> User {
    User::new("admin")
}

pub fn create_model(
    store: &impl ModelStore,
    key: &str,
    name: &str,
    model_type: ModelType,
    editor_json: Value,
) -> Model {
    store
        .create(
            NewModel {
                key: key.to_string(),
                name: name.to_string(),
                description: None,
                model_type,
                editor_json: EditorJson::raw(editor_json).without_references(),
                thumbnail: None,
            },
            &admin(),
        )
        .expect("fixture model should be created")
}

pub fn form_json() -> Value {
    json!({
        "fields": [{"id": "amount", "name": "Amount", "type": "decimal"}],
        "outcomes": [{"name": "Submit"}]
    })
}

pub fn decision_table_json() -> Value {
    json!({
        "key": "limits",
        "name": "Limits",
        "hitIndicator": "FIRST",
        "modelVersion": "3",
        "inputExpressions": [{"id": "in1", "label": "Amount", "variableId": "amount", "type": "number"}],
        "outputExpressions": [{"id": "out1", "label": "Approved", "variableId": "approved", "type": "boolean"}],
        "rules": [{"in1_operator": "<", "in1_expression": "100", "out1": "true"}]
    })
}

pub fn process_json(form: &Model, decision_table: &Model) -> Value {
    json!({
        "resourceId": "canvas",
        "properties": {"process_id": "approveExpense", "name": "Approve expense"},
        "childShapes": [
            {"resourceId": "start", "stencil": {"id": "StartEventRegistryEvent"},
             "properties": {"eventkey": "expenseSubmitted", "channelkey": "expenseChannel"},
             "outgoing": [{"resourceId": "flow1"}]},
            {"resourceId": "review", "stencil": {"id": "UserTask"},
             "properties": {"name": "Review",
                            "formreference": {"id": form.id, "name": form.name, "key": form.key}},
             "outgoing": [{"resourceId": "flow2"}]},
            {"resourceId": "decide", "stencil": {"id": "DecisionTask"},
             "properties": {"decisiontaskdecisiontablereference":
                            {"id": decision_table.id, "name": decision_table.name}}},
            {"resourceId": "flow1", "stencil": {"id": "SequenceFlow"},
             "target": {"resourceId": "review"}},
            {"resourceId": "flow2", "stencil": {"id": "SequenceFlow"},
             "target": {"resourceId": "decide"}}
        ]
    })
}

fn plan(case_id: &str, items: Vec<Value>) -> Value {
    json!({
        "properties": {"case_id": case_id},
        "childShapes": [{
            "resourceId": format!("{case_id}Plan"),
            "stencil": {"id": "CasePlanModel"},
            "childShapes": items
        }]
    })
}

pub struct ExpenseApp {
    pub app: Model,
    pub process: Model,
    pub claim_case: Model,
    pub review_case: Model,
    pub form: Model,
    pub decision_table: Model,
}

/// Create the expense app graph, relations included.
pub fn seed_expense_app(store: &impl ModelStore) -> ExpenseApp {
    let form = create_model(store, "expenseForm", "Expense form", ModelType::Form, form_json());
    let decision_table = create_model(
        store,
        "limits",
        "Limits",
        ModelType::DecisionTable,
        decision_table_json(),
    );
    let process = create_model(
        store,
        "approveExpense",
        "Approve expense",
        ModelType::Bpmn,
        process_json(&form, &decision_table),
    );
    let review_case = create_model(
        store,
        "reviewCase",
        "Review case",
        ModelType::Cmmn,
        plan(
            "reviewCase",
            vec![json!({"resourceId": "check", "stencil": {"id": "HumanTask"},
                        "properties": {"formreference": {"id": form.id, "name": form.name}}})],
        ),
    );
    let claim_case = create_model(
        store,
        "claimCase",
        "Claim case",
        ModelType::Cmmn,
        plan(
            "claimCase",
            vec![
                json!({"resourceId": "nested", "stencil": {"id": "CaseTask"},
                       "properties": {"casetaskcasereference": {"id": review_case.id}}}),
                json!({"resourceId": "approve", "stencil": {"id": "ProcessTask"},
                       "properties": {"processtaskprocessreference": {"id": process.id}}}),
                json!({"resourceId": "assess", "stencil": {"id": "DecisionTask"},
                       "properties": {"decisiontaskdecisiontablereference": {"id": decision_table.id}}}),
            ],
        ),
    );
    for parent in [&process, &review_case, &claim_case] {
        sync_relations(store, parent).expect("relations should sync");
    }

    let definition = AppDefinition {
        key: Some("expense".to_string()),
        name: Some("Expense".to_string()),
        theme: Some("theme-4".to_string()),
        icon: Some("glyphicon-euro".to_string()),
        users_access: Some("kermit".to_string()),
        groups_access: None,
        models: vec![AppModelDefinition::of(&process)],
        cmmn_models: vec![AppModelDefinition::of(&claim_case)],
    };
    let app = create_model(
        store,
        "expense",
        "Expense",
        ModelType::App,
        definition.to_json().expect("app definition should encode"),
    );

    ExpenseApp {
        app,
        process,
        claim_case,
        review_case,
        form,
        decision_table,
    }
}

/// Relations as `(parent key, child key, kind)`, comparable across stores.
pub fn relation_shape(store: &MemoryModelStore) -> BTreeSet<(String, String, ReferenceKind)> {
    let key_of = |id: &str| {
        store
            .get(id)
            .ok()
            .flatten()
            .map(|m| m.key)
            .unwrap_or_else(|| format!("<missing {id}>"))
    };
    store
        .all_relations()
        .into_iter()
        .map(|r| (key_of(&r.parent_model_id), key_of(&r.child_model_id), r.relation_type))
        .collect()
}

/// The single model of `model_type` with `key`.
pub fn only_model(store: &MemoryModelStore, key: &str, model_type: ModelType) -> Model {
    let mut found = store
        .find_by_key_and_type(key, model_type)
        .expect("lookup should succeed");
    assert_eq!(found.len(), 1, "expected exactly one {model_type} keyed {key}");
    found.remove(0)
}
