//! Cross-model reference rewriting inside editor JSON.
//!
//! Process and case models reference forms, decision tables and other
//! diagrams through small reference objects embedded anywhere in their editor
//! JSON tree:
//!
//! ```json
//! { "stencil": { "id": "UserTask" },
//!   "properties": { "formreference": { "id": "f1", "name": "Expense", "key": "expenseForm" } } }
//! ```
//!
//! Store ids are meaningless in another store, so content moves through three
//! states on its way between stores:
//!
//! ```text
//! Raw ──to_key_space──▶ KeyNormalized ──to_id_space──▶ IdResolved
//! {id: "f1"}            {key: "expenseForm"}           {id: <new id>, key, name}
//! ```
//!
//! [`EditorJson`] carries the state as a type parameter. The model store only
//! accepts `EditorJson<IdResolved>`, so key-normalized content can never be
//! persisted.

use std::collections::HashMap;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::{ModelInfo, ModelType};

// ============================================================================
// REFERENCE KINDS
// ============================================================================

/// The kinds of cross-model reference an editor JSON document can embed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceKind {
    Form,
    DecisionTable,
    Case,
    Process,
}

impl ReferenceKind {
    pub const ALL: [ReferenceKind; 4] = [
        ReferenceKind::Form,
        ReferenceKind::DecisionTable,
        ReferenceKind::Case,
        ReferenceKind::Process,
    ];

    /// Shape property holding a reference of this kind.
    pub fn property(&self) -> &'static str {
        match self {
            ReferenceKind::Form => "formreference",
            ReferenceKind::DecisionTable => "decisiontaskdecisiontablereference",
            ReferenceKind::Case => "casetaskcasereference",
            ReferenceKind::Process => "processtaskprocessreference",
        }
    }

    pub fn from_property(property: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.property() == property)
    }

    /// Model type a reference of this kind points at.
    pub fn target_type(&self) -> ModelType {
        match self {
            ReferenceKind::Form => ModelType::Form,
            ReferenceKind::DecisionTable => ModelType::DecisionTable,
            ReferenceKind::Case => ModelType::Cmmn,
            ReferenceKind::Process => ModelType::Bpmn,
        }
    }

    /// Reference kind used to point at a model of `model_type`.
    pub fn for_target(model_type: ModelType) -> Option<Self> {
        match model_type {
            ModelType::Form => Some(ReferenceKind::Form),
            ModelType::DecisionTable => Some(ReferenceKind::DecisionTable),
            ModelType::Cmmn => Some(ReferenceKind::Case),
            ModelType::Bpmn => Some(ReferenceKind::Process),
            ModelType::App => None,
        }
    }
}

// ============================================================================
// REWRITE STATES
// ============================================================================

mod sealed {
    pub trait Sealed {}
}

/// Marker trait for the states of [`EditorJson`].
pub trait RewriteState: sealed::Sealed {}

/// References use the ids of whichever store produced the content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Raw;

/// References carry keys only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyNormalized;

/// References use ids of the destination store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdResolved;

impl sealed::Sealed for Raw {}
impl sealed::Sealed for KeyNormalized {}
impl sealed::Sealed for IdResolved {}
impl RewriteState for Raw {}
impl RewriteState for KeyNormalized {}
impl RewriteState for IdResolved {}

/// Editor JSON tagged with the identity space its references live in.
#[derive(Clone, Debug, PartialEq)]
pub struct EditorJson<S: RewriteState> {
    value: Value,
    state: PhantomData<S>,
}

impl<S: RewriteState> EditorJson<S> {
    fn with_state(value: Value) -> Self {
        Self {
            value,
            state: PhantomData,
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

impl EditorJson<Raw> {
    /// Content read from an archive or another store.
    pub fn raw(value: Value) -> Self {
        Self::with_state(value)
    }

    /// Accept content whose type never embeds model references
    /// (forms, decision tables, app definitions) as resolved.
    pub fn without_references(self) -> EditorJson<IdResolved> {
        EditorJson::with_state(self.value)
    }
}

impl EditorJson<KeyNormalized> {
    /// Content already known to carry keys only, e.g. produced by a converter.
    pub fn key_normalized(value: Value) -> Self {
        Self::with_state(value)
    }
}

impl EditorJson<IdResolved> {
    /// Content read back from the store it lives in.
    pub fn stored(value: Value) -> Self {
        Self::with_state(value)
    }
}

// ============================================================================
// IDENTITY MAPS
// ============================================================================

/// Per reference kind: source store id → key.
#[derive(Clone, Debug, Default)]
pub struct IdKeyMap {
    entries: HashMap<ReferenceKind, HashMap<String, String>>,
}

impl IdKeyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: ReferenceKind, id: impl Into<String>, key: impl Into<String>) {
        self.entries
            .entry(kind)
            .or_default()
            .insert(id.into(), key.into());
    }

    pub fn get(&self, kind: ReferenceKind, id: &str) -> Option<&str> {
        self.entries.get(&kind)?.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per reference kind: key → model in the destination store.
#[derive(Clone, Debug, Default)]
pub struct KeyInfoMap {
    entries: HashMap<ReferenceKind, HashMap<String, ModelInfo>>,
}

impl KeyInfoMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: ReferenceKind, info: ModelInfo) {
        self.entries
            .entry(kind)
            .or_default()
            .insert(info.key.clone(), info);
    }

    pub fn get(&self, kind: ReferenceKind, key: &str) -> Option<&ModelInfo> {
        self.entries.get(&kind)?.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// REWRITER
// ============================================================================

/// One reference found inside an editor JSON tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelReference {
    pub kind: ReferenceKind,
    pub id: Option<String>,
    pub key: Option<String>,
    pub name: Option<String>,
}

/// Stateless translator between the id and key identity spaces.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceRewriter;

impl ReferenceRewriter {
    /// Replace every store id with the key it maps to.
    pub fn to_key_space(&self, json: EditorJson<Raw>, ids: &IdKeyMap) -> EditorJson<KeyNormalized> {
        let mut value = json.into_value();
        normalize_references(&mut value, ids);
        EditorJson::with_state(value)
    }

    /// Point every key at the destination store's model for that key.
    pub fn to_id_space(
        &self,
        json: EditorJson<KeyNormalized>,
        keys: &KeyInfoMap,
    ) -> EditorJson<IdResolved> {
        let mut value = json.into_value();
        resolve_references(&mut value, keys);
        EditorJson::with_state(value)
    }

    /// All references embedded in `value`, in document order.
    pub fn collect(&self, value: &Value) -> Vec<ModelReference> {
        let mut found = Vec::new();
        visit_references(value, &mut |kind, obj| {
            found.push(ModelReference {
                kind,
                id: non_empty_str(obj, "id").map(str::to_string),
                key: non_empty_str(obj, "key").map(str::to_string),
                name: non_empty_str(obj, "name").map(str::to_string),
            });
        });
        found
    }
}

/// Rewrite references in place from ids to keys.
///
/// An id missing from `ids` falls back to the key the reference already
/// carries; a reference with neither is left untouched.
pub fn normalize_references(value: &mut Value, ids: &IdKeyMap) {
    visit_references_mut(value, &mut |kind, obj| {
        let Some(id) = non_empty_str(obj, "id").map(str::to_string) else {
            return;
        };
        if let Some(key) = ids.get(kind, &id) {
            obj.insert("key".to_string(), Value::String(key.to_string()));
            obj.remove("id");
        } else if non_empty_str(obj, "key").is_some() {
            obj.remove("id");
        } else {
            tracing::warn!(?kind, %id, "reference has no key mapping, leaving it dangling");
        }
    });
}

/// Rewrite references in place from keys to destination ids.
pub fn resolve_references(value: &mut Value, keys: &KeyInfoMap) {
    visit_references_mut(value, &mut |kind, obj| {
        let Some(key) = non_empty_str(obj, "key").map(str::to_string) else {
            return;
        };
        match keys.get(kind, &key) {
            Some(info) => {
                obj.insert("id".to_string(), Value::String(info.id.clone()));
                obj.insert("name".to_string(), Value::String(info.name.clone()));
                obj.insert("key".to_string(), Value::String(info.key.clone()));
            }
            None => tracing::warn!(?kind, %key, "no model with this key in the destination store"),
        }
    });
}

fn non_empty_str<'a>(obj: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    obj.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn visit_references(value: &Value, f: &mut dyn FnMut(ReferenceKind, &Map<String, Value>)) {
    match value {
        Value::Object(map) => {
            for (field, child) in map {
                if let (Some(kind), Value::Object(reference)) =
                    (ReferenceKind::from_property(field), child)
                {
                    f(kind, reference);
                } else {
                    visit_references(child, f);
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|item| visit_references(item, f)),
        _ => {}
    }
}

fn visit_references_mut(
    value: &mut Value,
    f: &mut dyn FnMut(ReferenceKind, &mut Map<String, Value>),
) {
    match value {
        Value::Object(map) => {
            for (field, child) in map.iter_mut() {
                match (ReferenceKind::from_property(field), child) {
                    (Some(kind), Value::Object(reference)) => f(kind, reference),
                    (_, child) => visit_references_mut(child, f),
                }
            }
        }
        Value::Array(items) => items
            .iter_mut()
            .for_each(|item| visit_references_mut(item, f)),
        _ => {}
    }
}
