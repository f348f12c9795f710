//! Persisted model records and the app definition payload.
//!
//! ```text
//! App ──AppModelDefinition──▶ Bpmn / Cmmn ──ModelRelation──▶ Form / DecisionTable
//!                                         └─ModelRelation──▶ nested Cmmn / Bpmn
//! ```
//!
//! A [`Model`] is identified twice: by its store-assigned `id`, which is only
//! meaningful inside one store, and by its `key`, which travels with the
//! content across stores.

mod app;

pub use app::{AppDefinition, AppManifest, AppModelDefinition};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::rewrite::{EditorJson, IdResolved, ReferenceKind};

// ============================================================================
// MODEL TYPE
// ============================================================================

/// The kind of content a model holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModelType {
    App,
    Bpmn,
    Cmmn,
    Form,
    DecisionTable,
}

impl ModelType {
    /// All model types, in import stage order (leaves first, app last).
    pub const IMPORT_ORDER: [ModelType; 5] = [
        ModelType::Form,
        ModelType::DecisionTable,
        ModelType::Bpmn,
        ModelType::Cmmn,
        ModelType::App,
    ];

    /// Directory holding models of this type inside a portable archive.
    ///
    /// The app manifest lives at the archive root, so `App` has none.
    pub fn archive_dir(&self) -> Option<&'static str> {
        match self {
            ModelType::App => None,
            ModelType::Bpmn => Some("bpmn-models"),
            ModelType::Cmmn => Some("cmmn-models"),
            ModelType::Form => Some("form-models"),
            ModelType::DecisionTable => Some("decision-table-models"),
        }
    }

    /// Inverse of [`archive_dir`](Self::archive_dir).
    pub fn from_archive_dir(dir: &str) -> Option<Self> {
        match dir {
            "bpmn-models" => Some(ModelType::Bpmn),
            "cmmn-models" => Some(ModelType::Cmmn),
            "form-models" => Some(ModelType::Form),
            "decision-table-models" => Some(ModelType::DecisionTable),
            _ => None,
        }
    }

    /// Human readable label used in log lines and error messages.
    pub fn label(&self) -> &'static str {
        match self {
            ModelType::App => "app definition",
            ModelType::Bpmn => "process model",
            ModelType::Cmmn => "case model",
            ModelType::Form => "form",
            ModelType::DecisionTable => "decision table",
        }
    }

    /// Whether editor JSON of this type can embed references to other models.
    pub fn carries_references(&self) -> bool {
        matches!(self, ModelType::Bpmn | ModelType::Cmmn)
    }
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// MODEL RECORDS
// ============================================================================

/// A persisted, versioned unit of design content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub id: String,
    pub key: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub model_type: ModelType,
    pub version: u32,
    pub editor_json: serde_json::Value,
    #[serde(skip)]
    pub thumbnail: Option<Vec<u8>>,
    pub created: DateTime<Utc>,
    pub created_by: String,
    pub last_updated: DateTime<Utc>,
    pub last_updated_by: String,
}

impl Model {
    /// The `{id, name, key}` triple other models use to reference this one.
    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            key: self.key.clone(),
        }
    }
}

/// Target of a key→id resolution: where a key lives in the destination store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub key: String,
}

/// Directed edge: `parent`'s editor JSON references `child`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelRelation {
    pub parent_model_id: String,
    pub child_model_id: String,
    pub relation_type: ReferenceKind,
}

/// Snapshot of a model's content before it was replaced by a new version.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelHistory {
    pub model_id: String,
    pub version: u32,
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub editor_json: serde_json::Value,
    pub comment: Option<String>,
    pub last_updated: DateTime<Utc>,
    pub last_updated_by: String,
}

impl ModelHistory {
    /// Capture the current state of `model`.
    pub fn snapshot(model: &Model, comment: Option<String>) -> Self {
        Self {
            model_id: model.id.clone(),
            version: model.version,
            key: model.key.clone(),
            name: model.name.clone(),
            description: model.description.clone(),
            editor_json: model.editor_json.clone(),
            comment,
            last_updated: model.last_updated,
            last_updated_by: model.last_updated_by.clone(),
        }
    }
}

// ============================================================================
// WRITE REQUESTS
// ============================================================================

/// Content for a model the store has not seen yet. The store assigns the id.
#[derive(Clone, Debug)]
pub struct NewModel {
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub model_type: ModelType,
    pub editor_json: EditorJson<IdResolved>,
    pub thumbnail: Option<Vec<u8>>,
}

/// Replacement content for an existing model; applying it bumps the version.
#[derive(Clone, Debug)]
pub struct ModelUpdate {
    pub name: String,
    pub description: Option<String>,
    pub editor_json: EditorJson<IdResolved>,
    pub thumbnail: Option<Vec<u8>>,
    pub comment: Option<String>,
}

impl ModelUpdate {
    /// An update that keeps everything as is; used to snapshot a version.
    pub fn unchanged(model: &Model, comment: impl Into<String>) -> Self {
        Self {
            name: model.name.clone(),
            description: model.description.clone(),
            editor_json: EditorJson::stored(model.editor_json.clone()),
            thumbnail: model.thumbnail.clone(),
            comment: Some(comment.into()),
        }
    }
}

/// The acting user, recorded as creator/updater and used for tenancy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub tenant_id: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tenant_id: None,
        }
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }
}
