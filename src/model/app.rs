//! App definition payload (the editor JSON of an `App` model).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Model;

/// Decoded editor JSON of an app model.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users_access: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups_access: Option<String>,
    /// Bundled process models.
    #[serde(default)]
    pub models: Vec<AppModelDefinition>,
    /// Bundled case models.
    #[serde(default)]
    pub cmmn_models: Vec<AppModelDefinition>,
}

impl AppDefinition {
    /// Decode from an app model's editor JSON.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value.clone())
    }

    /// Encode back into editor JSON.
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Every bundled model reference, process models first.
    pub fn model_refs(&self) -> impl Iterator<Item = &AppModelDefinition> {
        self.models.iter().chain(self.cmmn_models.iter())
    }

    /// Mutable access to every bundled model reference.
    pub fn model_refs_mut(&mut self) -> impl Iterator<Item = &mut AppModelDefinition> {
        self.models.iter_mut().chain(self.cmmn_models.iter_mut())
    }
}

/// Snapshot reference from an app to one bundled Bpmn or Cmmn model.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppModelDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_by: Option<String>,
}

impl AppModelDefinition {
    /// Reference `model` as it currently is.
    pub fn of(model: &Model) -> Self {
        let mut def = Self {
            id: model.id.clone(),
            key: Some(model.key.clone()),
            description: model.description.clone(),
            ..Self::default()
        };
        def.refresh_from(model);
        def
    }

    /// Point this reference at `model`, keeping the bundled description.
    pub fn refresh_from(&mut self, model: &Model) {
        self.id = model.id.clone();
        self.name = model.name.clone();
        self.version = model.version;
        self.last_updated = Some(model.last_updated);
        self.created_by = Some(model.created_by.clone());
        self.last_updated_by = Some(model.last_updated_by.clone());
    }
}

/// Display metadata written as `{key}.app` into a deployable archive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppManifest {
    pub key: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users_access: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups_access: Option<String>,
}

impl AppManifest {
    pub fn new(app_model: &Model, definition: &AppDefinition) -> Self {
        Self {
            key: app_model.key.clone(),
            name: app_model.name.clone(),
            description: app_model.description.clone(),
            theme: definition.theme.clone(),
            icon: definition.icon.clone(),
            users_access: definition.users_access.clone(),
            groups_access: definition.groups_access.clone(),
        }
    }
}
