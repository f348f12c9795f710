//! In-memory [`ModelStore`].

use chrono::Utc;
use indexmap::IndexMap;
use parking_lot::RwLock;
use uuid::Uuid;

use super::{ModelStore, StoreError};
use crate::model::{Model, ModelHistory, ModelRelation, ModelType, ModelUpdate, NewModel, User};

#[derive(Clone, Debug, Default)]
struct StoreState {
    models: IndexMap<String, Model>,
    relations: Vec<ModelRelation>,
    history: Vec<ModelHistory>,
}

/// Model store backed by process memory.
///
/// Transactions snapshot the whole state and restore it when the closure
/// fails, so nested transactions roll back independently.
#[derive(Debug, Default)]
pub struct MemoryModelStore {
    state: RwLock<StoreState>,
}

impl MemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored models.
    pub fn model_count(&self) -> usize {
        self.state.read().models.len()
    }

    /// Number of stored models of one type.
    pub fn count_of_type(&self, model_type: ModelType) -> usize {
        self.state
            .read()
            .models
            .values()
            .filter(|m| m.model_type == model_type)
            .count()
    }

    /// Every stored model, in creation order.
    pub fn all_models(&self) -> Vec<Model> {
        self.state.read().models.values().cloned().collect()
    }

    /// Every stored relation.
    pub fn all_relations(&self) -> Vec<ModelRelation> {
        self.state.read().relations.clone()
    }
}

fn require_field(value: &str, field: &str) -> Result<(), StoreError> {
    if value.trim().is_empty() {
        return Err(StoreError::invalid(format!("model {field} is required")));
    }
    Ok(())
}

impl ModelStore for MemoryModelStore {
    fn get(&self, id: &str) -> Result<Option<Model>, StoreError> {
        Ok(self.state.read().models.get(id).cloned())
    }

    fn find_by_key_and_type(
        &self,
        key: &str,
        model_type: ModelType,
    ) -> Result<Vec<Model>, StoreError> {
        let mut found: Vec<Model> = self
            .state
            .read()
            .models
            .values()
            .filter(|m| m.key == key && m.model_type == model_type)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        Ok(found)
    }

    fn create(&self, model: NewModel, user: &User) -> Result<Model, StoreError> {
        require_field(&model.key, "key")?;
        require_field(&model.name, "name")?;

        let now = Utc::now();
        let created = Model {
            id: Uuid::new_v4().to_string(),
            key: model.key,
            name: model.name,
            description: model.description,
            model_type: model.model_type,
            version: 1,
            editor_json: model.editor_json.into_value(),
            thumbnail: model.thumbnail,
            created: now,
            created_by: user.id.clone(),
            last_updated: now,
            last_updated_by: user.id.clone(),
        };
        tracing::debug!(id = %created.id, key = %created.key, kind = %created.model_type, "created model");
        self.state
            .write()
            .models
            .insert(created.id.clone(), created.clone());
        Ok(created)
    }

    fn save_as_new_version(
        &self,
        id: &str,
        update: ModelUpdate,
        user: &User,
    ) -> Result<Model, StoreError> {
        require_field(&update.name, "name")?;

        let mut state = self.state.write();
        let model = state
            .models
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let snapshot = ModelHistory::snapshot(model, update.comment);
        model.name = update.name;
        model.description = update.description;
        model.editor_json = update.editor_json.into_value();
        if update.thumbnail.is_some() {
            model.thumbnail = update.thumbnail;
        }
        model.version += 1;
        model.last_updated = Utc::now();
        model.last_updated_by = user.id.clone();
        let saved = model.clone();

        state.history.push(snapshot);
        tracing::debug!(id, version = saved.version, "saved new model version");
        Ok(saved)
    }

    fn find_relations_by_parent_id(
        &self,
        parent_id: &str,
    ) -> Result<Vec<ModelRelation>, StoreError> {
        Ok(self
            .state
            .read()
            .relations
            .iter()
            .filter(|r| r.parent_model_id == parent_id)
            .cloned()
            .collect())
    }

    fn replace_relations(
        &self,
        parent_id: &str,
        relations: Vec<ModelRelation>,
    ) -> Result<(), StoreError> {
        if let Some(foreign) = relations.iter().find(|r| r.parent_model_id != parent_id) {
            return Err(StoreError::invalid(format!(
                "relation parent {} does not match {parent_id}",
                foreign.parent_model_id
            )));
        }
        let mut state = self.state.write();
        state.relations.retain(|r| r.parent_model_id != parent_id);
        for relation in relations {
            if !state.relations.contains(&relation) {
                state.relations.push(relation);
            }
        }
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut state = self.state.write();
        if !state.models.contains_key(id) {
            return Err(StoreError::NotFound(id.to_string()));
        }
        state
            .relations
            .retain(|r| r.parent_model_id != id && r.child_model_id != id);
        state.history.retain(|h| h.model_id != id);
        state.models.shift_remove(id);
        tracing::debug!(id, "deleted model");
        Ok(())
    }

    fn history(&self, id: &str) -> Result<Vec<ModelHistory>, StoreError> {
        let mut versions: Vec<ModelHistory> = self
            .state
            .read()
            .history
            .iter()
            .filter(|h| h.model_id == id)
            .cloned()
            .collect();
        versions.sort_by_key(|h| h.version);
        Ok(versions)
    }

    fn in_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
    {
        let snapshot = self.state.read().clone();
        let result = f(self);
        if result.is_err() {
            *self.state.write() = snapshot;
            tracing::debug!("transaction rolled back");
        }
        result
    }
}
