//! Model persistence.
//!
//! The packaging pipelines only talk to storage through [`ModelStore`]. The
//! crate ships [`MemoryModelStore`]; database-backed stores implement the same
//! trait outside this crate.

mod memory;

pub use memory::MemoryModelStore;

use thiserror::Error;

use crate::model::{Model, ModelHistory, ModelRelation, ModelType, ModelUpdate, NewModel, User};
use crate::rewrite::ReferenceRewriter;

/// Errors raised by a [`ModelStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// No model with this id.
    #[error("model not found: {0}")]
    NotFound(String),

    /// The write request is incomplete or inconsistent.
    #[error("invalid model: {0}")]
    Invalid(String),

    /// The backend failed.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

/// CRUD and relation queries over persisted models.
pub trait ModelStore {
    /// Look up a model by id.
    fn get(&self, id: &str) -> Result<Option<Model>, StoreError>;

    /// Look up a model by id, failing if it does not exist.
    fn get_required(&self, id: &str) -> Result<Model, StoreError> {
        self.get(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// All models of `model_type` with this key, most recently updated first.
    fn find_by_key_and_type(&self, key: &str, model_type: ModelType)
    -> Result<Vec<Model>, StoreError>;

    /// Persist a new model at version 1. The store assigns the id.
    fn create(&self, model: NewModel, user: &User) -> Result<Model, StoreError>;

    /// Snapshot the current content into history, apply `update` and bump
    /// the version.
    fn save_as_new_version(
        &self,
        id: &str,
        update: ModelUpdate,
        user: &User,
    ) -> Result<Model, StoreError>;

    /// Relations whose parent is `parent_id`.
    fn find_relations_by_parent_id(&self, parent_id: &str)
    -> Result<Vec<ModelRelation>, StoreError>;

    /// Models referenced by `parent_id` through a relation.
    fn find_children_by_parent_id(&self, parent_id: &str) -> Result<Vec<Model>, StoreError> {
        let mut children = Vec::new();
        for relation in self.find_relations_by_parent_id(parent_id)? {
            match self.get(&relation.child_model_id)? {
                Some(child) => children.push(child),
                None => tracing::warn!(
                    parent = parent_id,
                    child = %relation.child_model_id,
                    "relation points at a missing model"
                ),
            }
        }
        Ok(children)
    }

    /// Replace every relation of `parent_id` with `relations`.
    fn replace_relations(
        &self,
        parent_id: &str,
        relations: Vec<ModelRelation>,
    ) -> Result<(), StoreError>;

    /// Delete a model, removing relations that touch it first.
    fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Previous versions of a model, oldest first.
    fn history(&self, id: &str) -> Result<Vec<ModelHistory>, StoreError>;

    /// Run `f` as one unit: if it fails, every write it made is undone.
    fn in_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        Self: Sized,
        F: FnOnce(&Self) -> Result<T, E>;
}

/// Rebuild the relations of `model` from the references embedded in its
/// editor JSON. Returns the number of relations written.
///
/// References whose id does not resolve to a model of the expected type are
/// skipped.
pub fn sync_relations<S: ModelStore + ?Sized>(store: &S, model: &Model) -> Result<usize, StoreError> {
    let mut relations: Vec<ModelRelation> = Vec::new();
    for reference in ReferenceRewriter.collect(&model.editor_json) {
        let Some(child_id) = reference.id else {
            continue;
        };
        match store.get(&child_id)? {
            Some(child) if child.model_type == reference.kind.target_type() => {
                let relation = ModelRelation {
                    parent_model_id: model.id.clone(),
                    child_model_id: child.id,
                    relation_type: reference.kind,
                };
                if !relations.contains(&relation) {
                    relations.push(relation);
                }
            }
            _ => tracing::warn!(
                parent = %model.key,
                child = %child_id,
                kind = ?reference.kind,
                "reference does not resolve to a stored model, no relation written"
            ),
        }
    }
    let count = relations.len();
    store.replace_relations(&model.id, relations)?;
    Ok(count)
}
