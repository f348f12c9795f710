//! Collection of the models reachable from an app.

use std::collections::{HashSet, VecDeque};

use indexmap::IndexMap;

use crate::error::AppError;
use crate::model::{AppDefinition, Model, ModelType};
use crate::rewrite::{IdKeyMap, ReferenceKind, ReferenceRewriter};
use crate::store::ModelStore;

/// An app model and every model it transitively bundles.
#[derive(Clone, Debug)]
pub struct AppGraph {
    pub app: Model,
    pub definition: AppDefinition,
    models: IndexMap<String, Model>,
}

impl AppGraph {
    /// Walk the graph below `app`.
    ///
    /// Top-level models come from the app definition; children are followed
    /// through stored relations and through references embedded in editor
    /// JSON, so a stale relation table does not drop children. Ids that
    /// resolve to nothing are logged and skipped.
    pub fn collect<S: ModelStore>(store: &S, app: Model) -> Result<Self, AppError> {
        if app.model_type != ModelType::App {
            return Err(AppError::bad_request(format!(
                "model {} is a {}, not an app definition",
                app.key, app.model_type
            )));
        }
        let definition = AppDefinition::from_json(&app.editor_json).map_err(|e| {
            AppError::internal_with(format!("app definition {} is not valid", app.key), e)
        })?;

        let mut queue = VecDeque::new();
        for reference in definition.model_refs() {
            match store.get(&reference.id)? {
                Some(model) if model.model_type.carries_references() => queue.push_back(model),
                Some(model) => tracing::warn!(
                    app = %app.key,
                    id = %reference.id,
                    model_type = %model.model_type,
                    "app references a model that cannot be bundled, skipping"
                ),
                None => tracing::warn!(
                    app = %app.key,
                    id = %reference.id,
                    name = %reference.name,
                    "app references a missing model, skipping"
                ),
            }
        }

        let mut models = IndexMap::new();
        while let Some(model) = queue.pop_front() {
            if models.contains_key(&model.id) || model.model_type == ModelType::App {
                continue;
            }
            if model.model_type.carries_references() {
                queue.extend(children_of(store, &model)?);
            }
            models.insert(model.id.clone(), model);
        }

        tracing::debug!(app = %app.key, models = models.len(), "collected app graph");
        Ok(Self {
            app,
            definition,
            models,
        })
    }

    /// Bundled models of one type, ordered by key.
    pub fn models_of(&self, model_type: ModelType) -> Vec<&Model> {
        let mut models: Vec<&Model> = self
            .models
            .values()
            .filter(|m| m.model_type == model_type)
            .collect();
        models.sort_by(|a, b| a.key.cmp(&b.key).then_with(|| a.id.cmp(&b.id)));
        models
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// id → key of every bundled model, for moving its JSON into key space.
    pub fn id_key_map(&self) -> IdKeyMap {
        let mut ids = IdKeyMap::new();
        for model in self.models.values() {
            if let Some(kind) = ReferenceKind::for_target(model.model_type) {
                ids.insert(kind, model.id.clone(), model.key.clone());
            }
        }
        ids
    }
}

fn children_of<S: ModelStore>(store: &S, parent: &Model) -> Result<Vec<Model>, AppError> {
    let mut seen = HashSet::new();
    let mut children = Vec::new();
    for child in store.find_children_by_parent_id(&parent.id)? {
        if seen.insert(child.id.clone()) {
            children.push(child);
        }
    }

    for reference in ReferenceRewriter.collect(&parent.editor_json) {
        let target = reference.kind.target_type();
        let by_id = match &reference.id {
            Some(id) => store.get(id)?.filter(|m| m.model_type == target),
            None => None,
        };
        let child = match (by_id, &reference.key) {
            (Some(child), _) => Some(child),
            (None, Some(key)) => store.find_by_key_and_type(key, target)?.into_iter().next(),
            (None, None) => None,
        };
        match child {
            Some(child) => {
                if seen.insert(child.id.clone()) {
                    children.push(child);
                }
            }
            None => tracing::warn!(
                parent = %parent.key,
                kind = ?reference.kind,
                id = reference.id.as_deref().unwrap_or(""),
                key = reference.key.as_deref().unwrap_or(""),
                "dangling reference, skipping"
            ),
        }
    }
    Ok(children)
}
