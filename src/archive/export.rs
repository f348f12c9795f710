//! Portable and deployable archive builders.

use serde_json::{Map, Value};

use super::graph::AppGraph;
use super::{ArchiveWriter, PortableModelFile, deployable_name, portable_path};
use crate::convert::{
    ConversionError, Converters, EventRegistryDocuments, NativeFormatConverter,
    migrate_decision_table,
};
use crate::error::AppError;
use crate::model::{AppManifest, Model, ModelType};
use crate::rewrite::{EditorJson, IdKeyMap, KeyNormalized, ReferenceRewriter};
use crate::store::ModelStore;

/// Builds archives from an app model and the models it bundles.
///
/// Any conversion failure aborts the whole archive; no partial archive is
/// ever returned.
pub struct ExportArchiveBuilder<'a, S: ModelStore> {
    store: &'a S,
    converters: Converters,
}

impl<'a, S: ModelStore> ExportArchiveBuilder<'a, S> {
    pub fn new(store: &'a S, converters: Converters) -> Self {
        Self { store, converters }
    }

    /// Round-trip archive of the app `app_model_id`.
    pub fn export_portable(&self, app_model_id: &str) -> Result<Vec<u8>, AppError> {
        let app = self.store.get_required(app_model_id)?;
        self.export_portable_model(app)
    }

    /// Flat deployable archive of the app `app_model_id`.
    pub fn export_deployable(&self, app_model_id: &str) -> Result<Vec<u8>, AppError> {
        let app = self.store.get_required(app_model_id)?;
        self.export_deployable_model(app)
    }

    pub fn export_portable_model(&self, app: Model) -> Result<Vec<u8>, AppError> {
        let graph = AppGraph::collect(self.store, app)?;
        let ids = graph.id_key_map();
        let mut zip = ArchiveWriter::new();

        let app = &graph.app;
        zip.add_json(
            &portable_path(ModelType::App, &app.key, "json"),
            &PortableModelFile::of(app, app.editor_json.clone()),
        )?;
        if let Some(thumbnail) = &app.thumbnail {
            zip.add(&portable_path(ModelType::App, &app.key, "png"), thumbnail)?;
        }

        for model in graph.models_of(ModelType::Bpmn) {
            let json = key_normalized(model, &ids);
            let xml = self
                .converters
                .bpmn
                .json_to_xml(&json)
                .map_err(|e| conversion_failed(model, e))?;
            self.add_portable_model(&mut zip, model, json.into_value())?;
            zip.add(&portable_path(ModelType::Bpmn, &model.key, "bpmn"), &xml)?;
        }

        for model in graph.models_of(ModelType::Cmmn) {
            let json = key_normalized(model, &ids);
            let xml = self
                .converters
                .cmmn
                .json_to_xml(&json)
                .map_err(|e| conversion_failed(model, e))?;
            self.add_portable_model(&mut zip, model, json.into_value())?;
            zip.add(&portable_path(ModelType::Cmmn, &model.key, "cmmn"), &xml)?;
        }

        for model in graph.models_of(ModelType::Form) {
            self.add_portable_model(&mut zip, model, model.editor_json.clone())?;
        }

        for model in graph.models_of(ModelType::DecisionTable) {
            let xml = self.render_dmn(model)?;
            self.add_portable_model(&mut zip, model, model.editor_json.clone())?;
            zip.add(&portable_path(ModelType::DecisionTable, &model.key, "dmn"), &xml)?;
        }

        let entries = zip.entries();
        let bytes = zip.finish()?;
        tracing::info!(
            app = %graph.app.key,
            models = graph.len(),
            entries,
            "exported portable app archive"
        );
        Ok(bytes)
    }

    pub fn export_deployable_model(&self, app: Model) -> Result<Vec<u8>, AppError> {
        let graph = AppGraph::collect(self.store, app)?;
        let ids = graph.id_key_map();
        let mut zip = ArchiveWriter::new();
        let mut events = EventRegistryDocuments::default();

        let manifest = AppManifest::new(&graph.app, &graph.definition);
        zip.add_json(&format!("{}.app", graph.app.key), &manifest)?;

        for model in graph.models_of(ModelType::Bpmn) {
            let json = key_normalized(model, &ids);
            let native = self
                .converters
                .bpmn
                .json_to_native(&json)
                .map_err(|e| conversion_failed(model, e))?;
            let xml = self
                .converters
                .bpmn
                .native_to_xml(&native)
                .map_err(|e| conversion_failed(model, e))?;
            events.merge(self.converters.events.discover(&native.0));
            zip.add(&deployable_name(&model.key, "bpmn"), &xml)?;
        }

        for model in graph.models_of(ModelType::Cmmn) {
            let json = key_normalized(model, &ids);
            let native = self
                .converters
                .cmmn
                .json_to_native(&json)
                .map_err(|e| conversion_failed(model, e))?;
            let xml = self
                .converters
                .cmmn
                .native_to_xml(&native)
                .map_err(|e| conversion_failed(model, e))?;
            events.merge(self.converters.events.discover(&native.0));
            zip.add(&deployable_name(&model.key, "cmmn"), &xml)?;
        }

        for model in graph.models_of(ModelType::Form) {
            zip.add_json(&format!("form-{}.form", model.key), &form_definition(model))?;
        }

        for model in graph.models_of(ModelType::DecisionTable) {
            let xml = self.render_dmn(model)?;
            zip.add(&format!("dmn-{}.dmn", model.key), &xml)?;
        }

        for (key, event) in &events.events {
            let bytes = self.converters.events.event_to_bytes(event).map_err(|e| {
                AppError::internal_with(format!("could not render event definition {key}"), e)
            })?;
            zip.add(&format!("event-{key}.event"), &bytes)?;
        }
        for (key, channel) in &events.channels {
            let bytes = self.converters.events.channel_to_bytes(channel).map_err(|e| {
                AppError::internal_with(format!("could not render channel definition {key}"), e)
            })?;
            zip.add(&format!("channel-{key}.channel"), &bytes)?;
        }

        let entries = zip.entries();
        let bytes = zip.finish()?;
        tracing::info!(
            app = %graph.app.key,
            models = graph.len(),
            entries,
            "exported deployable app archive"
        );
        Ok(bytes)
    }

    fn add_portable_model(
        &self,
        zip: &mut ArchiveWriter,
        model: &Model,
        editor_json: Value,
    ) -> Result<(), AppError> {
        zip.add_json(
            &portable_path(model.model_type, &model.key, "json"),
            &PortableModelFile::of(model, editor_json),
        )?;
        if let Some(thumbnail) = &model.thumbnail {
            zip.add(&portable_path(model.model_type, &model.key, "png"), thumbnail)?;
        }
        Ok(())
    }

    /// Render a decision table, upgrading older schemas on a copy first.
    fn render_dmn(&self, model: &Model) -> Result<Vec<u8>, AppError> {
        let mut value = model.editor_json.clone();
        migrate_decision_table(&mut value);
        if let Value::Object(root) = &mut value {
            root.insert("key".to_string(), Value::String(model.key.clone()));
            root.entry("name")
                .or_insert_with(|| Value::String(model.name.clone()));
            if let Some(description) = &model.description {
                root.entry("description")
                    .or_insert_with(|| Value::String(description.clone()));
            }
        }
        // Decision tables carry no references, so the stored JSON is already
        // in key space.
        self.converters
            .dmn
            .json_to_xml(&EditorJson::key_normalized(value))
            .map_err(|e| conversion_failed(model, e))
    }
}

fn key_normalized(model: &Model, ids: &IdKeyMap) -> EditorJson<KeyNormalized> {
    ReferenceRewriter.to_key_space(EditorJson::raw(model.editor_json.clone()), ids)
}

fn conversion_failed(model: &Model, err: ConversionError) -> AppError {
    AppError::internal_with(
        format!(
            "could not convert {} {} ({}): {err}",
            model.model_type, model.name, model.key
        ),
        err,
    )
}

/// Form document as the engine expects it: the editor JSON plus identity.
fn form_definition(model: &Model) -> Value {
    let mut root = match &model.editor_json {
        Value::Object(root) => root.clone(),
        other => {
            let mut root = Map::new();
            root.insert("fields".to_string(), other.clone());
            root
        }
    };
    root.insert("key".to_string(), Value::String(model.key.clone()));
    root.insert("name".to_string(), Value::String(model.name.clone()));
    if let Some(description) = &model.description {
        root.insert("description".to_string(), Value::String(description.clone()));
    }
    Value::Object(root)
}
