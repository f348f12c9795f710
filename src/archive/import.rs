//! Portable archive import.
//!
//! The archive stream is read once into memory and walked by index; models
//! are then persisted leaves first so every reference can be pointed at an id
//! that already exists in the destination store:
//!
//! ```text
//! forms ─┐
//!        ├─▶ bpmn ─▶ cmmn (nested cases in dependency order) ─▶ app manifest
//! dmn  ──┘
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{Cursor, Read};

use zip::ZipArchive;

use super::{EntryKind, PortableModelFile, classify_entry};
use crate::convert::{Converters, NativeFormatConverter, migrate_decision_table};
use crate::error::AppError;
use crate::model::{AppDefinition, Model, ModelType, ModelUpdate, NewModel, User};
use crate::rewrite::{
    EditorJson, IdKeyMap, IdResolved, KeyInfoMap, KeyNormalized, ReferenceKind, ReferenceRewriter,
};
use crate::store::{ModelStore, sync_relations};

const MISSING_MANIFEST: &str = "could not find app definition json";
const IMPORT_COMMENT: &str = "Imported from app archive";

/// Archive content, keyed by file stem.
#[derive(Debug, Default)]
struct ArchiveContents {
    manifest: Option<(String, PortableModelFile)>,
    models: BTreeMap<ModelType, BTreeMap<String, PortableModelFile>>,
    thumbnails: HashMap<(ModelType, String), Vec<u8>>,
}

impl ArchiveContents {
    fn read<R: Read>(mut reader: R) -> Result<Self, AppError> {
        let mut buffer = Vec::new();
        reader
            .read_to_end(&mut buffer)
            .map_err(|e| AppError::internal_with("could not read app archive", e))?;
        let mut archive = ZipArchive::new(Cursor::new(buffer))
            .map_err(|e| AppError::internal_with("could not read app archive", e))?;

        let mut contents = Self::default();
        for index in 0..archive.len() {
            let mut file = archive
                .by_index(index)
                .map_err(|e| AppError::internal_with("could not read app archive", e))?;
            if file.is_dir() {
                continue;
            }
            let path = file.name().to_string();
            let (kind, stem) = classify_entry(&path);
            let stem = stem.to_string();
            tracing::debug!(path = %path, ?kind, "reading archive entry");

            let mut bytes = Vec::new();
            file.read_to_end(&mut bytes)
                .map_err(|e| AppError::internal_with(format!("could not read {path}"), e))?;

            match kind {
                EntryKind::Manifest => {
                    if contents.manifest.is_some() {
                        tracing::warn!(path = %path, "ignoring additional root json entry");
                        continue;
                    }
                    match serde_json::from_slice::<PortableModelFile>(&bytes) {
                        Ok(manifest) => contents.manifest = Some((stem, manifest)),
                        Err(e) => {
                            tracing::warn!(path = %path, error = %e, "unreadable app manifest");
                        }
                    }
                }
                EntryKind::Content(model_type) => {
                    let model = serde_json::from_slice::<PortableModelFile>(&bytes)
                        .map_err(|e| AppError::internal_with(format!("could not read {path}"), e))?;
                    contents
                        .models
                        .entry(model_type)
                        .or_default()
                        .insert(stem, model);
                }
                EntryKind::Thumbnail(model_type) => {
                    contents.thumbnails.insert((model_type, stem), bytes);
                }
                EntryKind::Rendering => {}
                EntryKind::Unknown => tracing::warn!(path = %path, "skipping unknown archive entry"),
            }
        }
        Ok(contents)
    }

    fn take_models(&mut self, model_type: ModelType) -> Vec<(String, PortableModelFile)> {
        self.models
            .remove(&model_type)
            .map(|models| models.into_iter().collect())
            .unwrap_or_default()
    }

    fn take_thumbnail(&mut self, model_type: ModelType, stem: &str) -> Option<Vec<u8>> {
        self.thumbnails.remove(&(model_type, stem.to_string()))
    }
}

/// Archive id → the model it became in the destination store.
type Imported = BTreeMap<String, Model>;

/// Imports a portable archive into a store, merging with an existing app when
/// one is supplied.
pub struct ImportArchivePipeline<'a, S: ModelStore> {
    store: &'a S,
    converters: Converters,
    user: &'a User,
}

impl<'a, S: ModelStore> ImportArchivePipeline<'a, S> {
    pub fn new(store: &'a S, converters: Converters, user: &'a User) -> Self {
        Self {
            store,
            converters,
            user,
        }
    }

    /// Import `reader` as the archive `filename`.
    ///
    /// With `existing_app` set, models whose key already exists in the store
    /// are saved as new versions and the app itself gets a new version;
    /// otherwise every model is created fresh. Returns the app model.
    pub fn import_portable<R: Read>(
        &self,
        reader: R,
        filename: &str,
        existing_app: Option<&Model>,
    ) -> Result<Model, AppError> {
        if !filename.to_ascii_lowercase().ends_with(".zip") {
            return Err(AppError::bad_request(format!(
                "Invalid file name, only .zip files are supported not {filename}"
            )));
        }

        let mut contents = ArchiveContents::read(reader)?;
        let (manifest_stem, manifest) = contents
            .manifest
            .take()
            .ok_or_else(|| AppError::bad_request(MISSING_MANIFEST))?;
        let merge = existing_app.is_some();

        let mut forms = Imported::new();
        for (stem, file) in contents.take_models(ModelType::Form) {
            let thumbnail = contents.take_thumbnail(ModelType::Form, &stem);
            let json = EditorJson::raw(file.editor_json.clone()).without_references();
            let model = self.merge_or_create(ModelType::Form, &stem, &file, json, thumbnail, merge)?;
            forms.insert(archive_id(&stem, &file), model);
        }

        let mut decision_tables = Imported::new();
        for (stem, mut file) in contents.take_models(ModelType::DecisionTable) {
            if migrate_decision_table(&mut file.editor_json) {
                tracing::debug!(key = %file.key, "upgraded decision table schema");
            }
            let thumbnail = contents.take_thumbnail(ModelType::DecisionTable, &stem);
            let json = EditorJson::raw(file.editor_json.clone()).without_references();
            let model = self.merge_or_create(
                ModelType::DecisionTable,
                &stem,
                &file,
                json,
                thumbnail,
                merge,
            )?;
            decision_tables.insert(archive_id(&stem, &file), model);
        }

        let mut ids = IdKeyMap::new();
        let mut keys = KeyInfoMap::new();
        for (kind, imported) in [
            (ReferenceKind::Form, &forms),
            (ReferenceKind::DecisionTable, &decision_tables),
        ] {
            register(&mut ids, &mut keys, kind, imported);
        }

        let mut processes = Imported::new();
        for (stem, file) in contents.take_models(ModelType::Bpmn) {
            let thumbnail = contents.take_thumbnail(ModelType::Bpmn, &stem);
            let normalized =
                ReferenceRewriter.to_key_space(EditorJson::raw(file.editor_json.clone()), &ids);
            let json = self.resolve(ModelType::Bpmn, &file, normalized, &mut keys)?;
            let model = self.merge_or_create(ModelType::Bpmn, &stem, &file, json, thumbnail, merge)?;
            sync_relations(self.store, &model)?;
            processes.insert(archive_id(&stem, &file), model);
        }
        register(&mut ids, &mut keys, ReferenceKind::Process, &processes);

        // Case keys are known before any case is persisted, so nested case
        // references can be normalized up front.
        let cases_in_archive = contents.take_models(ModelType::Cmmn);
        for (stem, file) in &cases_in_archive {
            ids.insert(ReferenceKind::Case, archive_id(stem, file), model_key(stem, file));
        }
        let mut cases = Imported::new();
        let normalized_cases = cases_in_archive
            .into_iter()
            .map(|(stem, file)| {
                let normalized =
                    ReferenceRewriter.to_key_space(EditorJson::raw(file.editor_json.clone()), &ids);
                (stem, file, normalized)
            })
            .collect::<Vec<_>>();
        for (stem, file, normalized) in order_cases(normalized_cases)? {
            let thumbnail = contents.take_thumbnail(ModelType::Cmmn, &stem);
            let json = self.resolve(ModelType::Cmmn, &file, normalized, &mut keys)?;
            let model = self.merge_or_create(ModelType::Cmmn, &stem, &file, json, thumbnail, merge)?;
            sync_relations(self.store, &model)?;
            keys.insert(ReferenceKind::Case, model.info());
            cases.insert(archive_id(&stem, &file), model);
        }

        let mut definition = AppDefinition::from_json(&manifest.editor_json)
            .map_err(|e| AppError::bad_request(format!("app definition json is not valid: {e}")))?;
        for (refs, imported) in [
            (&mut definition.models, &processes),
            (&mut definition.cmmn_models, &cases),
        ] {
            for reference in refs.iter_mut() {
                match imported.get(&reference.id) {
                    Some(model) => {
                        reference.refresh_from(model);
                        reference.key = Some(model.key.clone());
                    }
                    None => tracing::warn!(
                        app = %manifest.key,
                        id = %reference.id,
                        name = %reference.name,
                        "app references a model that is not in the archive, leaving it dangling"
                    ),
                }
            }
        }

        let app_json = definition
            .to_json()
            .map_err(|e| AppError::internal_with("could not encode app definition", e))?;
        let app_thumbnail = contents.take_thumbnail(ModelType::App, &manifest_stem);
        let app = match existing_app {
            Some(existing) => self.store.save_as_new_version(
                &existing.id,
                ModelUpdate {
                    name: non_empty(&manifest.name).unwrap_or(&existing.name).to_string(),
                    description: manifest.description.clone().or(existing.description.clone()),
                    editor_json: EditorJson::raw(app_json).without_references(),
                    thumbnail: app_thumbnail.or(existing.thumbnail.clone()),
                    comment: Some(IMPORT_COMMENT.to_string()),
                },
                self.user,
            )?,
            None => self.store.create(
                NewModel {
                    key: model_key(&manifest_stem, &manifest),
                    name: model_name(&manifest_stem, &manifest),
                    description: manifest.description.clone(),
                    model_type: ModelType::App,
                    editor_json: EditorJson::raw(app_json).without_references(),
                    thumbnail: app_thumbnail,
                },
                self.user,
            )?,
        };

        tracing::info!(
            app = %app.key,
            version = app.version,
            forms = forms.len(),
            decision_tables = decision_tables.len(),
            processes = processes.len(),
            cases = cases.len(),
            "imported app archive"
        );
        Ok(app)
    }

    /// Re-encode a diagram against the destination store.
    ///
    /// Keys the archive did not bring along are looked up in the store, so a
    /// reference to a form that already exists there still resolves.
    fn resolve(
        &self,
        model_type: ModelType,
        file: &PortableModelFile,
        normalized: EditorJson<KeyNormalized>,
        keys: &mut KeyInfoMap,
    ) -> Result<EditorJson<IdResolved>, AppError> {
        for reference in ReferenceRewriter.collect(normalized.value()) {
            let Some(key) = reference.key else {
                continue;
            };
            if keys.get(reference.kind, &key).is_some() {
                continue;
            }
            let existing = self
                .store
                .find_by_key_and_type(&key, reference.kind.target_type())?;
            if let Some(model) = existing.into_iter().next() {
                tracing::debug!(kind = ?reference.kind, key = %key, "resolved reference from store");
                keys.insert(reference.kind, model.info());
            }
        }

        let result = match model_type {
            ModelType::Bpmn => self.converters.bpmn.reencode(&normalized, keys),
            ModelType::Cmmn => self.converters.cmmn.reencode(&normalized, keys),
            _ => return Ok(ReferenceRewriter.to_id_space(normalized, keys)),
        };
        result.map_err(|e| {
            AppError::internal_with(
                format!("could not convert {model_type} {} ({}): {e}", file.name, file.key),
                e,
            )
        })
    }

    fn merge_or_create(
        &self,
        model_type: ModelType,
        stem: &str,
        file: &PortableModelFile,
        editor_json: EditorJson<IdResolved>,
        thumbnail: Option<Vec<u8>>,
        merge: bool,
    ) -> Result<Model, AppError> {
        let key = model_key(stem, file);
        if merge {
            let existing = self.store.find_by_key_and_type(&key, model_type)?;
            if let Some(current) = existing.into_iter().next() {
                tracing::debug!(%model_type, key = %key, id = %current.id, "merging into existing model");
                let update = ModelUpdate {
                    name: model_name(stem, file),
                    description: file.description.clone(),
                    editor_json,
                    thumbnail: thumbnail.or(current.thumbnail.clone()),
                    comment: Some(IMPORT_COMMENT.to_string()),
                };
                return Ok(self.store.save_as_new_version(&current.id, update, self.user)?);
            }
        }

        tracing::debug!(%model_type, key = %key, "creating model");
        Ok(self.store.create(
            NewModel {
                key,
                name: model_name(stem, file),
                description: file.description.clone(),
                model_type,
                editor_json,
                thumbnail,
            },
            self.user,
        )?)
    }
}

fn register(ids: &mut IdKeyMap, keys: &mut KeyInfoMap, kind: ReferenceKind, imported: &Imported) {
    for (old_id, model) in imported {
        ids.insert(kind, old_id.clone(), model.key.clone());
        keys.insert(kind, model.info());
    }
}

fn non_empty(value: &str) -> Option<&str> {
    Some(value.trim()).filter(|v| !v.is_empty())
}

/// The archive key, falling back to the file stem.
fn model_key(stem: &str, file: &PortableModelFile) -> String {
    non_empty(&file.key).unwrap_or(stem).to_string()
}

/// Id the archive knows the model by; the key when the id is missing.
fn archive_id(stem: &str, file: &PortableModelFile) -> String {
    non_empty(&file.id)
        .map(str::to_string)
        .unwrap_or_else(|| model_key(stem, file))
}

fn model_name(stem: &str, file: &PortableModelFile) -> String {
    non_empty(&file.name)
        .map(str::to_string)
        .unwrap_or_else(|| model_key(stem, file))
}

type PendingCase = (String, PortableModelFile, EditorJson<KeyNormalized>);

/// Order cases so that every nested case is persisted before its parent.
fn order_cases(pending: Vec<PendingCase>) -> Result<Vec<PendingCase>, AppError> {
    let keys: Vec<String> = pending
        .iter()
        .map(|(stem, file, _)| model_key(stem, file))
        .collect();
    let index_of: HashMap<&str, usize> = keys
        .iter()
        .enumerate()
        .map(|(i, key)| (key.as_str(), i))
        .collect();
    let dependencies: Vec<Vec<usize>> = pending
        .iter()
        .enumerate()
        .map(|(i, (_, _, json))| {
            ReferenceRewriter
                .collect(json.value())
                .into_iter()
                .filter(|r| r.kind == ReferenceKind::Case)
                .filter_map(|r| r.key.and_then(|key| index_of.get(key.as_str()).copied()))
                .filter(|&dep| dep != i)
                .collect()
        })
        .collect();

    fn visit(
        node: usize,
        dependencies: &[Vec<usize>],
        done: &mut HashSet<usize>,
        active: &mut HashSet<usize>,
        order: &mut Vec<usize>,
        keys: &[String],
    ) -> Result<(), AppError> {
        if done.contains(&node) {
            return Ok(());
        }
        if !active.insert(node) {
            return Err(AppError::bad_request(format!(
                "case model {} is part of a reference cycle",
                keys[node]
            )));
        }
        for &dep in &dependencies[node] {
            visit(dep, dependencies, done, active, order, keys)?;
        }
        active.remove(&node);
        done.insert(node);
        order.push(node);
        Ok(())
    }

    let mut order = Vec::with_capacity(pending.len());
    let mut done = HashSet::new();
    let mut active = HashSet::new();
    for node in 0..pending.len() {
        visit(node, &dependencies, &mut done, &mut active, &mut order, &keys)?;
    }

    let mut slots: Vec<Option<PendingCase>> = pending.into_iter().map(Some).collect();
    Ok(order
        .into_iter()
        .filter_map(|i| slots.get_mut(i).and_then(Option::take))
        .collect())
}
