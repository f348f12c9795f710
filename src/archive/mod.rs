//! App definition archives.
//!
//! Two zip layouts are produced from the same app graph:
//!
//! ```text
//! portable (round trip)                 deployable (flat)
//! ├── expense.json      app manifest    ├── expense.app
//! ├── bpmn-models/                      ├── approveExpense.bpmn
//! │   ├── approveExpense.json           ├── form-expenseForm.form
//! │   ├── approveExpense.bpmn           ├── dmn-limits.dmn
//! │   └── approveExpense.png            ├── event-expenseSubmitted.event
//! ├── cmmn-models/                      └── channel-expenseIn.channel
//! ├── form-models/
//! │   └── expenseForm.json
//! └── decision-table-models/
//!     ├── limits.json
//!     └── limits.dmn
//! ```
//!
//! Only the portable layout can be imported again; the rendered `.bpmn`,
//! `.cmmn` and `.dmn` files inside it are informational and skipped on import.

mod export;
mod graph;
mod import;

pub use export::ExportArchiveBuilder;
pub use graph::AppGraph;
pub use import::ImportArchivePipeline;

use std::io::{Cursor, Write};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::AppError;
use crate::model::{Model, ModelType};

/// One `.json` entry of a portable archive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortableModelFile {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub editor_json: Value,
}

impl PortableModelFile {
    /// Archive form of `model`, with `editor_json` replacing the stored JSON.
    pub fn of(model: &Model, editor_json: Value) -> Self {
        Self {
            id: model.id.clone(),
            name: model.name.clone(),
            key: model.key.clone(),
            description: model.description.clone(),
            editor_json,
        }
    }
}

/// What an archive path holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    /// `{key}.json` at the root.
    Manifest,
    /// `{dir}/{key}.json`.
    Content(ModelType),
    /// `{dir}/{key}.png`, or `{key}.png` at the root for the app.
    Thumbnail(ModelType),
    /// Generated `.bpmn`, `.cmmn` or `.dmn` rendering.
    Rendering,
    /// Anything else.
    Unknown,
}

/// Classify an archive path; returns the kind and the file stem.
pub fn classify_entry(path: &str) -> (EntryKind, &str) {
    let (dir, file) = match path.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, path),
    };
    let (stem, extension) = match file.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => (stem, extension.to_ascii_lowercase()),
        _ => return (EntryKind::Unknown, file),
    };

    let model_type = match dir {
        None => ModelType::App,
        Some(dir) => match ModelType::from_archive_dir(dir) {
            Some(model_type) => model_type,
            None => return (EntryKind::Unknown, stem),
        },
    };

    let kind = match (model_type, extension.as_str()) {
        (ModelType::App, "json") => EntryKind::Manifest,
        (_, "json") => EntryKind::Content(model_type),
        (_, "png") => EntryKind::Thumbnail(model_type),
        (ModelType::App, _) => EntryKind::Unknown,
        (_, "bpmn" | "cmmn" | "dmn" | "xml") => EntryKind::Rendering,
        _ => EntryKind::Unknown,
    };
    (kind, stem)
}

/// Path of a model's `.json` entry in a portable archive.
pub fn portable_path(model_type: ModelType, key: &str, extension: &str) -> String {
    match model_type.archive_dir() {
        Some(dir) => format!("{dir}/{key}.{extension}"),
        None => format!("{key}.{extension}"),
    }
}

/// File name of a Bpmn or Cmmn model in a deployable archive.
pub fn deployable_name(key: &str, extension: &str) -> String {
    let key: String = key.chars().filter(|c| !c.is_whitespace()).collect();
    format!("{key}.{extension}")
}

/// Buffered zip writer; every entry is deflated.
pub(crate) struct ArchiveWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
    entries: usize,
}

impl ArchiveWriter {
    pub fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Deflated),
            entries: 0,
        }
    }

    pub fn add(&mut self, path: &str, content: &[u8]) -> Result<(), AppError> {
        tracing::debug!(path, bytes = content.len(), "writing archive entry");
        self.zip
            .start_file(path, self.options)
            .map_err(|e| AppError::internal_with(format!("Failed to create {path}"), e))?;
        self.zip
            .write_all(content)
            .map_err(|e| AppError::internal_with(format!("Failed to write {path}"), e))?;
        self.entries += 1;
        Ok(())
    }

    pub fn add_json<T: Serialize>(&mut self, path: &str, value: &T) -> Result<(), AppError> {
        let bytes = serde_json::to_vec_pretty(value)
            .map_err(|e| AppError::internal_with(format!("Failed to encode {path}"), e))?;
        self.add(path, &bytes)
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    pub fn finish(self) -> Result<Vec<u8>, AppError> {
        let cursor = self
            .zip
            .finish()
            .map_err(|e| AppError::internal_with("Failed to finalize archive", e))?;
        Ok(cursor.into_inner())
    }
}
