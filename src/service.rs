//! App definition operations as one transactional surface.
//!
//! Each operation runs inside a single [`ModelStore::in_transaction`] call,
//! so a failed import or publish leaves the store as it was. Internal errors
//! are logged here, once; caller errors are returned without logging.

use std::io::Read;

use crate::archive::{ExportArchiveBuilder, ImportArchivePipeline};
use crate::config::DeploymentConfig;
use crate::convert::Converters;
use crate::deploy::{DeploymentPublisher, DeploymentTransport};
use crate::error::AppError;
use crate::model::{Model, ModelType, User};
use crate::store::ModelStore;

pub struct AppDefinitionService<S: ModelStore, T: DeploymentTransport> {
    store: S,
    converters: Converters,
    publisher: DeploymentPublisher<T>,
}

impl<S: ModelStore, T: DeploymentTransport> AppDefinitionService<S, T> {
    pub fn new(store: S, transport: T, config: DeploymentConfig) -> Self {
        let converters = Converters::default();
        Self {
            store,
            converters,
            publisher: DeploymentPublisher::new(transport, config, converters),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn export_portable(&self, app_model_id: &str) -> Result<Vec<u8>, AppError> {
        self.run("export portable archive", app_model_id, |store| {
            ExportArchiveBuilder::new(store, self.converters).export_portable(app_model_id)
        })
    }

    pub fn export_deployable(&self, app_model_id: &str) -> Result<Vec<u8>, AppError> {
        self.run("export deployable archive", app_model_id, |store| {
            ExportArchiveBuilder::new(store, self.converters).export_deployable(app_model_id)
        })
    }

    /// Import an archive as a brand new app.
    pub fn import_new<R: Read>(
        &self,
        reader: R,
        filename: &str,
        user: &User,
    ) -> Result<Model, AppError> {
        self.run("import app archive", filename, |store| {
            ImportArchivePipeline::new(store, self.converters, user)
                .import_portable(reader, filename, None)
        })
    }

    /// Import an archive as a new version of the app `app_model_id`.
    pub fn import_new_version<R: Read>(
        &self,
        app_model_id: &str,
        reader: R,
        filename: &str,
        user: &User,
    ) -> Result<Model, AppError> {
        self.run("import app archive", app_model_id, |store| {
            let existing = store.get_required(app_model_id)?;
            if existing.model_type != ModelType::App {
                return Err(AppError::bad_request(format!(
                    "model {app_model_id} is a {}, not an app definition",
                    existing.model_type
                )));
            }
            ImportArchivePipeline::new(store, self.converters, user)
                .import_portable(reader, filename, Some(&existing))
        })
    }

    /// Snapshot a new version of the app and deploy it.
    pub fn publish(&self, app_model_id: &str, comment: &str, user: &User) -> Result<Model, AppError> {
        self.run("publish app", app_model_id, |store| {
            let app = store.get_required(app_model_id)?;
            self.publisher.publish(store, comment, &app, user)
        })
    }

    fn run<R>(
        &self,
        operation: &'static str,
        subject: &str,
        f: impl FnOnce(&S) -> Result<R, AppError>,
    ) -> Result<R, AppError> {
        self.store.in_transaction(f).inspect_err(|err| {
            if !err.is_caller_error() {
                match std::error::Error::source(err) {
                    Some(cause) => tracing::error!(operation, subject, error = %err, cause = %cause, "operation failed"),
                    None => tracing::error!(operation, subject, error = %err, "operation failed"),
                }
            }
        })
    }
}
