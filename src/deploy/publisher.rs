//! Publishing an app to the deployment endpoint.

use super::transport::{DeploymentRequest, DeploymentTransport};
use crate::archive::ExportArchiveBuilder;
use crate::config::DeploymentConfig;
use crate::convert::Converters;
use crate::error::AppError;
use crate::model::{Model, ModelType, ModelUpdate, User};
use crate::store::ModelStore;

/// Status the endpoint answers a successful deployment with.
pub const DEPLOYED: u16 = 201;

/// Snapshots an app, builds its deployable archive and uploads it.
pub struct DeploymentPublisher<T: DeploymentTransport> {
    transport: T,
    config: DeploymentConfig,
    converters: Converters,
}

impl<T: DeploymentTransport> DeploymentPublisher<T> {
    pub fn new(transport: T, config: DeploymentConfig, converters: Converters) -> Self {
        Self {
            transport,
            config,
            converters,
        }
    }

    pub fn config(&self) -> &DeploymentConfig {
        &self.config
    }

    /// Publish `app_model`. Returns the new app version.
    ///
    /// Nothing is retried: a local build failure, a transport failure or any
    /// status other than 201 is an internal error.
    pub fn publish<S: ModelStore>(
        &self,
        store: &S,
        comment: &str,
        app_model: &Model,
        user: &User,
    ) -> Result<Model, AppError> {
        if app_model.model_type != ModelType::App {
            return Err(AppError::bad_request(format!(
                "model {} is a {}, only app definitions can be published",
                app_model.key, app_model.model_type
            )));
        }

        let app = store.save_as_new_version(
            &app_model.id,
            ModelUpdate::unchanged(app_model, comment),
            user,
        )?;
        let archive = ExportArchiveBuilder::new(store, self.converters)
            .export_deployable_model(app.clone())?;

        let mut query = vec![
            ("deploymentKey".to_string(), app.key.clone()),
            ("deploymentName".to_string(), app.name.clone()),
        ];
        if let Some(tenant) = &user.tenant_id {
            query.push(("tenantId".to_string(), tenant.clone()));
        }
        let request = DeploymentRequest {
            url: self.config.deployment_url(),
            user: self.config.user.clone(),
            password: self.config.password.clone(),
            query,
            file_name: format!("{}.zip", app.key),
            archive,
        };

        tracing::debug!(app = %app.key, url = %request.url, bytes = request.archive.len(), "deploying app");
        let response = self.transport.send(request).map_err(|e| {
            AppError::internal_with(format!("could not deploy app {}", app.key), e)
        })?;
        if response.status != DEPLOYED {
            return Err(AppError::internal(format!(
                "deployment of app {} failed with status {}: {}",
                app.key, response.status, response.body
            )));
        }

        tracing::info!(app = %app.key, version = app.version, "published app");
        Ok(app)
    }
}
