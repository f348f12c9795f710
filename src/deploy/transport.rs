//! Transport for deployable archives.

use thiserror::Error;

use crate::config::DeploymentConfig;

/// One multipart upload of a deployable archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeploymentRequest {
    pub url: String,
    pub user: String,
    pub password: String,
    /// Query parameters, in order.
    pub query: Vec<(String, String)>,
    /// File name of the multipart part.
    pub file_name: String,
    pub archive: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeploymentResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("deployment request failed: {0}")]
    Request(String),

    #[error("{0}")]
    Unsupported(String),
}

/// Sends a deployment request and returns whatever the endpoint answered.
///
/// Implementations do not interpret the status code.
pub trait DeploymentTransport {
    fn send(&self, request: DeploymentRequest) -> Result<DeploymentResponse, TransportError>;
}

impl<T: DeploymentTransport + ?Sized> DeploymentTransport for &T {
    fn send(&self, request: DeploymentRequest) -> Result<DeploymentResponse, TransportError> {
        (**self).send(request)
    }
}

/// Blocking HTTP transport.
///
/// Certificate validation is disabled.
#[derive(Debug, Clone)]
pub struct HttpDeploymentTransport {
    #[cfg(feature = "deploy")]
    client: reqwest::blocking::Client,
}

impl HttpDeploymentTransport {
    pub fn new(config: &DeploymentConfig) -> Result<Self, TransportError> {
        #[cfg(feature = "deploy")]
        {
            let client = reqwest::blocking::Client::builder()
                .danger_accept_invalid_certs(true)
                .timeout(std::time::Duration::from_secs(config.timeout_secs))
                .build()
                .map_err(|e| TransportError::Request(format!("Failed to create HTTP client: {e}")))?;
            Ok(Self { client })
        }
        #[cfg(not(feature = "deploy"))]
        {
            let _ = config;
            Ok(Self {})
        }
    }
}

impl DeploymentTransport for HttpDeploymentTransport {
    fn send(&self, request: DeploymentRequest) -> Result<DeploymentResponse, TransportError> {
        #[cfg(feature = "deploy")]
        {
            use reqwest::blocking::multipart::{Form, Part};

            let part = Part::bytes(request.archive)
                .file_name(request.file_name)
                .mime_str("application/zip")
                .map_err(|e| TransportError::Request(e.to_string()))?;
            let response = self
                .client
                .post(&request.url)
                .query(&request.query)
                .basic_auth(&request.user, Some(&request.password))
                .multipart(Form::new().part("file", part))
                .send()
                .map_err(|e| TransportError::Request(e.to_string()))?;
            let status = response.status().as_u16();
            let body = body_or_empty(status, response.text());
            Ok(DeploymentResponse { status, body })
        }
        #[cfg(not(feature = "deploy"))]
        {
            let _ = request;
            Err(TransportError::Unsupported(
                "HTTP deployment requires the 'deploy' feature".to_string(),
            ))
        }
    }
}

/// The response body, or an empty one when it could not be read. The status
/// alone decides the outcome of a deployment.
#[cfg(any(feature = "deploy", test))]
fn body_or_empty<E: std::fmt::Display>(status: u16, body: Result<String, E>) -> String {
    body.unwrap_or_else(|e| {
        tracing::warn!(status, error = %e, "could not read deployment response body");
        String::new()
    })
}
