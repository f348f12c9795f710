//! Error types surfaced by app definition operations.
//!
//! Two classes exist: caller errors ([`AppError::BadRequest`],
//! [`AppError::NotFound`]) are reported verbatim, internal errors
//! ([`AppError::Internal`]) carry their cause and are logged once by the
//! [`service`](crate::service) facade.

use thiserror::Error;

use crate::convert::ConversionError;
use crate::store::StoreError;

type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by export, import and publish operations.
#[derive(Debug, Error)]
pub enum AppError {
    /// The caller supplied something unusable (bad file name, missing manifest, ...).
    #[error("{0}")]
    BadRequest(String),

    /// A referenced record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Anything the caller cannot fix: conversion, archive I/O, transport.
    #[error("{message}")]
    Internal {
        message: String,
        #[source]
        source: Option<BoxedCause>,
    },
}

impl AppError {
    /// Create a caller error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Create a not-found error.
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Create an internal error without an underlying cause.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Create an internal error wrapping its cause.
    pub fn internal_with<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Internal {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether this error was caused by the caller's input.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::BadRequest(_) | Self::NotFound { .. })
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::not_found("model", id),
            StoreError::Invalid(message) => Self::BadRequest(message),
            other => Self::internal_with("model store failure", other),
        }
    }
}

impl From<ConversionError> for AppError {
    fn from(err: ConversionError) -> Self {
        Self::internal_with("native format conversion failed", err)
    }
}

impl From<zip::result::ZipError> for AppError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::internal_with("archive error", err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::internal_with("archive I/O error", err)
    }
}
