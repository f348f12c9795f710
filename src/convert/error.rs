//! Error types for native format conversion.

use thiserror::Error;

/// Errors raised while converting editor JSON to native models or XML.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// JSON decoding or encoding error.
    #[error("JSON error: {0}")]
    Json(String),

    /// XML serialization error.
    #[error("XML error: {0}")]
    Xml(String),

    /// Missing required element or property.
    #[error("Missing required {kind}: {name}")]
    Missing { kind: &'static str, name: String },

    /// Invalid element or property value.
    #[error("Invalid {kind}: {message}")]
    Invalid { kind: &'static str, message: String },
}

impl ConversionError {
    /// Create a JSON error.
    pub fn json(message: impl Into<String>) -> Self {
        Self::Json(message.into())
    }

    /// Create an XML error.
    pub fn xml(message: impl Into<String>) -> Self {
        Self::Xml(message.into())
    }

    /// Create a missing property error.
    pub fn missing_property(name: impl Into<String>) -> Self {
        Self::Missing {
            kind: "property",
            name: name.into(),
        }
    }

    /// Create an invalid shape error.
    pub fn invalid_shape(message: impl Into<String>) -> Self {
        Self::Invalid {
            kind: "shape",
            message: message.into(),
        }
    }

    /// Create an invalid property error.
    pub fn invalid_property(message: impl Into<String>) -> Self {
        Self::Invalid {
            kind: "property",
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for ConversionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}
