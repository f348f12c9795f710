//! Common trait for native model formats.

use super::ConversionError;
use crate::rewrite::{EditorJson, IdResolved, KeyInfoMap, KeyNormalized};

/// Pure transforms between editor JSON, a typed native model and XML.
///
/// Converters only ever read key-normalized JSON, so the XML they render and
/// the native model they build never carry store ids. Re-encoding to JSON
/// resolves keys against the destination store and yields content the store
/// accepts.
///
/// ```text
///  EditorJson<KeyNormalized> ──json_to_native──▶ Native ──native_to_xml──▶ bytes
///                                                  │
///                                    native_to_json(keys)
///                                                  ▼
///                                     EditorJson<IdResolved>
/// ```
pub trait NativeFormatConverter {
    /// Typed model this converter decodes into.
    type Native;

    /// Human-readable name of the format.
    fn name(&self) -> &'static str;

    /// File extension of the rendered XML.
    fn extension(&self) -> &'static str;

    fn json_to_native(
        &self,
        json: &EditorJson<KeyNormalized>,
    ) -> Result<Self::Native, ConversionError>;

    fn native_to_json(
        &self,
        native: &Self::Native,
        keys: &KeyInfoMap,
    ) -> Result<EditorJson<IdResolved>, ConversionError>;

    fn native_to_xml(&self, native: &Self::Native) -> Result<Vec<u8>, ConversionError>;

    /// Decode and render in one step.
    fn json_to_xml(&self, json: &EditorJson<KeyNormalized>) -> Result<Vec<u8>, ConversionError> {
        let native = self.json_to_native(json)?;
        self.native_to_xml(&native)
    }

    /// Decode and re-encode against a destination key map.
    fn reencode(
        &self,
        json: &EditorJson<KeyNormalized>,
        keys: &KeyInfoMap,
    ) -> Result<EditorJson<IdResolved>, ConversionError> {
        let native = self.json_to_native(json)?;
        self.native_to_json(&native, keys)
    }
}
