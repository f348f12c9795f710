//! Small indenting XML writer shared by the BPMN, CMMN and DMN renderers.

use std::io::Cursor;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use super::ConversionError;

/// Attribute list; `None` values are skipped.
pub type Attrs<'a> = &'a [(&'a str, Option<&'a str>)];

pub struct XmlDocument {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl XmlDocument {
    /// Start a document with the XML declaration already written.
    pub fn new() -> Result<Self, ConversionError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(|e| ConversionError::xml(format!("Write error: {e}")))?;
        Ok(Self { writer })
    }

    fn element<'a>(name: &'a str, attrs: Attrs<'_>) -> BytesStart<'a> {
        let mut start = BytesStart::new(name);
        for (key, value) in attrs {
            if let Some(value) = value {
                start.push_attribute((*key, *value));
            }
        }
        start
    }

    pub fn start(&mut self, name: &str, attrs: Attrs<'_>) -> Result<(), ConversionError> {
        self.writer
            .write_event(Event::Start(Self::element(name, attrs)))
            .map_err(|e| ConversionError::xml(format!("Write error: {e}")))
    }

    pub fn end(&mut self, name: &str) -> Result<(), ConversionError> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(|e| ConversionError::xml(format!("Write error: {e}")))
    }

    pub fn empty(&mut self, name: &str, attrs: Attrs<'_>) -> Result<(), ConversionError> {
        self.writer
            .write_event(Event::Empty(Self::element(name, attrs)))
            .map_err(|e| ConversionError::xml(format!("Write error: {e}")))
    }

    /// `<name attrs>text</name>`, text escaped.
    pub fn text_element(
        &mut self,
        name: &str,
        attrs: Attrs<'_>,
        text: &str,
    ) -> Result<(), ConversionError> {
        self.start(name, attrs)?;
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(|e| ConversionError::xml(format!("Write error: {e}")))?;
        self.end(name)
    }

    pub fn finish(self) -> Vec<u8> {
        self.writer.into_inner().into_inner()
    }
}

/// XML ids must be NCNames: replace anything else with `_` and never start
/// with a digit.
pub fn sanitize_ncname(raw: &str) -> String {
    let mut out: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '.') {
        out.insert(0, '_');
    }
    out
}
