//! Native format converters.
//!
//! Each converter is a stateless unit value turning key-normalized editor
//! JSON into a typed native model, and that model into XML or back into
//! editor JSON:
//!
//! - **BPMN** - process diagrams ([`BpmnConverter`])
//! - **CMMN** - case diagrams ([`CmmnConverter`])
//! - **DMN** - decision tables ([`DmnConverter`])
//! - **Event registry** - `.event` / `.channel` documents discovered from
//!   diagram bindings ([`EventRegistryConverter`])
//!
//! The archive builder and import pipeline receive all of them bundled in a
//! [`Converters`] value.

pub mod bpmn;
pub mod cmmn;
pub mod diagram;
pub mod dmn;
mod error;
pub mod event;
mod format;
pub mod xml;

pub use bpmn::{BpmnConverter, BpmnModel};
pub use cmmn::{CmmnConverter, CmmnModel};
pub use diagram::{DiagramModel, EventBinding, KeyReference, Shape};
pub use dmn::{DecisionTable, DmnConverter, migrate_decision_table};
pub use error::ConversionError;
pub use event::{ChannelDefinition, EventDefinition, EventRegistryConverter, EventRegistryDocuments};
pub use format::NativeFormatConverter;

/// The full set of converters, passed explicitly to the archive stages.
#[derive(Debug, Clone, Copy, Default)]
pub struct Converters {
    pub bpmn: BpmnConverter,
    pub cmmn: CmmnConverter,
    pub dmn: DmnConverter,
    pub events: EventRegistryConverter,
}
