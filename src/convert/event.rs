//! Event-registry documents derived from diagram bindings.
//!
//! A shape bound to the event registry (`eventkey`, optionally `channelkey`)
//! implies an event definition and a channel definition that the engine must
//! receive alongside the process or case. The deployable archive carries one
//! `event-{key}.event` and one `channel-{key}.channel` per distinct key.

use std::collections::BTreeMap;

use serde::Serialize;

use super::ConversionError;
use super::diagram::{DiagramModel, EventBinding, EventField, Shape};

/// Channel types the engine understands.
const CHANNEL_TYPES: &[&str] = &["jms", "kafka", "rabbit"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EventPayloadField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
}

impl From<&EventField> for EventPayloadField {
    fn from(field: &EventField) -> Self {
        Self {
            name: field.name.clone(),
            field_type: field.field_type.clone(),
        }
    }
}

/// `.event` document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDefinition {
    pub key: String,
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub correlation_parameters: Vec<EventPayloadField>,
    pub payload: Vec<EventPayloadField>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelDirection {
    Inbound,
    Outbound,
}

/// `.channel` document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelDefinition {
    pub key: String,
    pub category: &'static str,
    pub name: String,
    pub channel_type: String,
    #[serde(rename = "type")]
    pub direction: ChannelDirection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deserializer_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serializer_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_event_key_detection: Option<EventKeyDetection>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventKeyDetection {
    pub fixed_value: String,
}

/// Event and channel definitions collected across one or more diagrams,
/// keyed and ordered by key.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventRegistryDocuments {
    pub events: BTreeMap<String, EventDefinition>,
    pub channels: BTreeMap<String, ChannelDefinition>,
}

impl EventRegistryDocuments {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.channels.is_empty()
    }

    /// Add the documents of another diagram; the first definition of a key wins.
    pub fn merge(&mut self, other: EventRegistryDocuments) {
        for (key, event) in other.events {
            self.events.entry(key).or_insert(event);
        }
        for (key, channel) in other.channels {
            self.channels.entry(key).or_insert(channel);
        }
    }
}

/// Derives [`EventRegistryDocuments`] from diagram bindings.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventRegistryConverter;

impl EventRegistryConverter {
    pub fn discover(&self, diagram: &DiagramModel) -> EventRegistryDocuments {
        let mut documents = EventRegistryDocuments::default();
        for shape in diagram.all_shapes() {
            let Some(binding) = &shape.event else {
                continue;
            };
            documents
                .events
                .entry(binding.event_key.clone())
                .or_insert_with(|| event_definition(binding));
            if let Some(channel_key) = &binding.channel_key {
                documents
                    .channels
                    .entry(channel_key.clone())
                    .or_insert_with(|| channel_definition(shape, binding, channel_key));
            }
        }
        documents
    }

    pub fn event_to_bytes(&self, event: &EventDefinition) -> Result<Vec<u8>, ConversionError> {
        Ok(serde_json::to_vec_pretty(event)?)
    }

    pub fn channel_to_bytes(
        &self,
        channel: &ChannelDefinition,
    ) -> Result<Vec<u8>, ConversionError> {
        if !CHANNEL_TYPES.contains(&channel.channel_type.as_str()) {
            return Err(ConversionError::invalid_property(format!(
                "channel {} has unsupported type {}",
                channel.key, channel.channel_type
            )));
        }
        Ok(serde_json::to_vec_pretty(channel)?)
    }
}

fn event_definition(binding: &EventBinding) -> EventDefinition {
    EventDefinition {
        key: binding.event_key.clone(),
        name: binding
            .event_name
            .clone()
            .unwrap_or_else(|| binding.event_key.clone()),
        correlation_parameters: binding
            .correlation_parameters
            .iter()
            .map(EventPayloadField::from)
            .collect(),
        payload: binding.payload.iter().map(EventPayloadField::from).collect(),
    }
}

fn direction_of(stencil: &str) -> ChannelDirection {
    if stencil.starts_with("Start") || stencil.contains("Catch") || stencil.contains("Receive") {
        ChannelDirection::Inbound
    } else if stencil.contains("Listener") {
        // Case event listeners wait for an incoming event.
        ChannelDirection::Inbound
    } else {
        ChannelDirection::Outbound
    }
}

fn channel_definition(shape: &Shape, binding: &EventBinding, key: &str) -> ChannelDefinition {
    let direction = direction_of(&shape.stencil);
    let (deserializer_type, serializer_type, detection) = match direction {
        ChannelDirection::Inbound => (
            Some("json"),
            None,
            Some(EventKeyDetection {
                fixed_value: binding.event_key.clone(),
            }),
        ),
        ChannelDirection::Outbound => (None, Some("json"), None),
    };
    ChannelDefinition {
        key: key.to_string(),
        category: "channel",
        name: binding.channel_name.clone().unwrap_or_else(|| key.to_string()),
        channel_type: binding
            .channel_type
            .clone()
            .unwrap_or_else(|| "jms".to_string()),
        direction,
        destination: binding.channel_destination.clone(),
        deserializer_type,
        serializer_type,
        channel_event_key_detection: detection,
    }
}
