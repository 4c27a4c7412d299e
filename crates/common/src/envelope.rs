//! The event envelope carried through the fan-out exchange.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::topology::EVENT_PUBLISHED;

/// A typed event with an opaque JSON payload.
///
/// On the wire this is the UTF-8 JSON object `{"type": ..., "payload": ...}`.
/// Decoding a serialized envelope yields an equal envelope, and serializing
/// that again yields the same bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Event type tag, e.g. `"order.created"`.
    #[serde(rename = "type")]
    pub event_type: String,

    /// Event body. Missing payloads decode as `null`.
    #[serde(default)]
    pub payload: Value,
}

impl EventEnvelope {
    /// Creates an envelope from a type tag and payload.
    pub fn new(event_type: impl Into<String>, payload: Value) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
        }
    }

    /// Builds an envelope from an arbitrary publish request body.
    ///
    /// An object with a string `type` keeps that type; its payload is the
    /// `payload` field when present, otherwise the remaining fields. Any
    /// other body is wrapped whole under the `event.published` type.
    pub fn from_publish_body(body: Value) -> Self {
        let mut fields = match body {
            Value::Object(fields) => fields,
            other => return Self::new(EVENT_PUBLISHED, other),
        };

        match fields.remove("type") {
            Some(Value::String(event_type)) => {
                let payload = match fields.remove("payload") {
                    Some(payload) => payload,
                    None => Value::Object(fields),
                };
                Self::new(event_type, payload)
            }
            Some(other) => {
                fields.insert("type".to_string(), other);
                Self::new(EVENT_PUBLISHED, Value::Object(fields))
            }
            None => Self::new(EVENT_PUBLISHED, Value::Object(fields)),
        }
    }

    /// Serializes the envelope to its wire form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decodes an envelope from its wire form.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Returns true if this envelope carries the given event type.
    pub fn is(&self, event_type: &str) -> bool {
        self.event_type == event_type
    }
}
