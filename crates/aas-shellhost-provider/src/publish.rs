//! The outward event boundary.
//!
//! The provider publishes change and value events through an
//! [`EventPublisher`] capability; how a payload reaches a broker is
//! entirely the transport's business. Topic structure:
//!
//! `aas-shellhost/v1/{submodel_id_b64}/submodelElements/{idShortPath}/{kind}`
//!
//! The idShortPath is percent-encoded so it occupies a single topic
//! level.

use aas_shellhost_core::{decode_idshort_path, encode_id_base64url, encode_idshort_path};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Protocol version for the topic scheme.
pub const PROTOCOL_VERSION: &str = "v1";

/// Delivery guarantee requested from the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Qos {
    /// Fire and forget
    AtMostOnce,
    /// Delivered at least once
    AtLeastOnce,
    /// Delivered exactly once
    ExactlyOnce,
}

/// A transport capability the provider publishes through.
pub trait EventPublisher: Send + Sync {
    /// Publish one serialized event.
    ///
    /// # Errors
    ///
    /// Returns an error when the transport rejects the publication.
    fn publish(&self, topic: &str, payload: &[u8], qos: Qos, retain: bool)
        -> Result<(), PublishError>;
}

/// Errors crossing the publish boundary.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PublishError {
    /// No transport is attached to the provider.
    #[error("no event transport attached")]
    NoTransport,
    /// The event payload failed to serialize.
    #[error("event encode error: {0}")]
    Encode(String),
    /// The transport reported a failure.
    #[error("transport error: {0}")]
    Transport(String),
}

/// One event as handed to delegates and the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    /// Unique message identifier
    pub message_id: Uuid,
    /// Topic the message is published under
    pub topic: String,
    /// When the event was raised
    pub timestamp: DateTime<Utc>,
    /// idShortPath of the element the event concerns
    pub source_path: String,
    /// Event payload
    pub payload: serde_json::Value,
}

impl EventMessage {
    /// A new event message raised now.
    #[must_use]
    pub fn new(topic: String, source_path: String, payload: serde_json::Value) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            topic,
            timestamp: Utc::now(),
            source_path,
            payload,
        }
    }

    /// Serialize for the transport.
    ///
    /// # Errors
    ///
    /// Returns an encode error if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, PublishError> {
        serde_json::to_vec(self).map_err(|e| PublishError::Encode(e.to_string()))
    }
}

/// Kinds of events the provider publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicKind {
    /// Element was created
    Created,
    /// Element was updated
    Updated,
    /// Element was deleted
    Deleted,
    /// An element's value changed through set-binding
    ValueChanged,
    /// An explicitly published event
    Event,
}

impl TopicKind {
    fn suffix(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::ValueChanged => "valueChanged",
            Self::Event => "event",
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "created" => Some(Self::Created),
            "updated" => Some(Self::Updated),
            "deleted" => Some(Self::Deleted),
            "valueChanged" => Some(Self::ValueChanged),
            "event" => Some(Self::Event),
            _ => None,
        }
    }
}

/// Topic builder and parser for one submodel.
#[derive(Debug, Clone)]
pub struct EventTopics {
    prefix: String,
    submodel_id_b64: String,
}

impl EventTopics {
    /// A topic scheme for the given submodel identifier.
    #[must_use]
    pub fn new(submodel_id: &str) -> Self {
        Self {
            prefix: "aas-shellhost".to_string(),
            submodel_id_b64: encode_id_base64url(submodel_id),
        }
    }

    fn base(&self, path: &str) -> String {
        format!(
            "{}/{}/{}/submodelElements/{}",
            self.prefix,
            PROTOCOL_VERSION,
            self.submodel_id_b64,
            encode_idshort_path(path)
        )
    }

    /// Topic for one event kind on one element path.
    #[must_use]
    pub fn element(&self, path: &str, kind: TopicKind) -> String {
        format!("{}/{}", self.base(path), kind.suffix())
    }

    /// Topic for value-changed notifications on one element path.
    #[must_use]
    pub fn value_changed(&self, path: &str) -> String {
        self.element(path, TopicKind::ValueChanged)
    }

    /// Wildcard subscription for everything under this submodel.
    #[must_use]
    pub fn submodel_wildcard(&self) -> String {
        format!("{}/{}/{}/#", self.prefix, PROTOCOL_VERSION, self.submodel_id_b64)
    }

    /// Parse a topic back into `(idShortPath, kind)`.
    #[must_use]
    pub fn parse(&self, topic: &str) -> Option<(String, TopicKind)> {
        let expected_prefix = format!(
            "{}/{}/{}/submodelElements/",
            self.prefix, PROTOCOL_VERSION, self.submodel_id_b64
        );
        let remainder = topic.strip_prefix(&expected_prefix)?;
        let (encoded_path, suffix) = remainder.split_once('/')?;
        let kind = TopicKind::from_suffix(suffix)?;
        let path = decode_idshort_path(encoded_path).ok()?;
        Some((path, kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_generation() {
        let topics = EventTopics::new("urn:example:sm:data");
        let topic = topics.value_changed("Motor/Rpm");

        assert!(topic.starts_with("aas-shellhost/v1/"));
        assert!(topic.ends_with("/valueChanged"));
        // The path occupies exactly one topic level
        assert!(topic.contains("/submodelElements/Motor%2FRpm/"));
    }

    #[test]
    fn topic_parse_roundtrip() {
        let topics = EventTopics::new("urn:example:sm:data");
        for kind in [
            TopicKind::Created,
            TopicKind::Updated,
            TopicKind::Deleted,
            TopicKind::ValueChanged,
            TopicKind::Event,
        ] {
            let topic = topics.element("Motor/Rpm", kind);
            let (path, parsed) = topics.parse(&topic).unwrap();
            assert_eq!(path, "Motor/Rpm");
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn foreign_topics_rejected() {
        let topics = EventTopics::new("urn:example:sm:data");
        assert!(topics.parse("aas-shellhost/v1/other/submodelElements/X/created").is_none());
        assert!(topics
            .parse(&format!("{}/unknownKind", topics.base("X")))
            .is_none());
    }

    #[test]
    fn event_message_serializes() {
        let message = EventMessage::new(
            "t".to_string(),
            "Motor/Rpm".to_string(),
            serde_json::json!({"value": 1}),
        );
        let bytes = message.to_bytes().unwrap();
        let decoded: EventMessage = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded.source_path, "Motor/Rpm");
        assert_eq!(decoded.message_id, message.message_id);
    }
}
