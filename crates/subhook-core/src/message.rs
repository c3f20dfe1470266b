//! Messages delivered to subscription handlers.
//!
//! Acknowledgment is the handler's job. A backend that supports it attaches an
//! [`Acknowledger`] to every message it delivers; [`PubSubMessage::ack`] and
//! [`PubSubMessage::nack`] forward to it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use serde::de::DeserializeOwned;
use tracing::trace;

/// Receives ack / nack decisions for delivered messages.
pub trait Acknowledger: Send + Sync {
    /// Marks the message as processed.
    fn ack(&self, ack_id: &str);

    /// Asks the backend to redeliver the message.
    fn nack(&self, ack_id: &str);
}

/// One message delivered on a subscription.
#[derive(Clone)]
pub struct PubSubMessage {
    message_id: String,
    data: Vec<u8>,
    attributes: HashMap<String, String>,
    publish_time: SystemTime,
    delivery_attempt: u32,
    ack: Option<(String, Arc<dyn Acknowledger>)>,
}

impl PubSubMessage {
    /// Creates a message with no attributes and no acknowledger.
    pub fn new(message_id: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            message_id: message_id.into(),
            data: data.into(),
            attributes: HashMap::new(),
            publish_time: SystemTime::now(),
            delivery_attempt: 1,
            ack: None,
        }
    }

    /// Adds one attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Replaces all attributes.
    pub fn with_attributes(mut self, attributes: HashMap<String, String>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Sets the publish timestamp.
    pub fn with_publish_time(mut self, time: SystemTime) -> Self {
        self.publish_time = time;
        self
    }

    /// Sets the delivery attempt counter (1 for the first delivery).
    pub fn with_delivery_attempt(mut self, attempt: u32) -> Self {
        self.delivery_attempt = attempt;
        self
    }

    /// Attaches the acknowledgment channel for this delivery.
    pub fn with_acknowledger(
        mut self,
        ack_id: impl Into<String>,
        acknowledger: Arc<dyn Acknowledger>,
    ) -> Self {
        self.ack = Some((ack_id.into(), acknowledger));
        self
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Payload as UTF-8, or `None` when it is not valid UTF-8.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }

    /// Decodes the payload as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.data)
    }

    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn publish_time(&self) -> SystemTime {
        self.publish_time
    }

    pub fn delivery_attempt(&self) -> u32 {
        self.delivery_attempt
    }

    /// Acknowledges the message. A no-op when the backend attached no
    /// acknowledger.
    pub fn ack(&self) {
        match &self.ack {
            Some((id, acker)) => acker.ack(id),
            None => trace!(message_id = %self.message_id, "ack ignored, no acknowledger"),
        }
    }

    /// Negatively acknowledges the message so the backend may redeliver it.
    pub fn nack(&self) {
        match &self.ack {
            Some((id, acker)) => acker.nack(id),
            None => trace!(message_id = %self.message_id, "nack ignored, no acknowledger"),
        }
    }
}

impl fmt::Debug for PubSubMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PubSubMessage")
            .field("message_id", &self.message_id)
            .field("len", &self.data.len())
            .field("attributes", &self.attributes)
            .field("delivery_attempt", &self.delivery_attempt)
            .field("ackable", &self.ack.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        acked: Mutex<Vec<String>>,
        nacked: Mutex<Vec<String>>,
    }

    impl Acknowledger for Recorder {
        fn ack(&self, ack_id: &str) {
            self.acked.lock().push(ack_id.to_string());
        }

        fn nack(&self, ack_id: &str) {
            self.nacked.lock().push(ack_id.to_string());
        }
    }

    #[test]
    fn test_payload_views() {
        let msg = PubSubMessage::new("1", br#"{"order":7}"#.to_vec()).with_attribute("k", "v");
        assert_eq!(msg.text(), Some(r#"{"order":7}"#));
        assert_eq!(msg.attribute("k"), Some("v"));

        let value: serde_json::Value = msg.json().unwrap();
        assert_eq!(value["order"], 7);

        let binary = PubSubMessage::new("2", vec![0xff, 0xfe]);
        assert!(binary.text().is_none());
    }

    #[test]
    fn test_ack_forwards_to_acknowledger() {
        let recorder = Arc::new(Recorder::default());
        let msg = PubSubMessage::new("1", "hi").with_acknowledger("ack-1", recorder.clone());

        msg.ack();
        msg.nack();

        assert_eq!(*recorder.acked.lock(), vec!["ack-1".to_string()]);
        assert_eq!(*recorder.nacked.lock(), vec!["ack-1".to_string()]);
    }

    #[test]
    fn test_ack_without_acknowledger_is_noop() {
        PubSubMessage::new("1", "hi").ack();
    }
}
