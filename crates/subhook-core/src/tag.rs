//! Handler tags.
//!
//! A [`Subhook`] names the messaging resource a handler wants to receive
//! from. It is a plain immutable value carried next to the handler it tags;
//! nothing is attached to the handler itself.
//!
//! ```rust,ignore
//! let tag = subhook("proj-1", "orders-sub");
//! let provisioned = subhook("proj-1", "orders-sub").with_topic("orders");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// The messaging-resource identity a handler is bound to.
///
/// `project` and `subscription` are always required. `topic` is only needed
/// when the subscription should be created on activation instead of
/// attaching to one that already exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subhook {
    project: String,
    subscription: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    topic: Option<String>,
}

impl Subhook {
    /// Creates a tag attaching to an existing subscription.
    pub fn new(project: impl Into<String>, subscription: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            subscription: subscription.into(),
            topic: None,
        }
    }

    /// Returns the tag with a topic, so activation provisions the
    /// subscription against it first.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Messaging namespace (e.g. a cloud project id).
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Subscription name within the project.
    pub fn subscription(&self) -> &str {
        &self.subscription
    }

    /// Topic to bind the subscription to, if any.
    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    /// Returns `true` when both the project and the subscription name are set.
    ///
    /// An empty topic counts as absent and does not make a tag incomplete.
    pub fn is_complete(&self) -> bool {
        !self.project.trim().is_empty() && !self.subscription.trim().is_empty()
    }

    /// Returns `true` when activation should provision the subscription.
    pub fn provisions(&self) -> bool {
        self.topic.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

impl fmt::Display for Subhook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project, self.subscription)?;
        if let Some(topic) = &self.topic {
            write!(f, " (topic {topic})")?;
        }
        Ok(())
    }
}

/// Shorthand for [`Subhook::new`].
pub fn subhook(project: impl Into<String>, subscription: impl Into<String>) -> Subhook {
    Subhook::new(project, subscription)
}
