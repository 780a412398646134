//! Ordered, append-only message log.

use chrono::{SubsecRound, Utc};
use mqa_core::types::{Message, Role};

/// The conversation transcript in insertion order.
///
/// `append` is the only way a message enters the log; messages are never
/// reordered, edited or deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageLog {
    messages: Vec<Message>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the log from restored history.
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// Stamp `text` with the current time and append it.
    ///
    /// The stamp is truncated to the millisecond precision history is
    /// stored with, so a restored log equals the live one.
    pub fn append(&mut self, text: impl Into<String>, role: Role) -> &Message {
        self.messages
            .push(Message::new(text, role, Utc::now().trunc_subsecs(3)));
        &self.messages[self.messages.len() - 1]
    }

    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    pub fn reset(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
