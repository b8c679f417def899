//! # Mail provider
//!
//! Module dedicated to the mail provider consumed by this library.
//! Like backend features, each provider capability is exposed as its
//! own trait:
//!
//! - [`GetConversation`]
//! - [`SearchConversations`]
//! - [`GetRawHeaders`]
//! - [`SendMessage`]
//! - [`StartConversation`]
//!
//! Any type implementing all of them implements [`MailProvider`].

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{message::OutgoingMessage, AnyResult};

/// A message as seen by the mail provider.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Message {
    /// The provider-native identifier of the message.
    pub id: String,

    /// The date the message was sent or received.
    pub date: Option<DateTime<Utc>>,
}

impl Message {
    pub fn new(id: impl ToString) -> Self {
        Self {
            id: id.to_string(),
            date: None,
        }
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }
}

/// A provider-side conversation, also known as thread.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Conversation {
    /// The provider-assigned identifier of the conversation.
    pub id: String,

    /// The subject of the first message.
    pub subject: String,

    pub labels: Vec<String>,

    /// The messages of the conversation in chronological order: the
    /// first one is the oldest.
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn new(id: impl ToString, subject: impl ToString) -> Self {
        Self {
            id: id.to_string(),
            subject: subject.to_string(),
            labels: Vec::new(),
            messages: Vec::new(),
        }
    }

    pub fn with_labels(mut self, labels: impl IntoIterator<Item = impl ToString>) -> Self {
        self.labels = labels.into_iter().map(|label| label.to_string()).collect();
        self
    }

    pub fn with_message(mut self, msg: Message) -> Self {
        self.messages.push(msg);
        self
    }

    pub fn first_message(&self) -> Option<&Message> {
        self.messages.first()
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}

#[async_trait]
pub trait GetConversation: Send + Sync {
    /// Get the conversation matching the given identifier.
    ///
    /// Returns `None` when the provider does not know the
    /// identifier.
    async fn get_conversation(&self, id: &str) -> AnyResult<Option<Conversation>>;
}

#[async_trait]
pub trait SearchConversations: Send + Sync {
    /// Search conversations matching the given query.
    async fn search_conversations(&self, query: &str) -> AnyResult<Vec<Conversation>>;
}

#[async_trait]
pub trait GetRawHeaders: Send + Sync {
    /// Get the raw header block of the given message.
    async fn get_raw_headers(&self, msg: &Message) -> AnyResult<String>;
}

#[async_trait]
pub trait SendMessage: Send + Sync {
    /// Send the given message to its explicit recipients.
    ///
    /// Threading headers carried by the message must be sent as is.
    async fn send_message(&self, msg: &OutgoingMessage) -> AnyResult<()>;
}

#[async_trait]
pub trait StartConversation: Send + Sync {
    /// Send the given message as the first message of a new
    /// conversation, and return the identifier of that conversation.
    async fn start_conversation(&self, msg: &OutgoingMessage) -> AnyResult<String>;
}

/// The full mail provider contract.
pub trait MailProvider:
    GetConversation + SearchConversations + GetRawHeaders + SendMessage + StartConversation
{
}

impl<T> MailProvider for T where
    T: GetConversation + SearchConversations + GetRawHeaders + SendMessage + StartConversation
{
}
