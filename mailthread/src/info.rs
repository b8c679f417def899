//! # Thread info
//!
//! Module dedicated to the read-only diagnostic projection of a
//! conversation stream, see
//! [`ThreadedSender::get_thread_info`](crate::sender::ThreadedSender::get_thread_info).

use std::fmt;

use chrono::{DateTime, Utc};

use crate::provider::Conversation;

/// The live state of the current conversation.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    feature = "derive",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub struct ConversationInfo {
    pub subject: String,
    pub message_count: usize,
    pub first_message_date: Option<DateTime<Utc>>,
    pub last_message_date: Option<DateTime<Utc>>,
    pub labels: Vec<String>,
}

impl From<&Conversation> for ConversationInfo {
    fn from(conv: &Conversation) -> Self {
        Self {
            subject: conv.subject.clone(),
            message_count: conv.message_count(),
            first_message_date: conv.first_message().and_then(|msg| msg.date),
            last_message_date: conv.last_message().and_then(|msg| msg.date),
            labels: conv.labels.clone(),
        }
    }
}

/// The diagnostic projection of a conversation stream.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    feature = "derive",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub struct ThreadInfo {
    pub persistence_key: String,
    pub current_thread_id: Option<String>,
    pub previous_thread_id: Option<String>,
    pub archived_thread_id: Option<String>,
    pub archived_at: Option<DateTime<Utc>>,

    /// The live conversation, when the current identifier still
    /// resolves.
    pub conversation: Option<ConversationInfo>,

    /// The error met while inspecting the stream, if any.
    pub error: Option<String>,
}

impl ThreadInfo {
    pub fn new(persistence_key: impl ToString) -> Self {
        Self {
            persistence_key: persistence_key.to_string(),
            ..Default::default()
        }
    }

    pub fn has_current_thread(&self) -> bool {
        self.current_thread_id.is_some()
    }

    /// Return `true` if the current identifier no longer resolves to
    /// a conversation.
    pub fn is_broken(&self) -> bool {
        self.current_thread_id.is_some() && self.conversation.is_none()
    }
}

impl fmt::Display for ThreadInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let none = "none";

        writeln!(f, "key: {}", self.persistence_key)?;
        writeln!(
            f,
            "current: {}",
            self.current_thread_id.as_deref().unwrap_or(none)
        )?;
        writeln!(
            f,
            "previous: {}",
            self.previous_thread_id.as_deref().unwrap_or(none)
        )?;
        write!(
            f,
            "archived: {}",
            self.archived_thread_id.as_deref().unwrap_or(none)
        )?;
        if let Some(date) = self.archived_at {
            write!(f, " ({})", date.to_rfc3339())?;
        }

        if let Some(conv) = &self.conversation {
            writeln!(f)?;
            writeln!(f, "subject: {}", conv.subject)?;
            writeln!(f, "messages: {}", conv.message_count)?;
            if let Some(date) = conv.first_message_date {
                writeln!(f, "first message: {}", date.to_rfc3339())?;
            }
            if let Some(date) = conv.last_message_date {
                writeln!(f, "last message: {}", date.to_rfc3339())?;
            }
            write!(f, "labels: {}", conv.labels.join(", "))?;
        }

        if let Some(err) = &self.error {
            writeln!(f)?;
            write!(f, "error: {err}")?;
        }

        Ok(())
    }
}
