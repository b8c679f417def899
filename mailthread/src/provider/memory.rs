//! # Memory provider
//!
//! In-memory mail provider, useful for tests and dry runs. Messages
//! are never delivered: they are recorded and grouped into
//! conversations the way a webmail would, using the `In-Reply-To`
//! header.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, trace};

use super::{
    Conversation, GetConversation, GetRawHeaders, Message, SearchConversations, SendMessage,
    StartConversation,
};
use crate::{headers, message::OutgoingMessage, AnyResult};

const DOMAIN: &str = "memory.localhost";

#[derive(Debug, Default)]
struct State {
    conversations: Vec<Conversation>,
    raw_headers: HashMap<String, String>,
    sent: Vec<OutgoingMessage>,
    next_id: usize,
    hidden: Vec<String>,
    fail_lookups: bool,
    fail_sends: bool,
    fail_starts: bool,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn find_conversation(&self, id: &str) -> Option<&Conversation> {
        if self.hidden.iter().any(|hidden| hidden == id) {
            return None;
        }

        self.conversations.iter().find(|conv| conv.id == id)
    }

    /// Find the conversation containing a message with the given
    /// Message-ID.
    fn find_conversation_by_message_id(&self, message_id: &str) -> Option<usize> {
        self.conversations.iter().position(|conv| {
            conv.messages.iter().any(|msg| {
                self.raw_headers
                    .get(&msg.id)
                    .and_then(|raw| headers::parse_message_id(raw))
                    .is_some_and(|id| id == message_id)
            })
        })
    }

    /// Record the given message, returning the created provider
    /// message.
    fn record(&mut self, msg: &OutgoingMessage) -> Message {
        let id = self.next_id("msg");

        let mut raw = format!(
            "Message-ID: <{id}@{DOMAIN}>\nTo: {}\nSubject: {}\n",
            msg.to, msg.subject
        );
        for (key, val) in &msg.headers {
            raw.push_str(&format!("{key}: {val}\n"));
        }

        self.raw_headers.insert(id.clone(), raw);
        self.sent.push(msg.clone());

        Message::new(id).with_date(Utc::now())
    }
}

/// The in-memory mail provider.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    state: Mutex<State>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert an existing conversation along with the raw header
    /// blocks of its messages, indexed by message identifier.
    ///
    /// Messages without raw header block behave like messages whose
    /// raw content cannot be read.
    pub fn insert_conversation(
        &self,
        conv: Conversation,
        raw_headers: impl IntoIterator<Item = (impl ToString, impl ToString)>,
    ) {
        let mut state = self.state();
        for (id, raw) in raw_headers {
            state.raw_headers.insert(id.to_string(), raw.to_string());
        }
        state.conversations.push(conv);
    }

    /// Make the given conversation invisible to lookups and searches,
    /// as if it was deleted.
    pub fn hide_conversation(&self, id: impl ToString) {
        self.state().hidden.push(id.to_string());
    }

    /// Make lookups and searches fail.
    pub fn set_fail_lookups(&self, fail: bool) {
        self.state().fail_lookups = fail;
    }

    /// Make replies fail.
    pub fn set_fail_sends(&self, fail: bool) {
        self.state().fail_sends = fail;
    }

    /// Make new conversations fail.
    pub fn set_fail_starts(&self, fail: bool) {
        self.state().fail_starts = fail;
    }

    /// Return all the messages sent so far, oldest first.
    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.state().sent.clone()
    }

    /// Return the conversation matching the given identifier, hidden
    /// ones included.
    pub fn conversation(&self, id: &str) -> Option<Conversation> {
        self.state()
            .conversations
            .iter()
            .find(|conv| conv.id == id)
            .cloned()
    }

    pub fn conversations_count(&self) -> usize {
        self.state().conversations.len()
    }
}

#[async_trait]
impl GetConversation for MemoryProvider {
    async fn get_conversation(&self, id: &str) -> AnyResult<Option<Conversation>> {
        debug!("getting memory conversation {id}");
        let state = self.state();

        if state.fail_lookups {
            return Err(format!("cannot get conversation {id}: lookup disabled").into());
        }

        Ok(state.find_conversation(id).cloned())
    }
}

#[async_trait]
impl SearchConversations for MemoryProvider {
    async fn search_conversations(&self, query: &str) -> AnyResult<Vec<Conversation>> {
        debug!("searching memory conversations matching {query:?}");
        let state = self.state();

        if state.fail_lookups {
            return Err(format!("cannot search conversations {query:?}: lookup disabled").into());
        }

        Ok(state.find_conversation(query).cloned().into_iter().collect())
    }
}

#[async_trait]
impl GetRawHeaders for MemoryProvider {
    async fn get_raw_headers(&self, msg: &Message) -> AnyResult<String> {
        trace!("getting raw headers of memory message {}", msg.id);

        self.state()
            .raw_headers
            .get(&msg.id)
            .cloned()
            .ok_or_else(|| format!("cannot get raw content of message {}", msg.id).into())
    }
}

#[async_trait]
impl SendMessage for MemoryProvider {
    async fn send_message(&self, msg: &OutgoingMessage) -> AnyResult<()> {
        debug!("sending memory message to {}", msg.to);
        let mut state = self.state();

        if state.fail_sends {
            return Err(format!("cannot send message to {}: send disabled", msg.to).into());
        }

        if msg.to.is_empty() {
            return Err("cannot send message: invalid recipient".into());
        }

        let parent = msg
            .in_reply_to()
            .map(|id| id.trim_start_matches('<').trim_end_matches('>').to_owned())
            .and_then(|id| state.find_conversation_by_message_id(&id));

        let sent = state.record(msg);

        match parent {
            Some(idx) => state.conversations[idx].messages.push(sent),
            None => {
                let id = state.next_id("thread");
                let conv = Conversation::new(id, &msg.subject).with_message(sent);
                state.conversations.push(conv);
            }
        }

        Ok(())
    }
}

#[async_trait]
impl StartConversation for MemoryProvider {
    async fn start_conversation(&self, msg: &OutgoingMessage) -> AnyResult<String> {
        debug!("starting memory conversation with {}", msg.to);
        let mut state = self.state();

        if state.fail_starts {
            let err = format!("cannot start conversation with {}: quota exceeded", msg.to);
            return Err(err.into());
        }

        if msg.to.is_empty() {
            return Err("cannot start conversation: invalid recipient".into());
        }

        let sent = state.record(msg);
        let id = state.next_id("thread");
        let conv = Conversation::new(&id, &msg.subject)
            .with_labels(["inbox"])
            .with_message(sent);
        state.conversations.push(conv);

        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        headers::ThreadingMetadata,
        message::OutgoingMessage,
        provider::{GetConversation, SendMessage, StartConversation},
    };

    use super::MemoryProvider;

    #[tokio::test]
    async fn replies_join_parent_conversation() {
        let provider = MemoryProvider::new();

        let msg = OutgoingMessage::new("g@x.com", "S", "first");
        let id = provider.start_conversation(&msg).await.unwrap();

        let headers = ThreadingMetadata::new("msg-1@memory.localhost").to_reply_headers();
        let reply =
            OutgoingMessage::new("g@x.com", "Re: S", "second").with_reply_headers(&headers);
        provider.send_message(&reply).await.unwrap();

        let conv = provider.get_conversation(&id).await.unwrap().unwrap();
        assert_eq!(conv.message_count(), 2);
        assert_eq!(provider.conversations_count(), 1);
    }

    #[tokio::test]
    async fn hidden_conversation_is_not_found() {
        let provider = MemoryProvider::new();
        let msg = OutgoingMessage::new("g@x.com", "S", "first");
        let id = provider.start_conversation(&msg).await.unwrap();

        provider.hide_conversation(&id);

        assert_eq!(provider.get_conversation(&id).await.unwrap(), None);
        assert!(provider.conversation(&id).is_some());
    }
}
