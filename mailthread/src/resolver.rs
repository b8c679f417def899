//! # Thread resolver
//!
//! Module dedicated to turning a persisted identifier into a live
//! conversation, and into the metadata needed to reply to it. The
//! main structure of this module is [`ThreadResolver`]; alternative
//! strategies can be plugged into the
//! [`ThreadedSender`](crate::sender::ThreadedSender) by implementing
//! [`ResolveThread`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, trace, warn};

use crate::{
    headers::{self, ThreadingMetadata, DEFAULT_FALLBACK_DOMAIN},
    provider::{Conversation, MailProvider},
    Error, Result,
};

#[async_trait]
pub trait ResolveThread: Send + Sync {
    /// Resolve the conversation matching the given identifier.
    ///
    /// This never fails: provider errors are treated as a failed
    /// lookup, and `None` is returned when the conversation cannot be
    /// found.
    async fn resolve(&self, id: &str) -> Option<Conversation>;

    /// Extract the threading metadata of the given conversation.
    async fn extract_threading_metadata(&self, conv: &Conversation) -> Result<ThreadingMetadata>;
}

/// The default thread resolver.
///
/// Conversations are looked up by identifier first, then searched
/// using the identifier as query. Metadata is read from the raw
/// header block of the first message of the conversation only, since
/// the raw content of later messages is not reliable.
pub struct ThreadResolver<P: MailProvider> {
    provider: Arc<P>,

    /// Domain of the pseudo Message-ID synthesized when the raw
    /// header block does not expose one.
    fallback_domain: String,
}

impl<P: MailProvider> ThreadResolver<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            fallback_domain: DEFAULT_FALLBACK_DOMAIN.to_owned(),
        }
    }

    /// Set the fallback Message-ID domain, using the builder pattern.
    pub fn with_fallback_domain(mut self, domain: impl ToString) -> Self {
        self.fallback_domain = domain.to_string();
        self
    }

    pub fn fallback_domain(&self) -> &str {
        &self.fallback_domain
    }

    async fn get_by_id(&self, id: &str) -> Option<Conversation> {
        match self.provider.get_conversation(id).await {
            Ok(conv) => conv,
            Err(err) => {
                warn!("cannot get conversation {id}, trying search: {err}");
                debug!("{err:?}");
                None
            }
        }
    }

    async fn get_by_search(&self, id: &str) -> Option<Conversation> {
        match self.provider.search_conversations(id).await {
            Ok(convs) => convs.into_iter().next(),
            Err(err) => {
                warn!("cannot search conversation {id}: {err}");
                debug!("{err:?}");
                None
            }
        }
    }
}

#[async_trait]
impl<P: MailProvider> ResolveThread for ThreadResolver<P> {
    async fn resolve(&self, id: &str) -> Option<Conversation> {
        debug!("resolving conversation {id}");

        if let Some(conv) = self.get_by_id(id).await {
            trace!("conversation {id} found by identifier");
            return Some(conv);
        }

        if let Some(conv) = self.get_by_search(id).await {
            trace!("conversation {id} found by search");
            return Some(conv);
        }

        debug!("conversation {id} not found");
        None
    }

    async fn extract_threading_metadata(&self, conv: &Conversation) -> Result<ThreadingMetadata> {
        debug!("extracting threading metadata of conversation {}", conv.id);

        let first = conv
            .first_message()
            .ok_or_else(|| Error::FindFirstMessageError(conv.id.clone()))?;

        let raw = match self.provider.get_raw_headers(first).await {
            Ok(raw) => Some(raw),
            Err(err) => {
                warn!("cannot get raw headers of message {}: {err}", first.id);
                debug!("{err:?}");
                None
            }
        };

        if let Some(meta) = raw.as_deref().and_then(ThreadingMetadata::from_raw_headers) {
            trace!("first message id: {}", meta.first_message_id);
            return Ok(meta);
        }

        debug!("no message id in raw headers, synthesizing one");
        let id = headers::synthesize_message_id(&first.id, &self.fallback_domain)
            .ok_or_else(|| Error::ExtractMessageIdError(conv.id.clone()))?;
        let refs = raw.as_deref().and_then(headers::parse_references);

        Ok(ThreadingMetadata::new(id).with_some_references(refs))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use concat_with::concat_line;

    use super::{ResolveThread, ThreadResolver};
    use crate::{
        message::OutgoingMessage,
        provider::{
            memory::MemoryProvider, Conversation, GetConversation, GetRawHeaders, Message,
            SearchConversations, SendMessage, StartConversation,
        },
        AnyResult, Error,
    };

    fn provider_with(conv: Conversation, raw: Vec<(&str, &str)>) -> Arc<MemoryProvider> {
        let provider = MemoryProvider::new();
        provider.insert_conversation(conv, raw);
        Arc::new(provider)
    }

    #[test_log::test(tokio::test)]
    async fn resolve_by_id() {
        let conv = Conversation::new("t1", "S").with_message(Message::new("m1"));
        let resolver = ThreadResolver::new(provider_with(conv.clone(), vec![]));

        assert_eq!(resolver.resolve("t1").await, Some(conv));
        assert_eq!(resolver.resolve("t2").await, None);
    }

    #[test_log::test(tokio::test)]
    async fn resolve_swallows_provider_errors() {
        let conv = Conversation::new("t1", "S").with_message(Message::new("m1"));
        let provider = provider_with(conv, vec![]);
        provider.set_fail_lookups(true);

        assert_eq!(ThreadResolver::new(provider).resolve("t1").await, None);
    }

    /// Provider whose direct lookup never finds anything, while its
    /// search returns the given conversations.
    struct SearchOnlyProvider {
        lookup_fails: bool,
        found: Vec<Conversation>,
    }

    #[async_trait]
    impl GetConversation for SearchOnlyProvider {
        async fn get_conversation(&self, id: &str) -> AnyResult<Option<Conversation>> {
            if self.lookup_fails {
                Err(format!("cannot get conversation {id}").into())
            } else {
                Ok(None)
            }
        }
    }

    #[async_trait]
    impl SearchConversations for SearchOnlyProvider {
        async fn search_conversations(&self, _query: &str) -> AnyResult<Vec<Conversation>> {
            Ok(self.found.clone())
        }
    }

    #[async_trait]
    impl GetRawHeaders for SearchOnlyProvider {
        async fn get_raw_headers(&self, msg: &Message) -> AnyResult<String> {
            Err(format!("cannot get raw content of message {}", msg.id).into())
        }
    }

    #[async_trait]
    impl SendMessage for SearchOnlyProvider {
        async fn send_message(&self, _msg: &OutgoingMessage) -> AnyResult<()> {
            Err("cannot send message".into())
        }
    }

    #[async_trait]
    impl StartConversation for SearchOnlyProvider {
        async fn start_conversation(&self, _msg: &OutgoingMessage) -> AnyResult<String> {
            Err("cannot start conversation".into())
        }
    }

    #[test_log::test(tokio::test)]
    async fn resolve_by_search_picks_first_result() {
        let conv = Conversation::new("t9", "S").with_message(Message::new("m1"));
        let other = Conversation::new("t10", "Other").with_message(Message::new("m2"));

        for lookup_fails in [false, true] {
            let provider = Arc::new(SearchOnlyProvider {
                lookup_fails,
                found: vec![conv.clone(), other.clone()],
            });
            let resolver = ThreadResolver::new(provider);

            assert_eq!(resolver.resolve("t9").await, Some(conv.clone()));
        }
    }

    #[test_log::test(tokio::test)]
    async fn resolve_by_search_without_result() {
        let provider = Arc::new(SearchOnlyProvider {
            lookup_fails: false,
            found: vec![],
        });

        assert_eq!(ThreadResolver::new(provider).resolve("t9").await, None);
    }

    #[test_log::test(tokio::test)]
    async fn metadata_from_first_message() {
        let conv = Conversation::new("t1", "S")
            .with_message(Message::new("m1"))
            .with_message(Message::new("m2"));
        let raw = vec![
            (
                "m1",
                concat_line!(
                    "Message-ID: <c@x.com>",
                    "References: <a@x.com> <b@x.com>",
                    "Subject: S",
                ),
            ),
            ("m2", "Message-ID: <d@x.com>"),
        ];
        let resolver = ThreadResolver::new(provider_with(conv.clone(), raw));

        let meta = resolver.extract_threading_metadata(&conv).await.unwrap();

        assert_eq!(meta.first_message_id, "c@x.com");
        assert_eq!(meta.build_references(), "<a@x.com> <b@x.com> <c@x.com>");
    }

    #[test_log::test(tokio::test)]
    async fn metadata_synthesized_when_raw_headers_unavailable() {
        let conv = Conversation::new("t1", "S").with_message(Message::new("18c2f"));
        let resolver =
            ThreadResolver::new(provider_with(conv.clone(), vec![])).with_fallback_domain("x.com");

        let meta = resolver.extract_threading_metadata(&conv).await.unwrap();

        assert_eq!(meta.first_message_id, "18c2f@x.com");
        assert_eq!(meta.references, None);
    }

    #[test_log::test(tokio::test)]
    async fn metadata_incomplete() {
        let empty = Conversation::new("t1", "S");
        let resolver = ThreadResolver::new(provider_with(empty.clone(), vec![]));

        assert!(matches!(
            resolver.extract_threading_metadata(&empty).await,
            Err(Error::FindFirstMessageError(id)) if id == "t1"
        ));

        let conv = Conversation::new("t2", "S").with_message(Message::new(" "));
        assert!(matches!(
            resolver.extract_threading_metadata(&conv).await,
            Err(Error::ExtractMessageIdError(id)) if id == "t2"
        ));
    }
}
