//! # Threaded sender
//!
//! Module dedicated to sending recurring messages into a single,
//! persistent conversation. The main structure of this module is
//! [`ThreadedSender`].
//!
//! On each send, the sender either replies into the conversation
//! whose identifier is persisted in the store, or starts a new
//! conversation and persists its identifier:
//!
//! ```text
//! [start] --has persisted id?--> [try reply] --ok--> [done: true]
//!    |no                              |fail
//!    v                                v
//! [create new] <---------------------+
//!    |
//!    v
//! [done: true/false]
//! ```
//!
//! Replies are sent with the direct-send primitive of the provider,
//! explicitly addressed to the configured recipients. This way a
//! group address keeps receiving every message, even when the last
//! message of the conversation was sent by a single member.

use std::{fmt, sync::Arc};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::{
    config::{SendOptions, ThreadingConfig},
    info::{ConversationInfo, ThreadInfo},
    message::OutgoingMessage,
    provider::MailProvider,
    resolver::{ResolveThread, ThreadResolver},
    store::{self, PersistedThreadState, StateKeys, ThreadStore},
    subject::format_reply_subject,
    Error, Result,
};

/// The threaded sender.
///
/// The sender holds no state between calls: the only state it relies
/// on is the conversation identifier persisted in the store.
pub struct ThreadedSender<P: MailProvider> {
    provider: Arc<P>,
    store: Arc<dyn ThreadStore>,
    resolver: Arc<dyn ResolveThread>,
}

impl<P: MailProvider> Clone for ThreadedSender<P> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            store: self.store.clone(),
            resolver: self.resolver.clone(),
        }
    }
}

impl<P: MailProvider + 'static> ThreadedSender<P> {
    /// Create a new sender using the default [`ThreadResolver`].
    pub fn new(provider: Arc<P>, store: Arc<dyn ThreadStore>) -> Self {
        let resolver = Arc::new(ThreadResolver::new(provider.clone()));

        Self {
            provider,
            store,
            resolver,
        }
    }
}

impl<P: MailProvider> ThreadedSender<P> {
    /// Replace the thread resolver, using the builder pattern.
    pub fn with_resolver(mut self, resolver: impl ResolveThread + 'static) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn store(&self) -> &dyn ThreadStore {
        self.store.as_ref()
    }

    /// Send the given HTML body into the conversation of the given
    /// configuration.
    ///
    /// Returns `true` when the message has been sent, either as a
    /// reply or as the first message of a new conversation. This
    /// never fails: errors are logged and reported as `false`.
    pub async fn send_threaded(&self, body: &str, config: &ThreadingConfig) -> bool {
        self.send_threaded_with_options(body, config, SendOptions::default())
            .await
    }

    /// Same as [`ThreadedSender::send_threaded`], with options.
    pub async fn send_threaded_with_options(
        &self,
        body: &str,
        config: &ThreadingConfig,
        opts: SendOptions,
    ) -> bool {
        progress(config, format_args!("sending threaded message"));

        let keys = StateKeys::new(&config.persistence_key);

        let current = match store::get(self.store(), &keys.current).await {
            Ok(id) => id,
            Err(err) => {
                warn!("cannot read thread identifier, aborting: {err}");
                debug!("{err:?}");
                return false;
            }
        };

        match current.as_deref() {
            Some(_) if opts.force_new_thread => {
                progress(config, format_args!("new conversation forced"));
            }
            Some(id) => match self.try_reply(id, body, config).await {
                Ok(()) => {
                    progress(config, format_args!("reply sent to conversation {id}"));
                    return true;
                }
                Err(err) => {
                    warn!("cannot reply to conversation {id}, starting a new one: {err}");
                    debug!("{err:?}");
                }
            },
            None => {
                progress(config, format_args!("no conversation yet"));
            }
        }

        match self.create_new(body, config, current.as_deref()).await {
            Ok(id) => {
                progress(config, format_args!("new conversation {id} started"));
                true
            }
            Err(err) => {
                warn!("cannot start new conversation: {err}");
                debug!("{err:?}");
                false
            }
        }
    }

    /// Reply into the conversation matching the given identifier.
    ///
    /// The reply carries the `In-Reply-To` and `References` headers
    /// of the first message of the conversation, and is addressed to
    /// the configured recipients. Nothing is persisted.
    pub async fn try_reply(&self, id: &str, body: &str, config: &ThreadingConfig) -> Result<()> {
        debug!("trying to reply to conversation {id}");

        let conv = self
            .resolver
            .resolve(id)
            .await
            .ok_or_else(|| Error::FindConversationError(id.to_owned()))?;

        let meta = self.resolver.extract_threading_metadata(&conv).await?;
        let headers = meta.to_reply_headers();
        debug!("reply headers: {headers:?}");

        let subject = format_reply_subject(&config.subject);
        let msg = OutgoingMessage::new(config.recipients.clone(), subject, body)
            .with_reply_headers(&headers);

        self.provider
            .send_message(&msg)
            .await
            .map_err(|err| Error::SendReplyError(err, id.to_owned()))
    }

    /// Start a new conversation and persist its identifier.
    ///
    /// The given identifier being replaced, if any, is archived as
    /// the previous one. Nothing is written to the store unless the
    /// message has been sent.
    pub async fn create_new(
        &self,
        body: &str,
        config: &ThreadingConfig,
        replaced: Option<&str>,
    ) -> Result<String> {
        debug!("starting new conversation with subject {:?}", config.subject);
        let keys = StateKeys::new(&config.persistence_key);

        let msg = OutgoingMessage::new(config.recipients.clone(), &config.subject, body);

        let id = self
            .provider
            .start_conversation(&msg)
            .await
            .map_err(|err| Error::StartConversationError(err, config.subject.clone()))?;

        if id.trim().is_empty() {
            return Err(Error::EmptyConversationIdError);
        }

        if let Some(prev) = replaced {
            debug!("archiving replaced conversation {prev}");
            if let Err(err) = store::set(self.store(), &keys.previous, prev).await {
                warn!("cannot archive replaced conversation {prev}: {err}");
            }
        }

        store::set(self.store(), &keys.current, &id).await?;

        Ok(id)
    }

    /// Forget the current conversation, so that the next send starts
    /// a new one.
    ///
    /// The current identifier is archived along with the date of the
    /// reset. Returns `false` when there was nothing to reset.
    pub async fn reset_threading(&self, config: &ThreadingConfig) -> Result<bool> {
        let keys = StateKeys::new(&config.persistence_key);

        let Some(id) = store::get(self.store(), &keys.current).await? else {
            progress(config, format_args!("no conversation to reset"));
            return Ok(false);
        };

        store::set(self.store(), &keys.archived, &id).await?;
        store::set(self.store(), &keys.archived_at, &Utc::now().to_rfc3339()).await?;
        store::delete(self.store(), &keys.current).await?;

        progress(config, format_args!("conversation {id} archived"));
        Ok(true)
    }

    /// Inspect the conversation stream of the given configuration.
    ///
    /// This never mutates the store, and never fails: errors are
    /// captured into [`ThreadInfo::error`].
    pub async fn get_thread_info(&self, config: &ThreadingConfig) -> ThreadInfo {
        let mut info = ThreadInfo::new(&config.persistence_key);

        let state = match PersistedThreadState::load(self.store(), &config.persistence_key).await {
            Ok(state) => state,
            Err(err) => {
                info.error = Some(err.to_string());
                return info;
            }
        };

        info.current_thread_id = state.current_thread_id;
        info.previous_thread_id = state.previous_thread_id;
        info.archived_thread_id = state.archived_thread_id;
        info.archived_at = state.archived_at;

        if let Some(id) = &info.current_thread_id {
            match self.resolver.resolve(id).await {
                Some(conv) => info.conversation = Some(ConversationInfo::from(&conv)),
                None => info.error = Some(Error::FindConversationError(id.clone()).to_string()),
            }
        }

        info
    }

    /// Same as [`ThreadedSender::send_threaded`], retrying the whole
    /// send with an exponential backoff until it succeeds or the
    /// attempts are exhausted.
    #[cfg(feature = "tokio")]
    pub async fn send_threaded_with_retry(
        &self,
        body: &str,
        config: &ThreadingConfig,
        retry_config: crate::retry::RetryConfig,
    ) -> bool {
        use crate::retry::{Retry, RetryState};

        let mut retry = Retry::new(retry_config);

        loop {
            if self.send_threaded(body, config).await {
                return true;
            }

            match retry.next() {
                RetryState::Retry(delay) => {
                    warn!("send attempt {} failed, retrying in {delay:?}", retry.attempts);
                    tokio::time::sleep(delay).await;
                }
                RetryState::Exhausted => {
                    warn!("send failed after {} attempt(s)", retry.attempts);
                    return false;
                }
            }
        }
    }
}

/// Log a progress line, at info level when logging is enabled for
/// the given configuration.
fn progress(config: &ThreadingConfig, msg: fmt::Arguments<'_>) {
    if config.logging_enabled {
        info!(key = %config.persistence_key, version = %config.version_tag(), "{msg}");
    } else {
        debug!(key = %config.persistence_key, "{msg}");
    }
}
