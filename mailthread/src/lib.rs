//! Rust library to keep recurring emails grouped into a single,
//! persistent conversation.
//!
//! The main purpose of this library is to send periodic updates
//! (reports, digests, notifications) to a fixed set of recipients,
//! while keeping them threaded into one conversation of the mail
//! provider. Recipients denoting a group address keep receiving every
//! message, even after a member replied to a single sender.
//!
//! This goal is achieved by exposing a
//! [`ThreadedSender`](crate::sender::ThreadedSender), which decides
//! on each send whether to reply into the persisted conversation or
//! to start a new one. The sender relies on two collaborators
//! injected by the caller:
//!
//! - a [`MailProvider`](crate::provider::MailProvider), which sends
//!   messages and exposes conversations and raw headers,
//! - a [`ThreadStore`](crate::store::ThreadStore), a durable
//!   key-value store holding the conversation identifier.
//!
//! See examples in the /tests folder.

pub mod config;
mod error;
pub mod headers;
pub mod info;
pub mod message;
pub mod provider;
pub mod resolver;
pub mod retry;
pub mod sender;
pub mod store;
pub mod subject;

#[doc(inline)]
pub use self::{
    config::{Recipients, SendOptions, ThreadingConfig},
    error::{AnyBoxedError, AnyResult, Error, Result},
    sender::ThreadedSender,
};
