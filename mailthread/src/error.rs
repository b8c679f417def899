//! # Error
//!
//! Module dedicated to errors. It contains an [`Error`] enum based on
//! [`thiserror::Error`], a type alias [`Result`] and the boxed error
//! types returned by external collaborators (mail providers and
//! key-value stores).

use std::{error, result};

#[cfg(feature = "file-store")]
use std::{io, path::PathBuf};

use thiserror::Error;

/// The global `Result` alias of the library.
pub type Result<T> = result::Result<T, Error>;

/// The boxed error returned by mail providers and key-value stores.
///
/// Collaborators are implemented outside of this library, so their
/// errors cannot be known at compilation time.
pub type AnyBoxedError = Box<dyn error::Error + Send + Sync + 'static>;

/// The `Result` alias returned by mail providers and key-value
/// stores.
pub type AnyResult<T> = result::Result<T, AnyBoxedError>;

/// The global `Error` enum of the library.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot find conversation {0}")]
    FindConversationError(String),
    #[error("cannot find first message of conversation {0}")]
    FindFirstMessageError(String),
    #[error("cannot extract message id from first message of conversation {0}")]
    ExtractMessageIdError(String),
    #[error("cannot send reply into conversation {1}")]
    SendReplyError(#[source] AnyBoxedError, String),
    #[error("cannot start new conversation with subject `{1}`")]
    StartConversationError(#[source] AnyBoxedError, String),
    #[error("cannot start new conversation: provider returned an empty identifier")]
    EmptyConversationIdError,

    #[error("cannot get store value at key `{1}`")]
    GetStoreValueError(#[source] AnyBoxedError, String),
    #[error("cannot set store value at key `{1}`")]
    SetStoreValueError(#[source] AnyBoxedError, String),
    #[error("cannot delete store value at key `{1}`")]
    DeleteStoreValueError(#[source] AnyBoxedError, String),

    #[error("cannot render outgoing message")]
    RenderMessageError(#[source] std::io::Error),

    #[cfg(feature = "file-store")]
    #[error("cannot get default store directory")]
    GetStoreDirectoryError,
    #[cfg(feature = "file-store")]
    #[error("cannot create store directory at {1}")]
    CreateStoreDirectoryError(#[source] io::Error, PathBuf),
    #[cfg(feature = "file-store")]
    #[error("cannot open store file at {1}")]
    OpenStoreFileError(#[source] io::Error, PathBuf),
    #[cfg(feature = "file-store")]
    #[error("cannot lock store file at {1}")]
    LockStoreFileError(#[source] advisory_lock::FileLockError, PathBuf),
    #[cfg(feature = "file-store")]
    #[error("cannot unlock store file at {1}")]
    UnlockStoreFileError(#[source] advisory_lock::FileLockError, PathBuf),
    #[cfg(feature = "file-store")]
    #[error("cannot read store file at {1}")]
    ReadStoreFileError(#[source] io::Error, PathBuf),
    #[cfg(feature = "file-store")]
    #[error("cannot write store file at {1}")]
    WriteStoreFileError(#[source] io::Error, PathBuf),
    #[cfg(feature = "file-store")]
    #[error("cannot parse store file at {1}")]
    ParseStoreFileError(#[source] serde_json::Error, PathBuf),
    #[cfg(feature = "file-store")]
    #[error("cannot serialize store file at {1}")]
    SerializeStoreFileError(#[source] serde_json::Error, PathBuf),
}
