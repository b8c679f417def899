//! # Configuration
//!
//! Module dedicated to the threading configuration. The main
//! structure of this module is [`ThreadingConfig`], an immutable
//! value passed to every operation of the
//! [`ThreadedSender`](crate::sender::ThreadedSender).

use std::fmt;

/// The canonical delivery target of a conversation stream.
///
/// Recipients can be given as a single address or as a list of
/// addresses. Lists are normalized into one comma-joined string,
/// which is forced on every send, replies included.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    feature = "derive",
    derive(serde::Serialize, serde::Deserialize),
    serde(from = "RecipientsDef", into = "String")
)]
pub struct Recipients(String);

impl Recipients {
    /// Build recipients from a list of addresses.
    ///
    /// Addresses are trimmed, empty ones are dropped and the rest are
    /// joined with a comma.
    pub fn from_list(addrs: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        let addrs: Vec<String> = addrs
            .into_iter()
            .map(|addr| addr.as_ref().trim().to_owned())
            .filter(|addr| !addr.is_empty())
            .collect();
        Self(addrs.join(","))
    }

    /// Return the comma-joined recipients.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Iterate over the individual addresses.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0
            .split(',')
            .map(str::trim)
            .filter(|addr| !addr.is_empty())
    }
}

impl fmt::Display for Recipients {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Recipients {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<&str> for Recipients {
    fn from(addr: &str) -> Self {
        Self(addr.trim().to_owned())
    }
}

impl From<String> for Recipients {
    fn from(addr: String) -> Self {
        Self::from(addr.as_str())
    }
}

impl From<&String> for Recipients {
    fn from(addr: &String) -> Self {
        Self::from(addr.as_str())
    }
}

impl From<Vec<String>> for Recipients {
    fn from(addrs: Vec<String>) -> Self {
        Self::from_list(addrs)
    }
}

impl From<Vec<&str>> for Recipients {
    fn from(addrs: Vec<&str>) -> Self {
        Self::from_list(addrs)
    }
}

impl From<&[&str]> for Recipients {
    fn from(addrs: &[&str]) -> Self {
        Self::from_list(addrs)
    }
}

impl<const N: usize> From<[&str; N]> for Recipients {
    fn from(addrs: [&str; N]) -> Self {
        Self::from_list(addrs)
    }
}

impl From<Recipients> for String {
    fn from(rcpts: Recipients) -> Self {
        rcpts.0
    }
}

/// Serde representation of recipients: either a single address or a
/// list of addresses.
#[cfg(feature = "derive")]
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum RecipientsDef {
    One(String),
    Many(Vec<String>),
}

#[cfg(feature = "derive")]
impl From<RecipientsDef> for Recipients {
    fn from(def: RecipientsDef) -> Self {
        match def {
            RecipientsDef::One(addr) => Self::from(addr),
            RecipientsDef::Many(addrs) => Self::from(addrs),
        }
    }
}

/// The threading configuration.
///
/// Callers sharing the same persistence key share one conversation.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    feature = "derive",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub struct ThreadingConfig {
    /// The key naming the store slot holding the conversation
    /// identifier.
    pub persistence_key: String,

    /// The recipients of every message sent in the conversation.
    pub recipients: Recipients,

    /// The subject of new conversations.
    ///
    /// Replies derive their subject from this one, see
    /// [`format_reply_subject`](crate::subject::format_reply_subject).
    pub subject: String,

    /// Emit progress lines at info level.
    #[cfg_attr(feature = "derive", serde(default))]
    pub logging_enabled: bool,

    /// Free-form tag attached to progress lines.
    #[cfg_attr(feature = "derive", serde(default))]
    pub version_tag: Option<String>,
}

impl ThreadingConfig {
    pub fn new(
        persistence_key: impl ToString,
        recipients: impl Into<Recipients>,
        subject: impl ToString,
    ) -> Self {
        Self {
            persistence_key: persistence_key.to_string(),
            recipients: recipients.into(),
            subject: subject.to_string(),
            logging_enabled: false,
            version_tag: None,
        }
    }

    /// Enable or disable progress lines, using the builder pattern.
    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.logging_enabled = enabled;
        self
    }

    /// Set the version tag, using the builder pattern.
    pub fn with_version_tag(mut self, tag: impl ToString) -> Self {
        self.version_tag = Some(tag.to_string());
        self
    }

    /// Set some version tag, using the builder pattern.
    pub fn with_some_version_tag(mut self, tag: Option<impl ToString>) -> Self {
        self.version_tag = tag.map(|tag| tag.to_string());
        self
    }

    pub fn version_tag(&self) -> &str {
        self.version_tag.as_deref().unwrap_or("unversioned")
    }
}

/// Per-call options of
/// [`ThreadedSender::send_threaded_with_options`](crate::sender::ThreadedSender::send_threaded_with_options).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    feature = "derive",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub struct SendOptions {
    /// Skip the reply attempt and start a new conversation.
    ///
    /// The current identifier, if any, is archived as the previous
    /// one before being replaced.
    #[cfg_attr(feature = "derive", serde(default))]
    pub force_new_thread: bool,
}

impl SendOptions {
    pub fn with_force_new_thread(mut self, force: bool) -> Self {
        self.force_new_thread = force;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{Recipients, ThreadingConfig};

    #[test]
    fn recipients_from_single_address() {
        assert_eq!(Recipients::from(" group@x.com ").as_str(), "group@x.com");
    }

    #[test]
    fn recipients_from_list() {
        let rcpts = Recipients::from(vec!["a@x.com", " b@x.com", "", "  "]);
        assert_eq!(rcpts.as_str(), "a@x.com,b@x.com");
        assert_eq!(rcpts.iter().collect::<Vec<_>>(), vec!["a@x.com", "b@x.com"]);
    }

    #[test]
    fn recipients_empty() {
        assert!(Recipients::from(Vec::<String>::new()).is_empty());
        assert!(Recipients::from("  ").is_empty());
    }

    #[test]
    fn config_builder() {
        let config = ThreadingConfig::new("weekly", ["a@x.com", "b@x.com"], "Weekly report")
            .with_logging(true)
            .with_version_tag("v2");

        assert_eq!(config.persistence_key, "weekly");
        assert_eq!(config.recipients.as_str(), "a@x.com,b@x.com");
        assert_eq!(config.subject, "Weekly report");
        assert!(config.logging_enabled);
        assert_eq!(config.version_tag(), "v2");
    }
}
