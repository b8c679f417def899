//! # Threading headers
//!
//! Module dedicated to the RFC 2822 threading headers. It parses the
//! `Message-ID` and `References` headers out of a raw header block
//! and builds the `In-Reply-To` and `References` headers of a reply.
//!
//! The parser only understands unfolded header lines: a header value
//! continued on the next line is truncated to its first line.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

pub const IN_REPLY_TO: &str = "In-Reply-To";
pub const REFERENCES: &str = "References";

/// Domain used to synthesize a Message-ID when none can be read from
/// the raw header block.
pub const DEFAULT_FALLBACK_DOMAIN: &str = "mail.gmail.com";

/// Regex matching the `Message-ID` header, capturing the identifier
/// between angle brackets.
static MESSAGE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new("(?im)^message-id:[ \\t]*<([^>\\r\\n]+)>").unwrap());

/// Regex matching the `References` header, capturing the remainder
/// of the line.
static REFERENCES_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new("(?im)^references:[ \\t]*([^\\r\\n]*)").unwrap());

/// Extract the Message-ID (without angle brackets) from the given
/// raw header block.
pub fn parse_message_id(raw: &str) -> Option<String> {
    MESSAGE_ID
        .captures(raw)
        .and_then(|cap| cap.get(1))
        .map(|id| id.as_str().trim().to_owned())
        .filter(|id| !id.is_empty())
}

/// Extract the raw `References` value from the given raw header
/// block. A blank value is treated as absent.
pub fn parse_references(raw: &str) -> Option<String> {
    REFERENCES_LINE
        .captures(raw)
        .and_then(|cap| cap.get(1))
        .map(|refs| refs.as_str().trim().to_owned())
        .filter(|refs| !refs.is_empty())
}

/// Synthesize a pseudo Message-ID from a provider-native message
/// identifier.
pub fn synthesize_message_id(provider_id: &str, domain: &str) -> Option<String> {
    let provider_id = provider_id.trim();
    let provider_id = provider_id.trim_start_matches('<').trim_end_matches('>');

    if provider_id.is_empty() {
        None
    } else {
        Some(format!("{provider_id}@{domain}"))
    }
}

/// Wrap the given identifier with angle brackets.
pub fn wrap_id(id: &str) -> String {
    format!("<{id}>")
}

/// The threading metadata of a conversation.
///
/// This metadata is read from the first message of the conversation
/// and recomputed on every reply attempt.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ThreadingMetadata {
    /// The Message-ID of the first message, without angle brackets.
    pub first_message_id: String,

    /// The `References` value found on the first message, if any.
    pub references: Option<String>,
}

impl ThreadingMetadata {
    pub fn new(first_message_id: impl ToString) -> Self {
        Self {
            first_message_id: first_message_id.to_string(),
            references: None,
        }
    }

    pub fn with_references(mut self, refs: impl ToString) -> Self {
        self.references = Some(refs.to_string());
        self
    }

    pub fn with_some_references(mut self, refs: Option<impl ToString>) -> Self {
        self.references = refs.map(|refs| refs.to_string());
        self
    }

    /// Parse the threading metadata from a raw header block.
    pub fn from_raw_headers(raw: &str) -> Option<Self> {
        let id = parse_message_id(raw)?;
        Some(Self::new(id).with_some_references(parse_references(raw)))
    }

    /// Build the `References` chain of a reply.
    ///
    /// The chain starts with the existing `References` value (oldest
    /// first) and ends with the first message's Message-ID. Only the
    /// first message is referenced, intermediate messages are not.
    pub fn build_references(&self) -> String {
        let id = wrap_id(&self.first_message_id);

        match self.references.as_deref().map(str::trim) {
            Some(refs) if !refs.is_empty() => format!("{refs} {id}"),
            _ => id,
        }
    }

    /// Build the headers of a reply.
    pub fn to_reply_headers(&self) -> ReplyHeaders {
        ReplyHeaders {
            in_reply_to: wrap_id(&self.first_message_id),
            references: self.build_references(),
        }
    }
}

/// The threading headers of a reply.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ReplyHeaders {
    pub in_reply_to: String,
    pub references: String,
}

impl ReplyHeaders {
    /// Return the headers as (name, value) pairs.
    pub fn to_vec(&self) -> Vec<(String, String)> {
        vec![
            (IN_REPLY_TO.to_owned(), self.in_reply_to.clone()),
            (REFERENCES.to_owned(), self.references.clone()),
        ]
    }
}

impl fmt::Display for ReplyHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{IN_REPLY_TO}: {}", self.in_reply_to)?;
        write!(f, "{REFERENCES}: {}", self.references)
    }
}

#[cfg(test)]
mod tests {
    use concat_with::concat_line;

    use super::*;

    #[test]
    fn message_id_case_insensitive() {
        let raw = concat_line!(
            "From: a@x.com",
            "message-id: <m1@x.com>",
            "Subject: Hello",
        );

        assert_eq!(parse_message_id(raw), Some("m1@x.com".into()));
    }

    #[test]
    fn message_id_missing() {
        let raw = concat_line!("From: a@x.com", "Subject: Hello");
        assert_eq!(parse_message_id(raw), None);
        assert_eq!(ThreadingMetadata::from_raw_headers(raw), None);
    }

    #[test]
    fn message_id_not_matched_inside_value() {
        let raw = concat_line!("X-Original-Message-ID: <other@x.com>", "Subject: Hello");
        assert_eq!(parse_message_id(raw), None);
    }

    #[test]
    fn references_with_crlf() {
        let raw = "Message-ID: <c@x.com>\r\nReferences: <a@x.com> <b@x.com>\r\n\r\n";
        let meta = ThreadingMetadata::from_raw_headers(raw).unwrap();

        assert_eq!(meta.first_message_id, "c@x.com");
        assert_eq!(meta.references.as_deref(), Some("<a@x.com> <b@x.com>"));
    }

    #[test]
    fn blank_references_is_absent() {
        let raw = concat_line!("Message-ID: <c@x.com>", "References:   ");
        assert_eq!(parse_references(raw), None);
    }

    #[test]
    fn references_chain_append() {
        let meta = ThreadingMetadata::new("c").with_references("<a> <b>");
        assert_eq!(meta.build_references(), "<a> <b> <c>");
    }

    #[test]
    fn references_chain_single() {
        let headers = ThreadingMetadata::new("m1@x.com").to_reply_headers();

        assert_eq!(headers.in_reply_to, "<m1@x.com>");
        assert_eq!(headers.references, "<m1@x.com>");
        assert_eq!(
            headers.to_string(),
            "In-Reply-To: <m1@x.com>\nReferences: <m1@x.com>"
        );
    }

    #[test]
    fn synthesized_message_id() {
        assert_eq!(
            synthesize_message_id("18c2f", DEFAULT_FALLBACK_DOMAIN),
            Some("18c2f@mail.gmail.com".into())
        );
        assert_eq!(synthesize_message_id("  ", DEFAULT_FALLBACK_DOMAIN), None);
    }
}
