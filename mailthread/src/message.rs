//! # Outgoing message
//!
//! Module dedicated to messages handed to the mail provider. The main
//! structure of this module is [`OutgoingMessage`].

use mail_builder::{
    headers::{address::Address, raw::Raw},
    MessageBuilder,
};

use crate::{
    config::Recipients,
    headers::{ReplyHeaders, IN_REPLY_TO, REFERENCES},
    Error, Result,
};

/// A message ready to be dispatched by the mail provider.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct OutgoingMessage {
    /// The explicit destination of the message.
    pub to: Recipients,

    pub subject: String,

    /// The HTML body, opaque to this library.
    pub html_body: String,

    /// Additional headers, threading headers included.
    pub headers: Vec<(String, String)>,
}

impl OutgoingMessage {
    pub fn new(
        to: impl Into<Recipients>,
        subject: impl ToString,
        html_body: impl ToString,
    ) -> Self {
        Self {
            to: to.into(),
            subject: subject.to_string(),
            html_body: html_body.to_string(),
            headers: Vec::new(),
        }
    }

    /// Add an additional header, using the builder pattern.
    pub fn with_header(mut self, key: impl ToString, val: impl ToString) -> Self {
        self.headers.push((key.to_string(), val.to_string()));
        self
    }

    /// Add the `In-Reply-To` and `References` headers, using the
    /// builder pattern.
    pub fn with_reply_headers(mut self, headers: &ReplyHeaders) -> Self {
        self.headers.extend(headers.to_vec());
        self
    }

    /// Find the value of the given header, case insensitive.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn in_reply_to(&self) -> Option<&str> {
        self.header(IN_REPLY_TO)
    }

    pub fn references(&self) -> Option<&str> {
        self.header(REFERENCES)
    }

    /// Return `true` if the message carries threading headers.
    pub fn is_reply(&self) -> bool {
        self.in_reply_to().is_some()
    }

    /// Build a [`MessageBuilder`] out of the message.
    pub fn to_builder(&self) -> MessageBuilder<'_> {
        let to: Vec<Address> = self.to.iter().map(Address::from).collect();

        let mut builder = MessageBuilder::new()
            .to(Address::new_list(to))
            .subject(self.subject.as_str())
            .html_body(self.html_body.as_str());

        for (key, val) in &self.headers {
            builder = builder.header(key.as_str(), Raw::new(val.as_str()));
        }

        builder
    }

    /// Render the message as raw RFC 5322 bytes, for providers
    /// sending raw messages (SMTP, sendmail etc).
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        self.to_builder()
            .write_to_vec()
            .map_err(Error::RenderMessageError)
    }
}

#[cfg(test)]
mod tests {
    use crate::headers::ThreadingMetadata;

    use super::OutgoingMessage;

    #[test]
    fn reply_headers() {
        let headers = ThreadingMetadata::new("c@x.com")
            .with_references("<a@x.com>")
            .to_reply_headers();
        let msg =
            OutgoingMessage::new("g@x.com", "Re: S", "<p>hi</p>").with_reply_headers(&headers);

        assert!(msg.is_reply());
        assert_eq!(msg.in_reply_to(), Some("<c@x.com>"));
        assert_eq!(msg.header("references"), Some("<a@x.com> <c@x.com>"));
    }

    #[test]
    fn render_raw() {
        let headers = ThreadingMetadata::new("m1@x.com").to_reply_headers();
        let msg = OutgoingMessage::new(vec!["a@x.com", "b@x.com"], "Re: S", "<p>hi</p>")
            .with_reply_headers(&headers);

        let raw = String::from_utf8(msg.to_vec().unwrap()).unwrap();

        assert!(raw.contains("Subject: Re: S"));
        assert!(raw.contains("In-Reply-To: <m1@x.com>"));
        assert!(raw.contains("References: <m1@x.com>"));
        assert!(raw.contains("a@x.com"));
        assert!(raw.contains("b@x.com"));
        assert!(raw.contains("text/html"));
    }

    #[test]
    fn new_conversation_has_no_threading_headers() {
        let msg = OutgoingMessage::new("g@x.com", "S", "body");
        assert!(!msg.is_reply());
        assert_eq!(msg.references(), None);
    }
}
