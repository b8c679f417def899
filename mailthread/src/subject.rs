//! # Subject
//!
//! Module dedicated to reply subjects.

use once_cell::sync::Lazy;
use regex::Regex;

/// Regex used to trim out prefix(es) from a subject.
///
/// Everything starting by "Re:" (case and whitespace insensitive) is
/// considered a prefix.
static SUBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new("(?s)^(?i:\\s*re\\s*:\\s*)*(.*)$").unwrap());

/// Trim out prefix(es) from the given subject.
pub fn trim_prefix(subject: &str) -> &str {
    match SUBJECT.captures(subject).and_then(|cap| cap.get(1)) {
        Some(subject) => subject.as_str(),
        None => subject,
    }
}

/// Format the subject of a reply.
///
/// Leading "Re:" prefixes are all stripped, then exactly one "Re: "
/// is prepended.
pub fn format_reply_subject(subject: &str) -> String {
    String::from("Re: ") + trim_prefix(subject)
}
