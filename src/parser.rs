//! Structured extraction of the five reply sections.
//!
//! The model is instructed to answer with five emoji-marked sections. Each
//! section is pulled out by its own regex applied to the whole raw text, so a
//! missing or mangled section never blocks the others. Labels are matched
//! case-sensitively (`Quote:` not `quote:`); the `Deep`, `Actionable`, and
//! `Affirmation:` label parts are optional. A capture runs lazily up to a
//! blank line, the next section's emoji, or end of text, across newlines.
//!
//! Total function: any input, including the empty string, parses to a
//! [`ParsedReply`] whose absent sections are empty strings.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Five-field decomposition of one raw model reply.
///
/// A field is the empty string when its marker was absent; that state is not
/// distinguishable from "marker present with empty content", and callers
/// treat both as "omit the section".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedReply {
    pub quote: String,
    pub movie_scene: String,
    pub deep_meaning: String,
    pub actionable_path: String,
    pub affirmation: String,
}

static QUOTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)💬\s*Quote:\s*(.+?)(?:\n\n|🎬|$)").expect("valid quote pattern")
});
static SCENE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)🎬\s*Movie Scene:\s*(.+?)(?:\n\n|💡|$)").expect("valid scene pattern")
});
static MEANING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)💡\s*(?:Deep\s*)?Meaning:\s*(.+?)(?:\n\n|✨|$)").expect("valid meaning pattern")
});
static PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)✨\s*(?:Actionable\s*)?Path:\s*(.+?)(?:\n\n|🌟|$)").expect("valid path pattern")
});
static AFFIRMATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)🌟\s*(?:Affirmation:\s*)?(.+?)$").expect("valid affirmation pattern")
});

/// Parse a raw reply into its five sections.
///
/// The five extractions are independent whole-text searches, not a
/// sequential scan, so section order in the reply does not matter and one
/// missing marker leaves the rest intact.
#[must_use]
pub fn parse(raw: &str) -> ParsedReply {
    ParsedReply {
        quote: extract(&QUOTE_RE, raw),
        movie_scene: extract(&SCENE_RE, raw),
        deep_meaning: extract(&MEANING_RE, raw),
        actionable_path: extract(&PATH_RE, raw),
        affirmation: extract(&AFFIRMATION_RE, raw),
    }
}

fn extract(re: &Regex, raw: &str) -> String {
    re.captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_owned())
        .unwrap_or_default()
}
