//! Heuristic sentiment classifier for user situation text.
//!
//! Maps a free-text situation to one of 8 emotional labels using two marker
//! layers per label:
//!
//! 1. **Keyword substrings** — each list entry found in the lower-cased text
//!    adds the label's full weight.
//! 2. **Phrase pattern** — one case-insensitive regex per label; a match adds
//!    1.5× the weight, rewarding intensified phrasings ("ready to give up")
//!    over bare keywords.
//!
//! The label with the strictly highest score wins; a total of zero falls back
//! to [`Sentiment::Neutral`]. Pure computation, no allocation beyond one
//! lower-cased copy of the input.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Emotional label assigned to one situation.
///
/// Declaration order doubles as the tie-break order: when two labels score
/// equally, the earlier variant wins. `Neutral` carries no markers and is
/// only ever produced as the zero-score fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Despair,
    Anxiety,
    Anger,
    Sadness,
    Confusion,
    Hope,
    Determination,
    Neutral,
}

impl Sentiment {
    /// Lower-case wire/storage label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Despair => "despair",
            Sentiment::Anxiety => "anxiety",
            Sentiment::Anger => "anger",
            Sentiment::Sadness => "sadness",
            Sentiment::Confusion => "confusion",
            Sentiment::Hope => "hope",
            Sentiment::Determination => "determination",
            Sentiment::Neutral => "neutral",
        }
    }

    /// Parse a storage label back to a variant. Unknown labels yield `None`;
    /// callers reading persisted rows fall back to `Neutral`.
    #[must_use]
    pub fn from_label(s: &str) -> Option<Self> {
        match s {
            "despair" => Some(Sentiment::Despair),
            "anxiety" => Some(Sentiment::Anxiety),
            "anger" => Some(Sentiment::Anger),
            "sadness" => Some(Sentiment::Sadness),
            "confusion" => Some(Sentiment::Confusion),
            "hope" => Some(Sentiment::Hope),
            "determination" => Some(Sentiment::Determination),
            "neutral" => Some(Sentiment::Neutral),
            _ => None,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Marker tables ───────────────────────────────────────────────────────

/// (sentiment, weight, keyword substrings, phrase pattern)
///
/// Table order is the tie-break order. Keywords are matched as plain
/// substrings of the lower-cased text, so short entries deliberately catch
/// derived forms ("hopeless" also contains "hope"; weights resolve the
/// overlap).
const MARKER_TABLE: &[(Sentiment, f32, &[&str], &str)] = &[
    (
        Sentiment::Despair,
        10.0,
        &[
            "give up",
            "hopeless",
            "can't go on",
            "no point",
            "worthless",
            "failed everything",
            "rock bottom",
            "end",
            "quit",
        ],
        r"(?i)lost everything|no way out|can't do this|ready to give up",
    ),
    (
        Sentiment::Anxiety,
        8.0,
        &[
            "worried",
            "scared",
            "nervous",
            "anxious",
            "terrified",
            "afraid",
            "panic",
            "stress",
            "overwhelmed",
        ],
        r"(?i)what if|so scared|can't sleep|constantly worry",
    ),
    (
        Sentiment::Anger,
        8.0,
        &[
            "angry",
            "furious",
            "hate",
            "unfair",
            "betrayed",
            "frustrated",
            "rage",
            "pissed",
        ],
        r"(?i)so angry|can't believe|betrayed me|makes me furious",
    ),
    (
        Sentiment::Sadness,
        7.0,
        &[
            "sad",
            "depressed",
            "heartbroken",
            "lonely",
            "empty",
            "loss",
            "grief",
            "miss",
        ],
        r"(?i)feel so sad|lost someone|heartbroken|can't stop crying",
    ),
    (
        Sentiment::Confusion,
        6.0,
        &[
            "confused",
            "lost",
            "don't know",
            "uncertain",
            "stuck",
            "directionless",
            "unclear",
        ],
        r"(?i)don't know what|so confused|lost and|which path",
    ),
    (
        Sentiment::Hope,
        5.0,
        &[
            "hope",
            "trying",
            "want to",
            "dream",
            "aspire",
            "believing",
            "optimistic",
        ],
        r"(?i)really want|dream of|hoping to|believe I can",
    ),
    (
        Sentiment::Determination,
        5.0,
        &[
            "will",
            "going to",
            "determined",
            "committed",
            "focused",
            "won't give up",
        ],
        r"(?i)I will|going to succeed|determined to|won't stop",
    ),
];

/// Phrase patterns compiled once, index-aligned with [`MARKER_TABLE`].
static MARKER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    MARKER_TABLE
        .iter()
        .map(|&(_, _, _, pattern)| Regex::new(pattern).expect("valid marker pattern"))
        .collect()
});

/// Classify the emotional tone of a situation.
///
/// Per label: `score = weight × keyword hits + weight × 1.5` when the phrase
/// pattern matches. The strictly highest score wins; ties resolve to the
/// earliest label in [`MARKER_TABLE`] order (despair, anxiety, anger,
/// sadness, confusion, hope, determination). A total score of zero returns
/// [`Sentiment::Neutral`].
///
/// Total function: any input, including empty or adversarial text, yields a
/// valid label. Deterministic for a given input.
#[must_use]
pub fn classify(text: &str) -> Sentiment {
    let lower = text.to_lowercase();

    let mut best = Sentiment::Neutral;
    let mut best_score = 0.0_f32;

    for (idx, &(sentiment, weight, keywords, _)) in MARKER_TABLE.iter().enumerate() {
        let hits = keywords.iter().filter(|kw| lower.contains(*kw)).count();
        let mut score = weight * hits as f32;
        if MARKER_PATTERNS[idx].is_match(text) {
            score += weight * 1.5;
        }
        if score > best_score {
            best_score = score;
            best = sentiment;
        }
    }

    best
}

// ── Tests ───────────────────────────────────────────────────────────────
