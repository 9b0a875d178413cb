//! Heuristic quality scoring for raw model replies.
//!
//! Four sub-metrics, each on a 0–10 scale, weighted into one final score:
//!
//! - **word count** (0.20) — 10 up to 100 words of cleaned text, then a
//!   continuous decay of 1 point per 10 words over, floored at 0.
//! - **format** (0.30) — binary 10/5 on whether all five section markers are
//!   present in the raw text.
//! - **emotional resonance** (0.25) — distinct empathy-lexicon words found
//!   in the cleaned text, 2 points each, capped.
//! - **situational precision** (0.25) — overlap between the reply and the
//!   first five distinct >4-char fragments of the situation, 3 points each,
//!   capped. Fragments keep their punctuation and match as substrings, so
//!   short common words can hit incidentally; that looseness is accepted.
//!
//! Total function: any pair of inputs yields a score in `[0, 10]` rounded to
//! one decimal.

use regex::Regex;
use std::sync::LazyLock;

/// Empathy lexicon for the resonance sub-metric. Substring matching means
/// derived forms ("feeling", "struggles") count for their stem.
const EMPATHY_LEXICON: &[&str] = &[
    "understand",
    "feel",
    "struggle",
    "journey",
    "challenge",
    "overcome",
    "strength",
    "courage",
];

static EMOJI_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("💬|🎬|💡|✨|🌟").expect("valid emoji marker pattern"));
static SECTION_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Quote:|Movie Scene:|Deep Meaning:|Actionable Path:|Affirmation:")
        .expect("valid section label pattern")
});
static FORMAT_QUOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)💬\s*Quote:").expect("valid quote format pattern"));
static FORMAT_SCENE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)🎬\s*Movie Scene:").expect("valid scene format pattern"));

/// The four sub-metric values before weighting, each in `[0, 10]`.
///
/// Exposed separately so callers (and the request log) can see which axis
/// dragged a reply down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubScores {
    pub word_count: f64,
    pub format: f64,
    pub emotional_resonance: f64,
    pub situational_precision: f64,
}

impl SubScores {
    /// Weighted total, rounded to one decimal place.
    #[must_use]
    pub fn weighted_total(&self) -> f64 {
        let total = 0.2 * self.word_count
            + 0.3 * self.format
            + 0.25 * self.emotional_resonance
            + 0.25 * self.situational_precision;
        (total * 10.0).round() / 10.0
    }
}

/// Score a raw reply against the situation that prompted it.
///
/// Equivalent to [`sub_scores`] followed by [`SubScores::weighted_total`].
#[must_use]
pub fn score(raw: &str, situation: &str) -> f64 {
    sub_scores(raw, situation).weighted_total()
}

/// Compute the four sub-metrics for a raw reply.
#[must_use]
pub fn sub_scores(raw: &str, situation: &str) -> SubScores {
    let clean = clean_text(raw);
    let clean_lower = clean.to_lowercase();

    // 1. Word budget on the cleaned text.
    let words = clean.split_whitespace().count();
    let word_count = if words <= 100 {
        10.0
    } else {
        (10.0 - (words as f64 - 100.0) / 10.0).max(0.0)
    };

    // 2. All five markers present in the raw text.
    let has_all_sections = FORMAT_QUOTE_RE.is_match(raw)
        && FORMAT_SCENE_RE.is_match(raw)
        && raw.contains('💡')
        && raw.contains('✨')
        && raw.contains('🌟');
    let format = if has_all_sections { 10.0 } else { 5.0 };

    // 3. Distinct empathy-lexicon hits.
    let emotional_hits = EMPATHY_LEXICON
        .iter()
        .filter(|word| clean_lower.contains(*word))
        .count();
    let emotional_resonance = (emotional_hits as f64 * 2.0).min(10.0);

    // 4. Overlap with the situation's leading long fragments.
    let keywords = situation_keywords(situation);
    let precision_hits = keywords
        .iter()
        .filter(|kw| clean_lower.contains(kw.as_str()))
        .count();
    let situational_precision = (precision_hits as f64 * 3.0).min(10.0);

    SubScores {
        word_count,
        format,
        emotional_resonance,
        situational_precision,
    }
}

/// Raw text minus the five emoji markers and section labels, trimmed.
fn clean_text(raw: &str) -> String {
    let no_emoji = EMOJI_MARKER_RE.replace_all(raw, "");
    SECTION_LABEL_RE.replace_all(&no_emoji, "").trim().to_owned()
}

/// First 5 distinct whitespace-delimited fragments longer than 4 characters
/// from the lower-cased situation. Punctuation stays attached ("time." is a
/// 5-character fragment and only matches with its period).
fn situation_keywords(situation: &str) -> Vec<String> {
    let lower = situation.to_lowercase();
    let mut keywords: Vec<String> = Vec::with_capacity(5);
    for word in lower.split_whitespace() {
        if word.chars().count() > 4 && !keywords.iter().any(|k| k == word) {
            keywords.push(word.to_owned());
            if keywords.len() == 5 {
                break;
            }
        }
    }
    keywords
}
