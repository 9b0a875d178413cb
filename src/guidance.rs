//! Prompt assembly for the generation call.
//!
//! Two fixed layers feed the model:
//!
//! 1. **System block** ([`SYSTEM_PROMPT`]) — the deep-mode instruction set
//!    defining the five-section emoji-marked reply format, compiled into the
//!    binary from `prompts/ultra-deep-mode.md`.
//! 2. **User block** ([`build_user_prompt`]) — per-request context: detected
//!    sentiment, the matching [`GenerationGuidance`] record, the literal
//!    situation text, and a prior-session note when history exists.
//!
//! Guidance records are a static per-sentiment table; no runtime mutation.

use crate::sentiment::Sentiment;

/// The fixed deep-mode instruction block sent as the system message on every
/// generation request (~400 words). Defines the 💬/🎬/💡/✨/🌟 reply
/// structure the parser and validator downstream depend on.
pub const SYSTEM_PROMPT: &str = include_str!("../prompts/ultra-deep-mode.md");

/// Narrative-framing instructions injected into the user block for one
/// detected sentiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationGuidance {
    /// What kind of scene the model should reach for.
    pub focus: &'static str,
    /// Emotional register of the reply.
    pub tone: &'static str,
    /// Scene archetype, one line.
    pub scene_type: &'static str,
    /// Calibration examples (never to be echoed verbatim).
    pub examples: &'static str,
}

const NEUTRAL_GUIDANCE: GenerationGuidance = GenerationGuidance {
    focus: "Analyze the situation deeply and choose the most relevant movie scene regardless of emotional tone.",
    tone: "Match the tone to the hidden emotional undercurrent you detect.",
    scene_type: "Most situationally precise moment",
    examples: "Any universally known film with clear parallel to their situation",
};

/// Per-sentiment guidance records. Read-only; initialized at compile time.
const GUIDANCE_TABLE: &[(Sentiment, GenerationGuidance)] = &[
    (
        Sentiment::Despair,
        GenerationGuidance {
            focus: "Choose the most POWERFUL comeback/resilience movie scene showing someone rising from rock bottom.",
            tone: "Be emotionally resonant but inject fierce hope. Acknowledge the darkness while illuminating the way forward.",
            scene_type: "Rock bottom to breakthrough moment",
            examples: "Pursuit of Happyness (bathroom scene), Rocky (meat locker training), Shawshank Redemption (Andy escaping)",
        },
    ),
    (
        Sentiment::Anxiety,
        GenerationGuidance {
            focus: "Choose a movie scene about someone facing paralyzing fear but taking action anyway.",
            tone: "Be calming yet empowering. Normalize their fear while showing courage isn't absence of fear.",
            scene_type: "Fear confrontation moment",
            examples: "Finding Nemo (Dory \"just keep swimming\"), Harry Potter (facing Boggart), The King's Speech (final speech)",
        },
    ),
    (
        Sentiment::Anger,
        GenerationGuidance {
            focus: "Choose a movie scene about channeling rage into purposeful action or finding peace.",
            tone: "Be understanding and validating. Show anger as energy that can be transformed.",
            scene_type: "Anger transformation moment",
            examples: "Peaceful Warrior (gas station wisdom), Good Will Hunting (breakthrough scene), Lion King (Simba's return)",
        },
    ),
    (
        Sentiment::Sadness,
        GenerationGuidance {
            focus: "Choose a movie scene about hope emerging from profound loss or disappointment.",
            tone: "Be gentle and compassionate. Honor the grief while planting seeds of renewal.",
            scene_type: "Hope in darkness moment",
            examples: "Inside Out (sadness and joy), Up (moving forward montage), Dead Poets Society (standing on desks)",
        },
    ),
    (
        Sentiment::Confusion,
        GenerationGuidance {
            focus: "Choose a movie scene about someone finding clarity, purpose, or their true path.",
            tone: "Provide direction with conviction. Show that confusion precedes breakthrough.",
            scene_type: "Clarity revelation moment",
            examples: "The Matrix (red pill/blue pill), Eat Pray Love (finding purpose), Soul (finding spark)",
        },
    ),
    (
        Sentiment::Hope,
        GenerationGuidance {
            focus: "Choose a movie scene that validates their optimism and shows the next step toward manifestation.",
            tone: "Be energizing and strategic. Convert hope into actionable momentum.",
            scene_type: "Dream to action moment",
            examples: "The Greatest Showman (tight rope), La La Land (audition scene), Hidden Figures (NASA calculation)",
        },
    ),
    (
        Sentiment::Determination,
        GenerationGuidance {
            focus: "Choose a movie scene showing unwavering commitment paying off or strategy in action.",
            tone: "Be fierce and tactical. Reinforce their resolve with specific next moves.",
            scene_type: "Breakthrough from persistence moment",
            examples: "Whiplash (final performance), Million Dollar Baby (training), Moneyball (trusting the system)",
        },
    ),
    (Sentiment::Neutral, NEUTRAL_GUIDANCE),
];

/// Fixed coda closing every user block.
const ACTIVATION_BLOCK: &str = "\
ULTRA DEEP MODE ACTIVATED:
- This movie scene must be an almost PERFECT parallel to their situation
- Every word must serve emotional resonance or actionable transformation
- The user should feel: \"This AI truly understands my struggle AND sees my potential\"
- Dig beneath surface details to address the core psychological challenge";

/// Look up the guidance record for a sentiment. Total: every label has a
/// table entry; an unmatched label falls back to the neutral record.
#[must_use]
pub fn guidance_for(sentiment: Sentiment) -> &'static GenerationGuidance {
    GUIDANCE_TABLE
        .iter()
        .find(|(s, _)| *s == sentiment)
        .map(|(_, g)| g)
        .unwrap_or(&NEUTRAL_GUIDANCE)
}

/// Assembles the per-request user block.
///
/// Sections in order: context header (sentiment upper-cased plus guidance
/// fields), the quoted situation, an optional prior-session note, the
/// activation coda. Sections are joined with blank lines; the note is
/// skipped entirely when `prior_sessions` is zero.
#[must_use]
pub fn build_user_prompt(situation: &str, sentiment: Sentiment, prior_sessions: usize) -> String {
    let guidance = guidance_for(sentiment);

    let header = format!(
        "DEEP CONTEXT ANALYSIS:\n\
         Primary Emotion Detected: {}\n\
         Guidance: {}\n\
         Tone Instruction: {}\n\
         Scene Type Needed: {}\n\
         Reference Examples (for calibration only): {}",
        sentiment.as_str().to_uppercase(),
        guidance.focus,
        guidance.tone,
        guidance.scene_type,
        guidance.examples,
    );
    let situation_line = format!("USER'S SITUATION: \"{situation}\"");
    let history_note = format!(
        "CONTEXT: User has {prior_sessions} previous sessions. Build on their journey."
    );

    let mut parts: Vec<&str> = Vec::with_capacity(5);
    parts.push(&header);
    parts.push(&situation_line);
    if prior_sessions > 0 {
        parts.push(&history_note);
    }
    parts.push(ACTIVATION_BLOCK);
    parts.push("BEGIN DEEP ANALYSIS AND RESPOND:");
    parts.join("\n\n")
}
