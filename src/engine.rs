//! Coaching reply generation.
//!
//! Stitches the pipeline together: classify the situation, assemble the
//! prompt pair, make one completion call, then parse and score whatever
//! came back. The reply is returned even when it scores poorly; the
//! score tells the caller how well the provider followed the format.

use tracing::{info, warn};

use crate::error::Result;
use crate::guidance;
use crate::llm::{ChatMessage, LlmClient};
use crate::parser::{self, ParsedReply};
use crate::sentiment::{self, Sentiment};
use crate::validator;

/// A fully processed coaching reply.
#[derive(Debug, Clone)]
pub struct CoachReply {
    /// Raw reply text from the provider.
    pub raw: String,
    /// Sentiment the situation classified to.
    pub sentiment: Sentiment,
    /// Structured fields extracted from the raw reply.
    pub parsed: ParsedReply,
    /// Heuristic quality score, 0.0 to 10.0.
    pub validation_score: f64,
}

/// Reply generation engine.
#[derive(Debug, Clone)]
pub struct CoachEngine {
    client: LlmClient,
}

impl CoachEngine {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }

    /// The model name replies are generated with.
    pub fn model(&self) -> &str {
        self.client.model()
    }

    /// Generate a coaching reply for `situation`.
    ///
    /// `prior_sessions` is how many earlier sessions this user has; a
    /// non-zero count adds a journey note to the prompt. One completion
    /// call is made, with no retry on failure.
    pub async fn generate(&self, situation: &str, prior_sessions: usize) -> Result<CoachReply> {
        let sentiment = sentiment::classify(situation);
        info!(sentiment = %sentiment, prior_sessions, "classified situation");

        let user_prompt = guidance::build_user_prompt(situation, sentiment, prior_sessions);
        let messages = vec![
            ChatMessage::system(guidance::SYSTEM_PROMPT),
            ChatMessage::user(user_prompt),
        ];

        let raw = self.client.complete(messages).await?;
        if raw.trim().is_empty() {
            warn!("provider returned an empty reply");
        }

        let parsed = parser::parse(&raw);
        let validation_score = validator::score(&raw, situation);
        info!(validation_score, "scored reply");

        Ok(CoachReply {
            raw,
            sentiment,
            parsed,
            validation_score,
        })
    }
}
