//! Braindoc: an AI motivation coach service.
//!
//! This crate turns a short description of a difficult situation into a
//! structured coaching reply:
//! Situation → sentiment classification → prompt assembly → LLM → parsed reply
//!
//! # Architecture
//!
//! The pipeline is built from small synchronous stages around one async call:
//! - **Sentiment**: Classifies the situation with weighted keyword markers
//! - **Guidance**: Assembles the system and user prompts for the provider
//! - **LLM**: Calls an OpenAI-compatible chat completions endpoint via `reqwest`
//! - **Parser**: Extracts the five labelled reply sections
//! - **Validator**: Scores reply quality on a 0-10 scale
//!
//! [`server`] exposes the pipeline over HTTP with per-user rate limiting and
//! optional SQLite session history.

pub mod config;
pub mod engine;
pub mod error;
pub mod guidance;
pub mod llm;
pub mod parser;
pub mod rate_limit;
pub mod sentiment;
pub mod server;
pub mod store;
pub mod validator;

pub use config::Config;
pub use engine::{CoachEngine, CoachReply};
pub use error::{CoachError, Result};
pub use parser::ParsedReply;
pub use sentiment::Sentiment;
pub use server::CoachServer;
pub use store::{SessionRecord, SessionStore};
