//! HTTP boundary for the coaching service.
//!
//! ## Endpoints
//!
//! - `POST /api/motivate` — generate a coaching reply for a situation
//! - `GET /api/motivate` — readiness payload with usage hints
//! - `GET /api/sessions/{user_id}` — recent sessions for one user
//!
//! The rate limiter runs before anything else, so over-limit callers
//! never reach validation or the provider.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::engine::CoachEngine;
use crate::error::CoachError;
use crate::parser::ParsedReply;
use crate::rate_limit::{KeyedRateLimiter, RateLimitError};
use crate::sentiment::Sentiment;
use crate::store::{NewSession, SessionStore};

/// Bounds on situation length, in characters.
const MIN_SITUATION_CHARS: usize = 10;
const MAX_SITUATION_CHARS: usize = 5000;

/// Limiter key shared by requests without a user id.
const ANONYMOUS_KEY: &str = "anonymous";

const MSG_TOO_SHORT: &str = "Please provide a detailed situation (at least 10 characters)";
const MSG_TOO_LONG: &str = "Situation is too long (maximum 5000 characters)";
const MSG_GENERATION_FAILED: &str = "Failed to generate motivation. Please try again.";
const MSG_RATE_LIMITED: &str = "Too many requests. Please slow down.";
const MSG_HISTORY_FAILED: &str = "Failed to load session history.";
const MSG_STORE_DISABLED: &str = "Session history is not available on this server.";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body of `POST /api/motivate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotivateRequest {
    /// The situation to coach on. A missing field deserializes to empty,
    /// which the length check rejects.
    #[serde(default)]
    pub situation: String,
    /// Optional caller identity; enables history context and persistence.
    #[serde(default, alias = "userId")]
    pub user_id: Option<String>,
}

/// Successful reply from `POST /api/motivate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotivateResponse {
    /// Persisted session id; absent when nothing was stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Raw coaching reply text.
    pub response: String,
    /// Sentiment the situation classified to.
    pub sentiment: Sentiment,
    /// Structured fields extracted from the reply.
    pub parsed: ParsedReply,
    /// Heuristic quality score, 0.0 to 10.0.
    pub validation_score: f64,
    /// Always `true` on this path.
    pub success: bool,
}

/// JSON error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
    /// Optional extra context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Present on 429 responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

/// Payload of `GET /api/motivate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub message: String,
    pub usage: String,
    pub example: ExampleRequest,
}

/// Example request embedded in the readiness payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExampleRequest {
    pub situation: String,
}

/// Payload of `GET /api/sessions/{user_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsResponse {
    pub user_id: String,
    /// Total sessions stored for this user, not just the ones returned.
    pub count: u64,
    pub sessions: Vec<SessionView>,
}

/// One session as rendered on the history endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub id: String,
    pub situation: String,
    pub sentiment: Sentiment,
    pub raw_reply: String,
    pub parsed: ParsedReply,
    pub validation_score: f64,
    /// Creation time, RFC 3339.
    pub created_at: DateTime<Utc>,
}

impl From<crate::store::SessionRecord> for SessionView {
    fn from(r: crate::store::SessionRecord) -> Self {
        Self {
            id: r.id,
            situation: r.situation,
            sentiment: r.sentiment,
            raw_reply: r.raw_reply,
            parsed: r.parsed,
            validation_score: r.validation_score,
            created_at: DateTime::from_timestamp(r.created_at as i64, 0).unwrap_or_default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Shared application state
// ---------------------------------------------------------------------------

/// Shared state for axum handlers.
#[derive(Clone)]
struct AppState {
    /// Reply generation engine.
    engine: CoachEngine,
    /// Session store; `None` when persistence is disabled.
    store: Option<Arc<SessionStore>>,
    /// Per-caller rate limiter.
    limiter: Arc<Mutex<KeyedRateLimiter>>,
    /// How many prior sessions feed the prompt and the history endpoint.
    history_limit: usize,
    /// Upper bound on end-to-end request handling.
    request_timeout: Duration,
}

// ---------------------------------------------------------------------------
// CoachServer
// ---------------------------------------------------------------------------

/// HTTP server wrapping the coaching engine.
pub struct CoachServer {
    /// The address the server is listening on.
    addr: SocketAddr,
    /// Handle to the background server task.
    handle: JoinHandle<()>,
}

impl CoachServer {
    /// Start the HTTP server.
    ///
    /// Binds to `{config.server.host}:{config.server.port}` (use port `0`
    /// for auto-assign) and begins serving in a background tokio task.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP listener cannot bind.
    pub async fn start(
        config: &Config,
        engine: CoachEngine,
        store: Option<Arc<SessionStore>>,
    ) -> crate::error::Result<Self> {
        let state = AppState {
            engine,
            store,
            limiter: Arc::new(Mutex::new(KeyedRateLimiter::new(&config.limits))),
            history_limit: config.store.history_limit,
            request_timeout: Duration::from_secs(config.server.request_timeout_secs),
        };

        let app = Router::new()
            .route("/api/motivate", post(handle_motivate).get(handle_status))
            .route("/api/sessions/{user_id}", get(handle_sessions))
            .with_state(state);

        let bind_addr = config.server.bind_addr();
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| CoachError::Server(format!("server bind failed: {e}")))?;

        let addr = listener
            .local_addr()
            .map_err(|e| CoachError::Server(format!("failed to get local addr: {e}")))?;

        info!("coaching server listening on http://{addr}/api/motivate");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("server error: {e}");
            }
        });

        Ok(Self { addr, handle })
    }

    /// Returns the address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Abort the server task.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for CoachServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// `POST /api/motivate` — generate a coaching reply.
async fn handle_motivate(
    State(state): State<AppState>,
    Json(request): Json<MotivateRequest>,
) -> Response {
    // Blank user ids get the shared anonymous budget.
    let user_id = request
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let caller_key = user_id.unwrap_or(ANONYMOUS_KEY);

    // Limiter first: over-limit callers cost nothing downstream.
    {
        let mut limiter = match state.limiter.lock() {
            Ok(guard) => guard,
            Err(e) => {
                error!("rate limiter lock poisoned: {e}");
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, MSG_GENERATION_FAILED);
            }
        };
        if let Err(RateLimitError::Exceeded { retry_after_secs }) = limiter.try_acquire(caller_key)
        {
            warn!(caller_key, retry_after_secs, "rate limited");
            return rate_limited_response(retry_after_secs);
        }
    }

    let trimmed_len = request.situation.trim().chars().count();
    if trimmed_len < MIN_SITUATION_CHARS {
        return error_response(StatusCode::BAD_REQUEST, MSG_TOO_SHORT);
    }
    if trimmed_len > MAX_SITUATION_CHARS {
        return error_response(StatusCode::BAD_REQUEST, MSG_TOO_LONG);
    }

    // Prior sessions shape the prompt's journey note. A read failure
    // degrades to a contextless prompt rather than failing the request.
    let prior_sessions = match (&state.store, user_id) {
        (Some(store), Some(uid)) => match store.recent(uid, state.history_limit) {
            Ok(records) => records.len(),
            Err(e) => {
                warn!("history read failed: {e}");
                0
            }
        },
        _ => 0,
    };

    let generated = tokio::time::timeout(
        state.request_timeout,
        state.engine.generate(&request.situation, prior_sessions),
    )
    .await;

    let reply = match generated {
        Ok(Ok(reply)) => reply,
        Ok(Err(e)) => {
            error!("generation failed: {e}");
            return failure_response(StatusCode::BAD_GATEWAY, e.to_string());
        }
        Err(_) => {
            let timeout_secs = state.request_timeout.as_secs();
            error!(timeout_secs, "generation timed out");
            return failure_response(
                StatusCode::BAD_GATEWAY,
                format!("request timed out after {timeout_secs}s"),
            );
        }
    };

    // Persist only for identified callers. A write failure fails the
    // whole request: generation is not idempotent, the caller retries.
    let id = match (&state.store, user_id) {
        (Some(store), Some(uid)) => {
            let new_session = NewSession {
                user_id: uid,
                situation: &request.situation,
                sentiment: reply.sentiment,
                raw_reply: &reply.raw,
                parsed: &reply.parsed,
                validation_score: reply.validation_score,
            };
            match store.append(&new_session) {
                Ok(id) => Some(id),
                Err(e) => {
                    error!("session persist failed: {e}");
                    return failure_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        format!("session persist failed: {e}"),
                    );
                }
            }
        }
        _ => None,
    };

    let body = MotivateResponse {
        id,
        response: reply.raw,
        sentiment: reply.sentiment,
        parsed: reply.parsed,
        validation_score: reply.validation_score,
        success: true,
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// `GET /api/motivate` — readiness payload.
async fn handle_status() -> Json<StatusResponse> {
    Json(StatusResponse {
        message: "My Brain Doctor API is running".to_string(),
        usage: "POST /api/motivate with { situation: \"your situation\" }".to_string(),
        example: ExampleRequest {
            situation: "I just lost my job and feel hopeless".to_string(),
        },
    })
}

/// `GET /api/sessions/{user_id}` — recent sessions for one user.
async fn handle_sessions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Response {
    let Some(store) = &state.store else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, MSG_STORE_DISABLED);
    };

    let records = match store.recent(&user_id, state.history_limit) {
        Ok(records) => records,
        Err(e) => {
            error!("history read failed: {e}");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, MSG_HISTORY_FAILED);
        }
    };
    let count = match store.count(&user_id) {
        Ok(count) => count,
        Err(e) => {
            error!("history count failed: {e}");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, MSG_HISTORY_FAILED);
        }
    };

    let body = SessionsResponse {
        user_id,
        count,
        sessions: records.into_iter().map(SessionView::from).collect(),
    };
    (StatusCode::OK, Json(body)).into_response()
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

fn error_response(status: StatusCode, message: &str) -> Response {
    let body = ErrorResponse {
        error: message.to_string(),
        details: None,
        retry_after_secs: None,
    };
    (status, Json(body)).into_response()
}

/// Generic failure message plus a diagnostic detail line. Provider errors
/// and timeouts go out as 502, a failed persist as 500.
fn failure_response(status: StatusCode, details: String) -> Response {
    let body = ErrorResponse {
        error: MSG_GENERATION_FAILED.to_string(),
        details: Some(details),
        retry_after_secs: None,
    };
    (status, Json(body)).into_response()
}

fn rate_limited_response(retry_after_secs: u64) -> Response {
    let body = ErrorResponse {
        error: MSG_RATE_LIMITED.to_string(),
        details: None,
        retry_after_secs: Some(retry_after_secs),
    };
    (
        StatusCode::TOO_MANY_REQUESTS,
        [(header::RETRY_AFTER, retry_after_secs.to_string())],
        Json(body),
    )
        .into_response()
}
