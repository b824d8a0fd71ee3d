//! Gateway routes
//!
//! Thin HTTP surface for the browser frontend: session-scoped chat driving
//! the conversation controller, the idle-screen quote proxy, and the
//! journal/mood-tracker provisioning endpoints.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use crate::core::{ConversationController, InteractionState};
use crate::conversation::Message;
use crate::launcher::{DocKind, LaunchTarget};
use crate::remote::ChatBackend;
use crate::AppState;

type SharedController = Arc<AsyncMutex<ConversationController>>;

/// Keeps one controller per conversation session, created on demand.
#[derive(Clone)]
pub struct SessionManager {
    backend: Arc<dyn ChatBackend>,
    greeting: String,
    fallback: String,
    // Sessions live for the process lifetime; there is no eviction.
    sessions: Arc<Mutex<HashMap<Uuid, SharedController>>>,
}

impl SessionManager {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            greeting: crate::config::prompts_builtin::GREETING.to_string(),
            fallback: crate::config::prompts_builtin::SAFETY_FALLBACK.to_string(),
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Use a deployment's own opening greeting wording.
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }

    /// Use a deployment's own safety fallback wording.
    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }

    pub fn create(&self) -> (Uuid, SharedController) {
        let controller =
            ConversationController::new(self.backend.clone()).with_fallback(self.fallback.clone());
        let id = controller.session_id();
        let shared = Arc::new(AsyncMutex::new(controller));
        self.sessions.lock().unwrap().insert(id, shared.clone());
        (id, shared)
    }

    pub fn get(&self, id: Uuid) -> Option<SharedController> {
        self.sessions.lock().unwrap().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    sessions: usize,
}

#[derive(Debug, Serialize)]
struct SessionCreated {
    session_id: Uuid,
    /// Opening bot line for the conversation screen. The greeting is not a
    /// logged message, so the reply cadence starts counting at the first
    /// real exchange.
    greeting: String,
    /// Rotating invitation for the pre-chat screen.
    prompt: String,
}

#[derive(Debug, Serialize)]
struct SessionView {
    session_id: Uuid,
    messages: Vec<Message>,
    state: InteractionState,
}

#[derive(Debug, Deserialize)]
struct MessageRequest {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ProvisionRequest {
    email: String,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        sessions: state.sessions.len(),
    })
}

async fn create_session(State(state): State<AppState>) -> Json<SessionCreated> {
    let (session_id, _) = state.sessions.create();
    Json(SessionCreated {
        session_id,
        greeting: state.sessions.greeting.clone(),
        prompt: state.prompts.next().to_string(),
    })
}

fn view_of(controller: &ConversationController) -> SessionView {
    SessionView {
        session_id: controller.session_id(),
        messages: controller.messages().to_vec(),
        state: controller.state().clone(),
    }
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, StatusCode> {
    let controller = state.sessions.get(id).ok_or(StatusCode::NOT_FOUND)?;
    let controller = controller.lock().await;
    Ok(Json(view_of(&controller)))
}

/// Submit user text to a session. Blank text or a submission landing while
/// a reply is pending changes nothing; the unchanged transcript comes back
/// either way, matching the silent no-op the conversation surface expects.
async fn post_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<MessageRequest>,
) -> Result<Json<SessionView>, StatusCode> {
    let controller = state.sessions.get(id).ok_or(StatusCode::NOT_FOUND)?;
    let mut controller = controller.lock().await;

    controller.submit_user_text(&request.text).await;
    Ok(Json(view_of(&controller)))
}

async fn get_quote(State(state): State<AppState>) -> Result<Json<crate::remote::Quote>, StatusCode> {
    match state.quotes.fetch().await {
        Some(quote) => Ok(Json(quote)),
        // Decoration only; the frontend simply leaves it out.
        None => Err(StatusCode::NOT_FOUND),
    }
}

async fn provision(
    state: &AppState,
    kind: DocKind,
    email: &str,
) -> Result<Json<LaunchTarget>, StatusCode> {
    let launcher = state
        .launcher
        .as_ref()
        .ok_or(StatusCode::SERVICE_UNAVAILABLE)?;

    if email.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    match launcher.ensure(kind, email.trim()).await {
        Ok(target) => Ok(Json(target)),
        Err(e) => {
            // The client keeps its email modal open and may retry.
            tracing::error!("provisioning {} failed: {}", kind.as_str(), e);
            Err(StatusCode::BAD_GATEWAY)
        }
    }
}

async fn create_journal(
    State(state): State<AppState>,
    Json(request): Json<ProvisionRequest>,
) -> Result<Json<LaunchTarget>, StatusCode> {
    provision(&state, DocKind::Doc, &request.email).await
}

async fn create_mood_tracker(
    State(state): State<AppState>,
    Json(request): Json<ProvisionRequest>,
) -> Result<Json<LaunchTarget>, StatusCode> {
    provision(&state, DocKind::Sheet, &request.email).await
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/v1/session", post(create_session))
        .route("/v1/session/:id", get(get_session))
        .route("/v1/session/:id/message", post(post_message))
        .route("/v1/quote", get(get_quote))
        .route("/v1/journal", post(create_journal))
        .route("/v1/mood-tracker", post(create_mood_tracker))
}
