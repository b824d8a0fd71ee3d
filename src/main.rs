//! Cozy Companion - conversational wellness companion gateway
//!
//! Hosts the conversation orchestration core behind a thin HTTP surface
//! for a browser frontend. The chat intelligence lives in a remote
//! backend; document and sheet creation is delegated to an external
//! provisioning service.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod actions;
mod config;
mod conversation;
mod core;
mod launcher;
mod remote;
mod routes;
mod speech;

use config::prompts::{PromptRotation, PromptSet};
use config::Config;
use launcher::{ExternalActionLauncher, IdStore};
use remote::{HttpChatBackend, QuoteProvider};
use routes::SessionManager;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionManager,
    pub quotes: Arc<QuoteProvider>,
    pub launcher: Option<Arc<ExternalActionLauncher>>,
    pub prompts: Arc<PromptRotation>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cozy_companion=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    // Deployments may restyle the companion's wording
    let prompt_set = match std::env::var("COMPANION_PROMPTS") {
        Ok(path) => PromptSet::from_file(std::path::Path::new(&path)).await?,
        Err(_) => PromptSet::default(),
    };

    let backend = Arc::new(HttpChatBackend::new(config.chat_backend_url.clone()));
    let sessions = SessionManager::new(backend)
        .with_greeting(prompt_set.voice.greeting.clone())
        .with_fallback(prompt_set.voice.fallback.clone());

    let launcher = match &config.docs_service_url {
        Some(url) => {
            let data_dir = std::env::var("COMPANION_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data"));
            let store = IdStore::new(&data_dir.join("companion.db")).await?;
            Some(Arc::new(ExternalActionLauncher::new(url.clone(), store)))
        }
        None => {
            tracing::warn!(
                "DOCS_SERVICE_URL not set; journal and mood-tracker provisioning disabled"
            );
            None
        }
    };

    let state = AppState {
        sessions,
        quotes: Arc::new(QuoteProvider::new(config.quote_url.clone())),
        launcher,
        prompts: Arc::new(PromptRotation::new(prompt_set.idle.prompts.clone())),
    };

    let app = Router::new()
        .merge(routes::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("🌸 Cozy Companion gateway running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
