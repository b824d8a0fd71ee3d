//! External document and spreadsheet provisioning
//!
//! The journal and mood-tracker affordances open a shared Google document
//! or spreadsheet. Creation is delegated to an external provisioning
//! service; the resulting id is persisted locally and reused on every
//! later launch without another network call.

mod store;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use store::IdStore;

/// Which external artifact an affordance launches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocKind {
    /// Journal document.
    Doc,
    /// Mood-tracking spreadsheet.
    Sheet,
}

impl DocKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocKind::Doc => "doc",
            DocKind::Sheet => "sheet",
        }
    }

    /// Edit URL for a provisioned artifact.
    pub fn url_for(&self, id: &str) -> String {
        match self {
            DocKind::Doc => format!("https://docs.google.com/document/d/{}/edit", id),
            DocKind::Sheet => format!("https://docs.google.com/spreadsheets/d/{}/edit", id),
        }
    }

    fn create_path(&self) -> &'static str {
        match self {
            DocKind::Doc => "/createDoc",
            DocKind::Sheet => "/createSheet",
        }
    }
}

/// A ready-to-open external artifact.
#[derive(Debug, Clone, Serialize)]
pub struct LaunchTarget {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Error)]
pub enum LauncherError {
    #[error("storage error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("provisioning request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("provisioning response invalid: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Serialize)]
struct CreateRequest<'a> {
    email: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    #[serde(rename = "docId")]
    doc_id: Option<String>,
    #[serde(rename = "sheetId")]
    sheet_id: Option<String>,
}

pub struct ExternalActionLauncher {
    client: Client,
    base_url: String,
    store: IdStore,
}

impl ExternalActionLauncher {
    pub fn new(base_url: String, store: IdStore) -> Self {
        Self {
            client: Client::new(),
            base_url,
            store,
        }
    }

    /// Return the launch target for this user and kind, provisioning a new
    /// artifact only when none has been created before.
    ///
    /// Failures propagate so the caller can keep its retry surface open;
    /// there is no automatic retry here.
    pub async fn ensure(&self, kind: DocKind, email: &str) -> Result<LaunchTarget, LauncherError> {
        if let Some(id) = self.store.get(email, kind).await? {
            tracing::debug!(kind = kind.as_str(), "reusing provisioned id");
            return Ok(LaunchTarget {
                url: kind.url_for(&id),
                id,
            });
        }

        let id = self.create(kind, email).await?;
        self.store.put(email, kind, &id).await?;

        tracing::info!(kind = kind.as_str(), "provisioned new external document");
        Ok(LaunchTarget {
            url: kind.url_for(&id),
            id,
        })
    }

    async fn create(&self, kind: DocKind, email: &str) -> Result<String, LauncherError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, kind.create_path()))
            .json(&CreateRequest { email })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LauncherError::InvalidResponse(format!(
                "{}: {}",
                status, body
            )));
        }

        let body: CreateResponse = response.json().await?;
        let id = match kind {
            DocKind::Doc => body.doc_id,
            DocKind::Sheet => body.sheet_id,
        };

        id.ok_or_else(|| LauncherError::InvalidResponse("missing id in response".to_string()))
    }
}
