//! Idle-screen quote decoration
//!
//! Fetches a quote for the pre-chat screen. Failures only suppress the
//! decoration, so they are logged and swallowed here instead of propagated.

use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub quote: String,
    pub author: String,
}

pub struct QuoteProvider {
    client: Client,
    endpoint: String,
}

impl QuoteProvider {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: Client::new(),
            endpoint,
        }
    }

    /// Fetch a quote, or `None` when the endpoint is unreachable or the
    /// payload does not parse.
    pub async fn fetch(&self) -> Option<Quote> {
        let response = match self.client.get(&self.endpoint).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("quote fetch failed: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::warn!("quote endpoint returned {}", response.status());
            return None;
        }

        match response.json::<Quote>().await {
            Ok(quote) => Some(quote),
            Err(e) => {
                tracing::warn!("quote payload invalid: {}", e);
                None
            }
        }
    }
}
