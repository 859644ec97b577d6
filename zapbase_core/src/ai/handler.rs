use anyhow::{Result, anyhow};
use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;

use super::dto::{GenerateContentRequest, GenerateContentResponse};
use crate::helpers::config::ZapConfig;

pub const NO_RESPONSE: &str = "No response generated";

const PERSONA_PREAMBLE: &str = "You are a helpful assistant called Frechi for a crypto application called ZapBase. Be empathetic and respond with clear, concise instructions. The user can ask for their balance, transfer ETH using a wallet address or basename i.e username.base.eth, check token prices, or tip the app Zapbase. If the request is outside these actions, inform them of what they can do. Please respond to the following message:";

/// Produces a free-form reply for a routed context string.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, context: &str) -> Result<String>;
}

pub fn compose_prompt(context: &str) -> String {
    format!("{} {}", PERSONA_PREAMBLE, context)
}

/// Gemini `generateContent` client.
#[derive(Clone)]
pub struct AI {
    client: Client,
    api_url: String,
    api_key: String,
}

impl AI {
    pub fn new(api_url: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_url,
            api_key,
        }
    }

    pub fn from_config(config: &ZapConfig) -> Self {
        Self::new(config.gemini_api_url.clone(), config.gemini_api_key.clone())
    }
}

#[async_trait]
impl Responder for AI {
    async fn respond(&self, context: &str) -> Result<String> {
        let request = GenerateContentRequest::from_prompt(compose_prompt(context));
        debug!("🌐 Making completion request to: {}", self.api_url);

        // The key travels in the query string; strip URLs from errors so it never reaches the logs.
        let response = self
            .client
            .post(&self.api_url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                error!("❌ Network error during completion call: {}", e);
                anyhow!("Network error: {}", e)
            })?;

        let status = response.status();
        debug!("📡 Completion response status: {}", status);

        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            error!("❌ Completion service responded with {}: {}", status, error_body);
            return Err(anyhow!(
                "Completion service failed with status {}: {}",
                status,
                error_body
            ));
        }

        let envelope: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| anyhow!("Invalid completion response: {}", e.without_url()))?;

        Ok(envelope
            .first_text()
            .map(str::to_string)
            .unwrap_or_else(|| NO_RESPONSE.to_string()))
    }
}
