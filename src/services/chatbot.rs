//! # Chatbot client
//!
//! HTTP client for the external reply-generation collaborator. The service
//! answers a visitor's text message with the reply text the webhook sends
//! back through the encrypted envelope.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::config;
use anyhow::{Context, Result};

/// Response body of the chatbot endpoint
#[derive(Debug, Deserialize)]
struct BotReply {
    text: String,
}

/// Reply-generation client backed by a hosted chatbot API
#[derive(Clone)]
pub struct BotHandler {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl BotHandler {
    pub fn new(app_config: &config::AppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: app_config.bot_endpoint.clone(),
            api_key: app_config.bot_api_key.clone(),
        }
    }
}

#[async_trait]
impl crate::services::ReplyGenerator for BotHandler {
    async fn bot_reply(&self, text: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({
                "key": self.api_key,
                "info": text,
            }))
            .send()
            .await
            .context("Failed to send request to chatbot API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());

            anyhow::bail!("chatbot API returned error status {}: {}", status, body);
        }

        let reply: BotReply = response
            .json()
            .await
            .context("Failed to parse chatbot API response")?;

        Ok(reply.text)
    }
}
