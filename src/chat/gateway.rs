//! Outbound messages through the chat gateway's HTTP API

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::chat::{ChatError, ChatOutbound};

/// Gateway HTTP client
pub struct GatewayClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Serialize)]
struct OutgoingMessage<'a> {
    chat: &'a str,
    text: &'a str,
}

impl GatewayClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ChatError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }
}

#[async_trait]
impl ChatOutbound for GatewayClient {
    async fn send_text(&self, chat: &str, text: &str) -> Result<(), ChatError> {
        let mut request = self
            .client
            .post(format!("{}/messages", self.base_url))
            .json(&OutgoingMessage { chat, text });

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Rejected { status, body });
        }

        Ok(())
    }
}
