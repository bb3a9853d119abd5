//! Chat transport boundary
//!
//! - `webhook`: inbound events pushed by the chat gateway
//! - `gateway`: outbound text messages sent through the chat gateway
//!
//! The bot never speaks the chat protocol itself; pairing and session
//! handling live in the gateway.

pub mod gateway;
pub mod webhook;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use gateway::GatewayClient;

/// Inbound event from the chat gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    Message(TextMessage),
    Receipt { chat: String, message_id: String },
    Presence { sender: String, available: bool },
    Connected,
    Disconnected,
}

/// A text message in a chat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMessage {
    #[serde(default)]
    pub id: Option<String>,
    pub sender: String,
    /// Conversation the reply goes to
    pub chat: String,
    pub body: String,
    /// Sent by the bot's own account
    #[serde(default)]
    pub from_me: bool,
}

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("gateway rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Outbound half of the chat transport
#[async_trait]
pub trait ChatOutbound: Send + Sync {
    async fn send_text(&self, chat: &str, text: &str) -> Result<(), ChatError>;
}
