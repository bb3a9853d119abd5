//! Chat event loop
//!
//! Every qualifying message is acknowledged on the intake path, then its
//! operation runs in its own task so a slow router never stalls intake.
//! Replies for one command are ordered (ack before result); replies for
//! different commands are not.

use std::fmt::Display;
use std::sync::Arc;

use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

use crate::chat::{ChatEvent, ChatOutbound, TextMessage};
use crate::command::parser::{self, Command, MENU};
use crate::error::OpError;
use crate::subscriber::SubscriberService;

pub const ACK: &str = "Processing, please wait...";
pub const PONG: &str = "Pong! Hotspot bot is running.";
pub const BUSY: &str = "Too many commands in progress, please try again shortly.";

pub struct Dispatcher {
    subscribers: Arc<SubscriberService>,
    outbound: Arc<dyn ChatOutbound>,
    /// `None` spawns without limit
    in_flight: Option<Arc<Semaphore>>,
}

impl Dispatcher {
    pub fn new(
        subscribers: Arc<SubscriberService>,
        outbound: Arc<dyn ChatOutbound>,
        max_in_flight: usize,
    ) -> Self {
        let in_flight = (max_in_flight > 0).then(|| Arc::new(Semaphore::new(max_in_flight)));
        Self {
            subscribers,
            outbound,
            in_flight,
        }
    }

    /// Consume events until every sender is dropped
    pub async fn run(self, mut events: mpsc::Receiver<ChatEvent>) {
        tracing::info!("[Dispatcher] Started");
        while let Some(event) = events.recv().await {
            self.handle(event).await;
        }
        tracing::info!("[Dispatcher] Event channel closed, stopping");
    }

    /// Handle one event; returns the operation task if one was spawned
    pub async fn handle(&self, event: ChatEvent) -> Option<JoinHandle<()>> {
        match event {
            ChatEvent::Message(message) => self.handle_message(message).await,
            ChatEvent::Receipt { chat, message_id } => {
                tracing::debug!("[Dispatcher] Receipt for {} in {}", message_id, chat);
                None
            }
            ChatEvent::Presence { sender, available } => {
                tracing::debug!("[Dispatcher] {} available: {}", sender, available);
                None
            }
            ChatEvent::Connected => {
                tracing::info!("[Dispatcher] Chat gateway connected");
                None
            }
            ChatEvent::Disconnected => {
                tracing::warn!("[Dispatcher] Chat gateway disconnected");
                None
            }
        }
    }

    async fn handle_message(&self, message: TextMessage) -> Option<JoinHandle<()>> {
        if message.from_me {
            return None;
        }

        let command = match parser::parse(&message.body) {
            Ok(Some(command)) => command,
            Ok(None) => return None,
            Err(e) => {
                tracing::debug!("[Dispatcher] Malformed command from {}: {}", message.sender, e);
                reply(self.outbound.as_ref(), &message.chat, &e.to_string()).await;
                return None;
            }
        };

        // Answered inline: no router calls, no ack
        if command.is_local() {
            let text = execute(&self.subscribers, command).await;
            reply(self.outbound.as_ref(), &message.chat, &text).await;
            return None;
        }

        let permit = match self.reserve() {
            Some(permit) => permit,
            None => {
                tracing::warn!(
                    "[Dispatcher] Rejecting '{}' from {}: too many in flight",
                    command.keyword(),
                    message.sender
                );
                reply(self.outbound.as_ref(), &message.chat, BUSY).await;
                return None;
            }
        };

        tracing::info!(
            "[Dispatcher] '{}' from {}",
            command.keyword(),
            message.sender
        );
        reply(self.outbound.as_ref(), &message.chat, ACK).await;

        let subscribers = self.subscribers.clone();
        let outbound = self.outbound.clone();
        let chat = message.chat;
        Some(tokio::spawn(async move {
            let _permit = permit;
            let text = execute(&subscribers, command).await;
            reply(outbound.as_ref(), &chat, &text).await;
        }))
    }

    /// `None` when bounded and full; `Some(None)` when unbounded
    fn reserve(&self) -> Option<Option<OwnedSemaphorePermit>> {
        match &self.in_flight {
            None => Some(None),
            Some(semaphore) => semaphore.clone().try_acquire_owned().ok().map(Some),
        }
    }
}

/// Run one command and render the reply text; local commands never touch a router
pub async fn execute(subscribers: &SubscriberService, command: Command) -> String {
    match command {
        Command::FindByName(name) => subscribers.find_by_name(&name).await.to_string(),
        Command::FindByAddress(ip) => render(subscribers.find_by_address(&ip).await),
        Command::Toggle { ip, action } => render(subscribers.toggle_status(&ip, action).await),
        Command::AddClient { ip, limit, name } => {
            render(subscribers.provision(&ip, &limit, &name).await)
        }
        Command::SetLimit { ip, limit } => render(subscribers.update_limit(&ip, &limit).await),
        Command::RemoveClient(ip) => render(subscribers.deprovision(&ip).await),
        Command::Identity => subscribers.identities().await.to_string(),
        Command::Menu => MENU.to_string(),
        Command::Ping => PONG.to_string(),
    }
}

fn render<T: Display>(result: Result<T, OpError>) -> String {
    match result {
        Ok(value) => value.to_string(),
        Err(e) => {
            tracing::warn!("[Dispatcher] Operation failed: {}", e);
            e.to_string()
        }
    }
}

async fn reply(outbound: &dyn ChatOutbound, chat: &str, text: &str) {
    if let Err(e) = outbound.send_text(chat, text).await {
        tracing::error!("[Dispatcher] Failed to reply to {}: {}", chat, e);
    }
}
