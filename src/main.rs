//! hotspot-bot - chat-driven hotspot subscriber management
//!
//! Operators send short text commands through a chat gateway; the bot
//! looks up, toggles, provisions and re-limits hotspot subscribers on two
//! RouterOS routers over their administrative API.

mod chat;
mod command;
mod config;
mod error;
mod router;
mod routeros;
mod subscriber;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::mpsc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::chat::webhook::{self, WebhookState};
use crate::chat::GatewayClient;
use crate::command::Dispatcher;
use crate::router::RouterRegistry;
use crate::subscriber::SubscriberService;

const EVENT_QUEUE: usize = 64;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hotspot_bot=info,tower_http=info".into()),
        )
        .init();

    tracing::info!("Starting hotspot-bot...");

    let config = config::Config::load()?;
    tracing::info!("Configuration loaded");

    // Sessions are opened once; an unreachable router stays unreachable until restart
    let registry = Arc::new(RouterRegistry::connect(&config.routers).await);
    for router in registry.routers() {
        if router.is_connected() {
            tracing::info!(
                "[Main] {} router {} ready at {}",
                router.site().as_str(),
                router.label(),
                router.address()
            );
        } else {
            tracing::error!(
                "[Main] {} router {} at {} is unreachable; its commands will fail",
                router.site().as_str(),
                router.label(),
                router.address()
            );
        }
    }

    let outbound = Arc::new(GatewayClient::new(
        &config.chat.gateway_url,
        config.chat.gateway_token.clone(),
    )?);
    let subscribers = Arc::new(SubscriberService::new(registry.clone()));

    let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE);
    let dispatcher = Dispatcher::new(subscribers, outbound, config.dispatcher.max_in_flight);
    if config.dispatcher.max_in_flight == 0 {
        tracing::warn!("[Main] max_in_flight is 0, command tasks are not bounded");
    }
    let dispatch_task = tokio::spawn(dispatcher.run(events_rx));

    let app = webhook::routes(WebhookState::new(
        events_tx,
        config.chat.webhook_token.clone(),
    ))
    .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    let addr: SocketAddr =
        format!("{}:{}", config.chat.listen_host, config.chat.listen_port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router (and its event sender) is gone; let the dispatcher drain
    if let Err(e) = dispatch_task.await {
        tracing::error!("[Main] Dispatcher task failed: {}", e);
    }

    registry.close_all().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
