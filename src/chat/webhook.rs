//! Webhook intake - the chat gateway POSTs events here
//!
//! Events are forwarded into the dispatcher's channel; the handler returns
//! as soon as the event is queued.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio::sync::mpsc;

use crate::chat::ChatEvent;

const TOKEN_HEADER: &str = "x-webhook-token";

#[derive(Clone)]
pub struct WebhookState {
    events: mpsc::Sender<ChatEvent>,
    token: Option<Arc<str>>,
}

impl WebhookState {
    pub fn new(events: mpsc::Sender<ChatEvent>, token: Option<String>) -> Self {
        Self {
            events,
            token: token.filter(|t| !t.is_empty()).map(Arc::from),
        }
    }
}

pub fn routes(state: WebhookState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/events", post(receive_event))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "ok"
}

/// POST /events - queue one chat event for the dispatcher
async fn receive_event(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    Json(event): Json<ChatEvent>,
) -> Response {
    if let Some(expected) = &state.token {
        let presented = headers.get(TOKEN_HEADER).and_then(|v| v.to_str().ok());
        if presented != Some(expected.as_ref()) {
            tracing::debug!("[Webhook] Rejected event with missing or wrong token");
            return error_response(StatusCode::UNAUTHORIZED, "Invalid webhook token");
        }
    }

    match state.events.send(event).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(_) => {
            tracing::error!("[Webhook] Dispatcher is gone, dropping event");
            error_response(StatusCode::SERVICE_UNAVAILABLE, "Dispatcher not running")
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": message,
            "status": status.as_u16()
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    const MESSAGE: &str =
        r#"{"type":"message","sender":"628111","chat":"628111@s.whatsapp.net","body":"ping"}"#;

    fn post_event(token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/events")
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header(TOKEN_HEADER, token);
        }
        builder.body(Body::from(MESSAGE)).unwrap()
    }

    #[tokio::test]
    async fn test_event_is_forwarded() {
        let (tx, mut rx) = mpsc::channel(4);
        let app = routes(WebhookState::new(tx, None));

        let response = app.oneshot(post_event(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        match rx.recv().await.unwrap() {
            ChatEvent::Message(msg) => assert_eq!(msg.body, "ping"),
            other => panic!("Expected message, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_token_required_when_configured() {
        let (tx, mut rx) = mpsc::channel(4);
        let app = routes(WebhookState::new(tx, Some("s3cret".to_string())));

        let denied = app.clone().oneshot(post_event(Some("wrong"))).await.unwrap();
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);
        let missing = app.clone().oneshot(post_event(None)).await.unwrap();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
        assert!(rx.try_recv().is_err());

        let allowed = app.oneshot(post_event(Some("s3cret"))).await.unwrap();
        assert_eq!(allowed.status(), StatusCode::ACCEPTED);
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_closed_dispatcher_is_unavailable() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let app = routes(WebhookState::new(tx, None));

        let response = app.oneshot(post_event(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_health() {
        let (tx, _rx) = mpsc::channel(1);
        let app = routes(WebhookState::new(tx, None));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 64).await.unwrap();
        assert_eq!(&body[..], b"ok");
    }
}
