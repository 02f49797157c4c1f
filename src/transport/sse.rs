//! Legacy MCP HTTP+SSE transport.
//!
//! A client opens `GET /sse` and receives an `endpoint` event naming the URL
//! to POST its JSON-RPC messages to. Every session runs its own rmcp service
//! fed through a pair of channels; replies travel back as `message` events.

use anyhow::Result;
use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::channel::mpsc::{self, UnboundedSender};
use futures::{Stream, StreamExt, future, stream};
use rmcp::ServiceExt;
use rmcp::service::{RoleServer, RxJsonRpcMessage};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::TransportBinding;
use crate::config::TransportKind;
use crate::mcp::rmcp_server::CaddyMcpHandler;

pub const SSE_PATH: &str = "/sse";
pub const MESSAGE_PATH: &str = "/message";
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

type SessionMap = Arc<RwLock<HashMap<String, UnboundedSender<RxJsonRpcMessage<RoleServer>>>>>;

#[derive(Clone)]
struct SseState {
    handler: CaddyMcpHandler,
    sessions: SessionMap,
}

/// Removes the session once its event stream is dropped, which closes the
/// inbound channel and lets the session's service finish.
struct SessionGuard {
    sessions: SessionMap,
    id: String,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.remove(&self.id);
        }
        info!("SSE session {} closed", self.id);
    }
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    #[serde(rename = "sessionId")]
    session_id: String,
}

#[derive(Debug, Clone)]
pub struct SseBinding {
    addr: String,
}

impl SseBinding {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

pub fn router(handler: CaddyMcpHandler) -> Router {
    let state = SseState {
        handler,
        sessions: Arc::new(RwLock::new(HashMap::new())),
    };

    Router::new()
        .route(SSE_PATH, get(open_stream))
        .route(MESSAGE_PATH, post(post_message))
        .with_state(state)
}

async fn open_stream(
    State(state): State<SseState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let session_id = Uuid::new_v4().to_string();
    let (to_server_tx, to_server_rx) = mpsc::unbounded();
    let (to_client_tx, to_client_rx) = mpsc::unbounded();

    if let Ok(mut sessions) = state.sessions.write() {
        sessions.insert(session_id.clone(), to_server_tx);
    }
    info!("SSE session {} opened", session_id);

    let handler = state.handler.clone();
    let task_id = session_id.clone();
    tokio::spawn(async move {
        match handler.serve((to_client_tx, to_server_rx)).await {
            Ok(service) => match service.waiting().await {
                Ok(reason) => debug!("SSE session {} finished: {:?}", task_id, reason),
                Err(e) => warn!("SSE session {} task failed: {}", task_id, e),
            },
            Err(e) => warn!("SSE session {} failed to initialize: {}", task_id, e),
        }
    });

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("{}?sessionId={}", MESSAGE_PATH, session_id));

    let guard = SessionGuard {
        sessions: state.sessions.clone(),
        id: session_id,
    };
    let messages = to_client_rx.map(move |message| {
        let _session = &guard;
        Event::default().event("message").json_data(message)
    });

    let events = stream::once(future::ready(Ok::<_, axum::Error>(endpoint))).chain(messages);

    Sse::new(events).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
}

async fn post_message(
    State(state): State<SseState>,
    Query(query): Query<MessageQuery>,
    Json(message): Json<RxJsonRpcMessage<RoleServer>>,
) -> StatusCode {
    let sender = state
        .sessions
        .read()
        .ok()
        .and_then(|sessions| sessions.get(&query.session_id).cloned());

    let Some(sender) = sender else {
        warn!("Message for unknown SSE session {}", query.session_id);
        return StatusCode::NOT_FOUND;
    };

    if sender.unbounded_send(message).is_err() {
        return StatusCode::GONE;
    }

    StatusCode::ACCEPTED
}

#[async_trait]
impl TransportBinding for SseBinding {
    fn kind(&self) -> TransportKind {
        TransportKind::Sse
    }

    async fn serve(&self, handler: CaddyMcpHandler) -> Result<()> {
        let listener = TcpListener::bind(&self.addr).await?;
        info!(
            "Starting MCP SSE server on http://{}{}",
            self.addr, SSE_PATH
        );

        axum::serve(listener, router(handler)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::dispatcher::Dispatcher;
    use crate::mcp::registry::ToolRegistry;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    const INITIALIZE: &str = r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"test-client","version":"0.0.1"}}}"#;

    fn app() -> Router {
        router(CaddyMcpHandler::new(Dispatcher::new(ToolRegistry::new())))
    }

    fn post_to(uri: &str, body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    /// Read body chunks until `needle` shows up.
    async fn read_until<S>(stream: &mut S, needle: &str) -> String
    where
        S: Stream<Item = Result<axum::body::Bytes, axum::Error>> + Unpin,
    {
        let mut seen = String::new();
        let read = async {
            while let Some(chunk) = stream.next().await {
                seen.push_str(&String::from_utf8_lossy(&chunk.unwrap()));
                if seen.contains(needle) {
                    break;
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(5), read)
            .await
            .expect("timed out waiting for SSE data");
        seen
    }

    #[tokio::test]
    async fn test_message_for_unknown_session_is_not_found() {
        let response = app()
            .oneshot(post_to("/message?sessionId=missing", INITIALIZE))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_session_round_trip() {
        let app = app();

        let response = app
            .clone()
            .oneshot(Request::builder().uri(SSE_PATH).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "text/event-stream"
        );

        let mut body = Box::pin(response.into_body().into_data_stream());
        let first = read_until(&mut body, "\n\n").await;
        assert!(first.contains("event: endpoint"));

        let endpoint = first
            .lines()
            .find_map(|line| line.strip_prefix("data: "))
            .unwrap()
            .to_string();
        assert!(endpoint.starts_with("/message?sessionId="));

        let accepted = app
            .clone()
            .oneshot(post_to(&endpoint, INITIALIZE))
            .await
            .unwrap();
        assert_eq!(accepted.status(), StatusCode::ACCEPTED);

        let reply = read_until(&mut body, "caddy-mcp").await;
        assert!(reply.contains("event: message"));
        assert!(reply.contains("\"id\":1"));

        drop(body);
        let gone = app.oneshot(post_to(&endpoint, INITIALIZE)).await.unwrap();
        assert_eq!(gone.status(), StatusCode::NOT_FOUND);
    }
}
