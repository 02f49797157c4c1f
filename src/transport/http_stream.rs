use anyhow::Result;
use async_trait::async_trait;
use axum::Router;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

use super::TransportBinding;
use crate::config::TransportKind;
use crate::mcp::rmcp_server::CaddyMcpHandler;

pub const MCP_PATH: &str = "/mcp";

/// Keeps streamed responses alive while a slow handler is still running.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// MCP streamable HTTP: JSON-RPC over POST with streamed responses.
#[derive(Debug, Clone)]
pub struct HttpStreamBinding {
    addr: String,
}

impl HttpStreamBinding {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

pub fn server_config() -> StreamableHttpServerConfig {
    let mut config = StreamableHttpServerConfig::default();
    config.sse_keep_alive = Some(HEARTBEAT_INTERVAL);
    config
}

pub fn router(handler: CaddyMcpHandler) -> Router {
    let service = StreamableHttpService::new(
        move || Ok(handler.clone()),
        Arc::new(LocalSessionManager::default()),
        server_config(),
    );

    Router::new().nest_service(MCP_PATH, service)
}

#[async_trait]
impl TransportBinding for HttpStreamBinding {
    fn kind(&self) -> TransportKind {
        TransportKind::HttpStream
    }

    async fn serve(&self, handler: CaddyMcpHandler) -> Result<()> {
        let listener = TcpListener::bind(&self.addr).await?;
        info!(
            "Starting MCP streamable HTTP server on http://{}{}",
            self.addr, MCP_PATH
        );

        axum::serve(listener, router(handler)).await?;
        Ok(())
    }
}
