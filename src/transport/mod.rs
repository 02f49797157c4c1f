//! Wire transports. Each binding only moves MCP messages; all tool logic
//! stays in the dispatcher behind [`CaddyMcpHandler`].

pub mod http_stream;
pub mod sse;
pub mod stdio;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::{ServerConfig, TransportKind};
use crate::mcp::rmcp_server::CaddyMcpHandler;

pub use http_stream::HttpStreamBinding;
pub use sse::SseBinding;
pub use stdio::StdioBinding;

#[async_trait]
pub trait TransportBinding: Send + Sync {
    fn kind(&self) -> TransportKind;

    /// Serve until the transport closes.
    async fn serve(&self, handler: CaddyMcpHandler) -> Result<()>;
}

/// Pick the single binding this process will run.
pub fn binding_for(config: &ServerConfig) -> Box<dyn TransportBinding> {
    match config.transport {
        TransportKind::Stdio => Box::new(StdioBinding),
        TransportKind::Sse => Box::new(SseBinding::new(config.bind_addr())),
        TransportKind::HttpStream => Box::new(HttpStreamBinding::new(config.bind_addr())),
    }
}
