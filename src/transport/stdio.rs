use anyhow::Result;
use async_trait::async_trait;
use rmcp::ServiceExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::info;

use super::TransportBinding;
use crate::config::TransportKind;
use crate::mcp::rmcp_server::CaddyMcpHandler;

/// Newline-delimited JSON-RPC over stdin/stdout, one client per process.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdioBinding;

impl StdioBinding {
    /// Serve one session over any byte stream pair until the client hangs up.
    /// Tool calls are handled one at a time, in the order they were read.
    pub async fn serve_io<R, W>(handler: CaddyMcpHandler, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let service = handler.serialized().serve((reader, writer)).await?;

        // Block until shutdown - rmcp requires this to keep the server alive
        let reason = service.waiting().await?;
        info!("Stdio session closed: {:?}", reason);

        Ok(())
    }
}

#[async_trait]
impl TransportBinding for StdioBinding {
    fn kind(&self) -> TransportKind {
        TransportKind::Stdio
    }

    async fn serve(&self, handler: CaddyMcpHandler) -> Result<()> {
        info!("Starting MCP server on stdio");
        Self::serve_io(handler, tokio::io::stdin(), tokio::io::stdout()).await
    }
}
