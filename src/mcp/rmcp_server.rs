use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, InitializeRequestParam,
    InitializeResult, ListToolsResult, PaginatedRequestParam, ProtocolVersion, ServerCapabilities,
    Tool as RmcpTool,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{ErrorData as McpError, ServerHandler};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use super::dispatcher::Dispatcher;
use super::{Invocation, ResultEnvelope, TextResult, ToolDescriptor};
use crate::error::DispatchError;

pub const SERVER_NAME: &str = "caddy-mcp";

/// Adapter that bridges rmcp's ServerHandler with the tool dispatcher.
///
/// Cloning is cheap; every transport session gets its own clone sharing one
/// dispatcher.
#[derive(Clone)]
pub struct CaddyMcpHandler {
    dispatcher: Arc<Dispatcher>,
    instructions: Option<String>,
    /// When set, tool calls run one at a time in arrival order.
    serial: Option<Arc<Mutex<()>>>,
}

impl CaddyMcpHandler {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            instructions: None,
            serial: None,
        }
    }

    /// Run every tool call to completion before starting the next one.
    /// rmcp spawns a task per request, so transports that promise ordered
    /// processing must opt into this.
    pub fn serialized(mut self) -> Self {
        self.serial = Some(Arc::new(Mutex::new(())));
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Convert a tool descriptor to rmcp's Tool format
    fn convert_to_rmcp_tool(tool: &ToolDescriptor) -> RmcpTool {
        let schema = tool.input_schema();

        let mut schema_map = Map::new();
        schema_map.insert("type".to_string(), Value::String(schema.schema_type));
        schema_map.insert(
            "properties".to_string(),
            Value::Object(schema.properties.into_iter().collect()),
        );
        schema_map.insert(
            "required".to_string(),
            Value::Array(schema.required.into_iter().map(Value::String).collect()),
        );

        RmcpTool {
            name: Cow::Owned(tool.name.clone()),
            title: None,
            description: Some(Cow::Owned(tool.description.clone())),
            input_schema: Arc::new(schema_map),
            output_schema: None,
            annotations: None,
            icons: None,
        }
    }

    /// Run one `tools/call` through the dispatcher and map the envelope onto
    /// MCP: text results become content, dispatch errors become JSON-RPC errors.
    pub async fn call(&self, request: CallToolRequestParam) -> Result<CallToolResult, McpError> {
        let invocation =
            Invocation::from_json(request.name.into_owned(), request.arguments)
                .map_err(to_mcp_error)?;

        let _turn = match &self.serial {
            Some(serial) => Some(serial.lock().await),
            None => None,
        };

        match self.dispatcher.dispatch(invocation).await {
            ResultEnvelope::Text(text) => Ok(to_call_tool_result(text)),
            ResultEnvelope::Error(e) => Err(to_mcp_error(e)),
        }
    }

    fn server_info(&self, protocol_version: ProtocolVersion) -> InitializeResult {
        InitializeResult {
            protocol_version,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CADDY_MCP_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: self.instructions.clone(),
        }
    }
}

fn to_call_tool_result(text: TextResult) -> CallToolResult {
    let mut content = vec![Content::text(text.content)];
    if !text.notes.is_empty() {
        content.push(Content::text(format!("Warnings:\n{}", text.notes.join("\n"))));
    }
    CallToolResult::success(content)
}

fn to_mcp_error(err: DispatchError) -> McpError {
    if err.is_protocol_error() {
        McpError::invalid_params(err.to_string(), None)
    } else {
        McpError::internal_error(err.to_string(), None)
    }
}

impl ServerHandler for CaddyMcpHandler {
    async fn initialize(
        &self,
        request: InitializeRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<InitializeResult, McpError> {
        info!(
            "Initialize request received from {} with protocol version {}",
            request.client_info.name, request.protocol_version
        );

        if context.peer.peer_info().is_none() {
            context.peer.set_peer_info(request.clone());
        }

        // Negotiate protocol version: prefer client's if supported, fallback to latest
        let client_version = request.protocol_version.to_string();
        let protocol_version = match client_version.as_str() {
            "2025-06-18" => ProtocolVersion::V_2025_06_18,
            "2025-03-26" => ProtocolVersion::V_2025_03_26,
            "2024-11-05" => ProtocolVersion::V_2024_11_05,
            _ => {
                info!(
                    "Client requested unsupported version {}, using latest supported",
                    client_version
                );
                ProtocolVersion::LATEST
            }
        };

        info!("Negotiated protocol version: {}", protocol_version);

        Ok(self.server_info(protocol_version))
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        info!("List tools request received");

        let tools: Vec<RmcpTool> = self
            .dispatcher
            .tools()
            .map(Self::convert_to_rmcp_tool)
            .collect();

        Ok(ListToolsResult {
            tools,
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        info!("Call tool request received: {}", request.name);
        self.call(request).await
    }

    fn get_info(&self) -> InitializeResult {
        self.server_info(ProtocolVersion::LATEST)
    }
}
