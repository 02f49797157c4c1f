use thiserror::Error;

/// Failures talking to the Caddy admin API.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("invalid admin API URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("request to Caddy admin API failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("failed to {operation}: {status}")]
    Status { operation: &'static str, status: String },

    #[error("no configuration currently loaded")]
    NoConfigLoaded,

    #[error("unexpected response from Caddy admin API: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Failures from the format adapter gateway.
#[derive(Debug, Error)]
pub enum AdaptError {
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to adapt {dialect}: {message}")]
    Adapter { dialect: String, message: String },
}

/// Errors a tool handler can return.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error(transparent)]
    Admin(#[from] AdminError),

    #[error(transparent)]
    Adapt(#[from] AdaptError),

    #[error("failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors surfaced at the protocol level rather than as a text result.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("tool '{tool}' requires argument '{argument}'")]
    MissingArgument { tool: String, argument: String },

    #[error("argument '{argument}' must be a string")]
    InvalidArgument { argument: String },

    #[error(transparent)]
    Tool(#[from] ToolError),
}

impl DispatchError {
    /// Whether the caller sent a malformed invocation, as opposed to the tool
    /// failing while it ran.
    pub fn is_protocol_error(&self) -> bool {
        !matches!(self, DispatchError::Tool(_))
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("tool '{0}' is already registered")]
    DuplicateTool(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid port number: {0}")]
    InvalidPort(u16),

    #[error("unknown transport '{0}' (expected stdio, sse or httpstream)")]
    UnknownTransport(String),

    #[error("invalid Caddy admin URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}
