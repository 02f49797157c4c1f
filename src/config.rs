use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_ADMIN_URL: &str = "http://127.0.0.1:2019";
pub const DEFAULT_PORT: u16 = 7000;

/// Wire transport the server is exposed over. Exactly one is active per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    #[default]
    Stdio,
    Sse,
    HttpStream,
}

impl FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stdio" => Ok(TransportKind::Stdio),
            "sse" => Ok(TransportKind::Sse),
            "httpstream" => Ok(TransportKind::HttpStream),
            other => Err(ConfigError::UnknownTransport(other.to_string())),
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportKind::Stdio => "stdio",
            TransportKind::Sse => "sse",
            TransportKind::HttpStream => "httpstream",
        };
        f.write_str(name)
    }
}

/// Process-wide settings, read once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub base_url: String,
    pub transport: TransportKind,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ADMIN_URL.to_string(),
            transport: TransportKind::default(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    pub fn new(base_url: &str, transport: &str, port: u16) -> Result<Self, ConfigError> {
        if port == 0 {
            return Err(ConfigError::InvalidPort(port));
        }

        let transport = transport.parse()?;

        let parsed = Url::parse(base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
            port,
        })
    }

    /// Socket address network transports listen on.
    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
