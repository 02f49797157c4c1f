//! Conversion of non-JSON configuration dialects into Caddy JSON.
//!
//! The gateway only validates the dialect name and adds dialect context to
//! adapter failures; the conversions themselves live behind [`FormatAdapter`].

pub mod admin;
pub mod yaml;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::caddy::AdminClient;
use crate::error::AdaptError;

pub use admin::AdminApiAdapter;
pub use yaml::YamlAdapter;

/// Input formats that can be converted to Caddy JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Caddyfile,
    Yaml,
    Nginx,
}

impl Dialect {
    pub const ALL: [Dialect; 3] = [Dialect::Caddyfile, Dialect::Yaml, Dialect::Nginx];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Caddyfile => "caddyfile",
            Dialect::Yaml => "yaml",
            Dialect::Nginx => "nginx",
        }
    }
}

impl FromStr for Dialect {
    type Err = AdaptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "caddyfile" => Ok(Dialect::Caddyfile),
            "yaml" => Ok(Dialect::Yaml),
            "nginx" => Ok(Dialect::Nginx),
            other => Err(AdaptError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of a successful conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Adapted {
    pub json: String,
    /// Non-fatal diagnostics, one per line, in the adapter's own wording.
    pub warnings: Vec<String>,
}

/// A single dialect converter: bytes in, Caddy JSON out.
#[async_trait]
pub trait FormatAdapter: Send + Sync {
    async fn adapt(&self, input: &[u8]) -> anyhow::Result<Adapted>;
}

/// Routes conversion requests to the adapter registered for each dialect.
#[derive(Clone, Default)]
pub struct AdapterGateway {
    adapters: HashMap<Dialect, Arc<dyn FormatAdapter>>,
}

impl AdapterGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// YAML is converted in-process; Caddyfile and nginx go through the admin
    /// API's own adapters.
    pub fn with_defaults(admin: AdminClient) -> Self {
        Self::new()
            .with_adapter(Dialect::Yaml, Arc::new(YamlAdapter))
            .with_adapter(
                Dialect::Caddyfile,
                Arc::new(AdminApiAdapter::new(admin.clone(), "text/caddyfile")),
            )
            .with_adapter(
                Dialect::Nginx,
                Arc::new(AdminApiAdapter::new(admin, "text/nginx")),
            )
    }

    pub fn with_adapter(mut self, dialect: Dialect, adapter: Arc<dyn FormatAdapter>) -> Self {
        self.adapters.insert(dialect, adapter);
        self
    }

    pub async fn adapt(&self, dialect: &str, input: &[u8]) -> Result<Adapted, AdaptError> {
        let parsed: Dialect = dialect.parse()?;
        let adapter = self
            .adapters
            .get(&parsed)
            .ok_or_else(|| AdaptError::UnsupportedFormat(dialect.to_string()))?;

        debug!("Adapting {} bytes of {}", input.len(), parsed);

        let adapted = adapter
            .adapt(input)
            .await
            .map_err(|e| AdaptError::Adapter {
                dialect: parsed.to_string(),
                message: format!("{:#}", e),
            })?;

        for warning in &adapted.warnings {
            warn!("{} adapter warning: {}", parsed, warning);
        }

        Ok(adapted)
    }
}
