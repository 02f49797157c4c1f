//! The tool catalogue exposed to agents and the handlers behind it.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use crate::adapters::{AdapterGateway, Dialect};
use crate::caddy::{AdminClient, LoadOutcome};
use crate::error::{RegistryError, ToolError};
use crate::mcp::registry::{ToolHandler, ToolRegistry};
use crate::mcp::{Arguments, ParameterSpec, TextResult, ToolDescriptor};

pub const GET_CONFIG: &str = "get_caddy_config";
pub const UPDATE_CONFIG: &str = "update_caddy_config";
pub const CONVERT_CADDYFILE: &str = "convert_caddyfile_to_json";
pub const CONVERT_NGINX: &str = "convert_nginx_to_json";
pub const CONVERT_YAML: &str = "convert_yaml_to_json";
pub const UPSTREAM_STATUSES: &str = "upstream_proxy_statuses";

/// Sent to clients in the initialize result.
pub const INSTRUCTIONS: &str = "\
This server manages a Caddy server instance. Use it to get the current Caddy \
configuration in JSON format and describe it in a human readable way, or to \
replace the configuration with the update_caddy_config tool.

Best practices:
1. ALWAYS provide the full JSON configuration to the update_caddy_config tool.
2. To add a new section to the configuration, first fetch the current \
configuration with get_caddy_config, add the section, then call \
update_caddy_config with the result.
";

/// Build the complete catalogue around one admin client and adapter gateway.
pub fn build_registry(
    admin: AdminClient,
    gateway: AdapterGateway,
) -> Result<ToolRegistry, RegistryError> {
    let gateway = Arc::new(gateway);
    let mut registry = ToolRegistry::new();

    registry.register(
        ToolDescriptor::new(
            GET_CONFIG,
            "Get the current Caddy server configuration in JSON format.\n\n\
             Caddy always returns a JSON configuration unless no configuration \
             is currently loaded.",
        ),
        Arc::new(GetConfig {
            admin: admin.clone(),
        }),
    )?;

    registry.register(
        ToolDescriptor::new(
            UPDATE_CONFIG,
            "Replace the Caddy server configuration with the given JSON configuration.\n\n\
             Notes:\n\
             - The configuration must be valid JSON.\n\
             - Provide the full configuration, not a partial one. Use get_caddy_config \
             to fetch the current configuration first.\n\
             - Convert YAML, nginx or Caddyfile input with convert_yaml_to_json, \
             convert_nginx_to_json or convert_caddyfile_to_json before calling this tool.\n\
             - If Caddy rejects the configuration, the result is a JSON object with \
             status_code and message describing why.",
        )
        .with_parameter(ParameterSpec::required(
            "json_config",
            "The Caddy JSON configuration to load",
        )),
        Arc::new(UpdateConfig {
            admin: admin.clone(),
        }),
    )?;

    let conversions = [
        (
            CONVERT_CADDYFILE,
            Dialect::Caddyfile,
            "caddyfile_config",
            "Caddyfile",
        ),
        (CONVERT_NGINX, Dialect::Nginx, "nginx_config", "nginx"),
        (CONVERT_YAML, Dialect::Yaml, "yaml_config", "YAML"),
    ];
    for (name, dialect, argument, label) in conversions {
        registry.register(
            ToolDescriptor::new(
                name,
                format!(
                    "Convert a {label} configuration to Caddy JSON configuration.\n\n\
                     Notes:\n\
                     - You must provide a valid {label} configuration.\n\
                     - Adapter warnings, if any, are returned after the JSON."
                ),
            )
            .with_parameter(ParameterSpec::required(
                argument,
                format!("The {label} configuration to convert to JSON"),
            )),
            Arc::new(Convert {
                gateway: gateway.clone(),
                dialect,
                argument,
            }),
        )?;
    }

    registry.register(
        ToolDescriptor::new(
            UPSTREAM_STATUSES,
            "Get the current status of the configured reverse proxy upstreams \
             (backends) as a JSON document. Use it to confirm that the backend \
             servers are running and responding to requests.",
        ),
        Arc::new(UpstreamStatuses { admin }),
    )?;

    Ok(registry)
}

struct GetConfig {
    admin: AdminClient,
}

#[async_trait]
impl ToolHandler for GetConfig {
    async fn call(&self, _arguments: &Arguments) -> Result<TextResult, ToolError> {
        Ok(TextResult::new(self.admin.get_config().await?))
    }
}

struct UpdateConfig {
    admin: AdminClient,
}

#[async_trait]
impl ToolHandler for UpdateConfig {
    async fn call(&self, arguments: &Arguments) -> Result<TextResult, ToolError> {
        let config = required(arguments, "json_config");

        match self.admin.load_config(config).await? {
            LoadOutcome::Applied { body } if body.trim().is_empty() => {
                Ok(TextResult::new(config))
            }
            LoadOutcome::Applied { body } => Ok(TextResult::new(body)),
            // Rejections are data for the agent to act on, not failures.
            LoadOutcome::Rejected(rejection) => {
                warn!(
                    "Returning Caddy rejection ({}) to caller",
                    rejection.status_code
                );
                Ok(TextResult::new(serde_json::to_string(&rejection)?))
            }
        }
    }
}

struct Convert {
    gateway: Arc<AdapterGateway>,
    dialect: Dialect,
    argument: &'static str,
}

#[async_trait]
impl ToolHandler for Convert {
    async fn call(&self, arguments: &Arguments) -> Result<TextResult, ToolError> {
        let input = required(arguments, self.argument);
        let adapted = self
            .gateway
            .adapt(self.dialect.as_str(), input.as_bytes())
            .await?;
        Ok(TextResult::new(adapted.json).with_notes(adapted.warnings))
    }
}

struct UpstreamStatuses {
    admin: AdminClient,
}

#[async_trait]
impl ToolHandler for UpstreamStatuses {
    async fn call(&self, _arguments: &Arguments) -> Result<TextResult, ToolError> {
        Ok(TextResult::new(self.admin.upstream_statuses().await?))
    }
}

/// The dispatcher has already checked required arguments are present.
fn required<'a>(arguments: &'a Arguments, name: &str) -> &'a str {
    arguments.get(name).map(String::as_str).unwrap_or_default()
}
