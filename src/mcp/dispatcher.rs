use tracing::{debug, error, info};

use super::registry::ToolRegistry;
use super::{Invocation, ResultEnvelope, TextResult, ToolDescriptor};
use crate::error::DispatchError;

/// Resolves invocations against the registry and runs their handlers.
///
/// Holds no per-invocation state, so one instance serves every connection
/// of every transport concurrently.
pub struct Dispatcher {
    registry: ToolRegistry,
}

impl Dispatcher {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    pub fn tools(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.registry.descriptors()
    }

    pub async fn dispatch(&self, invocation: Invocation) -> ResultEnvelope {
        let tool_name = invocation.tool_name.clone();
        let envelope = ResultEnvelope::from(self.try_dispatch(invocation).await);

        match &envelope {
            ResultEnvelope::Text(_) => info!("Tool {} completed", tool_name),
            ResultEnvelope::Error(e) => error!("Tool {} failed: {}", tool_name, e),
        }

        envelope
    }

    async fn try_dispatch(&self, invocation: Invocation) -> Result<TextResult, DispatchError> {
        let tool = self
            .registry
            .resolve(&invocation.tool_name)
            .ok_or_else(|| DispatchError::UnknownTool(invocation.tool_name.clone()))?;

        if let Some(missing) = tool
            .descriptor
            .parameters
            .iter()
            .find(|p| p.required && !invocation.arguments.contains_key(&p.name))
        {
            return Err(DispatchError::MissingArgument {
                tool: invocation.tool_name,
                argument: missing.name.clone(),
            });
        }

        debug!(
            "Executing tool {} with {} argument(s)",
            invocation.tool_name,
            invocation.arguments.len()
        );

        Ok(tool.handler.call(&invocation.arguments).await?)
    }
}
