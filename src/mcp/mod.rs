pub mod dispatcher;
pub mod registry;
pub mod rmcp_server;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::DispatchError;

/// Arguments of one invocation. Every parameter in this server is a string.
pub type Arguments = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
    pub name: String,
    pub required: bool,
    pub description: String,
}

impl ParameterSpec {
    pub fn required(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
            description: description.into(),
        }
    }

    pub fn optional(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
            description: description.into(),
        }
    }
}

/// Static description of a tool as advertised to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParameterSpec>,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn input_schema(&self) -> ToolInputSchema {
        let mut schema = ToolInputSchema::default();
        for param in &self.parameters {
            schema.properties.insert(
                param.name.clone(),
                serde_json::json!({
                    "type": "string",
                    "description": param.description,
                }),
            );
            if param.required {
                schema.required.push(param.name.clone());
            }
        }
        schema
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInputSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl Default for ToolInputSchema {
    fn default() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: HashMap::new(),
            required: Vec::new(),
        }
    }
}

/// One request to run a named tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub tool_name: String,
    pub arguments: Arguments,
}

impl Invocation {
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments: Arguments::new(),
        }
    }

    pub fn with_argument(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }

    /// Build an invocation from the JSON arguments of an MCP `tools/call`.
    /// Non-string values are rejected rather than coerced.
    pub fn from_json(
        tool_name: impl Into<String>,
        arguments: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<Self, DispatchError> {
        let mut invocation = Self::new(tool_name);
        for (name, value) in arguments.unwrap_or_default() {
            match value {
                serde_json::Value::String(s) => {
                    invocation.arguments.insert(name, s);
                }
                _ => return Err(DispatchError::InvalidArgument { argument: name }),
            }
        }
        Ok(invocation)
    }
}

/// Successful tool output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextResult {
    pub content: String,
    /// Auxiliary lines such as adapter warnings. Empty for most tools.
    pub notes: Vec<String>,
}

impl TextResult {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            notes: Vec::new(),
        }
    }

    pub fn with_notes(mut self, notes: Vec<String>) -> Self {
        self.notes = notes;
        self
    }
}

/// Exactly one of these is produced per invocation.
#[derive(Debug)]
pub enum ResultEnvelope {
    Text(TextResult),
    Error(DispatchError),
}

impl ResultEnvelope {
    pub fn into_result(self) -> Result<TextResult, DispatchError> {
        match self {
            ResultEnvelope::Text(text) => Ok(text),
            ResultEnvelope::Error(err) => Err(err),
        }
    }
}

impl From<Result<TextResult, DispatchError>> for ResultEnvelope {
    fn from(result: Result<TextResult, DispatchError>) -> Self {
        match result {
            Ok(text) => ResultEnvelope::Text(text),
            Err(err) => ResultEnvelope::Error(err),
        }
    }
}
