use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use super::{Adapted, FormatAdapter};

/// Converts a YAML document into the equivalent Caddy JSON.
///
/// Top-level keys starting with `x-` are extension fields (anchors meant for
/// reuse elsewhere in the document) and are left out of the output.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlAdapter;

#[async_trait]
impl FormatAdapter for YamlAdapter {
    async fn adapt(&self, input: &[u8]) -> Result<Adapted> {
        let text = std::str::from_utf8(input).context("input is not valid UTF-8")?;
        let mut value: Value = serde_saphyr::from_str(text).context("invalid YAML")?;

        if let Value::Object(map) = &mut value {
            map.retain(|key, _| !key.starts_with("x-"));
        }

        Ok(Adapted {
            json: serde_json::to_string(&value)?,
            warnings: Vec::new(),
        })
    }
}
