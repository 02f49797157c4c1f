use anyhow::Result;
use async_trait::async_trait;

use super::{Adapted, FormatAdapter};
use crate::caddy::AdminClient;

/// Hands the conversion to one of the adapters compiled into the running
/// Caddy, selected by media type (`text/caddyfile`, `text/nginx`, ...).
#[derive(Debug, Clone)]
pub struct AdminApiAdapter {
    client: AdminClient,
    content_type: &'static str,
}

impl AdminApiAdapter {
    pub fn new(client: AdminClient, content_type: &'static str) -> Self {
        Self {
            client,
            content_type,
        }
    }
}

#[async_trait]
impl FormatAdapter for AdminApiAdapter {
    async fn adapt(&self, input: &[u8]) -> Result<Adapted> {
        let response = self.client.adapt(self.content_type, input).await?;

        Ok(Adapted {
            json: serde_json::to_string(&response.result)?,
            warnings: response.warnings.iter().map(ToString::to_string).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_sends_input_with_dialect_media_type() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/adapt"))
            .and(header("content-type", "text/nginx"))
            .and(body_string("server { listen 80; }"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"warnings":[{"file":"nginx.conf","line":1,"message":"unsupported directive"}],"result":{"apps":{"http":{}}}}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = AdminApiAdapter::new(AdminClient::new(server.uri()).unwrap(), "text/nginx");
        let adapted = adapter.adapt(b"server { listen 80; }").await.unwrap();

        assert_eq!(adapted.json, r#"{"apps":{"http":{}}}"#);
        assert_eq!(
            adapted.warnings,
            vec!["nginx.conf:1: unsupported directive".to_string()]
        );
    }

    #[tokio::test]
    async fn test_surfaces_caddy_adapter_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/adapt"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_string(r#"{"error":"unrecognized config adapter 'nginx'"}"#),
            )
            .mount(&server)
            .await;

        let adapter = AdminApiAdapter::new(AdminClient::new(server.uri()).unwrap(), "text/nginx");
        let err = adapter.adapt(b"server {}").await.unwrap_err();

        assert!(
            err.to_string()
                .contains("unrecognized config adapter 'nginx'")
        );
    }
}
