use tracing::info;

pub mod adapters;
pub mod caddy;
pub mod config;
pub mod error;
pub mod mcp;
pub mod tools;
pub mod transport;

pub use adapters::{AdapterGateway, Dialect};
pub use caddy::AdminClient;
pub use config::{ServerConfig, TransportKind};
pub use mcp::dispatcher::Dispatcher;
pub use mcp::rmcp_server::CaddyMcpHandler;
pub use mcp::{Invocation, ResultEnvelope, TextResult};

/// Wire the admin client, adapters, tool catalogue and dispatcher together.
pub fn build_handler(config: &ServerConfig) -> anyhow::Result<CaddyMcpHandler> {
    let admin = AdminClient::new(config.base_url.clone())?;
    info!("Using Caddy admin API at {}", admin.base_url());
    let gateway = AdapterGateway::with_defaults(admin.clone());
    let registry = tools::build_registry(admin, gateway)?;

    Ok(CaddyMcpHandler::new(Dispatcher::new(registry)).with_instructions(tools::INSTRUCTIONS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AdaptError, DispatchError, ToolError};
    use serde_json::{Value, json};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn dispatcher_for(base_url: &str) -> Dispatcher {
        let admin = AdminClient::new(base_url).unwrap();
        let gateway = AdapterGateway::with_defaults(admin.clone());
        Dispatcher::new(tools::build_registry(admin, gateway).unwrap())
    }

    async fn run(dispatcher: &Dispatcher, invocation: Invocation) -> Result<TextResult, DispatchError> {
        dispatcher.dispatch(invocation).await.into_result()
    }

    #[tokio::test]
    async fn test_get_config_passes_admin_json_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/config/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"apps":{}}"#))
            .mount(&server)
            .await;

        let dispatcher = dispatcher_for(&server.uri());
        let result = run(&dispatcher, Invocation::new(tools::GET_CONFIG))
            .await
            .unwrap();

        assert_eq!(result.content, r#"{"apps":{}}"#);
    }

    #[tokio::test]
    async fn test_get_config_without_loaded_config_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/config/"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let dispatcher = dispatcher_for(&server.uri());
        let err = run(&dispatcher, Invocation::new(tools::GET_CONFIG))
            .await
            .unwrap_err();

        assert!(!err.is_protocol_error());
        assert_eq!(err.to_string(), "no configuration currently loaded");
    }

    #[tokio::test]
    async fn test_update_rejection_is_returned_as_text() {
        let server = MockServer::start().await;
        let caddy_body = r#"{"error":"json: ..."}"#;
        Mock::given(method("POST"))
            .and(path("/load"))
            .respond_with(ResponseTemplate::new(400).set_body_string(caddy_body))
            .mount(&server)
            .await;

        let dispatcher = dispatcher_for(&server.uri());
        let result = run(
            &dispatcher,
            Invocation::new(tools::UPDATE_CONFIG).with_argument("json_config", "{bad"),
        )
        .await
        .unwrap();

        assert_eq!(
            result.content,
            r#"{"status_code":400,"message":"{\"error\":\"json: ...\"}"}"#
        );
        let parsed: Value = serde_json::from_str(&result.content).unwrap();
        assert_eq!(parsed["status_code"], json!(400));
        assert_eq!(parsed["message"], json!(caddy_body));
    }

    #[tokio::test]
    async fn test_update_server_error_keeps_body_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/load"))
            .respond_with(ResponseTemplate::new(500).set_body_string("  provisioning failed\n"))
            .mount(&server)
            .await;

        let dispatcher = dispatcher_for(&server.uri());
        let result = run(
            &dispatcher,
            Invocation::new(tools::UPDATE_CONFIG).with_argument("json_config", "{}"),
        )
        .await
        .unwrap();

        let parsed: Value = serde_json::from_str(&result.content).unwrap();
        assert_eq!(parsed["status_code"], json!(500));
        assert_eq!(parsed["message"], json!("  provisioning failed\n"));
    }

    #[tokio::test]
    async fn test_update_success_returns_new_config() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/load"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let dispatcher = dispatcher_for(&server.uri());
        let config = r#"{"apps":{"http":{}}}"#;
        let result = run(
            &dispatcher,
            Invocation::new(tools::UPDATE_CONFIG).with_argument("json_config", config),
        )
        .await
        .unwrap();

        assert_eq!(result.content, config);
    }

    #[tokio::test]
    async fn test_update_against_unreachable_admin_api_is_an_error() {
        let dispatcher = dispatcher_for("http://127.0.0.1:9");
        let err = run(
            &dispatcher,
            Invocation::new(tools::UPDATE_CONFIG).with_argument("json_config", "{}"),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DispatchError::Tool(ToolError::Admin(_))));
    }

    #[tokio::test]
    async fn test_missing_argument_makes_no_http_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dispatcher = dispatcher_for(&server.uri());
        for (tool, argument) in [
            (tools::UPDATE_CONFIG, "json_config"),
            (tools::CONVERT_CADDYFILE, "caddyfile_config"),
            (tools::CONVERT_NGINX, "nginx_config"),
        ] {
            let err = run(&dispatcher, Invocation::new(tool)).await.unwrap_err();
            assert!(matches!(
                err,
                DispatchError::MissingArgument { argument: ref a, .. } if a == argument
            ));
        }
        // `expect(0)` is verified when the mock server drops.
    }

    #[tokio::test]
    async fn test_convert_yaml_produces_equivalent_json() {
        let dispatcher = dispatcher_for("http://127.0.0.1:2019");
        let yaml = "apps:\n  http:\n    servers:\n      main:\n        listen:\n          - \":80\"\n";

        let result = run(
            &dispatcher,
            Invocation::new(tools::CONVERT_YAML).with_argument("yaml_config", yaml),
        )
        .await
        .unwrap();

        let parsed: Value = serde_json::from_str(&result.content).unwrap();
        assert_eq!(
            parsed,
            json!({"apps": {"http": {"servers": {"main": {"listen": [":80"]}}}}})
        );
    }

    #[tokio::test]
    async fn test_unsupported_dialect() {
        let gateway = AdapterGateway::with_defaults(AdminClient::new("http://127.0.0.1:2019").unwrap());
        let err = gateway.adapt("toml", b"[apps]").await.unwrap_err();
        assert!(matches!(err, AdaptError::UnsupportedFormat(name) if name == "toml"));
    }

    #[tokio::test]
    async fn test_convert_caddyfile_via_admin_api_with_warnings() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/adapt"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"warnings":[{"file":"Caddyfile","line":1,"message":"input is not formatted with 'caddy fmt'"}],"result":{"apps":{"http":{}}}}"#,
            ))
            .mount(&server)
            .await;

        let dispatcher = dispatcher_for(&server.uri());
        let result = run(
            &dispatcher,
            Invocation::new(tools::CONVERT_CADDYFILE)
                .with_argument("caddyfile_config", "localhost\nrespond \"hi\""),
        )
        .await
        .unwrap();

        assert_eq!(result.content, r#"{"apps":{"http":{}}}"#);
        assert_eq!(
            result.notes,
            vec!["Caddyfile:1: input is not formatted with 'caddy fmt'".to_string()]
        );
    }

    #[tokio::test]
    async fn test_convert_nginx_failure_has_dialect_context() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/adapt"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_string(r#"{"error":"unrecognized config adapter 'nginx'"}"#),
            )
            .mount(&server)
            .await;

        let dispatcher = dispatcher_for(&server.uri());
        let err = run(
            &dispatcher,
            Invocation::new(tools::CONVERT_NGINX).with_argument("nginx_config", "server {}"),
        )
        .await
        .unwrap_err();

        assert!(err.to_string().starts_with("failed to adapt nginx: "));
    }

    #[tokio::test]
    async fn test_upstream_statuses_passthrough() {
        let server = MockServer::start().await;
        let body = r#"[{"address":"10.0.0.1:8080","num_requests":2,"fails":0}]"#;
        Mock::given(method("GET"))
            .and(path("/reverse_proxy/upstreams"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let dispatcher = dispatcher_for(&server.uri());
        let result = run(&dispatcher, Invocation::new(tools::UPSTREAM_STATUSES))
            .await
            .unwrap();

        assert_eq!(result.content, body);
    }

    #[test]
    fn test_build_handler_from_config() {
        let config = ServerConfig::default();
        let handler = build_handler(&config).unwrap();
        assert_eq!(handler.dispatcher().tools().count(), 6);
    }
}
