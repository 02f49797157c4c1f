use anyhow::Result;
use argh::FromArgs;
use tracing::info;
use tracing_subscriber::EnvFilter;

use caddy_mcp::config::{DEFAULT_ADMIN_URL, ServerConfig};

#[derive(FromArgs)]
/// MCP server for managing a Caddy instance through its admin API
struct Args {
    /// the URL of the Caddy admin API (default: http://127.0.0.1:2019)
    #[argh(option, default = "DEFAULT_ADMIN_URL.to_string()")]
    url: String,

    /// the transport to serve MCP over: stdio, sse or httpstream (default: stdio)
    #[argh(option, default = "\"stdio\".to_string()")]
    transport: String,

    /// port for the sse and httpstream transports (default: 7000)
    #[argh(option, short = 'p', default = "7000")]
    port: u16,

    /// print version and exit
    #[argh(switch, short = 'v')]
    version: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Args = argh::from_env();

    if args.version {
        println!("caddy-mcp {}", env!("CADDY_MCP_VERSION"));
        return Ok(());
    }

    // stdout belongs to the stdio transport
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .without_time()
        .init();

    let config = ServerConfig::new(&args.url, &args.transport, args.port)?;

    info!(
        "Starting Caddy MCP server for {} over {}",
        config.base_url, config.transport
    );

    let handler = caddy_mcp::build_handler(&config)?;
    let binding = caddy_mcp::transport::binding_for(&config);

    info!("Server ready, starting main loop");
    binding.serve(handler).await
}
