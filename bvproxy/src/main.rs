mod server;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use bvproxy_api::AppState;
use bvproxy_core::{logging, Config};

use server::BvProxyServer;

#[derive(Parser, Debug)]
#[command(name = "bvproxy")]
#[command(about = "Redirects Bilibili BV ids and live rooms to their media streams", long_about = None)]
struct Args {
    /// Configuration file (YAML, TOML or JSON). Missing files are skipped.
    #[arg(long, env = "BVPROXY_CONFIG_PATH", default_value = "config.yaml")]
    config: String,

    /// Override `server.host`
    #[arg(long)]
    host: Option<String>,

    /// Override `server.port`
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load configuration
    let mut config = Config::load(Some(&args.config))?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    // 2. Validate (fail fast on misconfigurations)
    if let Err(errors) = config.validate() {
        for e in &errors {
            eprintln!("Config validation error: {e}");
        }
        return Err(anyhow::anyhow!(
            "Configuration validation failed with {} error(s)",
            errors.len()
        ));
    }

    // 3. Initialize logging
    logging::init_logging(&config.logging)?;
    info!("bvproxy starting...");
    info!("HTTP address: {}", config.http_address());
    info!("Session file: {}", config.bilibili.session_file);
    if !config.cdn.rewrite {
        info!("CDN host rewriting disabled");
    }

    // 4. Build shared state
    let state = AppState::from_config(config)?;

    BvProxyServer::new(state).start().await
}
