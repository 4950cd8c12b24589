// rpc-cli - process entry point. Loads the `key=value` config file, then
// starts either a provider (RPC server publishing services) or a proxy
// (inbound gateway) depending on `--role`.

mod cli;
mod config;
mod demo_service;
mod logging;

use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use cli::{Cli, Role};
use config::AppConfig;
use rpc_coord::LocalCoordinationClient;
use rpc_proxy::{ConnectionManager, HandlerRegistry};
use rpc_server::ServiceRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;

    match cli.role {
        Role::Provider => run_provider(config).await,
        Role::Proxy => run_proxy(config).await,
    }
}

async fn run_provider(config: AppConfig) -> anyhow::Result<()> {
    let host = config.require("rpcserverip")?.to_string();
    let port = config.require_port("rpcserverport")?;

    let mut registry = ServiceRegistry::new();
    demo_service::register(&mut registry);

    let coord = LocalCoordinationClient::new();
    rpc_server::publish_services(&registry, &coord, &config.services, &host, port)?;

    let listener = TcpListener::bind((host.as_str(), port)).await?;
    tracing::info!(%host, port, services = ?config.services, "provider listening");
    rpc_server::serve(listener, Arc::new(registry)).await?;
    Ok(())
}

async fn run_proxy(config: AppConfig) -> anyhow::Result<()> {
    let host = config.require("gateserverip")?.to_string();
    let port = config.require_port("gateserverport")?;

    let handlers = Arc::new(HandlerRegistry::new());
    let connections = Arc::new(ConnectionManager::new());

    let listener = TcpListener::bind((host.as_str(), port)).await?;
    tracing::info!(%host, port, "proxy listening");
    rpc_proxy::serve(listener, handlers, connections).await?;
    Ok(())
}
