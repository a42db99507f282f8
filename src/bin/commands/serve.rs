use anyhow::Result;
use clap::Args;
use std::sync::Arc;
use tracing::info;
use txprobe::server::{start_server, ServerConfig};
use txprobe::{Dispatcher, ProbeConfig};

/// Arguments for the Serve command
#[derive(Args, Default)]
pub struct ServeArgs {
    /// Address to bind to, overrides the configured one
    #[clap(long)]
    pub address: Option<String>,

    /// Port to listen on, overrides the configured one
    #[clap(short, long)]
    pub port: Option<u16>,
}

pub fn run(config: &ProbeConfig, args: ServeArgs) -> Result<()> {
    let mut server_config = ServerConfig::from_probe_config(config);
    if let Some(address) = args.address {
        server_config = server_config.with_address(address);
    }
    if let Some(port) = args.port {
        server_config = server_config.with_port(port);
    }

    // Startup failures here are fatal: no listener without a usable store
    let store = super::open_store(config, config.reset_on_start)?;
    let dispatcher = Dispatcher::new(Arc::new(store), config.sequencer_settings())
        .with_immediate_placeholder(config.immediate_placeholder);
    info!(
        "Serving {} scenarios: {}",
        dispatcher.scenario_names().len(),
        dispatcher.scenario_names().join(", ")
    );

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(start_server(dispatcher, server_config))
}
