//! imagegen-mcp server binary.

use anyhow::Result;
use clap::Parser;
use imagegen_mcp::ImageServer;
use imagegen_mcp_common::{Config, McpServerBuilder, TransportArgs};

/// MCP server generating images into an Obsidian vault via laozhang.ai.
#[derive(Parser, Debug)]
#[command(name = "imagegen-mcp", version, about)]
struct Args {
    #[command(flatten)]
    transport: TransportArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    imagegen_mcp_common::tracing::init_tracing();

    let args = Args::parse();
    let config = Config::from_env()?;
    tracing::info!(
        vault = %config.vault_path.display(),
        folder = %config.graphics_folder,
        api = %config.api_base_url,
        "imagegen-mcp starting"
    );

    McpServerBuilder::new(ImageServer::new(config))
        .with_transport(args.transport.into_transport())
        .run()
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
