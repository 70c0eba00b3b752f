pub mod chat;
pub mod cli;
pub mod conversation;
pub mod models;
pub mod proxy;
pub mod render;
pub mod server;

use cli::{ Cli, Commands };
use log::info;
use server::Server;
use std::error::Error;

pub async fn run(cli: Cli) -> Result<(), Box<dyn Error + Send + Sync>> {
    match cli.command {
        Commands::Serve(args) => {
            info!("--- Proxy Configuration ---");
            info!("Server Address: {}", args.server_addr);
            info!("Agent URL: {}", args.agent_url);
            info!("Upstream Timeout: {}s", args.upstream_timeout_secs);
            info!("TLS Enabled: {}", args.enable_tls);

            let server = Server::new(args)?;
            info!("Fallback Message: {}", server.proxy().fallback_message());
            info!("---------------------------");
            server.run().await?;
        }
        Commands::Chat(args) => {
            chat::run(args).await?;
        }
    }

    Ok(())
}
