pub mod api;

use crate::cli::ServeArgs;
use crate::proxy::AgentProxy;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

pub struct Server {
    addr: SocketAddr,
    proxy: Arc<AgentProxy>,
    args: ServeArgs,
}

impl Server {
    pub fn new(args: ServeArgs) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let addr = args.server_addr
            .parse::<SocketAddr>()
            .map_err(|e| format!("Invalid server address '{}': {}", args.server_addr, e))?;
        let proxy = Arc::new(AgentProxy::from_args(&args)?);

        Ok(Self { addr, proxy, args })
    }

    pub fn proxy(&self) -> Arc<AgentProxy> {
        Arc::clone(&self.proxy)
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        api::start_http_server(self.addr, self.proxy(), &self.args).await
    }
}
