use clap::{ Parser, Subcommand };

pub const DEFAULT_AGENT_URL: &str = "http://127.0.0.1:8001/chat";

pub const DEFAULT_FALLBACK_MESSAGE: &str =
    "Error: could not reach the housing analytics agent. Make sure the backend is running on port 8001.";

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the HTTP proxy in front of the analytics agent
    Serve(ServeArgs),

    /// Open an interactive terminal chat against a running proxy
    Chat(ChatArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    /// Host address and port for the proxy to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:3000")]
    pub server_addr: String,

    /// Agent chat endpoint every request is forwarded to.
    #[arg(long, env = "AGENT_URL", default_value = DEFAULT_AGENT_URL)]
    pub agent_url: String,

    /// Message returned with a 502 when the agent cannot be reached.
    #[arg(long, env = "FALLBACK_MESSAGE", default_value = DEFAULT_FALLBACK_MESSAGE)]
    pub fallback_message: String,

    /// Upstream request timeout in seconds. 0 leaves the transport default in place.
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS", default_value = "60")]
    pub upstream_timeout_secs: u64,

    /// Optional path to the TLS certificate file (PEM format). Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format). Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ChatArgs {
    /// Proxy chat endpoint the terminal client posts to.
    #[arg(long, env = "PROXY_URL", default_value = "http://127.0.0.1:3000/api/chat")]
    pub proxy_url: String,

    /// Width in columns of the bars drawn for chart replies.
    #[arg(long, env = "CHART_WIDTH", default_value = "40")]
    pub chart_width: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_defaults_point_at_local_agent() {
        let cli = Cli::try_parse_from(["housing-chat", "serve"]).unwrap();
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.agent_url, DEFAULT_AGENT_URL);
                assert_eq!(args.upstream_timeout_secs, 60);
                assert!(args.fallback_message.starts_with("Error"));
                assert!(!args.enable_tls);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn chat_accepts_proxy_override() {
        let cli = Cli::try_parse_from([
            "housing-chat",
            "--debug",
            "chat",
            "--proxy-url",
            "http://10.0.0.2:9000/api/chat",
        ]).unwrap();
        assert!(cli.debug);
        match cli.command {
            Commands::Chat(args) => assert_eq!(args.proxy_url, "http://10.0.0.2:9000/api/chat"),
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
