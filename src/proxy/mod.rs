use crate::cli::ServeArgs;
use crate::models::api::{ ProxyErrorBody, ProxyFallbackBody };
use axum::body::Bytes;
use axum::http::{ header, StatusCode };
use axum::response::{ IntoResponse, Response };
use log::{ debug, error, warn };
use serde::de::IgnoredAny;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("invalid agent url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("agent url must use http or https, got '{0}'")]
    UnsupportedScheme(String),
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Status and raw JSON body handed back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyReply {
    pub status: StatusCode,
    pub body: Bytes,
}

impl ProxyReply {
    fn json<T: Serialize>(status: StatusCode, payload: &T) -> Self {
        let body = serde_json::to_vec(payload).unwrap_or_else(|_| b"{}".to_vec());
        Self { status, body: Bytes::from(body) }
    }

    pub fn upstream_error(status: StatusCode) -> Self {
        Self::json(status, &ProxyErrorBody {
            error: format!("Agent service responded with status {}", status.as_u16()),
        })
    }

    pub fn fallback(message: &str) -> Self {
        Self::json(StatusCode::BAD_GATEWAY, &ProxyFallbackBody {
            response: message.to_string(),
        })
    }

    pub fn bad_request(message: &str) -> Self {
        Self::json(StatusCode::BAD_REQUEST, &ProxyErrorBody { error: message.to_string() })
    }
}

impl IntoResponse for ProxyReply {
    fn into_response(self) -> Response {
        (self.status, [(header::CONTENT_TYPE, "application/json")], self.body).into_response()
    }
}

pub fn is_json(bytes: &[u8]) -> bool {
    serde_json::from_slice::<IgnoredAny>(bytes).is_ok()
}

/// Pass-through client for the analytics agent. No retries and no request
/// rewriting: the body goes out as received and the reply comes back as sent.
#[derive(Clone, Debug)]
pub struct AgentProxy {
    http: reqwest::Client,
    agent_url: Url,
    fallback_message: String,
}

impl AgentProxy {
    pub fn new(
        agent_url: &str,
        fallback_message: impl Into<String>,
        timeout: Option<Duration>
    ) -> Result<Self, ProxyError> {
        let parsed = Url::parse(agent_url).map_err(|source| ProxyError::InvalidUrl {
            url: agent_url.to_string(),
            source,
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ProxyError::UnsupportedScheme(parsed.scheme().to_string()));
        }

        // Redirects are relayed to the caller as upstream failures.
        let mut builder = reqwest::Client::builder().redirect(reqwest::redirect::Policy::none());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            agent_url: parsed,
            fallback_message: fallback_message.into(),
        })
    }

    pub fn from_args(args: &ServeArgs) -> Result<Self, ProxyError> {
        let timeout = match args.upstream_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Self::new(&args.agent_url, args.fallback_message.clone(), timeout)
    }

    pub fn agent_url(&self) -> &str {
        self.agent_url.as_str()
    }

    pub fn fallback_message(&self) -> &str {
        &self.fallback_message
    }

    pub async fn forward(&self, body: Bytes) -> ProxyReply {
        debug!("Forwarding {} byte request to {}", body.len(), self.agent_url);

        let response = match
            self.http
                .post(self.agent_url.clone())
                .header(header::CONTENT_TYPE, "application/json")
                .body(body)
                .send().await
        {
            Ok(resp) => resp,
            Err(e) => {
                warn!("Agent at {} unreachable: {}", self.agent_url, e);
                return ProxyReply::fallback(&self.fallback_message);
            }
        };

        let status = response.status();
        if !status.is_success() {
            error!("Agent at {} responded with status {}", self.agent_url, status);
            return ProxyReply::upstream_error(status);
        }

        match response.bytes().await {
            Ok(bytes) if is_json(&bytes) => ProxyReply { status, body: bytes },
            Ok(bytes) => {
                warn!("Agent returned {} bytes that are not valid JSON", bytes.len());
                ProxyReply::fallback(&self.fallback_message)
            }
            Err(e) => {
                warn!("Failed to read agent response body: {}", e);
                ProxyReply::fallback(&self.fallback_message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serde_json::{ json, Value as JsonValue };

    fn body_json(reply: &ProxyReply) -> JsonValue {
        serde_json::from_slice(&reply.body).unwrap()
    }

    #[test]
    fn rejects_non_http_agent_urls() {
        let err = AgentProxy::new("ftp://127.0.0.1/chat", "down", None).unwrap_err();
        assert!(matches!(err, ProxyError::UnsupportedScheme(ref s) if s == "ftp"));

        let err = AgentProxy::new("not a url", "down", None).unwrap_err();
        assert!(matches!(err, ProxyError::InvalidUrl { .. }));
    }

    #[test]
    fn from_args_carries_configured_fallback() {
        let cli = crate::cli::Cli::try_parse_from([
            "housing-chat",
            "serve",
            "--fallback-message",
            "Agent offline, start it on port 8001",
            "--upstream-timeout-secs",
            "0",
        ]).unwrap();
        let crate::cli::Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        let proxy = AgentProxy::from_args(&args).unwrap();
        assert_eq!(proxy.fallback_message(), "Agent offline, start it on port 8001");
        assert_eq!(proxy.agent_url(), crate::cli::DEFAULT_AGENT_URL);
    }

    #[test]
    fn upstream_error_keeps_status() {
        let reply = ProxyReply::upstream_error(StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(reply.status, StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(&reply);
        assert!(body["error"].as_str().unwrap().contains("503"));
    }

    #[test]
    fn fallback_is_bad_gateway_with_message() {
        let reply = ProxyReply::fallback("Error: agent offline");
        assert_eq!(reply.status, StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(&reply), json!({ "response": "Error: agent offline" }));
    }

    #[test]
    fn json_detection() {
        assert!(is_json(br#"{"message":"hi"}"#));
        assert!(is_json(b"[1, 2]"));
        assert!(!is_json(b"<html>"));
        assert!(!is_json(b""));
    }

    #[tokio::test]
    async fn unreachable_agent_yields_fallback() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let proxy = AgentProxy::new(
            &format!("http://127.0.0.1:{}/chat", port),
            "Error: start the agent",
            Some(Duration::from_secs(5))
        ).unwrap();
        let reply = proxy.forward(Bytes::from_static(br#"{"message":"hi"}"#)).await;
        assert_eq!(reply.status, StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(&reply)["response"], "Error: start the agent");
    }
}
