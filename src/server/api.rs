use crate::cli::ServeArgs;
use crate::models::api::HealthResponse;
use crate::proxy::{ is_json, AgentProxy, ProxyReply };
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use axum::{
    body::Bytes,
    routing::{ get, post },
    Router,
    extract::{ DefaultBodyLimit, State },
    response::IntoResponse,
    Json,
};
use tower::ServiceBuilder;
use tower_http::cors::{ Any, CorsLayer };
use log::{ info, error };

#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<AgentProxy>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/api/health", get(health_handler))
        .layer(DefaultBodyLimit::disable())
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state)
}

pub async fn start_http_server(
    addr: SocketAddr,
    proxy: Arc<AgentProxy>,
    args: &ServeArgs
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let app = router(AppState { proxy });

    if args.enable_tls {
        let (cert_path, key_path) = match (&args.tls_cert_path, &args.tls_key_path) {
            (Some(cert), Some(key)) => (cert, key),
            _ => {
                error!("--enable-tls was set but --tls-cert-path and --tls-key-path were not both provided.");
                return Err("TLS enabled without cert/key".into());
            }
        };
        info!("TLS enabled. Loading certificate from '{}' and key from '{}'", cert_path, key_path);

        let tls_config = axum_server::tls_rustls::RustlsConfig
            ::from_pem_file(cert_path, key_path).await?;

        info!("Starting HTTPS proxy on: https://{}", addr);
        axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service()).await?;
    } else {
        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            error!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e);
            e
        })?;
        info!("Starting HTTP proxy on: http://{}", addr);
        axum::serve(listener, app.into_make_service()).await?;
    }

    Ok(())
}

async fn chat_handler(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    if !is_json(&body) {
        return ProxyReply::bad_request("Request body must be valid JSON");
    }
    state.proxy.forward(body).await
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "online".into(),
        upstream: state.proxy.agent_url().to_string(),
    })
}
