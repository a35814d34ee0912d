//! REST API routes configuration

use crate::api::handlers::{self, ApiState};
use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};

/// HTTP server settings
#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

impl ApiConfig {
    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

/// JSON 404 for unknown routes
async fn fallback_handler() -> impl IntoResponse {
    let mut response = Response::new(Body::from(r#"{"error":"Not Found"}"#));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    response
}

/// Create the API router with all routes
pub fn create_router(state: ApiState) -> Router {
    // Configure CORS for browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        // Contracts
        .route("/api/contracts", get(handlers::list_contracts))
        .route("/api/contracts/{address}", get(handlers::get_contract))
        // Wallets
        .route("/api/wallets/{address}", get(handlers::get_wallet))
        .route(
            "/api/wallets/{address}/transactions",
            get(handlers::list_transactions),
        )
        .route(
            "/api/wallets/{address}/transactions/{id}",
            get(handlers::get_transaction),
        )
        // Registries
        .route(
            "/api/registries/{address}/resolve/{name}",
            get(handlers::resolve_name),
        )
        .fallback(fallback_handler)
        .with_state(state)
        .layer(cors)
}

/// Serve the API until the process is stopped
pub async fn serve(state: ApiState, config: &ApiConfig) -> std::io::Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    log::info!("API listening on {}", config.bind_address());
    axum::serve(listener, app).await
}
