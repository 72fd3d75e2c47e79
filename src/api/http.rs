// SPDX-License-Identifier: GPL-3.0-only
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::handlers::{ApiHandlers, ApiResponse, CommandEnvelope, StatusReport};
use crate::api::websocket::WebSocketServer;
use crate::gateway::GatewayError;

pub struct HttpServer {
    handlers: Arc<ApiHandlers>,
    addr: SocketAddr,
}

impl HttpServer {
    pub fn new(handlers: Arc<ApiHandlers>, addr: SocketAddr) -> Self {
        Self { handlers, addr }
    }

    pub fn router(handlers: Arc<ApiHandlers>) -> Router {
        Router::new()
            .route("/api/health", get(health_handler))
            .route("/api/status", get(status_handler))
            .route("/api/call", post(call_handler))
            .with_state(handlers.clone())
            .merge(WebSocketServer::new(handlers).router())
    }

    /// Serve until `shutdown` is cancelled
    pub async fn serve(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let app = Self::router(self.handlers);

        info!(addr = %self.addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }
}

/// HTTP status for a gateway fault
pub fn status_code(error: &GatewayError) -> StatusCode {
    match error {
        GatewayError::MapNotInitialized | GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
        GatewayError::AlreadyExists(_) => StatusCode::CONFLICT,
        GatewayError::InvalidGeometry(_) | GatewayError::UnknownMapType(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        GatewayError::ContainerTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        GatewayError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        GatewayError::Geocoder(_) => StatusCode::BAD_GATEWAY,
        GatewayError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn health_handler() -> Json<ApiResponse<&'static str>> {
    Json(ApiHandlers::health().await)
}

async fn status_handler(State(handlers): State<Arc<ApiHandlers>>) -> Json<ApiResponse<StatusReport>> {
    Json(ApiResponse::success(handlers.status().await))
}

async fn call_handler(
    State(handlers): State<Arc<ApiHandlers>>,
    body: String,
) -> (StatusCode, Json<ApiResponse<Value>>) {
    let envelope = match CommandEnvelope::parse(&body) {
        Ok(envelope) => envelope,
        Err(message) => {
            warn!(error = %message, "Rejected command");
            return (StatusCode::BAD_REQUEST, Json(ApiResponse::error(message)));
        }
    };

    let request_id = envelope.request_id;
    match handlers.execute(envelope.command).await {
        Ok(data) => (
            StatusCode::OK,
            Json(ApiResponse::success(data).with_request_id(request_id)),
        ),
        Err(e) => (
            status_code(&e),
            Json(ApiResponse::error(e.to_string()).with_request_id(request_id)),
        ),
    }
}
