//! Tiny HTTP server for pairing: serves the login QR code and a health check.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use sable_channels::whatsapp::WhatsAppChannel;
use sable_core::{config::ApiConfig, traits::Channel};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

const QR_FILE: &str = "login-qr.png";

const INDEX_HTML: &str = "<!doctype html>\n<html>\n<head><title>Sable</title></head>\n<body>\n<h1>Sable is running</h1>\n<p><a href=\"/qr\">Scan the WhatsApp login QR code</a></p>\n</body>\n</html>\n";

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    channels: HashMap<String, Arc<dyn Channel>>,
    uptime: Instant,
    data_dir: PathBuf,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    whatsapp: &'static str,
    /// A login QR is waiting to be scanned.
    pairing: bool,
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// `GET /qr`: the last pairing QR as PNG.
async fn qr(State(state): State<ApiState>) -> Response {
    match tokio::fs::read(state.data_dir.join(QR_FILE)).await {
        Ok(png) => ([(header::CONTENT_TYPE, "image/png")], png).into_response(),
        Err(_) => (
            StatusCode::NOT_FOUND,
            "No QR code available. The bot is either already paired or still starting up.",
        )
            .into_response(),
    }
}

async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let (whatsapp, pairing) = match state
        .channels
        .get("whatsapp")
        .and_then(|ch| ch.as_any().downcast_ref::<WhatsAppChannel>())
    {
        Some(wa) => {
            let status = if wa.is_connected().await {
                "connected"
            } else {
                "disconnected"
            };
            (status, wa.latest_qr().await.is_some())
        }
        None => ("not_configured", false),
    };
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.uptime.elapsed().as_secs(),
        whatsapp,
        pairing,
    })
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/qr", get(qr))
        .route("/api/health", get(health))
        .with_state(state)
}

/// Start the HTTP server. Runs until the task is aborted; a failed bind is logged and ends it.
pub async fn serve(
    config: ApiConfig,
    channels: HashMap<String, Arc<dyn Channel>>,
    uptime: Instant,
    data_dir: PathBuf,
) {
    let state = ApiState {
        channels,
        uptime,
        data_dir,
    };
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("API server failed to bind {addr}: {e}");
            return;
        }
    };

    info!("QR server listening on http://{addr}");
    if let Err(e) = axum::serve(listener, app).await {
        error!("API server error: {e}");
    }
}
