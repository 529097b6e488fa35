use crate::Result;
use crate::autoplay::{AutoplayExecutor, AutoplayPayload};
use crate::session::SessionManager;
use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
struct AppState {
    executor: Arc<AutoplayExecutor>,
    manager: SessionManager,
}

#[derive(Serialize)]
struct AutoplayResponse {
    accepted: bool,
}

#[derive(Serialize)]
struct StatusResponse {
    attached: bool,
}

pub fn router(executor: Arc<AutoplayExecutor>, manager: SessionManager) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/autoplay", post(handle_autoplay))
        .route("/api/status", get(handle_status))
        .layer(cors)
        .with_state(AppState { executor, manager })
}

/// Accept or reject one autoplay payload. Malformed bodies answer
/// `accepted: false` rather than an error status; the gate is a boolean,
/// never an exception.
async fn handle_autoplay(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Json<AutoplayResponse> {
    let accepted = match serde_json::from_value::<AutoplayPayload>(body) {
        Ok(payload) => state.executor.submit(payload),
        Err(e) => {
            tracing::debug!("rejecting malformed autoplay payload: {}", e);
            false
        }
    };
    Json(AutoplayResponse { accepted })
}

async fn handle_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        attached: state.manager.is_attached(),
    })
}

pub async fn serve(
    listen_port: u16,
    executor: Arc<AutoplayExecutor>,
    manager: SessionManager,
) -> Result<()> {
    let addr = format!("127.0.0.1:{}", listen_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("command endpoint listening on {}", addr);

    axum::serve(listener, router(executor, manager))
        .await
        .map_err(|e| crate::BridgeError::Connection(e.to_string()))?;
    Ok(())
}
