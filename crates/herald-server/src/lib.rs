//! herald-server: HTTP surface for the reminder service.
//!
//! - `GET  /health`                 liveness plus SMS configuration state
//! - `GET  /api/last-cycle`         status of the most recent scheduler cycle
//! - `POST /api/send-notification`  compose and send one reminder on demand

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use herald_scheduler::SharedStatus;
use herald_scheduler::message::compose;
use herald_sms::DeliveryTransport;
use herald_types::EventRecord;

/// Shared server state.
pub struct ServerState {
    pub transport: Arc<dyn DeliveryTransport>,
    pub status: SharedStatus,
    /// Deployment name reported by `/health`.
    pub environment: String,
    pub sms_configured: bool,
}

/// Body of `POST /api/send-notification`.
///
/// Every field defaults so that an incomplete body reaches the handler and is
/// answered with a 400 naming the missing fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendNotificationRequest {
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub event: EventRecord,
    /// Lead time the message should announce, in hours.
    #[serde(default)]
    pub lead_hours: u32,
}

/// Build the router over `state`.
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/last-cycle", get(last_cycle_handler))
        .route("/api/send-notification", post(send_notification_handler))
        .with_state(state)
}

/// Serve until `cancel` fires.
pub async fn start_server(
    state: Arc<ServerState>,
    host: &str,
    port: u16,
    cancel: CancellationToken,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    info!("Notification server listening on {addr}");
    info!("  Health:  http://{addr}/health");
    info!("  Send:    POST http://{addr}/api/send-notification");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;
    Ok(())
}

/// GET /health
async fn health_handler(State(state): State<Arc<ServerState>>) -> Json<Value> {
    let status = state.status.read().await;
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.environment,
        "sms_configured": state.sms_configured,
        "cycles": status.cycles,
        "last_cycle_at": status.last_cycle_at,
    }))
}

/// GET /api/last-cycle
async fn last_cycle_handler(State(state): State<Arc<ServerState>>) -> Json<Value> {
    let status = state.status.read().await;
    Json(json!(*status))
}

/// POST /api/send-notification
async fn send_notification_handler(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<SendNotificationRequest>,
) -> (StatusCode, Json<Value>) {
    let missing: Vec<&str> = [
        ("phone_number", req.phone_number.trim().is_empty()),
        ("event.label", req.event.label.is_none()),
        ("event.start", req.event.start.is_none()),
        ("lead_hours", req.lead_hours == 0),
    ]
    .into_iter()
    .filter_map(|(field, absent)| absent.then_some(field))
    .collect();

    if !missing.is_empty() {
        warn!(?missing, "Rejected notification request");
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "error": "Missing required fields",
                "missing": missing,
            })),
        );
    }

    let body = compose(&req.event, req.lead_hours);
    info!(
        label = req.event.display_label(),
        lead_hours = req.lead_hours,
        message_length = body.len(),
        "Sending on-demand notification"
    );

    match state.transport.deliver(&req.phone_number, &body).await {
        Ok(receipt) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message_id": receipt.id,
                "to": receipt.to,
            })),
        ),
        Err(e) => {
            warn!("Error sending SMS: {e}");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "success": false, "error": e.to_string() })),
            )
        }
    }
}
