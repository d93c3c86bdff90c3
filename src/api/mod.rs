//! HTTP control API
//!
//! Configuration, device listing, learn mode, event injection and direct
//! action execution for the web UI (usually loaded as an OBS browser dock).
//! Default port: 5000

use anyhow::{Context, Result};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use crate::app::App;
use crate::config::{AppConfig, ConfigUpdateError};
use crate::device;
use crate::dispatch::{ActionKind, CanonicalEvent, DispatchReport, MAX_VALUE};

/// Shared state for API handlers
pub type ApiState = Arc<App>;

/// API error response
#[derive(Debug, Serialize)]
struct ApiError {
    #[serde(skip)]
    status: StatusCode,
    error: String,
}

impl ApiError {
    fn new(status: StatusCode, error: impl std::fmt::Display) -> Self {
        Self {
            status,
            error: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Body of `POST /api/midi/inject`
#[derive(Debug, Deserialize)]
pub struct InjectRequest {
    #[serde(alias = "Channel")]
    pub channel: i32,
    #[serde(alias = "Note", alias = "id")]
    pub note: i32,
    #[serde(alias = "IsControlChange", alias = "is_continuous", default)]
    pub is_control_change: bool,
    #[serde(alias = "Value")]
    pub value: i32,
}

/// Body of `POST /api/actions/execute`
#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    #[serde(rename = "type", alias = "Type")]
    pub kind: ActionKind,
    #[serde(alias = "Target", default)]
    pub target: String,
    #[serde(alias = "Data", default)]
    pub data: String,
    #[serde(alias = "Value", default = "default_action_value")]
    pub value: i32,
}

fn default_action_value() -> i32 {
    MAX_VALUE as i32
}

#[derive(Debug, Serialize)]
pub struct ObsStatus {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_scene: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DevicesResponse {
    pub inputs: Vec<String>,
    pub connected: Option<String>,
}

/// Build the API router
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/config", get(get_config).post(update_config))
        .route("/api/devices", get(list_devices))
        .route("/api/obs/status", get(obs_status))
        .route("/api/midi/last", get(last_event))
        .route("/api/midi/inject", post(inject_event))
        .route("/api/actions/execute", post(execute_action))
        .route("/api/ws/midi", get(midi_events_ws))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /api/health - Health check endpoint
async fn health_check() -> &'static str {
    "ok"
}

/// GET /api/config - Current configuration
async fn get_config(State(state): State<ApiState>) -> Json<AppConfig> {
    Json((*state.config.current()).clone())
}

/// POST /api/config - Validate, save and apply a new configuration
async fn update_config(
    State(state): State<ApiState>,
    Json(config): Json<AppConfig>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let bindings = config.bindings.len();
    state.update_config(config).await.map_err(|e| match e {
        ConfigUpdateError::Invalid(_) => ApiError::new(StatusCode::BAD_REQUEST, e),
        ConfigUpdateError::Save(_) => ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e),
    })?;

    Ok(Json(serde_json::json!({ "ok": true, "bindings": bindings })))
}

/// GET /api/devices - MIDI input ports
async fn list_devices(State(state): State<ApiState>) -> Result<Json<DevicesResponse>, ApiError> {
    let inputs = device::list_inputs()
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e)))?;
    Ok(Json(DevicesResponse {
        inputs,
        connected: state.device.connected_name(),
    }))
}

/// GET /api/obs/status - OBS connection state
async fn obs_status(State(state): State<ApiState>) -> Json<ObsStatus> {
    let connected = state.dispatcher.effectors().streaming.is_connected();
    let program_scene = state
        .obs
        .as_ref()
        .filter(|_| connected)
        .map(|obs| obs.program_scene());
    Json(ObsStatus {
        connected,
        program_scene,
    })
}

/// GET /api/midi/last - Most recent event (learn mode)
async fn last_event(State(state): State<ApiState>) -> Json<Option<CanonicalEvent>> {
    Json(state.dispatcher.last_observed_event())
}

/// POST /api/midi/inject - Dispatch a synthetic event
async fn inject_event(
    State(state): State<ApiState>,
    Json(req): Json<InjectRequest>,
) -> Json<DispatchReport> {
    debug!("Injected event: {:?}", req);
    Json(state.dispatcher.trigger_synthetic(
        req.channel,
        req.note,
        req.is_control_change,
        req.value,
    ))
}

/// POST /api/actions/execute - Run one action directly
async fn execute_action(
    State(state): State<ApiState>,
    Json(req): Json<ActionRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    info!("▶️  Execute {:?} '{}'", req.kind, req.target);
    state
        .dispatcher
        .execute(req.kind, &req.target, &req.data, req.value)
        .map_err(|e| ApiError::new(StatusCode::BAD_GATEWAY, e))?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// GET /api/ws/midi - WebSocket stream of learn events
async fn midi_events_ws(ws: WebSocketUpgrade, State(state): State<ApiState>) -> impl IntoResponse {
    let rx = state.dispatcher.subscribe();
    ws.on_upgrade(move |socket| handle_websocket(socket, rx))
}

/// Forward learn events until either side goes away
async fn handle_websocket(mut socket: WebSocket, mut rx: broadcast::Receiver<CanonicalEvent>) {
    debug!("WebSocket client connected for MIDI events");

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(event) => {
                        let msg = match serde_json::to_string(&event) {
                            Ok(msg) => msg,
                            Err(e) => {
                                warn!("Failed to encode MIDI event: {}", e);
                                continue;
                            }
                        };
                        if socket.send(Message::Text(msg)).await.is_err() {
                            debug!("WebSocket client disconnected");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Broadcast channel closed");
                        break;
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("WebSocket client lagged by {} events", n);
                    }
                }
            }
            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client closed connection");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("WebSocket error: {}", e);
                        break;
                    }
                }
            }
        }
    }
}

/// Serve the API on an already-bound listener
pub async fn serve(listener: TcpListener, state: ApiState) -> Result<()> {
    axum::serve(listener, build_router(state))
        .await
        .context("API server error")
}

/// Start the API server on 0.0.0.0:`port`
pub async fn start_server(state: ApiState, port: u16) -> Result<()> {
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("🌐 Control API listening on http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind API server on {}", addr))?;

    serve(listener, state).await
}
