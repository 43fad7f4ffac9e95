//! HTTP front end: job submission and event streaming
//!
//! Clients connect over a WebSocket first and receive a generated session
//! id, then submit jobs over plain HTTP carrying that id in a header. Job
//! events stream back over the client's socket only; nothing is broadcast.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, RwLock};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::crawler::{run_job, CancelToken};
use crate::events::{ChannelSink, JobEvent};
use crate::{Config, ConfigError};

/// Header carrying the client's session id on job requests
const SESSION_HEADER: &str = "x-session-id";

/// One connected client
struct ClientSession {
    tx: mpsc::UnboundedSender<JobEvent>,
    cancel: std::sync::Mutex<Option<CancelToken>>,
}

/// Shared server state
pub struct AppState {
    config: Arc<Config>,
    sessions: RwLock<HashMap<String, Arc<ClientSession>>>,
}

/// Builds the application router
pub fn router(config: Arc<Config>) -> Router {
    let cors = build_cors(&config.server.allowed_origins);
    let state = Arc::new(AppState {
        config,
        sessions: RwLock::new(HashMap::new()),
    });

    Router::new()
        .route("/api/jobs", post(submit_job).delete(cancel_job))
        .route("/ws", get(ws_upgrade))
        .layer(cors)
        .with_state(state)
}

/// Binds the configured address and serves until shutdown
pub async fn serve(config: Arc<Config>) -> crate::Result<()> {
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .map_err(|e| ConfigError::Validation(format!("Invalid bind address: {}", e)))?;

    let app = router(config);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_cors(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(SESSION_HEADER),
        ])
}

#[derive(Debug, Deserialize)]
struct JobRequest {
    target_id: String,
}

#[derive(Debug, Serialize)]
struct Acknowledgment {
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: &str) -> (StatusCode, Json<ErrorBody>) {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
}

/// `POST /api/jobs`: accepts a crawl request and starts it asynchronously
async fn submit_job(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<JobRequest>,
) -> Result<(StatusCode, Json<Acknowledgment>), (StatusCode, Json<ErrorBody>)> {
    if request.target_id.trim().is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "target_id is required",
        ));
    }

    let session_id = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            error_response(
                StatusCode::BAD_REQUEST,
                "x-session-id header is missing",
            )
        })?;

    let session = {
        let sessions = state.sessions.read().await;
        sessions.get(session_id).cloned()
    };

    let session = session.ok_or_else(|| {
        warn!("Job request for unknown session id: {}", session_id);
        error_response(
            StatusCode::NOT_FOUND,
            "client session not found or disconnected",
        )
    })?;

    let target = request.target_id.trim().to_string();
    info!("Accepted job for '{}' from session {}", target, session_id);

    let cancel = CancelToken::new();
    *session.cancel.lock().unwrap() = Some(cancel.clone());

    let sink = Arc::new(ChannelSink::new(session.tx.clone()));
    let config = state.config.clone();
    tokio::spawn(async move {
        if let Err(e) = run_job(config, &target, sink, cancel).await {
            warn!("Job for '{}' ended with error: {}", target, e);
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(Acknowledgment {
            message: "Job accepted, crawl starting".to_string(),
        }),
    ))
}

/// `DELETE /api/jobs`: requests cancellation of the running job
async fn cancel_job(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<Acknowledgment>), (StatusCode, Json<ErrorBody>)> {
    let session_id = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            error_response(
                StatusCode::BAD_REQUEST,
                "x-session-id header is missing",
            )
        })?;

    let session = {
        let sessions = state.sessions.read().await;
        sessions.get(session_id).cloned()
    };

    let session = session.ok_or_else(|| {
        error_response(
            StatusCode::NOT_FOUND,
            "client session not found or disconnected",
        )
    })?;

    let cancel = session.cancel.lock().unwrap().clone();
    match cancel {
        Some(token) => {
            token.cancel();
            Ok((
                StatusCode::OK,
                Json(Acknowledgment {
                    message: "Cancellation requested".to_string(),
                }),
            ))
        }
        None => Err(error_response(
            StatusCode::NOT_FOUND,
            "no job is running for this session",
        )),
    }
}

/// `GET /ws`: upgrades to the event-streaming socket
async fn ws_upgrade(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: Arc<AppState>, socket: WebSocket) {
    use futures::{SinkExt, StreamExt};

    let (mut sender, mut receiver) = socket.split();
    let session_id = Uuid::new_v4().to_string();
    let (tx, mut rx) = mpsc::unbounded_channel();

    state.sessions.write().await.insert(
        session_id.clone(),
        Arc::new(ClientSession {
            tx,
            cancel: std::sync::Mutex::new(None),
        }),
    );
    info!("Client connected: {}", session_id);

    // The first frame tells the client which id to put on job requests
    let hello = serde_json::json!({ "type": "connected", "session_id": session_id });
    if sender.send(Message::Text(hello.to_string())).await.is_err() {
        state.sessions.write().await.remove(&session_id);
        return;
    }

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(event) => {
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("Failed to serialize event: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(_)) => break,
            },
        }
    }

    state.sessions.write().await.remove(&session_id);
    info!("Client disconnected: {}", session_id);
}
