//! WebSocket handler for real-time updates.

use std::sync::Arc;

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use nimbus_core::AppEvent;
use nimbus_worker::WorkerMessage;

use crate::state::{AppState, ServiceEvent};

/// Create the WebSocket router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/ws", get(ws_handler))
}

/// WebSocket upgrade handler.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Next event from either channel. `None` once both are closed.
async fn next_event(
    app_rx: &mut broadcast::Receiver<AppEvent>,
    worker_rx: &mut Option<broadcast::Receiver<WorkerMessage>>,
) -> Option<ServiceEvent> {
    loop {
        let result = match worker_rx {
            Some(rx) => tokio::select! {
                r = app_rx.recv() => r.map(ServiceEvent::App),
                r = rx.recv() => r.map(ServiceEvent::Worker),
            },
            None => app_rx.recv().await.map(ServiceEvent::App),
        };
        match result {
            Ok(event) => return Some(event),
            Err(RecvError::Lagged(skipped)) => {
                warn!("WebSocket client lagged, skipped {} events", skipped);
            }
            Err(RecvError::Closed) => return None,
        }
    }
}

/// Handle a WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before the snapshot so nothing published meanwhile is missed.
    let (mut app_rx, snapshot) = {
        let app = state.app.lock().await;
        (app.subscribe(), app.state().weather.clone())
    };
    let mut worker_rx = state.worker.as_ref().map(|w| w.subscribe());

    info!("WebSocket client connected");

    if let Some(outcome) = snapshot {
        let event = ServiceEvent::App(AppEvent::WeatherUpdated(outcome));
        if let Ok(json) = serde_json::to_string(&event)
            && sender.send(Message::Text(json.into())).await.is_err()
        {
            info!("WebSocket client disconnected during initial snapshot");
            return;
        }
    }

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = next_event(&mut app_rx, &mut worker_rx).await {
            let json = match serde_json::to_string(&event) {
                Ok(j) => j,
                Err(e) => {
                    warn!("Failed to serialize event: {}", e);
                    continue;
                }
            };

            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Clients may post worker messages (OFFLINE_STATUS) over the socket.
    let recv_state = Arc::clone(&state);
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => {
                    let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) else {
                        debug!("Ignoring non-JSON message");
                        continue;
                    };
                    if let Some(WorkerMessage::OfflineStatus(offline)) = WorkerMessage::parse(&value)
                    {
                        recv_state.app.lock().await.set_online(!offline);
                    }
                    if let Some(worker) = &recv_state.worker {
                        worker.handle_message(&value);
                    }
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!("WebSocket receive error: {}", e);
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        },
        _ = &mut recv_task => {
            send_task.abort();
        },
    }

    info!("WebSocket client disconnected");
}
