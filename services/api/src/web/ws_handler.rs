//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a WebSocket connection.
//! Incoming actions are dispatched against the shared state; every state change is
//! broadcast back to all connected clients.

use crate::web::{
    dispatch::dispatch,
    protocol::{ClientMessage, ServerMessage},
    state::{AppState, Outbound},
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use std::sync::Arc;
use tokio::sync::{broadcast::error::RecvError, Mutex};
use tracing::{error, info, warn};

type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn send_message(sender: &WsSender, message: &ServerMessage) -> bool {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize server message: {}", e);
            return true;
        }
    };
    sender.lock().await.send(Message::Text(json.into())).await.is_ok()
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("New WebSocket connection established.");

    // The sender is wrapped in an Arc<Mutex<>> so the event forwarder and the
    // receive loop can both write to it.
    let (sender, mut receiver) = socket.split();
    let ws_sender: WsSender = Arc::new(Mutex::new(sender));

    // Subscribe before rendering so no change between the two is missed.
    let mut events = app_state.events.subscribe();

    // --- 1. Initial View ---
    let initial = ServerMessage::View {
        view: Box::new(app_state.current_view()),
    };
    if !send_message(&ws_sender, &initial).await {
        error!("Failed to send the initial view.");
        return;
    }

    // --- 2. Event Forwarder ---
    let forwarder = {
        let ws_sender = ws_sender.clone();
        let app_state = app_state.clone();
        tokio::spawn(async move {
            loop {
                let delivered = match events.recv().await {
                    Ok(Outbound::Text(message)) => send_message(&ws_sender, &message).await,
                    Ok(Outbound::Audio(wav)) => ws_sender.lock().await.send(Message::Binary(wav)).await.is_ok(),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Client lagged behind by {} events; resending the view.", skipped);
                        let view = ServerMessage::View {
                            view: Box::new(app_state.current_view()),
                        };
                        send_message(&ws_sender, &view).await
                    }
                    Err(RecvError::Closed) => break,
                };
                if !delivered {
                    info!("Client stopped accepting events.");
                    break;
                }
            }
        })
    };

    // --- 3. Main Message Loop ---
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(text.as_str()) {
                Ok(client_msg) => {
                    dispatch(&app_state, client_msg).await;
                }
                Err(e) => {
                    warn!("Failed to deserialize client message: {}", e);
                    let reply = ServerMessage::Error {
                        message: format!("Invalid message: {}", e),
                    };
                    if !send_message(&ws_sender, &reply).await {
                        break;
                    }
                }
            },
            Message::Close(_) => {
                info!("Client sent close message.");
                break;
            }
            _ => {}
        }
    }

    // --- 4. Cleanup ---
    forwarder.abort();
    info!("WebSocket connection closed.");
}
