use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};

use crate::AppState;

/// GET /ws: pushes the full recent window on connect and after every write.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let mut subscription = match state.store.subscribe().await {
        Ok(subscription) => subscription,
        Err(e) => {
            tracing::warn!(error = %e, "Could not open live query");
            return;
        }
    };

    let (mut sender, mut receiver) = socket.split();
    tracing::debug!(
        subscribers = state.store.subscriber_count(),
        "WebSocket subscription opened"
    );

    let mut send_task = tokio::spawn(async move {
        while let Some(snapshot) = subscription.next().await {
            let payload = match serde_json::to_string(snapshot.as_slice()) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::error!(error = %e, "Could not encode snapshot");
                    continue;
                }
            };
            if sender.send(Message::Text(payload)).await.is_err() {
                break;
            }
        }
    });

    // Client messages are ignored; reading only detects the close.
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    tracing::debug!("WebSocket subscription closed");
}
