// SPDX-License-Identifier: GPL-3.0-only
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::api::handlers::{ApiHandlers, ApiResponse, CommandEnvelope};

pub struct WebSocketServer {
    handlers: Arc<ApiHandlers>,
}

impl WebSocketServer {
    pub fn new(handlers: Arc<ApiHandlers>) -> Self {
        Self { handlers }
    }

    pub fn router(&self) -> Router {
        let handlers = self.handlers.clone();
        Router::new().route(
            "/ws",
            get(move |ws: WebSocketUpgrade| async move {
                ws.on_upgrade(move |socket| handle_socket(socket, handlers))
            }),
        )
    }
}

async fn handle_socket(socket: WebSocket, handlers: Arc<ApiHandlers>) {
    let session_id = Uuid::new_v4();
    info!(session_id = %session_id, "WebSocket session opened");

    let (sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut send_task = tokio::spawn(async move {
        let mut sender = sender;
        while let Some(msg) = rx.recv().await {
            if let Err(e) = sender.send(msg).await {
                error!(error = %e, session_id = %session_id, "Failed to send WebSocket message");
                break;
            }
        }
    });

    // Frames are handled one at a time so responses keep command order
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    if let Err(e) = handle_message(&text, &handlers, &tx).await {
                        error!(error = %e, session_id = %session_id, "Failed to handle WebSocket message");
                    }
                }
                Message::Close(_) => {
                    info!(session_id = %session_id, "WebSocket connection closed");
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };
}

async fn handle_message(
    text: &str,
    handlers: &ApiHandlers,
    tx: &mpsc::UnboundedSender<Message>,
) -> anyhow::Result<()> {
    let response: ApiResponse<Value> = match CommandEnvelope::parse(text) {
        Ok(envelope) => {
            let request_id = envelope.request_id;
            match handlers.execute(envelope.command).await {
                Ok(data) => ApiResponse::success(data),
                Err(e) => {
                    if e.is_precondition() {
                        debug!(error = %e, "Command rejected");
                    } else {
                        warn!(error = %e, "Command failed");
                    }
                    ApiResponse::error(e.to_string())
                }
            }
            .with_request_id(request_id)
        }
        Err(message) => ApiResponse::error(message),
    };

    tx.send(Message::Text(serde_json::to_string(&response)?))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::HttpServer;
    use crate::test_helpers;
    use serde_json::json;
    use tokio_tungstenite::{connect_async, tungstenite};
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_commands_answered_in_order() {
        let test = test_helpers::setup_test_gateway();
        test_helpers::setup_test_map(&test, "map-1").await;
        let handlers = Arc::new(ApiHandlers::new(
            Arc::clone(&test.gateway),
            Arc::clone(&test.containers),
            CancellationToken::new(),
        ));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, HttpServer::router(handlers)).await.unwrap();
        });

        let (mut socket, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();

        let commands = [
            json!({"op": "setZoom", "mapId": "map-1", "zoom": 5, "requestId": 1}),
            json!({"op": "getZoom", "mapId": "map-1", "requestId": 2}),
            json!({"op": "getZoom", "mapId": "ghost", "requestId": 3}),
        ];
        for command in &commands {
            socket
                .send(tungstenite::Message::Text(command.to_string()))
                .await
                .unwrap();
        }
        socket
            .send(tungstenite::Message::Text("{broken".to_string()))
            .await
            .unwrap();

        let mut responses = Vec::new();
        while responses.len() < 4 {
            match socket.next().await.unwrap().unwrap() {
                tungstenite::Message::Text(text) => {
                    responses.push(serde_json::from_str::<Value>(&text).unwrap())
                }
                _ => continue,
            }
        }

        assert_eq!(responses[0]["requestId"], json!(1));
        assert_eq!(responses[0]["success"], json!(true));
        assert_eq!(responses[1]["requestId"], json!(2));
        assert_eq!(responses[1]["data"], json!(5.0));
        assert_eq!(responses[2]["requestId"], json!(3));
        assert_eq!(responses[2]["error"], json!("Map not initialized"));
        assert_eq!(responses[3]["success"], json!(false));
        assert!(responses[3]["error"].as_str().unwrap().starts_with("Invalid command:"));

        socket.close(None).await.unwrap();
    }
}
