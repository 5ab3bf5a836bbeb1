use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Extension, Query,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::api::SessionAPI;
use crate::auth::User;
use crate::engine::Engine;
use crate::error::Error;
use crate::protocol::{ClientEvent, ServerEvent};

#[derive(Deserialize)]
pub struct ChannelParams {
    token: String,
}

/// Channel handshake. The same bearer token as REST authorizes the upgrade;
/// a missing or unknown token fails the request before any socket exists.
pub async fn upgrade(
    ws: WebSocketUpgrade,
    Query(params): Query<ChannelParams>,
    Extension(engine): Extension<Arc<Engine>>,
) -> Result<impl IntoResponse, Error> {
    let user = engine.authenticate(&params.token).await?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, engine, user)))
}

async fn handle_socket(socket: WebSocket, engine: Arc<Engine>, user: User) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
    let connection_id = engine.connect_session(&user, tx.clone()).await;

    // writer half: drains the session mailbox onto the socket
    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&event) {
                if ws_sender.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
        }
    });

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => {
                    if let Err(err) = engine.handle_event(&user, event).await {
                        let _ = tx.send(ServerEvent::Error {
                            message: err.message,
                        });
                    }
                }
                Err(err) => {
                    tracing::warn!(user_id = %user.id, "unparseable channel frame: {}", err);
                    let _ = tx.send(ServerEvent::Error {
                        message: "invalid event format".into(),
                    });
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(user_id = %user.id, "channel transport error: {}", err);
                break;
            }
        }
    }

    engine.disconnect_session(&user, &connection_id).await;
    send_task.abort();
}
