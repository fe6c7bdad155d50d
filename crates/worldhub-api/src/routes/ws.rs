//! WebSocket transport.
//!
//! Each socket gets one [`Connection`]; a writer task drains its outbound
//! buffer into the socket while the reader loop handles subscribe and
//! unsubscribe frames. A connection is subscribed to at most one world, and
//! it is unregistered when the socket closes.

use std::sync::Arc;

use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, instrument};
use uuid::Uuid;
use worldhub_core::error::DomainError;
use worldhub_membership::application::query_handlers;
use worldhub_realtime::{Connection, Frame};

use crate::error::classify;
use crate::extract::ActingUser;
use crate::state::AppState;

/// Frames a client may send.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ClientFrame {
    Subscribe {
        #[serde(rename = "worldId")]
        world_id: Uuid,
    },
    Unsubscribe,
}

fn error_frame(err: &DomainError) -> Frame {
    let (_, code) = classify(err);
    Arc::from(
        json!({ "type": "error", "error": code, "message": err.to_string() })
            .to_string()
            .as_str(),
    )
}

fn ack_frame(kind: &str, world_id: Option<Uuid>) -> Frame {
    let frame = match world_id {
        Some(world_id) => json!({ "type": kind, "worldId": world_id }),
        None => json!({ "type": kind }),
    };
    Arc::from(frame.to_string().as_str())
}

/// GET /ws
#[instrument(skip(state, ws))]
async fn upgrade(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| serve(state, user_id, socket))
}

async fn serve(state: AppState, user_id: Uuid, socket: WebSocket) {
    let (connection, mut outbound) = Connection::channel(state.ws_send_buffer);
    let connection_id = connection.id();
    let (mut sender, mut receiver) = socket.split();
    info!(%connection_id, %user_id, "websocket connected");

    let mut writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if sender.send(Message::Text(frame.as_ref().into())).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    handle_frame(&state, &connection, user_id, text.as_str()).await;
                }
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            _ = &mut writer => break,
        }
    }

    state.registry().unregister(connection_id);
    writer.abort();
    info!(%connection_id, %user_id, "websocket disconnected");
}

async fn handle_frame(state: &AppState, connection: &Connection, user_id: Uuid, text: &str) {
    let reply = match serde_json::from_str::<ClientFrame>(text) {
        Ok(ClientFrame::Subscribe { world_id }) => {
            match query_handlers::subscribable_world(world_id, user_id, state.store.as_ref()).await
            {
                Ok(world) => {
                    state.registry().register(connection.clone(), world.id, user_id);
                    ack_frame("subscribed", Some(world.id))
                }
                Err(err) => {
                    debug!(connection_id = %connection.id(), %world_id, error = %err, "subscribe rejected");
                    error_frame(&err)
                }
            }
        }
        Ok(ClientFrame::Unsubscribe) => {
            let world_id = state.registry().unregister(connection.id());
            ack_frame("unsubscribed", world_id)
        }
        Err(err) => error_frame(&DomainError::Validation(format!("unreadable frame: {err}"))),
    };

    if let Err(err) = connection.try_send(reply) {
        debug!(connection_id = %connection.id(), error = %err, "reply dropped");
    }
}

/// Returns the router for the WebSocket endpoint.
pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(upgrade))
}
