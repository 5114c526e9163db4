//! WebSocket transport for the delivery protocol.
//!
//! This layer only moves frames: JSON text in, JSON text out. All
//! protocol decisions live in [`handlers`]; the read loop parses frames
//! into [`ClientEvent`] values and the write task drains the
//! connection's outbound channel.
//!
//! Authentication happens either via a `?token=` query parameter at the
//! handshake or an `authenticate` event after connecting; both paths
//! run the same handler.
//!
//! [`handlers`]: super::handlers

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::backend::server::AppState;
use crate::shared::error::ChatError;
use crate::shared::event::{ClientEvent, ServerEvent};

use super::handlers::{self, EventOutcome};
use super::session::Session;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Optional handshake credential; equivalent to sending an
    /// `authenticate` event as the first frame.
    pub token: Option<String>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, query.token))
}

async fn handle_socket(socket: WebSocket, state: AppState, handshake_token: Option<String>) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut session = Session::new();
    let conn_id = session.conn_id;

    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
    state.hub.register(conn_id, tx);
    tracing::debug!(%conn_id, "websocket connected");

    // Outbound pump: serialize events from the hub onto the socket.
    let write_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(err) => {
                    tracing::error!(%conn_id, %err, "failed to serialize outbound event");
                    continue;
                }
            };
            if ws_tx.send(WsMessage::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    if let Some(token) = handshake_token {
        handlers::handle_authenticate(&state, &mut session, &token).await;
    }

    while let Some(frame) = ws_rx.next().await {
        let text = match frame {
            Ok(WsMessage::Text(text)) => text,
            Ok(WsMessage::Close(_)) | Err(_) => break,
            // Pings are answered by axum; binary and pong frames are
            // not part of the protocol.
            Ok(_) => continue,
        };

        let event: ClientEvent = match serde_json::from_str(&text) {
            Ok(event) => event,
            Err(err) => {
                tracing::debug!(%conn_id, %err, "unparseable frame");
                let err = ChatError::validation("event", "unrecognized event or malformed payload");
                state.hub.emit_conn(conn_id, &ServerEvent::error(&err));
                continue;
            }
        };

        if handlers::handle_event(&state, &mut session, event).await == EventOutcome::Disconnect {
            break;
        }
    }

    handlers::handle_disconnect(&state, &session).await;
    write_task.abort();
    tracing::debug!(%conn_id, "websocket closed");
}
