//! WebSocket transport for the realtime hub.
//!
//! The handshake carries a bearer token (`Authorization` header or
//! `?token=`). Client text frames are `subscribe:<channel>` and
//! `unsubscribe:<channel>`; server frames are the JSON events published by
//! the hub. The server pings on an interval and evicts connections that
//! stop answering.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::auth::Claims;
use crate::hub::ClientConnection;

use super::AppState;

#[derive(Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

pub async fn upgrade(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    Query(query): Query<WsQuery>,
) -> Response {
    // Authentication is resolved before the upgrade, but a failure is
    // reported in-band: the socket opens, receives a typed error frame,
    // and closes.
    let token = handshake_token(&headers, query.token.as_deref());
    let auth = token.and_then(|token| state.gateway.authenticate(&token).ok());

    ws.on_upgrade(move |socket| handle_socket(state, socket, auth))
}

fn handshake_token(headers: &HeaderMap, query_token: Option<&str>) -> Option<String> {
    if let Some(header) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
        && let Some(token) = header.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }
    query_token.map(ToString::to_string)
}

async fn handle_socket(state: AppState, mut socket: WebSocket, auth: Option<Claims>) {
    let Some(claims) = auth else {
        let frame = r#"{"type":"error","data":{"message":"Unauthorized"}}"#;
        let _ = socket.send(Message::Text(frame.into())).await;
        let _ = socket.close().await;
        return;
    };

    let conn = state.hub.register(&claims.sub).await;
    serve_socket(&state, socket, &conn).await;
    state.hub.unregister(conn.id).await;
}

async fn serve_socket(state: &AppState, socket: WebSocket, conn: &Arc<ClientConnection>) {
    let (mut sender, mut receiver) = socket.split();

    let mut ping_interval = tokio::time::interval(state.heartbeat.interval);
    // First tick fires immediately; skip it so the countdown starts now.
    ping_interval.tick().await;
    let mut missed_pongs: u32 = 0;

    loop {
        tokio::select! {
            frame = conn.next_frame() => {
                let Some(frame) = frame else { break };
                if sender.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }

            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        handle_text_frame(state, conn, &mut sender, text.as_str()).await;
                    }
                    Some(Ok(Message::Pong(_))) => {
                        missed_pongs = 0;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(connection_id = conn.id, "Client closed connection");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(connection_id = conn.id, error = %e, "Socket read error");
                        break;
                    }
                }
            }

            _ = ping_interval.tick() => {
                if missed_pongs >= state.heartbeat.missed_max {
                    info!(
                        connection_id = conn.id,
                        user_id = %conn.user_id,
                        "Evicting unresponsive connection"
                    );
                    break;
                }
                missed_pongs += 1;
                if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            }
        }
    }
}

async fn handle_text_frame(
    state: &AppState,
    conn: &Arc<ClientConnection>,
    sender: &mut (impl SinkExt<Message> + Unpin),
    text: &str,
) {
    if let Some(channel) = text.strip_prefix("subscribe:") {
        let backlog = state.hub.subscribe(conn.id, channel.trim()).await;
        for event in backlog {
            match serde_json::to_string(&event) {
                Ok(frame) => {
                    if sender.send(Message::Text(frame.into())).await.is_err() {
                        return;
                    }
                }
                Err(e) => warn!(error = %e, "Failed to serialize backlog event"),
            }
        }
    } else if let Some(channel) = text.strip_prefix("unsubscribe:") {
        state.hub.unsubscribe(conn.id, channel.trim()).await;
    } else {
        debug!(connection_id = conn.id, frame = %text, "Ignoring unrecognized frame");
    }
}
