#![allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]

//! Transport-level tests driving a real bound server over tokio-tungstenite.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use hydra_core::SubscriptionTier;
use hydra_core::event::{Event, SignalPayload};

use crate::auth::{AuthGateway, ChallengeStore, JwtManager};
use crate::engines::EngineService;
use crate::hub::RealtimeHub;
use crate::storage::ControlDatabase;

use super::{AppState, HeartbeatSettings, build_router};

fn signal(n: i64) -> Event {
    Event::TradingSignal(SignalPayload {
        engine: "sniper".into(),
        side: "BUY".into(),
        symbol: "SOL/USDC".into(),
        confidence: 0.9,
        price: 100.0 + n as f64,
        reasoning: "test".into(),
        strength: "high".into(),
        timeframe: "1h".into(),
        expected_return: 0.02,
        timestamp: n,
    })
}

async fn start_server(heartbeat: HeartbeatSettings) -> (SocketAddr, AppState, Arc<JwtManager>) {
    let db = ControlDatabase::open_in_memory().await.unwrap();
    let jwt = Arc::new(JwtManager::new(b"ws-test-secret", 3600, 86_400));
    let challenges = Arc::new(ChallengeStore::new(300));
    let state = AppState {
        gateway: Arc::new(AuthGateway::new(db.clone(), Arc::clone(&jwt), challenges)),
        engines: Arc::new(EngineService::new(db)),
        hub: Arc::new(RealtimeHub::default()),
        heartbeat,
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, state, jwt)
}

fn access_token(jwt: &JwtManager) -> String {
    jwt.issue_access_token("ws-user", "ws-wallet", SubscriptionTier::Free)
        .unwrap()
        .0
}

/// Poll the hub until it holds `expected` connections.
async fn wait_for_connections(state: &AppState, expected: usize) {
    for _ in 0..100 {
        if state.hub.connection_count().await == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "hub never reached {expected} connections, still at {}",
        state.hub.connection_count().await
    );
}

#[tokio::test]
async fn missing_token_gets_error_frame_then_close() {
    let (addr, _state, _jwt) = start_server(HeartbeatSettings::default()).await;

    let (mut stream, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();

    let msg = stream.next().await.unwrap().unwrap();
    let text = msg.into_text().unwrap();
    assert!(text.contains("\"type\":\"error\""), "got frame {text}");
    assert!(text.contains("Unauthorized"));

    match stream.next().await {
        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {}
        other => panic!("expected close after error frame, got {other:?}"),
    }
}

#[tokio::test]
async fn garbage_token_gets_error_frame_then_close() {
    let (addr, state, _jwt) = start_server(HeartbeatSettings::default()).await;

    let (mut stream, _) = connect_async(format!("ws://{addr}/ws?token=garbage"))
        .await
        .unwrap();

    let msg = stream.next().await.unwrap().unwrap();
    assert!(msg.into_text().unwrap().contains("\"type\":\"error\""));

    match stream.next().await {
        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {}
        other => panic!("expected close after error frame, got {other:?}"),
    }

    // A rejected handshake never registers with the hub.
    assert_eq!(state.hub.connection_count().await, 0);
}

#[tokio::test]
async fn subscribe_replays_backlog_then_streams_live() {
    let (addr, state, jwt) = start_server(HeartbeatSettings::default()).await;

    // Published before anyone connects: only reachable via replay.
    for n in 0..3 {
        state.hub.publish(signal(n)).await;
    }

    let token = access_token(&jwt);
    let (mut stream, _) = connect_async(format!("ws://{addr}/ws?token={token}"))
        .await
        .unwrap();

    stream
        .send(Message::Text("subscribe:signals".into()))
        .await
        .unwrap();

    for expected in 0..3 {
        let text = stream.next().await.unwrap().unwrap().into_text().unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["type"], "trading:signal");
        assert_eq!(json["data"]["timestamp"], expected);
    }

    // The backlog arrived, so the subscription is registered; a publish
    // now flows through the live path.
    assert_eq!(state.hub.publish(signal(42)).await, 1);

    let text = stream.next().await.unwrap().unwrap().into_text().unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["data"]["timestamp"], 42);
}

#[tokio::test]
async fn silent_connection_is_evicted() {
    let heartbeat = HeartbeatSettings {
        interval: Duration::from_millis(50),
        missed_max: 1,
    };
    let (addr, state, jwt) = start_server(heartbeat).await;

    let token = access_token(&jwt);
    let (_stream, _) = connect_async(format!("ws://{addr}/ws?token={token}"))
        .await
        .unwrap();
    wait_for_connections(&state, 1).await;

    // Never reading the socket means pings are never answered; after
    // missed_max unanswered pings the server drops the connection.
    wait_for_connections(&state, 0).await;
}

#[tokio::test]
async fn answered_pings_keep_the_connection_alive() {
    let heartbeat = HeartbeatSettings {
        interval: Duration::from_millis(50),
        missed_max: 1,
    };
    let (addr, state, jwt) = start_server(heartbeat).await;

    let token = access_token(&jwt);
    let (mut stream, _) = connect_async(format!("ws://{addr}/ws?token={token}"))
        .await
        .unwrap();
    wait_for_connections(&state, 1).await;

    // Keep reading: the client answers pings with pongs as it polls.
    let reader = tokio::spawn(async move { while stream.next().await.is_some() {} });

    // Many heartbeat intervals pass without an eviction.
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(state.hub.connection_count().await, 1);

    reader.abort();
}
