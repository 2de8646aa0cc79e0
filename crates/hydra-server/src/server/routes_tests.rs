#![allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use ed25519_dalek::{Signer, SigningKey};
use tower::ServiceExt;

use hydra_core::SubscriptionTier;

use crate::auth::{AuthGateway, ChallengeStore, JwtManager};
use crate::engines::EngineService;
use crate::hub::RealtimeHub;
use crate::storage::ControlDatabase;

use super::{AppState, HeartbeatSettings, build_router};

async fn test_app() -> (Router, ControlDatabase) {
    let db = ControlDatabase::open_in_memory().await.unwrap();
    db.seed_default_engines().await.unwrap();

    let jwt = Arc::new(JwtManager::new(b"route-test-secret", 3600, 86_400));
    let challenges = Arc::new(ChallengeStore::new(300));
    let state = AppState {
        gateway: Arc::new(AuthGateway::new(db.clone(), jwt, challenges)),
        engines: Arc::new(EngineService::new(db.clone())),
        hub: Arc::new(RealtimeHub::default()),
        heartbeat: HeartbeatSettings::default(),
    };

    (build_router(state), db)
}

fn wallet() -> (SigningKey, String) {
    let signing = SigningKey::generate(&mut rand::rngs::OsRng);
    let address = bs58::encode(signing.verifying_key().as_bytes()).into_string();
    (signing, address)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    bearer: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Full challenge/verify handshake; returns (user_id, access, refresh).
async fn authenticate(app: &Router, signing: &SigningKey, address: &str) -> (String, String, String) {
    let (status, body) = send(
        app,
        "POST",
        "/auth/challenge",
        None,
        Some(serde_json::json!({ "walletAddress": address })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let message = body["message"].as_str().unwrap().to_string();

    let signature = bs58::encode(signing.sign(message.as_bytes()).to_bytes()).into_string();
    let (status, body) = send(
        app,
        "POST",
        "/auth/verify",
        None,
        Some(serde_json::json!({
            "walletAddress": address,
            "message": message,
            "signature": signature,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    (
        body["user"]["id"].as_str().unwrap().to_string(),
        body["accessToken"].as_str().unwrap().to_string(),
        body["refreshToken"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn health_endpoint() {
    let (app, _db) = test_app().await;
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn challenge_verify_issues_session() {
    let (app, _db) = test_app().await;
    let (signing, address) = wallet();

    let (status, body) = send(
        &app,
        "POST",
        "/auth/challenge",
        None,
        Some(serde_json::json!({ "walletAddress": address })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let message = body["message"].as_str().unwrap().to_string();
    assert!(message.contains(&address));

    let signature = bs58::encode(signing.sign(message.as_bytes()).to_bytes()).into_string();
    let (status, body) = send(
        &app,
        "POST",
        "/auth/verify",
        None,
        Some(serde_json::json!({
            "walletAddress": address,
            "message": message,
            "signature": signature,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // First-seen wallets land on the free tier.
    assert_eq!(body["user"]["tier"], "FREE");
    assert_eq!(body["user"]["walletAddress"], address.as_str());
    assert!(body["accessToken"].as_str().unwrap().len() > 20);
    assert_eq!(body["expiresIn"], 3600);
}

#[tokio::test]
async fn verify_with_wrong_key_is_rejected() {
    let (app, _db) = test_app().await;
    let (_, address) = wallet();
    let (other_signing, _) = wallet();

    let (_, body) = send(
        &app,
        "POST",
        "/auth/challenge",
        None,
        Some(serde_json::json!({ "walletAddress": address })),
    )
    .await;
    let message = body["message"].as_str().unwrap().to_string();

    let signature = bs58::encode(other_signing.sign(message.as_bytes()).to_bytes()).into_string();
    let (status, body) = send(
        &app,
        "POST",
        "/auth/verify",
        None,
        Some(serde_json::json!({
            "walletAddress": address,
            "message": message,
            "signature": signature,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "SIGNATURE_INVALID");
}

#[tokio::test]
async fn malformed_wallet_address_is_bad_request() {
    let (app, _db) = test_app().await;
    let (status, body) = send(
        &app,
        "POST",
        "/auth/challenge",
        None,
        Some(serde_json::json!({ "walletAddress": "not base58 !!!" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn engines_require_bearer_token() {
    let (app, _db) = test_app().await;

    let (status, body) = send(&app, "GET", "/trading/engines", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = send(&app, "GET", "/trading/engines", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn engine_list_reflects_caller_tier() {
    let (app, _db) = test_app().await;
    let (signing, address) = wallet();
    let (_, access, _) = authenticate(&app, &signing, &address).await;

    let (status, body) = send(&app, "GET", "/trading/engines", Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);

    let engines = body.as_array().unwrap();
    assert_eq!(engines.len(), 6);

    let sniper = engines.iter().find(|e| e["id"] == "sniper").unwrap();
    assert_eq!(sniper["hasAccess"], false);
    assert_eq!(sniper["requiredTier"], "PREMIUM");
    assert!(sniper["config"].is_null());

    let guardian = engines.iter().find(|e| e["id"] == "guardian").unwrap();
    assert_eq!(guardian["hasAccess"], true);
}

#[tokio::test]
async fn configure_above_tier_is_forbidden() {
    let (app, db) = test_app().await;
    let (signing, address) = wallet();
    let (user_id, access, _) = authenticate(&app, &signing, &address).await;

    let (status, body) = send(
        &app,
        "POST",
        "/trading/engines",
        Some(&access),
        Some(serde_json::json!({ "engineId": "sniper", "allocation": 25.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "ACCESS_DENIED");
    assert!(
        db.get_engine_config(&user_id, "sniper")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn configure_unknown_engine_is_not_found() {
    let (app, _db) = test_app().await;
    let (signing, address) = wallet();
    let (_, access, _) = authenticate(&app, &signing, &address).await;

    let (status, body) = send(
        &app,
        "POST",
        "/trading/engines",
        Some(&access),
        Some(serde_json::json!({ "engineId": "quantum" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "ENGINE_NOT_FOUND");
}

#[tokio::test]
async fn lifecycle_over_rest() {
    let (app, db) = test_app().await;
    let (signing, address) = wallet();
    let (user_id, access, _) = authenticate(&app, &signing, &address).await;

    db.set_user_tier(&user_id, SubscriptionTier::Premium)
        .await
        .unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/trading/engines",
        Some(&access),
        Some(serde_json::json!({
            "engineId": "sniper",
            "allocation": 50.0,
            "riskLevel": "medium",
            "config": { "maxSlippage": 0.5 },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allocation"], 50.0);
    assert_eq!(body["enabled"], false);
    assert_eq!(body["parameters"]["maxSlippage"], 0.5);

    let (status, body) = send(
        &app,
        "PUT",
        "/trading/engines",
        Some(&access),
        Some(serde_json::json!({ "engineId": "sniper", "action": "start" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "RUNNING");
    assert_eq!(body["config"]["enabled"], true);

    let (status, body) = send(
        &app,
        "PUT",
        "/trading/engines",
        Some(&access),
        Some(serde_json::json!({ "engineId": "sniper", "action": "stop" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "STOPPED");

    let audit = db.list_audit_for_user(&user_id).await.unwrap();
    let actions: Vec<&str> = audit.iter().map(|e| e.action.as_str()).collect();
    assert_eq!(actions, vec!["engine_start", "engine_stop"]);
}

#[tokio::test]
async fn unknown_action_is_bad_request() {
    let (app, db) = test_app().await;
    let (signing, address) = wallet();
    let (user_id, access, _) = authenticate(&app, &signing, &address).await;

    db.set_user_tier(&user_id, SubscriptionTier::Vip)
        .await
        .unwrap();

    let (status, body) = send(
        &app,
        "PUT",
        "/trading/engines",
        Some(&access),
        Some(serde_json::json!({ "engineId": "sniper", "action": "pause" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_ACTION");
}

#[tokio::test]
async fn refresh_rotates_the_token() {
    let (app, _db) = test_app().await;
    let (signing, address) = wallet();
    let (_, _, refresh) = authenticate(&app, &signing, &address).await;

    let (status, body) = send(
        &app,
        "POST",
        "/auth/refresh",
        None,
        Some(serde_json::json!({ "refreshToken": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["accessToken"].as_str().unwrap().len() > 20);

    // The presented refresh token was revoked by the rotation.
    let (status, body) = send(
        &app,
        "POST",
        "/auth/refresh",
        None,
        Some(serde_json::json!({ "refreshToken": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "TOKEN_INVALID");
}

#[tokio::test]
async fn logout_revokes_refresh_token() {
    let (app, _db) = test_app().await;
    let (signing, address) = wallet();
    let (_, _, refresh) = authenticate(&app, &signing, &address).await;

    let (status, body) = send(
        &app,
        "POST",
        "/auth/logout",
        None,
        Some(serde_json::json!({ "refreshToken": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["revoked"], true);

    let (status, _) = send(
        &app,
        "POST",
        "/auth/refresh",
        None,
        Some(serde_json::json!({ "refreshToken": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
