//! Engine registry endpoints.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engines::{
    ConfigureParams, EngineAction, EngineOverview, EngineStatus, TransitionResult,
};
use crate::storage::{EngineConfig, TradingEngine};

use super::AppState;
use super::error::ApiError;
use super::extract::AuthUser;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineDto {
    pub id: String,
    pub name: String,
    pub description: String,
    pub required_tier: String,
    pub default_risk_level: String,
    pub total_trades: i64,
    pub total_pnl: f64,
}

impl From<TradingEngine> for EngineDto {
    fn from(engine: TradingEngine) -> Self {
        Self {
            id: engine.id,
            name: engine.name,
            description: engine.description,
            required_tier: engine.required_tier,
            default_risk_level: engine.default_risk_level,
            total_trades: engine.total_trades,
            total_pnl: engine.total_pnl,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfigDto {
    pub engine_id: String,
    pub enabled: bool,
    pub allocation: f64,
    pub risk_level: String,
    pub parameters: serde_json::Value,
    pub last_run_at: Option<i64>,
}

impl From<EngineConfig> for EngineConfigDto {
    fn from(config: EngineConfig) -> Self {
        let parameters = serde_json::from_str(&config.parameters)
            .unwrap_or_else(|_| serde_json::Value::Object(serde_json::Map::new()));
        Self {
            engine_id: config.engine_id,
            enabled: config.enabled != 0,
            allocation: config.allocation,
            risk_level: config.risk_level,
            parameters,
            last_run_at: config.last_run_at,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineOverviewDto {
    #[serde(flatten)]
    pub engine: EngineDto,
    pub config: Option<EngineConfigDto>,
    pub has_access: bool,
}

impl From<EngineOverview> for EngineOverviewDto {
    fn from(overview: EngineOverview) -> Self {
        Self {
            engine: overview.engine.into(),
            config: overview.config.map(Into::into),
            has_access: overview.has_access,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureRequest {
    pub engine_id: String,
    #[serde(default)]
    pub allocation: Option<f64>,
    #[serde(default)]
    pub risk_level: Option<String>,
    /// Engine-specific parameter blob, stored verbatim.
    #[serde(default)]
    pub config: Option<serde_json::Value>,
    #[serde(default)]
    pub is_enabled: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    pub engine_id: String,
    pub action: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionResponse {
    pub status: EngineStatus,
    pub config: EngineConfigDto,
}

impl From<TransitionResult> for TransitionResponse {
    fn from(result: TransitionResult) -> Self {
        Self {
            status: result.status,
            config: result.config.into(),
        }
    }
}

pub async fn list(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<Vec<EngineOverviewDto>>, ApiError> {
    let overviews = state.engines.list(&claims.sub).await?;
    Ok(Json(overviews.into_iter().map(Into::into).collect()))
}

pub async fn configure(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(req): Json<ConfigureRequest>,
) -> Result<Json<EngineConfigDto>, ApiError> {
    // The enabled flag only changes through lifecycle actions; a value in
    // the config body is accepted and ignored.
    if req.is_enabled.is_some() {
        debug!(user_id = %claims.sub, engine_id = %req.engine_id, "isEnabled in config body ignored");
    }

    let params = ConfigureParams {
        allocation: req.allocation,
        risk_level: req.risk_level,
        parameters: req.config,
    };
    let config = state
        .engines
        .configure(&claims.sub, &req.engine_id, params)
        .await?;
    Ok(Json(config.into()))
}

pub async fn apply_action(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(req): Json<ActionRequest>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let action =
        EngineAction::parse(&req.action).ok_or_else(|| ApiError::invalid_action(&req.action))?;

    let result = state
        .engines
        .apply(&claims.sub, &req.engine_id, action)
        .await?;
    Ok(Json(result.into()))
}
