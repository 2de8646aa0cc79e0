//! Engine lifecycle state machine.
//!
//! Each (user, engine) pair is either `STOPPED` (initial) or `RUNNING`.
//! Every transition re-checks the access policy against the user's
//! *current* tier, since an engine's required tier and a user's
//! subscription change independently of token issuance.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use hydra_core::db::DatabaseError;
use hydra_core::{SubscriptionTier, has_access};

use super::locks::KeyedLocks;
use crate::storage::{ControlDatabase, EngineConfig, TradingEngine};

/// Default allocation percentage when a configure call leaves it unset.
const DEFAULT_ALLOCATION: f64 = 10.0;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Engine not found: {0}")]
    EngineNotFound(String),

    #[error("Engine not configured: {0}")]
    EngineConfigNotFound(String),

    #[error("Subscription tier insufficient")]
    AccessDenied,

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),
}

/// Lifecycle action names accepted on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineAction {
    Start,
    Stop,
    Restart,
}

impl EngineAction {
    /// Parse an action name. `None` maps to the `InvalidAction` REST error.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "start" => Some(Self::Start),
            "stop" => Some(Self::Stop),
            "restart" => Some(Self::Restart),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EngineStatus {
    Running,
    Stopped,
}

impl EngineStatus {
    pub const fn of(config: &EngineConfig) -> Self {
        if config.is_enabled() {
            Self::Running
        } else {
            Self::Stopped
        }
    }
}

/// One engine merged with the caller's config and computed access.
#[derive(Debug, Clone)]
pub struct EngineOverview {
    pub engine: TradingEngine,
    pub config: Option<EngineConfig>,
    pub has_access: bool,
}

/// Result of a lifecycle transition.
#[derive(Debug, Clone)]
pub struct TransitionResult {
    pub status: EngineStatus,
    pub config: EngineConfig,
}

/// Configuration write. Unset fields fall back to the engine's defaults.
#[derive(Debug, Clone, Default)]
pub struct ConfigureParams {
    pub allocation: Option<f64>,
    pub risk_level: Option<String>,
    pub parameters: Option<serde_json::Value>,
}

/// Holds engine definitions and per-user configs; gates transitions by
/// tier and records them in the audit log.
pub struct EngineService {
    db: ControlDatabase,
    locks: KeyedLocks,
}

impl EngineService {
    pub fn new(db: ControlDatabase) -> Self {
        Self {
            db,
            locks: KeyedLocks::new(),
        }
    }

    /// All engines merged with the caller's configs and computed access.
    pub async fn list(&self, user_id: &str) -> Result<Vec<EngineOverview>, EngineError> {
        let tier = self.current_tier(user_id).await?;
        let engines = self.db.list_engines().await?;
        let mut configs: std::collections::HashMap<String, EngineConfig> = self
            .db
            .list_engine_configs(user_id)
            .await?
            .into_iter()
            .map(|c| (c.engine_id.clone(), c))
            .collect();

        Ok(engines
            .into_iter()
            .map(|engine| {
                let access = has_access(tier, engine.required_tier());
                let config = configs.remove(&engine.id);
                EngineOverview {
                    engine,
                    config,
                    has_access: access,
                }
            })
            .collect())
    }

    /// Upsert a per-user engine config.
    ///
    /// Configuration edits are not lifecycle actions: the enabled flag is
    /// untouched and no audit entry is written.
    #[instrument(skip(self, params))]
    pub async fn configure(
        &self,
        user_id: &str,
        engine_id: &str,
        params: ConfigureParams,
    ) -> Result<EngineConfig, EngineError> {
        let tier = self.current_tier(user_id).await?;
        let engine = self.get_engine(engine_id).await?;

        if !has_access(tier, engine.required_tier()) {
            return Err(EngineError::AccessDenied);
        }

        let allocation = params.allocation.unwrap_or(DEFAULT_ALLOCATION);
        if allocation <= 0.0 || allocation > 100.0 {
            return Err(EngineError::InvalidInput(format!(
                "Allocation must be in (0, 100], got {allocation}"
            )));
        }

        let risk_level = params
            .risk_level
            .unwrap_or_else(|| engine.default_risk_level.clone());
        let parameters = params
            .parameters
            .map_or_else(|| "{}".to_string(), |v| v.to_string());

        let config = self
            .db
            .upsert_engine_config(user_id, engine_id, allocation, &risk_level, &parameters)
            .await?;

        info!(user_id = %user_id, engine_id = %engine_id, allocation, "Engine configured");
        Ok(config)
    }

    /// Apply a lifecycle action under the per-key guard.
    pub async fn apply(
        &self,
        user_id: &str,
        engine_id: &str,
        action: EngineAction,
    ) -> Result<TransitionResult, EngineError> {
        let key_lock = self.locks.acquire(user_id, engine_id).await;
        let _guard = key_lock.lock().await;

        // Access is re-checked under the guard on every transition.
        let tier = self.current_tier(user_id).await?;
        let engine = self.get_engine(engine_id).await?;
        if !has_access(tier, engine.required_tier()) {
            info!(user_id = %user_id, engine_id = %engine_id, tier = %tier, "Transition denied by access policy");
            return Err(EngineError::AccessDenied);
        }
        if self
            .db
            .get_engine_config(user_id, engine_id)
            .await?
            .is_none()
        {
            return Err(EngineError::EngineConfigNotFound(engine_id.to_string()));
        }

        match action {
            EngineAction::Start => self.start_locked(user_id, engine_id).await,
            EngineAction::Stop => self.stop_locked(user_id, engine_id).await,
            EngineAction::Restart => {
                // Deliberately two state writes and two audit entries; the
                // guard keeps other transitions from observing the
                // intermediate STOPPED state.
                self.stop_locked(user_id, engine_id).await?;
                self.start_locked(user_id, engine_id).await
            }
        }
    }

    /// Start is idempotent: starting a running engine re-stamps
    /// `last_run_at`.
    async fn start_locked(
        &self,
        user_id: &str,
        engine_id: &str,
    ) -> Result<TransitionResult, EngineError> {
        self.db.enable_engine_config(user_id, engine_id).await?;
        self.db
            .append_audit(user_id, "engine_start", "engine", engine_id, "{}")
            .await?;

        let config = self.require_config(user_id, engine_id).await?;
        info!(user_id = %user_id, engine_id = %engine_id, "Engine started");
        Ok(TransitionResult {
            status: EngineStatus::Running,
            config,
        })
    }

    async fn stop_locked(
        &self,
        user_id: &str,
        engine_id: &str,
    ) -> Result<TransitionResult, EngineError> {
        self.db.disable_engine_config(user_id, engine_id).await?;
        self.db
            .append_audit(user_id, "engine_stop", "engine", engine_id, "{}")
            .await?;

        let config = self.require_config(user_id, engine_id).await?;
        info!(user_id = %user_id, engine_id = %engine_id, "Engine stopped");
        Ok(TransitionResult {
            status: EngineStatus::Stopped,
            config,
        })
    }

    async fn current_tier(&self, user_id: &str) -> Result<SubscriptionTier, EngineError> {
        let user = self
            .db
            .get_user(user_id)
            .await
            .map_err(|_| EngineError::UserNotFound(user_id.to_string()))?;
        Ok(user.tier())
    }

    async fn get_engine(&self, engine_id: &str) -> Result<TradingEngine, EngineError> {
        self.db
            .get_engine(engine_id)
            .await
            .map_err(|_| EngineError::EngineNotFound(engine_id.to_string()))
    }

    async fn require_config(
        &self,
        user_id: &str,
        engine_id: &str,
    ) -> Result<EngineConfig, EngineError> {
        self.db
            .get_engine_config(user_id, engine_id)
            .await?
            .ok_or_else(|| EngineError::EngineConfigNotFound(engine_id.to_string()))
    }
}
