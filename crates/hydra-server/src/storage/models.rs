//! Data models for control-plane storage.

use serde::{Deserialize, Serialize};

use hydra_core::SubscriptionTier;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub wallet_address: String,
    pub tier: String,
    pub active: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    /// Tier parsed fail-closed: a corrupt value degrades to `FREE`.
    pub fn tier(&self) -> SubscriptionTier {
        SubscriptionTier::parse(&self.tier)
    }

    pub const fn is_active(&self) -> bool {
        self.active != 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RefreshToken {
    pub id: String,
    pub user_id: String,
    pub token_hash: String,
    pub expires_at: i64,
    pub revoked: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TradingEngine {
    pub id: String,
    pub name: String,
    pub description: String,
    pub required_tier: String,
    pub default_risk_level: String,
    pub total_trades: i64,
    pub total_pnl: f64,
    pub created_at: i64,
}

impl TradingEngine {
    pub fn required_tier(&self) -> SubscriptionTier {
        SubscriptionTier::parse(&self.required_tier)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EngineConfig {
    pub user_id: String,
    pub engine_id: String,
    pub enabled: i64,
    pub allocation: f64,
    pub risk_level: String,
    pub parameters: String,
    pub last_run_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl EngineConfig {
    pub const fn is_enabled(&self) -> bool {
        self.enabled != 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditLogEntry {
    pub id: i64,
    pub user_id: String,
    pub action: String,
    pub entity: String,
    pub entity_id: String,
    pub metadata: String,
    pub created_at: i64,
}
