//! Database queries for the control plane.

use hydra_core::SubscriptionTier;
use hydra_core::db::unix_timestamp;

use super::db::ControlDatabase;
use super::models::{EngineConfig, RefreshToken, TradingEngine, User};
use hydra_core::db::DatabaseError;

/// Stock engines provisioned on first start when the table is empty.
/// Administrative provisioning beyond this seed happens out of band.
const DEFAULT_ENGINES: [(&str, &str, &str, SubscriptionTier, &str); 6] = [
    (
        "sniper",
        "Sniper Engine",
        "New-token entry sniping on liquidity events",
        SubscriptionTier::Premium,
        "high",
    ),
    (
        "reentry",
        "Re-entry Engine",
        "Re-enters positions after stop-outs on trend confirmation",
        SubscriptionTier::Basic,
        "medium",
    ),
    (
        "ai-signals",
        "AI Signals Engine",
        "Trades model-generated signals from the external signal feed",
        SubscriptionTier::Premium,
        "medium",
    ),
    (
        "guardian",
        "Guardian Engine",
        "Defensive exits and drawdown protection",
        SubscriptionTier::Free,
        "low",
    ),
    (
        "scalper",
        "Scalper Engine",
        "High-frequency small-move capture",
        SubscriptionTier::Basic,
        "high",
    ),
    (
        "arbitrage",
        "Arbitrage Engine",
        "Cross-venue price divergence capture",
        SubscriptionTier::Vip,
        "medium",
    ),
];

impl ControlDatabase {
    // =========================================================================
    // User queries
    // =========================================================================

    /// Create a new user at the default (FREE) tier.
    pub async fn create_user(&self, id: &str, wallet_address: &str) -> Result<User, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO users (id, wallet_address, tier, active, created_at, updated_at) VALUES (?, ?, 'FREE', 1, ?, ?)",
        )
        .bind(id)
        .bind(wallet_address)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_user(id).await
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: &str) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User {id}")))
    }

    /// Get a user by wallet address, if one exists.
    pub async fn get_user_by_wallet(
        &self,
        wallet_address: &str,
    ) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE wallet_address = ?")
            .bind(wallet_address)
            .fetch_optional(self.pool())
            .await?;

        Ok(user)
    }

    /// Update a user's subscription tier.
    pub async fn set_user_tier(
        &self,
        id: &str,
        tier: SubscriptionTier,
    ) -> Result<(), DatabaseError> {
        let now = unix_timestamp();

        sqlx::query("UPDATE users SET tier = ?, updated_at = ? WHERE id = ?")
            .bind(tier.as_str())
            .bind(now)
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(())
    }

    // =========================================================================
    // Refresh token queries
    // =========================================================================

    /// Store a refresh token hash.
    pub async fn create_refresh_token(
        &self,
        id: &str,
        user_id: &str,
        token_hash: &str,
        expires_at: i64,
    ) -> Result<RefreshToken, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .bind(now)
        .execute(self.pool())
        .await?;

        sqlx::query_as::<_, RefreshToken>("SELECT * FROM refresh_tokens WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Refresh token {id}")))
    }

    /// Find a valid (non-revoked, non-expired) refresh token by hash.
    pub async fn get_refresh_token_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshToken>, DatabaseError> {
        let now = unix_timestamp();

        let token = sqlx::query_as::<_, RefreshToken>(
            "SELECT * FROM refresh_tokens WHERE token_hash = ? AND revoked = 0 AND expires_at > ?",
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(self.pool())
        .await?;

        Ok(token)
    }

    /// Revoke a refresh token by ID.
    pub async fn revoke_refresh_token(&self, id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Trading engine queries
    // =========================================================================

    /// Register an engine definition.
    pub async fn create_engine(
        &self,
        id: &str,
        name: &str,
        description: &str,
        required_tier: SubscriptionTier,
        default_risk_level: &str,
    ) -> Result<TradingEngine, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO trading_engines (id, name, description, required_tier, default_risk_level, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(required_tier.as_str())
        .bind(default_risk_level)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_engine(id).await
    }

    /// Get an engine definition by ID.
    pub async fn get_engine(&self, id: &str) -> Result<TradingEngine, DatabaseError> {
        sqlx::query_as::<_, TradingEngine>("SELECT * FROM trading_engines WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Engine {id}")))
    }

    /// List all engine definitions.
    pub async fn list_engines(&self) -> Result<Vec<TradingEngine>, DatabaseError> {
        let engines =
            sqlx::query_as::<_, TradingEngine>("SELECT * FROM trading_engines ORDER BY id")
                .fetch_all(self.pool())
                .await?;

        Ok(engines)
    }

    /// Insert the stock engines when the table is empty. Returns the
    /// number of engines inserted.
    pub async fn seed_default_engines(&self) -> Result<usize, DatabaseError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM trading_engines")
            .fetch_one(self.pool())
            .await?;
        if row.0 > 0 {
            return Ok(0);
        }

        for (id, name, description, tier, risk) in DEFAULT_ENGINES {
            self.create_engine(id, name, description, tier, risk).await?;
        }

        Ok(DEFAULT_ENGINES.len())
    }

    // =========================================================================
    // Engine config queries
    // =========================================================================

    /// Upsert a per-user engine config. Does not touch the enabled flag or
    /// `last_run_at` on existing rows; those change only through lifecycle
    /// transitions.
    pub async fn upsert_engine_config(
        &self,
        user_id: &str,
        engine_id: &str,
        allocation: f64,
        risk_level: &str,
        parameters: &str,
    ) -> Result<EngineConfig, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO engine_configs (user_id, engine_id, enabled, allocation, risk_level, parameters, created_at, updated_at) \
             VALUES (?, ?, 0, ?, ?, ?, ?, ?) \
             ON CONFLICT(user_id, engine_id) DO UPDATE SET \
               allocation = excluded.allocation, \
               risk_level = excluded.risk_level, \
               parameters = excluded.parameters, \
               updated_at = excluded.updated_at",
        )
        .bind(user_id)
        .bind(engine_id)
        .bind(allocation)
        .bind(risk_level)
        .bind(parameters)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_engine_config(user_id, engine_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Config {user_id}/{engine_id}")))
    }

    /// Get a per-user engine config, if one exists.
    pub async fn get_engine_config(
        &self,
        user_id: &str,
        engine_id: &str,
    ) -> Result<Option<EngineConfig>, DatabaseError> {
        let config = sqlx::query_as::<_, EngineConfig>(
            "SELECT * FROM engine_configs WHERE user_id = ? AND engine_id = ?",
        )
        .bind(user_id)
        .bind(engine_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(config)
    }

    /// List all configs belonging to a user.
    pub async fn list_engine_configs(
        &self,
        user_id: &str,
    ) -> Result<Vec<EngineConfig>, DatabaseError> {
        let configs = sqlx::query_as::<_, EngineConfig>(
            "SELECT * FROM engine_configs WHERE user_id = ? ORDER BY engine_id",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        Ok(configs)
    }

    /// Mark a config enabled and stamp `last_run_at`.
    pub async fn enable_engine_config(
        &self,
        user_id: &str,
        engine_id: &str,
    ) -> Result<(), DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "UPDATE engine_configs SET enabled = 1, last_run_at = ?, updated_at = ? WHERE user_id = ? AND engine_id = ?",
        )
        .bind(now)
        .bind(now)
        .bind(user_id)
        .bind(engine_id)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Mark a config disabled. `last_run_at` is left as-is.
    pub async fn disable_engine_config(
        &self,
        user_id: &str,
        engine_id: &str,
    ) -> Result<(), DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "UPDATE engine_configs SET enabled = 0, updated_at = ? WHERE user_id = ? AND engine_id = ?",
        )
        .bind(now)
        .bind(user_id)
        .bind(engine_id)
        .execute(self.pool())
        .await?;

        Ok(())
    }
}
