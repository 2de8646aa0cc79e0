//! JWT claims structure for Hydra bearer sessions.

use serde::{Deserialize, Serialize};

use hydra_core::SubscriptionTier;

/// JWT claims embedded in access and refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// JWT ID (unique per token).
    pub jti: String,
    /// Subject (user ID).
    pub sub: String,
    /// Wallet address the session was proven with.
    pub wallet: String,
    /// Subscription tier at issuance time.
    pub tier: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiration (unix timestamp).
    pub exp: i64,
    /// Token type: "access" or "refresh".
    pub token_type: String,
}

impl Claims {
    pub fn is_access(&self) -> bool {
        self.token_type == "access"
    }

    pub fn is_refresh(&self) -> bool {
        self.token_type == "refresh"
    }

    /// Tier parsed fail-closed.
    pub fn tier(&self) -> SubscriptionTier {
        SubscriptionTier::parse(&self.tier)
    }
}
