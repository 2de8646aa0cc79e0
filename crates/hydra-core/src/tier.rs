//! Subscription tiers and the engine access policy.
//!
//! Tiers form a total order (`FREE < BASIC < PREMIUM < VIP`). Access to an
//! engine is granted when the user's tier level is at least the engine's
//! required level.

use serde::{Deserialize, Serialize};

/// Ordered subscription tier.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubscriptionTier {
    #[default]
    Free,
    Basic,
    Premium,
    Vip,
}

impl SubscriptionTier {
    /// Numeric privilege level, `FREE` = 0 through `VIP` = 3.
    pub const fn level(self) -> u8 {
        match self {
            Self::Free => 0,
            Self::Basic => 1,
            Self::Premium => 2,
            Self::Vip => 3,
        }
    }

    /// Wire/database representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "FREE",
            Self::Basic => "BASIC",
            Self::Premium => "PREMIUM",
            Self::Vip => "VIP",
        }
    }

    /// Parse a tier string. Unknown strings map to `Free` (least
    /// privilege) rather than an error, so a corrupt or stale tier value
    /// can never grant access it should not have.
    pub fn parse(s: &str) -> Self {
        match s {
            "BASIC" => Self::Basic,
            "PREMIUM" => Self::Premium,
            "VIP" => Self::Vip,
            _ => Self::Free,
        }
    }
}

impl std::fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access policy: a user may operate an engine when their tier is at
/// least the engine's required tier.
pub const fn has_access(user_tier: SubscriptionTier, required_tier: SubscriptionTier) -> bool {
    user_tier.level() >= required_tier.level()
}
