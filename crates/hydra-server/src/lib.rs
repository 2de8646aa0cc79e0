//! Hydra Control Plane Library
//!
//! Core functionality for the Hydra control plane:
//! - Wallet-signature challenge/response auth with JWT bearer sessions
//! - Realtime WebSocket hub with per-channel subscriptions and bounded
//!   replay buffers
//! - Tier-gated engine lifecycle registry with an append-only audit trail
//! - SQLite storage for users, tokens, engines, configs, and audit entries

pub mod auth;
pub mod engines;
pub mod hub;
pub mod server;
pub mod storage;
