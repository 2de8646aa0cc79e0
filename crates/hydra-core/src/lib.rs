//! Hydra Core Library
//!
//! Shared kernel for the Hydra control plane:
//! - Subscription tiers and the access policy
//! - Realtime event/channel model
//! - SQLite pool helpers and timestamps
//! - Tracing initialization

pub mod db;
pub mod event;
pub mod tier;
pub mod tracing_init;

pub use event::{Channel, Event};
pub use tier::{SubscriptionTier, has_access};
