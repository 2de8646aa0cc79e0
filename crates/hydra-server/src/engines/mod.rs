//! Engine lifecycle registry.
//!
//! Per-user engine activation gated by subscription tier, with per-key
//! serialization of transitions and an append-only audit trail.

pub mod lifecycle;
pub mod locks;


pub use lifecycle::{
    ConfigureParams, EngineAction, EngineError, EngineOverview, EngineService, EngineStatus,
    TransitionResult,
};
