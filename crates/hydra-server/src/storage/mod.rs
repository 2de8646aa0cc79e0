//! SQLite storage for the Hydra control plane.
//!
//! Provides persistence for users, refresh tokens, trading engines,
//! per-user engine configs, and the append-only audit log.

mod db;
mod models;
mod queries;
mod queries_audit;


pub use db::ControlDatabase;
pub use models::*;

pub use hydra_core::db::DatabaseError;
