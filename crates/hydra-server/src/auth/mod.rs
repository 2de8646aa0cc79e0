//! Authentication for the Hydra control plane.
//!
//! Wallet-signature challenge/response flow issuing JWT bearer sessions:
//! a wallet requests a single-use challenge, signs the returned message,
//! and exchanges the signature for an access/refresh token pair.

pub mod challenge;
pub mod claims;
pub mod gateway;
pub mod jwt;
pub mod wallet;


pub use challenge::ChallengeStore;
pub use claims::Claims;
pub use gateway::{AuthError, AuthGateway, AuthSession};
pub use jwt::JwtManager;
