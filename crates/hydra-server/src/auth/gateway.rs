//! Wallet challenge/response authentication gateway.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use hydra_core::db::DatabaseError;

use super::challenge::ChallengeStore;
use super::claims::Claims;
use super::jwt::JwtManager;
use super::wallet::{self, WalletError};
use crate::storage::{ControlDatabase, User};

/// Authentication failures surfaced to callers. None are retried
/// internally; the caller decides (e.g. re-challenge on expiry).
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No outstanding challenge for this wallet")]
    ChallengeNotFound,

    #[error("Challenge expired")]
    ChallengeExpired,

    #[error("Signature verification failed")]
    SignatureInvalid,

    #[error("Token invalid")]
    TokenInvalid,

    #[error("Token expired")]
    TokenExpired,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),
}

/// A minted bearer session: the user profile plus its token pair.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

/// Issues single-use signed challenges, verifies wallet signatures, and
/// mints/rotates bearer sessions.
pub struct AuthGateway {
    db: ControlDatabase,
    jwt: Arc<JwtManager>,
    challenges: Arc<ChallengeStore>,
}

impl AuthGateway {
    pub fn new(db: ControlDatabase, jwt: Arc<JwtManager>, challenges: Arc<ChallengeStore>) -> Self {
        Self {
            db,
            jwt,
            challenges,
        }
    }

    /// Issue a challenge for a wallet. Returns the message the wallet must
    /// sign.
    #[instrument(skip(self))]
    pub async fn issue_challenge(&self, wallet_address: &str) -> Result<String, AuthError> {
        wallet::parse_wallet_address(wallet_address)
            .map_err(|_| AuthError::InvalidInput("Malformed wallet address".to_string()))?;

        let challenge = self.challenges.issue(wallet_address).await;
        info!(wallet = %wallet_address, "Challenge issued");
        Ok(challenge.message)
    }

    /// Verify a signed challenge and mint a bearer session.
    ///
    /// The challenge is consumed on the first verification attempt,
    /// successful or not; a second attempt fails with `ChallengeNotFound`.
    #[instrument(skip(self, message, signature))]
    pub async fn verify(
        &self,
        wallet_address: &str,
        message: &str,
        signature: &str,
    ) -> Result<AuthSession, AuthError> {
        wallet::parse_wallet_address(wallet_address)
            .map_err(|_| AuthError::InvalidInput("Malformed wallet address".to_string()))?;

        let challenge = self
            .challenges
            .take(wallet_address)
            .await
            .ok_or(AuthError::ChallengeNotFound)?;

        if challenge.is_expired() {
            return Err(AuthError::ChallengeExpired);
        }

        // The signature must cover the exact bytes we issued; a different
        // message is treated the same as a bad signature.
        if message != challenge.message {
            warn!(wallet = %wallet_address, "Submitted message differs from issued challenge");
            return Err(AuthError::SignatureInvalid);
        }

        wallet::verify_signature(wallet_address, message.as_bytes(), signature).map_err(
            |e| match e {
                WalletError::MalformedSignature => {
                    AuthError::InvalidInput("Malformed signature".to_string())
                }
                _ => AuthError::SignatureInvalid,
            },
        )?;

        let user = match self.db.get_user_by_wallet(wallet_address).await? {
            Some(user) => user,
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                info!(wallet = %wallet_address, user_id = %id, "Provisioning first-seen user");
                self.db.create_user(&id, wallet_address).await?
            }
        };

        if !user.is_active() {
            warn!(user_id = %user.id, "Verification attempt for deactivated user");
            return Err(AuthError::Unauthorized);
        }

        let session = self.mint_session(&user).await?;
        info!(user_id = %user.id, wallet = %wallet_address, "Wallet verified, session minted");
        Ok(session)
    }

    /// Exchange a refresh token for a new token pair. The presented
    /// refresh token is revoked (rotation).
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        let claims = self.jwt.validate(refresh_token).map_err(map_jwt_error)?;

        if !claims.is_refresh() {
            return Err(AuthError::TokenInvalid);
        }

        let token_hash = JwtManager::hash_token(refresh_token);
        let stored = self
            .db
            .get_refresh_token_by_hash(&token_hash)
            .await?
            .ok_or(AuthError::TokenInvalid)?;

        self.db.revoke_refresh_token(&stored.id).await?;

        // Re-read the user so a tier change since issuance lands in the
        // fresh claims.
        let user = self
            .db
            .get_user(&claims.sub)
            .await
            .map_err(|_| AuthError::Unauthorized)?;
        if !user.is_active() {
            return Err(AuthError::Unauthorized);
        }

        self.mint_session(&user).await
    }

    /// Revoke a refresh token (logout). Returns whether anything was
    /// revoked.
    #[instrument(skip(self, refresh_token))]
    pub async fn logout(&self, refresh_token: &str) -> Result<bool, AuthError> {
        let token_hash = JwtManager::hash_token(refresh_token);
        match self.db.get_refresh_token_by_hash(&token_hash).await? {
            Some(stored) => Ok(self.db.revoke_refresh_token(&stored.id).await?),
            None => Ok(false),
        }
    }

    /// Stateless bearer-token verification for REST calls and the realtime
    /// handshake.
    pub fn authenticate(&self, bearer_token: &str) -> Result<Claims, AuthError> {
        let claims = self
            .jwt
            .validate(bearer_token)
            .map_err(|_| AuthError::Unauthorized)?;

        if !claims.is_access() {
            return Err(AuthError::Unauthorized);
        }

        Ok(claims)
    }

    async fn mint_session(&self, user: &User) -> Result<AuthSession, AuthError> {
        let tier = user.tier();

        let (access_token, expires_in) = self
            .jwt
            .issue_access_token(&user.id, &user.wallet_address, tier)
            .map_err(|_| AuthError::TokenInvalid)?;
        let (refresh_token, refresh_exp) = self
            .jwt
            .issue_refresh_token(&user.id, &user.wallet_address, tier)
            .map_err(|_| AuthError::TokenInvalid)?;

        let token_id = uuid::Uuid::new_v4().to_string();
        let token_hash = JwtManager::hash_token(&refresh_token);
        self.db
            .create_refresh_token(&token_id, &user.id, &token_hash, refresh_exp)
            .await?;

        Ok(AuthSession {
            user: user.clone(),
            access_token,
            refresh_token,
            expires_in,
        })
    }
}

fn map_jwt_error(e: jsonwebtoken::errors::Error) -> AuthError {
    match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::TokenInvalid,
    }
}
