//! JWT token issuance and validation.

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use sha2::{Digest, Sha256};

use hydra_core::SubscriptionTier;
use hydra_core::db::unix_timestamp;

use super::claims::Claims;

/// Manages JWT token creation and validation.
///
/// Issuance and verification are pure given the signing secret passed at
/// construction; there is no hidden key state.
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl JwtManager {
    /// Create a new `JwtManager` with the given secret.
    pub fn new(secret: &[u8], access_ttl_secs: i64, refresh_ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl_secs,
            refresh_ttl_secs,
        }
    }

    /// Issue an access token. Returns the token and its TTL in seconds.
    pub fn issue_access_token(
        &self,
        user_id: &str,
        wallet: &str,
        tier: SubscriptionTier,
    ) -> Result<(String, i64), jsonwebtoken::errors::Error> {
        let token = self.issue(user_id, wallet, tier, "access", self.access_ttl_secs)?;
        Ok((token, self.access_ttl_secs))
    }

    /// Issue a refresh token. Returns the token and its expiry timestamp.
    pub fn issue_refresh_token(
        &self,
        user_id: &str,
        wallet: &str,
        tier: SubscriptionTier,
    ) -> Result<(String, i64), jsonwebtoken::errors::Error> {
        let exp = unix_timestamp() + self.refresh_ttl_secs;
        let token = self.issue(user_id, wallet, tier, "refresh", self.refresh_ttl_secs)?;
        Ok((token, exp))
    }

    fn issue(
        &self,
        user_id: &str,
        wallet: &str,
        tier: SubscriptionTier,
        token_type: &str,
        ttl_secs: i64,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = unix_timestamp();

        let claims = Claims {
            jti: uuid::Uuid::new_v4().to_string(),
            sub: user_id.to_string(),
            wallet: wallet.to_string(),
            tier: tier.as_str().to_string(),
            iat: now,
            exp: now + ttl_secs,
            token_type: token_type.to_string(),
        };

        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
    }

    /// Validate a token (signature and expiry) and return its claims.
    pub fn validate(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let data =
            jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &Validation::default())?;
        Ok(data.claims)
    }

    /// Hash a token for storage (we don't store raw tokens).
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_jwt() -> JwtManager {
        JwtManager::new(b"test-secret-key-for-testing", 3600, 86400)
    }

    #[test]
    fn issue_and_validate_access_token() {
        let jwt = test_jwt();
        let (token, ttl) = jwt
            .issue_access_token("user-1", "wallet-1", SubscriptionTier::Premium)
            .unwrap();
        assert_eq!(ttl, 3600);

        let claims = jwt.validate(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.wallet, "wallet-1");
        assert_eq!(claims.tier(), SubscriptionTier::Premium);
        assert!(claims.is_access());
    }

    #[test]
    fn issue_and_validate_refresh_token() {
        let jwt = test_jwt();
        let (token, exp) = jwt
            .issue_refresh_token("user-1", "wallet-1", SubscriptionTier::Free)
            .unwrap();
        assert!(exp > unix_timestamp());

        let claims = jwt.validate(&token).unwrap();
        assert!(claims.is_refresh());
        assert_eq!(claims.sub, "user-1");
    }

    #[test]
    fn invalid_token_fails_validation() {
        let jwt = test_jwt();
        assert!(jwt.validate("not-a-valid-token").is_err());
    }

    #[test]
    fn wrong_secret_fails_validation() {
        let jwt1 = test_jwt();
        let jwt2 = JwtManager::new(b"different-secret", 3600, 86400);

        let (token, _) = jwt1
            .issue_access_token("user-1", "wallet-1", SubscriptionTier::Free)
            .unwrap();
        assert!(jwt2.validate(&token).is_err());
    }

    #[test]
    fn token_hash_is_deterministic() {
        let h1 = JwtManager::hash_token("same-token");
        let h2 = JwtManager::hash_token("same-token");
        assert_eq!(h1, h2);

        let h3 = JwtManager::hash_token("different-token");
        assert_ne!(h1, h3);
    }
}
