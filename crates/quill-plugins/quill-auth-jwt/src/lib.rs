//! # quill-auth-jwt
//!
//! Argon2-based implementation of `PasswordHasher` and a symmetric
//! JWT implementation of `TokenService`.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use quill_core::error::{AppError, Result};
use quill_core::models::AuthToken;
use quill_core::traits::{PasswordHasher, TokenService};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Hashes account secrets with Argon2id and a per-call random salt.
pub struct Argon2PasswordHasher;

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, plaintext: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
    }

    /// Verifies a plaintext against a stored Argon2 digest.
    /// A digest that does not parse verifies as false.
    fn verify(&self, plaintext: &str, digest: &str) -> bool {
        let parsed = match PasswordHash::new(digest) {
            Ok(p) => p,
            Err(_) => return false,
        };
        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// Stateless bearer tokens signed with a server-held secret (HS256).
///
/// There is no revocation list: a token stays valid until its expiry
/// even if the account it names has been deleted.
pub struct JwtTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
}

impl JwtTokenService {
    /// Standard service with the 1-day token lifetime.
    pub fn new(secret: &str) -> Self {
        Self::with_lifetime(secret, Duration::days(1))
    }

    pub fn with_lifetime(secret: &str, lifetime: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            lifetime,
        }
    }
}

impl TokenService for JwtTokenService {
    fn issue(&self, user_id: Uuid) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
    }

    fn verify(&self, token: &str) -> Result<AuthToken> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;
        let user_id = Uuid::parse_str(&data.claims.sub)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;
        Ok(AuthToken {
            user_id,
            issued_at: data.claims.iat,
            expires_at: data.claims.exp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_verify_roundtrip() {
        let hasher = Argon2PasswordHasher;
        let digest = hasher.hash("LongEnough1234!").unwrap();
        assert!(hasher.verify("LongEnough1234!", &digest));
        assert!(!hasher.verify("WrongPassword1!", &digest));
    }

    #[test]
    fn test_salt_uniqueness() {
        let hasher = Argon2PasswordHasher;
        let a = hasher.hash("LongEnough1234!").unwrap();
        let b = hasher.hash("LongEnough1234!").unwrap();
        assert_ne!(a, b);
        assert!(hasher.verify("LongEnough1234!", &a));
        assert!(hasher.verify("LongEnough1234!", &b));
    }

    #[test]
    fn test_malformed_digest_verifies_false() {
        let hasher = Argon2PasswordHasher;
        assert!(!hasher.verify("anything", "not-a-digest"));
        assert!(!hasher.verify("anything", ""));
    }

    #[test]
    fn test_token_roundtrip() {
        let svc = JwtTokenService::new("test-secret");
        let id = Uuid::new_v4();
        let token = svc.issue(id).unwrap();
        let claims = svc.verify(&token).unwrap();
        assert_eq!(claims.user_id, id);
        assert_eq!(claims.expires_at - claims.issued_at, 24 * 60 * 60);
    }

    #[test]
    fn test_token_rejected_with_different_secret() {
        let issuer = JwtTokenService::new("secret-a");
        let verifier = JwtTokenService::new("secret-b");
        let token = issuer.issue(Uuid::new_v4()).unwrap();
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn test_tampered_token_rejected() {
        let svc = JwtTokenService::new("test-secret");
        let mut token = svc.issue(Uuid::new_v4()).unwrap();
        token.push('x');
        assert!(svc.verify(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        // Lifetime far enough in the past to clear the default leeway.
        let svc = JwtTokenService::with_lifetime("test-secret", Duration::hours(-25));
        let token = svc.issue(Uuid::new_v4()).unwrap();
        assert!(svc.verify(&token).is_err());
    }
}
