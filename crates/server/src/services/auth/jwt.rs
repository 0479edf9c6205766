//! Bearer token issue and verification (HS256).

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use vitrine_core::{Role, User, UserId};

use super::AuthError;

/// Claims carried by an admin token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: UserId,
    pub username: String,
    pub role: Role,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
}

/// Signing and verification keys derived from the shared secret.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl JwtKeys {
    #[must_use]
    pub fn new(secret: &SecretString, expiration_hours: i64) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            validation: Validation::new(Algorithm::HS256),
            lifetime: Duration::hours(expiration_hours),
        }
    }

    /// Issue a token for `user`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenEncoding` if signing fails.
    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(|e| {
            tracing::error!(error = %e, "Failed to sign token");
            AuthError::TokenEncoding
        })
    }

    /// Verify a token's signature and expiry.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenExpired` for an expired token and
    /// `AuthError::InvalidToken` for anything else that fails to verify.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })
    }

    /// Sign arbitrary claims. Used by tests to mint expired tokens.
    #[cfg(test)]
    pub(crate) fn sign(&self, claims: &Claims) -> String {
        encode(&Header::default(), claims, &self.encoding).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> JwtKeys {
        JwtKeys::new(
            &SecretString::from("k8Hq2mZr7VtXw4Lp9Bn3Jc6Fy1Ds5Ga0"),
            24,
        )
    }

    fn user() -> User {
        User {
            id: UserId::new(7),
            username: "admin".to_string(),
            password_hash: String::new(),
            name: "Administrador".to_string(),
            role: Role::Admin,
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let keys = keys();
        let token = keys.issue(&user()).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, UserId::new(7));
        assert_eq!(claims.username, "admin");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = keys().issue(&user()).unwrap();
        let other = JwtKeys::new(&SecretString::from("Zx9Wv8Ut7Sr6Qp5On4Ml3Kj2Ih1Gf0Ed"), 24);
        assert!(matches!(other.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            keys().verify("not.a.token"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token() {
        let keys = keys();
        let now = Utc::now().timestamp();
        let token = keys.sign(&Claims {
            sub: UserId::new(1),
            username: "admin".to_string(),
            role: Role::Admin,
            iat: now - 7200,
            exp: now - 3600,
        });
        assert!(matches!(keys.verify(&token), Err(AuthError::TokenExpired)));
    }
}
