//! Authentication service.
//!
//! Password login for admin panel users and bearer token verification.

mod error;
mod jwt;

pub use error::AuthError;
pub use jwt::{Claims, JwtKeys};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use vitrine_core::User;

use crate::db::CatalogStore;

/// Authentication service.
pub struct AuthService<'a> {
    store: &'a dyn CatalogStore,
    keys: &'a JwtKeys,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a dyn CatalogStore, keys: &'a JwtKeys) -> Self {
        Self { store, keys }
    }

    /// Login with username and password, returning a signed token and the user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the username/password is wrong.
    pub async fn login(&self, username: &str, password: &str) -> Result<(String, User), AuthError> {
        let user = self
            .store
            .find_user_by_username(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &user.password_hash)?;

        let token = self.keys.issue(&user)?;
        Ok((token, user))
    }

    /// Resolve the user a verified token was issued to.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user was deleted after the
    /// token was issued.
    pub async fn current_user(&self, claims: &Claims) -> Result<User, AuthError> {
        self.store
            .get_user(claims.sub)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a stored hash.
///
/// Accepts Argon2 PHC strings and legacy bcrypt (`$2a$`, `$2b$`, `$2y$`)
/// hashes imported from older data files.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` on mismatch or an unreadable hash.
pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    if is_bcrypt_hash(hash) {
        return match bcrypt::verify(password, hash) {
            Ok(true) => Ok(()),
            Ok(false) | Err(_) => Err(AuthError::InvalidCredentials),
        };
    }

    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

fn is_bcrypt_hash(hash: &str) -> bool {
    ["$2a$", "$2b$", "$2y$"]
        .iter()
        .any(|prefix| hash.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::JsonStore;
    use secrecy::SecretString;
    use vitrine_core::Role;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("s3nha-forte").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("s3nha-forte", &hash).is_ok());
        assert!(matches!(
            verify_password("errada", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_legacy_bcrypt_hash() {
        let hash = bcrypt::hash("admin123", 4).unwrap();
        assert!(verify_password("admin123", &hash).is_ok());
        assert!(verify_password("admin124", &hash).is_err());
    }

    #[test]
    fn test_garbage_hash_is_invalid_credentials() {
        assert!(matches!(
            verify_password("anything", "not-a-hash"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_login() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        let hash = hash_password("admin123").unwrap();
        store
            .create_user("admin", "Administrador", Role::Admin, &hash)
            .await
            .unwrap();
        let keys = JwtKeys::new(&SecretString::from("k8Hq2mZr7VtXw4Lp9Bn3Jc6Fy1Ds5Ga0"), 24);
        let auth = AuthService::new(&store, &keys);

        let (token, user) = auth.login("admin", "admin123").await.unwrap();
        assert_eq!(user.username, "admin");
        let claims = keys.verify(&token).unwrap();
        assert_eq!(auth.current_user(&claims).await.unwrap().id, user.id);

        assert!(matches!(
            auth.login("admin", "wrong").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("ghost", "admin123").await,
            Err(AuthError::InvalidCredentials)
        ));
    }
}
