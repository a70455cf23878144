//! Password hashing and verification.

use super::errors::{AuthError, AuthResult};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

/// Argon2id cost parameters.
///
/// Higher values mean more compute and memory per hash, raising the price
/// of offline brute force. Tunable via configuration.
#[derive(Debug, Clone)]
pub struct Argon2Cost {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of iterations
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for Argon2Cost {
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Hashes and verifies passwords with Argon2id plus a server-side pepper.
#[derive(Clone)]
pub struct CredentialManager {
    pepper: String,
    cost: Argon2Cost,
    /// Hash of a fixed throwaway password, verified against when the
    /// account doesn't exist so that login timing doesn't reveal whether
    /// an email is registered.
    decoy_hash: String,
}

impl CredentialManager {
    /// Create a new credential manager.
    ///
    /// # Errors
    ///
    /// * `AuthError::HashingFailed` - Cost parameters are out of range
    pub fn new(pepper: String, cost: Argon2Cost) -> AuthResult<Self> {
        let mut manager = Self {
            pepper,
            cost,
            decoy_hash: String::new(),
        };
        manager.decoy_hash = manager.hash("decoy-password")?;
        Ok(manager)
    }

    fn hasher(&self) -> AuthResult<Argon2<'_>> {
        let params = Params::new(
            self.cost.memory_kib,
            self.cost.iterations,
            self.cost.parallelism,
            None,
        )
        .map_err(|_| AuthError::HashingFailed)?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    /// Hash a password with Argon2id + pepper.
    ///
    /// # Errors
    ///
    /// * `AuthError::HashingFailed` - Underlying primitive failed
    pub fn hash(&self, password: &str) -> AuthResult<String> {
        let peppered = format!("{}{}", password, self.pepper);
        let salt = SaltString::generate(&mut OsRng);
        Ok(self
            .hasher()?
            .hash_password(peppered.as_bytes(), &salt)
            .map_err(|_| AuthError::HashingFailed)?
            .to_string())
    }

    /// Verify a password against a stored hash.
    ///
    /// Cost parameters are read from the hash string itself, so hashes
    /// produced under older cost settings keep verifying. Comparison is
    /// constant-time within the argon2 verifier; a malformed hash verifies
    /// as false rather than erroring.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        let peppered = format!("{}{}", password, self.pepper);
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(peppered.as_bytes(), &parsed)
            .is_ok()
    }

    /// Burn a verification against the decoy hash.
    ///
    /// Called on login when no account matches, so the unknown-email and
    /// wrong-password paths do comparable work.
    pub fn verify_decoy(&self, password: &str) {
        let _ = self.verify(password, &self.decoy_hash);
    }
}
