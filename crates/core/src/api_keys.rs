//! API-key secret generation, hashing, and verification.
//!
//! Secrets look like `sk_live_<40 alphanumerics>`. Only an Argon2id hash of
//! the full secret is ever stored; the first [`LOOKUP_PREFIX_LEN`] characters
//! are kept in clear as an indexed lookup prefix and for display.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::Rng;

/// Leading tag on every generated secret.
pub const SECRET_TAG: &str = "sk_live_";

/// Number of random alphanumeric characters after the tag.
pub const SECRET_RANDOM_LEN: usize = 40;

/// Number of leading characters stored in clear for lookup and display.
pub const LOOKUP_PREFIX_LEN: usize = 20;

/// Fallback hourly quota when a key has no per-key limit configured.
pub const DEFAULT_HOURLY_LIMIT: u32 = 100;

/// The result of generating a new API key.
pub struct GeneratedApiKey {
    /// The full plaintext secret. Shown to the operator exactly once,
    /// never stored.
    pub secret: String,
    /// The first [`LOOKUP_PREFIX_LEN`] characters of the secret.
    pub prefix: String,
    /// Argon2id PHC hash of the full secret (stored in the database).
    pub hash: String,
}

/// Generate a new random API key.
pub fn generate_api_key() -> Result<GeneratedApiKey, argon2::password_hash::Error> {
    let random: String = rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(SECRET_RANDOM_LEN)
        .map(char::from)
        .collect();
    let secret = format!("{SECRET_TAG}{random}");

    let prefix = lookup_prefix(&secret).to_string();
    let hash = hash_secret(&secret)?;

    Ok(GeneratedApiKey {
        secret,
        prefix,
        hash,
    })
}

/// Extract the lookup prefix from a presented secret.
pub fn lookup_prefix(secret: &str) -> &str {
    &secret[..LOOKUP_PREFIX_LEN.min(secret.len())]
}

/// Hash a plaintext secret using Argon2id with a random salt.
///
/// Returns the PHC-formatted hash string (algorithm, params, salt, and hash
/// are all embedded, so future parameter changes verify transparently).
pub fn hash_secret(secret: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(secret.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a presented secret against a stored PHC hash.
///
/// Returns `Ok(true)` on match, `Ok(false)` on mismatch. Comparison is
/// constant-time inside the argon2 crate.
pub fn verify_secret(secret: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(secret.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_secret_has_tag_and_length() {
        let key = generate_api_key().expect("generation should succeed");
        assert!(key.secret.starts_with(SECRET_TAG));
        assert_eq!(key.secret.len(), SECRET_TAG.len() + SECRET_RANDOM_LEN);
    }

    #[test]
    fn prefix_matches_start_of_secret() {
        let key = generate_api_key().expect("generation should succeed");
        assert_eq!(key.prefix.len(), LOOKUP_PREFIX_LEN);
        assert_eq!(&key.secret[..LOOKUP_PREFIX_LEN], key.prefix);
    }

    #[test]
    fn hash_is_argon2id_phc() {
        let key = generate_api_key().expect("generation should succeed");
        assert!(key.hash.starts_with("$argon2id$"));
    }

    #[test]
    fn correct_secret_verifies() {
        let key = generate_api_key().expect("generation should succeed");
        let ok = verify_secret(&key.secret, &key.hash).expect("verify should succeed");
        assert!(ok);
    }

    #[test]
    fn wrong_secret_fails_verification() {
        let key = generate_api_key().expect("generation should succeed");
        let ok = verify_secret("sk_live_not_the_right_secret_at_all_0000", &key.hash)
            .expect("verify should succeed");
        assert!(!ok);
    }

    #[test]
    fn different_keys_produce_different_secrets() {
        let a = generate_api_key().expect("generation should succeed");
        let b = generate_api_key().expect("generation should succeed");
        assert_ne!(a.secret, b.secret);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn lookup_prefix_handles_short_input() {
        assert_eq!(lookup_prefix("sk_live_ab"), "sk_live_ab");
    }
}
