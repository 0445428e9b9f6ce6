//! Password hashing and the registration password policy.

use anyhow::{Context, Result};

/// bcrypt work factor; kept as a tunable constant rather than inline magic.
pub const BCRYPT_COST: u32 = 12;

const MIN_PASSWORD_LENGTH: usize = 8;

/// Fixed punctuation set counted as "symbol" by the policy.
const PASSWORD_SYMBOLS: &str = "!@#$%^&*()_+-=[]{};':\"\\|,.<>/?`~";

/// One-way salted hash of a plaintext password.
pub fn hash_password(plaintext: &str) -> Result<String> {
    bcrypt::hash(plaintext, BCRYPT_COST).context("failed to hash password")
}

/// Check a plaintext password against a stored hash.
///
/// Constant-time comparison is delegated to bcrypt; callers must never
/// implement their own comparison. Malformed hashes count as a mismatch.
#[must_use]
pub fn verify_password(plaintext: &str, hash: &str) -> bool {
    bcrypt::verify(plaintext, hash).unwrap_or(false)
}

/// Return the first unmet registration policy rule, or `None` when the
/// password is acceptable.
#[must_use]
pub fn password_policy_violation(password: &str) -> Option<&'static str> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Some("must be at least 8 characters long");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Some("must contain a lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Some("must contain an uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Some("must contain a digit");
    }
    if !password.chars().any(|c| PASSWORD_SYMBOLS.contains(c)) {
        return Some("must contain a symbol");
    }
    None
}
