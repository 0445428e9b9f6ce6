//! Verification token generation.

use anyhow::{Context, Result};
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};

/// Validity window for email verification tokens. Fixed, not per-call.
pub const VERIFICATION_TOKEN_TTL_HOURS: i64 = 24;

/// Issue an opaque verification token and its expiry instant.
///
/// The raw token only travels inside the verification link; 32 bytes of OS
/// randomness make collisions negligible.
pub fn issue() -> Result<(String, DateTime<Utc>)> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate verification token")?;
    let token = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes);
    let expires_at = Utc::now() + Duration::hours(VERIFICATION_TOKEN_TTL_HOURS);
    Ok((token, expires_at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    #[test]
    fn issued_token_decodes_to_32_bytes() -> Result<()> {
        let (token, _) = issue()?;
        let decoded = URL_SAFE_NO_PAD
            .decode(token.as_bytes())
            .context("token should be url-safe base64")?;
        assert_eq!(decoded.len(), 32);
        Ok(())
    }

    #[test]
    fn issued_tokens_are_unique() -> Result<()> {
        let (first, _) = issue()?;
        let (second, _) = issue()?;
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn expiry_is_24_hours_out() -> Result<()> {
        let before = Utc::now();
        let (_, expires_at) = issue()?;
        let after = Utc::now();
        assert!(expires_at >= before + Duration::hours(VERIFICATION_TOKEN_TTL_HOURS));
        assert!(expires_at <= after + Duration::hours(VERIFICATION_TOKEN_TTL_HOURS));
        Ok(())
    }
}
