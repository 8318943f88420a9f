//! Opaque token generation.
//!
//! Tokens are random bytes encoded as base64url without padding. The
//! generator also hands out correlation ids, so both sources of randomness
//! can be replaced together in tests.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use time::OffsetDateTime;
use uuid::Uuid;

use super::clock::Clock;
use crate::AuthResult;
use crate::config::GrantConfig;
use crate::error::AuthError;

/// Which default lifetime a generated token receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Default grant lifetime (`access_token_lifetime`).
    Access,
    /// Refresh lifetime (`refresh_token_lifetime`).
    Refresh,
}

/// A freshly generated token value and its absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedToken {
    /// Opaque token value.
    pub value: String,
    /// When the token expires.
    pub expires_at: OffsetDateTime,
}

/// Produces unpredictable token values and correlation ids.
pub trait TokenGenerator: Send + Sync {
    /// Generates a token. `ttl` overrides the default lifetime for `kind`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the expiry is not representable.
    fn generate(&self, kind: TokenKind, ttl: Option<Duration>) -> AuthResult<GeneratedToken>;

    /// Generates a new correlation id for a token chain.
    fn correlation_uid(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Computes `now + ttl`, failing instead of overflowing the calendar.
///
/// # Errors
///
/// Returns `AuthError::Configuration` if the sum is out of range.
pub fn expires_after(now: OffsetDateTime, ttl: Duration) -> AuthResult<OffsetDateTime> {
    time::Duration::try_from(ttl)
        .ok()
        .and_then(|offset| now.checked_add(offset))
        .ok_or_else(|| {
            AuthError::configuration(format!("token lifetime {ttl:?} is out of range"))
        })
}

/// Cryptographically random token generator.
pub struct RandomTokenGenerator {
    clock: Arc<dyn Clock>,
    access_ttl: Duration,
    refresh_ttl: Duration,
    token_bytes: usize,
}

impl RandomTokenGenerator {
    /// Creates a generator using the lifetimes and entropy from `config`.
    #[must_use]
    pub fn new(config: &GrantConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            access_ttl: config.access_token_lifetime,
            refresh_ttl: config.refresh_token_lifetime,
            token_bytes: config.token_bytes,
        }
    }

    fn random_value(&self) -> String {
        let mut bytes = vec![0u8; self.token_bytes];
        rand::Rng::fill(&mut rand::thread_rng(), bytes.as_mut_slice());
        URL_SAFE_NO_PAD.encode(bytes)
    }
}

impl TokenGenerator for RandomTokenGenerator {
    fn generate(&self, kind: TokenKind, ttl: Option<Duration>) -> AuthResult<GeneratedToken> {
        let ttl = ttl.unwrap_or(match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        });
        let expires_at = expires_after(self.clock.now(), ttl)?;

        Ok(GeneratedToken {
            value: self.random_value(),
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::clock::ManualClock;
    use time::macros::datetime;

    fn generator() -> RandomTokenGenerator {
        let clock = Arc::new(ManualClock::new(datetime!(2024-01-01 00:00 UTC)));
        RandomTokenGenerator::new(&GrantConfig::default(), clock)
    }

    #[test]
    fn test_generate_token_length() {
        let token = generator().generate(TokenKind::Access, None).unwrap();
        // 32 bytes base64url encoded = 43 characters
        assert_eq!(token.value.len(), 43);
        assert!(
            token
                .value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_generate_token_uniqueness() {
        let generator = generator();
        let tokens: Vec<String> = (0..100)
            .map(|_| generator.generate(TokenKind::Access, None).unwrap().value)
            .collect();

        let mut unique = tokens.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(tokens.len(), unique.len());
    }

    #[test]
    fn test_default_lifetimes() {
        let generator = generator();

        let access = generator.generate(TokenKind::Access, None).unwrap();
        assert_eq!(access.expires_at, datetime!(2024-01-01 01:00 UTC));

        let refresh = generator.generate(TokenKind::Refresh, None).unwrap();
        assert_eq!(refresh.expires_at, datetime!(2024-01-01 00:20 UTC));
    }

    #[test]
    fn test_ttl_override() {
        let token = generator()
            .generate(TokenKind::Refresh, Some(Duration::from_secs(30)))
            .unwrap();
        assert_eq!(token.expires_at, datetime!(2024-01-01 00:00:30 UTC));
    }

    #[test]
    fn test_unrepresentable_expiry_is_an_error() {
        let err = generator()
            .generate(TokenKind::Refresh, Some(Duration::from_secs(u64::MAX / 2)))
            .unwrap_err();
        assert!(matches!(err, AuthError::Configuration { .. }));

        let now = datetime!(2024-01-01 00:00 UTC);
        assert!(expires_after(now, Duration::MAX).is_err());
        assert_eq!(
            expires_after(now, Duration::from_secs(60)).unwrap(),
            datetime!(2024-01-01 00:01 UTC)
        );
    }

    #[test]
    fn test_correlation_uid_is_uuid() {
        let uid = generator().correlation_uid();
        assert!(Uuid::parse_str(&uid).is_ok());
    }
}
