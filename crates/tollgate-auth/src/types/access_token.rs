//! Access token domain type.
//!
//! Both access and refresh tokens are stored as `AccessToken` records,
//! distinguished by the `refresh` flag.
//!
//! # Lifecycle
//!
//! 1. Minted by a grant strategy at issue or refresh time
//! 2. Looked up by raw value for introspection and revocation
//! 3. Marked revoked on revocation, or superseded when a new refresh token is minted
//! 4. Expires lazily; readers compare `expires_at` against the clock

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Issued bearer credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    /// Internal record identifier.
    pub id: Uuid,

    /// The authorization code this token was minted for.
    pub authorization_code_id: Uuid,

    /// Opaque token value (unique).
    pub token: String,

    /// When this token expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// `true` for refresh tokens.
    pub refresh: bool,

    /// Name of the grant type that minted the token.
    pub grant_type: String,

    /// Links an access token with its refresh token and with later tokens of
    /// the same refresh chain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_uid: Option<String>,

    /// Scopes carried over from the authorization code.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// When the token was revoked (None = not revoked).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub revoked_at: Option<OffsetDateTime>,
}

impl AccessToken {
    /// Returns `true` if the token has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now > self.expires_at
    }

    /// Returns `true` if the token has been revoked.
    #[must_use]
    pub fn is_invalid(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Returns `true` if the token is neither expired nor revoked.
    #[must_use]
    pub fn is_live(&self, now: OffsetDateTime) -> bool {
        !self.is_expired(now) && !self.is_invalid()
    }

    /// Seconds from `now` until expiry. Negative once expired.
    #[must_use]
    pub fn expires_in(&self, now: OffsetDateTime) -> i64 {
        (self.expires_at - now).whole_seconds()
    }

    /// Returns whether this is an access or a refresh token.
    #[must_use]
    pub fn token_type(&self) -> TokenType {
        if self.refresh {
            TokenType::Refresh
        } else {
            TokenType::Access
        }
    }
}

/// Kind of stored token, as reported by introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// A bearer access token.
    Access,
    /// A refresh token.
    Refresh,
}

impl TokenType {
    /// Returns the token type as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[test]
    fn test_is_expired() {
        let now = OffsetDateTime::now_utc();

        let token = create_test_token(now + Duration::hours(1), None);
        assert!(!token.is_expired(now));

        let token = create_test_token(now - Duration::minutes(1), None);
        assert!(token.is_expired(now));
    }

    #[test]
    fn test_is_live() {
        let now = OffsetDateTime::now_utc();

        let token = create_test_token(now + Duration::hours(1), None);
        assert!(token.is_live(now));

        // Expired
        let token = create_test_token(now - Duration::minutes(1), None);
        assert!(!token.is_live(now));

        // Revoked
        let token = create_test_token(now + Duration::hours(1), Some(now));
        assert!(token.is_invalid());
        assert!(!token.is_live(now));
    }

    #[test]
    fn test_expires_in() {
        let now = OffsetDateTime::now_utc();
        let token = create_test_token(now + Duration::seconds(90), None);
        assert_eq!(token.expires_in(now), 90);

        let token = create_test_token(now - Duration::seconds(5), None);
        assert_eq!(token.expires_in(now), -5);
    }

    #[test]
    fn test_token_type() {
        let now = OffsetDateTime::now_utc();
        let mut token = create_test_token(now, None);
        assert_eq!(token.token_type(), TokenType::Access);

        token.refresh = true;
        assert_eq!(token.token_type(), TokenType::Refresh);
        assert_eq!(token.token_type().to_string(), "refresh");
    }

    fn create_test_token(
        expires_at: OffsetDateTime,
        revoked_at: Option<OffsetDateTime>,
    ) -> AccessToken {
        AccessToken {
            id: Uuid::new_v4(),
            authorization_code_id: Uuid::new_v4(),
            token: "test-token".to_string(),
            expires_at,
            refresh: false,
            grant_type: "authorization_code".to_string(),
            correlation_uid: Some("corr".to_string()),
            scopes: vec!["read".to_string()],
            revoked_at,
        }
    }
}
