//! Token introspection result.
//!
//! # Security Considerations
//!
//! - Unknown and revoked tokens produce `{"active": false}` and nothing else
//! - Callers never learn why a token is inactive

use serde::Serialize;
use time::OffsetDateTime;

use crate::types::{AccessToken, TokenType};

/// Metadata about a token, or just `active: false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct Introspection {
    /// Whether the token is currently usable.
    pub active: bool,

    /// Seconds until the token expires (negative once expired).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,

    /// Grant type that minted the token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grant_type: Option<String>,

    /// Scopes attached to the token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<Vec<String>>,

    /// `access` or `refresh`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<TokenType>,
}

impl Introspection {
    /// The response for unknown, revoked or otherwise invalid tokens.
    #[must_use]
    pub fn inactive() -> Self {
        Self::default()
    }

    /// Describes a stored token that has not been revoked.
    ///
    /// An expired token still reports its metadata with `active: false`.
    #[must_use]
    pub fn from_token(token: &AccessToken, now: OffsetDateTime) -> Self {
        Self {
            active: !token.is_expired(now),
            expires_in: Some(token.expires_in(now)),
            grant_type: Some(token.grant_type.clone()),
            scope: Some(token.scopes.clone()),
            token_type: Some(token.token_type()),
        }
    }
}
