//! Authorization code domain type.
//!
//! An authorization code is produced by the authorize step and later
//! exchanged for tokens. It is the parent of every access and refresh token
//! minted from it.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Authorization code stored by the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationCode {
    /// Internal record identifier.
    pub id: Uuid,

    /// Opaque code value (unique).
    pub code: String,

    /// `uid` of the client the code was issued to.
    pub client_uid: String,

    /// Redirect URL the code was bound to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,

    /// When the code stops being redeemable.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// Granted scopes.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Number of times the code has been redeemed.
    #[serde(default)]
    pub redeem_attempts: u32,

    /// PKCE code challenge from the authorization request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_challenge: Option<String>,

    /// PKCE challenge method as sent by the client (`PLAIN` or `S256`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_challenge_method: Option<String>,
}

impl AuthorizationCode {
    /// Creates a code without scopes or PKCE data.
    #[must_use]
    pub fn new(
        code: impl Into<String>,
        client_uid: impl Into<String>,
        expires_at: OffsetDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            code: code.into(),
            client_uid: client_uid.into(),
            redirect_url: None,
            expires_at,
            scopes: Vec::new(),
            redeem_attempts: 0,
            code_challenge: None,
            code_challenge_method: None,
        }
    }

    /// Binds the code to a redirect URL.
    #[must_use]
    pub fn with_redirect_url(mut self, redirect_url: impl Into<String>) -> Self {
        self.redirect_url = Some(redirect_url.into());
        self
    }

    /// Sets the granted scopes.
    #[must_use]
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Attaches a PKCE challenge.
    #[must_use]
    pub fn with_code_challenge(
        mut self,
        challenge: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        self.code_challenge = Some(challenge.into());
        self.code_challenge_method = Some(method.into());
        self
    }

    /// Returns `true` if the code can no longer be redeemed at `now`.
    #[must_use]
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[test]
    fn test_is_expired() {
        let now = OffsetDateTime::now_utc();

        let code = AuthorizationCode::new("abc", "app", now + Duration::minutes(10));
        assert!(!code.is_expired(now));

        let code = AuthorizationCode::new("abc", "app", now - Duration::minutes(1));
        assert!(code.is_expired(now));
    }

    #[test]
    fn test_builders() {
        let now = OffsetDateTime::now_utc();
        let code = AuthorizationCode::new("abc", "app", now)
            .with_redirect_url("https://app.example.com/cb")
            .with_scopes(["read", "write"])
            .with_code_challenge("challenge", "S256");

        assert_eq!(
            code.redirect_url.as_deref(),
            Some("https://app.example.com/cb")
        );
        assert_eq!(code.scopes, vec!["read".to_string(), "write".to_string()]);
        assert_eq!(code.code_challenge.as_deref(), Some("challenge"));
        assert_eq!(code.code_challenge_method.as_deref(), Some("S256"));
        assert_eq!(code.redeem_attempts, 0);
    }

    #[test]
    fn test_serialization() {
        let now = OffsetDateTime::now_utc();
        let code = AuthorizationCode::new("abc", "app", now).with_scopes(["read"]);

        let json = serde_json::to_string(&code).unwrap();
        let deserialized: AuthorizationCode = serde_json::from_str(&json).unwrap();

        assert_eq!(code.id, deserialized.id);
        assert_eq!(code.code, deserialized.code);
        assert_eq!(code.scopes, deserialized.scopes);
    }
}
