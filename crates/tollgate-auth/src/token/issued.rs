//! Result of an issue or refresh operation.

use serde::Serialize;
use time::OffsetDateTime;

use crate::types::AccessToken;

/// Token pair handed back to the client.
///
/// `expires_in` is relative: seconds from the moment the result was built.
/// It does not account for request round-trip time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedToken {
    /// The access token value.
    pub access_token: String,

    /// Seconds until the access token expires.
    pub expires_in: i64,

    /// Granted scopes. Always empty; scopes are reported by introspection.
    pub scope: Vec<String>,

    /// The paired refresh token, when one was minted or reused.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl IssuedToken {
    /// Builds the result for a stored access token.
    #[must_use]
    pub fn from_token(token: &AccessToken, now: OffsetDateTime) -> Self {
        Self {
            access_token: token.token.clone(),
            expires_in: token.expires_in(now),
            scope: Vec::new(),
            refresh_token: None,
        }
    }

    /// Attaches a refresh token value.
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;
    use uuid::Uuid;

    #[test]
    fn test_from_token_converts_expiry_to_relative_seconds() {
        let now = OffsetDateTime::now_utc();
        let token = AccessToken {
            id: Uuid::new_v4(),
            authorization_code_id: Uuid::new_v4(),
            token: "tok".to_string(),
            expires_at: now + Duration::minutes(10),
            refresh: false,
            grant_type: "authorization_code".to_string(),
            correlation_uid: None,
            scopes: vec!["read".to_string()],
            revoked_at: None,
        };

        let issued = IssuedToken::from_token(&token, now);
        assert_eq!(issued.access_token, "tok");
        assert_eq!(issued.expires_in, 600);
        assert!(issued.scope.is_empty());
        assert!(issued.refresh_token.is_none());

        let json = serde_json::to_value(&issued).unwrap();
        assert!(json.get("refresh_token").is_none());

        let issued = issued.with_refresh_token("ref");
        let json = serde_json::to_value(&issued).unwrap();
        assert_eq!(json["refresh_token"], "ref");
    }
}
