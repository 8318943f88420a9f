//! OAuth 2.0 Client domain type.
//!
//! Clients are owned by client management; the grant engine only reads them.

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// A registered OAuth 2.0 application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    /// Internal record identifier.
    pub id: Uuid,

    /// Public client identifier used in OAuth flows.
    pub uid: String,

    /// Shared secret presented via the `Authorization` header.
    pub secret: String,

    /// Registered redirect URL for the authorization code flow.
    pub redirect_url: String,

    /// Whether PKCE is mandatory for this client's authorization codes.
    pub pkce: bool,
}

impl Client {
    /// Creates a client that does not require PKCE.
    #[must_use]
    pub fn new(
        uid: impl Into<String>,
        secret: impl Into<String>,
        redirect_url: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            uid: uid.into(),
            secret: secret.into(),
            redirect_url: redirect_url.into(),
            pkce: false,
        }
    }

    /// Sets whether PKCE is required.
    #[must_use]
    pub fn with_pkce(mut self, pkce: bool) -> Self {
        self.pkce = pkce;
        self
    }

    /// Checks a presented `client_id`/`secret` pair against this client.
    ///
    /// Both comparisons always run and use constant-time equality, so the
    /// outcome does not reveal which half was wrong.
    #[must_use]
    pub fn credentials_match(&self, client_id: Option<&str>, secret: Option<&str>) -> bool {
        let uid_ok = client_id
            .map(|id| bool::from(id.as_bytes().ct_eq(self.uid.as_bytes())))
            .unwrap_or(false);
        let secret_ok = secret
            .map(|s| bool::from(s.as_bytes().ct_eq(self.secret.as_bytes())))
            .unwrap_or(false);
        uid_ok & secret_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_match() {
        let client = Client::new("app", "s3cret", "https://app.example.com/cb");

        assert!(client.credentials_match(Some("app"), Some("s3cret")));
        assert!(!client.credentials_match(Some("app"), Some("wrong")));
        assert!(!client.credentials_match(Some("other"), Some("s3cret")));
        assert!(!client.credentials_match(None, Some("s3cret")));
        assert!(!client.credentials_match(Some("app"), None));
    }

    #[test]
    fn test_with_pkce() {
        let client = Client::new("app", "s3cret", "https://app.example.com/cb");
        assert!(!client.pkce);
        assert!(client.with_pkce(true).pkce);
    }

    #[test]
    fn test_serialization() {
        let client = Client::new("app", "s3cret", "https://app.example.com/cb").with_pkce(true);
        let json = serde_json::to_value(&client).unwrap();
        assert_eq!(json["uid"], "app");
        assert_eq!(json["redirectUrl"], "https://app.example.com/cb");
        assert_eq!(json["pkce"], true);
    }
}
