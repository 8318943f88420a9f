//! Grant engine error types.
//!
//! Two classes of error exist and they never mix:
//!
//! - [`UserError`] - validation failures (malformed, expired or mismatched
//!   credentials). Returned as an accumulated list from `validate` and meant
//!   for direct translation to the end user. Never raised as `Err`.
//! - [`AuthError`] - internal errors: caller contract violations (malformed
//!   `Authorization` header, unknown action), unfinished extension points and
//!   storage failures.

use std::fmt;

use serde::{Serialize, Serializer};

/// Failures while reading credentials out of a request.
///
/// Strategies fold this (and only this) error into the matching user error
/// during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    /// The `Authorization` header is missing or cannot be decoded.
    #[error("Malformed or missing Authorization header")]
    BadAuthHeader,

    /// The `Authorization` header uses a scheme other than `Bearer`.
    #[error("Authorization header must use the Bearer scheme")]
    BadAuthMethodExpectBearer,
}

impl CredentialError {
    /// Returns the stable key used to look up a localized message.
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Self::BadAuthHeader => "bad_auth_header",
            Self::BadAuthMethodExpectBearer => "bad_auth_method_expect_bearer",
        }
    }
}

/// Internal errors raised by the grant engine.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Credentials could not be extracted from the request.
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    /// The request carries an action the engine does not know.
    #[error("Invalid action: {action}")]
    InvalidAction {
        /// The raw action value.
        action: String,
    },

    /// The grant type is unknown, or does not implement the requested operation.
    #[error("Unsupported grant type: {grant_type}")]
    UnsupportedGrantType {
        /// The grant type name.
        grant_type: String,
    },

    /// A mutation was attempted against a grant that does not exist.
    ///
    /// Validation should have caught this first.
    #[error("Invalid grant: {message}")]
    InvalidGrant {
        /// Description of why the grant is invalid.
        message: String,
    },

    /// An error occurred while storing or retrieving grant data.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The engine configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `InvalidAction` error.
    #[must_use]
    pub fn invalid_action(action: impl Into<String>) -> Self {
        Self::InvalidAction {
            action: action.into(),
        }
    }

    /// Creates a new `UnsupportedGrantType` error.
    #[must_use]
    pub fn unsupported_grant_type(grant_type: impl Into<String>) -> Self {
        Self::UnsupportedGrantType {
            grant_type: grant_type.into(),
        }
    }

    /// Creates a new `InvalidGrant` error.
    #[must_use]
    pub fn invalid_grant(message: impl Into<String>) -> Self {
        Self::InvalidGrant {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if the caller sent something the engine cannot process.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Credential(_) | Self::UnsupportedGrantType { .. } | Self::InvalidGrant { .. }
        )
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Credential(_) => ErrorCategory::Authentication,
            Self::InvalidAction { .. } => ErrorCategory::Internal,
            Self::UnsupportedGrantType { .. } => ErrorCategory::Validation,
            Self::InvalidGrant { .. } => ErrorCategory::Validation,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the OAuth 2.0 error code for this error.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::Credential(_) => "invalid_request",
            Self::InvalidAction { .. } => "server_error",
            Self::UnsupportedGrantType { .. } => "unsupported_grant_type",
            Self::InvalidGrant { .. } => "invalid_grant",
            Self::Storage { .. } => "server_error",
            Self::Configuration { .. } => "server_error",
            Self::Internal { .. } => "server_error",
        }
    }
}

/// Categories of engine errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Credential extraction errors.
    Authentication,
    /// Request validation errors.
    Validation,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Configuration errors.
    Configuration,
    /// Internal server errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

// =============================================================================
// User Errors
// =============================================================================

/// User-facing validation failures.
///
/// Several distinct causes deliberately collapse into one variant (a bad
/// header, a wrong client and a wrong secret all become
/// [`UserError::AuthCodeInvalidClientOrSecret`]) so callers cannot tell
/// which part of a credential was wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum UserError {
    /// No authorization code matches the presented value.
    #[error("The authorization code is invalid")]
    AuthCodeInvalid,

    /// The authorization code exists but has expired.
    #[error("The authorization code has expired")]
    AuthCodeExpired,

    /// The client id or secret does not match the code's client.
    #[error("Invalid client id or secret")]
    AuthCodeInvalidClientOrSecret,

    /// The PKCE code verifier does not satisfy the stored challenge.
    #[error("The code verifier does not match the code challenge")]
    AuthCodeInvalidGrantError,

    /// The authorize request names no client, or an unknown one.
    #[error("The client is missing or unknown")]
    AuthCodeInvalidClient,

    /// Neither the request nor the client provides a redirect URL.
    #[error("A redirect URL is required")]
    AuthCodeRedirectUrlRequired,

    /// The authorization code has been redeemed the maximum number of times.
    #[error("The authorization code has already been redeemed")]
    AuthCodeRedeemLimitReached,

    /// The refresh token is unknown, revoked, expired or not a refresh token.
    #[error("The refresh token is invalid")]
    RefreshInvalidToken,

    /// The bearer credential is unknown or revoked.
    #[error("The bearer token is invalid")]
    BearerTokenInvalid,

    /// The bearer credential is a refresh token.
    #[error("A refresh token cannot be used as a bearer credential")]
    BearerTokenIsRefresh,

    /// The token named in the request does not exist.
    #[error("The token is invalid")]
    TokenInvalid,

    /// The `Authorization` header could not be read.
    #[error("Malformed or missing Authorization header")]
    BadAuthHeader,
}

impl UserError {
    /// Returns the stable key used to look up a localized message.
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Self::AuthCodeInvalid => "auth_code_invalid",
            Self::AuthCodeExpired => "auth_code_expired",
            Self::AuthCodeInvalidClientOrSecret => "auth_code_invalid_client_or_secret",
            Self::AuthCodeInvalidGrantError => "auth_code_invalid_grant_error",
            Self::AuthCodeInvalidClient => "auth_code_invalid_client",
            Self::AuthCodeRedirectUrlRequired => "auth_code_redirect_url_required",
            Self::AuthCodeRedeemLimitReached => "auth_code_redeem_limit_reached",
            Self::RefreshInvalidToken => "refresh_invalid_token",
            Self::BearerTokenInvalid => "bearer_token_invalid",
            Self::BearerTokenIsRefresh => "bearer_token_is_refresh",
            Self::TokenInvalid => "token_invalid",
            Self::BadAuthHeader => "bad_auth_header",
        }
    }

    /// Returns the OAuth 2.0 error code for this error.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::AuthCodeInvalid
            | Self::AuthCodeExpired
            | Self::AuthCodeInvalidGrantError
            | Self::AuthCodeRedeemLimitReached
            | Self::RefreshInvalidToken => "invalid_grant",
            Self::AuthCodeInvalidClientOrSecret | Self::AuthCodeInvalidClient => "invalid_client",
            Self::AuthCodeRedirectUrlRequired | Self::BadAuthHeader => "invalid_request",
            Self::BearerTokenInvalid | Self::BearerTokenIsRefresh | Self::TokenInvalid => {
                "invalid_token"
            }
        }
    }
}

impl Serialize for UserError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::invalid_action("patch");
        assert_eq!(err.to_string(), "Invalid action: patch");

        let err = AuthError::from(CredentialError::BadAuthHeader);
        assert_eq!(
            err.to_string(),
            "Credential error: Malformed or missing Authorization header"
        );

        let err = AuthError::unsupported_grant_type("password");
        assert_eq!(err.to_string(), "Unsupported grant type: password");
    }

    #[test]
    fn test_error_predicates() {
        let err = AuthError::from(CredentialError::BadAuthMethodExpectBearer);
        assert!(err.is_client_error());
        assert!(!err.is_server_error());

        let err = AuthError::invalid_action("patch");
        assert!(err.is_server_error());

        let err = AuthError::storage("database down");
        assert!(!err.is_client_error());
        assert!(err.is_server_error());
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            AuthError::from(CredentialError::BadAuthHeader).category(),
            ErrorCategory::Authentication
        );
        assert_eq!(
            AuthError::storage("test").category(),
            ErrorCategory::Infrastructure
        );
        assert_eq!(
            AuthError::configuration("test").category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            AuthError::invalid_action("test").category(),
            ErrorCategory::Internal
        );
    }

    #[test]
    fn test_oauth_error_code() {
        assert_eq!(
            AuthError::invalid_grant("test").oauth_error_code(),
            "invalid_grant"
        );
        assert_eq!(
            AuthError::unsupported_grant_type("test").oauth_error_code(),
            "unsupported_grant_type"
        );
        assert_eq!(
            UserError::AuthCodeInvalidClientOrSecret.oauth_error_code(),
            "invalid_client"
        );
        assert_eq!(
            UserError::AuthCodeInvalidGrantError.oauth_error_code(),
            "invalid_grant"
        );
        assert_eq!(UserError::TokenInvalid.oauth_error_code(), "invalid_token");
    }

    #[test]
    fn test_user_error_serializes_as_key() {
        let json = serde_json::to_string(&vec![
            UserError::AuthCodeExpired,
            UserError::AuthCodeInvalidClientOrSecret,
        ])
        .unwrap();
        assert_eq!(
            json,
            r#"["auth_code_expired","auth_code_invalid_client_or_secret"]"#
        );
    }

    #[test]
    fn test_credential_error_keys() {
        assert_eq!(CredentialError::BadAuthHeader.key(), "bad_auth_header");
        assert_eq!(
            CredentialError::BadAuthMethodExpectBearer.key(),
            "bad_auth_method_expect_bearer"
        );
    }

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::Authentication.to_string(), "authentication");
        assert_eq!(ErrorCategory::Infrastructure.to_string(), "infrastructure");
    }
}
