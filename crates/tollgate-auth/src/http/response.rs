//! Wire shapes and axum responses for grant outcomes.
//!
//! Routing is left to the embedding application; handlers build an
//! [`AuthParams`](crate::extractors::AuthParams), run the
//! [`GrantService`](crate::oauth::GrantService) and return its outcome.

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::{AuthError, UserError};
use crate::oauth::GrantOutcome;
use crate::token::IssuedToken;

/// Token endpoint response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessTokenResponse {
    /// The access token value.
    pub access_token: String,

    /// Always `"bearer"`.
    pub token_type: &'static str,

    /// Seconds until the access token expires.
    pub expires_in: i64,

    /// Granted scopes, always empty here.
    pub scope: Vec<String>,

    /// The paired refresh token, when one was issued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl From<IssuedToken> for AccessTokenResponse {
    fn from(issued: IssuedToken) -> Self {
        Self {
            access_token: issued.access_token,
            token_type: "bearer",
            expires_in: issued.expires_in,
            scope: issued.scope,
            refresh_token: issued.refresh_token,
        }
    }
}

/// Authorize endpoint response: the redirect target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizeResponse {
    /// `<redirect_url>?code=<code>`
    pub location: String,
}

impl AuthorizeResponse {
    /// Wraps a redirect target.
    #[must_use]
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }
}

/// OAuth 2.0 error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    /// OAuth error code (`invalid_grant`, `invalid_client`, ...).
    pub error: String,

    /// Human readable description.
    pub error_description: String,

    /// Stable keys of every user error, for translation.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<UserError>,
}

impl ErrorResponse {
    /// Builds the body for a list of validation failures.
    ///
    /// The OAuth code and description come from the first error.
    #[must_use]
    pub fn from_user_errors(errors: Vec<UserError>) -> Self {
        let (error, error_description) = match errors.first() {
            Some(first) => (first.oauth_error_code().to_string(), first.to_string()),
            None => ("invalid_request".to_string(), "Invalid request".to_string()),
        };
        Self {
            error,
            error_description,
            errors,
        }
    }
}

impl From<&AuthError> for ErrorResponse {
    fn from(err: &AuthError) -> Self {
        Self {
            error: err.oauth_error_code().to_string(),
            error_description: err.to_string(),
            errors: Vec::new(),
        }
    }
}

fn auth_error_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::Credential(_) => StatusCode::UNAUTHORIZED,
        _ if err.is_client_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = auth_error_status(&self);
        if status.is_server_error() {
            tracing::error!(error = %self, category = %self.category(), "Grant request failed");
        }
        (status, Json(ErrorResponse::from(&self))).into_response()
    }
}

impl IntoResponse for GrantOutcome {
    fn into_response(self) -> Response {
        match self {
            Self::Rejected(errors) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::from_user_errors(errors)),
            )
                .into_response(),
            Self::Issued(token) => (
                StatusCode::OK,
                [(header::CACHE_CONTROL, "no-store"), (header::PRAGMA, "no-cache")],
                Json(token),
            )
                .into_response(),
            Self::Authorized(authorize) => (
                StatusCode::FOUND,
                [(header::LOCATION, authorize.location)],
            )
                .into_response(),
            Self::Introspected(introspection) => {
                (StatusCode::OK, Json(introspection)).into_response()
            }
            Self::Revoked => StatusCode::OK.into_response(),
        }
    }
}
