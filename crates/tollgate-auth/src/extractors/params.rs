//! Typed view over an inbound grant request.
//!
//! [`AuthParams`] wraps the raw request parameters and headers and exposes
//! the values the grant strategies need. Plain parameters are returned as
//! `Option`: deciding whether a value is required is the strategy's job.
//! Only header parsing can fail, and it fails with a [`CredentialError`].

use std::collections::HashMap;

use axum::http::{HeaderMap, HeaderValue, header::AUTHORIZATION};
use base64::{Engine, engine::general_purpose::STANDARD};

use crate::AuthResult;
use crate::error::CredentialError;
use crate::oauth::GrantAction;

/// Which endpoint a request was addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// The token endpoint (issue, refresh, revoke, introspect).
    Token,
    /// The authorize endpoint (code redirect).
    Authorize,
}

/// Request parameters and headers of a grant request.
#[derive(Debug, Clone, Default)]
pub struct AuthParams {
    params: HashMap<String, String>,
    headers: HeaderMap,
}

impl AuthParams {
    /// Creates a view over already-decoded parameters and raw headers.
    #[must_use]
    pub fn new(params: HashMap<String, String>, headers: HeaderMap) -> Self {
        Self { params, headers }
    }

    /// Adds or replaces a request parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Sets the `Authorization` header.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::BadAuthHeader` if `value` is not a valid
    /// header value.
    pub fn with_authorization(mut self, value: &str) -> Result<Self, CredentialError> {
        let value = HeaderValue::from_str(value).map_err(|_| CredentialError::BadAuthHeader)?;
        self.headers.insert(AUTHORIZATION, value);
        Ok(self)
    }

    /// Returns the raw parameter map.
    #[must_use]
    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Returns the raw `Authorization` header, if present.
    ///
    /// A header that is not valid visible ASCII counts as malformed.
    fn authorization(&self) -> Result<Option<&str>, CredentialError> {
        match self.headers.get(AUTHORIZATION) {
            None => Ok(None),
            Some(value) => value
                .to_str()
                .map(Some)
                .map_err(|_| CredentialError::BadAuthHeader),
        }
    }

    // -------------------------------------------------------------------------
    // Plain parameters
    // -------------------------------------------------------------------------

    /// The authorization code being redeemed.
    #[must_use]
    pub fn authorization_code(&self) -> Option<&str> {
        self.param("authorization_code")
    }

    /// Re-targets the request at another authorization code.
    pub fn set_authorization_code(&mut self, code: impl Into<String>) {
        self.params
            .insert("authorization_code".to_string(), code.into());
    }

    /// The `grant_type` parameter.
    #[must_use]
    pub fn grant_type(&self) -> Option<&str> {
        self.param("grant_type")
    }

    /// The refresh token being exchanged.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.param("refresh_token")
    }

    /// Returns `true` if the `refresh_token` field was sent at all, even empty.
    #[must_use]
    pub fn refresh_token_key_exists(&self) -> bool {
        self.params.contains_key("refresh_token")
    }

    /// The `redirect_url` parameter, percent-decoded.
    ///
    /// A value that does not decode to UTF-8 is returned as sent.
    #[must_use]
    pub fn redirect_url(&self) -> Option<String> {
        self.param("redirect_url").map(|raw| {
            urlencoding::decode(raw)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| raw.to_string())
        })
    }

    /// The resource-owner `username` and `password` parameters.
    #[must_use]
    pub fn username_password(&self) -> (Option<&str>, Option<&str>) {
        (self.param("username"), self.param("password"))
    }

    /// Sets the resource-owner username.
    pub fn set_username(&mut self, username: impl Into<String>) {
        self.params.insert("username".to_string(), username.into());
    }

    /// Sets the resource-owner password.
    pub fn set_password(&mut self, password: impl Into<String>) {
        self.params.insert("password".to_string(), password.into());
    }

    /// The PKCE `code_verifier` parameter.
    #[must_use]
    pub fn code_verifier(&self) -> Option<&str> {
        self.param("code_verifier")
    }

    /// The high-level intent of the request.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidAction` when the action is missing or
    /// unknown; the transport layer is expected to always set it.
    pub fn action(&self) -> AuthResult<GrantAction> {
        let raw = self.param("action").unwrap_or_default();
        raw.parse()
    }

    /// The endpoint the request was addressed to, from the `controller` parameter.
    #[must_use]
    pub fn endpoint(&self) -> Option<Endpoint> {
        match self.param("controller")? {
            "token" | "access_tokens" => Some(Endpoint::Token),
            "authorize" => Some(Endpoint::Authorize),
            _ => None,
        }
    }

    // -------------------------------------------------------------------------
    // Credentials
    // -------------------------------------------------------------------------

    /// The client id.
    ///
    /// Taken from the `Authorization` header when one is present, otherwise
    /// from the `client_id` parameter.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::BadAuthHeader` if the header is present but
    /// is not a non-empty `id:secret` pair.
    pub fn client_id(&self) -> Result<Option<String>, CredentialError> {
        match self.authorization()? {
            Some(header) => parse_client_credentials(header).map(|(id, _)| Some(id)),
            None => Ok(self.param("client_id").map(str::to_string)),
        }
    }

    /// The client secret. Only ever read from the `Authorization` header.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::BadAuthHeader` if the header is present but
    /// malformed.
    pub fn secret(&self) -> Result<Option<String>, CredentialError> {
        match self.authorization()? {
            Some(header) => parse_client_credentials(header).map(|(_, secret)| Some(secret)),
            None => Ok(None),
        }
    }

    /// The bearer credential from the `Authorization` header.
    ///
    /// # Errors
    ///
    /// - `CredentialError::BadAuthHeader` if the header is missing or is not
    ///   exactly two space-separated parts
    /// - `CredentialError::BadAuthMethodExpectBearer` if the scheme is not
    ///   `Bearer` (case-sensitive)
    pub fn access_token(&self) -> Result<String, CredentialError> {
        let header = self.authorization()?.ok_or(CredentialError::BadAuthHeader)?;
        parse_bearer(header)
    }

    /// The token a revoke or introspect request is about.
    ///
    /// The `token` parameter when sent, otherwise the bearer credential
    /// itself.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`AuthParams::access_token`] when falling back
    /// to the header.
    pub fn target_token(&self) -> Result<String, CredentialError> {
        match self.param("token") {
            Some(token) => Ok(token.to_string()),
            None => self.access_token(),
        }
    }
}

/// Parses a client credential header.
///
/// Accepts `Basic <base64(id:secret)>` as well as a bare `id:secret` value.
/// The secret may itself contain colons.
fn parse_client_credentials(header: &str) -> Result<(String, String), CredentialError> {
    let header = header.trim();

    let credentials = match header.strip_prefix("Basic ") {
        Some(encoded) => {
            let decoded = STANDARD
                .decode(encoded.trim())
                .map_err(|_| CredentialError::BadAuthHeader)?;
            String::from_utf8(decoded).map_err(|_| CredentialError::BadAuthHeader)?
        }
        None => header.to_string(),
    };

    match credentials.split_once(':') {
        Some((id, secret)) if !id.is_empty() && !secret.is_empty() => {
            Ok((id.to_string(), secret.to_string()))
        }
        _ => {
            tracing::debug!("Rejected client credential header without an id:secret pair");
            Err(CredentialError::BadAuthHeader)
        }
    }
}

/// Parses a `Bearer <token>` header.
fn parse_bearer(header: &str) -> Result<String, CredentialError> {
    let parts: Vec<&str> = header.split(' ').collect();
    let [scheme, token] = parts.as_slice() else {
        return Err(CredentialError::BadAuthHeader);
    };

    if *scheme != "Bearer" {
        return Err(CredentialError::BadAuthMethodExpectBearer);
    }
    if token.is_empty() {
        return Err(CredentialError::BadAuthHeader);
    }

    Ok((*token).to_string())
}
