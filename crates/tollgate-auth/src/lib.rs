//! # tollgate-auth
//!
//! OAuth 2.0 grant engine for the authorization code flow.
//!
//! This crate provides:
//! - Token issuance, refresh, revocation and introspection
//! - PKCE verification (`PLAIN` and `S256`)
//! - A credential extractor over request parameters and headers
//! - A pluggable grant-type strategy interface and registry
//! - The storage contract a persistence engine has to fulfill
//!
//! ## Overview
//!
//! A request flows through the engine in one direction:
//!
//! ```text
//! AuthParams -> Grant::validate -> Grant::{issue | refresh | revoke | introspect} -> GrantStore -> response
//! ```
//!
//! Validation returns a list of [`UserError`]s. Any user error aborts the
//! request before the store is mutated. Internal failures are [`AuthError`]s.
//!
//! ## Modules
//!
//! - [`config`] - Token lifetimes and redemption policy
//! - [`error`] - User, credential and internal errors
//! - [`extractors`] - Typed view over request parameters and headers
//! - [`oauth`] - Grant strategies, PKCE, registry and service
//! - [`token`] - Clock, token generation and result shapes
//! - [`storage`] - Storage contract for clients, codes and tokens
//! - [`http`] - axum response formatting
//! - [`observability`] - Tracing subscriber setup

pub mod config;
pub mod error;
pub mod extractors;
pub mod http;
pub mod oauth;
pub mod observability;
pub mod storage;
pub mod token;
pub mod types;

pub use config::{ConfigError, GrantConfig};
pub use error::{AuthError, CredentialError, ErrorCategory, UserError};
pub use extractors::{AuthParams, Endpoint};
pub use http::{AccessTokenResponse, AuthorizeResponse, ErrorResponse};
pub use oauth::{
    AuthorizationCodeGrant, Grant, GrantAction, GrantContext, GrantOutcome, GrantRegistry,
    GrantService, IssueOptions, PkceChallengeMethod, PkceError,
};
pub use storage::{CodeLock, GrantStore};
pub use token::{
    Clock, GeneratedToken, Introspection, IssuedToken, ManualClock, RandomTokenGenerator,
    SystemClock, TokenGenerator, TokenKind, expires_after,
};
pub use types::{AccessToken, AuthorizationCode, Client, TokenType};

/// Type alias for grant engine results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use tollgate_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::config::{ConfigError, GrantConfig};
    pub use crate::error::{AuthError, CredentialError, UserError};
    pub use crate::extractors::AuthParams;
    pub use crate::oauth::{
        Grant, GrantContext, GrantOutcome, GrantRegistry, GrantService, IssueOptions,
    };
    pub use crate::storage::{CodeLock, GrantStore};
    pub use crate::token::{Clock, TokenGenerator};
    pub use crate::types::{AccessToken, AuthorizationCode, Client};
}
