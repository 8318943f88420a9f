//! OAuth 2.0 grant engine.
//!
//! - [`grant`] - The [`Grant`] strategy interface and shared [`GrantContext`]
//! - [`authorization_code`] - The authorization code grant
//! - [`pkce`] - PKCE challenge verification
//! - [`registry`] - Grant type lookup by name
//! - [`service`] - End-to-end request handling
//!
//! # Example
//!
//! ```ignore
//! use tollgate_auth::oauth::{GrantContext, GrantRegistry, GrantService};
//!
//! let context = GrantContext::new(store, GrantConfig::default());
//! let service = GrantService::new(GrantRegistry::with_authorization_code(context));
//!
//! let outcome = service.handle(&params).await?;
//! ```

pub mod authorization_code;
pub mod grant;
pub mod pkce;
pub mod registry;
pub mod service;

pub use authorization_code::{AUTHORIZATION_CODE_GRANT, AuthorizationCodeGrant};
pub use grant::{Grant, GrantAction, GrantContext, IssueOptions};
pub use pkce::{PkceChallengeMethod, PkceError};
pub use registry::{GrantRegistry, REFRESH_TOKEN_GRANT};
pub use service::{GrantOutcome, GrantService};
