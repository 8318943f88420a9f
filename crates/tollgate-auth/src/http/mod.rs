//! HTTP response formatting.
//!
//! Turns grant outcomes into axum responses:
//!
//! - Issued tokens: `200` with an [`AccessTokenResponse`] body
//! - Authorize: `302` redirect to `<redirect_url>?code=<code>`
//! - Introspection: `200` with the introspection body
//! - Revocation: empty `200`
//! - Validation failures: `400` with an [`ErrorResponse`] body

mod response;

pub use response::{AccessTokenResponse, AuthorizeResponse, ErrorResponse};
