//! Request extraction.
//!
//! [`AuthParams`] is the typed view every grant strategy reads from. The
//! transport layer builds it from the decoded request parameters and the
//! raw header map:
//!
//! ```ignore
//! use axum::{Form, http::HeaderMap};
//! use tollgate_auth::extractors::AuthParams;
//!
//! async fn token(headers: HeaderMap, Form(form): Form<HashMap<String, String>>) -> Response {
//!     let params = AuthParams::new(form, headers).with_param("controller", "token");
//!     // ...
//! }
//! ```
//!
//! Credential accessors return `Result<_, CredentialError>`. Strategies
//! fold those errors into user errors at the validation boundary.

mod params;

pub use params::{AuthParams, Endpoint};
