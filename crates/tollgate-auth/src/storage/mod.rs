//! Storage traits for grant data.
//!
//! This module defines the storage interface for:
//!
//! - OAuth client registrations (read-only)
//! - Authorization codes
//! - Access and refresh tokens
//!
//! # Implementations
//!
//! Storage implementations are provided in separate crates:
//!
//! - `tollgate-auth-memory` - in-memory backend

pub mod grant;

pub use grant::{CodeLock, GrantStore};
