//! In-memory storage backend for tollgate-auth.
//!
//! This crate provides an in-memory implementation of the `GrantStore`
//! trait from `tollgate-auth`, using `DashMap` for concurrent access and a
//! per-code `tokio` mutex to serialize issuance.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tollgate_auth::{GrantConfig, GrantContext, GrantRegistry, GrantService};
//! use tollgate_auth_memory::InMemoryGrantStore;
//!
//! let store = Arc::new(InMemoryGrantStore::new());
//! store.insert_client(Client::new("app", "secret", "https://app.example.com/cb"));
//!
//! let context = GrantContext::new(store.clone(), GrantConfig::default());
//! let service = GrantService::new(GrantRegistry::with_authorization_code(context));
//! ```

mod store;

pub use store::InMemoryGrantStore;

// Re-export the GrantStore trait for convenience
pub use tollgate_auth::storage::GrantStore;

/// Type alias for a shareable grant store.
pub type DynGrantStore = std::sync::Arc<dyn GrantStore>;

/// Creates a new, empty in-memory grant store.
#[must_use]
pub fn create_grant_store() -> std::sync::Arc<InMemoryGrantStore> {
    std::sync::Arc::new(InMemoryGrantStore::new())
}
