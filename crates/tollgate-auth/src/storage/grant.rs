//! Grant storage trait.
//!
//! This module defines the persistence contract the grant engine depends on.
//! The engine owns no state between calls; everything durable lives behind
//! this trait.
//!
//! # Consistency Requirements
//!
//! - The "is there a live access token for this code" check and the
//!   following insert must not race. Implementations provide
//!   [`GrantStore::lock_authorization_code`], which the engine holds for the
//!   whole issue/refresh sequence of one code.
//! - Revocation must be visible to every later read (read-your-writes).
//! - Expiry is never swept in the background; callers pass `now` and
//!   implementations compare timestamps.

use std::fmt;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::types::{AccessToken, AuthorizationCode, Client};

/// Guard serializing token issuance for one authorization code.
///
/// The lock is released when the guard is dropped.
pub struct CodeLock {
    _guard: Box<dyn Send + Sync>,
}

impl CodeLock {
    /// Wraps a backend-specific guard (a mutex guard, a transaction handle).
    #[must_use]
    pub fn new<G>(guard: G) -> Self
    where
        G: Send + Sync + 'static,
    {
        Self {
            _guard: Box::new(guard),
        }
    }

    /// A guard that holds nothing, for backends that serialize by other means
    /// (unique constraints with upsert-or-retry).
    #[must_use]
    pub fn noop() -> Self {
        Self::new(())
    }
}

impl fmt::Debug for CodeLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeLock").finish_non_exhaustive()
    }
}

/// Storage operations required by the grant engine.
///
/// # Example Implementation
///
/// ```ignore
/// use tollgate_auth::storage::GrantStore;
///
/// struct PostgresGrantStore {
///     pool: PgPool,
/// }
///
/// #[async_trait::async_trait]
/// impl GrantStore for PostgresGrantStore {
///     async fn find_client_by_uid(&self, uid: &str) -> AuthResult<Option<Client>> {
///         // SELECT ... FROM clients WHERE uid = $1
///     }
///     // ... other methods
/// }
/// ```
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Finds a client by its public `uid`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_client_by_uid(&self, uid: &str) -> AuthResult<Option<Client>>;

    /// Finds an authorization code by its code value.
    ///
    /// Returns codes regardless of expiry; callers check `is_expired()`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_authorization_code(&self, code: &str) -> AuthResult<Option<AuthorizationCode>>;

    /// Finds the authorization code that owns the given access or refresh
    /// token value.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_authorization_code_by_token(
        &self,
        token: &str,
    ) -> AuthResult<Option<AuthorizationCode>>;

    /// Finds the most recently issued unexpired authorization code of a client.
    ///
    /// Used by the authorize redirect.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_latest_authorization_code_for_client(
        &self,
        client_uid: &str,
        now: OffsetDateTime,
    ) -> AuthResult<Option<AuthorizationCode>>;

    /// Finds an access or refresh token by its raw value.
    ///
    /// Returns tokens regardless of expiry or revocation.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_access_token(&self, token: &str) -> AuthResult<Option<AccessToken>>;

    /// Deletes the code's child tokens that expired before `now`.
    ///
    /// # Returns
    ///
    /// Returns the number of tokens deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete_expired_tokens(&self, code_id: Uuid, now: OffsetDateTime) -> AuthResult<u64>;

    /// Returns the code's live (unexpired, unrevoked) access token, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn live_access_token(
        &self,
        code_id: Uuid,
        now: OffsetDateTime,
    ) -> AuthResult<Option<AccessToken>>;

    /// Returns the code's live (unexpired, unrevoked) refresh token, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn live_refresh_token(
        &self,
        code_id: Uuid,
        now: OffsetDateTime,
    ) -> AuthResult<Option<AccessToken>>;

    /// Stores a new token under its parent authorization code.
    ///
    /// # Errors
    ///
    /// Returns an error if the token value already exists, the parent code
    /// is unknown, or the storage operation fails.
    async fn create_access_token(&self, token: &AccessToken) -> AuthResult<()>;

    /// Marks a token as revoked.
    ///
    /// Idempotent: revoking an already revoked token keeps its original
    /// revocation time and succeeds.
    ///
    /// # Returns
    ///
    /// Returns `true` if a token with that value exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn revoke_access_token(&self, token: &str, now: OffsetDateTime) -> AuthResult<bool>;

    /// Increments the redeem-attempt counter of a code.
    ///
    /// # Returns
    ///
    /// Returns the counter value after the increment.
    ///
    /// # Errors
    ///
    /// Returns an error if the code does not exist or the operation fails.
    async fn record_redeem_attempt(&self, code_id: Uuid) -> AuthResult<u32>;

    /// Acquires the per-code issuance lock.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired.
    async fn lock_authorization_code(&self, code_id: Uuid) -> AuthResult<CodeLock>;

    /// Checks that a token exists and is live, and optionally that it is a
    /// refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn is_valid_token(
        &self,
        token: &str,
        must_be_refresh: bool,
        now: OffsetDateTime,
    ) -> AuthResult<bool> {
        Ok(self
            .find_access_token(token)
            .await?
            .is_some_and(|t| t.is_live(now) && (!must_be_refresh || t.refresh)))
    }
}
