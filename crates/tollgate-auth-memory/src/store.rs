use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use time::OffsetDateTime;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use tollgate_auth::storage::{CodeLock, GrantStore};
use tollgate_auth::types::{AccessToken, AuthorizationCode, Client};
use tollgate_auth::{AuthError, AuthResult};

/// In-memory grant store backed by `DashMap`.
///
/// This store provides:
/// - Concurrent lookups of clients, codes and tokens
/// - Per-code async locks serializing issue and refresh
/// - Lazy expiry: nothing is removed until `delete_expired_tokens` runs
///
/// Data lives for the lifetime of the store. Suitable for tests and
/// single-process deployments.
#[derive(Debug, Default)]
pub struct InMemoryGrantStore {
    /// uid -> client
    clients: DashMap<String, Client>,
    /// code id -> code
    codes: DashMap<Uuid, AuthorizationCode>,
    /// code value -> code id
    code_index: DashMap<String, Uuid>,
    /// token value -> token
    tokens: DashMap<String, AccessToken>,
    /// code id -> issuance lock, present only while held or awaited
    locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

/// Holds a code's issuance mutex and drops the map entry once nobody else
/// is waiting on it.
struct PrunedLockGuard {
    code_id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl Drop for PrunedLockGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Waiters hold a clone of the Arc, so a count of one means the map
        // is the only owner left.
        self.locks
            .remove_if(&self.code_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

impl InMemoryGrantStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a client, replacing one with the same uid.
    pub fn insert_client(&self, client: Client) {
        self.clients.insert(client.uid.clone(), client);
    }

    /// Stores an authorization code, replacing one with the same value.
    pub fn insert_authorization_code(&self, code: AuthorizationCode) {
        if let Some((_, previous)) = self.code_index.remove(&code.code) {
            self.codes.remove(&previous);
        }
        self.code_index.insert(code.code.clone(), code.id);
        self.codes.insert(code.id, code);
    }

    /// All tokens minted for a code, in no particular order.
    #[must_use]
    pub fn tokens_for_code(&self, code_id: Uuid) -> Vec<AccessToken> {
        self.tokens
            .iter()
            .filter(|entry| entry.authorization_code_id == code_id)
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Number of stored tokens, including expired and revoked ones.
    #[must_use]
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    fn live_token(&self, code_id: Uuid, refresh: bool, now: OffsetDateTime) -> Option<AccessToken> {
        self.tokens
            .iter()
            .filter(|entry| {
                entry.authorization_code_id == code_id
                    && entry.refresh == refresh
                    && entry.is_live(now)
            })
            .max_by_key(|entry| entry.expires_at)
            .map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl GrantStore for InMemoryGrantStore {
    async fn find_client_by_uid(&self, uid: &str) -> AuthResult<Option<Client>> {
        Ok(self.clients.get(uid).map(|c| c.value().clone()))
    }

    async fn find_authorization_code(&self, code: &str) -> AuthResult<Option<AuthorizationCode>> {
        let Some(id) = self.code_index.get(code).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.codes.get(&id).map(|c| c.value().clone()))
    }

    async fn find_authorization_code_by_token(
        &self,
        token: &str,
    ) -> AuthResult<Option<AuthorizationCode>> {
        let Some(code_id) = self.tokens.get(token).map(|t| t.authorization_code_id) else {
            return Ok(None);
        };
        Ok(self.codes.get(&code_id).map(|c| c.value().clone()))
    }

    async fn find_latest_authorization_code_for_client(
        &self,
        client_uid: &str,
        now: OffsetDateTime,
    ) -> AuthResult<Option<AuthorizationCode>> {
        Ok(self
            .codes
            .iter()
            .filter(|entry| entry.client_uid == client_uid && !entry.is_expired(now))
            .max_by_key(|entry| entry.expires_at)
            .map(|entry| entry.value().clone()))
    }

    async fn find_access_token(&self, token: &str) -> AuthResult<Option<AccessToken>> {
        Ok(self.tokens.get(token).map(|t| t.value().clone()))
    }

    async fn delete_expired_tokens(&self, code_id: Uuid, now: OffsetDateTime) -> AuthResult<u64> {
        let expired: Vec<String> = self
            .tokens
            .iter()
            .filter(|entry| entry.authorization_code_id == code_id && entry.is_expired(now))
            .map(|entry| entry.key().clone())
            .collect();

        let mut deleted = 0;
        for token in expired {
            if self.tokens.remove(&token).is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn live_access_token(
        &self,
        code_id: Uuid,
        now: OffsetDateTime,
    ) -> AuthResult<Option<AccessToken>> {
        Ok(self.live_token(code_id, false, now))
    }

    async fn live_refresh_token(
        &self,
        code_id: Uuid,
        now: OffsetDateTime,
    ) -> AuthResult<Option<AccessToken>> {
        Ok(self.live_token(code_id, true, now))
    }

    async fn create_access_token(&self, token: &AccessToken) -> AuthResult<()> {
        if !self.codes.contains_key(&token.authorization_code_id) {
            return Err(AuthError::storage(format!(
                "authorization code {} does not exist",
                token.authorization_code_id
            )));
        }

        match self.tokens.entry(token.token.clone()) {
            Entry::Occupied(_) => Err(AuthError::storage("token value already exists")),
            Entry::Vacant(slot) => {
                slot.insert(token.clone());
                Ok(())
            }
        }
    }

    async fn revoke_access_token(&self, token: &str, now: OffsetDateTime) -> AuthResult<bool> {
        match self.tokens.get_mut(token) {
            Some(mut stored) => {
                if stored.revoked_at.is_none() {
                    stored.revoked_at = Some(now);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_redeem_attempt(&self, code_id: Uuid) -> AuthResult<u32> {
        let mut code = self.codes.get_mut(&code_id).ok_or_else(|| {
            AuthError::storage(format!("authorization code {code_id} does not exist"))
        })?;
        code.redeem_attempts = code.redeem_attempts.saturating_add(1);
        Ok(code.redeem_attempts)
    }

    async fn lock_authorization_code(&self, code_id: Uuid) -> AuthResult<CodeLock> {
        let mutex = self.locks.entry(code_id).or_default().clone();
        let guard = mutex.lock_owned().await;
        tracing::trace!(%code_id, "Acquired authorization code lock");
        Ok(CodeLock::new(PrunedLockGuard {
            code_id,
            guard: Some(guard),
            locks: Arc::clone(&self.locks),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2024-01-01 12:00 UTC);

    fn code(value: &str, client_uid: &str, expires_at: OffsetDateTime) -> AuthorizationCode {
        AuthorizationCode::new(value, client_uid, expires_at)
    }

    fn token(
        code_id: Uuid,
        value: &str,
        refresh: bool,
        expires_at: OffsetDateTime,
    ) -> AccessToken {
        AccessToken {
            id: Uuid::new_v4(),
            authorization_code_id: code_id,
            token: value.to_string(),
            expires_at,
            refresh,
            grant_type: "authorization_code".to_string(),
            correlation_uid: None,
            scopes: Vec::new(),
            revoked_at: None,
        }
    }

    #[tokio::test]
    async fn test_client_and_code_lookup() {
        let store = InMemoryGrantStore::new();
        store.insert_client(Client::new("app", "secret", "https://app.example.com/cb"));
        store.insert_authorization_code(code("abc", "app", NOW + time::Duration::minutes(10)));

        let client = store.find_client_by_uid("app").await.unwrap().unwrap();
        assert_eq!(client.secret, "secret");
        assert!(store.find_client_by_uid("other").await.unwrap().is_none());

        let found = store.find_authorization_code("abc").await.unwrap().unwrap();
        assert_eq!(found.client_uid, "app");
        assert!(store.find_authorization_code("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reinserting_code_value_replaces_record() {
        let store = InMemoryGrantStore::new();
        let first = code("abc", "app", NOW);
        let second = code("abc", "app", NOW + time::Duration::minutes(5));
        let second_id = second.id;

        store.insert_authorization_code(first);
        store.insert_authorization_code(second);

        let found = store.find_authorization_code("abc").await.unwrap().unwrap();
        assert_eq!(found.id, second_id);
    }

    #[tokio::test]
    async fn test_latest_live_code_for_client() {
        let store = InMemoryGrantStore::new();
        store.insert_authorization_code(code("old", "app", NOW + time::Duration::minutes(1)));
        store.insert_authorization_code(code("new", "app", NOW + time::Duration::minutes(9)));
        store.insert_authorization_code(code("dead", "app", NOW - time::Duration::minutes(1)));
        store.insert_authorization_code(code("theirs", "other", NOW + time::Duration::hours(1)));

        let latest = store
            .find_latest_authorization_code_for_client("app", NOW)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.code, "new");

        assert!(
            store
                .find_latest_authorization_code_for_client("nobody", NOW)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_create_and_find_tokens() {
        let store = InMemoryGrantStore::new();
        let auth_code = code("abc", "app", NOW + time::Duration::minutes(10));
        let code_id = auth_code.id;
        store.insert_authorization_code(auth_code);

        let access = token(code_id, "access-1", false, NOW + time::Duration::hours(1));
        store.create_access_token(&access).await.unwrap();

        assert_eq!(store.find_access_token("access-1").await.unwrap(), Some(access.clone()));
        let owner = store
            .find_authorization_code_by_token("access-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(owner.id, code_id);

        // Duplicate value
        assert!(matches!(
            store.create_access_token(&access).await,
            Err(AuthError::Storage { .. })
        ));

        // Unknown parent
        let orphan = token(Uuid::new_v4(), "orphan", false, NOW);
        tokio_test::assert_err!(store.create_access_token(&orphan).await);
    }

    #[tokio::test]
    async fn test_live_tokens_and_purge() {
        let store = InMemoryGrantStore::new();
        let auth_code = code("abc", "app", NOW + time::Duration::minutes(10));
        let code_id = auth_code.id;
        store.insert_authorization_code(auth_code);

        let expired = token(code_id, "expired", false, NOW - time::Duration::seconds(1));
        let live = token(code_id, "live", false, NOW + time::Duration::minutes(30));
        let refresh = token(code_id, "refresh", true, NOW + time::Duration::minutes(20));
        for t in [&expired, &live, &refresh] {
            store.create_access_token(t).await.unwrap();
        }

        assert_eq!(
            store.live_access_token(code_id, NOW).await.unwrap().map(|t| t.token),
            Some("live".to_string())
        );
        assert_eq!(
            store.live_refresh_token(code_id, NOW).await.unwrap().map(|t| t.token),
            Some("refresh".to_string())
        );

        assert_eq!(store.delete_expired_tokens(code_id, NOW).await.unwrap(), 1);
        assert!(store.find_access_token("expired").await.unwrap().is_none());
        assert_eq!(store.delete_expired_tokens(code_id, NOW).await.unwrap(), 0);
        assert_eq!(store.token_count(), 2);
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent_and_keeps_first_time() {
        let store = InMemoryGrantStore::new();
        let auth_code = code("abc", "app", NOW + time::Duration::minutes(10));
        let code_id = auth_code.id;
        store.insert_authorization_code(auth_code);
        store
            .create_access_token(&token(code_id, "tok", false, NOW + time::Duration::hours(1)))
            .await
            .unwrap();

        assert!(store.revoke_access_token("tok", NOW).await.unwrap());
        assert!(
            store
                .revoke_access_token("tok", NOW + time::Duration::minutes(1))
                .await
                .unwrap()
        );
        let stored = store.find_access_token("tok").await.unwrap().unwrap();
        assert_eq!(stored.revoked_at, Some(NOW));
        assert!(store.live_access_token(code_id, NOW).await.unwrap().is_none());

        assert!(!store.revoke_access_token("missing", NOW).await.unwrap());
    }

    #[tokio::test]
    async fn test_is_valid_token() {
        let store = InMemoryGrantStore::new();
        let auth_code = code("abc", "app", NOW + time::Duration::minutes(10));
        let code_id = auth_code.id;
        store.insert_authorization_code(auth_code);
        store
            .create_access_token(&token(code_id, "access", false, NOW + time::Duration::hours(1)))
            .await
            .unwrap();
        store
            .create_access_token(&token(code_id, "refresh", true, NOW + time::Duration::hours(1)))
            .await
            .unwrap();

        assert!(store.is_valid_token("access", false, NOW).await.unwrap());
        assert!(!store.is_valid_token("access", true, NOW).await.unwrap());
        assert!(store.is_valid_token("refresh", true, NOW).await.unwrap());
        assert!(!store.is_valid_token("missing", false, NOW).await.unwrap());
        assert!(
            !store
                .is_valid_token("refresh", true, NOW + time::Duration::hours(2))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_record_redeem_attempt() {
        let store = InMemoryGrantStore::new();
        let auth_code = code("abc", "app", NOW);
        let code_id = auth_code.id;
        store.insert_authorization_code(auth_code);

        assert_eq!(store.record_redeem_attempt(code_id).await.unwrap(), 1);
        assert_eq!(store.record_redeem_attempt(code_id).await.unwrap(), 2);
        assert_eq!(
            store.find_authorization_code("abc").await.unwrap().unwrap().redeem_attempts,
            2
        );
        tokio_test::assert_err!(store.record_redeem_attempt(Uuid::new_v4()).await);
    }

    #[tokio::test]
    async fn test_code_lock_serializes_holders() {
        let store = Arc::new(InMemoryGrantStore::new());
        let code_id = Uuid::new_v4();

        let first = store.lock_authorization_code(code_id).await.unwrap();

        let contender = {
            let store = store.clone();
            tokio::spawn(async move { store.lock_authorization_code(code_id).await.map(|_| ()) })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(first);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        // Locks on other codes are independent
        let _a = store.lock_authorization_code(code_id).await.unwrap();
        let _b = store.lock_authorization_code(Uuid::new_v4()).await.unwrap();
    }

    #[tokio::test]
    async fn test_released_locks_are_pruned() {
        let store = Arc::new(InMemoryGrantStore::new());
        let code_id = Uuid::new_v4();

        let first = store.lock_authorization_code(code_id).await.unwrap();
        assert_eq!(store.locks.len(), 1);
        drop(first);
        assert!(store.locks.is_empty());

        // An entry with a waiter survives the holder's release
        let held = store.lock_authorization_code(code_id).await.unwrap();
        let waiter = {
            let store = store.clone();
            tokio::spawn(async move {
                let _lock = store.lock_authorization_code(code_id).await.unwrap();
                tokio::time::sleep(Duration::from_millis(20)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(held);
        assert_eq!(store.locks.len(), 1);

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(store.locks.is_empty());

        for _ in 0..32 {
            drop(store.lock_authorization_code(Uuid::new_v4()).await.unwrap());
        }
        assert!(store.locks.is_empty());
    }
}
