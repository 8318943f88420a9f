//! Grant-type strategy interface.
//!
//! A [`Grant`] turns a validated request into token-store mutations. The
//! operations shared by every grant type (revocation, introspection and the
//! mint-or-reuse token rules) live on [`GrantContext`], so an
//! implementation only has to provide its own validation and issue paths.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::config::GrantConfig;
use crate::error::{AuthError, UserError};
use crate::extractors::AuthParams;
use crate::storage::GrantStore;
use crate::token::{
    Clock, Introspection, IssuedToken, RandomTokenGenerator, SystemClock, TokenGenerator,
    TokenKind,
};
use crate::types::{AccessToken, AuthorizationCode};

// =============================================================================
// Grant Action
// =============================================================================

/// The high-level intent of a token-endpoint request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrantAction {
    /// Issue or fetch a token.
    Show,
    /// Exchange a refresh token.
    Update,
    /// Revoke a token.
    Destroy,
}

impl GrantAction {
    /// Returns the action name as sent by the transport layer.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Show => "show",
            Self::Update => "update",
            Self::Destroy => "destroy",
        }
    }
}

impl fmt::Display for GrantAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GrantAction {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "show" => Ok(Self::Show),
            "update" => Ok(Self::Update),
            "destroy" => Ok(Self::Destroy),
            other => Err(AuthError::invalid_action(other)),
        }
    }
}

// =============================================================================
// Issue Options
// =============================================================================

/// Options for `issue` and `refresh`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueOptions {
    /// Correlation id to tag newly minted tokens with.
    ///
    /// When unset, a fresh id is generated for a new access token and the
    /// refresh token inherits the access token's id.
    pub correlation_uid: Option<String>,

    /// Lifetime override for the refresh token.
    pub refresh_ttl: Option<Duration>,

    /// Whether to also issue a refresh token.
    pub refresh_required: bool,
}

impl Default for IssueOptions {
    fn default() -> Self {
        Self {
            correlation_uid: None,
            refresh_ttl: None,
            refresh_required: true,
        }
    }
}

impl IssueOptions {
    /// Options with the defaults from `config`.
    #[must_use]
    pub fn from_config(config: &GrantConfig) -> Self {
        Self {
            refresh_required: config.refresh_required,
            ..Self::default()
        }
    }

    /// Sets the correlation id.
    #[must_use]
    pub fn with_correlation_uid(mut self, correlation_uid: impl Into<String>) -> Self {
        self.correlation_uid = Some(correlation_uid.into());
        self
    }

    /// Overrides the refresh token lifetime.
    #[must_use]
    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = Some(ttl);
        self
    }

    /// Sets whether a refresh token is issued.
    #[must_use]
    pub fn with_refresh_required(mut self, refresh_required: bool) -> Self {
        self.refresh_required = refresh_required;
        self
    }
}

// =============================================================================
// Grant Context
// =============================================================================

/// Collaborators shared by grant implementations.
#[derive(Clone)]
pub struct GrantContext {
    store: Arc<dyn GrantStore>,
    generator: Arc<dyn TokenGenerator>,
    clock: Arc<dyn Clock>,
    config: GrantConfig,
}

impl fmt::Debug for GrantContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrantContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GrantContext {
    /// Creates a context using the system clock and random token generation.
    #[must_use]
    pub fn new(store: Arc<dyn GrantStore>, config: GrantConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let generator = Arc::new(RandomTokenGenerator::new(&config, clock.clone()));
        Self {
            store,
            generator,
            clock,
            config,
        }
    }

    /// Validates `config`, then creates a context like [`GrantContext::new`].
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the configuration is invalid.
    pub fn try_new(store: Arc<dyn GrantStore>, config: GrantConfig) -> AuthResult<Self> {
        config
            .validate()
            .map_err(|e| AuthError::configuration(e.to_string()))?;
        Ok(Self::new(store, config))
    }

    /// Creates a context with explicit clock and token generator.
    #[must_use]
    pub fn with_dependencies(
        store: Arc<dyn GrantStore>,
        generator: Arc<dyn TokenGenerator>,
        clock: Arc<dyn Clock>,
        config: GrantConfig,
    ) -> Self {
        Self {
            store,
            generator,
            clock,
            config,
        }
    }

    /// The grant store.
    #[must_use]
    pub fn store(&self) -> &dyn GrantStore {
        self.store.as_ref()
    }

    /// The grant configuration.
    #[must_use]
    pub fn config(&self) -> &GrantConfig {
        &self.config
    }

    /// Current time from the injected clock.
    #[must_use]
    pub fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    /// Default options for an issue call.
    #[must_use]
    pub fn issue_options(&self) -> IssueOptions {
        IssueOptions::from_config(&self.config)
    }

    // -------------------------------------------------------------------------
    // Revocation and introspection
    // -------------------------------------------------------------------------

    /// Validates a revocation request.
    ///
    /// The bearer credential must be a known, unrevoked access token and the
    /// target token must exist.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store fails.
    pub async fn revoke_validate(&self, params: &AuthParams) -> AuthResult<Vec<UserError>> {
        let mut errors = Vec::new();

        let (bearer, target) = match (params.access_token(), params.target_token()) {
            (Ok(bearer), Ok(target)) => (bearer, target),
            _ => {
                errors.push(UserError::BadAuthHeader);
                return Ok(errors);
            }
        };

        match self.store.find_access_token(&bearer).await? {
            Some(token) if token.is_invalid() => errors.push(UserError::BearerTokenInvalid),
            Some(token) if token.refresh => errors.push(UserError::BearerTokenIsRefresh),
            Some(_) => {}
            None => errors.push(UserError::BearerTokenInvalid),
        }

        if self.store.find_access_token(&target).await?.is_none() {
            errors.push(UserError::TokenInvalid);
        }

        Ok(errors)
    }

    /// Revokes the token named by the request. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Credential` if the request names no token, or a
    /// storage error.
    pub async fn revoke(&self, params: &AuthParams) -> AuthResult<()> {
        let target = params.target_token()?;
        let found = self.store.revoke_access_token(&target, self.now()).await?;

        tracing::info!(found, "Revoked token");
        Ok(())
    }

    /// Describes the token named by the request.
    ///
    /// Unknown and revoked tokens yield `{active: false}`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Credential` if the request names no token, or a
    /// storage error.
    pub async fn introspect(&self, params: &AuthParams) -> AuthResult<Introspection> {
        let target = params.target_token()?;

        let introspection = match self.store.find_access_token(&target).await? {
            Some(token) if !token.is_invalid() => Introspection::from_token(&token, self.now()),
            _ => Introspection::inactive(),
        };

        tracing::debug!(active = introspection.active, "Introspected token");
        Ok(introspection)
    }

    // -------------------------------------------------------------------------
    // Issuance
    // -------------------------------------------------------------------------

    /// Runs the mint-or-reuse rules for a code.
    ///
    /// Holds the store's per-code lock for the whole sequence, so concurrent
    /// calls for one code observe each other's tokens.
    ///
    /// 1. When `presented_refresh` is set, re-check under the lock that it is
    ///    still a live refresh token. A replayed token loses to the request
    ///    that rotated it.
    /// 2. Purge the code's expired tokens.
    /// 3. Reuse the live access token, or mint one.
    /// 4. Unless disabled, revoke the live refresh token and mint a new one
    ///    carrying the chain's correlation id.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidGrant` if `presented_refresh` is no longer
    /// live, `AuthError::Configuration` if a token expiry is out of range, or
    /// a lock or storage error.
    pub async fn issue_tokens(
        &self,
        code: &AuthorizationCode,
        grant_type: &str,
        options: &IssueOptions,
        presented_refresh: Option<&str>,
    ) -> AuthResult<IssuedToken> {
        let _lock = self.store.lock_authorization_code(code.id).await?;
        let now = self.now();

        if let Some(refresh_token) = presented_refresh {
            if !self.store.is_valid_token(refresh_token, true, now).await? {
                tracing::warn!(
                    grant_type,
                    client_id = %code.client_uid,
                    "Refresh token was rotated or revoked before redemption"
                );
                return Err(AuthError::invalid_grant("Refresh token is no longer valid"));
            }
        }

        let purged = self.store.delete_expired_tokens(code.id, now).await?;
        if purged > 0 {
            tracing::debug!(purged, "Purged expired tokens");
        }

        let access = match self.store.live_access_token(code.id, now).await? {
            Some(token) => token,
            None => {
                let correlation_uid = options
                    .correlation_uid
                    .clone()
                    .unwrap_or_else(|| self.generator.correlation_uid());
                let token = self.build_token(
                    code,
                    grant_type,
                    TokenKind::Access,
                    None,
                    Some(correlation_uid),
                )?;
                self.store.create_access_token(&token).await?;

                tracing::info!(
                    grant_type,
                    correlation_uid = token.correlation_uid.as_deref().unwrap_or_default(),
                    "Issued access token"
                );
                token
            }
        };

        let mut issued = IssuedToken::from_token(&access, now);

        if options.refresh_required {
            let correlation_uid = options
                .correlation_uid
                .clone()
                .or_else(|| access.correlation_uid.clone());

            // Built before the old token is revoked, so a bad lifetime leaves
            // the chain untouched.
            let refresh = self.build_token(
                code,
                grant_type,
                TokenKind::Refresh,
                options.refresh_ttl,
                correlation_uid,
            )?;

            if let Some(previous) = self.store.live_refresh_token(code.id, now).await? {
                self.store.revoke_access_token(&previous.token, now).await?;
            }
            self.store.create_access_token(&refresh).await?;

            tracing::info!(
                grant_type,
                correlation_uid = refresh.correlation_uid.as_deref().unwrap_or_default(),
                "Issued refresh token"
            );
            issued = issued.with_refresh_token(refresh.token);
        }

        Ok(issued)
    }

    fn build_token(
        &self,
        code: &AuthorizationCode,
        grant_type: &str,
        kind: TokenKind,
        ttl: Option<Duration>,
        correlation_uid: Option<String>,
    ) -> AuthResult<AccessToken> {
        let generated = self.generator.generate(kind, ttl)?;
        Ok(AccessToken {
            id: Uuid::new_v4(),
            authorization_code_id: code.id,
            token: generated.value,
            expires_at: generated.expires_at,
            refresh: kind == TokenKind::Refresh,
            grant_type: grant_type.to_string(),
            correlation_uid,
            scopes: code.scopes.clone(),
            revoked_at: None,
        })
    }
}

// =============================================================================
// Grant Trait
// =============================================================================

/// A grant-type strategy.
///
/// `validate` must run before any mutating operation; mutating operations
/// assume a request that produced no user errors.
#[async_trait]
pub trait Grant: Send + Sync {
    /// The `grant_type` name tokens minted by this strategy are tagged with.
    fn type_name(&self) -> &'static str;

    /// Shared collaborators.
    fn context(&self) -> &GrantContext;

    /// Validates a request for its action.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidAction` for an unknown action, or a storage
    /// error. User-facing failures are returned in the `Ok` list.
    async fn validate(&self, params: &AuthParams) -> AuthResult<Vec<UserError>> {
        let action = params.action()?;
        let errors = match action {
            GrantAction::Show => self.token_validate(params).await?,
            GrantAction::Update => self.refresh_validate(params).await?,
            GrantAction::Destroy => self.revoke_validate(params).await?,
        };

        tracing::debug!(
            grant_type = self.type_name(),
            action = %action,
            errors = ?errors,
            "Validated grant request"
        );
        Ok(errors)
    }

    /// Validates an issue request.
    async fn token_validate(&self, params: &AuthParams) -> AuthResult<Vec<UserError>>;

    /// Validates a refresh request.
    async fn refresh_validate(&self, params: &AuthParams) -> AuthResult<Vec<UserError>>;

    /// Validates a revocation request.
    async fn revoke_validate(&self, params: &AuthParams) -> AuthResult<Vec<UserError>> {
        self.context().revoke_validate(params).await
    }

    /// Mints or reuses tokens for a validated request.
    async fn issue(&self, params: &AuthParams, options: IssueOptions) -> AuthResult<IssuedToken>;

    /// Exchanges a refresh token for a new issue cycle.
    async fn refresh(&self, params: &AuthParams, options: IssueOptions) -> AuthResult<IssuedToken>;

    /// Revokes the token named by the request.
    async fn revoke(&self, params: &AuthParams) -> AuthResult<()> {
        self.context().revoke(params).await
    }

    /// Describes the token named by the request without mutating anything.
    async fn introspect(&self, params: &AuthParams) -> AuthResult<Introspection> {
        self.context().introspect(params).await
    }

    /// Validates an authorize-endpoint request.
    ///
    /// # Errors
    ///
    /// Grants without an authorize step return `AuthError::InvalidAction`.
    async fn authorize_validate(&self, _params: &AuthParams) -> AuthResult<Vec<UserError>> {
        Err(AuthError::invalid_action("authorize"))
    }

    /// Builds the authorize redirect target.
    ///
    /// # Errors
    ///
    /// Grants without an authorize step return `AuthError::InvalidAction`.
    async fn authorize(&self, _params: &AuthParams) -> AuthResult<String> {
        Err(AuthError::invalid_action("authorize"))
    }
}
