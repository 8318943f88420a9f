//! End-to-end grant request handling.
//!
//! [`GrantService`] runs the control flow for one request: resolve the
//! strategy, validate, dispatch on the action, and shape the result.
//! Validation errors never reach a mutating operation.

use std::sync::Arc;

use crate::AuthResult;
use crate::error::UserError;
use crate::extractors::{AuthParams, Endpoint};
use crate::http::{AccessTokenResponse, AuthorizeResponse};
use crate::token::Introspection;

use super::grant::{Grant, GrantAction, IssueOptions};
use super::registry::GrantRegistry;

/// Result of a handled grant request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantOutcome {
    /// Validation failed; nothing was mutated.
    Rejected(Vec<UserError>),
    /// Tokens were issued or refreshed.
    Issued(AccessTokenResponse),
    /// The target token was revoked.
    Revoked,
    /// The authorize step produced a redirect.
    Authorized(AuthorizeResponse),
    /// Token introspection result.
    Introspected(Introspection),
}

impl GrantOutcome {
    /// Returns `true` if the request was rejected by validation.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    /// Returns the user errors of a rejected request.
    #[must_use]
    pub fn errors(&self) -> &[UserError] {
        match self {
            Self::Rejected(errors) => errors,
            _ => &[],
        }
    }
}

/// Runs grant requests against a registry.
#[derive(Debug, Clone)]
pub struct GrantService {
    registry: GrantRegistry,
}

impl GrantService {
    /// Creates a service over `registry`.
    #[must_use]
    pub fn new(registry: GrantRegistry) -> Self {
        Self { registry }
    }

    /// The underlying registry.
    #[must_use]
    pub fn registry(&self) -> &GrantRegistry {
        &self.registry
    }

    /// Handles a token or authorize request with the strategy's default options.
    ///
    /// # Errors
    ///
    /// Returns internal errors (unknown action or grant type, storage
    /// failures). Validation failures are an `Ok(GrantOutcome::Rejected)`.
    pub async fn handle(&self, params: &AuthParams) -> AuthResult<GrantOutcome> {
        let grant = self.registry.resolve(params)?;
        let options = grant.context().issue_options();
        Self::dispatch(grant, params, options).await
    }

    /// Handles a request with explicit issue options.
    ///
    /// # Errors
    ///
    /// See [`GrantService::handle`].
    pub async fn handle_with_options(
        &self,
        params: &AuthParams,
        options: IssueOptions,
    ) -> AuthResult<GrantOutcome> {
        let grant = self.registry.resolve(params)?;
        Self::dispatch(grant, params, options).await
    }

    async fn dispatch(
        grant: Arc<dyn Grant>,
        params: &AuthParams,
        options: IssueOptions,
    ) -> AuthResult<GrantOutcome> {
        if params.endpoint() == Some(Endpoint::Authorize) {
            let errors = grant.authorize_validate(params).await?;
            if !errors.is_empty() {
                tracing::debug!(errors = ?errors, "Authorize request rejected");
                return Ok(GrantOutcome::Rejected(errors));
            }
            let location = grant.authorize(params).await?;
            return Ok(GrantOutcome::Authorized(AuthorizeResponse::new(location)));
        }

        let errors = grant.validate(params).await?;
        if !errors.is_empty() {
            tracing::debug!(
                grant_type = grant.type_name(),
                errors = ?errors,
                "Grant request rejected"
            );
            return Ok(GrantOutcome::Rejected(errors));
        }

        let outcome = match params.action()? {
            GrantAction::Show
                if params.authorization_code().is_none() && params.refresh_token_key_exists() =>
            {
                GrantOutcome::Issued(grant.refresh(params, options).await?.into())
            }
            GrantAction::Show => GrantOutcome::Issued(grant.issue(params, options).await?.into()),
            GrantAction::Update => {
                GrantOutcome::Issued(grant.refresh(params, options).await?.into())
            }
            GrantAction::Destroy => {
                grant.revoke(params).await?;
                GrantOutcome::Revoked
            }
        };

        Ok(outcome)
    }

    /// Introspects the token named by the request.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Credential` when the request names no token, or
    /// a storage error.
    pub async fn introspect(&self, params: &AuthParams) -> AuthResult<GrantOutcome> {
        let grant = self.registry.resolve(params)?;
        let introspection = grant.introspect(params).await?;
        Ok(GrantOutcome::Introspected(introspection))
    }
}
