//! Grant-type registry.
//!
//! Maps `grant_type` names to strategies. Adding a grant type means
//! registering another [`Grant`] implementation.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::authorization_code::{AUTHORIZATION_CODE_GRANT, AuthorizationCodeGrant};
use super::grant::{Grant, GrantContext};
use crate::AuthResult;
use crate::error::AuthError;
use crate::extractors::AuthParams;

/// `grant_type` value used by refresh requests.
pub const REFRESH_TOKEN_GRANT: &str = "refresh_token";

/// Name → strategy map with a default strategy.
#[derive(Clone)]
pub struct GrantRegistry {
    grants: HashMap<&'static str, Arc<dyn Grant>>,
    default_grant: &'static str,
}

impl fmt::Debug for GrantRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.grants.keys().collect();
        names.sort();
        f.debug_struct("GrantRegistry")
            .field("grants", &names)
            .field("default_grant", &self.default_grant)
            .finish()
    }
}

impl GrantRegistry {
    /// Creates a registry whose default grant is `default`.
    #[must_use]
    pub fn new(default: Arc<dyn Grant>) -> Self {
        let default_grant = default.type_name();
        let mut grants = HashMap::new();
        grants.insert(default_grant, default);
        Self {
            grants,
            default_grant,
        }
    }

    /// A registry with the authorization code grant as default.
    #[must_use]
    pub fn with_authorization_code(context: GrantContext) -> Self {
        Self::new(Arc::new(AuthorizationCodeGrant::new(context)))
    }

    /// Registers another strategy under its `type_name`, replacing any
    /// previous one.
    pub fn register(&mut self, grant: Arc<dyn Grant>) {
        tracing::debug!(grant_type = grant.type_name(), "Registered grant type");
        self.grants.insert(grant.type_name(), grant);
    }

    /// Looks up a strategy by name.
    #[must_use]
    pub fn get(&self, grant_type: &str) -> Option<Arc<dyn Grant>> {
        self.grants.get(grant_type).cloned()
    }

    /// The default strategy.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the default was never registered.
    pub fn default_grant(&self) -> AuthResult<Arc<dyn Grant>> {
        self.get(self.default_grant).ok_or_else(|| {
            AuthError::configuration(format!(
                "default grant '{}' is not registered",
                self.default_grant
            ))
        })
    }

    /// Picks the strategy for a request.
    ///
    /// An absent `grant_type` or `refresh_token` resolves to the default
    /// grant, which owns the tokens being refreshed.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnsupportedGrantType` for unknown names.
    pub fn resolve(&self, params: &AuthParams) -> AuthResult<Arc<dyn Grant>> {
        match params.grant_type() {
            None | Some(REFRESH_TOKEN_GRANT) => self.default_grant(),
            Some(name) => self
                .get(name)
                .ok_or_else(|| AuthError::unsupported_grant_type(name)),
        }
    }

    /// Names of all registered grant types, sorted.
    #[must_use]
    pub fn grant_types(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.grants.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for GrantRegistry {
    fn default() -> Self {
        Self {
            grants: HashMap::new(),
            default_grant: AUTHORIZATION_CODE_GRANT,
        }
    }
}
