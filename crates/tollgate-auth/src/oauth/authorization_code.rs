//! Authorization code grant.
//!
//! Validates code redemption (expiry, owning client credentials, optional
//! PKCE) and runs the shared issue rules against the code. Refresh is an
//! issue against the code that owns the refresh token, carrying the token's
//! correlation id forward.

use async_trait::async_trait;

use super::grant::{Grant, GrantContext, IssueOptions};
use super::pkce;
use crate::AuthResult;
use crate::error::{AuthError, UserError};
use crate::extractors::AuthParams;
use crate::token::IssuedToken;
use crate::types::{AuthorizationCode, Client};

/// Grant type name for the authorization code flow.
pub const AUTHORIZATION_CODE_GRANT: &str = "authorization_code";

/// The `authorization_code` grant strategy.
#[derive(Debug, Clone)]
pub struct AuthorizationCodeGrant {
    context: GrantContext,
}

impl AuthorizationCodeGrant {
    /// Creates the strategy over a shared context.
    #[must_use]
    pub fn new(context: GrantContext) -> Self {
        Self { context }
    }

    async fn find_code(&self, params: &AuthParams) -> AuthResult<Option<AuthorizationCode>> {
        match params.authorization_code() {
            Some(code) => self.context.store().find_authorization_code(code).await,
            None => Ok(None),
        }
    }

    /// Checks the request's client credentials and PKCE verifier against
    /// the code's owning client.
    fn validate_client(
        &self,
        params: &AuthParams,
        code: &AuthorizationCode,
        client: Option<&Client>,
        errors: &mut Vec<UserError>,
    ) {
        let credentials_ok = match (params.client_id(), params.secret()) {
            (Ok(client_id), Ok(secret)) => client
                .is_some_and(|c| c.credentials_match(client_id.as_deref(), secret.as_deref())),
            // Header parse failures are reported like a credential mismatch
            _ => false,
        };

        if !credentials_ok {
            tracing::warn!(
                client_id = %code.client_uid,
                "Authorization code presented with invalid client credentials"
            );
            errors.push(UserError::AuthCodeInvalidClientOrSecret);
        }

        if client.is_some_and(|c| c.pkce) {
            if let Err(e) = pkce::verify_stored_challenge(
                code.code_challenge.as_deref(),
                code.code_challenge_method.as_deref(),
                params.code_verifier(),
            ) {
                tracing::warn!(
                    client_id = %code.client_uid,
                    error = %e,
                    "PKCE verification failed"
                );
                errors.push(UserError::AuthCodeInvalidGrantError);
            }
        }
    }

    /// Issues against the code named in `params`.
    ///
    /// A code redemption counts toward the redeem limit. A refresh passes the
    /// presented token instead, which is re-checked under the code lock.
    async fn issue_for_code(
        &self,
        params: &AuthParams,
        options: &IssueOptions,
        presented_refresh: Option<&str>,
    ) -> AuthResult<IssuedToken> {
        let code = self
            .find_code(params)
            .await?
            .ok_or_else(|| AuthError::invalid_grant("Unknown authorization code"))?;

        if presented_refresh.is_none() {
            let attempts = self.context.store().record_redeem_attempt(code.id).await?;
            if let Some(max) = self.context.config().max_redeem_attempts {
                if attempts > max {
                    tracing::warn!(
                        client_id = %code.client_uid,
                        attempts,
                        "Authorization code redeem limit reached"
                    );
                    return Err(AuthError::invalid_grant(
                        "Authorization code redeem limit reached",
                    ));
                }
            }
        }

        self.context
            .issue_tokens(&code, self.type_name(), options, presented_refresh)
            .await
    }
}

#[async_trait]
impl Grant for AuthorizationCodeGrant {
    fn type_name(&self) -> &'static str {
        AUTHORIZATION_CODE_GRANT
    }

    fn context(&self) -> &GrantContext {
        &self.context
    }

    async fn token_validate(&self, params: &AuthParams) -> AuthResult<Vec<UserError>> {
        let Some(code) = self.find_code(params).await? else {
            // A token request carrying a refresh token instead of a code
            if params.refresh_token_key_exists() {
                return self.refresh_validate(params).await;
            }
            return Ok(vec![UserError::AuthCodeInvalid]);
        };

        let mut errors = Vec::new();

        if code.is_expired(self.context.now()) {
            errors.push(UserError::AuthCodeExpired);
        }

        if let Some(max) = self.context.config().max_redeem_attempts {
            if code.redeem_attempts >= max {
                errors.push(UserError::AuthCodeRedeemLimitReached);
            }
        }

        let client = self
            .context
            .store()
            .find_client_by_uid(&code.client_uid)
            .await?;
        self.validate_client(params, &code, client.as_ref(), &mut errors);

        Ok(errors)
    }

    async fn refresh_validate(&self, params: &AuthParams) -> AuthResult<Vec<UserError>> {
        let valid = match params.refresh_token() {
            Some(token) => {
                self.context
                    .store()
                    .is_valid_token(token, true, self.context.now())
                    .await?
            }
            None => false,
        };

        if valid {
            Ok(Vec::new())
        } else {
            Ok(vec![UserError::RefreshInvalidToken])
        }
    }

    async fn issue(&self, params: &AuthParams, options: IssueOptions) -> AuthResult<IssuedToken> {
        self.issue_for_code(params, &options, None).await
    }

    async fn refresh(
        &self,
        params: &AuthParams,
        options: IssueOptions,
    ) -> AuthResult<IssuedToken> {
        let refresh_token = params
            .refresh_token()
            .ok_or_else(|| AuthError::invalid_grant("Missing refresh token"))?;

        let store = self.context.store();
        let code = store
            .find_authorization_code_by_token(refresh_token)
            .await?
            .ok_or_else(|| AuthError::invalid_grant("Unknown refresh token"))?;
        let token = store
            .find_access_token(refresh_token)
            .await?
            .ok_or_else(|| AuthError::invalid_grant("Unknown refresh token"))?;

        let mut params = params.clone();
        params.set_authorization_code(code.code.clone());

        let options = match token.correlation_uid {
            Some(correlation_uid) => options.with_correlation_uid(correlation_uid),
            None => options,
        };

        tracing::info!(
            client_id = %code.client_uid,
            correlation_uid = options.correlation_uid.as_deref().unwrap_or_default(),
            "Refreshing token chain"
        );

        self.issue_for_code(&params, &options, Some(refresh_token)).await
    }

    async fn authorize_validate(&self, params: &AuthParams) -> AuthResult<Vec<UserError>> {
        let mut errors = Vec::new();

        let client = match params.client_id() {
            Ok(Some(client_id)) => {
                self.context
                    .store()
                    .find_client_by_uid(&client_id)
                    .await?
            }
            _ => None,
        };

        let Some(client) = client else {
            errors.push(UserError::AuthCodeInvalidClient);
            if params.redirect_url().is_none() {
                errors.push(UserError::AuthCodeRedirectUrlRequired);
            }
            return Ok(errors);
        };

        if params.redirect_url().is_none() && client.redirect_url.is_empty() {
            errors.push(UserError::AuthCodeRedirectUrlRequired);
        }

        let code = self
            .context
            .store()
            .find_latest_authorization_code_for_client(&client.uid, self.context.now())
            .await?;
        if code.is_none() {
            errors.push(UserError::AuthCodeInvalid);
        }

        Ok(errors)
    }

    async fn authorize(&self, params: &AuthParams) -> AuthResult<String> {
        let client_id = params
            .client_id()?
            .ok_or_else(|| AuthError::invalid_grant("Missing client_id"))?;

        let store = self.context.store();
        let client = store
            .find_client_by_uid(&client_id)
            .await?
            .ok_or_else(|| AuthError::invalid_grant("Unknown client"))?;
        let code = store
            .find_latest_authorization_code_for_client(&client.uid, self.context.now())
            .await?
            .ok_or_else(|| AuthError::invalid_grant("No live authorization code for client"))?;

        let redirect_url = params.redirect_url().unwrap_or(client.redirect_url);

        tracing::info!(client_id = %client.uid, "Authorization code redirect");
        Ok(format!("{redirect_url}?code={}", code.code))
    }
}
