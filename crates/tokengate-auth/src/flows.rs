//! Login, token generation, refresh and logout.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokengate_core::AuthError;
use tracing::{debug, info, instrument, warn};

use crate::claims::TokenClaims;
use crate::pipeline::AuthPipeline;
use crate::request::RequestView;

/// A freshly signed token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub claims: TokenClaims,
}

impl AuthPipeline {
    /// Authenticates the login request and issues a token for the identity it yields.
    ///
    /// # Errors
    ///
    /// - [`AuthError::MissingAuthenticator`] if no authenticator is configured
    /// - whatever the authenticator rejects the credentials with
    /// - [`AuthError::MissingIdentity`] if the payload lacks the identity claim
    #[instrument(skip_all)]
    pub async fn login(&self, request: &RequestView, body: &Value) -> Result<IssuedToken, AuthError> {
        let authenticator = self
            .authenticator
            .as_ref()
            .ok_or(AuthError::MissingAuthenticator)?;

        let identity = authenticator
            .authenticate(request, body)
            .await
            .inspect_err(|e| warn!(error = %e, "Login rejected"))?;

        let issued = self.generate(&identity)?;
        info!(expires_at = %issued.expires_at, "Login succeeded");
        Ok(issued)
    }

    /// Issues a token for `data` without a login request.
    ///
    /// # Errors
    ///
    /// - [`AuthError::MissingIdentity`] if the payload lacks the identity claim
    /// - [`AuthError::FailedTokenCreation`] if signing fails
    pub fn generate(&self, data: &Value) -> Result<IssuedToken, AuthError> {
        let identity_key = &self.config.identity_key;
        let payload = self.payload.build(data, identity_key);
        let claims = TokenClaims::issue(payload, identity_key, self.clock.now(), self.config.timeout)?;
        self.issue(claims)
    }

    fn issue(&self, claims: TokenClaims) -> Result<IssuedToken, AuthError> {
        let token = self.signer.sign(&claims.to_map(&self.config.identity_key))?;
        Ok(IssuedToken {
            token,
            expires_at: claims.expires_at(),
            claims,
        })
    }

    /// Checks that `token` may still be refreshed or logged out.
    ///
    /// An expired token passes only while its `iat` is inside the refresh window.
    ///
    /// # Errors
    ///
    /// - any verification or `exp` structure error
    /// - [`AuthError::InvalidToken`] if the token is revoked
    /// - [`AuthError::MissingIssuedAt`] if an expired token has no `iat`
    /// - [`AuthError::RefreshWindowExceeded`] if the window has passed
    pub async fn check_refreshable(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let claims = self.parse_token(token)?;

        if self.store.is_revoked(token).await {
            return Err(AuthError::InvalidToken);
        }

        let now = self.clock.now();
        if claims.is_expired_at(now) {
            let iat = claims.iat.ok_or(AuthError::MissingIssuedAt)?;
            // A window reaching past the earliest representable instant covers every `iat`.
            let oldest = now.checked_sub_signed(self.store.max_refresh());
            if oldest.is_some_and(|oldest| iat < oldest.timestamp()) {
                debug!(iat, "Refresh window exceeded");
                return Err(AuthError::RefreshWindowExceeded);
            }
        }

        Ok(claims)
    }

    /// Replaces the request's token with a newly stamped one and revokes the old token.
    ///
    /// # Errors
    ///
    /// Location errors, any [`AuthPipeline::refresh_token`] error.
    pub async fn refresh(&self, request: &RequestView) -> Result<IssuedToken, AuthError> {
        let token = self.locator.locate(request)?;
        self.refresh_token(&token).await
    }

    /// # Errors
    ///
    /// Any [`AuthPipeline::check_refreshable`] error, signing failures and
    /// revocation failures for the old token.
    #[instrument(skip_all)]
    pub async fn refresh_token(&self, token: &str) -> Result<IssuedToken, AuthError> {
        let claims = self
            .check_refreshable(token)
            .await
            .inspect_err(|e| warn!(error = %e, "Refresh rejected"))?;

        let issued = self.issue(claims.restamp(self.clock.now(), self.config.timeout)?)?;
        self.store.revoke(token, &claims).await?;

        info!(expires_at = %issued.expires_at, "Token refreshed");
        Ok(issued)
    }

    /// Revokes the request's token.
    ///
    /// # Errors
    ///
    /// Location errors, any [`AuthPipeline::logout_token`] error.
    pub async fn logout(&self, request: &RequestView) -> Result<(), AuthError> {
        let token = self.locator.locate(request)?;
        self.logout_token(&token).await
    }

    /// # Errors
    ///
    /// Any [`AuthPipeline::check_refreshable`] error and revocation failures.
    #[instrument(skip_all)]
    pub async fn logout_token(&self, token: &str) -> Result<(), AuthError> {
        let claims = self
            .check_refreshable(token)
            .await
            .inspect_err(|e| warn!(error = %e, "Logout rejected"))?;

        self.store.revoke(token, &claims).await?;
        info!("Token revoked on logout");
        Ok(())
    }
}
