//! Authentication extractors.
//!
//! Clients send the identity provider's ID token as
//! `Authorization: Bearer <token>`. These extractors verify it through
//! [`IdentityClient`](crate::services::identity::IdentityClient).

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::debug;

use crate::error::{AppError, set_sentry_user};
use crate::services::identity::VerifiedUser;
use crate::state::AppState;

/// Message for any failed authentication on protected endpoints.
pub const NOT_AUTHORIZED: &str = "not authorized";

/// The raw bearer token, if the request carries one.
///
/// Does not verify anything; handlers that need custom rejection rules
/// (guest checkout) verify it themselves.
#[derive(Debug, Clone)]
pub struct BearerToken(pub Option<String>);

impl BearerToken {
    /// Parse `Bearer <token>` out of an `Authorization` header value.
    #[must_use]
    pub fn parse(header: &str) -> Option<String> {
        let (scheme, token) = header.trim().split_once(' ')?;
        let token = token.trim();
        (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
    }

    /// Verify the token, recording the user in Sentry on success.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthorized` if there is no token or it fails verification.
    pub async fn verify(&self, state: &AppState) -> Result<VerifiedUser, AppError> {
        let token = self
            .0
            .as_deref()
            .ok_or_else(|| AppError::Unauthorized(NOT_AUTHORIZED.to_string()))?;

        let user = state.identity().verify(token).await.map_err(|e| {
            debug!(error = %e, "Bearer token rejected");
            AppError::Unauthorized(NOT_AUTHORIZED.to_string())
        })?;

        set_sentry_user(&user.uid, user.email.as_deref());
        Ok(user)
    }
}

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(Self::parse);
        Ok(Self(token))
    }
}

/// Extractor that requires a verified user.
///
/// Rejects with 401 `{"error": "not authorized"}`.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.uid)
/// }
/// ```
pub struct RequireUser(pub VerifiedUser);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = BearerToken::from_request_parts(parts, state)
            .await
            .unwrap_or_else(|never| match never {});
        Ok(Self(token.verify(state).await?))
    }
}

/// Extractor that verifies a bearer token when one is present.
///
/// Missing or invalid tokens yield `None` rather than a rejection.
pub struct OptionalUser(pub Option<VerifiedUser>);

impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = BearerToken::from_request_parts(parts, state).await?;
        if token.0.is_none() {
            return Ok(Self(None));
        }
        Ok(Self(token.verify(state).await.ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bearer_header() {
        assert_eq!(BearerToken::parse("Bearer abc.def"), Some("abc.def".to_string()));
        assert_eq!(BearerToken::parse("bearer  abc "), Some("abc".to_string()));
        assert_eq!(BearerToken::parse("Basic abc"), None);
        assert_eq!(BearerToken::parse("Bearer "), None);
        assert_eq!(BearerToken::parse("abc"), None);
    }
}
