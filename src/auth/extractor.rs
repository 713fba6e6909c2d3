use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use super::{session, token::TokenKeys};
use crate::{config::AuthStrategy, error::ApiError, state::AppState};

/// Resolved caller for the current request. Every protected endpoint takes
/// this extractor first, so an unauthenticated request is rejected before
/// any data access or mutation can happen.
///
/// The configured strategy decides how the proof is read: bearer token from
/// the Authorization header, or session cookie resolved against the store.
/// Only one of the two is consulted in a given deployment.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match state.config.auth_strategy {
            AuthStrategy::Token => {
                let header = parts
                    .headers
                    .get(axum::http::header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| ApiError::unauthorized("missing authorization header"))?;

                let token = header
                    .strip_prefix("Bearer ")
                    .or_else(|| header.strip_prefix("bearer "))
                    .ok_or_else(|| ApiError::unauthorized("invalid authorization header"))?;

                let keys = TokenKeys::from_ref(state);
                let claims = keys.verify(token).map_err(|_| {
                    warn!("invalid or expired token");
                    ApiError::unauthorized("invalid or expired token")
                })?;

                Ok(AuthUser(claims.sub))
            }
            AuthStrategy::Session => {
                let token = session::token_from_headers(&parts.headers)
                    .ok_or_else(|| ApiError::unauthorized("not logged in"))?;

                let user_id = session::resolve(&state.db, &token)
                    .await
                    .map_err(ApiError::Internal)?
                    .ok_or_else(|| {
                        warn!("session expired or unknown");
                        ApiError::unauthorized("session expired or invalid")
                    })?;

                Ok(AuthUser(user_id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_auth(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/transactions/my");
        if let Some(value) = value {
            builder = builder.header(axum::http::header::AUTHORIZATION, value);
        }
        let (parts, ()) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[tokio::test]
    async fn missing_header_is_rejected() {
        let state = AppState::fake(AuthStrategy::Token);
        let mut parts = parts_with_auth(None);
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .err()
            .expect("should reject");
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn wrong_scheme_is_rejected() {
        let state = AppState::fake(AuthStrategy::Token);
        let mut parts = parts_with_auth(Some("Basic dXNlcjpwdw=="));
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .err()
            .expect("should reject");
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let state = AppState::fake(AuthStrategy::Token);
        let mut parts = parts_with_auth(Some("Bearer not-a-jwt"));
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .err()
            .expect("should reject");
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn valid_token_resolves_to_issuing_user() {
        let state = AppState::fake(AuthStrategy::Token);
        let user_id = Uuid::new_v4();
        let token = TokenKeys::from_ref(&state).sign(user_id).expect("sign");
        let mut parts = parts_with_auth(Some(&format!("Bearer {token}")));
        let AuthUser(resolved) = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .expect("should resolve");
        assert_eq!(resolved, user_id);
    }

    #[tokio::test]
    async fn session_strategy_ignores_bearer_tokens() {
        let state = AppState::fake(AuthStrategy::Session);
        let user_id = Uuid::new_v4();
        // A perfectly valid JWT must not work when sessions are active.
        let token = TokenKeys::from_ref(&state).sign(user_id).expect("sign");
        let mut parts = parts_with_auth(Some(&format!("Bearer {token}")));
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .err()
            .expect("should reject");
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn session_strategy_rejects_missing_cookie() {
        let state = AppState::fake(AuthStrategy::Session);
        let mut parts = parts_with_auth(None);
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .err()
            .expect("should reject");
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }
}
