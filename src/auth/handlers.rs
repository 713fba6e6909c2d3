use axum::{
    extract::{FromRef, State},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{AuthResponse, LoginRequest, PublicUser, SignupRequest},
    extractor::AuthUser,
    password, session,
    repo::User,
    token::TokenKeys,
};
use crate::{config::AuthStrategy, error::ApiError, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/signup", post(signup))
        .route("/users/login", post(login))
        .route("/users/logout", post(logout))
        .route("/users/profile", get(profile))
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Establish a proof of identity for a freshly authenticated user: either a
/// signed bearer token in the body, or a session row plus Set-Cookie header.
async fn issue_proof(
    state: &AppState,
    user_id: Uuid,
) -> Result<(Option<String>, HeaderMap), ApiError> {
    let mut headers = HeaderMap::new();
    match state.config.auth_strategy {
        AuthStrategy::Token => {
            let keys = TokenKeys::from_ref(state);
            let token = keys.sign(user_id).map_err(ApiError::Internal)?;
            Ok((Some(token), headers))
        }
        AuthStrategy::Session => {
            let cfg = &state.config.session;
            let token = session::create(&state.db, user_id, cfg.ttl_hours)
                .await
                .map_err(ApiError::Internal)?;
            let cookie = session::build_cookie(&token, cfg.ttl_hours, cfg.cookie_secure)
                .map_err(|e| ApiError::Internal(e.into()))?;
            headers.insert(SET_COOKIE, cookie);
            Ok((None, headers))
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(mut payload): Json<SignupRequest>,
) -> Result<(StatusCode, HeaderMap, Json<AuthResponse>), ApiError> {
    payload.username = payload.username.trim().to_string();
    payload.email = payload.email.trim().to_lowercase();

    let username_len = payload.username.chars().count();
    if !(3..=30).contains(&username_len) {
        warn!("invalid username length");
        return Err(ApiError::validation("username must be 3-30 characters"));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::validation("invalid email"));
    }
    let password_len = payload.password.chars().count();
    if !(6..=128).contains(&password_len) {
        warn!("invalid password length");
        return Err(ApiError::validation("password must be 6-128 characters"));
    }

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::validation("email already registered"));
    }

    let hash = password::hash_password(&payload.password).map_err(ApiError::Internal)?;
    let user = User::create(&state.db, &payload.username, &payload.email, &hash).await?;

    info!(user_id = %user.id, "user signed up");
    let (token, headers) = issue_proof(&state, user.id).await?;
    Ok((
        StatusCode::CREATED,
        headers,
        Json(AuthResponse {
            user: user.into(),
            token,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<AuthResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::validation("invalid email"));
    }

    // Unknown email and wrong password are indistinguishable to the caller.
    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %payload.email, "login with unknown email");
            ApiError::unauthorized("invalid credentials")
        })?;

    let ok = password::verify_password(&payload.password, &user.password_hash)
        .map_err(ApiError::Internal)?;
    if !ok {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(ApiError::unauthorized("invalid credentials"));
    }

    info!(user_id = %user.id, "user logged in");
    let (token, headers) = issue_proof(&state, user.id).await?;
    Ok((
        headers,
        Json(AuthResponse {
            user: user.into(),
            token,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("user not found"))?;
    Ok(Json(user.into()))
}

/// Destroys the presented session under the session strategy; a bearer-token
/// deployment has nothing to revoke server-side, so this is an ack for the
/// client-side discard. Idempotent either way.
#[instrument(skip(state, headers))]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(HeaderMap, Json<serde_json::Value>), ApiError> {
    let mut response_headers = HeaderMap::new();
    if state.config.auth_strategy == AuthStrategy::Session {
        if let Some(token) = session::token_from_headers(&headers) {
            session::destroy(&state.db, &token)
                .await
                .map_err(ApiError::Internal)?;
        }
        // Clear the cookie even when no session row matched.
        let cookie = session::clear_cookie(state.config.session.cookie_secure)
            .map_err(|e| ApiError::Internal(e.into()))?;
        response_headers.insert(SET_COOKIE, cookie);
    }
    Ok((response_headers, Json(json!({ "message": "logged out" }))))
}
