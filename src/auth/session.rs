//! Server-side session strategy: an opaque random token handed to the client
//! in an HttpOnly cookie, stored as a SHA-256 digest so raw values never
//! touch the database. Rows live in the `sessions` table and survive process
//! restarts.

use axum::http::{
    header::{InvalidHeaderValue, COOKIE},
    HeaderMap, HeaderValue,
};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "fintrack_session";

pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    Base64UrlUnpadded::encode_string(&bytes)
}

/// Digest used for storage and lookup; the raw token exists only in the
/// cookie on the client side.
pub fn hash_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// Insert a session row and hand back the raw token for the cookie.
pub async fn create(db: &PgPool, user_id: Uuid, ttl_hours: i64) -> anyhow::Result<String> {
    let token = generate_token();
    sqlx::query(
        r#"
        INSERT INTO sessions (token_hash, user_id, expires_at)
        VALUES ($1, $2, now() + ($3 * INTERVAL '1 hour'))
        "#,
    )
    .bind(hash_token(&token))
    .bind(user_id)
    .bind(ttl_hours)
    .execute(db)
    .await?;
    debug!(user_id = %user_id, "session created");
    Ok(token)
}

/// Resolve a presented token to its owner. Expired rows never match.
pub async fn resolve(db: &PgPool, token: &str) -> anyhow::Result<Option<Uuid>> {
    let row = sqlx::query(
        r#"
        SELECT user_id
        FROM sessions
        WHERE token_hash = $1 AND expires_at > now()
        "#,
    )
    .bind(hash_token(token))
    .fetch_optional(db)
    .await?;
    Ok(row.map(|r| r.get("user_id")))
}

/// Logout is idempotent; destroying a missing session is not an error.
pub async fn destroy(db: &PgPool, token: &str) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
        .bind(hash_token(token))
        .execute(db)
        .await?;
    Ok(())
}

/// Drop rows past their expiry. Run from the maintenance binary.
pub async fn purge_expired(db: &PgPool) -> anyhow::Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= now()")
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}

pub fn build_cookie(
    token: &str,
    ttl_hours: i64,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let max_age = ttl_hours * 3600;
    let mut cookie =
        format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub fn clear_cookie(secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Pull the session token out of the Cookie header, if present.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(COOKIE)?.to_str().ok()?;
    for pair in value.split(';') {
        let mut parts = pair.trim().splitn(2, '=');
        let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
            continue;
        };
        if key.trim() == SESSION_COOKIE && !val.trim().is_empty() {
            return Some(val.trim().to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_unique_and_url_safe() {
        let first = generate_token();
        let second = generate_token();
        assert_ne!(first, second);
        // 32 bytes of entropy, base64url without padding
        assert_eq!(first.len(), 43);
        assert!(first
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn hash_is_stable_and_differs_from_token() {
        let token = generate_token();
        assert_eq!(hash_token(&token), hash_token(&token));
        assert_ne!(hash_token(&token), token.as_bytes().to_vec());
        assert_eq!(hash_token(&token).len(), 32);
    }

    #[test]
    fn cookie_carries_expected_attributes() {
        let cookie = build_cookie("abc123", 24, false).expect("valid header value");
        let value = cookie.to_str().unwrap();
        assert!(value.starts_with("fintrack_session=abc123"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("SameSite=Lax"));
        assert!(value.contains("Max-Age=86400"));
        assert!(!value.contains("Secure"));
    }

    #[test]
    fn cookie_is_secure_when_configured() {
        let cookie = build_cookie("abc123", 24, true).expect("valid header value");
        assert!(cookie.to_str().unwrap().ends_with("; Secure"));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let cookie = clear_cookie(false).expect("valid header value");
        let value = cookie.to_str().unwrap();
        assert!(value.starts_with("fintrack_session=;"));
        assert!(value.contains("Max-Age=0"));
    }

    #[test]
    fn token_is_found_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; fintrack_session=tok-1; lang=en"),
        );
        assert_eq!(token_from_headers(&headers), Some("tok-1".to_string()));

        // Pairs without '=' are skipped, not fatal.
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("flag; fintrack_session=tok-2"),
        );
        assert_eq!(token_from_headers(&headers), Some("tok-2".to_string()));
    }

    #[test]
    fn missing_or_empty_cookie_yields_none() {
        let headers = HeaderMap::new();
        assert_eq!(token_from_headers(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("fintrack_session="));
        assert_eq!(token_from_headers(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("other=value"));
        assert_eq!(token_from_headers(&headers), None);
    }
}
