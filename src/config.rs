use anyhow::bail;

/// Which identity-proof mechanism a deployment runs. Exactly one is active;
/// the two are never wired into the same code path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStrategy {
    /// Signed bearer tokens, verified statelessly. Logout is client-side.
    Token,
    /// Opaque cookie-backed sessions stored server-side, durable across
    /// restarts. Logout destroys the session record.
    Session,
}

impl AuthStrategy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "token" => Some(Self::Token),
            "session" => Some(Self::Session),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_hours: i64,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ttl_hours: i64,
    pub cookie_secure: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub auth_strategy: AuthStrategy,
    pub jwt: JwtConfig,
    pub session: SessionConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;

        let auth_strategy = match std::env::var("AUTH_STRATEGY") {
            Ok(value) => match AuthStrategy::parse(&value) {
                Some(strategy) => strategy,
                None => bail!("AUTH_STRATEGY must be \"token\" or \"session\", got {value:?}"),
            },
            Err(_) => AuthStrategy::Token,
        };

        // The signing secret is only mandatory when tokens are the active
        // strategy; session deployments generate their own random identifiers.
        let secret = match auth_strategy {
            AuthStrategy::Token => std::env::var("JWT_SECRET")?,
            AuthStrategy::Session => std::env::var("JWT_SECRET").unwrap_or_default(),
        };

        let jwt = JwtConfig {
            secret,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "fintrack".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "fintrack-users".into()),
            ttl_hours: std::env::var("JWT_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(24),
        };

        let session = SessionConfig {
            ttl_hours: std::env::var("SESSION_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(24),
            cookie_secure: std::env::var("COOKIE_SECURE")
                .map(|v| v == "true")
                .unwrap_or(false),
        };

        Ok(Self {
            database_url,
            auth_strategy,
            jwt,
            session,
        })
    }
}
