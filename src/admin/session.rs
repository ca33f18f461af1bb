use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::auth::{claims::TokenKind, extractors::bearer_token, jwt::JwtKeys};
use crate::error::AppError;

/// Admin sessions last 24 hours from login.
pub const ADMIN_SESSION_TTL_MS: i64 = 86_400_000;

pub const EXPIRED_MESSAGE: &str = "Admin session expired. Please login again.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminSession {
    pub authenticated: bool,
    /// Unix milliseconds.
    pub login_time: i64,
}

impl AdminSession {
    pub fn start(now_ms: i64) -> Self {
        Self {
            authenticated: true,
            login_time: now_ms,
        }
    }

    /// Exactly 24 hours after login is already expired.
    pub fn is_valid_at(&self, now_ms: i64) -> bool {
        self.authenticated && now_ms - self.login_time < ADMIN_SESSION_TTL_MS
    }

    pub fn expires_at_ms(&self) -> i64 {
        self.login_time + ADMIN_SESSION_TTL_MS
    }
}

pub fn now_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// JWT payload of an admin token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminClaims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
    pub kind: TokenKind,
    #[serde(flatten)]
    pub session: AdminSession,
}

pub fn issue_token(keys: &JwtKeys, email: &str, session: AdminSession) -> anyhow::Result<String> {
    let claims = AdminClaims {
        sub: email.to_string(),
        iat: (session.login_time / 1000) as usize,
        exp: (session.expires_at_ms() / 1000) as usize,
        iss: keys.issuer.clone(),
        aud: keys.audience.clone(),
        kind: TokenKind::Admin,
        session,
    };
    keys.encode_claims(&claims)
}

fn expired() -> AppError {
    AppError::Auth(EXPIRED_MESSAGE.into())
}

/// Decodes an admin token and runs the session check against `now_ms`.
pub fn authorize(keys: &JwtKeys, token: &str, now_ms: i64) -> Result<AdminClaims, AppError> {
    let claims: AdminClaims = keys.decode_claims(token).map_err(|e| {
        warn!(error = %e, "admin token rejected");
        expired()
    })?;
    if claims.kind != TokenKind::Admin {
        warn!(kind = ?claims.kind, "non-admin token on admin route");
        return Err(expired());
    }
    if !claims.session.is_valid_at(now_ms) {
        debug!(login_time = claims.session.login_time, "admin session expired");
        return Err(expired());
    }
    Ok(claims)
}

/// Gate for admin routes.
#[derive(Debug, Clone)]
pub struct AdminGuard {
    pub email: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminGuard
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).map_err(|_| expired())?;
        let keys = JwtKeys::from_ref(state);
        let claims = authorize(&keys, token, now_ms())?;
        Ok(AdminGuard { email: claims.sub })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;

    fn keys() -> JwtKeys {
        JwtKeys::from(&JwtConfig {
            secret: "secret".into(),
            issuer: "iss".into(),
            audience: "aud".into(),
            ttl_minutes: 5,
            refresh_ttl_minutes: 60,
        })
    }

    #[test]
    fn validity_window() {
        let session = AdminSession::start(1_000);
        assert!(session.is_valid_at(1_000));
        assert!(session.is_valid_at(1_000 + ADMIN_SESSION_TTL_MS - 1));
        assert!(!session.is_valid_at(1_000 + ADMIN_SESSION_TTL_MS));
        assert!(!session.is_valid_at(1_000 + ADMIN_SESSION_TTL_MS + 1));

        let signed_out = AdminSession {
            authenticated: false,
            login_time: 1_000,
        };
        assert!(!signed_out.is_valid_at(1_000));
    }

    #[test]
    fn fresh_token_authorizes() {
        let keys = keys();
        let now = now_ms();
        let token = issue_token(&keys, "admin@example.com", AdminSession::start(now)).unwrap();

        let claims = authorize(&keys, &token, now + 1).unwrap();
        assert_eq!(claims.sub, "admin@example.com");
        assert_eq!(claims.session.login_time, now);
    }

    #[test]
    fn token_is_rejected_once_the_day_is_over() {
        let keys = keys();
        let now = now_ms();
        let token = issue_token(&keys, "admin@example.com", AdminSession::start(now)).unwrap();

        let err = authorize(&keys, &token, now + ADMIN_SESSION_TTL_MS).unwrap_err();
        assert_eq!(err.to_string(), EXPIRED_MESSAGE);
    }

    #[test]
    fn old_tokens_fail_signature_expiry() {
        let keys = keys();
        let two_days_ago = now_ms() - 2 * ADMIN_SESSION_TTL_MS;
        let token = issue_token(&keys, "admin@example.com", AdminSession::start(two_days_ago)).unwrap();

        let err = authorize(&keys, &token, now_ms()).unwrap_err();
        assert_eq!(err.to_string(), EXPIRED_MESSAGE);
    }

    #[test]
    fn user_tokens_are_not_admin_tokens() {
        let keys = keys();
        let access = keys.sign_access("user-1", "session-1").unwrap();
        assert!(authorize(&keys, &access, now_ms()).is_err());
    }
}
