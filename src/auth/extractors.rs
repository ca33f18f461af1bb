use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::{
    accounts::{AccountError, AccountService},
    claims::TokenKind,
    jwt::JwtKeys,
};
use crate::{error::AppError, state::AppState};

/// Bearer token from the `Authorization` header.
pub(crate) fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let auth = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Auth("Missing Authorization header".into()))?;

    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .ok_or_else(|| AppError::Auth("Invalid Authorization header".into()))
}

/// Rejects tokens whose hosted session was ended by logout.
pub(crate) async fn require_live_session(
    accounts: &dyn AccountService,
    user_id: &str,
    session_id: &str,
) -> Result<(), AppError> {
    match accounts.get_session(user_id, session_id).await {
        Ok(_) => Ok(()),
        Err(AccountError::NotFound(_)) => {
            warn!(user_id, "token for an ended session");
            Err(AppError::Auth("Session has ended".into()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Validated access token: the hosted auth user and session it was issued for.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub session_id: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let keys = JwtKeys::from_ref(state);

        let claims = keys.verify(token).map_err(|_| {
            warn!("invalid or expired token");
            AppError::Auth("Invalid or expired token".into())
        })?;

        if claims.kind != TokenKind::Access {
            return Err(AppError::Auth("Access token required".into()));
        }

        require_live_session(state.accounts.as_ref(), &claims.sub, &claims.sid).await?;

        Ok(AuthUser {
            user_id: claims.sub,
            session_id: claims.sid,
        })
    }
}
