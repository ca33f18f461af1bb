use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, error, info, instrument, warn};

use super::{
    accounts::{AccountError, AuthIdentity},
    dto::{AuthResponse, LoginRequest, MeResponse, PublicUser, RefreshRequest, RegisterRequest},
    extractors::{require_live_session, AuthUser},
    jwt::JwtKeys,
    session::BLOCKED_MESSAGE,
};
use crate::{
    error::AppError,
    profiles::{self, UserProfile},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();
    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }
    Ok(email)
}

async fn load_profile(state: &AppState, user_id: &str) -> Result<Option<UserProfile>, AppError> {
    state.schema.ensure(state.store.as_ref()).await?;
    Ok(profiles::repo::find_by_user_id(state.store.as_ref(), user_id).await?)
}

/// Ends the session of a blocked user and builds the rejection.
async fn reject_blocked(state: &AppState, user_id: &str, session_id: &str) -> AppError {
    warn!(user_id, "blocked user signed out");
    if let Err(e) = state.accounts.delete_session(user_id, session_id).await {
        warn!(error = %e, user_id, "could not end blocked user's session");
    }
    AppError::Forbidden(BLOCKED_MESSAGE.into())
}

fn issue_tokens(
    state: &AppState,
    identity: AuthIdentity,
    session_id: &str,
    profile: Option<UserProfile>,
) -> Result<AuthResponse, AppError> {
    let keys = JwtKeys::from_ref(state);
    let access_token = keys.sign_access(&identity.id, session_id)?;
    let refresh_token = keys.sign_refresh(&identity.id, session_id)?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: identity.into(),
        profile,
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let email = normalize_email(&payload.email)?;
    if payload.password.len() < 8 {
        warn!("password too short");
        return Err(AppError::Validation("Password too short".into()));
    }
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Name is required".into()));
    }

    let identity = state
        .accounts
        .create_account(&email, &payload.password, name)
        .await
        .map_err(|e| {
            warn!(error = %e, %email, "account creation failed");
            e
        })?;

    // The account exists from here on; a missing profile is reported by /me.
    let profile = match state.schema.ensure(state.store.as_ref()).await {
        Ok(()) => profiles::repo::create(state.store.as_ref(), &identity).await,
        Err(e) => Err(e),
    };
    let profile = match profile {
        Ok(p) => Some(p),
        Err(e) => {
            error!(error = %e, user_id = %identity.id, "profile creation failed");
            None
        }
    };

    let session = state.accounts.create_session(&email, &payload.password).await?;
    info!(user_id = %identity.id, %email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(issue_tokens(&state, identity, &session.id, profile)?),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = normalize_email(&payload.email)?;

    let session = state
        .accounts
        .create_session(&email, &payload.password)
        .await
        .map_err(|e| {
            warn!(error = %e, %email, "login rejected");
            e
        })?;
    let identity = state.accounts.get_user(&session.user_id).await?;

    let profile = load_profile(&state, &identity.id).await?;
    if profile.as_ref().is_some_and(|p| p.is_blocked) {
        return Err(reject_blocked(&state, &identity.id, &session.id).await);
    }

    info!(user_id = %identity.id, %email, "user logged in");
    Ok(Json(issue_tokens(&state, identity, &session.id, profile)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| AppError::Auth(e.to_string()))?;
    require_live_session(state.accounts.as_ref(), &claims.sub, &claims.sid).await?;

    let identity = match state.accounts.get_user(&claims.sub).await {
        Ok(identity) => identity,
        Err(AccountError::NotFound(_)) => return Err(AppError::Auth("User not found".into())),
        Err(e) => return Err(e.into()),
    };

    let profile = load_profile(&state, &identity.id).await?;
    if profile.as_ref().is_some_and(|p| p.is_blocked) {
        return Err(reject_blocked(&state, &identity.id, &claims.sid).await);
    }

    debug!(user_id = %identity.id, "tokens refreshed");
    Ok(Json(issue_tokens(&state, identity, &claims.sid, profile)?))
}

#[instrument(skip(state))]
pub async fn logout(State(state): State<AppState>, user: AuthUser) -> Result<StatusCode, AppError> {
    match state.accounts.delete_session(&user.user_id, &user.session_id).await {
        Ok(()) => info!(user_id = %user.user_id, "user logged out"),
        Err(AccountError::NotFound(_)) => debug!(user_id = %user.user_id, "session already gone"),
        Err(e) => return Err(e.into()),
    }
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn get_me(State(state): State<AppState>, user: AuthUser) -> Result<Json<MeResponse>, AppError> {
    let identity = match state.accounts.get_user(&user.user_id).await {
        Ok(identity) => identity,
        Err(AccountError::NotFound(_)) => {
            warn!(user_id = %user.user_id, "user not found");
            return Err(AppError::Auth("User not found".into()));
        }
        Err(e) => {
            error!(error = %e, user_id = %user.user_id, "user lookup failed");
            return Err(e.into());
        }
    };

    let profile = load_profile(&state, &identity.id).await?;
    if profile.as_ref().is_some_and(|p| p.is_blocked) {
        return Err(reject_blocked(&state, &identity.id, &user.session_id).await);
    }

    Ok(Json(MeResponse {
        user: PublicUser::from(identity),
        profile,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("asha@example.com"));
        assert!(!is_valid_email("asha@example"));
        assert!(!is_valid_email("asha example@x.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn emails_are_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  Asha@Example.COM ").unwrap(), "asha@example.com");
        assert!(matches!(normalize_email("nope"), Err(AppError::Validation(_))));
    }

    #[test]
    fn public_user_serialization() {
        let user = PublicUser::from(AuthIdentity {
            id: "u1".into(),
            email: "test@example.com".into(),
            name: "Test".into(),
        });
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["email"], "test@example.com");
        assert_eq!(json["id"], "u1");
    }
}
