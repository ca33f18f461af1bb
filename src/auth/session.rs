use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use super::extractors::AuthUser;
use crate::{
    error::AppError,
    profiles::{self, UserProfile},
    state::AppState,
};

pub const BLOCKED_MESSAGE: &str = "Your account has been blocked. Please contact support.";

/// Signed-in user with a loaded, unblocked profile. Built fresh for every
/// request; nothing about the user is cached between requests.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user_id: String,
    pub profile: UserProfile,
}

#[async_trait]
impl FromRequestParts<AppState> for SessionContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser { user_id, .. } = AuthUser::from_request_parts(parts, state).await?;

        state.schema.ensure(state.store.as_ref()).await?;
        let profile = profiles::repo::find_by_user_id(state.store.as_ref(), &user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Profile not found".into()))?;

        if profile.is_blocked {
            warn!(%user_id, "blocked user rejected");
            return Err(AppError::Forbidden(BLOCKED_MESSAGE.into()));
        }

        Ok(SessionContext { user_id, profile })
    }
}
