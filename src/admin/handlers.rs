use axum::{
    extract::{FromRef, Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use super::dto::{AdminFlagRequest, AdminLoginRequest, AdminLoginResponse, BlockedRequest, CreditsChange};
use super::session::{self, AdminGuard, AdminSession};
use crate::{
    auth::jwt::JwtKeys,
    error::AppError,
    pagination::Pagination,
    profiles::{self, UserProfile},
    state::AppState,
};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/login", post(login))
        .route("/admin/users", get(list_users))
        .route("/admin/users/:id/credits", put(update_credits))
        .route("/admin/users/:id/blocked", put(update_blocked))
        .route("/admin/users/:id/admin", put(update_admin))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<AdminLoginRequest>,
) -> Result<Json<AdminLoginResponse>, AppError> {
    if !state.admin.verify(&payload.email, &payload.password) {
        warn!(email = %payload.email, "admin login rejected");
        return Err(AppError::Auth("Invalid admin credentials".into()));
    }

    let admin_session = AdminSession::start(session::now_ms());
    let keys = JwtKeys::from_ref(&state);
    let token = session::issue_token(&keys, state.admin.email(), admin_session)?;
    let expires_at =
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(admin_session.expires_at_ms()) * 1_000_000)
            .map_err(anyhow::Error::from)?;

    info!("admin logged in");
    Ok(Json(AdminLoginResponse { token, expires_at }))
}

#[instrument(skip(state, admin), fields(admin = %admin.email))]
pub async fn list_users(
    State(state): State<AppState>,
    admin: AdminGuard,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<UserProfile>>, AppError> {
    state.schema.ensure(state.store.as_ref()).await?;
    let users = profiles::repo::list(state.store.as_ref(), p.limit, p.offset).await?;
    Ok(Json(users))
}

#[instrument(skip(state, admin), fields(admin = %admin.email))]
pub async fn update_credits(
    State(state): State<AppState>,
    admin: AdminGuard,
    Path(id): Path<String>,
    Json(change): Json<CreditsChange>,
) -> Result<Json<UserProfile>, AppError> {
    state.schema.ensure(state.store.as_ref()).await?;
    let store = state.store.as_ref();

    let credits = match change {
        CreditsChange::Set { .. } => change.apply(0)?,
        CreditsChange::Adjust { .. } => change.apply(profiles::repo::get(store, &id).await?.credits)?,
    };
    let profile = profiles::repo::set_credits(store, &id, credits).await?;
    info!(profile_id = %id, credits, "credits updated by admin");
    Ok(Json(profile))
}

#[instrument(skip(state, admin), fields(admin = %admin.email))]
pub async fn update_blocked(
    State(state): State<AppState>,
    admin: AdminGuard,
    Path(id): Path<String>,
    Json(body): Json<BlockedRequest>,
) -> Result<Json<UserProfile>, AppError> {
    state.schema.ensure(state.store.as_ref()).await?;
    let profile = profiles::repo::set_blocked(state.store.as_ref(), &id, body.blocked).await?;
    info!(profile_id = %id, blocked = body.blocked, "block flag updated by admin");
    Ok(Json(profile))
}

#[instrument(skip(state, admin), fields(admin = %admin.email))]
pub async fn update_admin(
    State(state): State<AppState>,
    admin: AdminGuard,
    Path(id): Path<String>,
    Json(body): Json<AdminFlagRequest>,
) -> Result<Json<UserProfile>, AppError> {
    state.schema.ensure(state.store.as_ref()).await?;
    let profile = profiles::repo::set_admin(state.store.as_ref(), &id, body.admin).await?;
    info!(profile_id = %id, admin = body.admin, "admin flag updated by admin");
    Ok(Json(profile))
}
