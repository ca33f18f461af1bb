use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use super::dto::{HistoryItem, LookupRequest, QuoteRequest};
use super::repo;
use super::workflow::{self, LookupOutcome, LookupQuote, LookupState, LookupWorkflow};
use crate::{auth::session::SessionContext, error::AppError, pagination::Pagination, state::AppState};

pub fn lookup_routes() -> Router<AppState> {
    Router::new()
        .route("/lookups", get(list_lookups).post(run_lookup))
        .route("/lookups/quote", post(quote_lookup))
}

/// Validates the plate and checks the balance. No remote side effects.
#[instrument(skip(session), fields(user_id = %session.user_id))]
pub async fn quote_lookup(
    session: SessionContext,
    Json(body): Json<QuoteRequest>,
) -> Result<Json<LookupQuote>, AppError> {
    Ok(Json(workflow::quote(&body.vehicle_number, &session.profile)?))
}

#[instrument(skip(state, session), fields(user_id = %session.user_id))]
pub async fn run_lookup(
    State(state): State<AppState>,
    mut session: SessionContext,
    Json(body): Json<LookupRequest>,
) -> Result<Json<LookupOutcome>, AppError> {
    let quote = workflow::quote(&body.vehicle_number, &session.profile)?;
    if !body.confirm {
        warn!("lookup not confirmed");
        return Err(AppError::Validation(format!(
            "Confirm the lookup of {} for {} credits",
            quote.vehicle_number, quote.cost
        )));
    }

    let outcome = LookupWorkflow::new(state.store.as_ref(), state.vehicles.as_ref())
        .run(quote.confirm(), &mut session.profile)
        .await
        .map_err(|e| {
            warn!(state = ?LookupState::Error, failed_at = ?e.state(), error = %e, "lookup");
            e
        })?;
    Ok(Json(outcome))
}

#[instrument(skip(state, session), fields(user_id = %session.user_id))]
pub async fn list_lookups(
    State(state): State<AppState>,
    session: SessionContext,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<HistoryItem>>, AppError> {
    let records = repo::list_by_user(state.store.as_ref(), &session.user_id, p.limit, p.offset).await?;
    Ok(Json(records.into_iter().map(HistoryItem::from).collect()))
}
