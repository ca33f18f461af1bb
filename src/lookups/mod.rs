mod dto;
pub mod handlers;
pub mod plate;
pub mod render;
pub mod repo;
pub mod vehicle_api;
pub mod workflow;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::lookup_routes())
}
