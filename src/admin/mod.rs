pub mod credentials;
mod dto;
pub mod handlers;
pub mod session;

pub use credentials::AdminCredentials;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::admin_routes())
}
