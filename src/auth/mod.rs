use axum::Router;

use crate::state::AppState;

pub mod dto;
pub mod extractor;
pub mod handlers;
pub mod password;
pub mod repo;
pub mod session;
pub mod token;

pub fn router() -> Router<AppState> {
    handlers::router()
}
