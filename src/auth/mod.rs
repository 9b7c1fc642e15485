use crate::state::AppState;
use axum::Router;

mod dto;
mod error;
pub(crate) mod extractors;
pub mod handlers;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod session;
pub mod tokens;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
