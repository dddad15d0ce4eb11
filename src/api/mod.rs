pub mod health;
pub mod investors;
pub mod state;

use crate::config::Config;
use crate::db::Repository;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Config,
}

impl AppState {
    pub fn new(repo: Arc<Repository>, config: Config) -> Self {
        Self { repo, config }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/state", get(state::get_state))
        .route("/v1/positions", get(state::get_positions))
        .route("/v1/investors", get(investors::list_investors))
        .route("/v1/investors/:chat_id", get(investors::get_investor))
        .layer(cors)
        .with_state(state)
}
