// libs/auth-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn auth_routes(state: Arc<AppConfig>) -> Router {
    let public_routes = Router::new()
        .route("/validate", post(handlers::validate))
        .route("/verify", post(handlers::verify));

    Router::new().merge(public_routes).with_state(state)
}

pub fn admin_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/promote-user/{user_id}", put(handlers::promote_user))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
