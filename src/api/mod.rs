pub mod auth;
pub mod error;
mod users;
mod validation;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Login and registration are public; the user routes authenticate
    // through the `AuthenticatedUser` extractor
    let auth_routes = Router::new()
        .route("/", post(auth::login).get(users::list_users))
        .route("/register", post(auth::register))
        .route("/logout", post(auth::logout))
        .route(
            "/:id",
            put(users::update_profile).delete(users::delete_profile),
        );

    Router::new()
        .route("/health", get(health_check))
        .nest("/auth", auth_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
