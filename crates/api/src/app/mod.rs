//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: ledger store selection and the realtime stream
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Router over an in-memory ledger (dev and tests).
pub fn build_app(jwt_secret: String) -> Router {
    build_router(services::AppServices::in_memory(), &jwt_secret)
}

/// Full HTTP router over the given services (public entrypoint used by `main.rs`).
pub fn build_router(services: services::AppServices, jwt_secret: &str) -> Router {
    let jwt = Arc::new(stockhouse_auth::Hs256JwtValidator::new(jwt_secret.as_bytes()));
    let auth_state = middleware::AuthState { jwt };

    // Protected routes: require a valid bearer token.
    let protected = routes::router()
        .layer(Extension(Arc::new(services)))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new())
}
