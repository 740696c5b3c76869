use axum::{Router, routing::get};

pub mod counts;
pub mod drafts;
pub mod history;
pub mod products;
pub mod reports;
pub mod staff;
pub mod stock;
pub mod system;
pub mod transfers;
pub mod users;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/stream", get(system::stream))
        .route("/history", get(history::list_history))
        .nest("/products", products::router())
        .nest("/stock", stock::router())
        .nest("/transfers", transfers::router().merge(drafts::router()))
        .nest("/counts", counts::router())
        .nest("/reports", reports::router())
        .nest("/staff", staff::router())
        .nest("/users", users::router())
}
