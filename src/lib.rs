use diesel::{pg::PgConnection, r2d2::ConnectionManager};

pub mod cipher;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod rate_limit;
pub mod schema;
pub mod store;
pub mod validation;

pub type Pool = r2d2::Pool<ConnectionManager<PgConnection>>;

/// Shared application state, built once in main and handed to actix.
pub struct AppState {
    pub store: store::OneTimeStore<store::PgBackend>,
    pub limiter: rate_limit::RateLimiter,
}
