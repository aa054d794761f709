pub mod admission;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod metrics_handler;
pub mod middleware;
pub mod observability;
pub mod rate_limit;
pub mod risk;
pub mod routes;
pub mod state;
pub mod store;
pub mod validation;
