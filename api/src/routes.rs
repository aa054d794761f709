use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers, metrics_handler,
    middleware::{request_logger, security_headers},
    rate_limit::{rate_limit_middleware, RateLimitState},
    state::AppState,
};

pub fn observability_routes() -> Router<AppState> {
    Router::new().route("/metrics", get(metrics_handler::metrics_endpoint))
}

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::root))
        .route("/api/v1/health", get(handlers::health_check))
}

pub fn registration_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/register", post(handlers::register_channels))
        .route("/api/v1/register/", post(handlers::register_channels))
        .route("/api/v1/register/health", get(handlers::registration_health))
}

pub fn network_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/networks/mappings", get(handlers::network_currency_mappings))
        .route("/api/v1/networks/list", get(handlers::list_networks))
        .route("/api/v1/networks/currencies", get(handlers::list_currencies))
        .route("/api/v1/networks/health", get(handlers::networks_health))
}

pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|origin| origin == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(parse_origins(origins))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}

fn parse_origins(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect()
}

/// The full application. `rate_limit = None` disables rate limiting.
pub fn app(state: AppState, rate_limit: Option<RateLimitState>, cors_origins: &[String]) -> Router {
    let mut router = Router::new()
        .merge(health_routes())
        .merge(registration_routes())
        .merge(network_routes())
        .merge(observability_routes())
        .fallback(handlers::route_not_found)
        .layer(middleware::from_fn(request_logger));

    if let Some(limiter) = rate_limit {
        router = router.layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
    }

    router
        .layer(middleware::from_fn(security_headers))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
