use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use axum::{
    body::Body,
    extract::{connect_info::ConnectInfo, MatchedPath, State},
    http::{header::RETRY_AFTER, HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::config::AppConfig;

const DEFAULT_REGISTRATIONS_PER_HOUR: u32 = 5;
const DEFAULT_API_PER_MINUTE: u32 = 60;
const DEFAULT_HEALTH_PER_MINUTE: u32 = 10_000;
const REGISTRATION_WINDOW: Duration = Duration::from_secs(3600);
const API_WINDOW: Duration = Duration::from_secs(60);

const REGISTER_ENDPOINT_KEY: &str = "POST_API_V1_REGISTER";
const HEALTH_PATHS: [&str; 5] = [
    "/",
    "/api/v1/health",
    "/api/v1/register/health",
    "/api/v1/networks/health",
    "/metrics",
];

const HEADER_RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const HEADER_RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const HEADER_RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

#[derive(Clone)]
pub struct RateLimitState {
    config: Arc<RateLimitConfig>,
    buckets: Arc<Mutex<HashMap<BucketKey, BucketState>>>,
}

impl RateLimitState {
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(RateLimitConfig::from_app_config(config))
    }

    fn new(config: RateLimitConfig) -> Self {
        Self {
            config: Arc::new(config),
            buckets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn check_request<B>(&self, request: &Request<B>) -> RateLimitDecision {
        let (rule, endpoint_key) = self.select_rule(request);
        let ip = extract_client_ip(request).unwrap_or_else(|| "unknown".to_string());
        let key = BucketKey { ip, endpoint_key };
        let now = Instant::now();

        // A panic while holding the lock cannot leave a counter half-updated
        let mut buckets = self
            .buckets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let bucket = buckets.entry(key).or_insert_with(|| BucketState {
            window_start: now,
            count: 0,
        });

        if now.duration_since(bucket.window_start) >= rule.window {
            bucket.window_start = now;
            bucket.count = 0;
        }

        let remaining_window = rule
            .window
            .saturating_sub(now.duration_since(bucket.window_start));
        let reset_seconds = ceil_duration_to_seconds(remaining_window).max(1);

        if bucket.count >= rule.limit {
            return RateLimitDecision {
                allowed: false,
                limit: rule.limit,
                remaining: 0,
                reset_seconds,
            };
        }

        bucket.count += 1;

        RateLimitDecision {
            allowed: true,
            limit: rule.limit,
            remaining: rule.limit.saturating_sub(bucket.count),
            reset_seconds,
        }
    }

    fn select_rule<B>(&self, request: &Request<B>) -> (Rule, String) {
        let method = request.method();
        let matched_path = request
            .extensions()
            .get::<MatchedPath>()
            .map(|p| p.as_str())
            .unwrap_or_else(|| request.uri().path());
        let endpoint_key = endpoint_key(method, matched_path);

        if endpoint_key == REGISTER_ENDPOINT_KEY {
            return (self.config.registration, endpoint_key);
        }

        if HEALTH_PATHS.contains(&matched_path) || method == Method::OPTIONS {
            return (self.config.health, endpoint_key);
        }

        (self.config.api, endpoint_key)
    }
}

#[derive(Debug, Clone, Copy)]
struct Rule {
    limit: u32,
    window: Duration,
}

struct RateLimitConfig {
    registration: Rule,
    api: Rule,
    health: Rule,
}

impl RateLimitConfig {
    fn from_app_config(config: &AppConfig) -> Self {
        let registrations = nonzero_or(
            "RATE_LIMIT_REGISTRATIONS_PER_HOUR",
            config.rate_limit_registrations_per_hour,
            DEFAULT_REGISTRATIONS_PER_HOUR,
        );
        let api = nonzero_or(
            "RATE_LIMIT_API_PER_MINUTE",
            config.rate_limit_api_per_minute,
            DEFAULT_API_PER_MINUTE,
        );

        tracing::info!(
            registrations_per_hour = registrations,
            api_per_minute = api,
            health_per_minute = DEFAULT_HEALTH_PER_MINUTE,
            "Rate limiter configured"
        );

        Self {
            registration: Rule {
                limit: registrations,
                window: REGISTRATION_WINDOW,
            },
            api: Rule {
                limit: api,
                window: API_WINDOW,
            },
            health: Rule {
                limit: DEFAULT_HEALTH_PER_MINUTE,
                window: API_WINDOW,
            },
        }
    }

    #[cfg(test)]
    fn for_tests(registration_limit: u32, api_limit: u32, health_limit: u32, window: Duration) -> Self {
        Self {
            registration: Rule {
                limit: registration_limit,
                window,
            },
            api: Rule {
                limit: api_limit,
                window,
            },
            health: Rule {
                limit: health_limit,
                window,
            },
        }
    }
}

#[derive(Hash, Eq, PartialEq)]
struct BucketKey {
    ip: String,
    endpoint_key: String,
}

struct BucketState {
    window_start: Instant,
    count: u32,
}

struct RateLimitDecision {
    allowed: bool,
    limit: u32,
    remaining: u32,
    reset_seconds: u64,
}

pub async fn rate_limit_middleware(
    State(rate_limiter): State<RateLimitState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let decision = rate_limiter.check_request(&request);

    if !decision.allowed {
        tracing::warn!(
            path = %request.uri().path(),
            limit = decision.limit,
            "Rate limit exceeded"
        );
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": "RateLimitExceeded",
                "message": "Too many requests. Please try again later.",
                "code": 429
            })),
        )
            .into_response();
        attach_rate_limit_headers(&mut response, &decision);
        response.headers_mut().insert(
            RETRY_AFTER,
            HeaderValue::from_str(&decision.reset_seconds.to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("1")),
        );
        return response;
    }

    let mut response = next.run(request).await;
    attach_rate_limit_headers(&mut response, &decision);
    response
}

fn attach_rate_limit_headers(response: &mut Response, decision: &RateLimitDecision) {
    response.headers_mut().insert(
        HEADER_RATE_LIMIT_LIMIT,
        HeaderValue::from_str(&decision.limit.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("0")),
    );
    response.headers_mut().insert(
        HEADER_RATE_LIMIT_REMAINING,
        HeaderValue::from_str(&decision.remaining.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("0")),
    );
    response.headers_mut().insert(
        HEADER_RATE_LIMIT_RESET,
        HeaderValue::from_str(&decision.reset_seconds.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("1")),
    );
}

fn extract_client_ip<B>(request: &Request<B>) -> Option<String> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|connect_info| connect_info.0);
    client_ip(request.headers(), peer)
}

/// Client address: first valid `x-forwarded-for` entry, then `x-real-ip`,
/// then the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    if let Some(ip) = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(parse_x_forwarded_for)
    {
        return Some(ip.to_string());
    }

    if let Some(ip) = headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .and_then(parse_ip_addr)
    {
        return Some(ip.to_string());
    }

    peer.map(|addr| addr.ip().to_string())
}

fn parse_x_forwarded_for(raw: &str) -> Option<IpAddr> {
    raw.split(',').map(str::trim).find_map(parse_ip_addr)
}

fn parse_ip_addr(raw: &str) -> Option<IpAddr> {
    raw.parse::<IpAddr>()
        .ok()
        .or_else(|| raw.parse::<SocketAddr>().ok().map(|addr| addr.ip()))
}

fn endpoint_key(method: &Method, path: &str) -> String {
    let normalized_path = path
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect::<String>();

    let compact_path = normalized_path
        .split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_");

    if compact_path.is_empty() {
        format!("{}_ROOT", method.as_str().to_ascii_uppercase())
    } else {
        format!("{}_{}", method.as_str().to_ascii_uppercase(), compact_path)
    }
}

fn nonzero_or(key: &str, value: u32, default: u32) -> u32 {
    if value == 0 {
        tracing::warn!("Zero value for {key}, using default {default}");
        default
    } else {
        value
    }
}

fn ceil_duration_to_seconds(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}
