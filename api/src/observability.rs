use anyhow::Result;
use prometheus::Registry;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::metrics;

pub const METRICS_PREFIX: &str = "channel_intake";

pub struct Observability {
    pub registry: Registry,
}

impl Observability {
    /// Install the global tracing subscriber and build the metrics registry.
    ///
    /// `LOG_FORMAT=json` switches to JSON lines; `RUST_LOG` overrides the
    /// default filter.
    pub fn init() -> Result<Self> {
        let registry = new_registry()?;

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "api=info,tower_http=info".into());
        let json = std::env::var("LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if json {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()?;
        } else {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .try_init()?;
        }

        tracing::info!(json, "Observability initialized (Prometheus prefix {})", METRICS_PREFIX);
        Ok(Self { registry })
    }
}

/// A registry carrying every service metric under the service prefix
pub fn new_registry() -> prometheus::Result<Registry> {
    let registry = Registry::new_custom(Some(METRICS_PREFIX.into()), None)?;
    metrics::register_all(&registry)?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        let registry = new_registry().unwrap();
        metrics::observe_admission("committed");
        let families = registry.gather();
        assert!(!families.is_empty());
    }

    #[test]
    fn test_metric_names_prefixed() {
        let registry = new_registry().unwrap();
        metrics::observe_http("GET", "/", 200, 0.001);
        for fam in registry.gather() {
            assert!(
                fam.get_name().starts_with("channel_intake_"),
                "metric {} missing prefix",
                fam.get_name()
            );
        }
    }
}
