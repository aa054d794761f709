//! Bot filtering in front of the admission pipeline.
//!
//! `RiskScoreGate` asks a `RiskOracle` for a score and applies a threshold.
//! An unconfigured gate lets everything through (development mode); a
//! configured gate that cannot get a clean answer rejects.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::metrics;

pub const DEFAULT_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";
pub const DEFAULT_THRESHOLD: f64 = 0.5;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum RiskError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),
    #[error("Oracle returned HTTP {0}")]
    UpstreamStatus(u16),
    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
    #[error("Oracle timeout")]
    Timeout,
}

/// What the oracle said about a token
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OracleVerdict {
    pub success: bool,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default, rename = "error-codes")]
    pub error_codes: Vec<String>,
}

/// External bot-detection service
#[async_trait]
pub trait RiskOracle: Send + Sync {
    async fn verify(&self, token: &str, origin: Option<&str>) -> Result<OracleVerdict, RiskError>;
}

/// reCAPTCHA v3 siteverify client
pub struct RecaptchaOracle {
    secret: String,
    verify_url: String,
    client: reqwest::Client,
}

impl RecaptchaOracle {
    /// Fails only if the HTTP client cannot be built (TLS backend init).
    pub fn new(secret: String, verify_url: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::ClientBuilder::new().timeout(timeout).build()?;

        Ok(Self {
            secret,
            verify_url,
            client,
        })
    }
}

#[async_trait]
impl RiskOracle for RecaptchaOracle {
    async fn verify(&self, token: &str, origin: Option<&str>) -> Result<OracleVerdict, RiskError> {
        let mut form = vec![("secret", self.secret.as_str()), ("response", token)];
        if let Some(ip) = origin {
            form.push(("remoteip", ip));
        }

        let response = self
            .client
            .post(&self.verify_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RiskError::Timeout
                } else {
                    RiskError::RequestFailed(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(RiskError::UpstreamStatus(response.status().as_u16()));
        }

        response.json::<OracleVerdict>().await.map_err(|e| {
            if e.is_timeout() {
                RiskError::Timeout
            } else {
                RiskError::InvalidResponse(e.to_string())
            }
        })
    }
}

/// How a decision was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskMode {
    /// No credential configured, nothing was checked
    Bypassed,
    /// The oracle answered and the threshold was applied
    Scored,
    /// The oracle could not be consulted or answered garbage
    Failed,
}

impl RiskMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskMode::Bypassed => "bypassed",
            RiskMode::Scored => "scored",
            RiskMode::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskDecision {
    pub accepted: bool,
    pub score: f64,
    pub mode: RiskMode,
}

impl RiskDecision {
    fn bypassed() -> Self {
        Self {
            accepted: true,
            score: 1.0,
            mode: RiskMode::Bypassed,
        }
    }

    fn failed() -> Self {
        Self {
            accepted: false,
            score: 0.0,
            mode: RiskMode::Failed,
        }
    }
}

/// Threshold decision over an optional oracle
#[derive(Clone)]
pub struct RiskScoreGate {
    oracle: Option<Arc<dyn RiskOracle>>,
    threshold: f64,
    timeout: Duration,
}

impl RiskScoreGate {
    pub fn new(oracle: Arc<dyn RiskOracle>, threshold: f64, timeout: Duration) -> Self {
        Self {
            oracle: Some(oracle),
            threshold,
            timeout,
        }
    }

    /// Gate with no credential: every token passes
    pub fn unconfigured() -> Self {
        Self {
            oracle: None,
            threshold: DEFAULT_THRESHOLD,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.oracle.is_some()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Decide on a token. Never errors: failures become a closed decision.
    pub async fn check(&self, token: &str, origin: Option<&str>) -> RiskDecision {
        let Some(oracle) = &self.oracle else {
            warn!("risk oracle not configured, skipping verification");
            metrics::observe_risk_decision(RiskMode::Bypassed.as_str(), None);
            return RiskDecision::bypassed();
        };

        let started = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, oracle.verify(token, origin)).await;
        let elapsed = started.elapsed().as_secs_f64();

        let decision = match outcome {
            Err(_) => {
                error!(timeout_secs = self.timeout.as_secs_f64(), "risk oracle timed out");
                RiskDecision::failed()
            }
            Ok(Err(e)) => {
                error!(error = %e, "risk oracle call failed");
                RiskDecision::failed()
            }
            Ok(Ok(verdict)) => self.apply_threshold(&verdict),
        };

        metrics::observe_risk_decision(decision.mode.as_str(), Some(elapsed));
        decision
    }

    fn apply_threshold(&self, verdict: &OracleVerdict) -> RiskDecision {
        if !verdict.success {
            warn!(error_codes = ?verdict.error_codes, "risk oracle reported failure");
            return RiskDecision {
                accepted: false,
                score: 0.0,
                mode: RiskMode::Scored,
            };
        }

        // A successful answer without a score counts as the lowest score
        let score = verdict.score.unwrap_or(0.0);
        if !(0.0..=1.0).contains(&score) {
            error!(score, "risk oracle returned a score outside [0, 1]");
            return RiskDecision::failed();
        }

        let accepted = score >= self.threshold;
        if accepted {
            info!(score, "risk check passed");
        } else {
            debug!(score, threshold = self.threshold, "risk score below threshold");
        }

        RiskDecision {
            accepted,
            score,
            mode: RiskMode::Scored,
        }
    }
}
