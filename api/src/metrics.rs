use once_cell::sync::Lazy;
use prometheus::{opts, Encoder, HistogramOpts, HistogramVec, IntCounterVec, Registry, TextEncoder};

macro_rules! counter_vec {
    ($name:expr, $help:expr, $labels:expr) => {
        Lazy::new(|| IntCounterVec::new(opts!($name, $help), $labels).unwrap())
    };
}
macro_rules! histogram_vec {
    ($name:expr, $help:expr, $labels:expr, $buckets:expr) => {
        Lazy::new(|| {
            HistogramVec::new(HistogramOpts::new($name, $help).buckets($buckets.to_vec()), $labels)
                .unwrap()
        })
    };
}

const LATENCY_BUCKETS: [f64; 14] = [
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
];

/// Risk calls are bounded by a few seconds; finer resolution near the bound
const RISK_BUCKETS: [f64; 10] = [0.05, 0.1, 0.25, 0.5, 0.75, 1.0, 2.0, 3.0, 4.0, 5.0];

// ── HTTP ────────────────────────────────────────────────────────────────────
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> =
    counter_vec!("http_requests_total", "Total HTTP requests", &["method", "path", "status"]);
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = histogram_vec!(
    "http_request_duration_seconds",
    "HTTP request latency",
    &["method", "path"],
    LATENCY_BUCKETS
);

// ── Admission ───────────────────────────────────────────────────────────────
pub static ADMISSIONS_TOTAL: Lazy<IntCounterVec> =
    counter_vec!("admissions_total", "Admission pipeline outcomes", &["outcome"]);
pub static ADMISSION_REJECTIONS: Lazy<IntCounterVec> = counter_vec!(
    "admission_rejections_total",
    "Admission rejections by stage",
    &["stage"]
);

// ── Risk gate ───────────────────────────────────────────────────────────────
pub static RISK_GATE_DECISIONS: Lazy<IntCounterVec> =
    counter_vec!("risk_gate_decisions_total", "Risk gate decisions", &["mode"]);
pub static RISK_GATE_LATENCY: Lazy<HistogramVec> = histogram_vec!(
    "risk_gate_latency_seconds",
    "Risk oracle call latency",
    &["mode"],
    RISK_BUCKETS
);

pub fn register_all(r: &Registry) -> prometheus::Result<()> {
    r.register(Box::new(HTTP_REQUESTS_TOTAL.clone()))?;
    r.register(Box::new(HTTP_REQUEST_DURATION.clone()))?;
    r.register(Box::new(ADMISSIONS_TOTAL.clone()))?;
    r.register(Box::new(ADMISSION_REJECTIONS.clone()))?;
    r.register(Box::new(RISK_GATE_DECISIONS.clone()))?;
    r.register(Box::new(RISK_GATE_LATENCY.clone()))?;
    Ok(())
}

pub fn gather_metrics(r: &Registry) -> String {
    let encoder = TextEncoder::new();
    let families = r.gather();
    let mut buf = Vec::new();
    encoder.encode(&families, &mut buf).unwrap_or_default();
    String::from_utf8(buf).unwrap_or_default()
}

pub fn observe_http(method: &str, path: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION
        .with_label_values(&[method, path])
        .observe(duration_secs);
}

pub fn observe_admission(outcome: &str) {
    ADMISSIONS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn observe_rejection_stage(stage: &str) {
    ADMISSION_REJECTIONS.with_label_values(&[stage]).inc();
}

pub fn observe_risk_decision(mode: &str, duration_secs: Option<f64>) {
    RISK_GATE_DECISIONS.with_label_values(&[mode]).inc();
    if let Some(secs) = duration_secs {
        RISK_GATE_LATENCY.with_label_values(&[mode]).observe(secs);
    }
}
