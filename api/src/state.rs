use std::sync::Arc;
use std::time::Instant;

use prometheus::Registry;

use crate::admission::AdmissionPipeline;
use crate::risk::RiskScoreGate;
use crate::store::RegistrationStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: AdmissionPipeline,
    pub started_at: Instant,
    pub registry: Registry,
}

impl AppState {
    pub fn new(store: Arc<dyn RegistrationStore>, risk_gate: RiskScoreGate, registry: Registry) -> Self {
        Self {
            pipeline: AdmissionPipeline::new(store, risk_gate),
            started_at: Instant::now(),
            registry,
        }
    }

    pub fn store(&self) -> &Arc<dyn RegistrationStore> {
        self.pipeline.store()
    }
}
