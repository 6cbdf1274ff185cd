//! Prometheus counters for proposals and cosigns, labelled by outcome
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

pub struct ApiMetrics {
    registry: Registry,
    proposals: IntCounterVec,
    cosigns: IntCounterVec,
}

impl ApiMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let proposals = IntCounterVec::new(
            Opts::new("srcverify_proposals_total", "Proposals by outcome"),
            &["outcome"],
        )?;
        let cosigns = IntCounterVec::new(
            Opts::new("srcverify_cosigns_total", "Cosign requests by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(proposals.clone()))?;
        registry.register(Box::new(cosigns.clone()))?;
        Ok(Self {
            registry,
            proposals,
            cosigns,
        })
    }

    /// `outcome` is `signed`, `not_verified` or an error code
    pub fn record_proposal(&self, outcome: &str) {
        self.proposals.with_label_values(&[outcome]).inc();
    }

    pub fn record_cosign(&self, outcome: &str) {
        self.cosigns.with_label_values(&[outcome]).inc();
    }

    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}
