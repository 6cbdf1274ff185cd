//! Verifier context: identity, settings and time, fixed at startup
use crate::signing::Signer;
use chrono::{DateTime, TimeZone, Utc};
use sha2::{Digest, Sha256};
use srcverify_cell::Address;
use std::sync::Arc;

/// Who this verifier is. Built once from configuration and never mutated.
#[derive(Clone)]
pub struct VerifierIdentity {
    verifier_id: String,
    id_hash: [u8; 32],
    signer: Arc<dyn Signer>,
}

impl VerifierIdentity {
    pub fn new(verifier_id: impl Into<String>, signer: impl Signer + 'static) -> Self {
        let verifier_id = verifier_id.into();
        Self {
            id_hash: verifier_id_hash(&verifier_id),
            verifier_id,
            signer: Arc::new(signer),
        }
    }

    pub fn verifier_id(&self) -> &str {
        &self.verifier_id
    }

    pub fn id_hash(&self) -> &[u8; 32] {
        &self.id_hash
    }

    pub fn signer(&self) -> &dyn Signer {
        self.signer.as_ref()
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.signer.public_key_bytes()
    }
}

impl std::fmt::Debug for VerifierIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("VerifierIdentity")
            .field("verifier_id", &self.verifier_id)
            .field("public_key", &hex::encode(self.public_key()))
            .finish()
    }
}

/// SHA-256 of the verifier id string, as it appears in messages
pub fn verifier_id_hash(verifier_id: &str) -> [u8; 32] {
    Sha256::digest(verifier_id.as_bytes()).into()
}

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub sources_registry: Address,
    /// Seconds a proposed message stays valid
    pub message_ttl_secs: u32,
    /// Verification dates are rounded down to this many seconds
    pub timestamp_granularity_secs: u64,
    pub allow_reverification: bool,
}

impl ControllerSettings {
    pub fn new(sources_registry: Address) -> Self {
        Self {
            sources_registry,
            message_ttl_secs: 600,
            timestamp_granularity_secs: 3600,
            allow_reverification: false,
        }
    }
}

/// Round `now` down to a multiple of `granularity_secs` (no rounding for 0).
pub fn round_down(now: DateTime<Utc>, granularity_secs: u64) -> DateTime<Utc> {
    if granularity_secs == 0 {
        return now;
    }
    let secs = now.timestamp();
    let granularity = granularity_secs as i64;
    let rounded = secs - secs.rem_euclid(granularity);
    Utc.timestamp_opt(rounded, 0).single().unwrap_or(now)
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
