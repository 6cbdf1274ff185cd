//! Service configuration (YAML)
//!
//! ```yaml
//! verifier_id: verifier.example
//! private_key: 0101...01            # hex Ed25519 seed, or SRCVERIFY_PRIVATE_KEY
//! sources_registry: "0:1111...11"
//! message_ttl_secs: 600
//! timestamp_granularity_secs: 3600
//! allow_reverification: false
//! listen_addr: 0.0.0.0:8787
//! storage_dir: ./data/objects
//! compiler_command: ["srcverify-compile"]
//! multisig:
//!   quorum: 3
//!   verifiers: [aa.., bb.., cc..]
//!   attested_code_hashes: []
//! ```
use crate::context::{ControllerSettings, VerifierIdentity};
use crate::data_model::{decode_code_hash, VerifierSetConfig};
use crate::error::{VerifierError, VerifierResult};
use crate::signing::Ed25519Signer;
use serde::{Deserialize, Serialize};
use srcverify_cell::Address;
use std::path::{Path, PathBuf};

pub const CONFIG_PATH_ENV: &str = "SRCVERIFY_CONFIG";
pub const PRIVATE_KEY_ENV: &str = "SRCVERIFY_PRIVATE_KEY";
pub const LISTEN_ADDR_ENV: &str = "SRCVERIFY_ADDR";
pub const DEFAULT_CONFIG_PATH: &str = "srcverify.yaml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub verifier_id: String,
    #[serde(default, skip_serializing)]
    pub private_key: Option<String>,
    pub sources_registry: String,
    #[serde(default = "default_message_ttl")]
    pub message_ttl_secs: u32,
    #[serde(default = "default_granularity")]
    pub timestamp_granularity_secs: u64,
    #[serde(default)]
    pub allow_reverification: bool,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
    #[serde(default)]
    pub compiler_command: Vec<String>,
    pub multisig: MultisigSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultisigSection {
    pub quorum: u32,
    /// Hex-encoded Ed25519 public keys
    pub verifiers: Vec<String>,
    #[serde(default)]
    pub attested_code_hashes: Vec<String>,
}

fn default_message_ttl() -> u32 {
    600
}

fn default_granularity() -> u64 {
    3600
}

fn default_listen_addr() -> String {
    "0.0.0.0:8787".to_string()
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("./data/objects")
}

impl ServiceConfig {
    pub fn from_yaml(raw: &str) -> VerifierResult<Self> {
        serde_yaml::from_str(raw).map_err(|e| VerifierError::Config(format!("invalid config: {e}")))
    }

    pub fn load(path: &Path) -> VerifierResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| VerifierError::Config(format!("{}: {e}", path.display())))?;
        Self::from_yaml(&raw)
    }

    /// Load from `SRCVERIFY_CONFIG` (or the default path) and apply
    /// environment overrides.
    pub fn from_env() -> VerifierResult<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::load(Path::new(&path))?;
        if let Ok(key) = std::env::var(PRIVATE_KEY_ENV) {
            config.private_key = Some(key);
        }
        if let Ok(addr) = std::env::var(LISTEN_ADDR_ENV) {
            config.listen_addr = addr;
        }
        Ok(config)
    }

    pub fn identity(&self) -> VerifierResult<VerifierIdentity> {
        let key = self
            .private_key
            .as_deref()
            .ok_or_else(|| VerifierError::Config(format!("private_key missing (set {PRIVATE_KEY_ENV})")))?;
        let seed: [u8; 32] = hex::decode(key.trim())
            .ok()
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| VerifierError::Config("private_key must be 32 hex-encoded bytes".into()))?;
        Ok(VerifierIdentity::new(self.verifier_id.clone(), Ed25519Signer::from_seed(seed)))
    }

    pub fn settings(&self) -> VerifierResult<ControllerSettings> {
        let sources_registry: Address = self
            .sources_registry
            .parse()
            .map_err(|e| VerifierError::Config(format!("sources_registry: {e}")))?;
        Ok(ControllerSettings {
            sources_registry,
            message_ttl_secs: self.message_ttl_secs,
            timestamp_granularity_secs: self.timestamp_granularity_secs,
            allow_reverification: self.allow_reverification,
        })
    }

    pub fn verifier_set(&self) -> VerifierResult<VerifierSetConfig> {
        let verifiers = self
            .multisig
            .verifiers
            .iter()
            .map(|k| {
                hex::decode(k.trim())
                    .ok()
                    .and_then(|b| <[u8; 32]>::try_from(b).ok())
                    .ok_or_else(|| VerifierError::Config(format!("invalid verifier key {k}")))
            })
            .collect::<VerifierResult<Vec<_>>>()?;
        Ok(VerifierSetConfig::new(self.multisig.quorum, verifiers))
    }

    pub fn attested_code_hashes(&self) -> VerifierResult<Vec<[u8; 32]>> {
        self.multisig
            .attested_code_hashes
            .iter()
            .map(|h| decode_code_hash(h).ok_or_else(|| VerifierError::Config(format!("invalid code hash {h}"))))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
verifier_id: verifier.example
private_key: "0707070707070707070707070707070707070707070707070707070707070707"
sources_registry: "0:1111111111111111111111111111111111111111111111111111111111111111"
compiler_command: ["srcverify-compile", "--json"]
multisig:
  quorum: 2
  verifiers:
    - "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"
    - "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"
"#;

    #[test]
    fn test_defaults_and_conversion() {
        let config = ServiceConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.message_ttl_secs, 600);
        assert_eq!(config.timestamp_granularity_secs, 3600);
        assert_eq!(config.listen_addr, "0.0.0.0:8787");
        assert!(!config.allow_reverification);

        let settings = config.settings().unwrap();
        assert_eq!(settings.sources_registry, Address::new(0, [0x11; 32]));

        let set = config.verifier_set().unwrap();
        assert_eq!(set.quorum, 2);
        assert!(set.contains(&[0xbb; 32]));

        let identity = config.identity().unwrap();
        assert_eq!(identity.verifier_id(), "verifier.example");
        assert_eq!(
            identity.public_key(),
            crate::signing::Signer::public_key_bytes(&Ed25519Signer::from_seed([7; 32]))
        );
    }

    #[test]
    fn test_missing_private_key() {
        let mut config = ServiceConfig::from_yaml(SAMPLE).unwrap();
        config.private_key = None;
        assert!(matches!(config.identity(), Err(VerifierError::Config(_))));
    }

    #[test]
    fn test_bad_verifier_key() {
        let mut config = ServiceConfig::from_yaml(SAMPLE).unwrap();
        config.multisig.verifiers.push("zz".into());
        assert!(config.verifier_set().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("srcverify.yaml");
        std::fs::write(&path, SAMPLE).unwrap();
        assert_eq!(ServiceConfig::load(&path).unwrap().verifier_id, "verifier.example");
        assert!(ServiceConfig::load(&dir.path().join("missing.yaml")).is_err());
    }
}
