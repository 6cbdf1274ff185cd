//! Chain reader backed by static configuration
use crate::collaborators::ChainReader;
use crate::data_model::VerifierSetConfig;
use crate::error::VerifierResult;
use async_trait::async_trait;
use srcverify_cell::Address;
use std::collections::HashSet;
use std::sync::RwLock;

/// Serves one verifier set and a set of already attested code hashes.
///
/// Stands in for a live node reader in tests and offline deployments.
#[derive(Debug)]
pub struct StaticChainReader {
    config: RwLock<VerifierSetConfig>,
    attested: RwLock<HashSet<[u8; 32]>>,
}

impl StaticChainReader {
    pub fn new(config: VerifierSetConfig) -> Self {
        Self {
            config: RwLock::new(config),
            attested: RwLock::new(HashSet::new()),
        }
    }

    pub fn with_attested(self, code_hashes: impl IntoIterator<Item = [u8; 32]>) -> Self {
        if let Ok(mut attested) = self.attested.write() {
            attested.extend(code_hashes);
        }
        self
    }

    /// Swap the verifier set, as a registry update on chain would.
    pub fn set_config(&self, config: VerifierSetConfig) {
        if let Ok(mut current) = self.config.write() {
            *current = config;
        }
    }

    pub fn mark_attested(&self, code_hash: [u8; 32]) {
        if let Ok(mut attested) = self.attested.write() {
            attested.insert(code_hash);
        }
    }
}

#[async_trait]
impl ChainReader for StaticChainReader {
    async fn verifier_set_config(
        &self,
        verifier_id: &str,
        sources_registry: &Address,
    ) -> VerifierResult<VerifierSetConfig> {
        tracing::debug!(verifier_id, %sources_registry, "reading verifier set");
        self.config
            .read()
            .map(|c| c.clone())
            .map_err(|_| crate::VerifierError::ChainReader("config lock poisoned".into()))
    }

    async fn is_already_attested(&self, code_hash: &[u8; 32], _verifier_id: &str) -> VerifierResult<bool> {
        self.attested
            .read()
            .map(|a| a.contains(code_hash))
            .map_err(|_| crate::VerifierError::ChainReader("attested lock poisoned".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_serves_latest_config() {
        let reader = StaticChainReader::new(VerifierSetConfig::new(2, vec![[1; 32], [2; 32]]));
        let registry = Address::new(0, [0; 32]);
        assert_eq!(reader.verifier_set_config("v", &registry).await.unwrap().quorum, 2);

        reader.set_config(VerifierSetConfig::new(3, vec![[1; 32], [2; 32], [3; 32]]));
        assert_eq!(reader.verifier_set_config("v", &registry).await.unwrap().quorum, 3);
    }

    #[tokio::test]
    async fn test_attested_hashes() {
        let reader = StaticChainReader::new(VerifierSetConfig::new(2, vec![])).with_attested([[9; 32]]);
        assert!(reader.is_already_attested(&[9; 32], "v").await.unwrap());
        assert!(!reader.is_already_attested(&[8; 32], "v").await.unwrap());
    }
}
