//! Multisig validation of a signature chain
//!
//! Per node, in order: well-formed cell, valid Ed25519 signature over the
//! payload hash, signer in the verifier set, signer not seen before, chain not
//! longer than the quorum.
use crate::chain::{ChainWalker, SignatureEntry};
use crate::data_model::VerifierSetConfig;
use crate::error::{VerifierError, VerifierResult};
use crate::signing::SignatureVerifier;
use srcverify_cell::Cell;
use std::collections::HashSet;
use std::sync::Arc;

/// A chain that passed validation, signers in chain order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedChain {
    pub signers: Vec<[u8; 32]>,
    pub quorum: u32,
}

impl ValidatedChain {
    pub fn len(&self) -> usize {
        self.signers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signers.is_empty()
    }

    pub fn contains(&self, public_key: &[u8; 32]) -> bool {
        self.signers.iter().any(|k| k == public_key)
    }

    pub fn is_complete(&self) -> bool {
        self.signers.len() >= self.quorum as usize
    }

    /// Fails when the quorum is already reached and nothing may be appended.
    pub fn ensure_room(&self) -> VerifierResult<()> {
        if self.is_complete() {
            return Err(VerifierError::TooManySignatures {
                quorum: self.quorum,
            });
        }
        Ok(())
    }
}

pub struct MultisigValidator<'a> {
    config: &'a VerifierSetConfig,
    verifier: &'a dyn SignatureVerifier,
}

impl<'a> MultisigValidator<'a> {
    pub fn new(config: &'a VerifierSetConfig, verifier: &'a dyn SignatureVerifier) -> Self {
        Self { config, verifier }
    }

    /// Validate every signature of the chain starting at `head` against
    /// `message_hash`.
    pub fn validate(
        &self,
        head: Option<&Arc<Cell>>,
        message_hash: &[u8; 32],
    ) -> VerifierResult<ValidatedChain> {
        let quorum = self.config.quorum;
        if quorum <= 1 {
            return Err(VerifierError::QuorumTooSmall(quorum));
        }

        let mut seen: HashSet<[u8; 32]> = HashSet::new();
        let mut signers = Vec::new();
        for entry in ChainWalker::new(head) {
            let entry = entry?;
            self.check_entry(&entry, message_hash)?;
            if !seen.insert(entry.public_key) {
                return Err(VerifierError::DuplicateSignature(hex::encode(entry.public_key)));
            }
            signers.push(entry.public_key);
            if signers.len() > quorum as usize {
                return Err(VerifierError::TooManySignatures { quorum });
            }
        }

        tracing::debug!(signatures = signers.len(), quorum, "signature chain validated");
        Ok(ValidatedChain { signers, quorum })
    }

    fn check_entry(&self, entry: &SignatureEntry, message_hash: &[u8; 32]) -> VerifierResult<()> {
        if !self
            .verifier
            .verify(message_hash, &entry.signature, &entry.public_key)
        {
            return Err(VerifierError::InvalidSignature(hex::encode(entry.public_key)));
        }
        if !self.config.contains(&entry.public_key) {
            return Err(VerifierError::NotInMultisigConfig(hex::encode(entry.public_key)));
        }
        Ok(())
    }
}
