//! External collaborators of the controller
//!
//! The compiler toolchains, the content-addressed store and the chain reader
//! live outside this crate. The controller only talks to them through these
//! traits.
use crate::data_model::{CompileRequest, CompileResult, SourceFile, VerifierSetConfig};
use crate::error::VerifierResult;
use async_trait::async_trait;
use srcverify_cell::Address;

/// Compiles sources and compares the result with a deployed contract.
#[async_trait]
pub trait SourceCompiler: Send + Sync {
    async fn verify(&self, request: &CompileRequest) -> VerifierResult<CompileResult>;
}

/// Content-addressed storage: identical bytes always yield the same pointer.
#[async_trait]
pub trait ContentStorage: Send + Sync {
    /// Store source files, returning one pointer per file in order.
    async fn write(&self, files: &[SourceFile], pin: bool) -> VerifierResult<Vec<String>>;

    /// Store raw buffers, returning one pointer per buffer in order.
    async fn write_from_content(&self, buffers: &[Vec<u8>], pin: bool) -> VerifierResult<Vec<String>>;

    async fn read(&self, pointer: &str) -> VerifierResult<Vec<u8>>;
}

/// Read-only view of on-chain verifier state.
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn verifier_set_config(
        &self,
        verifier_id: &str,
        sources_registry: &Address,
    ) -> VerifierResult<VerifierSetConfig>;

    async fn is_already_attested(&self, code_hash: &[u8; 32], verifier_id: &str) -> VerifierResult<bool>;
}
