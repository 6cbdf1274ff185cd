//! Unified error model
use srcverify_cell::CellError;
use thiserror::Error;

/// Every failure surfaces with its own kind; nothing is collapsed into a
/// generic error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifierError {
    #[error("invalid cell: {0}")]
    InvalidCell(String),

    #[error("invalid operation {0:#010x}")]
    InvalidOperation(u32),

    #[error("invalid verifier id")]
    InvalidVerifierId,

    #[error("message expired at {expires_at} (now {now})")]
    MessageExpired { expires_at: u32, now: i64 },

    #[error("invalid sources registry address {0}")]
    InvalidSourcesRegistryAddress(String),

    #[error("invalid verifier body cell: {0}")]
    InvalidVerifierBodyCell(String),

    #[error("invalid sources registry body cell: {0}")]
    InvalidSourcesRegistryBodyCell(String),

    #[error("invalid deploy source op {0}")]
    InvalidDeploySourceOp(u32),

    #[error("invalid signature cell: {0}")]
    InvalidSignatureCell(String),

    #[error("invalid signature from {0}")]
    InvalidSignature(String),

    #[error("public key {0} is not in the multisig config")]
    NotInMultisigConfig(String),

    #[error("duplicate signature from {0}")]
    DuplicateSignature(String),

    #[error("message already signed by this verifier")]
    AlreadySignedBySelf,

    #[error("too many signatures: quorum is {quorum}")]
    TooManySignatures { quorum: u32 },

    #[error("multisig quorum must be greater than 1, got {0}")]
    QuorumTooSmall(u32),

    #[error("too many references in signature chain node")]
    TooManyReferences,

    #[error("code hash mismatch: expected {expected}, got {actual}")]
    CodeHashMismatch { expected: String, actual: String },

    #[error("invalid compilation result: {0}")]
    InvalidCompilationResult(String),

    #[error("contract {0} is already deployed")]
    AlreadyDeployed(String),

    #[error("invalid source record: {0}")]
    InvalidSourceRecord(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("STORAGE/{0}")]
    Storage(String),

    #[error("COMPILER/{0}")]
    Compiler(String),

    #[error("CHAIN/{0}")]
    ChainReader(String),

    #[error("CONFIG/{0}")]
    Config(String),
}

impl VerifierError {
    /// Stable machine-readable code for diagnostics and API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCell(_) => "INVALID_CELL",
            Self::InvalidOperation(_) => "INVALID_OPERATION",
            Self::InvalidVerifierId => "INVALID_VERIFIER_ID",
            Self::MessageExpired { .. } => "MESSAGE_EXPIRED",
            Self::InvalidSourcesRegistryAddress(_) => "INVALID_SOURCES_REGISTRY_ADDRESS",
            Self::InvalidVerifierBodyCell(_) => "INVALID_VERIFIER_BODY_CELL",
            Self::InvalidSourcesRegistryBodyCell(_) => "INVALID_SOURCES_REGISTRY_BODY_CELL",
            Self::InvalidDeploySourceOp(_) => "INVALID_DEPLOY_SOURCE_OP",
            Self::InvalidSignatureCell(_) => "INVALID_SIGNATURE_CELL",
            Self::InvalidSignature(_) => "INVALID_SIGNATURE",
            Self::NotInMultisigConfig(_) => "NOT_IN_MULTISIG_CONFIG",
            Self::DuplicateSignature(_) => "DUPLICATE_SIGNATURE",
            Self::AlreadySignedBySelf => "ALREADY_SIGNED_BY_SELF",
            Self::TooManySignatures { .. } => "TOO_MANY_SIGNATURES",
            Self::QuorumTooSmall(_) => "QUORUM_TOO_SMALL",
            Self::TooManyReferences => "TOO_MANY_REFERENCES",
            Self::CodeHashMismatch { .. } => "CODE_HASH_MISMATCH",
            Self::InvalidCompilationResult(_) => "INVALID_COMPILATION_RESULT",
            Self::AlreadyDeployed(_) => "ALREADY_DEPLOYED",
            Self::InvalidSourceRecord(_) => "INVALID_SOURCE_RECORD",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Storage(_) => "STORAGE",
            Self::Compiler(_) => "COMPILER",
            Self::ChainReader(_) => "CHAIN_READER",
            Self::Config(_) => "CONFIG",
        }
    }

    /// Failures of an external collaborator rather than of the caller's input
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(
            self,
            Self::Storage(_) | Self::Compiler(_) | Self::ChainReader(_) | Self::Config(_)
        )
    }
}

impl From<CellError> for VerifierError {
    fn from(err: CellError) -> Self {
        Self::InvalidCell(err.to_string())
    }
}

pub type VerifierResult<T> = Result<T, VerifierError>;
