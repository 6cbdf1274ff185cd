//! Multisig source attestation
//!
//! A verifier recompiles submitted contract sources, and when the result
//! reproduces the deployed code it signs a forward message for the sources
//! registry. Several key holders co-sign the same message until the verifier's
//! quorum is reached.
//!
//! - [`message`]: forward message layout and the strict validation cascade
//! - [`chain`]: the signature chain carried in the message
//! - [`multisig`]: chain validation against the verifier set
//! - [`controller`]: propose and cosign

pub mod chain;
pub mod chain_reader;
pub mod collaborators;
pub mod compiler;
pub mod config;
pub mod context;
pub mod controller;
pub mod data_model;
pub mod error;
pub mod message;
pub mod multisig;
pub mod signing;
pub mod storage;

pub use chain::{append_signature, build_chain, read_chain, SignatureEntry};
pub use chain_reader::StaticChainReader;
pub use collaborators::{ChainReader, ContentStorage, SourceCompiler};
pub use compiler::CommandCompiler;
pub use config::ServiceConfig;
pub use context::{verifier_id_hash, Clock, ControllerSettings, FixedClock, SystemClock, VerifierIdentity};
pub use controller::{AttestationController, CosignedMessage, ProposeRequest, Proposal, SignedProposal};
pub use data_model::*;
pub use error::{VerifierError, VerifierResult};
pub use message::{
    DeploySourcePayload, ForwardedMessage, MessageValidator, SignedPayload, ValidatedMessage, DEPLOY_SOURCE_OP, FORWARD_MESSAGE_OP,
};
pub use multisig::{MultisigValidator, ValidatedChain};
pub use signing::{Ed25519Signer, Ed25519Verifier, SignatureVerifier, Signer};
pub use storage::{content_pointer, FsStorage, MemoryStorage};
