//! Forwarded message layout and the message validator
//!
//! ```text
//! root:  op:uint32 query_id:uint64  ^payload  ^signature_head
//! payload:  verifier_id_hash:bits256 expires_at:uint32 sender:MsgAddress
//!           sources_registry:MsgAddress  ^deploy_source
//! deploy_source:  op:uint32 query_id:uint64 verifier_id_hash:bits256
//!                 code_hash:uint256  ^(snake string content_pointer)
//! ```
//!
//! Every signature in the chain is over the representation hash of `payload`.
use crate::error::{VerifierError, VerifierResult};
use srcverify_cell::{Address, Cell, CellBuilder, CellError};
use std::sync::Arc;

/// Verifier registry operation that forwards a signed payload
pub const FORWARD_MESSAGE_OP: u32 = 0x7521_7758;

/// Sources registry operation that deploys a source item
pub const DEPLOY_SOURCE_OP: u32 = 1002;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploySourcePayload {
    pub query_id: u64,
    pub verifier_id_hash: [u8; 32],
    pub code_hash: [u8; 32],
    pub content_pointer: String,
}

impl DeploySourcePayload {
    pub fn to_cell(&self) -> VerifierResult<Cell> {
        let mut pointer = CellBuilder::new();
        pointer.store_snake_bytes(self.content_pointer.as_bytes())?;

        let mut b = CellBuilder::new();
        b.store_uint(u64::from(DEPLOY_SOURCE_OP), 32)?;
        b.store_uint(self.query_id, 64)?;
        b.store_bytes(&self.verifier_id_hash)?;
        b.store_bytes(&self.code_hash)?;
        b.store_reference(Arc::new(pointer.build()?))?;
        Ok(b.build()?)
    }
}

/// The signed part of a forwarded message. Signatures attest to its cell
/// hash, so it is never modified after the first signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPayload {
    pub verifier_id_hash: [u8; 32],
    pub expires_at: u32,
    pub sender: Address,
    pub sources_registry: Address,
    pub deploy_source: DeploySourcePayload,
}

impl SignedPayload {
    pub fn to_cell(&self) -> VerifierResult<Cell> {
        let mut b = CellBuilder::new();
        b.store_bytes(&self.verifier_id_hash)?;
        b.store_uint(u64::from(self.expires_at), 32)?;
        b.store_address(Some(&self.sender))?;
        b.store_address(Some(&self.sources_registry))?;
        b.store_reference(Arc::new(self.deploy_source.to_cell()?))?;
        Ok(b.build()?)
    }
}

/// Top-level message exchanged between verifiers.
#[derive(Debug, Clone)]
pub struct ForwardedMessage {
    pub op: u32,
    pub query_id: u64,
    pub payload: Arc<Cell>,
    pub signatures: Option<Arc<Cell>>,
}

impl ForwardedMessage {
    pub fn new(payload: Arc<Cell>, signatures: Arc<Cell>) -> Self {
        Self {
            op: FORWARD_MESSAGE_OP,
            query_id: 0,
            payload,
            signatures: Some(signatures),
        }
    }

    pub fn to_cell(&self) -> VerifierResult<Cell> {
        let mut b = CellBuilder::new();
        b.store_uint(u64::from(self.op), 32)?;
        b.store_uint(self.query_id, 64)?;
        b.store_reference(self.payload.clone())?;
        if let Some(signatures) = &self.signatures {
            b.store_reference(signatures.clone())?;
        }
        Ok(b.build()?)
    }

    pub fn to_boc(&self) -> VerifierResult<Vec<u8>> {
        Ok(self.to_cell()?.to_boc())
    }

    /// Representation hash of the payload, the bytes every signature covers
    pub fn payload_hash(&self) -> [u8; 32] {
        *self.payload.hash()
    }
}

/// Output of a successful [`MessageValidator::validate`].
#[derive(Debug, Clone)]
pub struct ValidatedMessage {
    pub root: Arc<Cell>,
    pub payload: Arc<Cell>,
    pub signatures: Option<Arc<Cell>>,
    pub payload_hash: [u8; 32],
    pub code_hash: [u8; 32],
    pub content_pointer: String,
    pub sender: Address,
    pub query_id: u64,
    pub expires_at: u32,
}

/// Checks a serialized forwarded message against this verifier's identity
/// and the configured sources registry.
#[derive(Debug, Clone)]
pub struct MessageValidator {
    verifier_id_hash: [u8; 32],
    sources_registry: Address,
}

impl MessageValidator {
    pub fn new(verifier_id_hash: [u8; 32], sources_registry: Address) -> Self {
        Self {
            verifier_id_hash,
            sources_registry,
        }
    }

    /// Decode and check a message. `now` is unix seconds.
    ///
    /// Checks run in a fixed order and the first failure is returned.
    pub fn validate(&self, bytes: &[u8], now: i64) -> VerifierResult<ValidatedMessage> {
        let root = Cell::from_boc(bytes).map_err(|e| VerifierError::InvalidCell(e.to_string()))?;
        if root.refs().len() < 2 {
            return Err(VerifierError::InvalidCell(format!(
                "expected 2 references, got {}",
                root.refs().len()
            )));
        }

        let mut slice = root.parse();
        let op = slice
            .load_uint(32)
            .map_err(|e| VerifierError::InvalidCell(e.to_string()))? as u32;
        if op != FORWARD_MESSAGE_OP {
            return Err(VerifierError::InvalidOperation(op));
        }
        slice
            .load_uint(64)
            .map_err(|e| VerifierError::InvalidCell(e.to_string()))?;

        let payload = slice.load_reference()?.clone();
        let signatures = slice.load_reference().ok().cloned();

        let body = read_payload_body(&payload).map_err(|e| VerifierError::InvalidVerifierBodyCell(e.to_string()))?;
        if body.verifier_id_hash != self.verifier_id_hash {
            return Err(VerifierError::InvalidVerifierId);
        }
        if i64::from(body.expires_at) <= now {
            return Err(VerifierError::MessageExpired {
                expires_at: body.expires_at,
                now,
            });
        }
        if body.sources_registry != self.sources_registry {
            return Err(VerifierError::InvalidSourcesRegistryAddress(
                body.sources_registry.to_string(),
            ));
        }

        let deploy = read_deploy_source(&body.deploy_source)
            .map_err(|e| VerifierError::InvalidSourcesRegistryBodyCell(e.to_string()))?;
        if deploy.op != DEPLOY_SOURCE_OP {
            return Err(VerifierError::InvalidDeploySourceOp(deploy.op));
        }
        if deploy.verifier_id_hash != self.verifier_id_hash {
            return Err(VerifierError::InvalidVerifierId);
        }
        let content_pointer = String::from_utf8(deploy.content_pointer).map_err(|_| {
            VerifierError::InvalidSourcesRegistryBodyCell("content pointer is not utf-8".into())
        })?;

        Ok(ValidatedMessage {
            payload_hash: *payload.hash(),
            root,
            payload,
            signatures,
            code_hash: deploy.code_hash,
            content_pointer,
            sender: body.sender,
            query_id: deploy.query_id,
            expires_at: body.expires_at,
        })
    }
}

struct PayloadBody {
    verifier_id_hash: [u8; 32],
    expires_at: u32,
    sender: Address,
    sources_registry: Address,
    deploy_source: Arc<Cell>,
}

fn read_payload_body(cell: &Cell) -> Result<PayloadBody, CellError> {
    let mut s = cell.parse();
    let verifier_id_hash = s.load_array::<32>()?;
    let expires_at = s.load_uint(32)? as u32;
    let sender = s
        .load_address()?
        .ok_or_else(|| CellError::InvalidAddress("sender is addr_none".into()))?;
    let sources_registry = s
        .load_address()?
        .ok_or_else(|| CellError::InvalidAddress("sources registry is addr_none".into()))?;
    let deploy_source = s.load_reference()?.clone();
    Ok(PayloadBody {
        verifier_id_hash,
        expires_at,
        sender,
        sources_registry,
        deploy_source,
    })
}

struct DeploySourceBody {
    op: u32,
    query_id: u64,
    verifier_id_hash: [u8; 32],
    code_hash: [u8; 32],
    content_pointer: Vec<u8>,
}

fn read_deploy_source(cell: &Cell) -> Result<DeploySourceBody, CellError> {
    let mut s = cell.parse();
    let op = s.load_uint(32)? as u32;
    let query_id = s.load_uint(64)?;
    let verifier_id_hash = s.load_array::<32>()?;
    let code_hash = s.load_array::<32>()?;
    let content_pointer = s.load_reference()?.parse().load_snake_bytes()?;
    Ok(DeploySourceBody {
        op,
        query_id,
        verifier_id_hash,
        code_hash,
        content_pointer,
    })
}
