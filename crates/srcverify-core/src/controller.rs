//! Attestation controller: propose and cosign
//!
//! `propose` compiles submitted sources, stores them with a source record and
//! returns a forward message carrying this verifier's signature. `cosign`
//! re-derives everything from storage, recompiles, checks the existing
//! signature chain against the live verifier set and appends one signature.
use crate::chain::{append_signature, SignatureEntry};
use crate::collaborators::{ChainReader, ContentStorage, SourceCompiler};
use crate::context::{round_down, Clock, ControllerSettings, SystemClock, VerifierIdentity};
use crate::data_model::{
    decode_code_hash, encode_code_hash, CompileRequest, CompileResult, CompilerKind, CompilerSettings,
    SourceFile, SourceRecord, SourceRecordFile,
};
use crate::error::{VerifierError, VerifierResult};
use crate::message::{DeploySourcePayload, ForwardedMessage, MessageValidator, SignedPayload};
use crate::multisig::MultisigValidator;
use crate::signing::{Ed25519Verifier, SignatureVerifier};
use serde::{Deserialize, Serialize};
use srcverify_cell::{Address, Cell};
use std::sync::Arc;

/// Sources submitted for a first attestation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposeRequest {
    pub compiler: CompilerKind,
    #[serde(default)]
    pub compiler_settings: CompilerSettings,
    pub sources: Vec<SourceFile>,
    pub known_contract_address: String,
    pub known_contract_hash: String,
    /// Wallet that will send the forward message on chain
    pub sender_address: String,
}

#[derive(Debug, Clone)]
pub enum Proposal {
    /// The compiler did not reproduce the deployed code. Nothing was stored
    /// and nothing was signed.
    NotVerified(CompileResult),
    Signed(SignedProposal),
}

#[derive(Debug, Clone)]
pub struct SignedProposal {
    /// BOC of the forward message with a one-node signature chain
    pub message: Vec<u8>,
    pub signature: [u8; 64],
    pub content_pointer: String,
    pub code_hash: [u8; 32],
    pub compile_result: CompileResult,
}

#[derive(Debug, Clone)]
pub struct CosignedMessage {
    /// BOC of the forward message with this verifier's signature appended
    pub message: Vec<u8>,
    pub signature: [u8; 64],
    /// Length of the chain after appending
    pub signatures: usize,
    pub quorum: u32,
}

impl CosignedMessage {
    pub fn is_complete(&self) -> bool {
        self.signatures >= self.quorum as usize
    }
}

pub struct AttestationController {
    identity: VerifierIdentity,
    settings: ControllerSettings,
    validator: MessageValidator,
    compiler: Arc<dyn SourceCompiler>,
    storage: Arc<dyn ContentStorage>,
    chain: Arc<dyn ChainReader>,
    signature_verifier: Arc<dyn SignatureVerifier>,
    clock: Arc<dyn Clock>,
}

impl AttestationController {
    pub fn new(
        identity: VerifierIdentity,
        settings: ControllerSettings,
        compiler: Arc<dyn SourceCompiler>,
        storage: Arc<dyn ContentStorage>,
        chain: Arc<dyn ChainReader>,
    ) -> Self {
        let validator = MessageValidator::new(*identity.id_hash(), settings.sources_registry);
        Self {
            identity,
            settings,
            validator,
            compiler,
            storage,
            chain,
            signature_verifier: Arc::new(Ed25519Verifier),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_signature_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.signature_verifier = verifier;
        self
    }

    pub fn identity(&self) -> &VerifierIdentity {
        &self.identity
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Compile, store and sign a first attestation.
    pub async fn propose(&self, request: &ProposeRequest) -> VerifierResult<Proposal> {
        let sender: Address = request
            .sender_address
            .parse()
            .map_err(|e| VerifierError::InvalidRequest(format!("sender address: {e}")))?;
        if request.sources.is_empty() {
            return Err(VerifierError::InvalidRequest("no sources submitted".into()));
        }

        let compile_request = CompileRequest {
            compiler: request.compiler,
            compiler_settings: request.compiler_settings.clone(),
            sources: request.sources.clone(),
            known_contract_address: request.known_contract_address.clone(),
            known_contract_hash: request.known_contract_hash.clone(),
        };
        let result = self.compiler.verify(&compile_request).await?;
        if !result.is_similar() {
            tracing::info!(
                status = ?result.result,
                contract = %request.known_contract_address,
                "compilation did not reproduce the contract"
            );
            return Ok(Proposal::NotVerified(result));
        }

        let code_hash = result
            .hash
            .as_deref()
            .and_then(decode_code_hash)
            .or_else(|| decode_code_hash(&request.known_contract_hash))
            .ok_or_else(|| VerifierError::Compiler("similar result without a code hash".into()))?;

        if !self.settings.allow_reverification
            && self
                .chain
                .is_already_attested(&code_hash, self.identity.verifier_id())
                .await?
        {
            return Err(VerifierError::AlreadyDeployed(encode_code_hash(&code_hash)));
        }

        let now = self.clock.now();
        let file_pointers = self.storage.write(&request.sources, true).await?;
        if file_pointers.len() != request.sources.len() {
            return Err(VerifierError::Storage(format!(
                "stored {} of {} sources",
                file_pointers.len(),
                request.sources.len()
            )));
        }

        let compiler_settings = if result.compiler_settings.0.is_empty() {
            request.compiler_settings.clone()
        } else {
            result.compiler_settings.clone()
        };
        let record = SourceRecord {
            compiler: request.compiler,
            compiler_settings,
            hash: encode_code_hash(&code_hash),
            verification_date: round_down(now, self.settings.timestamp_granularity_secs).timestamp_millis(),
            sources: request
                .sources
                .iter()
                .zip(file_pointers)
                .map(|(file, url)| SourceRecordFile {
                    url,
                    filename: file.path.clone(),
                    is_entrypoint: file.is_entrypoint,
                })
                .collect(),
            known_contract_address: request.known_contract_address.clone(),
        };
        let record_json =
            serde_json::to_vec(&record).map_err(|e| VerifierError::InvalidSourceRecord(e.to_string()))?;
        let content_pointer = self
            .storage
            .write_from_content(&[record_json], true)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| VerifierError::Storage("no pointer returned for source record".into()))?;

        let expires_at = u32::try_from(now.timestamp() + i64::from(self.settings.message_ttl_secs))
            .map_err(|_| VerifierError::Config("message expiry out of range".into()))?;
        let payload = SignedPayload {
            verifier_id_hash: *self.identity.id_hash(),
            expires_at,
            sender,
            sources_registry: self.settings.sources_registry,
            deploy_source: DeploySourcePayload {
                query_id: rand::random(),
                verifier_id_hash: *self.identity.id_hash(),
                code_hash,
                content_pointer: content_pointer.clone(),
            },
        };
        let payload = Arc::new(payload.to_cell()?);
        let signature = self.identity.signer().sign(payload.hash());
        let head = SignatureEntry::new(signature, self.identity.public_key()).to_cell(None)?;
        let message = ForwardedMessage::new(payload, Arc::new(head)).to_boc()?;

        tracing::info!(
            code_hash = %encode_code_hash(&code_hash),
            %content_pointer,
            expires_at,
            "proposed attestation"
        );
        Ok(Proposal::Signed(SignedProposal {
            message,
            signature,
            content_pointer,
            code_hash,
            compile_result: result,
        }))
    }

    /// Verify a forward message from scratch and append this verifier's
    /// signature to its chain.
    pub async fn cosign(&self, message: &[u8]) -> VerifierResult<CosignedMessage> {
        let config = self
            .chain
            .verifier_set_config(self.identity.verifier_id(), &self.settings.sources_registry)
            .await?;

        let now = self.clock.now();
        let validated = self.validator.validate(message, now.timestamp())?;

        let record = self.fetch_record(&validated.content_pointer).await?;
        let record_hash = decode_code_hash(&record.hash)
            .ok_or_else(|| VerifierError::InvalidSourceRecord(format!("bad code hash {}", record.hash)))?;
        if record_hash != validated.code_hash {
            return Err(VerifierError::CodeHashMismatch {
                expected: encode_code_hash(&validated.code_hash),
                actual: record.hash,
            });
        }
        self.recompile(&record, &validated.code_hash).await?;

        let chain = MultisigValidator::new(&config, self.signature_verifier.as_ref())
            .validate(validated.signatures.as_ref(), &validated.payload_hash)?;
        chain.ensure_room()?;

        let own_key = self.identity.public_key();
        if chain.contains(&own_key) {
            return Err(VerifierError::AlreadySignedBySelf);
        }
        if !config.contains(&own_key) {
            return Err(VerifierError::NotInMultisigConfig(hex::encode(own_key)));
        }

        let signature = self.identity.signer().sign(&validated.payload_hash);
        let head = append_signature(validated.signatures.as_ref(), &SignatureEntry::new(signature, own_key))?;

        let mut refs = validated.root.refs().to_vec();
        refs[1] = head;
        let root = Cell::new(validated.root.bits().clone(), refs)?;
        let message = root.to_boc();

        let signatures = chain.len() + 1;
        tracing::info!(
            code_hash = %encode_code_hash(&validated.code_hash),
            signatures,
            quorum = config.quorum,
            "cosigned attestation"
        );
        Ok(CosignedMessage {
            message,
            signature,
            signatures,
            quorum: config.quorum,
        })
    }

    async fn fetch_record(&self, pointer: &str) -> VerifierResult<SourceRecord> {
        let bytes = self.storage.read(pointer).await?;
        serde_json::from_slice(&bytes).map_err(|e| VerifierError::InvalidSourceRecord(e.to_string()))
    }

    async fn recompile(&self, record: &SourceRecord, expected: &[u8; 32]) -> VerifierResult<CompileResult> {
        let mut sources = Vec::with_capacity(record.sources.len());
        for file in &record.sources {
            let content = self.storage.read(&file.url).await?;
            sources.push(SourceFile {
                path: file.filename.clone(),
                content,
                is_entrypoint: file.is_entrypoint,
            });
        }

        let request = CompileRequest {
            compiler: record.compiler,
            compiler_settings: replay_settings(record.compiler, &record.compiler_settings),
            sources,
            known_contract_address: record.known_contract_address.clone(),
            known_contract_hash: record.hash.clone(),
        };
        let result = self.compiler.verify(&request).await?;

        if let Some(actual) = result.hash.as_deref() {
            if decode_code_hash(actual).as_ref() != Some(expected) {
                return Err(VerifierError::CodeHashMismatch {
                    expected: encode_code_hash(expected),
                    actual: actual.to_string(),
                });
            }
        }
        if !result.is_similar() {
            let detail = result.error.clone().unwrap_or_default();
            return Err(VerifierError::InvalidCompilationResult(format!(
                "{:?} {detail}",
                result.result
            )));
        }
        Ok(result)
    }
}

/// Settings to hand back to the compiler when replaying a stored record.
///
/// Func results report the command line with the `func` executable in front,
/// which the compiler rejects as an argument on replay.
pub fn replay_settings(compiler: CompilerKind, settings: &CompilerSettings) -> CompilerSettings {
    let mut settings = settings.clone();
    if compiler == CompilerKind::Func {
        if let Some(stripped) = settings.command_line().and_then(strip_func_token) {
            settings.set_command_line(stripped);
        }
    }
    settings
}

fn strip_func_token(command_line: &str) -> Option<String> {
    let rest = command_line.trim_start().strip_prefix("func")?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim_start().to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain_reader::StaticChainReader;
    use crate::context::FixedClock;
    use crate::data_model::{CompileStatus, VerifierSetConfig};
    use crate::signing::{Ed25519Signer, Signer};
    use crate::storage::MemoryStorage;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    const CODE_HASH: [u8; 32] = [0xc0; 32];

    struct Reproducing;

    #[async_trait]
    impl SourceCompiler for Reproducing {
        async fn verify(&self, request: &CompileRequest) -> VerifierResult<CompileResult> {
            Ok(CompileResult {
                result: CompileStatus::Similar,
                hash: Some(encode_code_hash(&CODE_HASH)),
                error: None,
                compiler_settings: request
                    .compiler_settings
                    .clone()
                    .with("commandLine", "func -SPA stdlib.fc main.fc"),
                sources: vec![],
            })
        }
    }

    fn controller(storage: Arc<MemoryStorage>) -> AttestationController {
        let signer = Ed25519Signer::from_seed([1; 32]);
        let other = Ed25519Signer::from_seed([2; 32]);
        let config = VerifierSetConfig::new(2, vec![signer.public_key_bytes(), other.public_key_bytes()]);
        AttestationController::new(
            VerifierIdentity::new("verifier.example", signer),
            ControllerSettings::new(Address::new(0, [0x11; 32])),
            Arc::new(Reproducing),
            storage,
            Arc::new(StaticChainReader::new(config)),
        )
        .with_clock(Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 3, 1, 10, 42, 7).unwrap())))
    }

    fn request() -> ProposeRequest {
        ProposeRequest {
            compiler: CompilerKind::Func,
            compiler_settings: CompilerSettings::default(),
            sources: vec![SourceFile::new("main.fc", b"() main() {}".to_vec()).entrypoint()],
            known_contract_address: "0:abc".into(),
            known_contract_hash: encode_code_hash(&CODE_HASH),
            sender_address: Address::new(0, [0x22; 32]).to_raw(),
        }
    }

    #[tokio::test]
    async fn test_propose_stores_record_with_rounded_date() {
        let storage = Arc::new(MemoryStorage::new());
        let proposal = controller(storage.clone()).propose(&request()).await.unwrap();
        let Proposal::Signed(signed) = proposal else {
            panic!("expected a signed proposal");
        };
        assert_eq!(signed.code_hash, CODE_HASH);
        // one source plus the record
        assert_eq!(storage.len(), 2);

        let record: SourceRecord = serde_json::from_slice(&storage.read(&signed.content_pointer).await.unwrap()).unwrap();
        assert_eq!(
            record.verification_date,
            Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap().timestamp_millis()
        );
        assert_eq!(record.sources.len(), 1);
        assert!(record.sources[0].is_entrypoint);
        assert_eq!(record.compiler_settings.command_line(), Some("func -SPA stdlib.fc main.fc"));
    }

    #[tokio::test]
    async fn test_propose_rejects_bad_sender() {
        let mut bad = request();
        bad.sender_address = "not an address".into();
        let storage = Arc::new(MemoryStorage::new());
        let err = controller(storage.clone()).propose(&bad).await.unwrap_err();
        assert!(matches!(err, VerifierError::InvalidRequest(_)));
        assert!(storage.is_empty());
    }

    #[test]
    fn test_replay_settings_strips_func_only() {
        let settings = CompilerSettings::default().with("commandLine", "func -SPA main.fc");
        assert_eq!(
            replay_settings(CompilerKind::Func, &settings).command_line(),
            Some("-SPA main.fc")
        );
        assert_eq!(
            replay_settings(CompilerKind::Tact, &settings).command_line(),
            Some("func -SPA main.fc")
        );

        let already = CompilerSettings::default().with("commandLine", "-SPA main.fc");
        assert_eq!(
            replay_settings(CompilerKind::Func, &already).command_line(),
            Some("-SPA main.fc")
        );
        let lookalike = CompilerSettings::default().with("commandLine", "funcs.fc");
        assert_eq!(
            replay_settings(CompilerKind::Func, &lookalike).command_line(),
            Some("funcs.fc")
        );
    }
}
