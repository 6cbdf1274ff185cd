//! HTTP tests for the /v1 surface, driven through `tower::ServiceExt::oneshot`.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{json, Value};
use srcverify_api::{create_app, AppState};
use srcverify_cell::Address;
use srcverify_core::{
    encode_code_hash, AttestationController, CompileRequest, CompileResult, CompileStatus, CompilerKind,
    CompilerSettings, ControllerSettings, Ed25519Signer, MemoryStorage, ProposeRequest, Signer, SourceCompiler,
    SourceFile, StaticChainReader, VerifierError, VerifierIdentity, VerifierResult, VerifierSetConfig,
};
use std::sync::Arc;
use tower::ServiceExt;

const CODE_HASH: [u8; 32] = [0xc0; 32];

struct Reproducing;

#[async_trait::async_trait]
impl SourceCompiler for Reproducing {
    async fn verify(&self, _request: &CompileRequest) -> VerifierResult<CompileResult> {
        Ok(CompileResult {
            result: CompileStatus::Similar,
            hash: Some(encode_code_hash(&CODE_HASH)),
            error: None,
            compiler_settings: CompilerSettings::default(),
            sources: vec![],
        })
    }
}

struct Unreachable;

#[async_trait::async_trait]
impl SourceCompiler for Unreachable {
    async fn verify(&self, _request: &CompileRequest) -> VerifierResult<CompileResult> {
        Err(VerifierError::Compiler("toolchain offline".into()))
    }
}

fn app(seed: u8, compiler: Arc<dyn SourceCompiler>, storage: Arc<MemoryStorage>) -> Router {
    let keys = [1u8, 2, 3]
        .iter()
        .map(|s| Ed25519Signer::from_seed([*s; 32]).public_key_bytes())
        .collect();
    let controller = AttestationController::new(
        VerifierIdentity::new("verifier.example", Ed25519Signer::from_seed([seed; 32])),
        ControllerSettings::new(Address::new(0, [0x11; 32])),
        compiler,
        storage,
        Arc::new(StaticChainReader::new(VerifierSetConfig::new(3, keys))),
    );
    create_app(AppState::new(Arc::new(controller)).unwrap())
}

fn propose_body() -> Value {
    serde_json::to_value(ProposeRequest {
        compiler: CompilerKind::Func,
        compiler_settings: CompilerSettings::default(),
        sources: vec![SourceFile::new("main.fc", b"() main() {}".to_vec()).entrypoint()],
        known_contract_address: "0:abc".into(),
        known_contract_hash: encode_code_hash(&CODE_HASH),
        sender_address: Address::new(0, [0x22; 32]).to_raw(),
    })
    .unwrap()
}

async fn call(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value, String) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8_lossy(&bytes).to_string();
    let json = serde_json::from_str(&text).unwrap_or(Value::Null);
    (status, json, text)
}

#[tokio::test]
async fn test_health() {
    let storage = Arc::new(MemoryStorage::new());
    let (status, body, _) = call(app(1, Arc::new(Reproducing), storage), "GET", "/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["verifierId"], "verifier.example");
}

#[tokio::test]
async fn test_propose_then_sign() {
    let storage = Arc::new(MemoryStorage::new());
    let (status, proposed, _) = call(
        app(1, Arc::new(Reproducing), storage.clone()),
        "POST",
        "/v1/source",
        Some(propose_body()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(proposed["result"]["result"], "similar");
    assert!(proposed["ipfsLink"].as_str().unwrap().starts_with("blake3:"));
    let sig = STANDARD.decode(proposed["sig"].as_str().unwrap()).unwrap();
    assert_eq!(sig.len(), 64);

    let (status, signed, _) = call(
        app(2, Arc::new(Reproducing), storage),
        "POST",
        "/v1/sign",
        Some(json!({ "messageCell": proposed["msgCell"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(signed["signatures"], 2);
    assert_eq!(signed["quorum"], 3);
    assert_eq!(signed["complete"], false);
}

#[tokio::test]
async fn test_sign_rejects_garbage() {
    let storage = Arc::new(MemoryStorage::new());
    let (status, body, _) = call(
        app(2, Arc::new(Reproducing), storage),
        "POST",
        "/v1/sign",
        Some(json!({ "messageCell": "%%% not base64" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_CELL");
}

#[tokio::test]
async fn test_compiler_outage_is_bad_gateway() {
    let storage = Arc::new(MemoryStorage::new());
    let (status, body, _) = call(
        app(1, Arc::new(Unreachable), storage.clone()),
        "POST",
        "/v1/source",
        Some(propose_body()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "COMPILER");
    assert!(storage.is_empty());
}

#[tokio::test]
async fn test_metrics_count_outcomes() {
    let storage = Arc::new(MemoryStorage::new());
    let app = app(1, Arc::new(Reproducing), storage);
    let (status, _, _) = call(app.clone(), "POST", "/v1/source", Some(propose_body())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, text) = call(app, "GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(text.contains(r#"srcverify_proposals_total{outcome="signed"} 1"#));
}
