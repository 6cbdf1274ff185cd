//! API Handlers
use crate::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::{json, Value};
use srcverify_core::{ProposeRequest, Proposal, VerifierError};

/// Taxonomy errors are the caller's fault (400); collaborator failures are
/// upstream faults (502).
#[derive(Debug)]
pub struct ApiError(pub VerifierError);

impl From<VerifierError> for ApiError {
    fn from(err: VerifierError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_collaborator_failure() {
            StatusCode::BAD_GATEWAY
        } else {
            StatusCode::BAD_REQUEST
        };
        let body = json!({ "error": self.0.code(), "message": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRequest {
    /// Base64 BOC of the forward message
    pub message_cell: String,
}

pub async fn propose(
    State(state): State<AppState>,
    Json(request): Json<ProposeRequest>,
) -> Result<Json<Value>, ApiError> {
    match state.controller.propose(&request).await {
        Ok(Proposal::NotVerified(result)) => {
            state.metrics.record_proposal("not_verified");
            Ok(Json(json!({ "result": result })))
        }
        Ok(Proposal::Signed(signed)) => {
            state.metrics.record_proposal("signed");
            Ok(Json(json!({
                "msgCell": STANDARD.encode(&signed.message),
                "sig": STANDARD.encode(signed.signature),
                "ipfsLink": signed.content_pointer,
                "result": signed.compile_result,
            })))
        }
        Err(err) => {
            state.metrics.record_proposal(err.code());
            tracing::warn!(code = err.code(), error = %err, "proposal rejected");
            Err(err.into())
        }
    }
}

pub async fn sign(
    State(state): State<AppState>,
    Json(request): Json<SignRequest>,
) -> Result<Json<Value>, ApiError> {
    let outcome = match STANDARD.decode(request.message_cell.trim()) {
        Ok(bytes) => state.controller.cosign(&bytes).await,
        Err(e) => Err(VerifierError::InvalidCell(format!("messageCell is not base64: {e}"))),
    };
    match outcome {
        Ok(cosigned) => {
            state.metrics.record_cosign("signed");
            Ok(Json(json!({
                "msgCell": STANDARD.encode(&cosigned.message),
                "sig": STANDARD.encode(cosigned.signature),
                "signatures": cosigned.signatures,
                "quorum": cosigned.quorum,
                "complete": cosigned.is_complete(),
            })))
        }
        Err(err) => {
            state.metrics.record_cosign(err.code());
            tracing::warn!(code = err.code(), error = %err, "cosign rejected");
            Err(err.into())
        }
    }
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let identity = state.controller.identity();
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "verifierId": identity.verifier_id(),
            "publicKey": hex::encode(identity.public_key()),
            "time": chrono::Utc::now().to_rfc3339(),
        })),
    )
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.encode() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}
