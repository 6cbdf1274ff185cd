//! Data model: verifier set, compiler requests and results, source records
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Multisig configuration of a verifier, read from the chain per round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierSetConfig {
    pub quorum: u32,
    /// Ed25519 public keys of the verifier's key holders
    pub verifiers: Vec<[u8; 32]>,
}

impl VerifierSetConfig {
    pub fn new(quorum: u32, verifiers: Vec<[u8; 32]>) -> Self {
        Self { quorum, verifiers }
    }

    pub fn contains(&self, public_key: &[u8; 32]) -> bool {
        self.verifiers.iter().any(|k| k == public_key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompilerKind {
    Func,
    Fift,
    Tact,
    Tolk,
}

impl CompilerKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Func => "func",
            Self::Fift => "fift",
            Self::Tact => "tact",
            Self::Tolk => "tolk",
        }
    }
}

impl std::fmt::Display for CompilerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Free-form compiler settings (versions, command line, parameters)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompilerSettings(pub Map<String, Value>);

impl CompilerSettings {
    const COMMAND_LINE: &'static str = "commandLine";

    pub fn command_line(&self) -> Option<&str> {
        self.0.get(Self::COMMAND_LINE).and_then(Value::as_str)
    }

    pub fn set_command_line(&mut self, command_line: impl Into<String>) {
        self.0
            .insert(Self::COMMAND_LINE.to_string(), Value::String(command_line.into()));
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }
}

/// A source file handed to the compiler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFile {
    pub path: String,
    #[serde(with = "base64_bytes")]
    pub content: Vec<u8>,
    #[serde(default)]
    pub is_entrypoint: bool,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            is_entrypoint: false,
        }
    }

    pub fn entrypoint(mut self) -> Self {
        self.is_entrypoint = true;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileRequest {
    pub compiler: CompilerKind,
    pub compiler_settings: CompilerSettings,
    pub sources: Vec<SourceFile>,
    pub known_contract_address: String,
    /// Expected code hash, base64
    pub known_contract_hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompileStatus {
    Similar,
    NotSimilar,
    CompileError,
    UnknownError,
}

/// Source entry echoed back by the compiler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledSource {
    pub filename: String,
    #[serde(default)]
    pub is_entrypoint: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileResult {
    pub result: CompileStatus,
    /// Code hash of the compiled output, base64
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub compiler_settings: CompilerSettings,
    #[serde(default)]
    pub sources: Vec<CompiledSource>,
}

impl CompileResult {
    pub fn is_similar(&self) -> bool {
        self.result == CompileStatus::Similar
    }
}

/// Source entry inside a stored [`SourceRecord`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRecordFile {
    /// Content pointer of the file bytes
    pub url: String,
    pub filename: String,
    #[serde(default)]
    pub is_entrypoint: bool,
}

/// Document binding a code hash to its sources, stored once by the proposer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRecord {
    pub compiler: CompilerKind,
    pub compiler_settings: CompilerSettings,
    /// Code hash, base64
    pub hash: String,
    /// Unix milliseconds, rounded down to the timestamp granularity
    pub verification_date: i64,
    pub sources: Vec<SourceRecordFile>,
    pub known_contract_address: String,
}

/// Encode a code hash the way the chain tooling prints it (standard base64).
pub fn encode_code_hash(hash: &[u8; 32]) -> String {
    STANDARD.encode(hash)
}

/// Decode a code hash given as base64, base64url or 64 hex digits.
pub fn decode_code_hash(value: &str) -> Option<[u8; 32]> {
    let value = value.trim();
    let bytes = if value.len() == 64 {
        hex::decode(value).ok()?
    } else {
        STANDARD
            .decode(value)
            .or_else(|_| URL_SAFE.decode(value))
            .ok()?
    };
    bytes.try_into().ok()
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_hash_formats() {
        let hash = [0xfe; 32];
        let b64 = encode_code_hash(&hash);
        assert_eq!(decode_code_hash(&b64), Some(hash));
        assert_eq!(decode_code_hash(&hex::encode(hash)), Some(hash));
        assert_eq!(decode_code_hash(&URL_SAFE.encode(hash)), Some(hash));
        assert_eq!(decode_code_hash("abc"), None);
    }

    #[test]
    fn test_source_record_json_shape() {
        let record = SourceRecord {
            compiler: CompilerKind::Func,
            compiler_settings: CompilerSettings::default().with("funcVersion", "0.4.4"),
            hash: encode_code_hash(&[1; 32]),
            verification_date: 1_700_000_000_000,
            sources: vec![SourceRecordFile {
                url: "blake3:00".into(),
                filename: "main.fc".into(),
                is_entrypoint: true,
            }],
            known_contract_address: "EQ...".into(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["compiler"], "func");
        assert_eq!(json["compilerSettings"]["funcVersion"], "0.4.4");
        assert_eq!(json["verificationDate"], 1_700_000_000_000i64);
        assert_eq!(json["sources"][0]["isEntrypoint"], true);

        let back: SourceRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_compile_status_wire_names() {
        let result: CompileResult =
            serde_json::from_str(r#"{"result":"not_similar","hash":null}"#).unwrap();
        assert_eq!(result.result, CompileStatus::NotSimilar);
        assert!(!result.is_similar());
    }

    #[test]
    fn test_source_file_content_is_base64() {
        let file = SourceFile::new("a.fc", b"() main() {}".to_vec());
        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["content"], STANDARD.encode(b"() main() {}"));
    }
}
