//! Compiler adapter that shells out to an external verify command
use crate::collaborators::SourceCompiler;
use crate::data_model::{CompileRequest, CompileResult};
use crate::error::{VerifierError, VerifierResult};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Runs `program args...`, writes the [`CompileRequest`] as JSON to stdin
/// and reads a [`CompileResult`] as JSON from stdout.
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    program: String,
    args: Vec<String>,
}

impl CommandCompiler {
    pub fn new(argv: &[String]) -> VerifierResult<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| VerifierError::Config("compiler command is empty".into()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait]
impl SourceCompiler for CommandCompiler {
    async fn verify(&self, request: &CompileRequest) -> VerifierResult<CompileResult> {
        let input = serde_json::to_vec(request).map_err(|e| VerifierError::Compiler(e.to_string()))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| VerifierError::Compiler(format!("{}: {e}", self.program)))?;

        // stdin is fed while stdout and stderr drain
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(&input).await?;
                stdin.shutdown().await?;
            }
            Ok::<(), std::io::Error>(())
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output.map_err(|e| VerifierError::Compiler(e.to_string()))?;
        match fed {
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                tracing::debug!("compiler closed stdin before reading the whole request");
            }
            Err(e) => return Err(VerifierError::Compiler(e.to_string())),
            Ok(()) => {}
        }
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(status = %output.status, %stderr, "compiler command failed");
            return Err(VerifierError::Compiler(format!(
                "{} exited with {}",
                self.program, output.status
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| VerifierError::Compiler(format!("unreadable compiler output: {e}")))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::data_model::{CompileStatus, CompilerKind, CompilerSettings, SourceFile};

    fn request() -> CompileRequest {
        CompileRequest {
            compiler: CompilerKind::Func,
            compiler_settings: CompilerSettings::default(),
            sources: vec![],
            known_contract_address: "0:00".into(),
            known_contract_hash: "AA==".into(),
        }
    }

    fn sh(script: &str) -> CommandCompiler {
        CommandCompiler::new(&["sh".to_string(), "-c".to_string(), script.to_string()]).unwrap()
    }

    #[tokio::test]
    async fn test_reads_result_from_stdout() {
        let compiler = sh(r#"cat >/dev/null; echo '{"result":"similar","hash":"AA=="}'"#);
        let result = compiler.verify(&request()).await.unwrap();
        assert_eq!(result.result, CompileStatus::Similar);
        assert_eq!(result.hash.as_deref(), Some("AA=="));
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_error() {
        let compiler = sh("cat >/dev/null; exit 3");
        assert!(matches!(
            compiler.verify(&request()).await,
            Err(VerifierError::Compiler(_))
        ));
    }

    #[tokio::test]
    async fn test_large_output_before_input_is_read() {
        // emits more than a pipe buffer before touching stdin
        let compiler = sh(
            r#"head -c 200000 /dev/zero | tr '\000' ' '; cat >/dev/null; echo '{"result":"similar","hash":"AA=="}'"#,
        );
        let mut big = request();
        big.sources.push(SourceFile::new("big.fc", vec![b'a'; 300_000]));

        let result = tokio::time::timeout(std::time::Duration::from_secs(30), compiler.verify(&big))
            .await
            .expect("compiler call stalled")
            .unwrap();
        assert_eq!(result.result, CompileStatus::Similar);
    }

    #[test]
    fn test_empty_command() {
        assert!(CommandCompiler::new(&[]).is_err());
    }
}
