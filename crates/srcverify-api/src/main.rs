//! Binary entrypoint for the srcverify API server.
use srcverify_api::{run, AppState};
use srcverify_core::{
    AttestationController, CommandCompiler, FsStorage, ServiceConfig, StaticChainReader,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Config path from SRCVERIFY_CONFIG; key and address can be overridden from the environment
    let config = ServiceConfig::from_env()?;
    let chain = StaticChainReader::new(config.verifier_set()?).with_attested(config.attested_code_hashes()?);
    let controller = AttestationController::new(
        config.identity()?,
        config.settings()?,
        Arc::new(CommandCompiler::new(&config.compiler_command)?),
        Arc::new(FsStorage::new(config.storage_dir.clone())),
        Arc::new(chain),
    );
    tracing::info!(
        verifier_id = %config.verifier_id,
        public_key = %hex::encode(controller.identity().public_key()),
        storage = %config.storage_dir.display(),
        "verifier ready"
    );

    let state = AppState::new(Arc::new(controller))?;
    run(&config.listen_addr, state).await?;
    Ok(())
}
