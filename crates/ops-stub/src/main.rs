//! Binary entrypoint for the ops stub API server.

use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

use ops_copilot_ops_stub::run;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Defaults can be overridden with OPS_ADDR / OPS_DATA_DIR
    let addr = std::env::var("OPS_ADDR").unwrap_or_else(|_| "0.0.0.0:8001".to_string());
    let data_dir = std::env::var("OPS_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"));

    run(&addr, &data_dir).await;
}
