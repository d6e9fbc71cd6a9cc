//! quill server binary.
//!
//! Run with:
//!   RUST_LOG=info QUILL_SESSION__SECRET=change-me cargo run
//!
//! Then open http://127.0.0.1:5000/auth/register.

use std::process::ExitCode;
use std::sync::Arc;

use quill::{routes, telemetry, App, AppConfig, Server};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    // Loading config reads `.env`, which may carry RUST_LOG.
    let config = AppConfig::load();
    telemetry::init();

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Result<AppConfig, quill::Error>) -> Result<(), quill::Error> {
    let config = config?;
    let addr = config.socket_addr()?;
    info!(store = %config.store.url, "starting");

    let app = Arc::new(App::from_config(&config).await?);
    Server::bind(addr)
        .body_limit(config.server.max_body)
        .serve(routes(app))
        .await
}
