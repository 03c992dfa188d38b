//! Reservoir server binary
//!
//! # Usage
//! ```bash
//! res_server [--port 80] [--config reservoir.json] [--model-path reservoir.snapshot.json] [--verbose]
//! ```
//! Every flag can also come from the environment (`PORT`, `SIZE`, `DENSITY`, `RADIUS`, `BIAS`,
//! `ACTIVATION`, `NORM_RATE`, `MODEL_PATH`, `SAVE_EVERY`) or a `.env` file.

use clap::Parser;
use res_context::ResContext;
use res_server::{AppState, Args, router};
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(args.verbose)
        .init();

    let config = args.reservoir_config()?;
    let context = ResContext::open(&config)?;
    info!(
        size = context.esn().size(),
        activation = %context.esn().params().activation,
        sparse = context.esn().weights().is_sparse(),
        "reservoir ready"
    );
    let state = AppState::new(context);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", args.port)).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let model_path = state.context().model_path().map(Path::to_path_buf);
    if let Some(path) = model_path {
        state.save().await?;
        info!(path = %path.display(), "final snapshot written");
    }
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(e) => {
            error!("cannot listen for ctrl-c: {e}");
            std::future::pending::<()>().await
        }
    }
}
