//! Documentation of a credential-hiding proxy for JotForm polls.
//!
//! The browser never sees a JotForm app key. A poll owner registers their `(appKey, pollID)`
//! once, receives an opaque token, and every later request names only that token.
//!
//!
//!
//! # Endpoints
//!
//! | Method | Path                       | Result                                           |
//! |--------|----------------------------|--------------------------------------------------|
//! | GET    | `/ping`                    | `{"message": "pong"}`, or `"Error."` if Redis is down |
//! | POST   | `/poll`                    | `201 {"uuid": token}`, same token for the same pair |
//! | PUT    | `/poll/{uuid}/submissions` | upstream reply, verbatim                         |
//! | GET    | `/poll/{uuid}/questions`   | upstream reply, verbatim                         |
//! | GET    | `/poll/{uuid}/stats`       | `{questionId: {answer: count}}`                  |
//!
//! Unknown tokens are `401`. Stats on a poll whose submissions cannot be read are `404`.
//! Upstream being unreachable is `502`.
//!
//!
//!
//! # Stats Pipeline
//! 1. Resolve the token in Redis, see [`registry`]
//! 2. In parallel, list the questions and page through every submission, see [`submissions`]
//! 3. Keep radio and checkbox questions only, see [`questions`]
//! 4. Count answer values per question, see [`tally`]
//!
//! Nothing is cached. Every stats request re-reads the whole submission history, 1000 per call.
//!
//!
//!
//! # Notes
//!
//! ## Registry keys
//! Older deployments joined app key and poll id with a bare `-`, which breaks as soon as either
//! contains one. Keys are now escaped, and plain values still decode the old way.
//!
//! ## First registration races
//! Two clients registering the same pair at once both mint a token. The reverse entry is written
//! with `SET NX`, so both end up returning the winner's token.
//!
//!
//!
//! # Setup
//!
//! Environment
//! - `RUST_PORT`, default `8000`
//! - `REDIS_URL`, default `redis://127.0.0.1:6379`
//! - `JOTFORM_API_URL`, default `https://api.jotform.com`
//! - `UPSTREAM_TIMEOUT_SECS`, default `30`
//! - `RUST_LOG`, e.g. `jotform_proxy=debug`
//!
//! Run locally.
//! ```sh
//! docker run -d -p 6379:6379 redis
//! RUST_LOG=info cargo run
//! ```
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! ```
use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, post, put},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod database;
pub mod error;
pub mod questions;
pub mod registry;
pub mod routes;
pub mod state;
pub mod store;
pub mod submissions;
pub mod tally;
pub mod upstream;
pub mod utils;

use routes::{
    ping_handler, questions_handler, register_handler, stats_handler, submissions_handler,
};
use state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/ping", get(ping_handler))
        .route("/poll", post(register_handler))
        .route("/poll/{uuid}/submissions", put(submissions_handler))
        .route("/poll/{uuid}/questions", get(questions_handler))
        .route("/poll/{uuid}/stats", get(stats_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await?;

    info!("Starting server...");

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Server running on {address}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => error!("Failed to listen for Ctrl+C: {e}"),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
