//! Documentation of the AutoMate AI lead-capture backend.
//!
//! Accepts the landing page form, tracks UI analytics, stores chat messages
//! and serves the admin views of what was collected.
//!
//!
//!
//! # General Infrastructure
//! - MongoDB is the system of record (leads, analytics, chats)
//! - MySQL keeps a backup copy of leads and analytics, best-effort
//! - Redis remembers which emails submitted in the last 24 hours
//! - An SMTP relay sends the operator notification and the user auto-reply
//! - Any of the four may be missing, the server still starts and logs what it is running without
//!
//!
//!
//! # Lead Submission
//!
//! **Goal**: Never lose a lead that MongoDB accepted, and never make the visitor wait on email.
//!
//! - Validate the form, reject before touching any store
//! - Look up `lead:{email}` in Redis, reject with 400 if present
//! - Insert into MongoDB, this is the only write that can fail the request
//! - Insert into MySQL, log the outcome, never surface it
//! - Set `lead:{email}` with a 24 hour expiry, log failures
//! - Append a `lead_submitted` analytics event, log failures
//! - Spawn the email task and answer with the MongoDB id
//!
//!
//!
//! # Notes
//!
//! ## Dedup
//! Redis is only an optimization. If it is down, duplicate emails go through
//! and both end up in MongoDB. MySQL will refuse the second one because of its
//! unique index, which is fine since it is only a backup.
//!
//! Two requests racing on the same email can both pass the Redis check. This
//! is accepted.
//!
//! ## Admin
//! `/api/auth/login` compares against `ADMIN_USERNAME`/`ADMIN_PASSWORD` and
//! hands back a timestamp token. Nothing checks that token yet, the listings
//! are open. So is `DELETE /api/leads/:email/dedup`: anyone can clear the
//! dedup key of any email and let it submit again.
//!
//!
//!
//! # Setup
//!
//! Copy the variables you need into `.env`, every one has a default.
//! ```sh
//! MONGO_URI=mongodb://localhost:27017
//! REDIS_HOST=localhost
//! MYSQL_HOST=localhost
//! SENDER_EMAIL=bot@example.com
//! SENDER_PASSWORD=app-password
//! YOUR_EMAIL=me@example.com
//! ```
//!
//! Run.
//! ```sh
//! RUST_LOG=info cargo run -p automate
//! ```
//!
//! Smoke test a running server.
//! ```sh
//! cargo run -p tester -- --base-url http://localhost:8000
//! ```
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! ```
use std::sync::Arc;

use anyhow::Result;
use axum::{
    Router,
    routing::{delete, get, post},
};
use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod mongo;
pub mod mysql;
pub mod notifier;
pub mod routes;
pub mod state;
pub mod utils;


use config::Config;
use routes::{
    api_health_handler, chat_handler, clear_dedup_handler, health_handler, list_analytics_handler,
    list_leads_handler, login_handler, mirrored_leads_handler, submit_lead_handler,
    track_analytics_handler,
};
use state::State;

pub async fn start_server() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load()?;

    info!("Initializing state...");
    let state = State::new(config).await;

    info!("Starting server...");
    let app = build_router(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutting down...");
    state.shutdown().await;

    Ok(())
}

pub fn build_router(state: Arc<State>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let home = state.config.templates_dir.join("home.html");
    let admin = state.config.templates_dir.join("admin.html");
    let assets = state.config.static_dir.clone();

    let api = Router::new()
        .route("/auth/login", post(login_handler))
        .route("/leads", post(submit_lead_handler).get(list_leads_handler))
        .route("/leads/mirror", get(mirrored_leads_handler))
        .route("/leads/:email/dedup", delete(clear_dedup_handler))
        .route(
            "/analytics",
            post(track_analytics_handler).get(list_analytics_handler),
        )
        .route("/chat", post(chat_handler))
        .route("/health", get(api_health_handler));

    Router::new()
        .nest("/api", api)
        .route("/health", get(health_handler))
        .route_service("/", ServeFile::new(home))
        .route_service("/admin", ServeFile::new(admin))
        .nest_service("/static", ServeDir::new(assets))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
