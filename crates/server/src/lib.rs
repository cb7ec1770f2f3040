//! Hashirama HTTP surface
//!
//! JSON routes over the chain gateway:
//! - `GET    /api/madarachains`        list with derived health
//! - `GET    /api/madarachains/:name`  single chain
//! - `POST   /api/madarachains`        create from `{ name, chainID, replicas? }`
//! - `DELETE /api/madarachains?name=`  request deletion
//! - `GET    /healthz`                 liveness

#![forbid(unsafe_code)]

use std::net::SocketAddr;

use anyhow::Context;
use axum::routing::get;
use axum::Router;
use hashirama_api::ChainGateway;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod error;
pub mod routes;

pub fn router(gateway: ChainGateway) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route(
            "/api/madarachains",
            get(routes::list_chains).post(routes::create_chain).delete(routes::delete_chain),
        )
        .route("/api/madarachains/:name", get(routes::get_chain))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(gateway)
}

/// Bind and serve until Ctrl-C or SIGTERM.
pub async fn serve(addr: SocketAddr, gateway: ChainGateway) -> anyhow::Result<()> {
    let ns = gateway.namespace().to_string();
    let listener = tokio::net::TcpListener::bind(addr).await.with_context(|| format!("binding {}", addr))?;
    info!(addr = %addr, ns = %ns, "hashiramad listening");
    axum::serve(listener, router(gateway)).with_graceful_shutdown(shutdown_signal()).await.context("http server")?;
    info!("hashiramad stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "ctrl-c handler failed");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler failed");
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
    info!("shutdown signal received");
}
