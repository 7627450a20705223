//! The `relay` binary: a standalone Mesaforge relay server.
//!
//! Bind address comes from `MESAFORGE_ADDR`, the first CLI argument, or
//! falls back to `127.0.0.1:8080`. Log filtering is the usual
//! `RUST_LOG` (defaults to `info`).

use mesaforge::{MesaforgeError, RelayServer};

#[tokio::main]
async fn main() -> Result<(), MesaforgeError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let addr = std::env::var("MESAFORGE_ADDR")
        .ok()
        .or_else(|| std::env::args().nth(1))
        .unwrap_or_else(|| "127.0.0.1:8080".to_string());

    let server = RelayServer::builder().bind(&addr).build().await?;
    if let Ok(local) = server.local_addr() {
        tracing::info!(%local, "relay listening");
    }
    server.run().await
}
