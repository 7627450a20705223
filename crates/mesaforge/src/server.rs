//! `RelayServer` builder and accept loop.
//!
//! This is the entry point for running a Mesaforge relay. It ties the
//! layers together: transport → protocol → room registry. The relay
//! keeps no combat state at all; the registry of live room memberships
//! is the only thing it remembers, and it forgets even that when the
//! last connection drops.

use std::sync::Arc;

use mesaforge_protocol::JsonCodec;
use mesaforge_relay::RoomRegistry;
use mesaforge_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::handler::handle_connection;
use crate::MesaforgeError;

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. Every
/// registry mutation is one short critical section under the mutex.
pub(crate) struct ServerState {
    pub(crate) registry: Mutex<RoomRegistry>,
    pub(crate) codec: JsonCodec,
}

/// Builder for configuring and starting a relay server.
///
/// # Example
///
/// ```rust,ignore
/// use mesaforge::prelude::*;
///
/// let server = RelayServer::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct RelayServerBuilder {
    bind_addr: String,
}

impl RelayServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Binds the transport and builds the server.
    pub async fn build(self) -> Result<RelayServer, MesaforgeError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            registry: Mutex::new(RoomRegistry::new()),
            codec: JsonCodec,
        });

        Ok(RelayServer { transport, state })
    }
}

impl Default for RelayServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Mesaforge relay server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct RelayServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
}

impl RelayServer {
    /// Creates a new builder.
    pub fn builder() -> RelayServerBuilder {
        RelayServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections and spawns a handler task for each.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), MesaforgeError> {
        tracing::info!("Mesaforge relay running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await
                        {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
