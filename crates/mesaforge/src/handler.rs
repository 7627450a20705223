//! Per-connection handler: frame decoding and room routing.
//!
//! Each accepted connection gets its own Tokio task running this
//! handler, plus a writer task pumping its outbound channel to the
//! socket. The flow is:
//!   1. Loop: receive frames → decode envelopes
//!   2. `mesa:join` / `mesa:leave` mutate the registry
//!   3. Everything else is relayed to the rest of the room
//!
//! There is no handshake, no heartbeat, and no timeout. A connection
//! exists until its socket closes, and a frame the relay cannot decode
//! is skipped, not answered: the sender would not know what to do with
//! a relay error anyway.

use std::sync::Arc;

use mesaforge_protocol::{Codec, Envelope, TableEvent};
use mesaforge_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::server::ServerState;
use crate::MesaforgeError;

/// Drop guard that removes a connection from all rooms when the
/// handler exits. This ensures cleanup happens even if the handler
/// panics. Since `Drop` is synchronous, we spawn a fire-and-forget
/// task for the async lock.
struct DisconnectGuard {
    conn_id: ConnectionId,
    state: Arc<ServerState>,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.registry.lock().await.disconnect(conn_id);
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), MesaforgeError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let _guard = DisconnectGuard {
        conn_id,
        state: Arc::clone(&state),
    };

    // Writer task: everything the registry routes to this member goes
    // through the channel and out the socket in order. It ends when the
    // last sender drops, which the disconnect guard guarantees.
    let (tx, mut rx) = mpsc::unbounded_channel::<Envelope>();
    let writer_conn = conn.clone();
    let writer_state = Arc::clone(&state);
    tokio::spawn(async move {
        while let Some(envelope) = rx.recv().await {
            let bytes = match writer_state.codec.encode(&envelope) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::debug!(%conn_id, error = %e, "encode failed");
                    continue;
                }
            };
            if let Err(e) = writer_conn.send(&bytes).await {
                tracing::debug!(%conn_id, error = %e, "send failed, writer stopping");
                break;
            }
        }
    });

    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        };

        let envelope: Envelope = match state.codec.decode(&data) {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(
                    %conn_id, error = %e, "failed to decode envelope, skipping frame"
                );
                continue;
            }
        };

        match &envelope.event {
            TableEvent::MesaJoin { mesa_id } => {
                state
                    .registry
                    .lock()
                    .await
                    .join(mesa_id, conn_id, tx.clone());
            }
            TableEvent::MesaLeave { mesa_id } => {
                state.registry.lock().await.leave(mesa_id, conn_id);
            }
            _ => {
                state.registry.lock().await.relay(conn_id, &envelope);
            }
        }
    }

    // _guard drops here → the registry forgets this connection and the
    // writer task winds down with it.
    Ok(())
}
