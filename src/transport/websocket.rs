//! WebSocket transport
//!
//! Accepts TCP connections, performs the WebSocket handshake and drives one
//! `ConnectionHandler` per client:
//! - a writer task drains the connection's outbound queue into the socket
//! - the accepting task reads inbound frames and feeds them to the handler
//! - whichever side fails first triggers the handler's disconnect
//! - after a disconnect the writer gets a short grace period to close the
//!   socket (which completes a client-initiated close handshake), then it
//!   is aborted; anything still queued is dropped

use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::sync::oneshot;
use tokio_tungstenite::{WebSocketStream, accept_async};
use tracing::{debug, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::TopicRegistry;
use crate::persistence::StatusStore;
use crate::transport::connection::{ConnectionHandler, DisconnectReason};
use crate::utils::BroadcastError;

/// Pause after a failed `accept` so a persistent error does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// How long the writer may take to close the socket once the session ends.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Accept loop over an already bound listener.
///
/// Connections beyond `max_connections` are closed before the handshake.
pub async fn serve(
    listener: TcpListener,
    registry: Arc<TopicRegistry>,
    store: Arc<dyn StatusStore>,
    max_connections: usize,
) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "accept failed");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };

        if registry.connection_count() >= max_connections {
            warn!(%peer, max_connections, "connection limit reached, refusing client");
            drop(stream);
            continue;
        }

        let registry = registry.clone();
        let store = store.clone();
        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    warn!(%peer, error = %e, "WebSocket handshake error");
                    return;
                }
            };
            handle_connection(ws_stream, registry, store).await;
        });
    }
}

/// Runs one client session to completion.
pub async fn handle_connection<S>(
    ws_stream: WebSocketStream<S>,
    registry: Arc<TopicRegistry>,
    store: Arc<dyn StatusStore>,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, rx) = mpsc::unbounded_channel::<WsMessage>();

    let mut handler = ConnectionHandler::new(registry, store, tx);
    handler.on_connect();

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let mut send_task = tokio::spawn(forward_outbound(rx, ws_sender, shutdown_rx));
    let mut writer_done = false;

    while handler.is_open() {
        tokio::select! {
            inbound = ws_receiver.next() => match inbound {
                Some(Ok(WsMessage::Text(text))) => handler.on_inbound(text.as_str()).await,
                Some(Ok(WsMessage::Close(_))) | None => {
                    handler.on_disconnect(DisconnectReason::ClientClosed);
                }
                Some(Ok(_)) => {
                    debug!(conn_id = %handler.id(), "non-text frame ignored");
                }
                Some(Err(e)) => {
                    handler.on_disconnect(DisconnectReason::Transport(e.to_string()));
                }
            },
            sent = &mut send_task => {
                writer_done = true;
                let reason = match sent {
                    // The queue outlives the loop, so the writer only stops early on error.
                    Ok(Ok(())) => DisconnectReason::SendFailed("writer stopped".to_string()),
                    Ok(Err(e)) => DisconnectReason::SendFailed(e.to_string()),
                    Err(e) => DisconnectReason::SendFailed(e.to_string()),
                };
                handler.on_disconnect(reason);
            }
        }
    }

    if writer_done {
        return;
    }
    let _ = shutdown_tx.send(());
    if tokio::time::timeout(CLOSE_GRACE, &mut send_task).await.is_err() {
        debug!(conn_id = %handler.id(), "writer did not close in time, aborting");
        send_task.abort();
    }
}

/// Drains the outbound queue into the socket until it fails or `shutdown`
/// fires, then closes the sink. Closing flushes a pending close reply.
async fn forward_outbound<S>(
    mut rx: UnboundedReceiver<WsMessage>,
    mut sink: S,
    mut shutdown: oneshot::Receiver<()>,
) -> Result<(), BroadcastError>
where
    S: Sink<WsMessage, Error = tungstenite::Error> + Unpin,
{
    loop {
        tokio::select! {
            msg = rx.recv() => match msg {
                Some(msg) => sink.send(msg).await?,
                None => break,
            },
            _ = &mut shutdown => break,
        }
    }

    if let Err(e) = sink.close().await {
        debug!(error = %e, "socket close did not complete");
    }
    Ok(())
}
