//! One-connection-per-message TCP transport
//!
//! Senders open a connection, write one payload, close, and never wait for an answer.
//! Receivers accept connections one at a time, read the whole payload inline and hand the
//! decoded [`Message`] to the component's state-owning loop through an `mpsc` channel, so
//! messages from one sequential sender reach the loop in the order they were sent.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::TransportConfig;
use crate::error::{ProtocolError, ProtocolResult};
use crate::message::Message;
use crate::shutdown::ShutdownListener;

/// Bind a component listener; failure here is fatal to the component
pub async fn bind_listener(addr: &str) -> ProtocolResult<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ProtocolError::Bind { addr: addr.to_string(), source })
}

/// Send one message on a fresh connection
pub async fn send_message(
    addr: &str,
    message: &Message,
    config: &TransportConfig,
) -> ProtocolResult<()> {
    let payload = message.encode()?;

    let exchange = async {
        let mut stream = TcpStream::connect(addr)
            .await
            .map_err(|source| ProtocolError::Connect { addr: addr.to_string(), source })?;
        stream.write_all(&payload).await?;
        stream.shutdown().await?;
        Ok::<(), ProtocolError>(())
    };

    timeout(config.send_timeout(), exchange)
        .await
        .map_err(|_| ProtocolError::Timeout { addr: addr.to_string() })?
}

/// Fire-and-forget send: failures are logged and swallowed, never retried.
///
/// Returns whether the payload was handed to the peer.
pub async fn deliver(addr: &str, message: &Message, config: &TransportConfig) -> bool {
    match send_message(addr, message, config).await {
        Ok(()) => {
            debug!(addr, kind = message.kind(), "Delivered message");
            true
        }
        Err(e) => {
            warn!(addr, kind = message.kind(), error = %e, "Failed to deliver message");
            false
        }
    }
}

/// Read one payload from an accepted connection and decode it
pub async fn read_message(mut stream: TcpStream, config: &TransportConfig) -> ProtocolResult<Message> {
    let limit = config.max_payload_bytes;
    let mut payload = Vec::with_capacity(256);

    let addr = stream.peer_addr().map(|a| a.to_string()).unwrap_or_else(|_| "unknown".to_string());
    timeout(config.read_timeout(), (&mut stream).take(limit as u64 + 1).read_to_end(&mut payload))
        .await
        .map_err(|_| ProtocolError::Timeout { addr })??;

    if payload.len() > limit {
        return Err(ProtocolError::PayloadTooLarge { limit });
    }

    Message::decode(&payload)
}

/// Accept loop feeding a component's message channel.
///
/// Malformed payloads are logged and discarded. The loop ends when shutdown is requested
/// or when the receiving loop has gone away.
pub async fn run_listener(
    component: &'static str,
    listener: TcpListener,
    tx: mpsc::Sender<Message>,
    config: TransportConfig,
    mut shutdown: ShutdownListener,
) {
    loop {
        let (stream, peer) = tokio::select! {
            _ = shutdown.wait() => break,
            accepted = listener.accept() => match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(component, error = %e, "Failed to accept connection");
                    continue;
                }
            },
        };

        match read_message(stream, &config).await {
            Ok(message) => {
                debug!(component, %peer, kind = message.kind(), "Received message");
                if tx.send(message).await.is_err() {
                    debug!(component, "Message loop closed, stopping listener");
                    break;
                }
            }
            Err(ProtocolError::EmptyPayload) => {
                debug!(component, %peer, "Ignoring empty connection");
            }
            Err(e) => {
                warn!(component, %peer, error = %e, "Discarding malformed message");
            }
        }
    }

    debug!(component, "Listener stopped");
}
