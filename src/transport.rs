//! WebSocket transport task.
//!
//! One spawned task exclusively owns the `tokio-tungstenite` stream for a
//! link. Outbound frames arrive on a command channel; lifecycle events
//! and raw inbound frames are pushed onto an event channel consumed by
//! the link's dispatch loop. Suspension points live here and in the
//! dispatch loop, not in callbacks registered on a socket object.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;

/// Commands accepted by the transport task.
#[derive(Debug)]
pub enum Command {
    /// Write one framed payload as a single WebSocket text message.
    Send(String),
    /// Initiate the WebSocket close handshake.
    Close,
}

/// Lifecycle events and raw frames pushed to the dispatch loop.
#[derive(Debug)]
pub enum TransportEvent {
    /// Connection established.
    Opened,
    /// One raw inbound frame, header included.
    Frame(String),
    /// Transport-level failure; the link is no longer connected.
    Error(String),
    /// Connection finished. Always the last event on the channel.
    Closed,
}

/// Spawns the transport task for `url` and returns its channel endpoints.
///
/// The connect itself is asynchronous: the caller observes
/// [`TransportEvent::Opened`] once the WebSocket handshake completes, or
/// [`TransportEvent::Error`] followed by [`TransportEvent::Closed`] if it
/// fails. The scheme is expected to be the insecure `ws://` variant.
///
/// # Panics
///
/// Panics if called outside a tokio runtime.
#[must_use]
pub fn spawn(url: String, capacity: usize) -> (mpsc::Sender<Command>, mpsc::Receiver<TransportEvent>) {
    let (command_tx, command_rx) = mpsc::channel(capacity);
    let (event_tx, event_rx) = mpsc::channel(capacity);
    tokio::spawn(run(url, command_rx, event_tx));
    (command_tx, event_rx)
}

/// Runs the connection: one WebSocket, one command stream, one event sink.
async fn run(
    url: String,
    mut commands: mpsc::Receiver<Command>,
    events: mpsc::Sender<TransportEvent>,
) {
    let (stream, _response) = match connect_async(&url).await {
        Ok(pair) => pair,
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "websocket connect failed");
            // error precedes close, matching the lifecycle contract
            let _ = events.send(TransportEvent::Error(e.to_string())).await;
            let _ = events.send(TransportEvent::Closed).await;
            return;
        }
    };

    tracing::debug!(url = %url, "websocket connected");
    if events.send(TransportEvent::Opened).await.is_err() {
        return;
    }

    let (mut sink, mut source) = stream.split();
    let mut closing = false;

    loop {
        tokio::select! {
            cmd = commands.recv(), if !closing => match cmd {
                Some(Command::Send(frame)) => {
                    if let Err(e) = sink.send(WsMessage::text(frame)).await {
                        let _ = events.send(TransportEvent::Error(e.to_string())).await;
                        let _ = events.send(TransportEvent::Closed).await;
                        break;
                    }
                }
                Some(Command::Close) | None => {
                    closing = true;
                    if sink.close().await.is_err() {
                        let _ = events.send(TransportEvent::Closed).await;
                        break;
                    }
                    // keep draining until the remote acks the close
                }
            },
            inbound = source.next() => match inbound {
                Some(Ok(WsMessage::Text(text))) => {
                    if events.send(TransportEvent::Frame(text.as_str().to_string())).await.is_err() {
                        break;
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => {
                    let _ = events.send(TransportEvent::Closed).await;
                    break;
                }
                // ping/pong are answered by tungstenite; binary is not a frame
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    let _ = events.send(TransportEvent::Error(e.to_string())).await;
                    let _ = events.send(TransportEvent::Closed).await;
                    break;
                }
            },
        }
    }

    tracing::debug!(url = %url, "websocket connection finished");
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    /// Binds a listener, drops it, and returns the now-unused port.
    async fn free_port() -> u16 {
        let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
            panic!("bind failed");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("local_addr failed");
        };
        addr.port()
    }

    #[tokio::test]
    async fn connect_failure_emits_error_then_closed() {
        let port = free_port().await;
        let (_commands, mut events) = spawn(format!("ws://127.0.0.1:{port}"), 8);

        let Some(TransportEvent::Error(_)) = events.recv().await else {
            panic!("expected an error event first");
        };
        let Some(TransportEvent::Closed) = events.recv().await else {
            panic!("expected a closed event after the error");
        };
        assert!(events.recv().await.is_none());
    }

    #[tokio::test]
    async fn echo_server_round_trip() {
        let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
            panic!("bind failed");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("local_addr failed");
        };

        // one-shot echo peer
        tokio::spawn(async move {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                return;
            };
            while let Some(Ok(msg)) = ws.next().await {
                if msg.is_text() && ws.send(msg).await.is_err() {
                    break;
                }
            }
        });

        let (commands, mut events) = spawn(format!("ws://{addr}"), 8);

        let Some(TransportEvent::Opened) = events.recv().await else {
            panic!("expected the opened event first");
        };

        let Ok(()) = commands.send(Command::Send("00000002{}".to_string())).await else {
            panic!("command channel closed");
        };
        let Some(TransportEvent::Frame(frame)) = events.recv().await else {
            panic!("expected the echoed frame");
        };
        assert_eq!(frame, "00000002{}");

        let Ok(()) = commands.send(Command::Close).await else {
            panic!("command channel closed");
        };
        let Some(TransportEvent::Closed) = events.recv().await else {
            panic!("expected a closed event");
        };
    }
}
