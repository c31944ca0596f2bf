//! [`Session`] – one WebSocket connection and its two workers.
//!
//! ```text
//! Connecting ──handshake──▶ Open ──inbound ends──▶ Closing ──outbound ends──▶ Closed
//! ```
//!
//! * The **inbound worker** runs on the session task: it reads one frame at a
//!   time, decodes a [`ClientEvent`], attaches the [`SessionHandle`] and
//!   dispatches it through the [`Router`].  All handlers for one event finish
//!   before the next frame is read.  A decode failure or a closed channel is
//!   reported once to the [`ErrorSink`] and ends the worker.
//! * The **outbound worker** is spawned: it waits for either the teardown
//!   signal or the next queued [`ServerEvent`], serializes it and writes a
//!   text frame.
//!
//! Each session owns its [`OutboundQueue`]: the handle attached to inbound
//! events feeds it, and only this session's outbound worker drains it.
//!
//! Teardown is a oneshot fired (never awaited) when the inbound worker ends.
//! The outbound worker can also leave on its own when a write shows the
//! channel is gone, so it may exit slightly before or after the signal.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use gasp_middleware::{ClientEvent, OutboundQueue, Router, SessionHandle, SharedStore};
use gasp_types::{GaspError, ServerEvent};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{oneshot, watch};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::ErrorSink;

/// Lifecycle of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// One client connection.
pub struct Session {
    router: Arc<Router>,
    queue: OutboundQueue,
    errors: ErrorSink,
    handle: SessionHandle,
    state: watch::Sender<SessionState>,
}

impl Session {
    /// A session in the [`SessionState::Connecting`] state.
    ///
    /// `queue` must not be shared with another session.
    pub fn new(
        router: Arc<Router>,
        queue: OutboundQueue,
        errors: ErrorSink,
        store: SharedStore,
    ) -> Self {
        let handle = SessionHandle::new(queue.outbox(), store);
        let (state, _) = watch::channel(SessionState::Connecting);
        Self {
            router,
            queue,
            errors,
            handle,
            state,
        }
    }

    /// Record the remote address (builder-style).
    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.handle = self.handle.with_peer(peer);
        self
    }

    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Observe state transitions.
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Drive the session over an already-upgraded WebSocket until both
    /// workers have exited.
    pub async fn run<S>(self, ws: WebSocketStream<S>)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let session_id = self.handle.session_id();
        self.state.send_replace(SessionState::Open);
        info!(%session_id, peer = ?self.handle.peer(), "client connected");
        self.queue.enqueue(ServerEvent::info("client connected"));

        let (sink, stream) = ws.split();
        let (abort_tx, abort_rx) = oneshot::channel();
        let outbound = tokio::spawn(outbound_worker(
            sink,
            self.queue.clone(),
            abort_rx,
            self.errors.clone(),
            session_id,
        ));

        inbound_worker(stream, &self.router, &self.handle, &self.errors).await;

        self.state.send_replace(SessionState::Closing);
        // The outbound worker may already have left after a failed write.
        let _ = abort_tx.send(());
        if let Err(e) = outbound.await {
            warn!(%session_id, error = %e, "outbound worker did not finish cleanly");
        }

        self.state.send_replace(SessionState::Closed);
        info!(%session_id, "session closed");
    }
}

// ---------------------------------------------------------------------------
// Inbound: browser → router
// ---------------------------------------------------------------------------

async fn inbound_worker<S>(
    mut stream: SplitStream<WebSocketStream<S>>,
    router: &Router,
    handle: &SessionHandle,
    errors: &ErrorSink,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let frame = match stream.next().await {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => {
                errors.report(GaspError::ChannelClosed(e.to_string()));
                return;
            }
            None => {
                errors.report(GaspError::ChannelClosed("stream ended".to_string()));
                return;
            }
        };

        let decoded = match frame {
            Message::Text(text) => ClientEvent::decode(text.as_str()),
            Message::Binary(bytes) => ClientEvent::decode_slice(&bytes),
            Message::Close(frame) => {
                let details = match frame {
                    Some(f) => format!("client sent close ({})", u16::from(f.code)),
                    None => "client sent close".to_string(),
                };
                errors.report(GaspError::ChannelClosed(details));
                return;
            }
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
        };

        let mut event = match decoded {
            Ok(event) => event,
            Err(e) => {
                errors.report(e);
                return;
            }
        };

        event.attach_session(handle.clone());
        debug!(session_id = %handle.session_id(), route = %event.route_key(), "client event received");
        router.dispatch(&event);
    }
}

// ---------------------------------------------------------------------------
// Outbound: queue → browser
// ---------------------------------------------------------------------------

async fn outbound_worker<S>(
    mut sink: SplitSink<WebSocketStream<S>, Message>,
    queue: OutboundQueue,
    mut abort: oneshot::Receiver<()>,
    errors: ErrorSink,
    session_id: Uuid,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            biased;
            _ = &mut abort => {
                debug!(%session_id, "outbound worker received teardown signal");
                break;
            }
            next = queue.dequeue() => {
                let Some(event) = next else { break };
                let json = match event.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        errors.report(e);
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(json.into())).await {
                    let closed = channel_is_gone(&e);
                    errors.report(GaspError::Write(e.to_string()));
                    if closed {
                        debug!(%session_id, "outbound worker stopping after failed write");
                        break;
                    }
                }
            }
        }
    }

    let _ = sink.close().await;
}

fn channel_is_gone(err: &WsError) -> bool {
    matches!(
        err,
        WsError::ConnectionClosed | WsError::AlreadyClosed | WsError::Io(_) | WsError::Protocol(_)
    )
}
