use super::NetError;
use super::dispatch::{Dispatched, dispatch};
use crate::domain::{SessionLifecycle, SessionState};
use crate::interface_adapters::hub::{RemovalNotice, SessionHandle};
use crate::interface_adapters::protocol::decode_client_message;
use crate::interface_adapters::state::AppState;

use axum::{
    Error,
    extract::{
        State,
        ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

const LOG_THROTTLE: Duration = Duration::from_secs(2);

enum LoopControl {
    Continue,
    Disconnect,
}

/// Why the inbound pump stopped.
enum PumpExit {
    /// Client closed, left, or the read side failed.
    Disconnect,
    /// The outbound pump finished first, usually after a write failure.
    WriterStopped(OutboundStats),
    /// The hub dropped the session, e.g. as a slow consumer.
    Removed,
}

#[derive(Debug)]
struct InboundStats {
    msgs_in: u64,
    bytes_in: u64,
    dropped: u64,
    last_drop_log: Instant,
}

impl InboundStats {
    fn new() -> Self {
        Self {
            msgs_in: 0,
            bytes_in: 0,
            dropped: 0,
            last_drop_log: Instant::now()
                .checked_sub(LOG_THROTTLE)
                .unwrap_or_else(Instant::now),
        }
    }
}

#[derive(Debug, Default)]
struct OutboundStats {
    msgs_out: u64,
    bytes_out: u64,
    write_failed: bool,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    // Transport-level identity. The player created on Join reuses this string.
    let session_id = Uuid::new_v4().to_string();
    let span = info_span!("session", session_id = %session_id);
    run_session(socket, state, session_id).instrument(span).await;
}

fn transition(lifecycle: &mut SessionLifecycle, next: SessionState) {
    let from = lifecycle.state();
    if !lifecycle.advance(next) {
        warn!(?from, to = ?next, "ignored illegal session transition");
    }
}

async fn run_session(socket: WebSocket, state: Arc<AppState>, session_id: String) {
    let mut lifecycle = SessionLifecycle::new();

    let (handle, outbound_rx, mut removed) =
        SessionHandle::with_removal_notice(session_id.clone(), state.outbound_queue_capacity);
    if let Err(e) = state.hub.register(handle).await {
        error!(error = %e, "failed to register session");
        return;
    }
    transition(&mut lifecycle, SessionState::Registered);
    info!("client connected");

    let (sink, stream) = socket.split();
    let mut writer = tokio::spawn(outbound_pump(sink, outbound_rx).in_current_span());

    let mut inbound = InboundStats::new();
    let exit = inbound_pump(
        stream,
        &mut writer,
        &mut removed,
        &state,
        &session_id,
        &mut lifecycle,
        &mut inbound,
    )
    .await;

    if matches!(exit, PumpExit::Removed) {
        // The writer may be parked on a socket that stopped reading.
        warn!("session removed by hub; closing connection");
        writer.abort();
    }

    // Every exit path funnels through the hub so registry and session set agree.
    transition(&mut lifecycle, SessionState::Disconnecting);
    if let Err(e) = state.hub.unregister(&session_id).await {
        warn!(error = %e, "failed to unregister session");
    }
    transition(&mut lifecycle, SessionState::Unregistered);

    // Once unregistered the hub has dropped our queue, so the writer drains and exits.
    let outbound = match exit {
        PumpExit::WriterStopped(stats) => stats,
        PumpExit::Disconnect | PumpExit::Removed => join_writer(writer).await,
    };

    debug!(
        msgs_in = inbound.msgs_in,
        bytes_in = inbound.bytes_in,
        dropped = inbound.dropped,
        msgs_out = outbound.msgs_out,
        bytes_out = outbound.bytes_out,
        write_failed = outbound.write_failed,
        "connection stats"
    );
    info!("client disconnected");
}

async fn join_writer(writer: JoinHandle<OutboundStats>) -> OutboundStats {
    match writer.await {
        Ok(stats) => stats,
        Err(e) if e.is_cancelled() => OutboundStats::default(),
        Err(e) => {
            error!(error = %e, "outbound pump task failed");
            OutboundStats::default()
        }
    }
}

/// Drains the outbound queue into the socket until the hub closes the queue
/// or a write fails.
async fn outbound_pump(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<Utf8Bytes>,
) -> OutboundStats {
    let mut stats = OutboundStats::default();

    while let Some(frame) = outbound_rx.recv().await {
        let len = frame.len();
        if let Err(e) = sink.send(Message::Text(frame)).await {
            warn!(error = %e, "websocket send error");
            stats.write_failed = true;
            return stats;
        }
        stats.msgs_out += 1;
        stats.bytes_out += len as u64;
    }

    // Queue closed by the hub (unregister or slow-consumer eviction).
    if let Err(e) = sink.close().await {
        debug!(error = %e, "socket close error");
    }
    stats
}

/// Reads and dispatches one frame at a time until the client goes away, the
/// writer stops, or the hub removes the session. Removal is checked first so
/// nothing is dispatched on behalf of an evicted session.
async fn inbound_pump(
    mut stream: SplitStream<WebSocket>,
    writer: &mut JoinHandle<OutboundStats>,
    removed: &mut RemovalNotice,
    state: &AppState,
    session_id: &str,
    lifecycle: &mut SessionLifecycle,
    stats: &mut InboundStats,
) -> PumpExit {
    loop {
        tokio::select! {
            biased;

            _ = &mut *removed => return PumpExit::Removed,

            finished = &mut *writer => {
                debug!("outbound pump stopped; closing session");
                return PumpExit::WriterStopped(finished.unwrap_or_else(|e| {
                    error!(error = %e, "outbound pump task failed");
                    OutboundStats::default()
                }));
            }

            incoming = stream.next() => {
                match handle_incoming(incoming, state, session_id, lifecycle, stats).await {
                    LoopControl::Continue => {}
                    LoopControl::Disconnect => return PumpExit::Disconnect,
                }
            }
        }
    }
}

async fn handle_incoming(
    incoming: Option<Result<Message, Error>>,
    state: &AppState,
    session_id: &str,
    lifecycle: &mut SessionLifecycle,
    stats: &mut InboundStats,
) -> LoopControl {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                handle_frame(text.as_str().as_bytes(), state, session_id, lifecycle, stats).await
            }
            // Binary frames carry the same JSON envelope.
            Message::Binary(data) => handle_frame(&data, state, session_id, lifecycle, stats).await,
            Message::Ping(_) | Message::Pong(_) => LoopControl::Continue,
            Message::Close(frame) => {
                debug!(?frame, "client closed connection");
                LoopControl::Disconnect
            }
        },
        Some(Err(e)) => {
            warn!(error = %e, "websocket recv error");
            LoopControl::Disconnect
        }
        None => {
            debug!("websocket stream ended");
            LoopControl::Disconnect
        }
    }
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

async fn handle_frame(
    bytes: &[u8],
    state: &AppState,
    session_id: &str,
    lifecycle: &mut SessionLifecycle,
    stats: &mut InboundStats,
) -> LoopControl {
    stats.msgs_in += 1;
    stats.bytes_in += bytes.len() as u64;

    let message = match decode_client_message(bytes) {
        Ok(message) => message,
        Err(e) => {
            // Dropped, never fatal to the session.
            stats.dropped += 1;
            if should_log(&mut stats.last_drop_log) {
                warn!(error = %e, dropped = stats.dropped, "dropping client message");
            } else {
                debug!(error = %e, "dropping client message");
            }
            return LoopControl::Continue;
        }
    };

    match dispatch(state, session_id, message).await {
        Ok(Dispatched::Joined) => {
            transition(lifecycle, SessionState::Active);
            LoopControl::Continue
        }
        Ok(Dispatched::DuplicateJoin) => {
            warn!("duplicate join ignored");
            LoopControl::Continue
        }
        Ok(Dispatched::Updated | Dispatched::UpdateIgnored) => LoopControl::Continue,
        Ok(Dispatched::Leave) => {
            info!("client left");
            LoopControl::Disconnect
        }
        Err(NetError::Hub(e)) => {
            error!(error = %e, "hub unavailable; closing session");
            LoopControl::Disconnect
        }
        Err(e @ NetError::Serialization(_)) => {
            error!(error = %e, "failed to encode reply");
            LoopControl::Continue
        }
    }
}
