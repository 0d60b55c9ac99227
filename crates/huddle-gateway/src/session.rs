// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime of one duplex connection.
//!
//! Three tasks run per connection and share a cancellation token:
//! 1. Reader: applies client frames and records pongs
//! 2. Writer: drains the outbound queue and writes pings
//! 3. Heartbeat: schedules pings and enforces the pong deadline
//!
//! The first task to finish decides the [`CloseReason`]; the others are
//! cancelled and the connection is disconnected from the hub.

use std::fmt::Display;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::extract::ws::Message;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::heartbeat::{Heartbeat, HeartbeatConfig, Liveness};
use crate::hub::{CloseReason, EventHub};
use crate::registry::Connection;

type SharedHeartbeat = Arc<Mutex<Heartbeat>>;

/// Writer-bound control frames.
#[derive(Debug)]
enum Control {
    Ping,
}

/// Drive a registered connection until it closes, then disconnect it.
pub async fn run_session<S, R, SE, RE>(
    sink: S,
    stream: R,
    connection: Arc<Connection>,
    hub: Arc<EventHub>,
) -> CloseReason
where
    S: Sink<Message, Error = SE> + Send + Unpin + 'static,
    R: Stream<Item = Result<Message, RE>> + Send + Unpin + 'static,
    SE: Display + Send + 'static,
    RE: Display + Send + 'static,
{
    let config = *hub.session_config();
    let cancel = CancellationToken::new();
    let heartbeat: SharedHeartbeat = Arc::new(Mutex::new(Heartbeat::new(
        &config.heartbeat,
        Instant::now(),
    )));
    let (control_tx, control_rx) = mpsc::channel(4);

    let mut tasks = JoinSet::new();
    tasks.spawn(write_loop(
        sink,
        connection.clone(),
        control_rx,
        heartbeat.clone(),
        config.heartbeat.write_wait,
        cancel.clone(),
    ));
    tasks.spawn(read_loop(
        stream,
        connection.clone(),
        hub.clone(),
        heartbeat.clone(),
        config.max_frame_bytes,
        cancel.clone(),
    ));
    tasks.spawn(heartbeat_loop(
        config.heartbeat,
        heartbeat,
        control_tx,
        cancel.clone(),
    ));

    let mut reason = None;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Some(r)) if reason.is_none() => {
                reason = Some(r);
                cancel.cancel();
            }
            Ok(_) => {}
            Err(e) => {
                warn!(connection_id = %connection.id(), "connection task failed: {e}");
                reason.get_or_insert(CloseReason::ReadFailed);
                cancel.cancel();
            }
        }
    }

    let reason = reason.unwrap_or(CloseReason::QueueClosed);
    hub.disconnect(connection.id(), reason);
    reason
}

fn lock(heartbeat: &SharedHeartbeat) -> std::sync::MutexGuard<'_, Heartbeat> {
    heartbeat.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn write_frame<S, SE>(
    sink: &mut S,
    frame: Message,
    write_wait: Duration,
    heartbeat: &SharedHeartbeat,
) -> Result<(), CloseReason>
where
    S: Sink<Message, Error = SE> + Unpin,
    SE: Display,
{
    match tokio::time::timeout(write_wait, sink.send(frame)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            debug!("websocket write failed: {e}");
            Err(CloseReason::WriteFailed)
        }
        Err(_) => {
            lock(heartbeat).write_timed_out();
            Err(CloseReason::WriteTimeout)
        }
    }
}

async fn write_loop<S, SE>(
    mut sink: S,
    connection: Arc<Connection>,
    mut control_rx: mpsc::Receiver<Control>,
    heartbeat: SharedHeartbeat,
    write_wait: Duration,
    cancel: CancellationToken,
) -> Option<CloseReason>
where
    S: Sink<Message, Error = SE> + Unpin,
    SE: Display,
{
    loop {
        let frame = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            Some(control) = control_rx.recv() => match control {
                Control::Ping => Message::Ping(Default::default()),
            },
            next = connection.queue().pop() => match next {
                Some(text) => Message::Text(text.to_string().into()),
                None => {
                    // Best effort: the peer may already be gone.
                    let _ = tokio::time::timeout(write_wait, sink.send(Message::Close(None))).await;
                    return Some(CloseReason::QueueClosed);
                }
            },
        };

        let is_ping = matches!(frame, Message::Ping(_));
        if let Err(reason) = write_frame(&mut sink, frame, write_wait, &heartbeat).await {
            return Some(reason);
        }
        if is_ping {
            lock(&heartbeat).ping_sent();
        }
    }

    let _ = tokio::time::timeout(write_wait, sink.close()).await;
    None
}

async fn read_loop<R, RE>(
    mut stream: R,
    connection: Arc<Connection>,
    hub: Arc<EventHub>,
    heartbeat: SharedHeartbeat,
    max_frame_bytes: usize,
    cancel: CancellationToken,
) -> Option<CloseReason>
where
    R: Stream<Item = Result<Message, RE>> + Unpin,
    RE: Display,
{
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => return None,
            frame = stream.next() => frame,
        };
        let message = match frame {
            None => return Some(CloseReason::ClientClosed),
            Some(Err(e)) => {
                debug!(connection_id = %connection.id(), "websocket read failed: {e}");
                return Some(CloseReason::ReadFailed);
            }
            Some(Ok(message)) => message,
        };

        hub.registry().touch(connection.id());
        match message {
            Message::Text(text) => {
                if text.len() > max_frame_bytes {
                    debug!(connection_id = %connection.id(), len = text.len(), "inbound frame too large");
                    return Some(CloseReason::ReadFailed);
                }
                hub.handle_client_frame(&connection, &text);
            }
            Message::Binary(bytes) => {
                if bytes.len() > max_frame_bytes {
                    return Some(CloseReason::ReadFailed);
                }
                debug!(connection_id = %connection.id(), "ignoring binary frame");
            }
            Message::Pong(_) => lock(&heartbeat).pong_received(Instant::now()),
            Message::Ping(_) => {}
            Message::Close(_) => return Some(CloseReason::ClientClosed),
        }
    }
}

async fn heartbeat_loop(
    config: HeartbeatConfig,
    heartbeat: SharedHeartbeat,
    control_tx: mpsc::Sender<Control>,
    cancel: CancellationToken,
) -> Option<CloseReason> {
    let mut ticker = tokio::time::interval_at(Instant::now() + config.ping_period, config.ping_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let deadline = lock(&heartbeat).deadline();
        tokio::select! {
            _ = cancel.cancelled() => return None,
            _ = ticker.tick() => {
                if control_tx.send(Control::Ping).await.is_err() {
                    return None;
                }
            }
            _ = tokio::time::sleep_until(deadline) => {}
        }
        // A pong may have moved the deadline while we slept.
        if lock(&heartbeat).check(Instant::now()) == Liveness::Closed {
            return Some(CloseReason::HeartbeatTimeout);
        }
    }
}
