//! One live viewer connected over WebSocket.
//!
//! Each connection is registered with the hub and then served by two tasks:
//!
//! - the write pump drains the session queue to the socket and pings the
//!   viewer on a fixed tick, bounding every write with a timeout
//! - the read pump only watches for close frames, errors and silence; any
//!   inbound frame (pongs included) pushes the read deadline forward
//!
//! Whichever pump ends first stops the other, and the session is unregistered.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use mcp_dashboard_core::broadcast::{Payload, Subscription};
use mcp_dashboard_core::config::ViewerConfig;
use mcp_dashboard_core::BroadcastHub;
use std::fmt::Display;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};

use super::AppState;

/// Why a viewer session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The hub dropped the session (slow consumer or explicit unregister)
    QueueClosed,
    /// The viewer sent a close frame or the stream ended
    ClosedByPeer,
    /// Nothing was received within the pong timeout
    PongTimedOut,
    WriteTimedOut,
    WriteFailed(String),
    ReadFailed(String),
}

/// GET /ws
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let max_bytes = state.viewer.max_message_bytes;
    ws.max_message_size(max_bytes)
        .max_frame_size(max_bytes)
        .on_upgrade(move |socket| {
            run_session(socket, state.pipeline.hub().clone(), state.viewer.as_ref().clone())
        })
}

/// Serve one connection until either side gives up.
pub async fn run_session(socket: WebSocket, hub: BroadcastHub, config: ViewerConfig) {
    let Subscription { id, receiver } = hub.register();
    tracing::info!(
        session = %id,
        viewers = hub.session_count(),
        queue_capacity = hub.queue_capacity(),
        "Viewer connected"
    );

    let (sink, stream) = socket.split();
    let mut write = tokio::spawn(write_pump(
        sink,
        receiver,
        config.ping_interval(),
        config.write_timeout(),
    ));
    let mut read = tokio::spawn(read_pump(stream, config.pong_timeout()));

    let end = tokio::select! {
        end = &mut write => {
            read.abort();
            end
        }
        end = &mut read => {
            write.abort();
            end
        }
    };

    hub.unregister(id);
    match end {
        Ok(end) => tracing::info!(session = %id, reason = ?end, "Viewer disconnected"),
        Err(e) => tracing::warn!(session = %id, error = %e, "Viewer task failed"),
    }
}

/// Forward queued payloads as text frames and ping on every tick.
pub(crate) async fn write_pump<S>(
    mut sink: S,
    mut queue: mpsc::Receiver<Payload>,
    ping_interval: Duration,
    write_timeout: Duration,
) -> SessionEnd
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let mut ticker = interval_at(Instant::now() + ping_interval, ping_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let message = tokio::select! {
            payload = queue.recv() => match payload {
                Some(payload) => Message::Text(payload.to_string().into()),
                None => {
                    let _ = timeout(write_timeout, sink.send(Message::Close(None))).await;
                    return SessionEnd::QueueClosed;
                }
            },
            _ = ticker.tick() => Message::Ping(Default::default()),
        };

        match timeout(write_timeout, sink.send(message)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return SessionEnd::WriteFailed(e.to_string()),
            Err(_) => return SessionEnd::WriteTimedOut,
        }
    }
}

/// Discard inbound frames, ending on close, error or silence.
pub(crate) async fn read_pump<R, E>(mut stream: R, pong_timeout: Duration) -> SessionEnd
where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    loop {
        match timeout(pong_timeout, stream.next()).await {
            Err(_) => return SessionEnd::PongTimedOut,
            Ok(None) | Ok(Some(Ok(Message::Close(_)))) => return SessionEnd::ClosedByPeer,
            Ok(Some(Err(e))) => return SessionEnd::ReadFailed(e.to_string()),
            Ok(Some(Ok(_))) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc as fmpsc;
    use std::io;

    const LONG: Duration = Duration::from_secs(60);

    fn text(message: &Message) -> &str {
        match message {
            Message::Text(text) => text.as_str(),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    // ============================================
    // Write pump
    // ============================================

    #[tokio::test]
    async fn test_write_pump_forwards_in_order_then_closes() {
        let hub = BroadcastHub::new(8);
        let sub = hub.register();
        let (sink, mut frames) = fmpsc::unbounded::<Message>();

        hub.publish("one");
        hub.publish("two");
        hub.unregister(sub.id);

        let end = write_pump(sink, sub.receiver, LONG, LONG).await;
        assert_eq!(end, SessionEnd::QueueClosed);

        assert_eq!(text(&frames.next().await.unwrap()), "one");
        assert_eq!(text(&frames.next().await.unwrap()), "two");
        assert_eq!(frames.next().await.unwrap(), Message::Close(None));
    }

    #[tokio::test]
    async fn test_write_pump_pings_on_tick() {
        let hub = BroadcastHub::new(8);
        let sub = hub.register();
        let (sink, mut frames) = fmpsc::unbounded::<Message>();

        let pump = tokio::spawn(write_pump(
            sink,
            sub.receiver,
            Duration::from_millis(20),
            LONG,
        ));

        let frame = tokio::time::timeout(Duration::from_secs(5), frames.next())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(frame, Message::Ping(_)));

        hub.unregister(sub.id);
        assert_eq!(pump.await.unwrap(), SessionEnd::QueueClosed);
    }

    #[tokio::test]
    async fn test_write_pump_ends_on_failed_write() {
        let hub = BroadcastHub::new(8);
        let sub = hub.register();
        let (sink, frames) = fmpsc::unbounded::<Message>();
        drop(frames);

        hub.publish("lost");
        let end = write_pump(sink, sub.receiver, LONG, LONG).await;
        assert!(matches!(end, SessionEnd::WriteFailed(_)));
    }

    #[tokio::test]
    async fn test_write_pump_ends_on_stalled_write() {
        let hub = BroadcastHub::new(8);
        let sub = hub.register();
        // Nobody reads, so the first write never completes
        let (sink, _frames) = fmpsc::channel::<Message>(0);

        hub.publish("first");
        hub.publish("second");
        let end = write_pump(sink, sub.receiver, LONG, Duration::from_millis(50)).await;
        assert_eq!(end, SessionEnd::WriteTimedOut);
    }

    // ============================================
    // Read pump
    // ============================================

    #[tokio::test]
    async fn test_read_pump_ends_on_close_frame() {
        let frames = futures::stream::iter(vec![
            Ok::<_, io::Error>(Message::Pong(Default::default())),
            Ok(Message::Text("ignored".to_string().into())),
            Ok(Message::Close(None)),
            Ok(Message::Text("never read".to_string().into())),
        ]);

        assert_eq!(read_pump(frames, LONG).await, SessionEnd::ClosedByPeer);
    }

    #[tokio::test]
    async fn test_read_pump_ends_on_error() {
        let frames = futures::stream::iter(vec![Err::<Message, _>(io::Error::other("reset"))]);

        assert_eq!(
            read_pump(frames, LONG).await,
            SessionEnd::ReadFailed("reset".to_string())
        );
    }

    #[tokio::test]
    async fn test_read_pump_times_out_when_silent() {
        let frames = futures::stream::pending::<Result<Message, io::Error>>();

        assert_eq!(
            read_pump(frames, Duration::from_millis(30)).await,
            SessionEnd::PongTimedOut
        );
    }

    #[tokio::test]
    async fn test_read_pump_deadline_refreshes_on_frames() {
        let (tx, frames) = fmpsc::unbounded::<Result<Message, io::Error>>();
        let pong_timeout = Duration::from_millis(200);

        tokio::spawn(async move {
            for _ in 0..5 {
                tokio::time::sleep(Duration::from_millis(50)).await;
                if tx.unbounded_send(Ok(Message::Pong(Default::default()))).is_err() {
                    return;
                }
            }
            // Stay silent without closing the stream
            tokio::time::sleep(LONG).await;
        });

        let started = std::time::Instant::now();
        assert_eq!(read_pump(frames, pong_timeout).await, SessionEnd::PongTimedOut);
        assert!(started.elapsed() >= Duration::from_millis(250));
    }
}
