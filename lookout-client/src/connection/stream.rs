//! Push-stream subscription with one reconnection grace cycle
//!
//! The transport underneath retries on its own. A single failure while
//! connecting is not reported; a second one without an intervening open
//! means the server is gone. A definitive close is reported immediately.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest_eventsource::{Event, EventSource as SseStream, ReadyState as SseReadyState};

use lookout_protocol::{decode_message, ProtocolError, ServerMessage};

use super::handler::{MessageHandler, TerminalReason};

/// Transport phase at the time of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Connecting,
    Open,
    Closed,
}

/// Low-level events from a push-stream transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Open,
    /// One whole message payload
    Message(String),
    Error { phase: ReadyState },
}

/// A source of push-stream events
#[async_trait]
pub trait EventSource: Send {
    /// Next event; `None` once the source is exhausted
    async fn next_event(&mut self) -> Option<TransportEvent>;

    /// Stop the underlying transport
    fn close(&mut self);
}

/// What the supervisor decided about one transport event
#[derive(Debug)]
pub enum StreamUpdate {
    Message(ServerMessage),
    Malformed { raw: String, error: ProtocolError },
    Connected,
    Terminal(TerminalReason),
}

/// Tracks the reconnection grace cycle
#[derive(Debug, Default)]
pub struct StreamSupervisor {
    reconnect_in_progress: bool,
}

impl StreamSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reconnect_in_progress(&self) -> bool {
        self.reconnect_in_progress
    }

    /// Map a transport event to an update.
    ///
    /// Returns the update and whether the source must be closed explicitly.
    /// `None` means no visible action.
    pub fn on_event(&mut self, event: TransportEvent) -> (Option<StreamUpdate>, bool) {
        match event {
            TransportEvent::Message(raw) => {
                let update = match decode_message(&raw) {
                    Ok(msg) => StreamUpdate::Message(msg),
                    Err(error) => StreamUpdate::Malformed { raw, error },
                };
                (Some(update), false)
            }
            TransportEvent::Open => {
                self.reconnect_in_progress = false;
                (Some(StreamUpdate::Connected), false)
            }
            TransportEvent::Error {
                phase: ReadyState::Closed,
            } => (Some(StreamUpdate::Terminal(TerminalReason::Closed)), false),
            TransportEvent::Error { phase } => {
                if self.reconnect_in_progress {
                    self.reconnect_in_progress = false;
                    tracing::warn!(?phase, "Stream failed again while reconnecting");
                    (
                        Some(StreamUpdate::Terminal(TerminalReason::ReconnectExhausted)),
                        true,
                    )
                } else {
                    self.reconnect_in_progress = true;
                    tracing::info!(?phase, "Stream interrupted, waiting for reconnect");
                    (None, false)
                }
            }
        }
    }
}

/// A supervised push-stream subscription
pub struct StreamClient {
    source: Box<dyn EventSource>,
    supervisor: StreamSupervisor,
    finished: bool,
}

impl StreamClient {
    pub fn new(source: Box<dyn EventSource>) -> Self {
        Self {
            source,
            supervisor: StreamSupervisor::new(),
            finished: false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Close the subscription without a terminal notice
    pub fn close(&mut self) {
        if !self.finished {
            self.source.close();
            self.finished = true;
        }
    }

    /// Wait for the next visible update.
    ///
    /// Yields exactly one `Terminal` update, then `None` forever.
    pub async fn next(&mut self) -> Option<StreamUpdate> {
        while !self.finished {
            let event = match self.source.next_event().await {
                Some(event) => event,
                None => TransportEvent::Error {
                    phase: ReadyState::Closed,
                },
            };

            let (update, close) = self.supervisor.on_event(event);
            if close {
                self.source.close();
            }
            if let Some(update) = update {
                if matches!(update, StreamUpdate::Terminal(_)) {
                    self.finished = true;
                }
                return Some(update);
            }
        }
        None
    }

    /// Drive the subscription to its end, delivering into `handler`
    pub async fn run(mut self, handler: &mut dyn MessageHandler) {
        while let Some(update) = self.next().await {
            deliver(update, handler);
        }
    }
}

/// Hand one update to a handler
pub fn deliver(update: StreamUpdate, handler: &mut dyn MessageHandler) {
    match update {
        StreamUpdate::Message(msg) => handler.handle(msg),
        StreamUpdate::Malformed { raw, error } => handler.on_malformed(&raw, &error),
        StreamUpdate::Connected => handler.on_connected(),
        StreamUpdate::Terminal(reason) => {
            tracing::warn!(?reason, "Message stream lost");
            handler.on_disconnected(reason);
        }
    }
}

// ==================== Server-Sent Events ====================

/// Event name the server uses to end the stream
const CLOSE_EVENT: &str = "close";

/// Push-stream source over server-sent events
pub struct SseSource {
    inner: SseStream,
}

impl SseSource {
    pub fn new(inner: SseStream) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl EventSource for SseSource {
    async fn next_event(&mut self) -> Option<TransportEvent> {
        match self.inner.next().await? {
            Ok(Event::Open) => Some(TransportEvent::Open),
            Ok(Event::Message(message)) if message.event == CLOSE_EVENT => {
                tracing::debug!(data = %message.data, "Server closed the stream");
                self.inner.close();
                Some(TransportEvent::Error {
                    phase: ReadyState::Closed,
                })
            }
            Ok(Event::Message(message)) => Some(TransportEvent::Message(message.data)),
            Err(error) => {
                let phase = match self.inner.ready_state() {
                    SseReadyState::Connecting => ReadyState::Connecting,
                    SseReadyState::Open => ReadyState::Open,
                    SseReadyState::Closed => ReadyState::Closed,
                };
                tracing::debug!(%error, ?phase, "Stream transport error");
                Some(TransportEvent::Error { phase })
            }
        }
    }

    fn close(&mut self) {
        self.inner.close();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;

    /// Replays a fixed list of events
    pub struct ScriptedSource {
        events: VecDeque<TransportEvent>,
        closed: Arc<AtomicBool>,
    }

    impl ScriptedSource {
        pub fn new(events: Vec<TransportEvent>) -> (Self, Arc<AtomicBool>) {
            let closed = Arc::new(AtomicBool::new(false));
            let source = Self {
                events: events.into(),
                closed: closed.clone(),
            };
            (source, closed)
        }
    }

    #[async_trait]
    impl EventSource for ScriptedSource {
        async fn next_event(&mut self) -> Option<TransportEvent> {
            if self.closed.load(Ordering::SeqCst) {
                return None;
            }
            self.events.pop_front()
        }

        fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }
}
