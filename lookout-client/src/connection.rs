//! Client-server connection management
//!
//! Provides the supervised push-stream subscription and the HTTP
//! transports for commands, source fetches and the bootstrap snapshot.

mod handler;
mod http;
mod stream;
mod transport;

pub use handler::{MessageHandler, TerminalReason};
pub use http::HttpBackend;
pub use stream::{
    deliver, EventSource, ReadyState, SseSource, StreamClient, StreamSupervisor, StreamUpdate,
    TransportEvent,
};
pub use transport::{CommandTransport, SourceFetcher, StateFetcher};

#[cfg(test)]
pub(crate) mod testing {
    pub use super::stream::testing::*;
    pub use super::transport::testing::*;
}
