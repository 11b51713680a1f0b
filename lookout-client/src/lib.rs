//! lookout-client: Debugger session synchronization
//!
//! Keeps a debugger UI consistent with the state of a remote debug session.
//! Server-pushed messages are classified by the [`Dispatcher`], applied to
//! the [`SessionState`] and projected onto a [`View`]. File views are opened
//! on demand through the [`ViewRegistry`]; commands go back to the server
//! over the [`CommandChannel`].

pub mod app;
pub mod channel;
pub mod cli;
pub mod commands;
pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod state;
pub mod view;
pub mod views;

pub use app::{Flow, Session};
pub use channel::CommandChannel;
pub use commands::{parse_command, Command, ParseError};
pub use config::{ClientConfig, EndpointConfig};
pub use dispatcher::{classify, Dispatcher, MessageKind};
pub use state::{BreakpointDiff, SessionState};
pub use view::{ConsoleView, HighlightKind, View};
pub use views::{RecentFiles, ViewHandle, ViewRegistry};
