//! Interactive session
//!
//! Wires the HTTP backend, the dispatcher and a view together, then runs the
//! push stream and the input loop side by side on one task.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use lookout_utils::Result;

use crate::channel::CommandChannel;
use crate::commands::{parse_command, Command, ParseError, HELP};
use crate::config::ClientConfig;
use crate::connection::{deliver, HttpBackend, StreamClient, StreamUpdate};
use crate::dispatcher::Dispatcher;
use crate::view::View;
use crate::views::ViewRegistry;

/// What the input loop should do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Reload,
    Quit,
}

enum Event {
    Stream(Option<StreamUpdate>),
    Input(std::io::Result<Option<String>>),
}

/// A debugging session against one server
pub struct Session {
    backend: Arc<HttpBackend>,
    view: Arc<dyn View>,
    dispatcher: Dispatcher,
    bootstrap: bool,
}

impl Session {
    pub fn new(config: &ClientConfig, view: Arc<dyn View>) -> Result<Self> {
        let backend = Arc::new(HttpBackend::new(&config.server, config.endpoints.clone())?);
        let views = ViewRegistry::new(backend.clone(), view.clone(), config.recent_files);
        let channel = CommandChannel::new(backend.clone(), view.clone());
        let dispatcher = Dispatcher::new(views, view.clone(), channel)
            .with_inspect_on_break(config.inspect_on_break);

        Ok(Self {
            backend,
            view,
            dispatcher,
            bootstrap: true,
        })
    }

    /// Replay the server's current state when connecting
    pub fn with_bootstrap(mut self, enabled: bool) -> Self {
        self.bootstrap = enabled;
        self
    }

    /// Run until the user quits or input ends
    pub async fn run(&mut self) -> Result<()> {
        tracing::info!(server = %self.backend.base_url(), "Starting session");

        let mut stream = self.connect().await;
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            let event = tokio::select! {
                update = next_update(&mut stream) => Event::Stream(update),
                line = lines.next_line() => Event::Input(line),
            };

            match event {
                Event::Stream(Some(update)) => deliver(update, &mut self.dispatcher),
                Event::Stream(None) => stream = None,
                Event::Input(Ok(Some(line))) => match self.execute(&line) {
                    Flow::Continue => {}
                    Flow::Reload => {
                        if let Some(mut old) = stream.take() {
                            old.close();
                        }
                        self.dispatcher.reset();
                        stream = self.connect().await;
                    }
                    Flow::Quit => break,
                },
                Event::Input(Ok(None)) => break,
                Event::Input(Err(e)) => return Err(e.into()),
            }
        }

        tracing::info!("Session ended");
        Ok(())
    }

    /// Subscribe to the push stream and replay the current state
    async fn connect(&mut self) -> Option<StreamClient> {
        let source = match self.backend.subscribe() {
            Ok(source) => source,
            Err(e) => {
                tracing::error!(error = %e, "Failed to subscribe to message stream");
                self.view.show_feedback(&e.to_string());
                return None;
            }
        };

        if self.bootstrap {
            if let Err(e) = self.dispatcher.bootstrap(self.backend.as_ref()).await {
                tracing::warn!(error = %e, "Bootstrap failed, continuing with live messages");
            }
        }

        Some(StreamClient::new(Box::new(source)))
    }

    /// Execute one line of user input
    pub fn execute(&mut self, line: &str) -> Flow {
        let command = match parse_command(line) {
            Ok(command) => command,
            Err(ParseError::Empty) => return Flow::Continue,
            Err(e) => {
                self.view.show_feedback(&e.to_string());
                return Flow::Continue;
            }
        };
        tracing::debug!(?command, "User command");

        match command {
            Command::Open(filepath) => self.dispatcher.open_file(&filepath),
            Command::Close(filepath) => {
                if !self.dispatcher.close_file(&filepath) {
                    self.view.show_feedback(&format!("{} is not open", filepath));
                }
            }
            Command::Toggle { filepath, line } => {
                match filepath.or_else(|| self.dispatcher.views().active()) {
                    Some(filepath) => self.dispatcher.toggle_breakpoint(&filepath, line),
                    None => self.view.show_feedback("No file is open; use `break <file> <line>`"),
                }
            }
            Command::Debugger(command) => self.dispatcher.send(command),
            Command::Raw(instruction) => self.dispatcher.send_instruction(&instruction),
            Command::Files => {
                let active = self.dispatcher.views().active();
                for filepath in self.dispatcher.views().open_paths() {
                    let marker = if active.as_deref() == Some(filepath.as_str()) {
                        "*"
                    } else {
                        " "
                    };
                    println!("{} {}", marker, filepath);
                }
            }
            Command::Recent => {
                for filepath in self.dispatcher.views().recent() {
                    println!("  {}", filepath);
                }
            }
            Command::Help => println!("{}", HELP),
            Command::Reload => return Flow::Reload,
            Command::Quit => return Flow::Quit,
        }
        Flow::Continue
    }
}

async fn next_update(stream: &mut Option<StreamClient>) -> Option<StreamUpdate> {
    match stream {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::testing::{RecordingView, ViewCall};
    use lookout_utils::LookoutError;

    fn session() -> (Session, Arc<RecordingView>) {
        let view = Arc::new(RecordingView::new());
        let session = Session::new(&ClientConfig::default(), view.clone()).unwrap();
        (session, view)
    }

    #[test]
    fn test_invalid_server_rejected() {
        let config = ClientConfig {
            server: "::not a url".into(),
            ..ClientConfig::default()
        };
        let result = Session::new(&config, Arc::new(RecordingView::new()));
        assert!(matches!(result, Err(LookoutError::Config(_))));
    }

    #[tokio::test]
    async fn test_execute_flow() {
        let (mut session, _view) = session();
        assert_eq!(session.execute(""), Flow::Continue);
        assert_eq!(session.execute("reload"), Flow::Reload);
        assert_eq!(session.execute("quit"), Flow::Quit);
    }

    #[tokio::test]
    async fn test_execute_reports_parse_errors() {
        let (mut session, view) = session();
        session.execute("jump 4");
        assert_eq!(view.feedback(), vec!["unknown command: jump (try `help`)".to_string()]);
    }

    #[tokio::test]
    async fn test_toggle_without_open_file() {
        let (mut session, view) = session();
        session.execute("break 12");
        assert_eq!(view.feedback().len(), 1);
        assert!(view.feedback()[0].contains("No file is open"));
    }

    #[tokio::test]
    async fn test_close_unknown_file() {
        let (mut session, view) = session();
        session.execute("close a.php");
        assert_eq!(
            view.calls(),
            vec![ViewCall::Feedback("a.php is not open".into())]
        );
    }
}
