//! Message dispatch
//!
//! Classifies each server message, applies it to the session state and
//! projects the change onto the view. State is mutated synchronously in
//! message order. Work that needs a file view to exist first runs as a
//! continuation that paints from the state current when the view is ready,
//! so a late continuation never paints a superseded break or a removed
//! breakpoint.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinSet;

use lookout_protocol::{
    decode_snapshot, variable_nodes, DebuggerCommand, ExecutionState, Location, MessageType,
    ProtocolError, Scope, ServerMessage, StackFrame,
};
use lookout_utils::{LookoutError, Result};

use crate::channel::CommandChannel;
use crate::connection::{MessageHandler, StateFetcher, TerminalReason};
use crate::state::SessionState;
use crate::view::{HighlightKind, View};
use crate::views::ViewRegistry;

/// How long a refreshed view keeps its attention marker
const ATTENTION_DURATION: Duration = Duration::from_secs(1);

const SERVER_GONE: &str = "The server has gone away. Use `reload` to reconnect.";

/// Message classes, in matching precedence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Break,
    BreakpointList,
    Stopped,
    Context,
    Property,
    Stack,
    UpdateSource,
    Awake,
    Asleep,
    Init,
    Other,
}

/// Classify a message by type, command and state
pub fn classify(msg: &ServerMessage) -> MessageKind {
    let state = msg.execution_state();
    let command = msg.command();

    if msg.message_type == MessageType::Init {
        return MessageKind::Init;
    }
    if !msg.is_response() {
        return MessageKind::Other;
    }

    if state == Some(ExecutionState::Break) && msg.location().is_some() {
        MessageKind::Break
    } else if command == Some("breakpoint_list") {
        MessageKind::BreakpointList
    } else if state == Some(ExecutionState::Stopped) {
        MessageKind::Stopped
    } else if command == Some("context_get") {
        MessageKind::Context
    } else if command == Some("property_get") {
        MessageKind::Property
    } else if command == Some("stack_get") {
        MessageKind::Stack
    } else if command == Some("update_source") && msg.location().is_some() {
        MessageKind::UpdateSource
    } else if state == Some(ExecutionState::Awake) {
        MessageKind::Awake
    } else if state == Some(ExecutionState::Asleep) {
        MessageKind::Asleep
    } else {
        MessageKind::Other
    }
}

/// Paints file views from the current session state
#[derive(Clone)]
struct Painter {
    state: Arc<Mutex<SessionState>>,
    views: ViewRegistry,
    view: Arc<dyn View>,
}

impl Painter {
    /// Highlight every breakpoint of a file and the break if it is there.
    ///
    /// With `focus_break` the view is also activated and scrolled to the
    /// break.
    fn paint_file(&self, filepath: &str, focus_break: bool) {
        if self.views.has(filepath).is_none() {
            return;
        }

        let (breakpoints, current_break) = {
            let state = self.state.lock();
            (
                state.breakpoints_in(filepath),
                state
                    .current_break()
                    .filter(|location| location.filepath == filepath)
                    .cloned(),
            )
        };

        for bp in breakpoints {
            self.view
                .highlight_line(filepath, bp.line, HighlightKind::Breakpoint);
        }
        if let Some(location) = current_break {
            self.view
                .highlight_line(filepath, location.line, HighlightKind::Break);
            if focus_break {
                self.views.activate(filepath);
                self.view.scroll_to_line(filepath, location.line);
            }
        }
    }

    /// Open a view if needed, then paint it
    fn open_and_paint(&self, filepath: String, focus_break: bool) -> impl Future<Output = ()> + Send + 'static {
        let opening = self.views.open(&filepath);
        let painter = self.clone();
        async move {
            if opening.await.is_ok() {
                painter.paint_file(&filepath, focus_break);
            }
        }
    }

    fn clear_break(&self, location: &Location) {
        if self.views.has(&location.filepath).is_some() {
            self.view
                .clear_highlight(&location.filepath, location.line, HighlightKind::Break);
        }
    }
}

/// Drives session state and the view from server messages and user actions
pub struct Dispatcher {
    state: Arc<Mutex<SessionState>>,
    painter: Painter,
    channel: CommandChannel,
    tasks: JoinSet<()>,
    inspect_on_break: bool,
    replaying: bool,
}

impl Dispatcher {
    pub fn new(views: ViewRegistry, view: Arc<dyn View>, channel: CommandChannel) -> Self {
        let state = Arc::new(Mutex::new(SessionState::new()));
        Self {
            painter: Painter {
                state: state.clone(),
                views,
                view,
            },
            state,
            channel,
            tasks: JoinSet::new(),
            inspect_on_break: false,
            replaying: false,
        }
    }

    /// Request the call stack and variables after every live break
    pub fn with_inspect_on_break(mut self, enabled: bool) -> Self {
        self.inspect_on_break = enabled;
        self
    }

    /// Snapshot of the session state
    pub fn state(&self) -> SessionState {
        self.state.lock().clone()
    }

    pub fn views(&self) -> &ViewRegistry {
        &self.painter.views
    }

    fn view(&self) -> &dyn View {
        self.painter.view.as_ref()
    }

    fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.reap();
        self.tasks.spawn(task);
    }

    fn reap(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            if let Err(e) = result {
                tracing::error!(error = %e, "View task failed");
            }
        }
    }

    /// Wait for every outstanding continuation
    pub async fn settle(&mut self) {
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "View task failed");
            }
        }
    }

    // ==================== Messages ====================

    /// Apply one server message
    pub fn handle(&mut self, msg: ServerMessage) {
        let kind = classify(&msg);
        tracing::debug!(?kind, command = ?msg.command(), state = %msg.state, "Handling message");

        match kind {
            MessageKind::Break => self.on_break(&msg),
            MessageKind::BreakpointList => self.on_breakpoint_list(&msg),
            MessageKind::Stopped => {
                self.clear_current_break();
                self.view().set_controls_enabled(false);
            }
            MessageKind::Context => self.on_context(&msg),
            MessageKind::Property => self.on_property(&msg),
            MessageKind::Stack => self.on_stack(&msg),
            MessageKind::UpdateSource => self.on_update_source(&msg),
            MessageKind::Awake => {
                self.view().set_listening(true);
                self.clear_current_break();
            }
            MessageKind::Asleep => {
                self.view().set_listening(false);
                self.clear_current_break();
                self.view().set_controls_enabled(false);
            }
            MessageKind::Init => tracing::debug!("Debug session initialised"),
            MessageKind::Other => {}
        }

        self.apply_execution_state(msg.execution_state());
    }

    fn apply_execution_state(&mut self, state: Option<ExecutionState>) {
        let changed = self.state.lock().apply_execution_state(state);
        if let (true, Some(state)) = (changed, state) {
            self.view().set_execution_state_indicator(state);
        }
    }

    fn on_break(&mut self, msg: &ServerMessage) {
        let Some(location) = msg.location() else {
            return;
        };
        if location.line == 0 {
            tracing::warn!(filepath = %location.filepath, "Break without a line number, ignoring");
            return;
        }

        let previous = self.state.lock().apply_break(location.clone());
        if let Some(previous) = previous {
            self.painter.clear_break(&previous);
        }

        let task = self.painter.open_and_paint(location.filepath, true);
        self.spawn(task);
        self.view().set_controls_enabled(true);

        if self.inspect_on_break && !self.replaying {
            let channel = self.channel.clone();
            self.spawn(async move {
                let _ = channel.send(&DebuggerCommand::StackGet).await;
                let _ = channel
                    .send(&DebuggerCommand::ContextGet { scope: Scope::Local })
                    .await;
            });
        }
    }

    fn clear_current_break(&mut self) {
        let cleared = self.state.lock().apply_stopped();
        if let Some(location) = cleared {
            self.painter.clear_break(&location);
        }
    }

    fn on_breakpoint_list(&mut self, msg: &ServerMessage) {
        let Some(listing) = msg.breakpoints.clone() else {
            tracing::warn!("Breakpoint list without breakpoints, ignoring");
            return;
        };

        let mut list = Vec::new();
        for result in listing.into_breakpoints() {
            match result {
                Ok(bp) => list.push(bp),
                Err(e) => tracing::warn!(error = %e, "Skipping invalid breakpoint"),
            }
        }

        let diff = self.state.lock().apply_breakpoint_list(list);
        if diff.is_empty() {
            return;
        }
        tracing::debug!(added = diff.added.len(), removed = diff.removed.len(), "Breakpoints changed");

        for bp in &diff.removed {
            if self.painter.views.has(&bp.filepath).is_some() {
                self.view()
                    .clear_highlight(&bp.filepath, bp.line, HighlightKind::Breakpoint);
            }
        }

        let files: BTreeSet<String> = diff.added.into_iter().map(|bp| bp.filepath).collect();
        for filepath in files {
            if self.painter.views.has(&filepath).is_some() {
                self.painter.paint_file(&filepath, false);
            } else {
                let task = self.painter.open_and_paint(filepath, false);
                self.spawn(task);
            }
        }
    }

    fn on_context(&mut self, msg: &ServerMessage) {
        let Some(context) = &msg.context else {
            tracing::warn!("context_get response without context, ignoring");
            return;
        };

        // An empty local scope shows globals instead.
        // TODO: confirm whether this fallback should stay once scopes are selectable.
        let applied = {
            let mut state = self.state.lock();
            state.apply_variables(Scope::Local, variable_nodes(&context.local))
                || (context.local.is_empty()
                    && state.apply_variables(Scope::Global, variable_nodes(&context.global)))
        };
        if applied {
            self.render_variables();
        }
    }

    fn on_property(&mut self, msg: &ServerMessage) {
        let Some(context) = &msg.context else {
            tracing::warn!("property_get response without context, ignoring");
            return;
        };
        let entries = if context.local.is_empty() {
            &context.global
        } else {
            &context.local
        };

        let mut applied = false;
        {
            let mut state = self.state.lock();
            for (full_name, var) in entries {
                applied |= state.apply_variable_children(full_name, variable_nodes(&var.children));
            }
        }
        if applied {
            self.render_variables();
        }
    }

    fn render_variables(&self) {
        let (scope, nodes) = {
            let state = self.state.lock();
            let (scope, nodes) = state.variables();
            (scope, nodes.to_vec())
        };
        self.view().render_variables(scope, &nodes);
    }

    fn on_stack(&mut self, msg: &ServerMessage) {
        let Some(frames) = msg.stacktrace.clone() else {
            tracing::warn!("stack_get response without a stack trace, ignoring");
            return;
        };
        let frames: Vec<StackFrame> = frames.into_iter().map(Into::into).collect();

        self.state.lock().apply_call_stack(frames.clone());
        self.view().render_call_stack(&frames);
    }

    fn on_update_source(&mut self, msg: &ServerMessage) {
        let Some(location) = msg.location() else {
            return;
        };
        let filepath = location.filepath;
        if self.painter.views.has(&filepath).is_none() {
            tracing::debug!(%filepath, "Source update for a file with no view");
            return;
        }

        let painter = self.painter.clone();
        self.spawn(async move {
            if let Ok(true) = painter.views.refresh(&filepath).await {
                painter.paint_file(&filepath, false);
                painter.view.set_attention(&filepath, true);
                tokio::time::sleep(ATTENTION_DURATION).await;
                painter.view.set_attention(&filepath, false);
            }
        });
    }

    // ==================== Bootstrap ====================

    /// Replay recorded messages through the live path
    pub fn replay(&mut self, messages: Vec<ServerMessage>) {
        self.replaying = true;
        for msg in messages {
            self.handle(msg);
        }
        self.replaying = false;
    }

    /// Fetch the last known state and replay it.
    ///
    /// Returns the number of messages replayed.
    pub async fn bootstrap(&mut self, fetcher: &dyn StateFetcher) -> Result<usize> {
        let raw = fetcher.fetch_state().await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to fetch current state");
            self.view()
                .show_feedback(&format!("Could not load the current state: {}", e));
            e
        })?;

        let elements = decode_snapshot(&raw).map_err(|e: ProtocolError| {
            tracing::warn!(error = %e, raw = %raw, "Malformed state snapshot");
            LookoutError::invalid_message(format!("state snapshot: {}", e))
        })?;

        let mut messages = Vec::with_capacity(elements.len());
        for (index, element) in elements.into_iter().enumerate() {
            match element {
                Ok(msg) => messages.push(msg),
                Err(e) => tracing::warn!(index, error = %e, "Dropping malformed snapshot message"),
            }
        }

        let count = messages.len();
        tracing::info!(count, "Replaying current state");
        self.replay(messages);
        Ok(count)
    }

    /// Forget all session state and close every view
    pub fn reset(&mut self) {
        self.reap();
        *self.state.lock() = SessionState::new();
        self.painter.views.clear();
    }

    // ==================== User Actions ====================

    /// Open a file, or activate it if it is already open
    pub fn open_file(&mut self, filepath: &str) {
        if self.painter.views.has(filepath).is_some() {
            self.painter.views.activate(filepath);
            return;
        }
        let task = self.painter.open_and_paint(filepath.to_string(), true);
        self.spawn(task);
    }

    pub fn close_file(&mut self, filepath: &str) -> bool {
        self.painter.views.close(filepath)
    }

    /// Ask the server to set or remove the breakpoint on a line.
    ///
    /// The local set only changes when the server sends a fresh listing.
    pub fn toggle_breakpoint(&mut self, filepath: &str, line: u32) {
        let existing = self
            .state
            .lock()
            .breakpoint_at(filepath, line)
            .map(|bp| bp.id.clone());

        let command = match existing {
            Some(id) => DebuggerCommand::BreakpointRemove { id },
            None => DebuggerCommand::BreakpointSet {
                filepath: filepath.to_string(),
                line,
            },
        };
        self.send(command);
    }

    /// Send a typed command in the background
    pub fn send(&mut self, command: DebuggerCommand) {
        let channel = self.channel.clone();
        self.spawn(async move {
            let _ = channel.send(&command).await;
        });
    }

    /// Send a free-form instruction in the background
    pub fn send_instruction(&mut self, instruction: &str) {
        let mut words = instruction.split_whitespace();
        let Some(command) = words.next().map(str::to_string) else {
            return;
        };
        let args: Vec<String> = words.map(str::to_string).collect();

        let channel = self.channel.clone();
        self.spawn(async move {
            let _ = channel.send_raw(&command, &args).await;
        });
    }
}

impl MessageHandler for Dispatcher {
    fn handle(&mut self, msg: ServerMessage) {
        Dispatcher::handle(self, msg);
    }

    fn on_connected(&mut self) {
        tracing::info!("Message stream open");
    }

    fn on_disconnected(&mut self, reason: TerminalReason) {
        if reason == TerminalReason::Closed {
            self.apply_execution_state(Some(ExecutionState::Asleep));
        }
        self.view().set_controls_enabled(false);
        self.view().show_feedback(SERVER_GONE);
    }
}
