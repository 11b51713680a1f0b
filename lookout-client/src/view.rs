//! View collaborator contract
//!
//! The session engine never draws anything itself. It drives an
//! implementation of [`View`] through these narrow calls; the `lookout`
//! binary uses [`ConsoleView`], tests use the recorder in `testing`.

use lookout_protocol::{ExecutionState, Scope, StackFrame, VariableNode};

/// What a line highlight means
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HighlightKind {
    Breakpoint,
    Break,
}

/// Display surface driven by the session engine
///
/// Calls that target a file with no open view must be no-ops.
pub trait View: Send + Sync {
    /// Create the view for a file once its formatted content is known
    fn open_view(&self, filepath: &str, content: &str);

    /// Swap the content of an already open view
    fn replace_content(&self, filepath: &str, content: &str);

    fn close_view(&self, filepath: &str);

    fn activate_view(&self, filepath: &str);

    /// Activate whichever view comes first, if any
    fn activate_first_view(&self);

    fn highlight_line(&self, filepath: &str, line: u32, kind: HighlightKind);

    fn clear_highlight(&self, filepath: &str, line: u32, kind: HighlightKind);

    fn scroll_to_line(&self, filepath: &str, line: u32);

    /// Draw attention to a view whose content just changed
    fn set_attention(&self, filepath: &str, on: bool);

    fn render_variables(&self, scope: Scope, nodes: &[VariableNode]);

    fn render_call_stack(&self, frames: &[StackFrame]);

    fn set_execution_state_indicator(&self, state: ExecutionState);

    /// Enable or disable the step/run controls
    fn set_controls_enabled(&self, enabled: bool);

    /// Whether the server is listening for debug connections
    fn set_listening(&self, listening: bool);

    fn show_feedback(&self, message: &str);
}

// ==================== Console View ====================

/// Plain-text view for the terminal binary
#[derive(Debug, Default)]
pub struct ConsoleView;

impl ConsoleView {
    pub fn new() -> Self {
        Self
    }

    fn print_nodes(nodes: &[VariableNode], depth: usize) {
        for node in nodes {
            let marker = if node.is_composite && !node.has_loaded_children {
                "+"
            } else {
                " "
            };
            println!(
                "{}{} {} ({}) = {}",
                "  ".repeat(depth),
                marker,
                node.display_name,
                node.type_label(),
                node.value
            );
            Self::print_nodes(&node.children, depth + 1);
        }
    }
}

impl View for ConsoleView {
    fn open_view(&self, filepath: &str, content: &str) {
        println!("[open] {} ({} lines)", filepath, content.lines().count());
    }

    fn replace_content(&self, filepath: &str, content: &str) {
        println!("[reload] {} ({} lines)", filepath, content.lines().count());
    }

    fn close_view(&self, filepath: &str) {
        println!("[close] {}", filepath);
    }

    fn activate_view(&self, filepath: &str) {
        println!("[active] {}", filepath);
    }

    fn activate_first_view(&self) {}

    fn highlight_line(&self, filepath: &str, line: u32, kind: HighlightKind) {
        match kind {
            HighlightKind::Breakpoint => println!("[breakpoint] {}:{}", filepath, line),
            HighlightKind::Break => println!("[break] => {}:{}", filepath, line),
        }
    }

    fn clear_highlight(&self, filepath: &str, line: u32, kind: HighlightKind) {
        if kind == HighlightKind::Breakpoint {
            println!("[breakpoint removed] {}:{}", filepath, line);
        }
    }

    fn scroll_to_line(&self, _filepath: &str, _line: u32) {}

    fn set_attention(&self, filepath: &str, on: bool) {
        if on {
            println!("[updated] {}", filepath);
        }
    }

    fn render_variables(&self, scope: Scope, nodes: &[VariableNode]) {
        println!("[{} variables]", scope);
        Self::print_nodes(nodes, 1);
    }

    fn render_call_stack(&self, frames: &[StackFrame]) {
        println!("[call stack]");
        for (depth, frame) in frames.iter().enumerate() {
            println!(
                "  #{} {} at {}:{}",
                depth, frame.location, frame.filepath, frame.line
            );
        }
    }

    fn set_execution_state_indicator(&self, state: ExecutionState) {
        println!("[state] {}", state);
    }

    fn set_controls_enabled(&self, enabled: bool) {
        tracing::debug!(enabled, "Controls toggled");
    }

    fn set_listening(&self, listening: bool) {
        if listening {
            println!("[listening for debug connections]");
        } else {
            println!("[not listening]");
        }
    }

    fn show_feedback(&self, message: &str) {
        eprintln!("! {}", message);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;

    /// One recorded view call
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum ViewCall {
        Open(String),
        Replace(String),
        Close(String),
        Activate(String),
        ActivateFirst,
        Highlight(String, u32, HighlightKind),
        Clear(String, u32, HighlightKind),
        Scroll(String, u32),
        Attention(String, bool),
        Variables(Scope, Vec<String>),
        CallStack(usize),
        Indicator(ExecutionState),
        Controls(bool),
        Listening(bool),
        Feedback(String),
    }

    /// View that records every call for assertions
    #[derive(Debug, Default)]
    pub struct RecordingView {
        calls: Mutex<Vec<ViewCall>>,
    }

    impl RecordingView {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<ViewCall> {
            self.calls.lock().clone()
        }

        pub fn take(&self) -> Vec<ViewCall> {
            std::mem::take(&mut *self.calls.lock())
        }

        pub fn count(&self, call: &ViewCall) -> usize {
            self.calls.lock().iter().filter(|c| *c == call).count()
        }

        pub fn feedback(&self) -> Vec<String> {
            self.calls
                .lock()
                .iter()
                .filter_map(|c| match c {
                    ViewCall::Feedback(msg) => Some(msg.clone()),
                    _ => None,
                })
                .collect()
        }

        fn push(&self, call: ViewCall) {
            self.calls.lock().push(call);
        }
    }

    impl View for RecordingView {
        fn open_view(&self, filepath: &str, _content: &str) {
            self.push(ViewCall::Open(filepath.into()));
        }

        fn replace_content(&self, filepath: &str, _content: &str) {
            self.push(ViewCall::Replace(filepath.into()));
        }

        fn close_view(&self, filepath: &str) {
            self.push(ViewCall::Close(filepath.into()));
        }

        fn activate_view(&self, filepath: &str) {
            self.push(ViewCall::Activate(filepath.into()));
        }

        fn activate_first_view(&self) {
            self.push(ViewCall::ActivateFirst);
        }

        fn highlight_line(&self, filepath: &str, line: u32, kind: HighlightKind) {
            self.push(ViewCall::Highlight(filepath.into(), line, kind));
        }

        fn clear_highlight(&self, filepath: &str, line: u32, kind: HighlightKind) {
            self.push(ViewCall::Clear(filepath.into(), line, kind));
        }

        fn scroll_to_line(&self, filepath: &str, line: u32) {
            self.push(ViewCall::Scroll(filepath.into(), line));
        }

        fn set_attention(&self, filepath: &str, on: bool) {
            self.push(ViewCall::Attention(filepath.into(), on));
        }

        fn render_variables(&self, scope: Scope, nodes: &[VariableNode]) {
            self.push(ViewCall::Variables(
                scope,
                nodes.iter().map(|n| n.full_name.clone()).collect(),
            ));
        }

        fn render_call_stack(&self, frames: &[StackFrame]) {
            self.push(ViewCall::CallStack(frames.len()));
        }

        fn set_execution_state_indicator(&self, state: ExecutionState) {
            self.push(ViewCall::Indicator(state));
        }

        fn set_controls_enabled(&self, enabled: bool) {
            self.push(ViewCall::Controls(enabled));
        }

        fn set_listening(&self, listening: bool) {
            self.push(ViewCall::Listening(listening));
        }

        fn show_feedback(&self, message: &str) {
            self.push(ViewCall::Feedback(message.into()));
        }
    }
}
