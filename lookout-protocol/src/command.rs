//! Outbound debugger commands
//!
//! A command is submitted as a single instruction string: the command name
//! followed by its positional arguments, joined with single spaces.

use std::fmt;

use crate::types::{BreakpointId, Scope};

/// Response body the server sends when it accepts a command
pub const COMMAND_ACK: &str = "Got it.";

/// Commands understood by the debugger server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebuggerCommand {
    BreakpointSet { filepath: String, line: u32 },
    BreakpointRemove { id: BreakpointId },
    StepOver,
    StepInto,
    StepOut,
    Run,
    Continue,
    /// Fetch the variables of a scope; local is the server default
    ContextGet { scope: Scope },
    StackGet,
    /// Fetch the children of a composite variable
    PropertyGet { full_name: String },
    /// Ask the server to push fresh content for a file
    UpdateSource { filepath: String },
    /// Start listening for debug connections
    On,
    /// Stop listening for debug connections
    Off,
}

impl DebuggerCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::BreakpointSet { .. } => "breakpoint_set",
            Self::BreakpointRemove { .. } => "breakpoint_remove",
            Self::StepOver => "step_over",
            Self::StepInto => "step_into",
            Self::StepOut => "step_out",
            Self::Run => "run",
            Self::Continue => "continue",
            Self::ContextGet { .. } => "context_get",
            Self::StackGet => "stack_get",
            Self::PropertyGet { .. } => "property_get",
            Self::UpdateSource { .. } => "update_source",
            Self::On => "on",
            Self::Off => "off",
        }
    }

    /// Positional arguments, in wire order
    pub fn args(&self) -> Vec<String> {
        match self {
            Self::BreakpointSet { filepath, line } => vec![filepath.clone(), line.to_string()],
            Self::BreakpointRemove { id } => vec![id.to_string()],
            Self::ContextGet { scope: Scope::Global } => vec![Scope::Global.to_string()],
            Self::PropertyGet { full_name } => vec![full_name.clone()],
            Self::UpdateSource { filepath } => vec![filepath.clone()],
            _ => Vec::new(),
        }
    }

    /// The instruction string submitted to the server
    pub fn to_instruction(&self) -> String {
        join_instruction(self.name(), &self.args())
    }
}

impl fmt::Display for DebuggerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_instruction())
    }
}

/// Join a command name and its positional arguments with single spaces
pub fn join_instruction<S: AsRef<str>>(command: &str, args: &[S]) -> String {
    let mut instruction = command.to_string();
    for arg in args {
        instruction.push(' ');
        instruction.push_str(arg.as_ref());
    }
    instruction
}
