use std::fmt;

use serde::{Deserialize, Serialize};

// ==================== Execution State ====================

/// Execution state of the debugged program as reported by the server
///
/// `Waiting` is a placeholder the server uses for messages that do not change
/// the execution state; it never alters what the client displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionState {
    Waiting,
    Running,
    Break,
    Stopped,
    Awake,
    Asleep,
}

impl ExecutionState {
    /// Parse the `State` field of a server message.
    ///
    /// Returns `None` for an empty or unrecognised state.
    pub fn from_wire(state: &str) -> Option<Self> {
        match state {
            "waiting" => Some(Self::Waiting),
            "running" => Some(Self::Running),
            "break" => Some(Self::Break),
            "stopped" => Some(Self::Stopped),
            "awake" => Some(Self::Awake),
            "asleep" => Some(Self::Asleep),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Running => "running",
            Self::Break => "break",
            Self::Stopped => "stopped",
            Self::Awake => "awake",
            Self::Asleep => "asleep",
        }
    }

    /// Whether this state carries information worth displaying
    pub fn is_visible(&self) -> bool {
        !matches!(self, Self::Waiting)
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==================== Call Stack ====================

/// One frame of the call stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    /// Function or method name (`{main}` for the top level)
    pub location: String,
    pub filepath: String,
    pub line: u32,
}
