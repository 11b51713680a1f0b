//! lookout-protocol: Wire definitions for the debugger server
//!
//! This crate defines the messages pushed by the debugger server, the
//! bootstrap snapshot format and the commands the client sends back, along
//! with the domain value types shared by the client.

pub mod command;
pub mod messages;
pub mod types;

// Re-export main types at crate root
pub use command::{join_instruction, DebuggerCommand, COMMAND_ACK};
pub use messages::{
    decode_message, decode_snapshot, variable_nodes, BreakpointListing, Context, MessageType,
    Properties, ProtocolError, ServerMessage, WireBreakpoint, WireFrame, WireVariable,
};
pub use types::{
    find_variable_mut, Breakpoint, BreakpointId, ExecutionState, Location, Scope, StackFrame,
    VariableNode,
};
