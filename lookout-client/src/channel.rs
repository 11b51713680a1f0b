//! Outbound command channel
//!
//! Commands are fire-and-forget: the server acknowledges acceptance with a
//! fixed body and reports the outcome later on the push stream. Failures are
//! shown to the user and never retried.

use std::sync::Arc;

use lookout_protocol::{join_instruction, DebuggerCommand, COMMAND_ACK};
use lookout_utils::{LookoutError, Result};

use crate::connection::CommandTransport;
use crate::view::View;

/// Sends debugger commands and reports rejections
#[derive(Clone)]
pub struct CommandChannel {
    transport: Arc<dyn CommandTransport>,
    view: Arc<dyn View>,
}

impl CommandChannel {
    pub fn new(transport: Arc<dyn CommandTransport>, view: Arc<dyn View>) -> Self {
        Self { transport, view }
    }

    /// Send a typed command
    pub async fn send(&self, command: &DebuggerCommand) -> Result<()> {
        self.submit(command.to_instruction()).await
    }

    /// Send a command name with positional arguments
    pub async fn send_raw<S: AsRef<str>>(&self, command: &str, args: &[S]) -> Result<()> {
        self.submit(join_instruction(command, args)).await
    }

    async fn submit(&self, instruction: String) -> Result<()> {
        tracing::debug!(instruction = %instruction, "Sending command");

        match self.transport.post_command(&instruction).await {
            Ok(body) if body.trim() == COMMAND_ACK => Ok(()),
            Ok(body) => {
                tracing::warn!(
                    instruction = %instruction,
                    response = %body,
                    "Command was not accepted"
                );
                let err = LookoutError::CommandRejected {
                    command: instruction,
                    response: body.trim().to_string(),
                };
                self.view.show_feedback(&err.to_string());
                Err(err)
            }
            Err(e) => {
                tracing::warn!(instruction = %instruction, error = %e, "Command failed");
                self.view
                    .show_feedback(&format!("Command `{}` failed: {}", instruction, e));
                Err(e)
            }
        }
    }
}
