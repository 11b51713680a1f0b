//! Push-stream message handler trait

use lookout_protocol::{ProtocolError, ServerMessage};

/// Why the push stream ended for good
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalReason {
    /// The server closed the stream
    Closed,
    /// The transport kept reconnecting without ever reaching open
    ReconnectExhausted,
}

/// Trait for handling push-stream traffic
pub trait MessageHandler: Send {
    /// Handle a decoded server message
    fn handle(&mut self, msg: ServerMessage);

    /// Called for a payload that failed to decode; the stream continues
    fn on_malformed(&mut self, raw: &str, error: &ProtocolError) {
        tracing::warn!(%error, raw, "Dropping malformed message");
    }

    /// Called when the stream reaches the open state
    fn on_connected(&mut self) {}

    /// Called once when the stream is lost for good
    fn on_disconnected(&mut self, _reason: TerminalReason) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestHandler {
        handled: usize,
        disconnected: Option<TerminalReason>,
    }

    impl MessageHandler for TestHandler {
        fn handle(&mut self, _msg: ServerMessage) {
            self.handled += 1;
        }

        fn on_disconnected(&mut self, reason: TerminalReason) {
            self.disconnected = Some(reason);
        }
    }

    #[test]
    fn test_message_handler_on_disconnected() {
        let mut handler = TestHandler {
            handled: 0,
            disconnected: None,
        };
        handler.on_disconnected(TerminalReason::ReconnectExhausted);
        assert_eq!(handler.disconnected, Some(TerminalReason::ReconnectExhausted));
    }

    #[test]
    fn test_default_hooks_leave_handler_untouched() {
        let mut handler = TestHandler {
            handled: 0,
            disconnected: None,
        };
        let error = lookout_protocol::decode_message("{").unwrap_err();
        handler.on_malformed("{", &error);
        handler.on_connected();
        handler.handle(ServerMessage::default());

        assert_eq!(handler.handled, 1);
        assert!(handler.disconnected.is_none());
    }
}
