//! Request/response transports used by the session engine

use async_trait::async_trait;

use lookout_utils::Result;

/// Submits instruction strings to the debugger server
#[async_trait]
pub trait CommandTransport: Send + Sync {
    /// POST the instruction and return the raw response body
    async fn post_command(&self, instruction: &str) -> Result<String>;
}

/// Fetches formatted source content for a view
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch_source(&self, filepath: &str) -> Result<String>;
}

/// Fetches the bootstrap snapshot
#[async_trait]
pub trait StateFetcher: Send + Sync {
    /// Return the raw JSON array of recent state-defining messages
    async fn fetch_state(&self) -> Result<String>;
}
