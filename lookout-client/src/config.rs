//! Client configuration loading
//!
//! Loads server address, endpoint paths and session options from
//! `~/.config/lookout/config.toml`. Every field has a default.

use std::path::Path;

use serde::Deserialize;

/// Default debugger server address
pub const DEFAULT_SERVER: &str = "http://127.0.0.1:9090";

/// Default length of the recent files list
pub const DEFAULT_RECENT_FILES: usize = 5;

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the debugger server
    pub server: String,
    /// Request the call stack and variables after every live break
    pub inspect_on_break: bool,
    /// How many recently opened files to remember
    pub recent_files: usize,
    pub endpoints: EndpointConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.into(),
            inspect_on_break: false,
            recent_files: DEFAULT_RECENT_FILES,
            endpoints: EndpointConfig::default(),
        }
    }
}

/// Endpoint paths, relative to the server URL
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub stream: String,
    pub command: String,
    pub state: String,
    pub formatted_file: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            stream: "message-stream".into(),
            command: "steering-wheel".into(),
            state: "current-state".into(),
            formatted_file: "formatted-file".into(),
        }
    }
}

impl ClientConfig {
    /// Load from the default config file
    pub fn load() -> Self {
        Self::load_from(&lookout_utils::config_file())
    }

    /// Load from a file
    ///
    /// Returns defaults if the file doesn't exist or can't be parsed.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!("Config file not found, using defaults");
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<ClientConfig>(&content) {
                Ok(config) => {
                    tracing::debug!(
                        "Loaded config from {}: server={}, inspect_on_break={}",
                        path.display(),
                        config.server,
                        config.inspect_on_break
                    );
                    config.normalized()
                }
                Err(e) => {
                    tracing::warn!("Failed to parse config file: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    fn normalized(mut self) -> Self {
        if self.recent_files == 0 {
            tracing::warn!(
                "recent_files must be at least 1, using {}",
                DEFAULT_RECENT_FILES
            );
            self.recent_files = DEFAULT_RECENT_FILES;
        }
        if self.server.trim().is_empty() {
            self.server = DEFAULT_SERVER.into();
        }
        self
    }
}
