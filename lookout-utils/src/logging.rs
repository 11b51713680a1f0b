//! Logging setup for the lookout client
//!
//! The console view owns stdout, so log lines go to `lookout.log` in the
//! state directory. `--verbose` sends them to stderr instead and lowers the
//! default filter to debug for the lookout crates. `LOOKOUT_LOG` overrides
//! the filter in both cases.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{paths, LookoutError, Result};

/// Environment variable holding an `EnvFilter` directive
pub const LOG_ENV: &str = "LOOKOUT_LOG";

const LOG_FILE: &str = "lookout.log";
const QUIET_FILTER: &str = "warn";
const VERBOSE_FILTER: &str = "info,lookout_client=debug,lookout_protocol=debug";

/// Where log lines go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Stderr,
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub output: LogOutput,
    pub filter: String,
}

impl LogConfig {
    /// Logging for the `lookout` binary
    pub fn client(verbose: bool) -> Self {
        Self::resolve(verbose, std::env::var(LOG_ENV).ok())
    }

    fn resolve(verbose: bool, env_filter: Option<String>) -> Self {
        let default_filter = if verbose { VERBOSE_FILTER } else { QUIET_FILTER };
        let filter = env_filter
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| default_filter.to_string());

        let output = if verbose {
            LogOutput::Stderr
        } else {
            LogOutput::File(paths::log_dir().join(LOG_FILE))
        };

        Self { output, filter }
    }
}

/// Install the global subscriber
pub fn init_logging(config: LogConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.filter)
        .map_err(|e| LookoutError::config(format!("Invalid log filter: {}", e)))?;

    let layer = fmt::layer().with_target(true);
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.output {
        LogOutput::Stderr => registry.with(layer.with_writer(std::io::stderr)).try_init(),
        LogOutput::File(path) => {
            let file = open_log_file(&path)?;
            registry
                .with(layer.with_writer(Mutex::new(file)).with_ansi(false))
                .try_init()
        }
    };

    installed.map_err(|e| LookoutError::internal(format!("Failed to init logging: {}", e)))
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    if let Some(dir) = path.parent() {
        paths::ensure_dir(dir).map_err(|e| LookoutError::FileWrite {
            path: dir.to_path_buf(),
            source: e,
        })?;
    }

    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| LookoutError::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })
}
