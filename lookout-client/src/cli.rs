//! Command-line argument parsing for the lookout client
//!
//! Uses clap for argument parsing with derive macros.

use clap::Parser;
use std::path::PathBuf;

use crate::config::ClientConfig;

/// lookout - terminal client for a remote step debugger
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Debugger server URL
    ///
    /// Overrides `server` from the config file.
    /// Example: http://127.0.0.1:9090
    #[arg(long, short = 's', env = "LOOKOUT_SERVER")]
    pub server: Option<String>,

    /// Custom config file path
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Skip replaying the server's current state on startup
    #[arg(long, default_value_t = false)]
    pub no_bootstrap: bool,

    /// Log debug output to stderr instead of the log file
    #[arg(long, short = 'v', default_value_t = false)]
    pub verbose: bool,
}

impl Args {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Load the config file and apply overrides
    pub fn resolve_config(&self) -> ClientConfig {
        let mut config = match &self.config {
            Some(path) => ClientConfig::load_from(path),
            None => ClientConfig::load(),
        };
        if let Some(server) = &self.server {
            config.server = server.clone();
        }
        config
    }

    pub fn bootstrap_enabled(&self) -> bool {
        !self.no_bootstrap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_args() {
        let args = Args::parse_from(["lookout"]);
        assert!(args.config.is_none());
        assert!(args.bootstrap_enabled());
        assert!(!args.verbose);
    }

    #[test]
    fn test_flags() {
        let args = Args::parse_from([
            "lookout",
            "--server",
            "http://10.0.0.5:9090",
            "--no-bootstrap",
            "-v",
        ]);
        assert_eq!(args.server.as_deref(), Some("http://10.0.0.5:9090"));
        assert!(!args.bootstrap_enabled());
        assert!(args.verbose);
    }

    #[test]
    fn test_server_overrides_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server = \"http://from-file:9090\"\ninspect_on_break = true").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let args = Args::parse_from(["lookout", "--config", &path]);
        let config = args.resolve_config();
        assert_eq!(config.server, "http://from-file:9090");
        assert!(config.inspect_on_break);

        let args = Args::parse_from(["lookout", "--config", &path, "-s", "http://cli:1"]);
        assert_eq!(args.resolve_config().server, "http://cli:1");
    }
}
