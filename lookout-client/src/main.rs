//! lookout - terminal client for a remote step debugger
//!
//! Follows a debug session on a lookout-compatible server: breaks,
//! breakpoints, variables and the call stack are printed as they change,
//! and debugger commands are read from standard input.

use std::sync::Arc;

use lookout_client::cli::Args;
use lookout_client::{ConsoleView, Session};
use lookout_utils::{init_logging, LogConfig, Result};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    init_logging(LogConfig::client(args.verbose))?;
    tracing::info!("lookout client starting");
    tracing::debug!("CLI args: {:?}", args);

    match run_app(args).await {
        Ok(()) => {
            tracing::info!("lookout client exiting normally");
            Ok(())
        }
        Err(e) => {
            tracing::error!("lookout client error: {}", e);
            eprintln!("Error: {}", e);
            Err(e)
        }
    }
}

async fn run_app(args: Args) -> Result<()> {
    let config = args.resolve_config();
    println!("Connecting to {} (type `help` for commands)", config.server);

    let view = Arc::new(ConsoleView::new());
    let mut session = Session::new(&config, view)?.with_bootstrap(args.bootstrap_enabled());
    session.run().await
}
