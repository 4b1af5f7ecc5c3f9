use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use console::Term;

/// Exit status after a forced quit (128 + SIGINT).
const FORCE_QUIT_STATUS: i32 = 130;

/// Set up the Ctrl+C handler for graceful shutdown.
///
/// The first Ctrl+C raises the returned flag; the mirror executor starts no
/// new jobs once it is set. A second Ctrl+C exits immediately.
pub(crate) fn setup_shutdown_handler() -> Arc<AtomicBool> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
            return;
        }

        let is_tty = Term::stdout().is_term();
        if is_tty {
            eprintln!("\n\nShutdown requested, finishing mirror jobs in flight...");
            eprintln!("Press Ctrl+C again to force quit.");
        } else {
            tracing::warn!("Shutdown requested, finishing mirror jobs in flight");
        }

        flag.store(true, Ordering::Release);

        if tokio::signal::ctrl_c().await.is_ok() {
            if is_tty {
                eprintln!("Force quit!");
            }
            std::process::exit(FORCE_QUIT_STATUS);
        }
    });

    stop
}
