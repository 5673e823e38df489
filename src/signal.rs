//! Ctrl+C handling for cancelling a scan.
//!
//! A single `AtomicBool` is shared between the signal hook, the walker and the
//! redundancy detector. The walker polls it at every directory, the detector
//! before every pair. Once set, both return their `Interrupted` error and the
//! application exits with code 130.
//!
//! ```rust,no_run
//! use dupetree::scanner::{Walker, WalkerConfig};
//! use dupetree::signal::install_handler;
//!
//! let handler = install_handler();
//! let walker = Walker::new(WalkerConfig::default()).with_shutdown_flag(handler.get_flag());
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Shared shutdown flag.
///
/// Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    /// Create a handler with no shutdown requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether Ctrl+C was pressed or [`Self::request_shutdown`] was called.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Request a shutdown without a signal.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// The flag to hand to [`crate::scanner::Walker`] and
    /// [`crate::duplicates::DetectorConfig`].
    #[must_use]
    pub fn get_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// Clear the flag.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

static GLOBAL_HANDLER: OnceLock<ShutdownHandler> = OnceLock::new();

/// Install the process-wide Ctrl+C hook and return its handler.
///
/// The hook can only be registered once per process. Later calls (several
/// `run_app` invocations in one test binary, for instance) get the same
/// handler back with its flag cleared. If registration fails because another
/// hook owns the signal, an unhooked handler is returned; it still honours
/// [`ShutdownHandler::request_shutdown`].
pub fn install_handler() -> ShutdownHandler {
    let handler = GLOBAL_HANDLER.get_or_init(|| {
        let handler = ShutdownHandler::new();
        let flag = handler.get_flag();

        let installed = ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);

            let _ = writeln!(std::io::stderr(), "\nInterrupted. Cleaning up...");
            let _ = std::io::stderr().flush();

            log::info!("Shutdown signal received");
        });
        if let Err(e) = installed {
            log::debug!("Ctrl+C handler not installed ({}), using unhooked handler", e);
        }
        handler
    });

    handler.reset();
    handler.clone()
}
