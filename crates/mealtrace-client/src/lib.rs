//! # mealtrace-client
//!
//! The application layer: meal composition, identity resolution and the
//! sync coordinator that keeps the local store and the server of record
//! reconciled. All state-changing flows commit locally first; the network
//! is strictly best-effort on top.

pub mod analyze;
pub mod composer;
pub mod daily;
pub mod identity;
pub mod outcome;
pub mod sync;

mod error;

pub use analyze::{analyze_capture, AnalysisOutcome};
pub use composer::{ComposerState, MealComposer, MealDraft};
pub use error::{ClientError, Result};
pub use identity::IdentityResolver;
pub use sync::SyncCoordinator;

use tracing_subscriber::{fmt, EnvFilter};

/// Initialise logging for the embedding application. Reads `RUST_LOG`,
/// defaulting to debug for our crates and warn for everything else.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("mealtrace_client=debug,mealtrace_net=debug,mealtrace_store=info,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
