//! Structured logging bootstrap.
//!
//! Grounded on `core/logging.rs`'s `setup_tracing()` in the teacher; the
//! rest of that file (audit log, global `LogManager`, performance macros)
//! has no counterpart need in this crate and is not reproduced.

use tracing_subscriber::EnvFilter;

/// Initializes the global tracing subscriber. Safe to call once; subsequent
/// calls are no-ops (mirrors `tracing_subscriber`'s own idempotency guard).
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
