//! Per-rank logging setup.
//!
//! One `tracing` subscriber is installed process-wide when the default
//! `MachEnv` is created; every event after that point carries the rank
//! as a field so multi-rank runs can be untangled from a single merged
//! log stream.

use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: OnceCell<()> = OnceCell::new();

/// Install the global subscriber. Safe to call more than once; only the
/// first call takes effect.
pub fn init(rank: i32) {
    INIT.get_or_init(|| {
        let filter =
            EnvFilter::try_from_env("OMEGACORE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .init();
        // Stash the rank so formatted lines can include it without every
        // call site threading it through explicitly.
        tracing::info!(rank, "logging initialized");
    });
}
