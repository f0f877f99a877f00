//! CLI infrastructure for the `crld` binary
//!
//! Commands evaluate the averaged dynamics of one policy (`solve`) or iterate
//! the learning dynamics (`learn`).

pub mod commands;
pub mod config;
pub mod output;

use tracing_subscriber::EnvFilter;

/// Install the global log subscriber.
///
/// `RUST_LOG` wins over the verbosity flag.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}
