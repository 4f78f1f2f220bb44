//! Tracing setup for the simulator.
//!
//! The subscriber is installed with a bootstrap filter before the
//! configuration is read, so config fallbacks are reported. Once the config
//! is known its `log_filter` replaces the bootstrap directive.

use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

/// Directive used until the configuration has been loaded.
pub const BOOTSTRAP_FILTER: &str = "holdout=info";

/// Handle for swapping the active filter.
pub type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Logging setup errors.
#[derive(Debug, Error)]
pub enum LogError {
    /// Directive could not be parsed
    #[error("invalid log filter: {0}")]
    Filter(#[from] ParseError),
    /// Subscriber is gone
    #[error("failed to swap log filter: {0}")]
    Reload(#[from] reload::Error),
}

/// `RUST_LOG` plus a default directive.
pub fn env_filter(directive: &str) -> Result<EnvFilter, LogError> {
    Ok(EnvFilter::from_default_env().add_directive(directive.parse()?))
}

/// Filter layer that can be swapped after installation.
pub fn reloadable_filter(
    directive: &str,
) -> Result<(reload::Layer<EnvFilter, Registry>, FilterHandle), LogError> {
    Ok(reload::Layer::new(env_filter(directive)?))
}

/// Installs the global subscriber with the bootstrap filter.
pub fn init() -> Result<FilterHandle, LogError> {
    let (filter, handle) = reloadable_filter(BOOTSTRAP_FILTER)?;
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
    Ok(handle)
}

/// Replaces the active filter with `directive`.
pub fn apply_filter(handle: &FilterHandle, directive: &str) -> Result<(), LogError> {
    handle.reload(env_filter(directive)?)?;
    Ok(())
}
