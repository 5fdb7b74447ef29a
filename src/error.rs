//! Error types for the two fallible phases: configuration parsing and
//! startup syscalls. Modeled on `sandbox-fc/src/network/error.rs` and
//! `guest-agent/src/error.rs`'s `thiserror` enums elsewhere in this lineage.

/// Configuration errors are fatal at startup and map to exit code 1.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid signal `{0}`: expected a decimal number 1-31 or a symbolic name")]
    InvalidSignal(String),

    #[error("invalid rewrite spec `{0}`: expected SIGNAL:REPLACEMENT[:OBSERVER]")]
    InvalidRewriteSpec(String),

    #[error("observer `{path}` for signal {signal} is not executable: {reason}")]
    ObserverNotExecutable { signal: String, path: String, reason: String },

    #[error("no command given to run")]
    MissingCommand,
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Startup syscall errors. Only [`LaunchError::Fork`] is fatal; every other
/// failure path in the launcher is logged at debug and otherwise ignored,
/// per the design's non-fatal startup-syscall rule.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("unable to fork: {0}")]
    Fork(#[source] std::io::Error),
}

pub type LaunchResult<T> = std::result::Result<T, LaunchError>;
