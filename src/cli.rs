//! Argument parsing: turns `std::env::args()` into an immutable [`Config`].
//!
//! Built on `clap`'s derive API the same way the workspace's `runner` binary
//! builds its CLI, but flattened: this tool has no subcommands, only flags
//! followed by the wrapped command.

use std::path::PathBuf;

use clap::Parser;

use crate::error::{ConfigError, ConfigResult};
use crate::signals::{self, SignalTable};

#[derive(Parser)]
#[command(
    name = "initshim",
    version,
    about = "Minimal PID 1 process supervisor: signal forwarding and zombie reaping"
)]
struct Cli {
    /// Forward signals to the child PID only, not its process group.
    #[arg(short = 'c', long = "single-child")]
    single_child: bool,

    /// Rewrite SIGNAL to REPLACEMENT (0 drops it), optionally running OBSERVER
    /// on receipt. May be given multiple times. Format: SIGNAL:REPLACEMENT[:OBSERVER]
    #[arg(short = 'r', long = "rewrite-signal", value_name = "SIGNAL:REPLACEMENT[:OBSERVER]")]
    rewrites: Vec<String>,

    /// Print debug information to stderr.
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// The command to run, and its arguments.
    ///
    /// Not marked `required`: an empty command must reach `load`'s own
    /// check and exit 1 (`ConfigError::MissingCommand`), not clap's own
    /// exit 2, which the spec reserves for a failed child exec.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

/// The immutable record the CLI layer hands to the launcher.
pub struct Config {
    pub group_mode: bool,
    pub debug: bool,
    pub table: SignalTable,
    pub command: Vec<String>,
}

/// Parse `argv`/the environment into a [`Config`], or a fatal [`ConfigError`].
///
/// `clap` itself handles `-h`/`-V` (exiting 0) and malformed flags (exiting
/// 2); everything past that — rewrite specs, observer resolution, the
/// `DUMB_INIT_*` environment overrides — is this function's job.
pub fn load() -> ConfigResult<Config> {
    let cli = Cli::parse();

    if cli.command.is_empty() {
        return Err(ConfigError::MissingCommand);
    }

    let mut table = SignalTable::new();
    for spec in &cli.rewrites {
        parse_rewrite(spec, &mut table)?;
    }

    let mut group_mode = !cli.single_child;
    let mut debug = cli.verbose;

    if std::env::var("DUMB_INIT_DEBUG").as_deref() == Ok("1") {
        debug = true;
    }
    if std::env::var("DUMB_INIT_SETSID").as_deref() == Ok("0") {
        group_mode = false;
    }

    Ok(Config { group_mode, debug, table, command: cli.command })
}

/// Parse one `-r SIGNAL:REPLACEMENT[:OBSERVER]` spec into the table.
fn parse_rewrite(spec: &str, table: &mut SignalTable) -> ConfigResult<()> {
    let mut parts = spec.splitn(3, ':');
    let (Some(sig_s), Some(replacement_s)) = (parts.next(), parts.next()) else {
        return Err(ConfigError::InvalidRewriteSpec(spec.to_string()));
    };
    let observer_s = parts.next();

    let sig = signals::parse_signal(sig_s).ok_or_else(|| ConfigError::InvalidSignal(sig_s.to_string()))?;
    let replacement = parse_replacement(replacement_s)?;

    table.set_rewrite(sig, replacement);

    if let Some(obs) = observer_s {
        let resolved = which::which(obs).map_err(|e| ConfigError::ObserverNotExecutable {
            signal: signals::canonical_name(sig),
            path: obs.to_string(),
            reason: e.to_string(),
        })?;
        table.set_observer(sig, resolved);
    }

    Ok(())
}

/// `REPLACEMENT` accepts everything a signal accepts, plus the literal `0`
/// meaning "drop" (which [`signals::parse_signal`] rejects as out of range).
fn parse_replacement(s: &str) -> ConfigResult<i32> {
    if s == "0" {
        return Ok(0);
    }
    signals::parse_signal(s).ok_or_else(|| ConfigError::InvalidSignal(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrite_without_observer() {
        let mut table = SignalTable::new();
        parse_rewrite("TERM:KILL", &mut table).unwrap();
        assert_eq!(table.translate(libc::SIGTERM), libc::SIGKILL);
    }

    #[test]
    fn rewrite_to_zero_drops() {
        let mut table = SignalTable::new();
        parse_rewrite("2:0", &mut table).unwrap();
        assert_eq!(table.translate(libc::SIGINT), 0);
    }

    #[test]
    fn rewrite_with_unresolvable_observer_is_rejected() {
        let mut table = SignalTable::new();
        let err = parse_rewrite("TERM:TERM:/no/such/observer-binary", &mut table).unwrap_err();
        assert!(matches!(err, ConfigError::ObserverNotExecutable { .. }));
    }

    #[test]
    fn malformed_spec_is_rejected() {
        let mut table = SignalTable::new();
        assert!(parse_rewrite("TERM", &mut table).is_err());
    }

    #[test]
    fn unknown_signal_name_is_rejected() {
        let mut table = SignalTable::new();
        assert!(parse_rewrite("BOGUS:TERM", &mut table).is_err());
    }

    #[test]
    fn observer_resolved_via_path_is_kept() {
        let mut table = SignalTable::new();
        parse_rewrite("TERM:TERM:/bin/true", &mut table).unwrap();
        assert!(table.observer(libc::SIGTERM).is_some());
    }
}
