//! `initshim` — a minimal PID 1 process supervisor.
//!
//! Launches a single user-specified command, forwards signals received by
//! this process to it (or to its process group), reaps reparented orphans,
//! and exits with the child's final status. See `SPEC_FULL.md` for the full
//! design; this file only wires the three pieces together.

mod cli;
mod error;
mod launcher;
mod log;
mod signals;
mod supervisor;

use crate::log_error;

fn main() -> ! {
    let config = match cli::load() {
        Ok(config) => config,
        Err(e) => {
            log_error!("{e}");
            std::process::exit(1);
        }
    };

    launcher::run(config)
}
