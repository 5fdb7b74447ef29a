//! The supervisor loop: wait for a pending signal, classify it, and either
//! reap (`SIGCHLD`) or forward it to the child. Runs forever once the
//! launcher hands off, until the primary child is reaped.

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

use crate::signals::{SignalTable, SIG_MAX, SIG_MIN};
use crate::{log_debug, log_error};

/// Block synchronously until one of the standard signals is pending, and
/// return its number. This is the supervisor's only suspension point aside
/// from the non-blocking reap call; the no-op handlers installed by the
/// launcher exist only so a kernel that won't dequeue an ignored signal
/// still lets it reach this waiter.
fn wait_for_signal() -> Option<i32> {
    // SAFETY: set is fully initialized before sigwait reads it; sig is an
    // out-parameter sigwait writes on success.
    unsafe {
        let mut set: libc::sigset_t = std::mem::zeroed();
        libc::sigemptyset(&mut set);
        for sig in SIG_MIN..=SIG_MAX {
            libc::sigaddset(&mut set, sig);
        }
        let mut received: libc::c_int = 0;
        let rc = libc::sigwait(&set, &mut received);
        if rc == 0 { Some(received) } else { None }
    }
}

/// Run the supervisor loop. Never returns: the process exits from inside
/// the reap sub-loop once the primary child has been reaped.
pub fn run(mut table: SignalTable, group_mode: bool, debug: bool, child_pid: libc::pid_t) -> ! {
    if group_mode {
        table.apply_group_job_control_defaults();
    }

    loop {
        let Some(signum) = wait_for_signal() else {
            continue;
        };

        if table.take_skip_once(signum) {
            log_debug!(debug, "skipping pre-armed delivery of {}", crate::signals::canonical_name(signum));
            continue;
        }

        if signum == libc::SIGCHLD {
            if let Some(exit_status) = reap_loop(child_pid, &table, group_mode, debug) {
                std::process::exit(exit_status);
            }
            continue;
        }

        forward(signum, &table, child_pid, group_mode, debug);

        if matches!(signum, libc::SIGTSTP | libc::SIGTTOU | libc::SIGTTIN) {
            log_debug!(debug, "stopping self to mirror child's job-control suspension");
            // SAFETY: getpid() always succeeds.
            let _ = kill(Pid::this(), Signal::SIGSTOP);
        }
    }
}

/// `Forward(s)` from the design: translate, best-effort run the observer,
/// then deliver the translated signal to the child or its process group
/// unless it was rewritten to `0` ("drop").
fn forward(signum: i32, table: &SignalTable, child_pid: libc::pid_t, group_mode: bool, debug: bool) {
    let translated = table.translate(signum);

    if let Some(observer) = table.observer(signum) {
        run_observer(observer, signum, translated, debug);
    }

    if translated == 0 {
        log_debug!(debug, "dropping {}", crate::signals::canonical_name(signum));
        return;
    }

    let target = if group_mode { -child_pid } else { child_pid };
    let Ok(sig) = Signal::try_from(translated) else {
        return;
    };
    log_debug!(
        debug,
        "forwarding {} (translated to {}) to {}",
        crate::signals::canonical_name(signum),
        crate::signals::canonical_name(translated),
        target
    );
    let _ = kill(Pid::from_raw(target), sig);
}

/// Fork once, unblock signals, set the two `DUMB_INIT_*` environment
/// variables, and exec the observer with no arguments. Best-effort: any
/// failure is reported and does not perturb the primary forward.
fn run_observer(observer: &std::path::Path, original: i32, translated: i32, debug: bool) {
    // SAFETY: fork() is safe here; the supervisor remains single-threaded.
    let pid = unsafe { libc::fork() };
    if pid < 0 {
        log_error!("failed to fork observer: {}", std::io::Error::last_os_error());
        return;
    }
    if pid != 0 {
        log_debug!(debug, "spawned observer {} as pid {pid}", observer.display());
        return;
    }

    // Child: unblock signals, set env, exec. Never returns on success.
    // SAFETY: sigemptyset initializes a valid empty set.
    unsafe {
        let mut set: libc::sigset_t = std::mem::zeroed();
        libc::sigemptyset(&mut set);
        libc::sigprocmask(libc::SIG_SETMASK, &set, std::ptr::null_mut());
    }

    // SAFETY: set_var is safe here — the child is single-threaded, having
    // just forked and not yet spawned anything else.
    unsafe {
        std::env::set_var("DUMB_INIT_SIGNUM", original.to_string());
        std::env::set_var("DUMB_INIT_REPLACEMENT_SIGNUM", translated.to_string());
    }

    let Some(path) = observer.to_str().and_then(|s| std::ffi::CString::new(s).ok()) else {
        unsafe { libc::_exit(1) };
    };
    let argv: [*const libc::c_char; 2] = [path.as_ptr(), std::ptr::null()];
    // SAFETY: argv is NUL-terminated and path outlives this call.
    unsafe {
        libc::execv(path.as_ptr(), argv.as_ptr());
    }
    crate::log_error!("exec of observer `{}` failed: {}", observer.display(), std::io::Error::last_os_error());
    unsafe { libc::_exit(1) };
}

/// Drain every immediately-reapable child. Returns `Some(exit_status)` once
/// the primary child has been reaped (per the exit-code law); orphaned
/// descendants and observer processes are reaped and discarded silently.
fn reap_loop(child_pid: libc::pid_t, table: &SignalTable, group_mode: bool, debug: bool) -> Option<i32> {
    let mut primary_exit = None;

    loop {
        let mut status: libc::c_int = 0;
        // SAFETY: status is an out-parameter waitpid writes on success.
        let reaped = unsafe { libc::waitpid(-1, &mut status, libc::WNOHANG) };
        if reaped <= 0 {
            break;
        }

        let exit_status = if libc::WIFEXITED(status) {
            libc::WEXITSTATUS(status)
        } else if libc::WIFSIGNALED(status) {
            128 + libc::WTERMSIG(status)
        } else {
            continue;
        };

        log_debug!(debug, "reaped pid {reaped} with status {exit_status}");

        if reaped == child_pid {
            primary_exit = Some(exit_status);
            break;
        }
    }

    if primary_exit.is_some() {
        forward(libc::SIGTERM, table, child_pid, group_mode, debug);
    }

    primary_exit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::SignalTable;

    #[test]
    fn reap_loop_ignores_orphans_and_waits_for_primary() {
        // A process with no children at all: waitpid(-1, WNOHANG) returns
        // ECHILD immediately, so the loop must terminate without blocking
        // and report no primary exit.
        let table = SignalTable::new();
        let result = reap_loop(999_999, &table, false, false);
        assert_eq!(result, None);
    }
}
