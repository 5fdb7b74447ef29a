//! The one-shot bootstrap: block signals, arm the stub handlers, detach from
//! the controlling terminal in group mode, fork, and exec the user's command
//! in the child while the parent becomes the supervisor.
//!
//! Fork/exec discipline follows `guest-init`'s `main.rs`: raw `libc` calls,
//! no runtime alive across the `fork()`, `_exit()` (not `std::process::exit`)
//! on every child-side failure path so atexit handlers and shared stdio
//! buffers are never touched twice.

use std::ffi::CString;

use crate::cli::Config;
use crate::error::{LaunchError, LaunchResult};
use crate::log_debug;
use crate::signals::{SIG_MAX, SIG_MIN};
use crate::supervisor;

/// Exit code used when the child's `execvp` fails. Distinct from the
/// generic startup-failure code (1).
const EXEC_FAILURE_EXIT: i32 = 2;

extern "C" fn noop_handler(_signum: libc::c_int) {}

/// Block every standard signal at the process level. Until this is undone
/// (only ever in the forked child, via [`unblock_all`]), no default
/// disposition ever runs and the only way to observe a signal is the
/// synchronous waiter in the supervisor loop.
fn block_all() {
    // SAFETY: sigset is a plain value type; sigfillset only ever sets bits.
    unsafe {
        let mut set: libc::sigset_t = std::mem::zeroed();
        libc::sigemptyset(&mut set);
        for sig in SIG_MIN..=SIG_MAX {
            libc::sigaddset(&mut set, sig);
        }
        libc::sigprocmask(libc::SIG_BLOCK, &set, std::ptr::null_mut());
    }
}

fn unblock_all() {
    // SAFETY: sigemptyset initializes a valid empty set before use.
    unsafe {
        let mut set: libc::sigset_t = std::mem::zeroed();
        libc::sigemptyset(&mut set);
        libc::sigprocmask(libc::SIG_SETMASK, &set, std::ptr::null_mut());
    }
}

/// Install a no-op `sigaction` handler for every standard signal.
///
/// `SIGKILL`/`SIGSTOP` reject handler installation with `EINVAL`; that
/// failure is expected and ignored rather than treated as fatal, since the
/// handler's only purpose is to make a signal observable through the
/// synchronous waiter, and those two are never blocked by the kernel anyway.
fn install_stub_handlers() {
    for sig in SIG_MIN..=SIG_MAX {
        // SAFETY: sa is fully initialized below before being passed to sigaction.
        unsafe {
            let mut sa: libc::sigaction = std::mem::zeroed();
            sa.sa_sigaction = noop_handler as *const () as libc::sighandler_t;
            sa.sa_flags = 0;
            libc::sigemptyset(&mut sa.sa_mask);
            libc::sigaction(sig, &sa, std::ptr::null_mut());
        }
    }
}

/// Give up the controlling terminal, if we have one. Best-effort: there may
/// be no terminal at all (failure is logged at debug and otherwise ignored).
fn detach_controlling_terminal(debug: bool) {
    // SAFETY: TIOCNOTTY on fd 0 is a no-op if fd 0 isn't a controlling tty.
    let rc = unsafe { libc::ioctl(0, libc::TIOCNOTTY) };
    if rc != 0 {
        log_debug!(debug, "failed to detach controlling terminal (errno {})", std::io::Error::last_os_error());
    }
}

fn is_session_leader() -> bool {
    // SAFETY: getsid(0) queries our own session id; no preconditions.
    let sid = unsafe { libc::getsid(0) };
    sid == unsafe { libc::getpid() }
}

/// Run the launcher. Never returns: every path ends the process, either by
/// exiting directly (fork failure) or by handing off to
/// [`supervisor::run`], which is itself `-> !`.
pub fn run(config: Config) -> ! {
    block_all();
    install_stub_handlers();

    let mut table = config.table;

    if config.group_mode {
        let was_leader = is_session_leader();
        detach_controlling_terminal(config.debug);
        if was_leader {
            table.arm_skip_once(libc::SIGHUP);
            table.arm_skip_once(libc::SIGCONT);
        }
    }

    match fork_and_exec(&config.command, config.group_mode) {
        Ok(child_pid) => {
            log_debug!(config.debug, "child spawned with pid {child_pid}");
            supervisor::run(table, config.group_mode, config.debug, child_pid)
        }
        Err(e) => {
            crate::log_error!("{e}");
            std::process::exit(1)
        }
    }
}

/// Fork once. The child unblocks signals, optionally starts a new session
/// and claims the controlling terminal, then execs the user's command
/// (searched along `PATH`, since `execvp` does that natively). The parent
/// returns with the child's PID.
fn fork_and_exec(command: &[String], group_mode: bool) -> LaunchResult<libc::pid_t> {
    // SAFETY: fork() is called before any threads exist in this process.
    let pid = unsafe { libc::fork() };
    if pid < 0 {
        return Err(LaunchError::Fork(std::io::Error::last_os_error()));
    }

    if pid == 0 {
        unblock_all();

        if group_mode {
            // SAFETY: setsid() has no preconditions beyond not already being a group leader.
            unsafe { libc::setsid() };
            // SAFETY: fd 0 is whatever stdin the child inherited; TIOCSCTTY
            // on a non-tty fails harmlessly and is ignored like the original.
            unsafe { libc::ioctl(0, libc::TIOCSCTTY, 0) };
        }

        exec_command(command);
    }

    Ok(pid)
}

/// Replace the child's process image with the user's command. Only returns
/// on failure, having already reported it to stderr.
fn exec_command(command: &[String]) -> ! {
    let Some(cstrings) = to_cstrings(command) else {
        crate::log_error!("command contains an interior NUL byte");
        unsafe { libc::_exit(EXEC_FAILURE_EXIT) };
    };
    let Some(path) = cstrings.first() else {
        crate::log_error!("no command given");
        unsafe { libc::_exit(EXEC_FAILURE_EXIT) };
    };
    let mut argv: Vec<*const libc::c_char> = cstrings.iter().map(|s| s.as_ptr()).collect();
    argv.push(std::ptr::null());

    // SAFETY: argv is NUL-terminated and every pointer stays valid for the
    // duration of this call since `cstrings` is still alive.
    unsafe {
        libc::execvp(path.as_ptr(), argv.as_ptr());
    }

    crate::log_error!("exec of `{}` failed: {}", command.first().map(String::as_str).unwrap_or(""), std::io::Error::last_os_error());
    unsafe { libc::_exit(EXEC_FAILURE_EXIT) };
}

fn to_cstrings(command: &[String]) -> Option<Vec<CString>> {
    command.iter().map(|s| CString::new(s.as_str()).ok()).collect()
}
