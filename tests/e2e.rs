//! End-to-end scenarios driving the compiled binary as a real subprocess,
//! the same "exercise a real OS primitive rather than mock it" style as
//! `runner/src/lock.rs`'s flock tests elsewhere in this lineage.

use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_initshim")
}

/// Give the freshly spawned supervisor time to block signals and fork its
/// child before we start sending it anything.
fn settle() {
    thread::sleep(Duration::from_millis(200));
}

#[test]
fn true_with_no_flags_exits_zero() {
    let status = Command::new(bin())
        .arg("--")
        .arg("/bin/true")
        .stdin(Stdio::null())
        .status()
        .expect("failed to run initshim");
    assert_eq!(status.code(), Some(0));
}

#[test]
fn term_is_forwarded_and_exit_code_reflects_it() {
    let mut child = Command::new(bin())
        .args(["-c", "--", "sleep", "60"])
        .stdin(Stdio::null())
        .spawn()
        .expect("failed to spawn initshim");
    settle();

    unsafe {
        libc::kill(child.id() as libc::pid_t, libc::SIGTERM);
    }

    let status = child.wait().expect("failed to wait on initshim");
    assert_eq!(status.code(), Some(128 + libc::SIGTERM));
}

#[test]
fn rewritten_term_delivers_kill_instead() {
    let mut child = Command::new(bin())
        .args(["-c", "-r", "15:9", "--", "sleep", "60"])
        .stdin(Stdio::null())
        .spawn()
        .expect("failed to spawn initshim");
    settle();

    unsafe {
        libc::kill(child.id() as libc::pid_t, libc::SIGTERM);
    }

    let status = child.wait().expect("failed to wait on initshim");
    assert_eq!(status.code(), Some(128 + libc::SIGKILL));
}

#[test]
fn dropped_signal_never_reaches_child() {
    let mut child = Command::new(bin())
        .args(["-c", "-r", "2:0", "--", "sleep", "60"])
        .stdin(Stdio::null())
        .spawn()
        .expect("failed to spawn initshim");
    settle();

    for _ in 0..3 {
        unsafe {
            libc::kill(child.id() as libc::pid_t, libc::SIGINT);
        }
        thread::sleep(Duration::from_millis(50));
    }
    // The child must still be alive: INT was dropped, not forwarded.
    assert_eq!(child.try_wait().expect("try_wait failed"), None);

    unsafe {
        libc::kill(child.id() as libc::pid_t, libc::SIGTERM);
    }
    let status = child.wait().expect("failed to wait on initshim");
    assert_eq!(status.code(), Some(128 + libc::SIGTERM));
}

#[test]
fn group_mode_reaps_a_backgrounded_grandchild() {
    let mut child = Command::new(bin())
        .args(["--", "sh", "-c", "sleep 30 & exit 7"])
        .stdin(Stdio::null())
        .spawn()
        .expect("failed to spawn initshim");

    let status = child.wait().expect("failed to wait on initshim");
    assert_eq!(status.code(), Some(7));
}

#[test]
fn bad_rewrite_spec_exits_one() {
    let status = Command::new(bin())
        .args(["-r", "bogus", "--", "/bin/true"])
        .stdin(Stdio::null())
        .status()
        .expect("failed to run initshim");
    assert_eq!(status.code(), Some(1));
}

#[test]
fn missing_command_exits_one_not_two() {
    let status = Command::new(bin())
        .stdin(Stdio::null())
        .status()
        .expect("failed to run initshim");
    assert_eq!(status.code(), Some(1));
}

#[test]
fn help_exits_zero() {
    let status = Command::new(bin())
        .arg("--help")
        .stdin(Stdio::null())
        .status()
        .expect("failed to run initshim");
    assert_eq!(status.code(), Some(0));
}
