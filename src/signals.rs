//! The per-signal table (rewrite targets, observers, skip-once bits) and the
//! static name table used to resolve `-r TERM:KILL` style specs.

use std::path::PathBuf;

/// Lowest standard, non-real-time signal number.
pub const SIG_MIN: i32 = 1;
/// Highest standard, non-real-time signal number.
pub const SIG_MAX: i32 = 31;

/// Sentinel for "no rewrite configured" — distinct from `0` ("drop").
pub const UNSET: i32 = -1;

/// `(name without "SIG", number)`, in signal-number order.
const SIGNAL_NAMES: &[(&str, i32)] = &[
    ("HUP", libc::SIGHUP),
    ("INT", libc::SIGINT),
    ("QUIT", libc::SIGQUIT),
    ("ILL", libc::SIGILL),
    ("TRAP", libc::SIGTRAP),
    ("ABRT", libc::SIGABRT),
    ("BUS", libc::SIGBUS),
    ("FPE", libc::SIGFPE),
    ("KILL", libc::SIGKILL),
    ("USR1", libc::SIGUSR1),
    ("SEGV", libc::SIGSEGV),
    ("USR2", libc::SIGUSR2),
    ("PIPE", libc::SIGPIPE),
    ("ALRM", libc::SIGALRM),
    ("TERM", libc::SIGTERM),
    ("STKFLT", libc::SIGSTKFLT),
    ("CHLD", libc::SIGCHLD),
    ("CONT", libc::SIGCONT),
    ("STOP", libc::SIGSTOP),
    ("TSTP", libc::SIGTSTP),
    ("TTIN", libc::SIGTTIN),
    ("TTOU", libc::SIGTTOU),
    ("URG", libc::SIGURG),
    ("XCPU", libc::SIGXCPU),
    ("XFSZ", libc::SIGXFSZ),
    ("VTALRM", libc::SIGVTALRM),
    ("PROF", libc::SIGPROF),
    ("WINCH", libc::SIGWINCH),
    ("IO", libc::SIGIO),
    ("PWR", libc::SIGPWR),
    ("SYS", libc::SIGSYS),
];

/// Parse a signal given as a decimal number or a symbolic name, with or
/// without the leading `SIG` prefix (e.g. `"15"`, `"TERM"`, `"SIGTERM"`).
/// Matching is case-insensitive on the name form.
pub fn parse_signal(s: &str) -> Option<i32> {
    if let Ok(n) = s.parse::<i32>() {
        return (SIG_MIN..=SIG_MAX).contains(&n).then_some(n);
    }
    let stripped = s.strip_prefix("SIG").or_else(|| s.strip_prefix("sig")).unwrap_or(s);
    SIGNAL_NAMES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(stripped))
        .map(|(_, num)| *num)
}

/// Canonical `SIGxxx` name for a signal number, for debug logging only.
pub fn canonical_name(sig: i32) -> String {
    match SIGNAL_NAMES.iter().find(|(_, num)| *num == sig) {
        Some((name, _)) => format!("SIG{name}"),
        None => sig.to_string(),
    }
}

#[derive(Debug, Clone)]
struct Entry {
    rewrite: i32,
    observer: Option<PathBuf>,
    skip_once: bool,
}

impl Default for Entry {
    fn default() -> Self {
        Entry { rewrite: UNSET, observer: None, skip_once: false }
    }
}

/// Process-wide signal table, indexed by signal number (index 0 unused).
///
/// Populated once during startup by the `cli` module; after that only the
/// `skip_once` bits are ever mutated, and only from the supervisor loop.
#[derive(Debug, Clone)]
pub struct SignalTable {
    entries: [Entry; (SIG_MAX + 1) as usize],
}

impl Default for SignalTable {
    fn default() -> Self {
        SignalTable { entries: std::array::from_fn(|_| Entry::default()) }
    }
}

impl SignalTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, sig: i32) -> Option<&Entry> {
        if (SIG_MIN..=SIG_MAX).contains(&sig) { self.entries.get(sig as usize) } else { None }
    }

    fn entry_mut(&mut self, sig: i32) -> Option<&mut Entry> {
        if (SIG_MIN..=SIG_MAX).contains(&sig) { self.entries.get_mut(sig as usize) } else { None }
    }

    pub fn set_rewrite(&mut self, sig: i32, rewrite: i32) {
        if let Some(e) = self.entry_mut(sig) {
            e.rewrite = rewrite;
        }
    }

    pub fn set_observer(&mut self, sig: i32, path: PathBuf) {
        if let Some(e) = self.entry_mut(sig) {
            e.observer = Some(path);
        }
    }

    pub fn observer(&self, sig: i32) -> Option<&PathBuf> {
        self.entry(sig).and_then(|e| e.observer.as_ref())
    }

    fn rewrite_of(&self, sig: i32) -> i32 {
        self.entry(sig).map(|e| e.rewrite).unwrap_or(UNSET)
    }

    /// `Translate(s)` from the design: signals outside the standard range
    /// are never rewritten; otherwise apply the configured rewrite, which
    /// may itself be `0` ("drop").
    pub fn translate(&self, sig: i32) -> i32 {
        if !(SIG_MIN..=SIG_MAX).contains(&sig) {
            return sig;
        }
        match self.rewrite_of(sig) {
            UNSET => sig,
            r => r,
        }
    }

    /// Defaulting rule for group mode: TSTP/TTOU/TTIN forward as STOP unless
    /// the user configured an explicit rewrite (including a drop to `0`).
    pub fn apply_group_job_control_defaults(&mut self) {
        for sig in [libc::SIGTSTP, libc::SIGTTOU, libc::SIGTTIN] {
            if self.rewrite_of(sig) == UNSET {
                self.set_rewrite(sig, libc::SIGSTOP);
            }
        }
    }

    pub fn arm_skip_once(&mut self, sig: i32) {
        if let Some(e) = self.entry_mut(sig) {
            e.skip_once = true;
        }
    }

    /// Consume the skip-once bit for `sig`, if armed, returning whether it
    /// was set. At most one delivery is ever consumed per arming.
    pub fn take_skip_once(&mut self, sig: i32) -> bool {
        match self.entry_mut(sig) {
            Some(e) if e.skip_once => {
                e.skip_once = false;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_numbers() {
        assert_eq!(parse_signal("15"), Some(libc::SIGTERM));
        assert_eq!(parse_signal("0"), None);
        assert_eq!(parse_signal("32"), None);
    }

    #[test]
    fn parses_symbolic_names_with_and_without_sig_prefix() {
        assert_eq!(parse_signal("TERM"), Some(libc::SIGTERM));
        assert_eq!(parse_signal("SIGTERM"), Some(libc::SIGTERM));
        assert_eq!(parse_signal("term"), Some(libc::SIGTERM));
        assert_eq!(parse_signal("bogus"), None);
    }

    #[test]
    fn translate_passes_through_unset_and_out_of_range() {
        let table = SignalTable::new();
        assert_eq!(table.translate(libc::SIGTERM), libc::SIGTERM);
        assert_eq!(table.translate(40), 40);
    }

    #[test]
    fn translate_applies_rewrite_and_drop() {
        let mut table = SignalTable::new();
        table.set_rewrite(libc::SIGTERM, libc::SIGKILL);
        assert_eq!(table.translate(libc::SIGTERM), libc::SIGKILL);

        table.set_rewrite(libc::SIGINT, 0);
        assert_eq!(table.translate(libc::SIGINT), 0);
    }

    #[test]
    fn group_job_control_defaults_respect_explicit_rewrite() {
        let mut table = SignalTable::new();
        table.set_rewrite(libc::SIGTSTP, 0);
        table.apply_group_job_control_defaults();
        assert_eq!(table.translate(libc::SIGTSTP), 0);
        assert_eq!(table.translate(libc::SIGTTOU), libc::SIGSTOP);
        assert_eq!(table.translate(libc::SIGTTIN), libc::SIGSTOP);
    }

    #[test]
    fn skip_once_consumes_exactly_one_delivery() {
        let mut table = SignalTable::new();
        table.arm_skip_once(libc::SIGHUP);
        assert!(table.take_skip_once(libc::SIGHUP));
        assert!(!table.take_skip_once(libc::SIGHUP));
    }
}
