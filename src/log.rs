//! Tagged diagnostic output, gated behind the `-v` / `DUMB_INIT_DEBUG` flag.
//!
//! Every line goes to stderr with a fixed `[initshim]` tag; nothing is ever
//! written to stdout. This mirrors `guest-init`'s own `eprintln!` convention
//! for this exact class of binary rather than pulling in `tracing`.

pub const TAG: &str = "[initshim]";

pub fn error(args: std::fmt::Arguments<'_>) {
    eprintln!("{TAG} {args}");
}

pub fn debug_line(enabled: bool, args: std::fmt::Arguments<'_>) {
    if enabled {
        eprintln!("{TAG} {args}");
    }
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::log::error(format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_debug {
    ($debug:expr, $($arg:tt)*) => {
        $crate::log::debug_line($debug, format_args!($($arg)*))
    };
}
