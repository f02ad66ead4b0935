#![deny(missing_docs)]
//! Shared logging utilities for the ask workspace.
//!
//! This crate provides the `ask_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger.
//!
//! Every macro accepts an optional `turn = <id>;` prefix. Tagged lines are
//! rendered as `[turn N] ...` so interleaved turns can be told apart in the
//! log file.

#[doc(hidden)]
pub use log as __log;

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! ask_trace {
    (turn = $turn:expr; $($arg:tt)*) => {{
        $crate::__log::trace!("[turn {}] {}", $turn, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        $crate::__log::trace!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! ask_info {
    (turn = $turn:expr; $($arg:tt)*) => {{
        $crate::__log::info!("[turn {}] {}", $turn, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        $crate::__log::info!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! ask_debug {
    (turn = $turn:expr; $($arg:tt)*) => {{
        $crate::__log::debug!("[turn {}] {}", $turn, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        $crate::__log::debug!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! ask_warn {
    (turn = $turn:expr; $($arg:tt)*) => {{
        $crate::__log::warn!("[turn {}] {}", $turn, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        $crate::__log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! ask_error {
    (turn = $turn:expr; $($arg:tt)*) => {{
        $crate::__log::error!("[turn {}] {}", $turn, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        $crate::__log::error!($($arg)*);
    }};
}

/// Parses a level name such as `"debug"` or `"WARN"` into a filter.
///
/// Returns `None` for unknown names.
pub fn level_from_name(name: &str) -> Option<log::LevelFilter> {
    name.trim().parse().ok()
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    use super::level_from_name;

    #[test]
    fn level_names_are_case_insensitive() {
        assert_eq!(level_from_name("debug"), Some(log::LevelFilter::Debug));
        assert_eq!(level_from_name(" WARN "), Some(log::LevelFilter::Warn));
        assert_eq!(level_from_name("chatty"), None);
    }

    #[test]
    fn turn_tagged_macros_expand() {
        super::initialize_for_tests();
        crate::ask_info!(turn = 3; "settled after {} events", 2);
        crate::ask_debug!("plain {}", "line");
    }
}
