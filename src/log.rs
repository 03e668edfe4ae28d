//! Verbosity-gated, per-task logging.
//!
//! Mirrors the teacher's own `log!`/`LogLevel` convention (see
//! `examples/isgasho-rd/src/thread_group.rs`) but routes through the `log`
//! facade so the embedding application picks the actual sink.

use libc::pid_t;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LogLevel {
    LogCritical,
    LogError,
    LogWarn,
    LogInfo,
    LogDebug,
    LogTrace,
}

impl LogLevel {
    /// True if this level should be emitted at the given verbosity, per
    /// spec §7's "User-visible behaviour" table.
    pub fn enabled_at(self, verbosity: u8) -> bool {
        use LogLevel::*;
        match self {
            LogCritical | LogError => true,
            LogWarn => verbosity >= 1,
            LogInfo => verbosity >= 2,
            LogDebug => verbosity >= 3,
            LogTrace => verbosity >= 4,
        }
    }

    fn facade_level(self) -> log::Level {
        use LogLevel::*;
        match self {
            LogCritical | LogError => log::Level::Error,
            LogWarn => log::Level::Warn,
            LogInfo => log::Level::Info,
            LogDebug => log::Level::Debug,
            LogTrace => log::Level::Trace,
        }
    }
}

/// Tid 0 means "no specific task" — used for fleet-wide summaries.
pub const NO_TID: pid_t = 0;

#[doc(hidden)]
pub fn dispatch(level: LogLevel, verbosity: u8, tid: pid_t, args: std::fmt::Arguments) {
    if !level.enabled_at(verbosity) {
        return;
    }
    if tid == NO_TID {
        log::log!(level.facade_level(), "{}", args);
    } else {
        log::log!(level.facade_level(), "[{}] {}", tid, args);
    }
}

/// `log!(verbosity, LogDebug, tid, "fmt {}", x)`
#[macro_export]
macro_rules! log {
    ($verbosity:expr, $level:expr, $tid:expr, $($arg:tt)*) => {
        $crate::log::dispatch($level, $verbosity, $tid, format_args!($($arg)*))
    };
}
