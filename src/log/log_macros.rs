//! Leveled logging macros over any `LogSink`.
//!
//! Levels are gated at compile time by the cargo features `log-trace`,
//! `log-debug`, `log-info`, `log-warn` and `log-error` (each implies the ones
//! above it). A disabled level expands to `()`, so its format arguments are
//! never evaluated.

#[macro_export]
macro_rules! sink_log {
    ($sink:expr, $lvl:expr, $($arg:tt)*) => {{
        let __msg = format!($($arg)*);
        $sink.log($lvl, &__msg, module_path!())
    }};
}

// ---------------------- TRACE ----------------------
#[cfg(feature = "log-trace")]
#[macro_export]
macro_rules! sink_trace {
    ($sink:expr, $($arg:tt)*) => {
        $crate::sink_log!($sink, $crate::log::log_level::LogLevel::Trace, $($arg)*)
    };
}
#[cfg(not(feature = "log-trace"))]
#[macro_export]
macro_rules! sink_trace {
    ($($arg:tt)*) => {
        ()
    };
}

// ---------------------- DEBUG ----------------------
#[cfg(feature = "log-debug")]
#[macro_export]
macro_rules! sink_debug {
    ($sink:expr, $($arg:tt)*) => {
        $crate::sink_log!($sink, $crate::log::log_level::LogLevel::Debug, $($arg)*)
    };
}
#[cfg(not(feature = "log-debug"))]
#[macro_export]
macro_rules! sink_debug {
    ($($arg:tt)*) => {
        ()
    };
}

// ---------------------- INFO ----------------------
#[cfg(feature = "log-info")]
#[macro_export]
macro_rules! sink_info {
    ($sink:expr, $($arg:tt)*) => {
        $crate::sink_log!($sink, $crate::log::log_level::LogLevel::Info, $($arg)*)
    };
}
#[cfg(not(feature = "log-info"))]
#[macro_export]
macro_rules! sink_info {
    ($($arg:tt)*) => {
        ()
    };
}

// ---------------------- WARN ----------------------
#[cfg(feature = "log-warn")]
#[macro_export]
macro_rules! sink_warn {
    ($sink:expr, $($arg:tt)*) => {
        $crate::sink_log!($sink, $crate::log::log_level::LogLevel::Warn, $($arg)*)
    };
}
#[cfg(not(feature = "log-warn"))]
#[macro_export]
macro_rules! sink_warn {
    ($($arg:tt)*) => {
        ()
    };
}

// ---------------------- ERROR ----------------------
#[cfg(feature = "log-error")]
#[macro_export]
macro_rules! sink_error {
    ($sink:expr, $($arg:tt)*) => {
        $crate::sink_log!($sink, $crate::log::log_level::LogLevel::Error, $($arg)*)
    };
}
#[cfg(not(feature = "log-error"))]
#[macro_export]
macro_rules! sink_error {
    ($($arg:tt)*) => {
        ()
    };
}
