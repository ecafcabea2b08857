//! Leveled logging shared by every component.
//!
//! Components hold an `Arc<dyn LogSink>` and log through the `sink_*!`
//! macros. The process-wide [`Logger`](logger::Logger) writes to a file from a
//! background thread; tests pass a [`NoopLogSink`].
pub mod log_level;
pub mod log_macros;
pub mod log_msg;
pub mod log_sink;
pub mod logger;
pub mod logger_handle;
pub mod noop_log_sink;

pub use log_level::LogLevel;
pub use log_sink::LogSink;
pub use noop_log_sink::NoopLogSink;
