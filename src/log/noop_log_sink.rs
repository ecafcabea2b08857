use crate::log::{log_level::LogLevel, log_sink::LogSink};

/// Discards everything. Used by tests and by callers that bring no logger.
#[derive(Debug, Clone, Default)]
pub struct NoopLogSink;

impl LogSink for NoopLogSink {
    #[inline]
    fn log(&self, _level: LogLevel, _msg: &str, _target: &'static str) {}
}
