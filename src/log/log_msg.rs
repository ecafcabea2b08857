use crate::log::log_level::LogLevel;

/// One queued log line.
#[derive(Debug, Clone)]
pub struct LogMsg {
    pub level: LogLevel,
    /// Wall clock time the line was produced, in milliseconds.
    pub ts_ms: u64,
    pub text: String,
    /// Module path of the call site.
    pub target: &'static str,
}

impl LogMsg {
    pub fn new(level: LogLevel, text: impl Into<String>, target: &'static str, ts_ms: u64) -> Self {
        Self {
            level,
            ts_ms,
            text: text.into(),
            target,
        }
    }

    /// Renders the line the way it lands in the log file.
    pub fn render(&self) -> String {
        format!(
            "[{}] {} {} | {}",
            self.level, self.ts_ms, self.target, self.text
        )
    }
}
