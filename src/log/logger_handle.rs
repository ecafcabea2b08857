use std::sync::mpsc;

use crate::{
    clock::now_millis,
    log::{log_level::LogLevel, log_msg::LogMsg, log_sink::LogSink},
};

/// Cloneable, non-blocking front of the process [`Logger`](super::logger::Logger).
///
/// Lines below `min_level` are discarded before they are queued. When the
/// bounded queue is full the line is dropped; logging never blocks the
/// event loop.
#[derive(Clone)]
pub struct LoggerHandle {
    pub(super) tx: mpsc::SyncSender<LogMsg>,
    pub(super) min_level: LogLevel,
}

impl LogSink for LoggerHandle {
    #[inline]
    fn log(&self, level: LogLevel, msg: &str, target: &'static str) {
        let _ = self.try_log(level, msg, target);
    }
}

impl LoggerHandle {
    /// Queues one line.
    ///
    /// # Errors
    /// `TrySendError::Full` when the queue is at capacity and
    /// `TrySendError::Disconnected` once the worker thread is gone.
    pub fn try_log<S: Into<String>>(
        &self,
        level: LogLevel,
        text: S,
        target: &'static str,
    ) -> Result<(), mpsc::TrySendError<LogMsg>> {
        if level < self.min_level {
            return Ok(());
        }
        self.tx
            .try_send(LogMsg::new(level, text, target, now_millis()))
    }
}
