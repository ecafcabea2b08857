use crate::{
    config::Config,
    log::{log_level::LogLevel, log_msg::LogMsg, logger_handle::LoggerHandle},
};

use std::{
    fs::{self, OpenOptions},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    sync::mpsc,
    thread,
    time::{SystemTime, UNIX_EPOCH},
};

/// Flush every 100 lines while debugging so a crash keeps the tail.
#[cfg(feature = "log-debug")]
const FLUSH_BATCH_SIZE: u32 = 100;

#[cfg(not(feature = "log-debug"))]
const FLUSH_BATCH_SIZE: u32 = 1_000;

/// Default capacity of the queue between the session thread and the writer.
pub const DEFAULT_QUEUE_CAP: usize = 4_096;

/// Bounded, non-blocking file logger for a meeting client.
///
/// Producers hold a [`LoggerHandle`] and enqueue lines with `try_send`; one
/// background thread appends them to a per-process file and flushes in
/// batches. Dropping every handle (including the one held here) ends the
/// worker after it drains the queue.
pub struct Logger {
    handle: LoggerHandle,
    worker: Option<thread::JoinHandle<()>>,
    file_path: PathBuf,
}

impl Logger {
    /// Starts the logger from the `[Logging]` section.
    ///
    /// Keys: `client_log_filename` (file prefix), `client_log_path`
    /// (directory, `~` expanded) and `level` (minimum level, default `info`).
    /// Without a path the file lands in `logs/` next to the executable.
    #[must_use]
    pub fn start_from_config(config: &Config, cap: usize) -> Self {
        let app_name = config.get_non_empty("Logging", "client_log_filename");
        let min_level = config
            .get_non_empty("Logging", "level")
            .and_then(LogLevel::parse)
            .unwrap_or(LogLevel::Info);

        let dir = config
            .get_non_empty("Logging", "client_log_path")
            .map_or_else(|| exe_dir_fallback_cwd().join("logs"), expand_path);

        Self::start_in_dir(dir, app_name, min_level, cap)
    }

    /// Starts the logger writing into `dir`, creating it when missing.
    ///
    /// The file is named `<app_name>-YYYYMMDD_HHMMSS-pid<N>.log`.
    pub fn start_in_dir<D: AsRef<Path>>(
        dir: D,
        app_name: Option<&str>,
        min_level: LogLevel,
        cap: usize,
    ) -> Self {
        let dir = dir.as_ref().to_path_buf();
        let _ = fs::create_dir_all(&dir);

        let stamp = timestamp_for_filename();
        let pid = std::process::id();
        let fname = match app_name {
            Some(name) => format!("{name}-{stamp}-pid{pid}.log"),
            None => format!("meshrtc-{stamp}-pid{pid}.log"),
        };
        let file_path = dir.join(fname);

        let (tx, rx) = mpsc::sync_channel::<LogMsg>(cap.max(1));
        let handle = LoggerHandle { tx, min_level };

        let worker_path = file_path.clone();
        let worker = thread::Builder::new()
            .name("meshrtc-log".into())
            .spawn(move || write_loop(&rx, open_writer(&worker_path)))
            .ok();

        Self {
            handle,
            worker,
            file_path,
        }
    }

    #[must_use]
    pub fn handle(&self) -> LoggerHandle {
        self.handle.clone()
    }

    #[must_use]
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Closes this logger's sender and waits for the worker to drain.
    ///
    /// Lines sent through outstanding handles keep the worker alive until
    /// those handles are dropped too.
    pub fn shutdown(self) {
        let Logger { handle, worker, .. } = self;
        drop(handle);
        if let Some(worker) = worker {
            let _ = worker.join();
        }
    }
}

/// Target file, then a temp-dir fallback, then a sink. Never panics.
fn open_writer(path: &Path) -> Box<dyn Write + Send> {
    let open = |p: &Path| OpenOptions::new().create(true).append(true).open(p);
    match open(path) {
        Ok(f) => Box::new(f),
        Err(_) => match open(&std::env::temp_dir().join("meshrtc-fallback.log")) {
            Ok(f) => Box::new(f),
            Err(_) => Box::new(io::sink()),
        },
    }
}

fn write_loop(rx: &mpsc::Receiver<LogMsg>, writer: Box<dyn Write + Send>) {
    let mut out = BufWriter::new(writer);
    let mut lines: u32 = 0;
    while let Ok(msg) = rx.recv() {
        let _ = writeln!(out, "{}", msg.render());
        lines = lines.wrapping_add(1);
        if lines.is_multiple_of(FLUSH_BATCH_SIZE) || msg.level >= LogLevel::Error {
            let _ = out.flush();
        }
    }
    let _ = out.flush();
}

fn exe_dir_fallback_cwd() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// `YYYYMMDD_HHMMSS` in UTC.
fn timestamp_for_filename() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format_utc(secs)
}

fn format_utc(secs: u64) -> String {
    let days = secs / 86_400;
    let rem = secs % 86_400;
    let (year, month, day) = civil_from_days(days);
    format!(
        "{year:04}{month:02}{day:02}_{:02}{:02}{:02}",
        rem / 3_600,
        (rem % 3_600) / 60,
        rem % 60
    )
}

/// Gregorian date for a count of days since 1970-01-01.
fn civil_from_days(days: u64) -> (u64, u64, u64) {
    // Shift the epoch to 0000-03-01 so leap days fall at the end of a year.
    let z = days + 719_468;
    let era = z / 146_097;
    let doe = z % 146_097;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + u64::from(month <= 2);
    (year, month, day)
}

/// Expands a leading `~` to `$HOME` (or `%USERPROFILE%`).
fn expand_path(path_str: &str) -> PathBuf {
    let home = || {
        std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .ok()
            .map(PathBuf::from)
    };
    if path_str == "~" {
        if let Some(h) = home() {
            return h;
        }
    }
    if let Some(rest) = path_str
        .strip_prefix("~/")
        .or_else(|| path_str.strip_prefix("~\\"))
    {
        if let Some(h) = home() {
            return h.join(rest);
        }
    }
    PathBuf::from(path_str)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "meshrtc-logger-{tag}-{}-{}",
            std::process::id(),
            crate::clock::now_millis()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn formats_known_instants() {
        assert_eq!(format_utc(0), "19700101_000000");
        // 2024-02-29T12:34:56Z
        assert_eq!(format_utc(1_709_210_096), "20240229_123456");
        // 2000-03-01T00:00:00Z
        assert_eq!(format_utc(951_868_800), "20000301_000000");
    }

    #[test]
    fn expands_plain_paths_unchanged() {
        assert_eq!(expand_path("/var/log/x"), PathBuf::from("/var/log/x"));
        assert_eq!(expand_path("rel/dir"), PathBuf::from("rel/dir"));
    }

    #[test]
    fn writes_lines_at_or_above_min_level() {
        let dir = scratch_dir("write");
        let logger = Logger::start_in_dir(&dir, Some("unit"), LogLevel::Info, 16);
        let h = logger.handle();
        h.try_log(LogLevel::Debug, "hidden", "t").unwrap();
        h.try_log(LogLevel::Warn, "peer p1 failed", "meshrtc::core")
            .unwrap();
        drop(h);
        let path = logger.file_path().to_path_buf();
        assert!(
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("unit-")
        );
        logger.shutdown();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("[WARN]"));
        assert!(text.contains("meshrtc::core | peer p1 failed"));
        assert!(!text.contains("hidden"));
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn config_selects_dir_name_and_level() {
        let dir = scratch_dir("cfg");
        let cfg = Config::parse(&format!(
            "[Logging]\nclient_log_filename = meet\nclient_log_path = {}\nlevel = error\n",
            dir.display()
        ));
        let logger = Logger::start_from_config(&cfg, 8);
        assert!(logger.file_path().starts_with(&dir));
        let h = logger.handle();
        h.try_log(LogLevel::Warn, "dropped", "t").unwrap();
        h.try_log(LogLevel::Error, "kept", "t").unwrap();
        drop(h);
        let path = logger.file_path().to_path_buf();
        logger.shutdown();
        let text = fs::read_to_string(path).unwrap();
        assert!(text.contains("kept"));
        assert!(!text.contains("dropped"));
        let _ = fs::remove_dir_all(dir);
    }
}
