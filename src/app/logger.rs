use std::io::Write;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use syslog::{Facility, Formatter3164, LoggerBackend};

/// Log verbosity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Error = 0,
    #[default]
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl FromStr for LogLevel {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(()),
        }
    }
}

type SyslogWriter = syslog::Logger<LoggerBackend, Formatter3164>;

/// Stderr logger with levels, an optional file sink and an optional syslog sink.
pub struct Logger {
    level: LogLevel,
    file: Option<std::fs::File>,
    syslog: Option<Mutex<SyslogWriter>>,
}

impl Logger {
    pub fn new(level: LogLevel, file_path: Option<String>) -> Self {
        let env_file = std::env::var("PANELWATCH_LOG_PATH").ok();
        let path = file_path.or(env_file);
        let file = path.and_then(|p| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(p)
                .ok()
        });
        Self {
            level,
            file,
            syslog: None,
        }
    }

    /// Also forward every line to the local syslog daemon (`daemon` facility).
    /// A missing syslog socket is reported on stderr and otherwise ignored.
    pub fn with_syslog(mut self) -> Self {
        let formatter = Formatter3164 {
            facility: Facility::LOG_DAEMON,
            hostname: None,
            process: env!("CARGO_PKG_NAME").into(),
            pid: std::process::id(),
        };
        match syslog::unix(formatter) {
            Ok(writer) => self.syslog = Some(Mutex::new(writer)),
            Err(err) => eprintln!("syslog unavailable: {err}"),
        }
        self
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level <= self.level
    }

    pub fn log(&self, level: LogLevel, msg: impl AsRef<str>) {
        if !self.enabled(level) {
            return;
        }
        let msg = msg.as_ref();
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        let line = format!("[{ts:.3}] [{level:?}] {msg}");
        eprintln!("{line}");
        if let Some(file) = self.file.as_ref() {
            if let Ok(mut clone) = file.try_clone() {
                let _ = writeln!(clone, "{line}");
            }
        }
        if let Some(writer) = self.syslog.as_ref() {
            if let Ok(mut writer) = writer.lock() {
                let _ = match level {
                    LogLevel::Error => writer.err(msg),
                    LogLevel::Warn => writer.warning(msg),
                    LogLevel::Info => writer.info(msg),
                    LogLevel::Debug | LogLevel::Trace => writer.debug(msg),
                };
            }
        }
    }

    pub fn error(&self, msg: impl AsRef<str>) {
        self.log(LogLevel::Error, msg);
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        self.log(LogLevel::Warn, msg);
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        self.log(LogLevel::Info, msg);
    }

    pub fn debug(&self, msg: impl AsRef<str>) {
        self.log(LogLevel::Debug, msg);
    }
}
