use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use time::OffsetDateTime;

pub enum LogOutput {
    Stdout,
    Stderr,
}

pub struct Logger {
    pub write_to_std: Option<LogOutput>,
    pub severity: Level,
    pub file: Option<Arc<Mutex<File>>>,
    pub enable_colors: bool,
}

impl Logger {
    /// Create a new logger. A file that cannot be opened is skipped and only
    /// the std stream is written.
    pub fn new(
        file_path: Option<PathBuf>,
        severity: Option<Level>,
        write_to_std: Option<LogOutput>,
        enable_colors: bool,
    ) -> Self {
        let file = file_path.and_then(|path| {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .ok()
                .map(|f| Arc::new(Mutex::new(f)))
        });

        Logger {
            write_to_std,
            severity: severity.unwrap_or(Level::Info),
            file,
            enable_colors,
        }
    }

    /// Current UTC time as HH:MM:SS
    fn get_timestamp() -> String {
        let now = OffsetDateTime::now_utc();
        format!("{:02}:{:02}:{:02}", now.hour(), now.minute(), now.second())
    }

    /// Get color code for log level
    fn get_color(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1b[31m",
            Level::Warn => "\x1b[33m",
            Level::Info => "\x1b[36m",
            Level::Debug => "\x1b[35m",
            Level::Trace => "\x1b[37m",
        }
    }

    fn get_reset() -> &'static str {
        "\x1b[0m"
    }

    /// Parse a level name, falling back to info
    pub fn parse_level(raw: &str) -> Level {
        raw.trim().parse::<Level>().unwrap_or(Level::Info)
    }

    /// Initialize logger with environment variables
    ///
    /// `SQLWIKI_LOG` (or `RUST_LOG`) picks the level, `SQLWIKI_LOG_FILE` adds a
    /// log file, `NO_COLOR` disables colors.
    pub fn init() -> Result<(), log::SetLoggerError> {
        let severity = std::env::var("SQLWIKI_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .map(|raw| Self::parse_level(&raw))
            .unwrap_or(Level::Info);

        let file_path = std::env::var_os("SQLWIKI_LOG_FILE").map(PathBuf::from);
        let enable_colors = std::env::var("NO_COLOR").is_err();

        let logger = Logger::new(file_path, Some(severity), Some(LogOutput::Stderr), enable_colors);
        log::set_max_level(LevelFilter::Trace);
        log::set_logger(Box::leak(Box::new(logger)))?;
        Ok(())
    }

    fn format_line(&self, record: &Record, colored: bool) -> String {
        let timestamp = Self::get_timestamp();
        let level_str = record.level().as_str();
        let args = record.args();
        if colored {
            let color = Self::get_color(record.level());
            let reset = Self::get_reset();
            format!("{color}[{timestamp}] {level_str}{reset} {args}\n")
        } else {
            format!("[{timestamp}] {level_str} {args}\n")
        }
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.severity
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        if let Some(write_to_std) = &self.write_to_std {
            let line = self.format_line(record, self.enable_colors);
            match write_to_std {
                LogOutput::Stdout => {
                    let _ = std::io::stdout().write_all(line.as_bytes());
                }
                LogOutput::Stderr => {
                    let _ = std::io::stderr().write_all(line.as_bytes());
                }
            }
        }

        // Files never get colors
        if let Some(file) = &self.file {
            if let Ok(mut file_guard) = file.lock() {
                let _ = file_guard.write_all(self.format_line(record, false).as_bytes());
            }
        }
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
        let _ = std::io::stderr().flush();
        if let Some(file) = &self.file {
            if let Ok(mut file_guard) = file.lock() {
                let _ = file_guard.flush();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_parsing_falls_back_to_info() {
        assert_eq!(Logger::parse_level("debug"), Level::Debug);
        assert_eq!(Logger::parse_level(" WARN "), Level::Warn);
        assert_eq!(Logger::parse_level("sqlwiki=trace"), Level::Info);
    }

    #[test]
    fn severity_filters_records() {
        let logger = Logger::new(None, Some(Level::Warn), None, false);
        let warn = Metadata::builder().level(Level::Warn).build();
        let info = Metadata::builder().level(Level::Info).build();
        assert!(logger.enabled(&warn));
        assert!(!logger.enabled(&info));
    }

    #[test]
    fn timestamp_shape() {
        let ts = Logger::get_timestamp();
        assert_eq!(ts.len(), 8);
        assert_eq!(ts.as_bytes()[2], b':');
        assert_eq!(ts.as_bytes()[5], b':');
    }
}
