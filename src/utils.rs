use anyhow::Result;
use std::io::Write;
use std::sync::Mutex;
use log::{LevelFilter, Record};
use std::fs::{File, OpenOptions};
use chrono::{DateTime, Local};

/// Default log file, next to wherever the dashboard is started
pub const DEFAULT_LOG_FILE: &str = "gateboard.log";

pub struct SimpleLogger {
    // stdout belongs to the terminal UI, so output always goes to a file
    log_file: Mutex<File>,
}

impl SimpleLogger {
    pub fn new(log_file_path: Option<&str>) -> Result<Self> {
        let path = log_file_path.unwrap_or(DEFAULT_LOG_FILE);
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(SimpleLogger { log_file: Mutex::new(file) })
    }

    fn format(record: &Record) -> String {
        let now: DateTime<Local> = Local::now();
        format!(
            "[{}] {} [{}:{}] {}\n",
            now.format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.file().unwrap_or("unknown"),
            record.line().unwrap_or(0),
            record.args()
        )
    }
}

impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let line = Self::format(record);
            if let Ok(mut file) = self.log_file.lock() {
                let _ = file.write_all(line.as_bytes());
            }
        }
    }

    fn flush(&self) {
        if let Ok(mut file) = self.log_file.lock() {
            let _ = file.flush();
        }
    }
}

pub fn setup_logging(log_file: Option<&str>, level: LevelFilter) -> Result<()> {
    let logger = SimpleLogger::new(log_file)?;
    log::set_boxed_logger(Box::new(logger))
        .map(|()| log::set_max_level(level))?;

    log::info!("Logging initialized at level: {}", level);
    log::info!("{} version {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    Ok(())
}

/// Cut `text` to `max` characters, marking the cut with an ellipsis
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Log;

    #[test]
    fn test_logger_appends_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.log");
        let logger = SimpleLogger::new(path.to_str()).unwrap();
        log::set_max_level(LevelFilter::Info);

        logger.log(
            &Record::builder()
                .args(format_args!("pairing started"))
                .level(log::Level::Info)
                .file(Some("session.rs"))
                .line(Some(7))
                .build(),
        );
        logger.flush();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("INFO [session.rs:7] pairing started"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Hello, I wanted to ask", 6), "Hello…");
    }
}
