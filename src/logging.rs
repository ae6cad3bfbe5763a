use chrono::Local;
use log::{Level, Metadata, Record};
use once_cell::sync::OnceCell;
use std::fs::{OpenOptions, create_dir_all};
use std::io::Write;
use std::path::PathBuf;

use crate::error::GearError;
use crate::settings::Settings;

pub const LOG_FILE: &str = "gear.log";

#[derive(Debug)]
struct SimpleLogger {
    log_path: PathBuf,
    level: Level,
}

static LOGGER: OnceCell<SimpleLogger> = OnceCell::new();

impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let log_entry = format!(
                "{} {} [{}] - {}\n",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            );
            let log_file = self.log_path.join(LOG_FILE);

            if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(log_file) {
                let _ = file.write_all(log_entry.as_bytes());
            }
        }
    }

    fn flush(&self) {}
}

/// Install the file logger. Debug mode lowers the level from Info to Debug.
pub fn init(settings: &Settings) -> Result<(), GearError> {
    let log_path = settings.log_dir()?;
    create_dir_all(&log_path)?;

    let level = if settings.debug_mode {
        Level::Debug
    } else {
        Level::Info
    };

    LOGGER
        .set(SimpleLogger { log_path, level })
        .map_err(|_| GearError::LoggerAlreadySet)?;
    let logger = LOGGER.get().ok_or(GearError::LoggerAlreadySet)?;

    log::set_logger(logger)?;
    log::set_max_level(level.to_level_filter());
    Ok(())
}
