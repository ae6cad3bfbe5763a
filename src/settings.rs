// Import necessary libraries and modules for file I/O and serialization.
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::definitions::DEFAULT_LANGUAGE;
use crate::error::GearError;

pub const SETTINGS_FILE: &str = "./data/settings.json";

// Define a structure to hold application settings with serialization and deserialization capabilities.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub language: String,           // Language of the definition data (e.g. "en-us").
    pub data_dir: Option<PathBuf>,  // On-disk data pack; the embedded one is used when unset.
    pub save_dir: PathBuf,          // Where characters are saved.
    pub log_dir: Option<PathBuf>,   // Defaults to ~/sharad/data.
    pub confirm_deletions: bool,    // Ask before removing gear.
    pub debug_mode: bool,           // Log at debug level.
}

// Implement the Default trait for Settings to provide a method to create default settings.
impl Default for Settings {
    fn default() -> Self {
        Settings {
            language: DEFAULT_LANGUAGE.to_string(),
            data_dir: None,
            save_dir: PathBuf::from(crate::save::SAVE_DIR),
            log_dir: None,
            confirm_deletions: true,
            debug_mode: false,
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    // Load settings from the default file path.
    pub fn load() -> io::Result<Self> {
        Self::load_settings_from_file(SETTINGS_FILE)
    }

    // Save current settings to the default file path.
    pub fn save(&self) -> io::Result<()> {
        self.save_to_file(SETTINGS_FILE)
    }

    pub fn load_settings_from_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let data = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&data)?;
        Ok(settings)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();
        let data = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?; // Create the directory if it doesn't exist.
        }
        let mut file = fs::File::create(path)?;
        file.write_all(data.as_bytes())?;
        Ok(())
    }

    /// Directory the log file is written to.
    pub fn log_dir(&self) -> Result<PathBuf, GearError> {
        match &self.log_dir {
            Some(dir) => Ok(dir.clone()),
            None => dir::home_dir()
                .map(|home| home.join("sharad").join("data"))
                .ok_or(GearError::NoHomeDirectory),
        }
    }
}
