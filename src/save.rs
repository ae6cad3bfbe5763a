use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs::{File, create_dir_all, read_dir, remove_file, write};
use std::path::{Path, PathBuf};

use crate::character::Character;
use crate::error::GearError;

pub const SAVE_DIR: &str = "./data/save";
pub const SAVE_FORMAT_VERSION: u32 = 1;

// What actually lands on disk.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SaveFile {
    pub version: u32,
    pub saved_at: String,
    pub character: Character,
}

#[derive(Clone, Debug)]
pub struct SaveManager {
    save_dir: PathBuf,
    pub available_saves: Vec<String>,
}

impl Default for SaveManager {
    fn default() -> Self {
        Self::new(SAVE_DIR)
    }
}

impl SaveManager {
    pub fn new(save_dir: impl Into<PathBuf>) -> Self {
        let save_dir = save_dir.into();
        Self {
            available_saves: Self::scan_save_files(&save_dir),
            save_dir,
        }
    }

    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    pub fn scan_save_files(save_dir: &Path) -> Vec<String> {
        let Ok(entries) = read_dir(save_dir) else {
            return Vec::new();
        };

        let mut saves: Vec<String> = entries
            .filter_map(|entry| {
                let entry = entry.ok()?;
                let path = entry.path();
                if path.is_file() && path.extension()? == "json" {
                    path.file_stem()?.to_str().map(String::from)
                } else {
                    None
                }
            })
            .collect();
        saves.sort();
        saves
    }

    fn path_for(&self, save_name: &str) -> PathBuf {
        self.save_dir.join(format!("{save_name}.json"))
    }

    pub fn load(&self, save_name: &str) -> Result<Character, GearError> {
        let file = File::open(self.path_for(save_name)).map_err(|e| {
            log::error!("Failed to open save {save_name}: {e}");
            e
        })?;
        let save: SaveFile = serde_json::from_reader(file)?;
        log::info!(
            "Loaded {} from {save_name} (format {}, saved {})",
            save.character.name,
            save.version,
            save.saved_at
        );
        Ok(save.character)
    }

    pub fn save(&mut self, character: &Character, save_name: &str) -> Result<PathBuf, GearError> {
        create_dir_all(&self.save_dir)?;
        let save = SaveFile {
            version: SAVE_FORMAT_VERSION,
            saved_at: Local::now().to_rfc3339(),
            character: character.clone(),
        };
        let save_path = self.path_for(save_name);
        let serialized = serde_json::to_string_pretty(&save)?;
        write(&save_path, serialized)?;
        log::info!("Saved {} to {}", character.name, save_path.display());
        self.available_saves = Self::scan_save_files(&self.save_dir);
        Ok(save_path)
    }

    pub fn delete_save(&mut self, save_name: &str) -> Result<(), GearError> {
        remove_file(self.path_for(save_name))?;
        self.available_saves = Self::scan_save_files(&self.save_dir);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::Race;

    #[test]
    fn test_save_list_and_delete() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut manager = SaveManager::new(dir.path().join("saves"));
        assert!(manager.available_saves.is_empty());

        let character = Character::new("Twitch", Race::Ork);
        let path = manager.save(&character, "twitch").expect("save");
        assert!(path.exists());
        assert_eq!(manager.available_saves, vec![String::from("twitch")]);

        let loaded = manager.load("twitch").expect("load");
        assert_eq!(loaded, character);

        manager.delete_save("twitch").expect("delete");
        assert!(manager.available_saves.is_empty());
        assert!(matches!(manager.load("twitch"), Err(GearError::IO(_))));
    }
}
