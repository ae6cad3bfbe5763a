use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::character::Character;
use crate::error::GearError;
use crate::report::CharacterReport;
use crate::save::SaveManager;

/// A character shared between tasks.
///
/// Readers may compute derived values concurrently: entity caches fill
/// through `OnceCell`, so lazy evaluation under a read guard is safe. Any
/// mutation, including ones that only invalidate caches, needs the write guard.
#[derive(Debug, Clone)]
pub struct SharedCharacter(Arc<RwLock<Character>>);

impl SharedCharacter {
    pub fn new(character: Character) -> Self {
        Self(Arc::new(RwLock::new(character)))
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, Character> {
        self.0.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, Character> {
        self.0.write().await
    }

    /// For synchronous callers outside the runtime.
    pub fn blocking_read(&self) -> RwLockReadGuard<'_, Character> {
        self.0.blocking_read()
    }

    pub fn blocking_write(&self) -> RwLockWriteGuard<'_, Character> {
        self.0.blocking_write()
    }

    /// Apply `update` under the write lock.
    pub async fn update<R>(&self, update: impl FnOnce(&mut Character) -> R) -> R {
        let mut character = self.0.write().await;
        update(&mut character)
    }

    pub async fn report(&self) -> CharacterReport {
        CharacterReport::from_character(&*self.0.read().await)
    }

    pub async fn save(&self, manager: &mut SaveManager, save_name: &str) -> Result<PathBuf, GearError> {
        let character = self.0.read().await;
        manager.save(&character, save_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::Attribute;
    use crate::character::Race;

    #[tokio::test]
    async fn test_concurrent_readers_share_one_snapshot() {
        let shared = SharedCharacter::new(Character::new("Sam", Race::Human));
        shared
            .update(|character| character.set_attribute(Attribute::Logic, 5))
            .await;

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                tokio::spawn(async move { shared.read().await.attribute(Attribute::Logic) })
            })
            .collect();
        for task in tasks {
            assert_eq!(task.await.expect("reader task"), 5);
        }
    }

    #[test]
    fn test_blocking_access_outside_runtime() {
        let shared = SharedCharacter::new(Character::new("Sam", Race::Dwarf));
        shared.blocking_write().set_attribute(Attribute::Body, 7);
        assert_eq!(shared.blocking_read().attribute(Attribute::Body), 7);
    }
}
