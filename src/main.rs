use anyhow::Context;
use sharad_gear::{
    AutoPrompt, Character, DefinitionStore, GearError, Race, SaveManager, Settings,
    SharedCharacter, logging, load_definitions,
};
use std::panic;

// Sample rigger used when no save name is given.
fn sample_character(store: &DefinitionStore) -> Result<Character, GearError> {
    let mut rigger = Character::new("Dodger", Race::Elf);

    let car = rigger.add_vehicle(store, "Ford Americar")?;
    rigger.add_vehicle_mod(car, store, "Rigger Interface", 0, &AutoPrompt)?;
    rigger.add_vehicle_mod(car, store, "Handling Enhancement", 2, &AutoPrompt)?;
    rigger.add_vehicle_mod(car, store, "Armor", 8, &AutoPrompt)?;

    let home = rigger.add_lifestyle(store, "Middle")?;
    rigger.add_lifestyle_quality(home, store, "Gym", &AutoPrompt)?;
    rigger.add_lifestyle_quality(home, store, "Dangerous Area", &AutoPrompt)?;

    let jazz = rigger.add_drug(store, "Jazz")?;
    rigger.activate_drug(jazz)?;
    Ok(rigger)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().unwrap_or_default();
    if let Err(e) = logging::init(&settings) {
        eprintln!("File logging disabled: {e}");
    }

    // Make sure a panic still lands in the log.
    panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic: {panic_info}");
        eprintln!("{panic_info}");
    }));

    let store = load_definitions(&settings)
        .await
        .context("Failed to load gear definitions")?;

    let character = match std::env::args().nth(1) {
        Some(save_name) => SaveManager::new(&settings.save_dir)
            .load(&save_name)
            .with_context(|| format!("Failed to load save '{save_name}'"))?,
        None => sample_character(&store).context("Failed to build the sample character")?,
    };

    let shared = SharedCharacter::new(character);
    let report = shared.report().await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
