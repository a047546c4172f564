//! Integration tests for loading menu files from disk and reloading them.
mod common;

use common::host_with_player;
use gridmenus::config::EngineConfig;
use gridmenus::menu::{LoadOptions, MenuEngine, MenuRegistry};
use tempfile::tempdir;

const SHOP_TOML: &str = r#"
name = "§6Shop"
rows = 9
open_command = "/shop"
update_interval = 0.01

[items.sword]
slot = [0, "2-3"]
material = "DIAMOND_SWORD"
amount = 500
nbt = "ignored"
tooltip = { display_name = "§bBlade", lore = ["§7Sharp"] }
display_name = "unused"
actions = ["  ", "[message] bought"]

[items.broken]
slot = "x-y"
material = "stone"

[items."4"]
slot = 99
material = "paper"

[items.odd]
material = "dirt"
"#;

const BANK_JSON: &str = r#"{
  "id": "bank",
  "rows": 1,
  "items": [
    {"material": "gold_ingot", "action": {"type": "message", "value": "balance checked"}},
    "not an item",
    {"material": "emerald", "priority": "high"}
  ]
}"#;

#[tokio::test]
async fn files_are_sanitized_on_load() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("shop.toml"), SHOP_TOML).unwrap();
    std::fs::write(dir.path().join("bank.json"), BANK_JSON).unwrap();

    let config = EngineConfig::default();
    let mut registry = MenuRegistry::new(LoadOptions::from(&config));
    let report = registry.load_dir(dir.path()).await.unwrap();
    assert_eq!(report.loaded, vec!["bank", "shop"]);
    assert!(report.failed.is_empty());

    let shop = registry.get("shop").unwrap();
    assert_eq!(shop.rows, 6);
    assert_eq!(shop.open_commands, vec!["shop"]);
    assert_eq!(shop.update_interval_ticks, 1);
    let keys: Vec<&str> = shop.items.iter().map(|e| e.key.as_str()).collect();
    assert_eq!(keys, vec!["sword", "4"]);

    let bank = registry.get("bank").unwrap();
    assert_eq!(bank.open_commands, vec!["gui bank"]);
    assert_eq!(bank.items.len(), 2);

    let mut engine = MenuEngine::new(config, registry);
    let (mut host, p) = host_with_player("Steve");
    engine.open_menu(&mut host, p, "shop").unwrap();
    let window = host.window(p).unwrap();
    assert_eq!(window.slots.keys().copied().collect::<Vec<_>>(), vec![0, 2, 3, 4]);
    let sword = &window.slots[&0];
    assert_eq!(sword.material, "diamond_sword");
    assert_eq!(sword.count, 64);
    assert_eq!(sword.custom_name.as_deref(), Some("§bBlade"));
    assert_eq!(sword.lore, vec!["§7Sharp"]);

    engine.handle_click(&mut host, p, 3);
    engine.open_menu(&mut host, p, "bank").unwrap();
    engine.handle_click(&mut host, p, 0);
    assert_eq!(host.messages_for(p), vec!["bought", "balance checked"]);
}

#[tokio::test]
async fn reload_swaps_definitions_but_not_open_sessions() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("main.toml");
    std::fs::write(&path, "name = \"Old\"\nrows = 1\n").unwrap();

    let mut registry = MenuRegistry::new(LoadOptions::default());
    registry.load_dir(dir.path()).await.unwrap();
    let mut engine = MenuEngine::new(EngineConfig::default(), registry);
    let (mut host, p) = host_with_player("Steve");
    engine.open_menu(&mut host, p, "main").unwrap();

    std::fs::write(&path, "name = \"New\"\nrows = 2\n").unwrap();
    std::fs::write(dir.path().join("extra.json"), "{}").unwrap();
    let report = engine.reload().await.unwrap();
    assert_eq!(report.loaded, vec!["extra", "main"]);

    assert_eq!(engine.session(p).map(|s| s.menu.title.as_str()), Some("Old"));
    assert!(engine.refresh(&mut host, p));
    assert_eq!(engine.session(p).map(|s| s.menu.rows), Some(1));

    engine.open_menu(&mut host, p, "main").unwrap();
    assert_eq!(host.window(p).map(|w| (w.title.as_str(), w.rows)), Some(("New", 2)));
}

#[tokio::test]
async fn unreadable_directory_is_an_error() {
    let dir = tempdir().unwrap();
    let mut registry = MenuRegistry::new(LoadOptions::default());
    assert!(registry.load_dir(dir.path().join("missing")).await.is_err());
}
