//! Test utilities & fixtures shared by the integration tests.

use gridmenus::config::EngineConfig;
use gridmenus::host::PlayerId;
use gridmenus::menu::{LoadOptions, MenuDefinition, MenuEngine, MenuRegistry};
use gridmenus::sim::SimHost;
use serde_json::Value;

/// Engine with the given menus registered from JSON values, keyed by file stem.
#[allow(dead_code)]
pub fn engine_from_json(menus: &[(&str, Value)]) -> MenuEngine {
    let mut registry = MenuRegistry::new(LoadOptions::default());
    for (stem, value) in menus {
        registry.insert_value(stem, value).expect("menu fixture must load");
    }
    MenuEngine::new(EngineConfig::default(), registry).with_seed(1234)
}

/// Engine with programmatic menu definitions.
#[allow(dead_code)]
pub fn engine_with(menus: Vec<MenuDefinition>) -> MenuEngine {
    let mut registry = MenuRegistry::new(LoadOptions::default());
    for menu in menus {
        registry.insert(menu);
    }
    MenuEngine::new(EngineConfig::default(), registry).with_seed(1234)
}

/// A simulated server with one online player.
#[allow(dead_code)]
pub fn host_with_player(name: &str) -> (SimHost, PlayerId) {
    let mut host = SimHost::new();
    let player = host.add_player(name);
    (host, player)
}

/// Materials shown in slots `0..n`, `None` for empty slots.
#[allow(dead_code)]
pub fn materials(host: &SimHost, player: PlayerId, n: usize) -> Vec<Option<String>> {
    (0..n)
        .map(|slot| host.slot(player, slot).map(|i| i.material.clone()))
        .collect()
}
