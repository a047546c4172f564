//! In-memory host used by the `preview` command and by tests.
//!
//! `SimHost` records every side effect as a [`SimEvent`] and keeps one
//! [`SimWindow`] per player, so callers can assert on exactly what a real
//! server would have shown.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::host::{
    ArmorSlot, CommandActor, EconomyProvider, Experience, ItemCatalog, ItemStack, Location,
    PermissionProvider, PlayerId, PlayerState, Server, Sound, WindowHost,
};

pub const DEFAULT_WORLD: &str = "world";

const BASE_MATERIALS: &[&str] = &[
    "stone",
    "dirt",
    "grass_block",
    "diamond",
    "emerald",
    "gold_ingot",
    "iron_ingot",
    "paper",
    "book",
    "barrier",
    "arrow",
    "compass",
    "clock",
    "chest",
    "diamond_sword",
    "bread",
    "black_stained_glass_pane",
    "gray_stained_glass_pane",
    "player_head",
    "turtle_helmet",
];

const ARMOR_TIERS: &[&str] = &["leather", "chainmail", "iron", "golden", "diamond", "netherite"];
const ARMOR_PIECES: &[&str] = &["helmet", "chestplate", "leggings", "boots"];

#[derive(Debug, Clone)]
pub struct SimPlayer {
    pub name: String,
    pub online: bool,
    pub permissions: HashSet<String>,
    pub inventory: Vec<ItemStack>,
    pub armor: HashMap<ArmorSlot, ItemStack>,
    pub main_hand: Option<ItemStack>,
    pub off_hand: Option<ItemStack>,
    pub experience: Experience,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimWindow {
    /// Identifier to hand back in `MenuEngine::handle_close`.
    pub id: u64,
    pub title: String,
    pub rows: u8,
    pub slots: BTreeMap<usize, ItemStack>,
    pub open: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    Message { player: PlayerId, text: String },
    Broadcast(String),
    Chat { player: PlayerId, text: String },
    Command { actor: CommandActor, command: String },
    Sound { targets: Vec<PlayerId>, sound: Sound },
    WindowOpened { player: PlayerId, title: String, rows: u8 },
    WindowClosed(PlayerId),
}

#[derive(Debug, Clone)]
pub struct SimHost {
    players: BTreeMap<PlayerId, SimPlayer>,
    worlds: BTreeSet<String>,
    materials: BTreeSet<String>,
    windows: HashMap<PlayerId, SimWindow>,
    events: Vec<SimEvent>,
}

impl Default for SimHost {
    fn default() -> Self {
        Self::new()
    }
}

impl SimHost {
    pub fn new() -> Self {
        let mut materials: BTreeSet<String> = BASE_MATERIALS.iter().map(|m| m.to_string()).collect();
        for tier in ARMOR_TIERS {
            for piece in ARMOR_PIECES {
                materials.insert(format!("{}_{}", tier, piece));
            }
        }
        Self {
            players: BTreeMap::new(),
            worlds: BTreeSet::from([DEFAULT_WORLD.to_string()]),
            materials,
            windows: HashMap::new(),
            events: Vec::new(),
        }
    }

    pub fn add_player(&mut self, name: &str) -> PlayerId {
        let id = PlayerId::random();
        self.players.insert(
            id,
            SimPlayer {
                name: name.to_string(),
                online: true,
                permissions: HashSet::new(),
                inventory: Vec::new(),
                armor: HashMap::new(),
                main_hand: None,
                off_hand: None,
                experience: Experience::default(),
                location: Location::new(DEFAULT_WORLD, 0.0, 64.0, 0.0),
            },
        );
        id
    }

    pub fn player(&self, player: PlayerId) -> Option<&SimPlayer> {
        self.players.get(&player)
    }

    /// Mark a player offline; their window goes away with them.
    pub fn disconnect(&mut self, player: PlayerId) {
        if let Some(p) = self.players.get_mut(&player) {
            p.online = false;
        }
        self.windows.remove(&player);
    }

    pub fn grant_permission(&mut self, player: PlayerId, permission: &str) {
        if let Some(p) = self.players.get_mut(&player) {
            p.permissions.insert(permission.to_lowercase());
        }
    }

    pub fn revoke_permission(&mut self, player: PlayerId, permission: &str) {
        if let Some(p) = self.players.get_mut(&player) {
            p.permissions.remove(&permission.to_lowercase());
        }
    }

    pub fn give_item(&mut self, player: PlayerId, item: ItemStack) {
        if let Some(p) = self.players.get_mut(&player) {
            p.inventory.push(item);
        }
    }

    pub fn set_armor(&mut self, player: PlayerId, slot: ArmorSlot, item: ItemStack) {
        if let Some(p) = self.players.get_mut(&player) {
            p.armor.insert(slot, item);
        }
    }

    pub fn set_main_hand(&mut self, player: PlayerId, item: Option<ItemStack>) {
        if let Some(p) = self.players.get_mut(&player) {
            p.main_hand = item;
        }
    }

    pub fn set_off_hand(&mut self, player: PlayerId, item: Option<ItemStack>) {
        if let Some(p) = self.players.get_mut(&player) {
            p.off_hand = item;
        }
    }

    pub fn set_experience(&mut self, player: PlayerId, experience: Experience) {
        if let Some(p) = self.players.get_mut(&player) {
            p.experience = experience;
        }
    }

    pub fn add_world(&mut self, world: &str) {
        self.worlds.insert(world.to_string());
    }

    pub fn set_location(&mut self, player: PlayerId, location: Location) {
        if let Some(p) = self.players.get_mut(&player) {
            p.location = location;
        }
    }

    pub fn register_material(&mut self, material: &str) {
        self.materials.insert(material.to_lowercase());
    }

    pub fn window(&self, player: PlayerId) -> Option<&SimWindow> {
        self.windows.get(&player)
    }

    /// Item currently shown in `slot` of the player's window.
    pub fn slot(&self, player: PlayerId, slot: usize) -> Option<&ItemStack> {
        self.windows.get(&player).and_then(|w| w.slots.get(&slot))
    }

    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    /// Chat messages sent to one player, in order.
    pub fn messages_for(&self, player: PlayerId) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SimEvent::Message { player: p, text } if *p == player => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn commands(&self) -> Vec<(CommandActor, String)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SimEvent::Command { actor, command } => Some((*actor, command.clone())),
                _ => None,
            })
            .collect()
    }
}

impl PlayerState for SimHost {
    fn is_online(&self, player: PlayerId) -> bool {
        self.players.get(&player).is_some_and(|p| p.online)
    }

    fn player_name(&self, player: PlayerId) -> Option<String> {
        self.players.get(&player).map(|p| p.name.clone())
    }

    fn has_permission(&self, player: PlayerId, permission: &str) -> bool {
        self.players
            .get(&player)
            .is_some_and(|p| p.permissions.contains(&permission.to_lowercase()))
    }

    fn inventory(&self, player: PlayerId) -> Vec<ItemStack> {
        self.players
            .get(&player)
            .map(|p| p.inventory.iter().filter(|i| !i.is_air()).cloned().collect())
            .unwrap_or_default()
    }

    fn armor(&self, player: PlayerId, slot: ArmorSlot) -> Option<ItemStack> {
        self.players.get(&player)?.armor.get(&slot).cloned()
    }

    fn main_hand(&self, player: PlayerId) -> Option<ItemStack> {
        self.players.get(&player)?.main_hand.clone()
    }

    fn off_hand(&self, player: PlayerId) -> Option<ItemStack> {
        self.players.get(&player)?.off_hand.clone()
    }

    fn experience(&self, player: PlayerId) -> Option<Experience> {
        self.players.get(&player).map(|p| p.experience)
    }

    fn location(&self, player: PlayerId) -> Option<Location> {
        self.players.get(&player).map(|p| p.location.clone())
    }

    fn world_exists(&self, world: &str) -> bool {
        self.worlds.contains(world)
    }
}

impl ItemCatalog for SimHost {
    fn lookup(&self, material: &str) -> Option<ItemStack> {
        let material = material.trim().to_lowercase();
        let material = material.strip_prefix("minecraft:").unwrap_or(&material);
        self.materials
            .contains(material)
            .then(|| ItemStack::new(material, 1))
    }

    /// Payloads are `material` or `material*count`.
    fn deserialize(&self, payload: &str) -> Option<ItemStack> {
        let (material, count) = match payload.split_once('*') {
            Some((m, c)) => (m, c.parse::<u32>().ok()?),
            None => (payload, 1),
        };
        let mut item = self.lookup(material)?;
        item.count = count.max(1);
        Some(item)
    }

    fn is_armor(&self, material: &str) -> bool {
        ARMOR_PIECES.iter().any(|piece| material.ends_with(&format!("_{}", piece)))
    }

    fn is_dyeable(&self, material: &str) -> bool {
        material.starts_with("leather_")
    }
}

impl Server for SimHost {
    fn send_message(&mut self, player: PlayerId, text: &str) {
        self.events.push(SimEvent::Message {
            player,
            text: text.to_string(),
        });
    }

    fn broadcast(&mut self, text: &str) {
        self.events.push(SimEvent::Broadcast(text.to_string()));
    }

    fn chat(&mut self, player: PlayerId, text: &str) {
        self.events.push(SimEvent::Chat {
            player,
            text: text.to_string(),
        });
    }

    fn dispatch_command(&mut self, actor: CommandActor, command: &str) {
        self.events.push(SimEvent::Command {
            actor,
            command: command.to_string(),
        });
    }

    fn online_players(&self) -> Vec<PlayerId> {
        self.players
            .iter()
            .filter(|(_, p)| p.online)
            .map(|(id, _)| *id)
            .collect()
    }

    fn players_in_world(&self, world: &str) -> Vec<PlayerId> {
        self.players
            .iter()
            .filter(|(_, p)| p.online && p.location.world == world)
            .map(|(id, _)| *id)
            .collect()
    }

    fn play_sound(&mut self, targets: &[PlayerId], sound: &Sound) {
        self.events.push(SimEvent::Sound {
            targets: targets.to_vec(),
            sound: sound.clone(),
        });
    }

    fn set_experience_level(&mut self, player: PlayerId, level: u32) {
        if let Some(p) = self.players.get_mut(&player) {
            p.experience.level = level;
        }
    }

    fn add_experience_points(&mut self, player: PlayerId, delta: i64) {
        if let Some(p) = self.players.get_mut(&player) {
            let total = p.experience.total_points.unwrap_or(0) as i64;
            p.experience.total_points = Some(total.saturating_add(delta).max(0) as u64);
        }
    }
}

impl WindowHost for SimHost {
    fn open_window(&mut self, player: PlayerId, window: u64, title: &str, rows: u8) {
        self.windows.insert(
            player,
            SimWindow {
                id: window,
                title: title.to_string(),
                rows,
                slots: BTreeMap::new(),
                open: true,
            },
        );
        self.events.push(SimEvent::WindowOpened {
            player,
            title: title.to_string(),
            rows,
        });
    }

    fn set_slot(&mut self, player: PlayerId, slot: usize, item: Option<ItemStack>) {
        let Some(window) = self.windows.get_mut(&player) else { return };
        match item {
            Some(item) if !item.is_air() => {
                window.slots.insert(slot, item);
            }
            _ => {
                window.slots.remove(&slot);
            }
        }
    }

    fn clear_window(&mut self, player: PlayerId) {
        if let Some(window) = self.windows.get_mut(&player) {
            window.slots.clear();
        }
    }

    fn close_window(&mut self, player: PlayerId) {
        if let Some(window) = self.windows.get_mut(&player) {
            window.open = false;
        }
        self.events.push(SimEvent::WindowClosed(player));
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Shared-state economy: clones see the same balances.
#[derive(Debug, Clone, Default)]
pub struct SimEconomy {
    balances: Arc<Mutex<HashMap<PlayerId, f64>>>,
    failure: Arc<Mutex<Option<String>>>,
}

impl SimEconomy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_balance(&self, player: PlayerId, amount: f64) {
        lock(&self.balances).insert(player, amount);
    }

    pub fn balance_of(&self, player: PlayerId) -> f64 {
        lock(&self.balances).get(&player).copied().unwrap_or(0.0)
    }

    /// Make every following transaction fail with `reason`, or succeed again with `None`.
    pub fn set_failure(&self, reason: Option<&str>) {
        *lock(&self.failure) = reason.map(str::to_string);
    }

    fn check_failure(&self) -> Result<(), String> {
        match lock(&self.failure).as_ref() {
            Some(reason) => Err(reason.clone()),
            None => Ok(()),
        }
    }
}

impl EconomyProvider for SimEconomy {
    fn balance(&self, player: PlayerId) -> Option<f64> {
        Some(self.balance_of(player))
    }

    fn deposit(&mut self, player: PlayerId, amount: f64) -> Result<(), String> {
        self.check_failure()?;
        *lock(&self.balances).entry(player).or_insert(0.0) += amount;
        Ok(())
    }

    fn withdraw(&mut self, player: PlayerId, amount: f64) -> Result<(), String> {
        self.check_failure()?;
        let mut balances = lock(&self.balances);
        let balance = balances.entry(player).or_insert(0.0);
        if *balance < amount {
            return Err("insufficient funds".to_string());
        }
        *balance -= amount;
        Ok(())
    }
}

/// Shared-state permission provider keyed by player name.
#[derive(Debug, Clone, Default)]
pub struct SimPermissions {
    granted: Arc<Mutex<HashMap<String, BTreeSet<String>>>>,
    refuse: bool,
}

impl SimPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider that rejects every grant.
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    pub fn has(&self, player_name: &str, permission: &str) -> bool {
        lock(&self.granted)
            .get(&player_name.to_lowercase())
            .is_some_and(|set| set.contains(&permission.to_lowercase()))
    }
}

impl PermissionProvider for SimPermissions {
    fn grant(&mut self, player_name: &str, permission: &str) -> bool {
        if self.refuse {
            return false;
        }
        lock(&self.granted)
            .entry(player_name.to_lowercase())
            .or_default()
            .insert(permission.to_lowercase());
        true
    }

    fn revoke(&mut self, player_name: &str, permission: &str) -> bool {
        lock(&self.granted)
            .get_mut(&player_name.to_lowercase())
            .is_some_and(|set| set.remove(&permission.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_knows_armor_and_dyes() {
        let host = SimHost::new();
        assert!(host.lookup("DIAMOND").is_some());
        assert!(host.lookup("minecraft:leather_boots").is_some());
        assert!(host.lookup("unobtainium").is_none());
        assert!(host.is_armor("iron_helmet"));
        assert!(!host.is_armor("stone"));
        assert!(host.is_dyeable("leather_chestplate"));
        assert_eq!(host.deserialize("arrow*16").map(|i| i.count), Some(16));
        assert!(host.deserialize("arrow*many").is_none());
    }

    #[test]
    fn economy_clones_share_balances() {
        let eco = SimEconomy::new();
        let p = PlayerId::random();
        let mut handle = eco.clone();
        handle.deposit(p, 10.0).unwrap();
        assert_eq!(eco.balance_of(p), 10.0);
        assert!(handle.withdraw(p, 11.0).is_err());
        eco.set_failure(Some("bank offline"));
        assert_eq!(handle.deposit(p, 1.0), Err("bank offline".to_string()));
    }

    #[test]
    fn window_ignores_air() {
        let mut host = SimHost::new();
        let p = host.add_player("Alex");
        host.open_window(p, 1, "Shop", 1);
        host.set_slot(p, 0, Some(ItemStack::new("stone", 1)));
        host.set_slot(p, 1, Some(ItemStack::air()));
        assert_eq!(host.window(p).map(|w| w.slots.len()), Some(1));
        host.clear_window(p);
        assert!(host.slot(p, 0).is_none());
    }
}
