//! Contracts for everything the engine consumes from the game server.
//!
//! The engine never talks to a network session or a world directly. A host
//! implements [`Host`] (player state, item catalog, server side effects and
//! window contents) and optionally supplies an [`EconomyProvider`] and a
//! [`PermissionProvider`]. All calls happen on the host's main thread.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identity of a connected player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    pub fn random() -> Self {
        PlayerId(Uuid::new_v4())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A position inside a named world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub world: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Location {
    pub fn new(world: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }

    /// Euclidean distance, ignoring the world name.
    pub fn distance_to(&self, other: &Location) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmorTrim {
    pub material: String,
    pub pattern: String,
}

/// Item stack as the engine sees it. Hosts map this onto their native item type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemStack {
    pub material: String,
    pub count: u32,
    #[serde(default)]
    pub custom_name: Option<String>,
    #[serde(default)]
    pub lore: Vec<String>,
    #[serde(default)]
    pub color: Option<Rgb>,
    #[serde(default)]
    pub trim: Option<ArmorTrim>,
}

impl ItemStack {
    pub const AIR: &'static str = "air";

    pub fn new(material: impl Into<String>, count: u32) -> Self {
        Self {
            material: material.into(),
            count,
            custom_name: None,
            lore: Vec::new(),
            color: None,
            trim: None,
        }
    }

    pub fn air() -> Self {
        Self::new(Self::AIR, 0)
    }

    pub fn is_air(&self) -> bool {
        self.material == Self::AIR || self.count == 0
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.custom_name = Some(name.into());
        self
    }

    pub fn with_lore(mut self, lore: Vec<String>) -> Self {
        self.lore = lore;
        self
    }

    pub fn has_custom_name(&self) -> bool {
        self.custom_name.as_deref().is_some_and(|n| !n.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Experience {
    pub level: u32,
    /// Exact total experience points when the host can compute them.
    pub total_points: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArmorSlot {
    Helmet,
    Chestplate,
    Leggings,
    Boots,
}

impl ArmorSlot {
    pub const ALL: [ArmorSlot; 4] = [
        ArmorSlot::Helmet,
        ArmorSlot::Chestplate,
        ArmorSlot::Leggings,
        ArmorSlot::Boots,
    ];
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sound {
    pub id: String,
    pub volume: f32,
    pub pitch: f32,
    pub origin: Location,
}

/// Who a dispatched command runs as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandActor {
    Console,
    Player(PlayerId),
}

/// Read access to player state. Requirement predicates only ever use this side.
pub trait PlayerState {
    fn is_online(&self, player: PlayerId) -> bool;
    fn player_name(&self, player: PlayerId) -> Option<String>;
    fn has_permission(&self, player: PlayerId, permission: &str) -> bool;
    /// Main inventory contents, empty slots omitted.
    fn inventory(&self, player: PlayerId) -> Vec<ItemStack>;
    fn armor(&self, player: PlayerId, slot: ArmorSlot) -> Option<ItemStack>;
    fn main_hand(&self, player: PlayerId) -> Option<ItemStack>;
    fn off_hand(&self, player: PlayerId) -> Option<ItemStack>;
    fn experience(&self, player: PlayerId) -> Option<Experience>;
    fn location(&self, player: PlayerId) -> Option<Location>;
    fn world_exists(&self, world: &str) -> bool;
}

/// Material lookup and item decoding.
pub trait ItemCatalog {
    /// Resolve a (lowercased) material id into a fresh stack of one.
    fn lookup(&self, material: &str) -> Option<ItemStack>;
    /// Decode an inline serialized item payload. The payload is passed verbatim.
    fn deserialize(&self, payload: &str) -> Option<ItemStack>;
    fn is_armor(&self, material: &str) -> bool;
    fn is_dyeable(&self, material: &str) -> bool;
}

/// Side effects on the server and on players.
pub trait Server {
    fn send_message(&mut self, player: PlayerId, text: &str);
    fn broadcast(&mut self, text: &str);
    fn chat(&mut self, player: PlayerId, text: &str);
    fn dispatch_command(&mut self, actor: CommandActor, command: &str);
    fn online_players(&self) -> Vec<PlayerId>;
    fn players_in_world(&self, world: &str) -> Vec<PlayerId>;
    fn play_sound(&mut self, targets: &[PlayerId], sound: &Sound);
    fn set_experience_level(&mut self, player: PlayerId, level: u32);
    /// Add (or with a negative delta, remove) raw experience points.
    fn add_experience_points(&mut self, player: PlayerId, delta: i64);
}

/// Contents of the per-player menu window. The host owns window creation.
pub trait WindowHost {
    /// Show a fresh window. `window` identifies it in the later close event.
    fn open_window(&mut self, player: PlayerId, window: u64, title: &str, rows: u8);
    fn set_slot(&mut self, player: PlayerId, slot: usize, item: Option<ItemStack>);
    fn clear_window(&mut self, player: PlayerId);
    fn close_window(&mut self, player: PlayerId);
}

/// Everything the engine needs from the game server.
pub trait Host: PlayerState + ItemCatalog + Server + WindowHost {}

impl<T: PlayerState + ItemCatalog + Server + WindowHost> Host for T {}

/// Optional currency provider.
pub trait EconomyProvider {
    fn balance(&self, player: PlayerId) -> Option<f64>;
    fn deposit(&mut self, player: PlayerId, amount: f64) -> Result<(), String>;
    fn withdraw(&mut self, player: PlayerId, amount: f64) -> Result<(), String>;
}

/// Optional persistent permission provider. Keyed by player name for provider compatibility.
pub trait PermissionProvider {
    fn grant(&mut self, player_name: &str, permission: &str) -> bool;
    fn revoke(&mut self, player_name: &str, permission: &str) -> bool;
}
