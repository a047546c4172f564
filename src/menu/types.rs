//! Typed menu definitions.
//!
//! A [`MenuDefinition`] owns its item entries in an arena (`items`); slot
//! candidate lists refer to entries by index. Definitions are immutable once
//! built and shared behind `Arc` by the registry and open sessions.

use regex::Regex;
use std::sync::OnceLock;

use super::slots::SlotSpec;
use crate::host::ArmorSlot;
use crate::requirement::RequirementBlock;

/// Lowest precedence; also the default priority.
pub const MAX_PRIORITY: i64 = 2_147_483_647;

pub const TICKS_PER_SECOND: f64 = 20.0;

/// Default auto-update period in ticks (one second).
pub const DEFAULT_UPDATE_TICKS: u64 = 20;

pub const MAX_ROWS: u8 = 6;
pub const SLOTS_PER_ROW: usize = 9;

fn serialized_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)^nbt-\s*"?([^"\s]+)"?\s*$"#).expect("serialized item regex must compile"))
}

fn placeholder_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^placeholder-(.+)$").expect("placeholder material regex must compile"))
}

/// Item copied from the viewing player's own equipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynamicSource {
    MainHand,
    OffHand,
    Armor(ArmorSlot),
}

impl DynamicSource {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "main_hand" | "mainhand" => Some(DynamicSource::MainHand),
            "off_hand" | "offhand" => Some(DynamicSource::OffHand),
            "armor_helmet" => Some(DynamicSource::Armor(ArmorSlot::Helmet)),
            "armor_chestplate" => Some(DynamicSource::Armor(ArmorSlot::Chestplate)),
            "armor_leggings" => Some(DynamicSource::Armor(ArmorSlot::Leggings)),
            "armor_boots" => Some(DynamicSource::Armor(ArmorSlot::Boots)),
            _ => None,
        }
    }
}

/// How an entry's base item is produced.
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialSpec {
    /// No material; the slot renders as air but the entry still owns it.
    None,
    /// Inline serialized item payload, case preserved.
    Serialized(String),
    /// Template resolved per player, then interpreted again (dynamic or static).
    Placeholder(String),
    Dynamic(DynamicSource),
    /// Static material id, stored lowercased.
    Static(String),
}

impl MaterialSpec {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return MaterialSpec::None;
        }
        if let Some(payload) = serialized_pattern().captures(raw).and_then(|c| c.get(1)) {
            return MaterialSpec::Serialized(payload.as_str().to_string());
        }
        if let Some(template) = placeholder_pattern().captures(raw).and_then(|c| c.get(1)) {
            let template = template.as_str().trim();
            if !template.is_empty() {
                return MaterialSpec::Placeholder(template.to_string());
            }
        }
        Self::parse_resolved(raw)
    }

    /// Interpret an already resolved material string (no placeholder / payload forms).
    pub fn parse_resolved(raw: &str) -> Self {
        match DynamicSource::parse(raw) {
            Some(source) => MaterialSpec::Dynamic(source),
            None => MaterialSpec::Static(raw.trim().to_lowercase()),
        }
    }
}

/// Stack size: fixed, or a placeholder template resolved per player.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AmountSpec {
    #[default]
    Default,
    Fixed(u32),
    Dynamic(String),
}

/// Action list of an entry: ordered lines or the legacy `{type, value}` shape.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ActionSpec {
    #[default]
    None,
    Lines(Vec<String>),
    Legacy { kind: String, value: String },
}

impl ActionSpec {
    pub fn is_none(&self) -> bool {
        matches!(self, ActionSpec::None)
    }

    /// Lines in the `[tag] argument` language.
    pub fn lines(&self) -> Vec<String> {
        match self {
            ActionSpec::None => Vec::new(),
            ActionSpec::Lines(lines) => lines.clone(),
            ActionSpec::Legacy { kind, value } => {
                vec![format!("[{}] {}", kind.trim(), value.trim()).trim().to_string()]
            }
        }
    }

    pub fn from_lines(lines: &[&str]) -> Self {
        ActionSpec::Lines(lines.iter().map(|s| s.to_string()).collect())
    }
}

/// Armor trim as written; normalized at render time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrimSpec {
    pub material: Option<String>,
    pub pattern: Option<String>,
}

impl TrimSpec {
    pub fn is_declared(&self) -> bool {
        self.material.is_some() || self.pattern.is_some()
    }
}

/// One declarative item definition; a candidate for every slot it expands to.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemEntry {
    /// Key in the `items` map, used in logs.
    pub key: String,
    pub slots: SlotSpec,
    pub material: MaterialSpec,
    pub amount: AmountSpec,
    pub display_name: Option<String>,
    pub lore: Vec<String>,
    pub priority: i64,
    pub view_requirement: Option<RequirementBlock>,
    pub click_requirement: Option<RequirementBlock>,
    pub actions: ActionSpec,
    pub success_actions: ActionSpec,
    /// Re-render name/lore on the auto-update timer.
    pub update: bool,
    pub dye: Option<String>,
    pub trim: TrimSpec,
}

impl ItemEntry {
    pub fn new(key: impl Into<String>, slots: impl Into<SlotSpec>, material: &str) -> Self {
        Self {
            key: key.into(),
            slots: slots.into(),
            material: MaterialSpec::parse(material),
            amount: AmountSpec::Default,
            display_name: None,
            lore: Vec::new(),
            priority: MAX_PRIORITY,
            view_requirement: None,
            click_requirement: None,
            actions: ActionSpec::None,
            success_actions: ActionSpec::None,
            update: false,
            dye: None,
            trim: TrimSpec::default(),
        }
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = priority.clamp(0, MAX_PRIORITY);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn lore(mut self, lines: &[&str]) -> Self {
        self.lore = lines.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn actions(mut self, lines: &[&str]) -> Self {
        self.actions = ActionSpec::from_lines(lines);
        self
    }

    pub fn success_actions(mut self, lines: &[&str]) -> Self {
        self.success_actions = ActionSpec::from_lines(lines);
        self
    }

    pub fn view_requirement(mut self, block: RequirementBlock) -> Self {
        self.view_requirement = Some(block);
        self
    }

    pub fn click_requirement(mut self, block: RequirementBlock) -> Self {
        self.click_requirement = Some(block);
        self
    }

    pub fn update(mut self, update: bool) -> Self {
        self.update = update;
        self
    }

    /// Actions run on a click without a click requirement.
    pub fn click_actions(&self) -> Vec<String> {
        if self.success_actions.is_none() {
            self.actions.lines()
        } else {
            self.success_actions.lines()
        }
    }
}

/// Item placed into otherwise empty slots after rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct FillerSpec {
    pub material: MaterialSpec,
    pub slots: SlotSpec,
}

/// A complete, sanitized menu.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuDefinition {
    pub id: String,
    /// Title template, may contain placeholders.
    pub title: String,
    pub rows: u8,
    pub open_commands: Vec<String>,
    pub command_description: Option<String>,
    pub items: Vec<ItemEntry>,
    pub filler: Option<FillerSpec>,
    pub open_requirement: Option<RequirementBlock>,
    pub open_actions: Vec<String>,
    pub close_actions: Vec<String>,
    pub update_interval_ticks: u64,
}

impl MenuDefinition {
    pub fn new(id: impl Into<String>, rows: u8) -> Self {
        let id = id.into();
        let rows = if (1..=MAX_ROWS).contains(&rows) { rows } else { MAX_ROWS };
        Self {
            title: id.clone(),
            open_commands: vec![format!("gui {}", id)],
            id,
            rows,
            command_description: None,
            items: Vec::new(),
            filler: None,
            open_requirement: None,
            open_actions: Vec::new(),
            close_actions: Vec::new(),
            update_interval_ticks: DEFAULT_UPDATE_TICKS,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn item(mut self, entry: ItemEntry) -> Self {
        self.items.push(entry);
        self
    }

    pub fn filler(mut self, material: &str, slots: impl Into<SlotSpec>) -> Self {
        self.filler = Some(FillerSpec {
            material: MaterialSpec::parse(material),
            slots: slots.into(),
        });
        self
    }

    pub fn open_requirement(mut self, block: RequirementBlock) -> Self {
        self.open_requirement = Some(block);
        self
    }

    pub fn open_actions(mut self, lines: &[&str]) -> Self {
        self.open_actions = lines.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn close_actions(mut self, lines: &[&str]) -> Self {
        self.close_actions = lines.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn size(&self) -> usize {
        usize::from(self.rows) * SLOTS_PER_ROW
    }

    /// True when at least one entry asks for periodic name/lore refresh.
    pub fn has_live_items(&self) -> bool {
        self.items.iter().any(|e| e.update)
    }
}

/// Seconds to ticks with a floor, rounded, never below one tick.
pub fn interval_to_ticks(seconds: f64, min_seconds: f64) -> u64 {
    let secs = if seconds.is_finite() { seconds } else { min_seconds };
    let secs = secs.max(min_seconds);
    ((secs * TICKS_PER_SECOND).round() as u64).max(1)
}
