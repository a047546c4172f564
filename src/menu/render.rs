//! Turning item entries into concrete item stacks for one player.

use log::debug;
use regex::Regex;
use std::sync::OnceLock;

use super::types::{AmountSpec, DynamicSource, FillerSpec, ItemEntry, MaterialSpec, TrimSpec};
use crate::format::TextFormatter;
use crate::host::{ArmorTrim, Host, ItemStack, PlayerId, Rgb};
use crate::logutil::escape_log;
use crate::placeholders::PlaceholderResolver;
use crate::requirement::parse_numeric;

/// Name given to items without one so the client never shows the material name.
pub const BLANK_NAME: &str = " ";

pub const MAX_STACK: u32 = 64;

const TRIM_MATERIALS: &[(&str, &str)] = &[
    ("amethyst", "amethyst"),
    ("copper", "copper"),
    ("diamond", "diamond"),
    ("emerald", "emerald"),
    ("gold", "gold"),
    ("golden", "gold"),
    ("iron", "iron"),
    ("quartz", "quartz"),
    ("redstone", "redstone"),
    ("netherite", "netherite"),
    ("lapis", "lapis"),
    ("lapis_lazuli", "lapis"),
    ("lapislazuli", "lapis"),
];

const TRIM_PATTERNS: &[&str] = &[
    "bolt", "coast", "dune", "eye", "flow", "host", "raiser", "rib", "sentry", "shaper", "silence",
    "snout", "spire", "tide", "vex", "ward", "wayfinder", "wild",
];

const DYE_COLORS: &[(&str, Rgb)] = &[
    ("white", Rgb { r: 0xFF, g: 0xFF, b: 0xFF }),
    ("black", Rgb { r: 0, g: 0, b: 0 }),
    ("red", Rgb { r: 0xFF, g: 0, b: 0 }),
    ("green", Rgb { r: 0, g: 0x80, b: 0 }),
    ("blue", Rgb { r: 0, g: 0, b: 0xFF }),
    ("yellow", Rgb { r: 0xFF, g: 0xFF, b: 0 }),
    ("purple", Rgb { r: 0x80, g: 0, b: 0x80 }),
    ("pink", Rgb { r: 0xFF, g: 0xC0, b: 0xCB }),
    ("cyan", Rgb { r: 0, g: 0xFF, b: 0xFF }),
    ("orange", Rgb { r: 0xFF, g: 0xA5, b: 0 }),
    ("lime", Rgb { r: 0, g: 0xFF, b: 0 }),
    ("magenta", Rgb { r: 0xFF, g: 0, b: 0xFF }),
    ("gray", Rgb { r: 0x80, g: 0x80, b: 0x80 }),
    ("light_gray", Rgb { r: 0xD3, g: 0xD3, b: 0xD3 }),
];

fn hex_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#?([0-9a-fA-F]{6})$").expect("hex colour regex must compile"))
}

/// Named colour or `#RRGGBB`.
pub fn parse_dye(name: &str) -> Option<Rgb> {
    let n = name.trim().to_lowercase();
    if let Some((_, rgb)) = DYE_COLORS.iter().find(|(k, _)| *k == n) {
        return Some(*rgb);
    }
    let hex = hex_pattern().captures(&n)?.get(1)?.as_str();
    let value = u32::from_str_radix(hex, 16).ok()?;
    Some(Rgb {
        r: ((value >> 16) & 0xFF) as u8,
        g: ((value >> 8) & 0xFF) as u8,
        b: (value & 0xFF) as u8,
    })
}

/// Reduce `minecraft:gold`, `HOST_ARMOR_TRIM_SMITHING_TEMPLATE`, `trim_vex` and
/// friends to a bare lowercase token.
fn trim_token(raw: &str) -> String {
    let mut s = raw.trim().to_lowercase().replace(['.', ' '], "");
    for prefix in ["minecraft:", "material", "trim_"] {
        if let Some(rest) = s.strip_prefix(prefix) {
            s = rest.trim_start_matches([':', '_', '-']).to_string();
        }
    }
    for suffix in ["_armor_trim_smithing_template", "_smithing_template", "_armor_trim", "_trim"] {
        if let Some(rest) = s.strip_suffix(suffix) {
            s = rest.to_string();
            break;
        }
    }
    s
}

pub fn normalize_trim_material(raw: &str) -> Option<&'static str> {
    let token = trim_token(raw);
    TRIM_MATERIALS
        .iter()
        .find(|(alias, _)| *alias == token)
        .map(|(_, canonical)| *canonical)
}

pub fn normalize_trim_pattern(raw: &str) -> Option<&'static str> {
    let token = trim_token(raw);
    TRIM_PATTERNS.iter().copied().find(|p| *p == token)
}

/// Visual-only lore line describing a declared trim.
pub fn trim_lore_line(trim: &TrimSpec) -> String {
    format!(
        "§o§7Trim: {} • {}",
        trim.pattern.as_deref().unwrap_or("unknown"),
        trim.material.as_deref().unwrap_or("unknown")
    )
}

/// Per-player rendering inputs.
pub struct RenderContext<'a> {
    pub player: PlayerId,
    pub host: &'a dyn Host,
    pub placeholders: &'a dyn PlaceholderResolver,
    pub formatter: &'a TextFormatter,
}

impl<'a> RenderContext<'a> {
    fn resolve(&self, template: &str) -> String {
        self.placeholders.resolve(template, self.player)
    }

    /// Produce the base stack for a material spec. Unknown materials give air.
    pub fn resolve_material(&self, spec: &MaterialSpec) -> ItemStack {
        match spec {
            MaterialSpec::None => ItemStack::air(),
            MaterialSpec::Serialized(payload) => self.host.deserialize(payload).unwrap_or_else(|| {
                debug!("serialized item payload could not be decoded");
                ItemStack::air()
            }),
            MaterialSpec::Placeholder(template) => {
                let resolved = self.resolve(template);
                if resolved.trim().is_empty() {
                    return ItemStack::air();
                }
                match MaterialSpec::parse_resolved(&resolved) {
                    MaterialSpec::Placeholder(_) => ItemStack::air(),
                    other => self.resolve_material(&other),
                }
            }
            MaterialSpec::Dynamic(source) => {
                let item = match source {
                    DynamicSource::MainHand => self.host.main_hand(self.player),
                    DynamicSource::OffHand => self.host.off_hand(self.player),
                    DynamicSource::Armor(slot) => self.host.armor(self.player, *slot),
                };
                item.unwrap_or_else(ItemStack::air)
            }
            MaterialSpec::Static(id) => self.host.lookup(id).unwrap_or_else(|| {
                debug!("unknown material '{}'", escape_log(id));
                ItemStack::air()
            }),
        }
    }

    /// Resolve, wrap and colour lore lines; appends the trim line when declared.
    fn lore_for(&self, entry: &ItemEntry) -> Vec<String> {
        let mut lines: Vec<String> = entry.lore.iter().map(|l| self.resolve(l)).collect();
        if entry.trim.is_declared() {
            lines.push(trim_lore_line(&entry.trim));
        }
        self.formatter.format_lines(&lines)
    }

    /// Build the full item for an entry. `None` means the slot stays empty.
    pub fn build_item(&self, entry: &ItemEntry) -> Option<ItemStack> {
        let mut item = self.resolve_material(&entry.material);
        if item.is_air() {
            return None;
        }

        match &entry.amount {
            AmountSpec::Default => {}
            AmountSpec::Fixed(n) => item.count = (*n).clamp(1, MAX_STACK),
            AmountSpec::Dynamic(template) => {
                if let Some(n) = parse_numeric(&self.resolve(template)) {
                    item.count = n.trunc().clamp(1.0, f64::from(MAX_STACK)) as u32;
                }
            }
        }

        if let Some(dye) = entry.dye.as_deref() {
            match parse_dye(dye) {
                Some(rgb) if self.host.is_dyeable(&item.material) => item.color = Some(rgb),
                Some(_) => {}
                None => debug!("item '{}': unknown dye '{}'", entry.key, escape_log(dye)),
            }
        }

        if entry.trim.is_declared() && self.host.is_armor(&item.material) {
            let material = entry.trim.material.as_deref().map(|m| self.resolve(m)).unwrap_or_default();
            let pattern = entry.trim.pattern.as_deref().map(|p| self.resolve(p)).unwrap_or_default();
            if let (Some(material), Some(pattern)) =
                (normalize_trim_material(&material), normalize_trim_pattern(&pattern))
            {
                item.trim = Some(ArmorTrim {
                    material: material.to_string(),
                    pattern: pattern.to_string(),
                });
            }
        }

        match &entry.display_name {
            Some(name) => item.custom_name = Some(self.resolve(name)),
            None if !item.has_custom_name() => item.custom_name = Some(BLANK_NAME.to_string()),
            None => {}
        }
        item.lore = if entry.lore.is_empty() {
            Vec::new()
        } else {
            self.lore_for(entry)
        };
        Some(item)
    }

    /// Re-resolve only the name and lore of an already rendered item.
    pub fn refresh_text(&self, entry: &ItemEntry, item: &mut ItemStack) {
        if let Some(name) = &entry.display_name {
            item.custom_name = Some(self.resolve(name));
        }
        if !entry.lore.is_empty() {
            item.lore = self.lore_for(entry);
        }
    }

    pub fn build_filler(&self, filler: &FillerSpec) -> Option<ItemStack> {
        let mut item = self.resolve_material(&filler.material);
        if item.is_air() {
            return None;
        }
        if !item.has_custom_name() {
            item.custom_name = Some(BLANK_NAME.to_string());
        }
        Some(item)
    }
}
