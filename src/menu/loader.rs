//! Sanitizing loader: decoded configuration → [`MenuDefinition`].
//!
//! Menu files are decoded into `serde_json::Value` first (TOML and JSON alike)
//! so legacy shapes can be accepted loosely. Anything malformed that has a
//! safe default gets the default; anything unusable is dropped with a
//! `warn!`. Only a definition without a usable id is refused.

use log::{debug, warn};
use serde_json::{Map, Value};
use std::path::Path;

use super::slots::SlotSpec;
use super::types::{
    interval_to_ticks, ActionSpec, AmountSpec, FillerSpec, ItemEntry, MaterialSpec, MenuDefinition,
    TrimSpec, MAX_PRIORITY, MAX_ROWS, SLOTS_PER_ROW,
};
use crate::config::EngineConfig;
use crate::errors::MenuError;
use crate::logutil::escape_log;
use crate::requirement::{parse_numeric, PredicateSpec, RequirementBlock};
use crate::validation::{validate_menu_id, validate_open_command};

/// Settings the loader needs from the engine configuration.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub base_command: String,
    pub min_update_interval_secs: f64,
    pub default_update_interval_secs: f64,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for LoadOptions {
    fn from(engine: &EngineConfig) -> Self {
        Self {
            base_command: engine.base_command.clone(),
            min_update_interval_secs: engine.min_update_interval_secs,
            default_update_interval_secs: engine.default_update_interval_secs,
        }
    }
}

/// On-disk menu file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuFormat {
    Toml,
    Json,
}

impl MenuFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_lowercase().as_str() {
            "toml" => Some(MenuFormat::Toml),
            "json" => Some(MenuFormat::Json),
            _ => None,
        }
    }
}

/// Decode and sanitize a menu file's text. `stem` is the file name without extension.
pub fn parse_menu_str(
    stem: &str,
    text: &str,
    format: MenuFormat,
    opts: &LoadOptions,
) -> Result<MenuDefinition, MenuError> {
    let value: Value = match format {
        MenuFormat::Json => serde_json::from_str(text)?,
        MenuFormat::Toml => toml::from_str(text)?,
    };
    parse_menu(stem, &value, opts)
}

/// Sanitize a decoded definition.
pub fn parse_menu(stem: &str, value: &Value, opts: &LoadOptions) -> Result<MenuDefinition, MenuError> {
    let Some(data) = value.as_object() else {
        return Err(MenuError::InvalidDefinition {
            id: stem.to_string(),
            reason: "menu definition is not a table".to_string(),
        });
    };

    let id = match non_blank_str(data.get("id")).map(validate_menu_id) {
        Some(Ok(id)) => id,
        Some(Err(e)) => {
            warn!("menu '{}': id rejected ({}), using file name", escape_log(stem), e);
            validate_menu_id(stem)?
        }
        None => validate_menu_id(stem)?,
    };
    let title = non_blank_str(data.get("name")).unwrap_or(stem).to_string();

    let rows = match data.get("rows").and_then(value_as_number) {
        Some(r) if (1.0..=f64::from(MAX_ROWS)).contains(&r.trunc()) => r.trunc() as u8,
        Some(r) => {
            warn!("menu '{}': rows {} out of range, using {}", id, r, MAX_ROWS);
            MAX_ROWS
        }
        None => MAX_ROWS,
    };
    let size = usize::from(rows) * SLOTS_PER_ROW;

    let open_commands = parse_open_commands(&id, data.get("open_command"), opts);

    let items = match data.get("items") {
        Some(Value::Object(map)) => parse_items(&id, map, size),
        Some(Value::Array(list)) => {
            // Sequence form: index doubles as the legacy numeric key.
            let map: Map<String, Value> = list
                .iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v.clone()))
                .collect();
            parse_items(&id, &map, size)
        }
        Some(_) => {
            warn!("menu '{}': items is not a table, ignoring", id);
            Vec::new()
        }
        None => Vec::new(),
    };

    let filler = data
        .get("filler_item")
        .and_then(Value::as_object)
        .and_then(|fi| {
            let material = non_blank_str(fi.get("material"))?;
            let slots = fi.get("slots").and_then(SlotSpec::from_value)?;
            Some(FillerSpec {
                material: MaterialSpec::parse(material),
                slots,
            })
        });

    let interval_secs = data
        .get("update_interval")
        .and_then(value_as_number)
        .unwrap_or(opts.default_update_interval_secs);

    let definition = MenuDefinition {
        id: id.clone(),
        title,
        rows,
        open_commands,
        command_description: non_blank_str(data.get("command_description")).map(|s| s.trim().to_string()),
        items,
        filler,
        open_requirement: data.get("open_requirement").and_then(parse_requirement_block),
        open_actions: parse_action_spec(data.get("open_actions")).lines(),
        close_actions: parse_action_spec(data.get("close_actions")).lines(),
        update_interval_ticks: interval_to_ticks(interval_secs, opts.min_update_interval_secs),
    };
    debug!(
        "loaded menu '{}' ({} rows, {} items, {} commands)",
        definition.id,
        definition.rows,
        definition.items.len(),
        definition.open_commands.len()
    );
    Ok(definition)
}

fn parse_open_commands(id: &str, value: Option<&Value>, opts: &LoadOptions) -> Vec<String> {
    let raw: Vec<String> = match value {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(list)) => list
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    };
    let mut commands = Vec::new();
    for cmd in raw {
        if cmd.trim().is_empty() {
            continue;
        }
        match validate_open_command(&cmd) {
            Ok(cmd) => commands.push(cmd),
            Err(e) => warn!("menu '{}': dropping open_command '{}': {}", id, escape_log(&cmd), e),
        }
    }
    if commands.is_empty() {
        commands.push(format!("{} {}", opts.base_command, id));
    }
    commands
}

fn parse_items(menu_id: &str, map: &Map<String, Value>, size: usize) -> Vec<ItemEntry> {
    let mut items = Vec::with_capacity(map.len());
    for (key, value) in map {
        let Some(data) = value.as_object() else {
            warn!("menu '{}': item '{}' is not a table, dropped", menu_id, escape_log(key));
            continue;
        };
        match parse_item(key, data, size) {
            Some(entry) => items.push(entry),
            None => warn!("menu '{}': item '{}' has no usable slot, dropped", menu_id, escape_log(key)),
        }
    }
    items
}

fn parse_item(key: &str, data: &Map<String, Value>, size: usize) -> Option<ItemEntry> {
    let explicit = data
        .get("slot")
        .and_then(SlotSpec::from_value)
        .filter(|s| s.is_usable(size));
    let slots = match explicit {
        Some(spec) => spec,
        None => {
            let legacy = parse_numeric(key).map(|n| SlotSpec::Index(n.trunc() as i64))?;
            if !legacy.is_usable(size) {
                return None;
            }
            legacy
        }
    };

    let tooltip = data.get("tooltip").and_then(Value::as_object);
    let display_name = tooltip
        .and_then(|t| t.get("display_name"))
        .and_then(Value::as_str)
        .or_else(|| data.get("display_name").and_then(Value::as_str))
        .map(str::to_string);
    let mut lore = tooltip
        .and_then(|t| t.get("lore"))
        .map(string_list)
        .unwrap_or_default();
    if lore.is_empty() {
        lore = data.get("lore").map(string_list).unwrap_or_default();
    }

    let amount = match (data.get("dynamic_amount"), data.get("amount")) {
        (Some(Value::String(t)), _) if !t.trim().is_empty() => AmountSpec::Dynamic(t.clone()),
        (Some(v), _) if value_as_number(v).is_some() => {
            AmountSpec::Fixed(clamp_amount(value_as_number(v).unwrap_or(1.0)))
        }
        (_, Some(v)) => match value_as_number(v) {
            Some(n) => AmountSpec::Fixed(clamp_amount(n)),
            None => AmountSpec::Default,
        },
        _ => AmountSpec::Default,
    };

    let priority = data
        .get("priority")
        .and_then(value_as_number)
        .map(|p| (p.trunc() as i64).clamp(0, MAX_PRIORITY))
        .unwrap_or(MAX_PRIORITY);

    let actions = match data.get("action") {
        Some(v) => parse_action_spec(Some(v)),
        None => parse_action_spec(data.get("actions")),
    };

    Some(ItemEntry {
        key: key.to_string(),
        slots,
        material: non_blank_str(data.get("material"))
            .map(MaterialSpec::parse)
            .unwrap_or(MaterialSpec::None),
        amount,
        display_name,
        lore,
        priority,
        view_requirement: data.get("view_requirement").and_then(parse_requirement_block),
        click_requirement: data.get("click_requirement").and_then(parse_requirement_block),
        actions,
        success_actions: parse_action_spec(data.get("success_actions")),
        update: data.get("update").map(truthy).unwrap_or(false),
        dye: non_blank_str(data.get("dye")).map(str::to_string),
        trim: TrimSpec {
            material: non_blank_str(data.get("trim_material")).map(str::to_string),
            pattern: non_blank_str(data.get("trim_pattern")).map(str::to_string),
        },
    })
}

fn clamp_amount(n: f64) -> u32 {
    n.trunc().clamp(1.0, 64.0) as u32
}

/// Parse a requirement block table. Non-table values yield `None`.
pub fn parse_requirement_block(value: &Value) -> Option<RequirementBlock> {
    let data = value.as_object()?;
    let mut block = RequirementBlock::new();
    if let Some(Value::Object(reqs)) = data.get("requirements") {
        for (name, spec) in reqs {
            let Some(spec) = spec.as_object() else {
                debug!("requirement '{}' is not a table, skipped", escape_log(name));
                continue;
            };
            block.predicates.push((name.clone(), parse_predicate(spec)));
        }
    }
    block.minimum = data
        .get("minimum_requirements")
        .and_then(value_as_number)
        .map(|m| m.trunc().max(1.0) as usize);
    block.stop_at_success = data.get("stop_at_success").map(truthy).unwrap_or(false);
    block.success_actions = parse_action_spec(data.get("success_actions")).lines();
    block.deny_actions = parse_action_spec(data.get("deny_actions")).lines();
    Some(block)
}

fn parse_predicate(data: &Map<String, Value>) -> PredicateSpec {
    let mut params = Map::new();
    for (k, v) in data {
        if !matches!(k.as_str(), "type" | "success_actions" | "deny_actions") {
            params.insert(k.clone(), v.clone());
        }
    }
    PredicateSpec {
        kind: data
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        params,
        success_actions: parse_action_spec(data.get("success_actions")).lines(),
        deny_actions: parse_action_spec(data.get("deny_actions")).lines(),
    }
}

/// String → one line; list → trimmed non-empty strings; table with `type` → legacy action.
pub fn parse_action_spec(value: Option<&Value>) -> ActionSpec {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => ActionSpec::Lines(vec![s.trim().to_string()]),
        Some(Value::Array(list)) => {
            let lines: Vec<String> = list
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if lines.is_empty() {
                ActionSpec::None
            } else {
                ActionSpec::Lines(lines)
            }
        }
        Some(Value::Object(map)) => match map.get("type").and_then(Value::as_str) {
            Some(kind) if !kind.trim().is_empty() => ActionSpec::Legacy {
                kind: kind.trim().to_string(),
                value: map.get("value").map(value_to_text).unwrap_or_default(),
            },
            _ => ActionSpec::None,
        },
        _ => ActionSpec::None,
    }
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(list) => list
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn non_blank_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.trim().is_empty())
}

fn value_as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_numeric(s),
        _ => None,
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "on" | "1"),
        _ => false,
    }
}
