//! Built-in predicate types and the extension registry.
//!
//! Dispatch order for a spec: strip the `!` negation marker, consult the
//! [`PredicateRegistry`] by type name, fall back to the built-in table, and
//! finally invert the result if negated. Unknown types fail.

use log::{debug, trace};
use std::collections::HashMap;
use std::sync::Arc;

use super::expression::evaluate_expression;
use super::{parse_numeric, PredicateSpec};
use crate::host::{ArmorSlot, EconomyProvider, Host, ItemStack, Location, PlayerId};
use crate::logutil::escape_log;
use crate::placeholders::PlaceholderResolver;

/// Everything a predicate may read while evaluating for one player.
pub struct EvalContext<'a> {
    pub player: PlayerId,
    pub host: &'a dyn Host,
    pub placeholders: &'a dyn PlaceholderResolver,
    pub economy: Option<&'a dyn EconomyProvider>,
    /// Points per level used when the host cannot report total experience. 0 fails closed.
    pub xp_points_per_level: u32,
}

impl<'a> EvalContext<'a> {
    pub fn resolve(&self, template: &str) -> String {
        self.placeholders.resolve(template, self.player)
    }

    fn resolve_param(&self, spec: &PredicateSpec, key: &str) -> String {
        spec.str_param(key)
            .map(|raw| self.resolve(&raw))
            .unwrap_or_default()
    }
}

/// A pluggable predicate type.
///
/// Returning `None` means "not handled here" and lets the built-in table try.
pub trait PredicateHandler: Send + Sync {
    fn matches(&self, ctx: &EvalContext<'_>, spec: &PredicateSpec, kind: &str) -> Option<bool>;
}

impl<F> PredicateHandler for F
where
    F: Fn(&EvalContext<'_>, &PredicateSpec) -> bool + Send + Sync,
{
    fn matches(&self, ctx: &EvalContext<'_>, spec: &PredicateSpec, _kind: &str) -> Option<bool> {
        Some(self(ctx, spec))
    }
}

/// Custom predicate types keyed by lowercase type name.
#[derive(Default, Clone)]
pub struct PredicateRegistry {
    handlers: HashMap<String, Arc<dyn PredicateHandler>>,
}

impl PredicateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. A later registration for the same name replaces the earlier one.
    pub fn register<H>(&mut self, kind: &str, handler: H)
    where
        H: PredicateHandler + 'static,
    {
        self.handlers
            .insert(kind.trim().to_lowercase(), Arc::new(handler));
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.handlers.contains_key(&kind.trim().to_lowercase())
    }

    /// Evaluate one predicate spec, including negation.
    pub fn evaluate(&self, ctx: &EvalContext<'_>, spec: &PredicateSpec) -> bool {
        let (kind, negated) = spec.normalized_kind();
        let custom = self
            .handlers
            .get(&kind)
            .and_then(|h| h.matches(ctx, spec, &kind));
        let result = match custom.or_else(|| builtin(ctx, spec, &kind)) {
            Some(r) => r,
            None => {
                debug!("unknown requirement type '{}' treated as failing", escape_log(&kind));
                false
            }
        };
        trace!("requirement '{}' negated={} -> {}", kind, negated, result);
        result != negated
    }
}

impl std::fmt::Debug for PredicateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("PredicateRegistry").field("handlers", &names).finish()
    }
}

/// Built-in table. `None` for unknown types.
fn builtin(ctx: &EvalContext<'_>, spec: &PredicateSpec, kind: &str) -> Option<bool> {
    let result = match kind {
        "has permission" => has_permission(ctx, spec),
        "has permissions" => has_permissions(ctx, spec),
        "has money" => has_money(ctx, spec),
        "has item" => has_item(ctx, spec),
        "has meta" => has_meta(ctx, spec),
        "has exp" => has_exp(ctx, spec),
        "is near" => is_near(ctx, spec),
        "string equals" => ctx.resolve_param(spec, "input") == ctx.resolve_param(spec, "output"),
        "string equals ignorecase" => {
            ctx.resolve_param(spec, "input").to_lowercase()
                == ctx.resolve_param(spec, "output").to_lowercase()
        }
        "string contains" => {
            let needle = ctx.resolve_param(spec, "output");
            needle.is_empty() || ctx.resolve_param(spec, "input").contains(&needle)
        }
        "string length" => string_length(ctx, spec),
        "==" | "!=" | ">=" | "<=" | ">" | "<" => compare(ctx, spec, kind),
        "javascript" | "expression" => expression(ctx, spec),
        _ => return None,
    };
    Some(result)
}

fn has_permission(ctx: &EvalContext<'_>, spec: &PredicateSpec) -> bool {
    let perm = spec.str_param("permission").unwrap_or_default();
    !perm.is_empty() && ctx.host.has_permission(ctx.player, &perm)
}

fn has_permissions(ctx: &EvalContext<'_>, spec: &PredicateSpec) -> bool {
    let perms: Vec<String> = spec
        .list_param("permissions")
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect();
    let held = perms
        .iter()
        .filter(|p| ctx.host.has_permission(ctx.player, p))
        .count();
    let minimum = spec
        .num_param("minimum")
        .map(|m| m.trunc().max(0.0) as usize)
        .unwrap_or(perms.len());
    held >= minimum
}

fn has_money(ctx: &EvalContext<'_>, spec: &PredicateSpec) -> bool {
    let amount = spec.num_param("amount").unwrap_or(0.0);
    let Some(economy) = ctx.economy else {
        debug!("'has money' evaluated without an economy provider");
        return false;
    };
    match economy.balance(ctx.player) {
        Some(balance) => balance >= amount,
        None => false,
    }
}

/// Name/lore/material filter used by `has item`.
struct ItemFilter {
    material: Option<String>,
    name: String,
    name_contains: bool,
    name_ignorecase: bool,
    lore: Vec<String>,
    lore_contains: bool,
    lore_ignorecase: bool,
    strict: bool,
}

impl ItemFilter {
    fn accepts(&self, item: &ItemStack) -> bool {
        if item.is_air() {
            return false;
        }
        if self.strict && (item.has_custom_name() || !item.lore.is_empty()) {
            return false;
        }
        if let Some(material) = &self.material {
            if &item.material != material {
                return false;
            }
        }
        if !self.name.is_empty() {
            let have = if item.has_custom_name() {
                item.custom_name.clone().unwrap_or_default()
            } else {
                String::new()
            };
            let (have, want) = if self.name_ignorecase {
                (have.to_lowercase(), self.name.to_lowercase())
            } else {
                (have, self.name.clone())
            };
            let ok = if self.name_contains {
                have.contains(&want)
            } else {
                have == want
            };
            if !ok {
                return false;
            }
        }
        if !self.lore.is_empty() {
            let joined = item.lore.join("\n");
            let hay = if self.lore_ignorecase {
                joined.to_lowercase()
            } else {
                joined
            };
            for needle in &self.lore {
                let needle = if self.lore_ignorecase {
                    needle.to_lowercase()
                } else {
                    needle.clone()
                };
                let ok = if self.lore_contains {
                    hay.contains(&needle)
                } else {
                    hay == needle
                };
                if !ok {
                    return false;
                }
            }
        }
        true
    }
}

fn has_item(ctx: &EvalContext<'_>, spec: &PredicateSpec) -> bool {
    let material = match spec.str_param("material").filter(|m| !m.is_empty()) {
        Some(raw) => {
            let resolved = ctx.resolve(&raw).trim().to_lowercase();
            match ctx.host.lookup(&resolved) {
                Some(item) => Some(item.material),
                None => {
                    debug!("'has item' material '{}' is unknown", escape_log(&resolved));
                    return false;
                }
            }
        }
        None => None,
    };
    let filter = ItemFilter {
        material,
        name: ctx.resolve_param(spec, "name"),
        name_contains: spec.bool_param("name_contains"),
        name_ignorecase: spec.bool_param("name_ignorecase"),
        lore: spec
            .list_param("lore")
            .iter()
            .map(|l| ctx.resolve(l))
            .collect(),
        lore_contains: spec.bool_param("lore_contains"),
        lore_ignorecase: spec.bool_param("lore_ignorecase"),
        strict: spec.bool_param("strict"),
    };
    let needed = spec
        .num_param("amount")
        .map(|a| a.trunc().max(1.0) as u64)
        .unwrap_or(1);

    let mut stacks = ctx.host.inventory(ctx.player);
    if spec.bool_param("armor") {
        stacks.extend(
            ArmorSlot::ALL
                .iter()
                .filter_map(|slot| ctx.host.armor(ctx.player, *slot)),
        );
    }
    if spec.bool_param("offhand") {
        stacks.extend(ctx.host.off_hand(ctx.player));
    }

    let mut count: u64 = 0;
    for item in stacks.iter().filter(|i| filter.accepts(i)) {
        count += u64::from(item.count);
        if count >= needed {
            return true;
        }
    }
    false
}

/// Loose boolean parse: `Some(true|false)` for recognized words, `None` otherwise.
fn parse_bool_word(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" | "" => Some(false),
        _ => None,
    }
}

fn has_meta(ctx: &EvalContext<'_>, spec: &PredicateSpec) -> bool {
    let key = spec.str_param("key").unwrap_or_default();
    if key.is_empty() {
        return false;
    }
    let resolved = ctx.resolve(&key);
    let Some(expected) = spec.str_param("value") else {
        return !resolved.is_empty();
    };
    let expected = ctx.resolve(&expected);
    let meta_type = spec
        .str_param("meta_type")
        .unwrap_or_else(|| "STRING".to_string())
        .to_uppercase();
    match meta_type.as_str() {
        "BOOLEAN" => parse_bool_word(&resolved) == parse_bool_word(&expected),
        "DOUBLE" | "LONG" | "INTEGER" => match (parse_numeric(&resolved), parse_numeric(&expected)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
        _ => resolved == expected,
    }
}

fn has_exp(ctx: &EvalContext<'_>, spec: &PredicateSpec) -> bool {
    let amount = spec.num_param("amount").map(|a| a.trunc()).unwrap_or(0.0);
    let Some(xp) = ctx.host.experience(ctx.player) else {
        return false;
    };
    if spec.bool_param("level") {
        return f64::from(xp.level) >= amount;
    }
    match xp.total_points {
        Some(points) => points as f64 >= amount,
        None if ctx.xp_points_per_level == 0 => false,
        None => f64::from(xp.level) * f64::from(ctx.xp_points_per_level) >= amount,
    }
}

/// Parse `"world,x,y,z"`.
pub fn parse_location(s: &str) -> Option<Location> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 4 || parts[0].is_empty() {
        return None;
    }
    let x = parse_numeric(parts[1])?;
    let y = parse_numeric(parts[2])?;
    let z = parse_numeric(parts[3])?;
    Some(Location::new(parts[0], x, y, z))
}

fn is_near(ctx: &EvalContext<'_>, spec: &PredicateSpec) -> bool {
    let distance = spec.num_param("distance").unwrap_or(0.0);
    if distance <= 0.0 {
        return false;
    }
    let Some(target) = spec
        .str_param("location")
        .and_then(|raw| parse_location(&ctx.resolve(&raw)))
    else {
        return false;
    };
    if !ctx.host.world_exists(&target.world) {
        return false;
    }
    match ctx.host.location(ctx.player) {
        Some(here) => here.world == target.world && here.distance_to(&target) <= distance,
        None => false,
    }
}

fn string_length(ctx: &EvalContext<'_>, spec: &PredicateSpec) -> bool {
    let len = ctx.resolve_param(spec, "input").chars().count() as f64;
    if let Some(min) = spec.num_param("min") {
        if len < min.trunc() {
            return false;
        }
    }
    if let Some(max) = spec.num_param("max") {
        if len > max.trunc() {
            return false;
        }
    }
    true
}

fn compare(ctx: &EvalContext<'_>, spec: &PredicateSpec, op: &str) -> bool {
    let input = ctx.resolve_param(spec, "input");
    let output = ctx.resolve_param(spec, "output");
    if let (Some(a), Some(b)) = (parse_numeric(&input), parse_numeric(&output)) {
        return match op {
            "==" => a == b,
            "!=" => a != b,
            ">=" => a >= b,
            "<=" => a <= b,
            ">" => a > b,
            _ => a < b,
        };
    }
    match op {
        "==" => input == output,
        "!=" => input != output,
        ">=" => input >= output,
        "<=" => input <= output,
        ">" => input > output,
        _ => input < output,
    }
}

fn expression(ctx: &EvalContext<'_>, spec: &PredicateSpec) -> bool {
    let raw = spec.str_param("expression").unwrap_or_default();
    let resolved = ctx.resolve(&raw);
    match evaluate_expression(&resolved) {
        Ok(result) => result,
        Err(e) => {
            debug!("expression requirement '{}' rejected: {}", escape_log(&resolved), e);
            false
        }
    }
}
