//! Placeholder resolution.
//!
//! Text templating belongs to the host; the engine only consumes
//! [`PlaceholderResolver`]. On top of the host resolver the engine expands its
//! own menu-state placeholders (see [`MenuStateView::expand`]).

use std::collections::HashMap;

use crate::host::PlayerId;

/// Resolves `%placeholder%` style templates for a player.
pub trait PlaceholderResolver {
    fn resolve(&self, template: &str, player: PlayerId) -> String;
}

/// Resolver that returns templates unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPlaceholders;

impl PlaceholderResolver for NoPlaceholders {
    fn resolve(&self, template: &str, _player: PlayerId) -> String {
        template.to_string()
    }
}

/// Table-backed resolver replacing `%key%` tokens.
///
/// Per-player values shadow global ones. Unknown tokens are left as-is.
#[derive(Debug, Clone, Default)]
pub struct MapPlaceholders {
    global: HashMap<String, String>,
    per_player: HashMap<PlayerId, HashMap<String, String>>,
}

impl MapPlaceholders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_global(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.global.insert(key.into(), value.into());
    }

    pub fn set(&mut self, player: PlayerId, key: impl Into<String>, value: impl Into<String>) {
        self.per_player
            .entry(player)
            .or_default()
            .insert(key.into(), value.into());
    }

    fn lookup(&self, player: PlayerId, key: &str) -> Option<&str> {
        self.per_player
            .get(&player)
            .and_then(|m| m.get(key))
            .or_else(|| self.global.get(key))
            .map(String::as_str)
    }
}

impl PlaceholderResolver for MapPlaceholders {
    fn resolve(&self, template: &str, player: PlayerId) -> String {
        replace_tokens(template, |key| self.lookup(player, key).map(str::to_string))
    }
}

/// Replace every `%key%` token for which `lookup` returns a value.
pub fn replace_tokens<F>(template: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    if !template.contains('%') {
        return template.to_string();
    }
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('%') {
            Some(end) => {
                let key = &after[..end];
                let valid = !key.is_empty() && !key.contains(char::is_whitespace);
                match lookup(key).filter(|_| valid) {
                    Some(value) => {
                        out.push_str(&value);
                        rest = &after[end + 1..];
                    }
                    None => {
                        // Keep the leading % and rescan from the closing one.
                        out.push('%');
                        out.push_str(key);
                        rest = &after[end..];
                    }
                }
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Snapshot of a player's menu state for placeholder expansion.
#[derive(Debug, Clone, Default)]
pub struct MenuStateView {
    pub opened_menu: Option<(String, String)>,
    pub last_menu: Option<(String, String)>,
}

impl MenuStateView {
    /// Expand the `%menus_*%` placeholders.
    pub fn expand(&self, template: &str) -> String {
        if !template.contains("%menus_") {
            return template.to_string();
        }
        replace_tokens(template, |key| {
            let value = match key {
                "menus_opened_menu" => self.opened_menu.as_ref().map(|(id, _)| id.clone()),
                "menus_opened_menu_name" => self.opened_menu.as_ref().map(|(_, n)| n.clone()),
                "menus_last_menu" => self.last_menu.as_ref().map(|(id, _)| id.clone()),
                "menus_last_menu_name" => self.last_menu.as_ref().map(|(_, n)| n.clone()),
                "menus_is_in_menu" => {
                    return Some(if self.opened_menu.is_some() { "yes" } else { "no" }.to_string())
                }
                _ => return None,
            };
            Some(value.unwrap_or_default())
        })
    }
}
