//! Menu registry and command router.
//!
//! Definitions are keyed by lowercase id and handed out as `Arc` snapshots.
//! Custom open commands are indexed by their first word; the base command
//! (`gui` by default) routes by id instead.

use log::{debug, info, warn};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

use super::loader::{parse_menu, parse_menu_str, LoadOptions, MenuFormat};
use super::types::MenuDefinition;
use crate::errors::MenuError;

/// Outcome of a directory load.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LoadReport {
    pub loaded: Vec<String>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Where a typed command should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandRoute {
    Open(String),
    /// Base command without an id.
    Usage,
    NotFound(String),
    /// The menu exists but does not list `<base> <id>` among its open commands.
    NotAllowed(String),
    /// Not a label this registry handles.
    Unrouted,
}

/// A custom open command as the host should register it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomCommand {
    pub label: String,
    pub menu: String,
    pub description: String,
}

fn normalize_command(command: &str) -> String {
    command
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Default)]
pub struct MenuRegistry {
    menus: BTreeMap<String, Arc<MenuDefinition>>,
    /// Custom command label -> menu key.
    commands: BTreeMap<String, String>,
    /// Menu key -> file it was loaded from.
    sources: BTreeMap<String, PathBuf>,
    dir: Option<PathBuf>,
    options: LoadOptions,
}

impl MenuRegistry {
    pub fn new(options: LoadOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.menus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.menus.is_empty()
    }

    /// Register a definition, replacing any with the same id.
    pub fn insert(&mut self, menu: MenuDefinition) -> Option<Arc<MenuDefinition>> {
        let key = menu.id.to_lowercase();
        let previous = self.menus.insert(key, Arc::new(menu));
        self.rebuild_commands();
        previous
    }

    /// Sanitize a decoded definition and register it.
    pub fn insert_value(&mut self, stem: &str, value: &Value) -> Result<Arc<MenuDefinition>, MenuError> {
        let menu = parse_menu(stem, value, &self.options)?;
        let key = menu.id.to_lowercase();
        self.insert(menu);
        self.get(&key).ok_or(MenuError::NotFound(key))
    }

    pub fn remove(&mut self, id: &str) -> Option<Arc<MenuDefinition>> {
        let key = id.trim().to_lowercase();
        self.sources.remove(&key);
        let removed = self.menus.remove(&key);
        self.rebuild_commands();
        removed
    }

    pub fn clear(&mut self) {
        self.menus.clear();
        self.commands.clear();
        self.sources.clear();
    }

    pub fn get(&self, id: &str) -> Option<Arc<MenuDefinition>> {
        self.menus.get(&id.trim().to_lowercase()).cloned()
    }

    /// `(id, title)` of every menu, ordered by id.
    pub fn available(&self) -> Vec<(String, String)> {
        self.menus
            .values()
            .map(|m| (m.id.clone(), m.title.clone()))
            .collect()
    }

    /// Custom command labels in label order, for registering them with the host.
    pub fn custom_commands(&self) -> Vec<CustomCommand> {
        self.commands
            .iter()
            .filter_map(|(label, key)| {
                let menu = self.menus.get(key)?;
                Some(CustomCommand {
                    label: label.clone(),
                    menu: menu.id.clone(),
                    description: menu
                        .command_description
                        .clone()
                        .unwrap_or_else(|| format!("Open the {} menu", menu.id)),
                })
            })
            .collect()
    }

    fn rebuild_commands(&mut self) {
        self.commands.clear();
        let base = self.options.base_command.to_lowercase();
        for (key, menu) in &self.menus {
            for command in &menu.open_commands {
                let Some(label) = command.split_whitespace().next() else { continue };
                let label = label.to_lowercase();
                if label == base {
                    continue;
                }
                match self.commands.get(&label) {
                    Some(owner) if owner != key => {
                        warn!("command '{}' of menu '{}' already bound to '{}'", label, key, owner);
                    }
                    Some(_) => {}
                    None => {
                        self.commands.insert(label, key.clone());
                    }
                }
            }
        }
    }

    /// Route a typed command. `label` is the first word, `args` the rest.
    pub fn route(&self, label: &str, args: &[&str]) -> CommandRoute {
        let label = label.trim().trim_start_matches('/').to_lowercase();
        if label == self.options.base_command.to_lowercase() {
            let Some(input) = args.first().map(|a| a.trim().to_lowercase()).filter(|a| !a.is_empty())
            else {
                return CommandRoute::Usage;
            };
            let Some(menu) = self.get(&input) else {
                return CommandRoute::NotFound(input);
            };
            let wanted = format!("{} {}", label, input);
            if menu.open_commands.iter().any(|c| normalize_command(c) == wanted) {
                return CommandRoute::Open(menu.id.clone());
            }
            return CommandRoute::NotAllowed(input);
        }
        match self.commands.get(&label).and_then(|key| self.menus.get(key)) {
            Some(menu) => CommandRoute::Open(menu.id.clone()),
            None => CommandRoute::Unrouted,
        }
    }

    async fn load_file(&self, path: &Path, format: MenuFormat) -> Result<MenuDefinition, MenuError> {
        let text = fs::read_to_string(path).await?;
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        parse_menu_str(stem, &text, format, &self.options)
    }

    /// Load every `*.toml` / `*.json` file in `dir`, in file-name order.
    ///
    /// A file that fails to parse is reported and skipped; the directory
    /// itself must be readable.
    pub async fn load_dir(&mut self, dir: impl AsRef<Path>) -> Result<LoadReport, MenuError> {
        let dir = dir.as_ref();
        let mut entries = fs::read_dir(dir).await?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if let Some(format) = MenuFormat::from_path(&path) {
                paths.push((path, format));
            }
        }
        paths.sort_by(|a, b| a.0.cmp(&b.0));

        let mut report = LoadReport::default();
        for (path, format) in paths {
            match self.load_file(&path, format).await {
                Ok(menu) => {
                    let key = menu.id.to_lowercase();
                    if let Some(other) = self.sources.get(&key).filter(|p| **p != path) {
                        warn!(
                            "menu '{}' in {} replaces the one from {}",
                            key,
                            path.display(),
                            other.display()
                        );
                    }
                    debug!("loaded menu '{}' ({} items)", key, menu.items.len());
                    self.sources.insert(key.clone(), path);
                    self.menus.insert(key.clone(), Arc::new(menu));
                    report.loaded.push(key);
                }
                Err(e) => {
                    warn!("skipping menu file {}: {}", path.display(), e);
                    report.failed.push((path, e.to_string()));
                }
            }
        }
        self.rebuild_commands();
        self.dir = Some(dir.to_path_buf());
        info!(
            "loaded {} menu(s) from {} ({} failed)",
            report.loaded.len(),
            dir.display(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Clear everything and load the last directory again.
    pub async fn reload(&mut self) -> Result<LoadReport, MenuError> {
        let Some(dir) = self.dir.clone() else {
            return Ok(LoadReport::default());
        };
        self.clear();
        self.load_dir(dir).await
    }

    /// Re-read the file one menu was loaded from.
    pub async fn reload_one(&mut self, id: &str) -> Result<Arc<MenuDefinition>, MenuError> {
        let key = id.trim().to_lowercase();
        let path = self
            .sources
            .get(&key)
            .cloned()
            .ok_or_else(|| MenuError::NotFound(key.clone()))?;
        let format = MenuFormat::from_path(&path).ok_or_else(|| MenuError::InvalidDefinition {
            id: key.clone(),
            reason: format!("unsupported file {}", path.display()),
        })?;
        let menu = self.load_file(&path, format).await?;
        let new_key = menu.id.to_lowercase();
        if new_key != key {
            self.menus.remove(&key);
            self.sources.remove(&key);
        }
        self.sources.insert(new_key.clone(), path);
        self.insert(menu);
        self.get(&new_key).ok_or(MenuError::NotFound(new_key))
    }
}
