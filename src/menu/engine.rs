//! # Menu Engine
//!
//! Owns the registry, the open sessions and the tick scheduler, and drives
//! the open → click → refresh → close lifecycle for every player.
//!
//! The engine never blocks and never owns the game loop. The host forwards
//! its events (`open_menu`, `handle_click`, `handle_close`,
//! `handle_disconnect`, `handle_command`) and calls [`MenuEngine::tick`] once
//! per server tick; delayed action lines and live-slot refreshes fire from
//! there.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gridmenus::config::EngineConfig;
//! use gridmenus::menu::{loader::LoadOptions, MenuEngine, MenuRegistry};
//! use gridmenus::sim::SimHost;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = EngineConfig::default();
//!     let mut registry = MenuRegistry::new(LoadOptions::from(&config));
//!     registry.load_dir("menus").await?;
//!     let mut engine = MenuEngine::new(config, registry);
//!
//!     let mut host = SimHost::new();
//!     let player = host.add_player("Steve");
//!     engine.open_menu(&mut host, player, "main")?;
//!     engine.handle_click(&mut host, player, 13);
//!     engine.tick(&mut host);
//!     Ok(())
//! }
//! ```

use log::{debug, info, trace, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::candidates::CandidateTable;
use super::registry::{CommandRoute, LoadReport, MenuRegistry};
use super::render::RenderContext;
use super::session::{MenuSession, PlayerMenuState, SessionState, SessionTable};
use super::types::MenuDefinition;
use crate::action::ActionTag;
use crate::config::EngineConfig;
use crate::errors::MenuError;
use crate::format::TextFormatter;
use crate::host::{EconomyProvider, Host, ItemStack, PermissionProvider, PlayerId};
use crate::logutil::escape_log;
use crate::placeholders::{MenuStateView, NoPlaceholders, PlaceholderResolver};
use crate::requirement::{evaluate_block, BlockEvaluation, EvalContext, PredicateRegistry, RequirementBlock};
use crate::scheduler::TickScheduler;

pub const DISABLED_MESSAGE: &str =
    "§cMenus are unavailable: the display assets are not installed on this server.";
pub const NO_PERMISSION_MESSAGE: &str = "§cYou don't have permission to use this command.";

/// Work deferred to a later tick. Jobs carry ids only and are re-validated when they fire.
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduledJob {
    /// A `<delay=N>` action line, placeholders already resolved.
    Action {
        player: PlayerId,
        tag: ActionTag,
        argument: String,
    },
    /// Periodic name/lore refresh of update-flagged slots.
    LiveUpdate { player: PlayerId, session: u64 },
}

impl ScheduledJob {
    pub fn player(&self) -> PlayerId {
        match self {
            ScheduledJob::Action { player, .. } | ScheduledJob::LiveUpdate { player, .. } => *player,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
    Opened,
    /// The open requirement failed; its deny actions ran.
    Denied,
    /// Close actions of the previous menu opened this menu instead.
    Redirected(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickOutcome {
    /// Whether the host must cancel the default item movement.
    pub cancelled: bool,
    /// Key of the entry that handled the click.
    pub entry: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Opened(String),
    Denied(String),
    Usage,
    NotFound(String),
    NotAllowed(String),
    NoPermission,
    Disabled,
    /// The label belongs to no menu; the host should try its other commands.
    Unrouted,
}

/// Placeholder resolver that expands the menu-state placeholders before
/// handing the template to the host resolver.
struct EngineResolver<'a> {
    sessions: &'a SessionTable,
    registry: &'a MenuRegistry,
    inner: &'a dyn PlaceholderResolver,
}

impl EngineResolver<'_> {
    fn view(&self, player: PlayerId) -> MenuStateView {
        let named = |id: Option<String>| {
            id.map(|id| {
                let name = self.registry.get(&id).map(|m| m.title.clone()).unwrap_or_else(|| id.clone());
                (id, name)
            })
        };
        let state = self.sessions.menu_state(player);
        MenuStateView {
            opened_menu: named(state.current),
            last_menu: named(state.last),
        }
    }
}

impl PlaceholderResolver for EngineResolver<'_> {
    fn resolve(&self, template: &str, player: PlayerId) -> String {
        if template.contains("%menus_") {
            let expanded = self.view(player).expand(template);
            self.inner.resolve(&expanded, player)
        } else {
            self.inner.resolve(template, player)
        }
    }
}

pub struct MenuEngine {
    pub(crate) config: EngineConfig,
    pub(crate) formatter: TextFormatter,
    pub(crate) registry: MenuRegistry,
    pub(crate) predicates: PredicateRegistry,
    pub(crate) placeholders: Box<dyn PlaceholderResolver>,
    pub(crate) economy: Option<Box<dyn EconomyProvider>>,
    pub(crate) permissions: Option<Box<dyn PermissionProvider>>,
    pub(crate) sessions: SessionTable,
    pub(crate) scheduler: TickScheduler<ScheduledJob>,
    pub(crate) rng: StdRng,
    pub(crate) enabled: bool,
    /// Nesting of `execute_actions`; bounds open/close action loops.
    pub(crate) action_depth: usize,
}

impl MenuEngine {
    pub fn new(config: EngineConfig, registry: MenuRegistry) -> Self {
        Self {
            formatter: config.text_formatter(),
            config,
            registry,
            predicates: PredicateRegistry::new(),
            placeholders: Box::new(NoPlaceholders),
            economy: None,
            permissions: None,
            sessions: SessionTable::new(),
            scheduler: TickScheduler::new(),
            rng: StdRng::from_entropy(),
            enabled: true,
            action_depth: 0,
        }
    }

    pub fn with_placeholders(mut self, resolver: impl PlaceholderResolver + 'static) -> Self {
        self.placeholders = Box::new(resolver);
        self
    }

    pub fn with_economy(mut self, economy: impl EconomyProvider + 'static) -> Self {
        self.economy = Some(Box::new(economy));
        self
    }

    pub fn with_permissions(mut self, permissions: impl PermissionProvider + 'static) -> Self {
        self.permissions = Some(Box::new(permissions));
        self
    }

    /// Deterministic chance rolls.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &MenuRegistry {
        &self.registry
    }

    pub fn predicates_mut(&mut self) -> &mut PredicateRegistry {
        &mut self.predicates
    }

    /// Reload every menu from disk. Open sessions keep the definition they were opened with.
    pub async fn reload(&mut self) -> Result<LoadReport, MenuError> {
        self.registry.reload().await
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Report whether the client-side display assets are available. Without
    /// them the engine refuses to open menus.
    pub fn set_display_assets_ready(&mut self, ready: bool) {
        if !ready && self.enabled {
            warn!("display assets not ready; menus are disabled until they are installed");
        }
        self.enabled = ready;
    }

    pub fn session(&self, player: PlayerId) -> Option<&MenuSession> {
        self.sessions.get(player)
    }

    pub fn menu_state(&self, player: PlayerId) -> PlayerMenuState {
        self.sessions.menu_state(player)
    }

    pub fn pending_tasks(&self) -> usize {
        self.scheduler.len()
    }

    fn resolver(&self) -> EngineResolver<'_> {
        EngineResolver {
            sessions: &self.sessions,
            registry: &self.registry,
            inner: self.placeholders.as_ref(),
        }
    }

    /// Resolve menu-state and host placeholders in `text` for `player`.
    pub fn resolve_text(&self, player: PlayerId, text: &str) -> String {
        self.resolver().resolve(text, player)
    }

    pub fn evaluate_requirements(
        &self,
        host: &dyn Host,
        player: PlayerId,
        block: &RequirementBlock,
    ) -> BlockEvaluation {
        let resolver = self.resolver();
        let ctx = EvalContext {
            player,
            host,
            placeholders: &resolver,
            economy: self.economy.as_deref(),
            xp_points_per_level: self.config.xp_points_per_level_fallback,
        };
        evaluate_block(&self.predicates, &ctx, block)
    }

    /// Run the success dispatch of an evaluation. Not idempotent: call once per decision.
    pub fn run_success_actions(&mut self, host: &mut dyn Host, player: PlayerId, eval: &BlockEvaluation) {
        let lines = eval.success_dispatch();
        if !lines.is_empty() {
            self.execute_actions(host, player, &lines);
        }
    }

    /// Run the deny dispatch of an evaluation. Not idempotent: call once per decision.
    pub fn run_deny_actions(&mut self, host: &mut dyn Host, player: PlayerId, eval: &BlockEvaluation) {
        let lines = eval.deny_dispatch();
        if !lines.is_empty() {
            self.execute_actions(host, player, &lines);
        }
    }

    /// Open a menu by id, enforcing its open requirement.
    pub fn open_menu(
        &mut self,
        host: &mut dyn Host,
        player: PlayerId,
        id: &str,
    ) -> Result<OpenOutcome, MenuError> {
        if !self.enabled {
            host.send_message(player, DISABLED_MESSAGE);
            return Err(MenuError::Disabled);
        }
        let menu = self
            .registry
            .get(id)
            .ok_or_else(|| MenuError::NotFound(id.trim().to_string()))?;

        if let Some(block) = &menu.open_requirement {
            let eval = self.evaluate_requirements(&*host, player, block);
            if !eval.passed {
                debug!("player {} denied menu '{}'", player, menu.id);
                self.run_deny_actions(host, player, &eval);
                return Ok(OpenOutcome::Denied);
            }
            self.run_success_actions(host, player, &eval);
        }
        Ok(self.show_menu(host, player, menu))
    }

    fn show_menu(&mut self, host: &mut dyn Host, player: PlayerId, menu: Arc<MenuDefinition>) -> OpenOutcome {
        if let Some(previous) = self.sessions.get(player).map(|s| s.id) {
            self.close_session(host, player);
            // The old menu's close actions may have opened another one; it keeps the window.
            if let Some(other) = self.sessions.get(player).filter(|s| s.id != previous) {
                debug!(
                    "player {} moved to '{}' while closing; '{}' not opened",
                    player, other.menu.id, menu.id
                );
                return OpenOutcome::Redirected(other.menu.id.clone());
            }
        }
        self.sessions.set_current_menu(player, &menu.id);
        let candidates = Arc::new(CandidateTable::build(&menu));
        let session_id = self.sessions.begin(player, menu.clone(), candidates);
        let title = self.resolve_text(player, &menu.title);
        host.open_window(player, session_id, &title, menu.rows);
        info!("player {} opened menu '{}'", player, menu.id);
        self.render(host, player);
        if let Some(session) = self.sessions.get_mut(player) {
            if session.id == session_id && session.state == SessionState::Opening {
                session.state = SessionState::Open;
            }
        }

        if !menu.open_actions.is_empty() {
            self.execute_actions(host, player, &menu.open_actions);
        }

        if menu.has_live_items() && self.sessions.is_current(player, session_id) {
            let task = self.scheduler.schedule_repeating(
                menu.update_interval_ticks,
                ScheduledJob::LiveUpdate {
                    player,
                    session: session_id,
                },
            );
            if let Some(session) = self.sessions.get_mut(player) {
                session.update_task = Some(task);
            }
            debug!(
                "menu '{}' live updates every {} ticks for {}",
                menu.id, menu.update_interval_ticks, player
            );
        }
        OpenOutcome::Opened
    }

    /// First candidate at `slot` whose view requirement passes, plus the deny
    /// lines of every candidate that failed before it.
    fn choose_visible(
        &self,
        host: &dyn Host,
        player: PlayerId,
        menu: &MenuDefinition,
        candidates: &CandidateTable,
        slot: usize,
    ) -> (Option<usize>, Vec<String>) {
        let mut denied = Vec::new();
        for candidate in candidates.candidates(slot) {
            let Some(entry) = menu.items.get(candidate.entry) else { continue };
            match &entry.view_requirement {
                None => return (Some(candidate.entry), denied),
                Some(block) => {
                    let eval = self.evaluate_requirements(host, player, block);
                    if eval.passed {
                        return (Some(candidate.entry), denied);
                    }
                    trace!("slot {}: '{}' hidden from {}", slot, entry.key, player);
                    denied.extend(eval.deny_dispatch());
                }
            }
        }
        (None, denied)
    }

    /// Rebuild candidates and repaint every slot of the player's window.
    ///
    /// Deny actions of hidden candidates run after the window is painted.
    fn render(&mut self, host: &mut dyn Host, player: PlayerId) {
        let Some(session) = self.sessions.get(player) else { return };
        let menu = session.menu.clone();
        let session_id = session.id;
        let candidates = Arc::new(CandidateTable::build(&menu));

        let (visible, rendered, denied) = {
            let host_ref: &dyn Host = &*host;
            let mut visible = BTreeMap::new();
            let mut denied = Vec::new();
            for slot in candidates.slots() {
                let (winner, deny) = self.choose_visible(host_ref, player, &menu, &candidates, slot);
                denied.extend(deny);
                if let Some(index) = winner {
                    visible.insert(slot, index);
                }
            }

            let resolver = self.resolver();
            let ctx = RenderContext {
                player,
                host: host_ref,
                placeholders: &resolver,
                formatter: &self.formatter,
            };
            let mut rendered: BTreeMap<usize, ItemStack> = BTreeMap::new();
            for (&slot, &index) in &visible {
                if let Some(item) = ctx.build_item(&menu.items[index]) {
                    rendered.insert(slot, item);
                }
            }
            if let Some(filler) = &menu.filler {
                if let Some(item) = ctx.build_filler(filler) {
                    for slot in filler.slots.expand(menu.size()) {
                        rendered.entry(slot).or_insert_with(|| item.clone());
                    }
                }
            }
            (visible, rendered, denied)
        };

        host.clear_window(player);
        for (slot, item) in &rendered {
            host.set_slot(player, *slot, Some(item.clone()));
        }
        trace!(
            "menu '{}' rendered {} of {} slots for {}",
            menu.id,
            rendered.len(),
            menu.size(),
            player
        );
        if let Some(session) = self.sessions.get_mut(player) {
            if session.id == session_id {
                session.candidates = candidates;
                session.visible = visible;
                session.rendered = rendered;
            }
        }
        if !denied.is_empty() {
            self.execute_actions(host, player, &denied);
        }
    }

    /// Re-render the open menu in place. Returns false when nothing is open.
    pub fn refresh(&mut self, host: &mut dyn Host, player: PlayerId) -> bool {
        let session_id = match self.sessions.get_mut(player) {
            Some(session) if session.state == SessionState::Open => {
                session.state = SessionState::Refreshing;
                session.id
            }
            _ => return false,
        };
        self.render(host, player);
        if let Some(session) = self.sessions.get_mut(player) {
            if session.id == session_id && session.state == SessionState::Refreshing {
                session.state = SessionState::Open;
            }
        }
        true
    }

    /// Re-resolve name and lore of update-flagged slots whose winner is unchanged.
    fn live_update(&mut self, host: &mut dyn Host, player: PlayerId) {
        let Some(session) = self.sessions.get(player) else { return };
        let menu = session.menu.clone();
        let candidates = session.candidates.clone();

        let updates: Vec<(usize, ItemStack)> = {
            let host_ref: &dyn Host = &*host;
            let resolver = self.resolver();
            let ctx = RenderContext {
                player,
                host: host_ref,
                placeholders: &resolver,
                formatter: &self.formatter,
            };
            let mut updates = Vec::new();
            for slot in candidates.slots() {
                let (winner, _) = self.choose_visible(host_ref, player, &menu, &candidates, slot);
                let Some(index) = winner else { continue };
                let entry = &menu.items[index];
                if !entry.update || session.visible.get(&slot) != Some(&index) {
                    continue;
                }
                let Some(current) = session.rendered.get(&slot) else { continue };
                let mut item = current.clone();
                ctx.refresh_text(entry, &mut item);
                if &item != current {
                    updates.push((slot, item));
                }
            }
            updates
        };

        for (slot, item) in updates {
            host.set_slot(player, slot, Some(item.clone()));
            if let Some(session) = self.sessions.get_mut(player) {
                session.rendered.insert(slot, item);
            }
        }
    }

    /// Handle a click in the player's menu window.
    ///
    /// The visible candidate is re-resolved against current state. Any click
    /// inside a menu is cancelled; clicks with no open menu are not ours.
    pub fn handle_click(&mut self, host: &mut dyn Host, player: PlayerId, slot: usize) -> ClickOutcome {
        let (menu, candidates) = match self.sessions.get(player) {
            Some(session) if session.state == SessionState::Open => {
                (session.menu.clone(), session.candidates.clone())
            }
            Some(_) => {
                return ClickOutcome {
                    cancelled: true,
                    entry: None,
                }
            }
            None => {
                return ClickOutcome {
                    cancelled: false,
                    entry: None,
                }
            }
        };

        let (winner, denied) = self.choose_visible(&*host, player, &menu, &candidates, slot);
        if !denied.is_empty() {
            self.execute_actions(host, player, &denied);
        }
        let Some(index) = winner else {
            return ClickOutcome {
                cancelled: true,
                entry: None,
            };
        };
        let entry = &menu.items[index];
        debug!("player {} clicked '{}' (slot {}) in '{}'", player, entry.key, slot, menu.id);

        let lines = match &entry.click_requirement {
            Some(block) => {
                let eval = self.evaluate_requirements(&*host, player, block);
                if eval.passed {
                    let mut lines = eval.success_dispatch();
                    lines.extend(entry.success_actions.lines());
                    lines
                } else {
                    eval.deny_dispatch()
                }
            }
            None => entry.click_actions(),
        };
        if !lines.is_empty() {
            self.execute_actions(host, player, &lines);
        }
        ClickOutcome {
            cancelled: true,
            entry: Some(entry.key.clone()),
        }
    }

    /// Close the player's session: cancel live updates, run close actions
    /// once, and move the current menu to last. Returns false when there was
    /// nothing live to close.
    pub(crate) fn close_session(&mut self, host: &mut dyn Host, player: PlayerId) -> bool {
        let Some(session) = self.sessions.get_mut(player) else { return false };
        if !session.is_live() {
            return false;
        }
        session.state = SessionState::Closing;
        let session_id = session.id;
        let menu = session.menu.clone();
        if let Some(task) = session.update_task.take() {
            self.scheduler.cancel(task);
        }

        if !menu.close_actions.is_empty() {
            self.execute_actions(host, player, &menu.close_actions);
        }

        // Close actions may already have opened another menu.
        if self.sessions.get(player).is_some_and(|s| s.id == session_id) {
            if let Some(mut session) = self.sessions.take(player) {
                session.state = SessionState::Closed;
            }
            self.sessions.clear_current_menu(player);
        }
        debug!("player {} closed menu '{}'", player, menu.id);
        true
    }

    /// The host reports that the menu window it opened as `window` closed.
    ///
    /// Events for a window that was already replaced are ignored.
    pub fn handle_close(&mut self, host: &mut dyn Host, player: PlayerId, window: u64) -> bool {
        match self.sessions.get(player) {
            Some(session) if session.id == window => self.close_session(host, player),
            Some(session) => {
                trace!(
                    "stale close of window {} for {} (showing {})",
                    window,
                    player,
                    session.id
                );
                false
            }
            None => false,
        }
    }

    /// Forget a player that left: no close actions, every pending task dropped.
    pub fn handle_disconnect(&mut self, player: PlayerId) {
        if let Some(session) = self.sessions.forget(player) {
            if let Some(task) = session.update_task {
                self.scheduler.cancel(task);
            }
        }
        let dropped = self.scheduler.cancel_where(|job| job.player() == player);
        debug!("player {} disconnected, {} pending task(s) dropped", player, dropped);
    }

    /// Advance one server tick and run whatever became due.
    pub fn tick(&mut self, host: &mut dyn Host) {
        for (task, job) in self.scheduler.advance() {
            match job {
                ScheduledJob::Action {
                    player,
                    tag,
                    argument,
                } => {
                    if host.is_online(player) {
                        self.run_verb(host, player, &tag, &argument);
                    } else {
                        trace!("dropping delayed {} for offline player {}", tag, player);
                    }
                }
                ScheduledJob::LiveUpdate { player, session } => {
                    if host.is_online(player) && self.sessions.is_current(player, session) {
                        self.live_update(host, player);
                    } else {
                        self.scheduler.cancel(task);
                        if let Some(s) = self.sessions.get_mut(player) {
                            if s.id == session {
                                s.update_task = None;
                            }
                        }
                        trace!("live update task for {} stopped", player);
                    }
                }
            }
        }
    }

    fn send_available(&self, host: &mut dyn Host, player: PlayerId) {
        let menus = self.registry.available();
        if menus.is_empty() {
            host.send_message(player, "§eNo menus are currently available.");
            return;
        }
        host.send_message(player, "§eAvailable menus:");
        for (id, title) in menus {
            host.send_message(player, &format!("§7- §e{} §7({})", id, title));
        }
        host.send_message(
            player,
            &format!("§7Use §e/{} <id> §7to open a menu", self.config.base_command),
        );
    }

    /// Route and run a typed command. `label` is the first word, without `/`.
    pub fn handle_command(
        &mut self,
        host: &mut dyn Host,
        player: PlayerId,
        label: &str,
        args: &[&str],
    ) -> CommandOutcome {
        let route = self.registry.route(label, args);
        if route == CommandRoute::Unrouted {
            return CommandOutcome::Unrouted;
        }
        if !self.enabled {
            host.send_message(player, DISABLED_MESSAGE);
            return CommandOutcome::Disabled;
        }
        let permission = self.config.command_permission.trim();
        if !permission.is_empty() && !host.has_permission(player, permission) {
            host.send_message(player, NO_PERMISSION_MESSAGE);
            return CommandOutcome::NoPermission;
        }

        match route {
            CommandRoute::Usage => {
                host.send_message(player, &format!("§eUsage: §7/{} <id>", self.config.base_command));
                host.send_message(player, "§7Or use the custom commands defined for each menu.");
                self.send_available(host, player);
                CommandOutcome::Usage
            }
            CommandRoute::NotFound(id) => {
                host.send_message(player, &format!("§cGUI with ID '{}' not found!", id));
                self.send_available(host, player);
                CommandOutcome::NotFound(id)
            }
            CommandRoute::NotAllowed(id) => {
                host.send_message(player, "§cInvalid command.");
                CommandOutcome::NotAllowed(id)
            }
            CommandRoute::Open(id) => match self.open_menu(host, player, &id) {
                Ok(OpenOutcome::Opened) => CommandOutcome::Opened(id),
                Ok(OpenOutcome::Denied) => CommandOutcome::Denied(id),
                Ok(OpenOutcome::Redirected(other)) => CommandOutcome::Opened(other),
                Err(MenuError::Disabled) => CommandOutcome::Disabled,
                Err(e) => {
                    warn!("command '{}' could not open '{}': {}", escape_log(label), id, e);
                    host.send_message(player, &format!("§cGUI '{}' not found!", id));
                    CommandOutcome::NotFound(id)
                }
            },
            CommandRoute::Unrouted => CommandOutcome::Unrouted,
        }
    }
}
