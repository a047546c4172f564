use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::candidates::CandidateTable;
use super::types::MenuDefinition;
use crate::host::{ItemStack, PlayerId};
use crate::scheduler::TaskId;

/// # Menu Session
///
/// One open menu instance for one player. The session holds an `Arc`
/// snapshot of the definition it was opened with, so a registry reload never
/// changes a menu that is already on screen.
///
/// ## Lifecycle
///
/// 1. **Opening** - window requested, slots being populated
/// 2. **Open** - rendered and accepting clicks
/// 3. **Refreshing** - re-rendering in place, returns to Open
/// 4. **Closing** - close actions running
/// 5. **Closed** - terminal; the update task is cancelled
///
/// Scheduled jobs carry the session `id`, never a reference. A job whose id
/// no longer matches the player's live session is stale and is dropped.
#[derive(Debug, Clone)]
pub struct MenuSession {
    pub id: u64,
    pub player: PlayerId,
    pub menu: Arc<MenuDefinition>,
    pub candidates: Arc<CandidateTable>,
    /// Winning entry index per slot, as of the last render.
    pub visible: BTreeMap<usize, usize>,
    /// Items pushed to the window, filler included.
    pub rendered: BTreeMap<usize, ItemStack>,
    pub update_task: Option<TaskId>,
    pub state: SessionState,
    pub opened_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Opening,
    Open,
    Refreshing,
    Closing,
    Closed,
}

impl MenuSession {
    pub fn is_live(&self) -> bool {
        matches!(
            self.state,
            SessionState::Opening | SessionState::Open | SessionState::Refreshing
        )
    }
}

/// Current and previous menu ids for the menu-state placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerMenuState {
    pub current: Option<String>,
    pub last: Option<String>,
}

/// Open sessions and menu-state tracking, keyed by player.
#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: HashMap<PlayerId, MenuSession>,
    states: HashMap<PlayerId, PlayerMenuState>,
    next_id: u64,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session in `Opening`. Any previous session for the player must
    /// already have been closed by the caller.
    pub fn begin(
        &mut self,
        player: PlayerId,
        menu: Arc<MenuDefinition>,
        candidates: Arc<CandidateTable>,
    ) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.sessions.insert(
            player,
            MenuSession {
                id,
                player,
                menu,
                candidates,
                visible: BTreeMap::new(),
                rendered: BTreeMap::new(),
                update_task: None,
                state: SessionState::Opening,
                opened_at: Utc::now(),
            },
        );
        id
    }

    pub fn get(&self, player: PlayerId) -> Option<&MenuSession> {
        self.sessions.get(&player)
    }

    pub fn get_mut(&mut self, player: PlayerId) -> Option<&mut MenuSession> {
        self.sessions.get_mut(&player)
    }

    /// True when `session` is still the player's live session.
    pub fn is_current(&self, player: PlayerId, session: u64) -> bool {
        self.sessions
            .get(&player)
            .is_some_and(|s| s.id == session && s.is_live())
    }

    pub fn take(&mut self, player: PlayerId) -> Option<MenuSession> {
        self.sessions.remove(&player)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Record `menu_id` as current; the previous current becomes last when it differs.
    pub fn set_current_menu(&mut self, player: PlayerId, menu_id: &str) {
        let state = self.states.entry(player).or_default();
        if let Some(prev) = state.current.take() {
            if prev != menu_id {
                state.last = Some(prev);
            }
        }
        state.current = Some(menu_id.to_string());
    }

    /// Move current to last.
    pub fn clear_current_menu(&mut self, player: PlayerId) {
        if let Some(state) = self.states.get_mut(&player) {
            if let Some(current) = state.current.take() {
                state.last = Some(current);
            }
        }
    }

    pub fn menu_state(&self, player: PlayerId) -> PlayerMenuState {
        self.states.get(&player).cloned().unwrap_or_default()
    }

    /// Drop everything known about a player.
    pub fn forget(&mut self, player: PlayerId) -> Option<MenuSession> {
        self.states.remove(&player);
        self.sessions.remove(&player)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with_session(player: PlayerId) -> (SessionTable, u64) {
        let mut table = SessionTable::new();
        let menu = Arc::new(MenuDefinition::new("shop", 1));
        let candidates = Arc::new(CandidateTable::build(&menu));
        let id = table.begin(player, menu, candidates);
        (table, id)
    }

    #[test]
    fn session_ids_detect_stale_jobs() {
        let p = PlayerId::random();
        let (mut table, first) = table_with_session(p);
        assert!(table.is_current(p, first));
        let menu = Arc::new(MenuDefinition::new("other", 1));
        let second = table.begin(p, menu.clone(), Arc::new(CandidateTable::build(&menu)));
        assert_ne!(first, second);
        assert!(!table.is_current(p, first));
        if let Some(s) = table.get_mut(p) {
            s.state = SessionState::Closed;
        }
        assert!(!table.is_current(p, second));
    }

    #[test]
    fn menu_state_transitions() {
        let p = PlayerId::random();
        let mut table = SessionTable::new();
        table.set_current_menu(p, "main");
        table.set_current_menu(p, "main");
        assert_eq!(table.menu_state(p).last, None);
        table.set_current_menu(p, "shop");
        assert_eq!(
            table.menu_state(p),
            PlayerMenuState {
                current: Some("shop".into()),
                last: Some("main".into())
            }
        );
        table.clear_current_menu(p);
        assert_eq!(table.menu_state(p).current, None);
        assert_eq!(table.menu_state(p).last.as_deref(), Some("shop"));
        table.forget(p);
        assert_eq!(table.menu_state(p), PlayerMenuState::default());
    }
}
