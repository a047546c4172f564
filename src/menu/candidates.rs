//! Per-slot candidate lists.
//!
//! Built once per open or refresh. Each slot holds indices into the menu's
//! item arena, sorted so the first entry that passes its view requirement
//! is the one the player sees.

use std::collections::BTreeMap;

use super::types::MenuDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// Index into `MenuDefinition::items`.
    pub entry: usize,
    /// Definition sequence number; later definitions win priority ties.
    pub order: usize,
    pub priority: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateTable {
    slots: BTreeMap<usize, Vec<Candidate>>,
}

impl CandidateTable {
    pub fn build(menu: &MenuDefinition) -> Self {
        let size = menu.size();
        let mut slots: BTreeMap<usize, Vec<Candidate>> = BTreeMap::new();
        for (order, entry) in menu.items.iter().enumerate() {
            for slot in entry.slots.expand(size) {
                slots.entry(slot).or_default().push(Candidate {
                    entry: order,
                    order,
                    priority: entry.priority,
                });
            }
        }
        for list in slots.values_mut() {
            list.sort_by(|a, b| a.priority.cmp(&b.priority).then(b.order.cmp(&a.order)));
        }
        Self { slots }
    }

    /// Sorted candidates for `slot`; empty when nothing targets it.
    pub fn candidates(&self, slot: usize) -> &[Candidate] {
        self.slots.get(&slot).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Slots with at least one candidate, ascending.
    pub fn slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
