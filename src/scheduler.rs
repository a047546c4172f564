//! Tick scheduler for deferred action lines and live-slot refreshes.
//!
//! The host drives time: every call to [`TickScheduler::advance`] moves the
//! clock forward one server tick and hands back the jobs that became due.
//! Jobs are plain data, so a fired job carries only identifiers (player,
//! session) and the caller re-validates them before acting.
//!
//! Design Notes:
//! * Queue sizes are tiny (a handful of delayed lines per player) so a `Vec`
//!   scan is used instead of a heap.
//! * Due jobs fire in (due tick, task id) order, which preserves declaration
//!   order for lines scheduled with the same delay.

use log::trace;

/// Handle for a scheduled task, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

#[derive(Debug)]
struct ScheduledTask<J> {
    id: TaskId,
    due: u64,
    /// Repeat interval in ticks; `None` for one-shot tasks.
    every: Option<u64>,
    job: J,
}

#[derive(Debug)]
pub struct TickScheduler<J> {
    now: u64,
    next_id: u64,
    tasks: Vec<ScheduledTask<J>>,
}

impl<J: Clone> TickScheduler<J> {
    pub fn new() -> Self {
        Self {
            now: 0,
            next_id: 1,
            tasks: Vec::new(),
        }
    }

    fn alloc_id(&mut self) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Run `job` once, `delay` ticks from now. A delay of 0 fires on the next advance.
    pub fn schedule_delayed(&mut self, delay: u64, job: J) -> TaskId {
        let id = self.alloc_id();
        self.tasks.push(ScheduledTask {
            id,
            due: self.now + delay.max(1),
            every: None,
            job,
        });
        trace!("scheduled one-shot task {:?} in {} ticks", id, delay);
        id
    }

    /// Run `job` every `interval` ticks (minimum 1), first firing one interval from now.
    pub fn schedule_repeating(&mut self, interval: u64, job: J) -> TaskId {
        let interval = interval.max(1);
        let id = self.alloc_id();
        self.tasks.push(ScheduledTask {
            id,
            due: self.now + interval,
            every: Some(interval),
            job,
        });
        trace!("scheduled repeating task {:?} every {} ticks", id, interval);
        id
    }

    /// Cancel a task. Returns false when it already fired (one-shot) or was cancelled.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        before != self.tasks.len()
    }

    /// Cancel every task whose job matches the predicate. Returns the number removed.
    pub fn cancel_where<F: Fn(&J) -> bool>(&mut self, pred: F) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| !pred(&t.job));
        before - self.tasks.len()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Advance one tick and return the jobs due at the new tick.
    pub fn advance(&mut self) -> Vec<(TaskId, J)> {
        self.now += 1;
        let now = self.now;
        let mut due: Vec<(u64, TaskId, J)> = Vec::new();
        let mut kept = Vec::with_capacity(self.tasks.len());
        for mut task in self.tasks.drain(..) {
            if task.due > now {
                kept.push(task);
                continue;
            }
            due.push((task.due, task.id, task.job.clone()));
            if let Some(every) = task.every {
                task.due = now + every;
                kept.push(task);
            }
        }
        self.tasks = kept;
        due.sort_by_key(|(at, id, _)| (*at, *id));
        due.into_iter().map(|(_, id, job)| (id, job)).collect()
    }
}

impl<J: Clone> Default for TickScheduler<J> {
    fn default() -> Self {
        Self::new()
    }
}
