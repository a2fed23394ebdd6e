//! Cancellable, clock-injected scheduling of delayed continuations.
//!
//! The scheduler performs no I/O and owns no timer. Callers pass the current
//! time in milliseconds, ask for [Scheduler::next_deadline] to know when to wake
//! up, and drain whatever is due with [Scheduler::take_due].

/// Handle to a scheduled task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

/// Tasks are cancelled together by group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskGroup {
    /// Work tied to the current round; cancelled when the round is superseded.
    Round,
    /// Wallet highlight; survives round changes.
    Wallet,
}

#[derive(Clone, Debug)]
struct Scheduled<T> {
    id: TaskId,
    group: TaskGroup,
    due_ms: u64,
    task: T,
}

#[derive(Clone, Debug)]
pub struct Scheduler<T> {
    next_id: u64,
    pending: Vec<Scheduled<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            pending: Vec::new(),
        }
    }

    /// Run `task` once `delay_ms` has elapsed after `now_ms`.
    pub fn schedule(&mut self, group: TaskGroup, now_ms: u64, delay_ms: u64, task: T) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.pending.push(Scheduled {
            id,
            group,
            due_ms: now_ms.saturating_add(delay_ms),
            task,
        });
        id
    }

    /// Cancel every pending task in `group`, returning how many were dropped.
    pub fn cancel_group(&mut self, group: TaskGroup) -> usize {
        let before = self.pending.len();
        self.pending.retain(|scheduled| scheduled.group != group);
        before - self.pending.len()
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.pending.iter().map(|scheduled| scheduled.due_ms).min()
    }

    pub fn pending(&self, group: TaskGroup) -> usize {
        self.pending
            .iter()
            .filter(|scheduled| scheduled.group == group)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Remove and return all tasks due at `now_ms` with their deadlines,
    /// earliest first. Ties keep scheduling order.
    pub fn take_due(&mut self, now_ms: u64) -> Vec<(u64, T)> {
        let (mut due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|scheduled| scheduled.due_ms <= now_ms);
        self.pending = pending;
        due.sort_by_key(|scheduled| (scheduled.due_ms, scheduled.id));
        due.into_iter()
            .map(|scheduled| (scheduled.due_ms, scheduled.task))
            .collect()
    }
}
