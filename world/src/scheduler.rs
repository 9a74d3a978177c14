//! Delayed work: commands that run after a number of ticks, optionally
//! repeating at a fixed interval.

use rampart_core::{Command, Repeat, WorkId};

use crate::registry::Registry;

const WORK_ID_SEED: u32 = 1;

#[derive(Clone, Debug)]
struct DelayedWork {
    remaining: u32,
    interval: u32,
    repeat: Repeat,
    action: Command,
}

/// Queue of pending delayed work ordered by identifier.
#[derive(Clone, Debug)]
pub(crate) struct Scheduler {
    work: Registry<WorkId, DelayedWork>,
}

impl Scheduler {
    pub(crate) fn new() -> Self {
        Self {
            work: Registry::new(WORK_ID_SEED),
        }
    }

    pub(crate) fn reset(&mut self) {
        self.work.reset();
    }

    /// Queues `action` to run once `delay` ticks have elapsed.
    ///
    /// A delay of zero fires on the next advance. `Times(0)` behaves like
    /// `Once`.
    pub(crate) fn schedule(
        &mut self,
        delay: u32,
        interval: u32,
        repeat: Repeat,
        action: Command,
    ) -> WorkId {
        let repeat = match repeat {
            Repeat::Times(0) => Repeat::Once,
            other => other,
        };
        self.work.create(|_| DelayedWork {
            remaining: delay.max(1),
            interval: interval.max(1),
            repeat,
            action,
        })
    }

    /// Cancels pending work, reporting whether it existed.
    pub(crate) fn cancel(&mut self, id: WorkId) -> bool {
        self.work.remove(id).is_some()
    }

    /// Advances every timer by one tick and returns the actions that became
    /// due, in identifier order.
    pub(crate) fn advance(&mut self) -> Vec<Command> {
        let mut due = Vec::new();
        for id in self.work.ids() {
            let Some(entry) = self.work.get_mut(id) else {
                continue;
            };
            entry.remaining = entry.remaining.saturating_sub(1);
            if entry.remaining > 0 {
                continue;
            }

            due.push(entry.action.clone());
            let finished = match entry.repeat {
                Repeat::Once | Repeat::Times(0 | 1) => true,
                Repeat::Times(count) => {
                    entry.repeat = Repeat::Times(count - 1);
                    false
                }
                Repeat::Forever => false,
            };

            if finished {
                let _ = self.work.remove(id);
            } else {
                entry.remaining = entry.interval;
            }
        }
        due
    }

    pub(crate) fn pending(&self) -> usize {
        self.work.len()
    }
}
