//! Lifecycle hook dispatch table keyed by event and content kind.

use std::{collections::BTreeMap, fmt};

use rampart_core::{Command, EnemyKind, EnemySnapshot, EntityRef, Tag, TowerKind, TowerSnapshot};

use crate::{query, World};

/// Lifecycle points with a single callback per kind. Periodic hooks are
/// registered separately through [`HookTable::on_period`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HookEvent {
    /// An enemy was created.
    Spawn,
    /// An enemy's hit points reached zero.
    Death,
    /// A round completed; invoked once per tower.
    RoundEnd,
}

/// Callback invoked by the world. Hooks never mutate state directly; they
/// push commands that the world applies after the current pass.
pub type HookFn = fn(&HookContext<'_>, &mut Vec<Command>);

/// Read-only context handed to a hook.
pub struct HookContext<'a> {
    world: &'a World,
    subject: EntityRef,
}

impl<'a> HookContext<'a> {
    pub(crate) fn new(world: &'a World, subject: EntityRef) -> Self {
        Self { world, subject }
    }

    /// World the hook observes.
    #[must_use]
    pub fn world(&self) -> &'a World {
        self.world
    }

    /// Entity the hook fired for.
    #[must_use]
    pub fn subject(&self) -> EntityRef {
        self.subject
    }

    /// Snapshot of the subject when it is an enemy.
    ///
    /// Death hooks still see the enemy; it is removed at the next cleanup.
    #[must_use]
    pub fn enemy(&self) -> Option<EnemySnapshot> {
        match self.subject {
            EntityRef::Enemy(id) => query::enemy(self.world, id),
            EntityRef::Tower(_) => None,
        }
    }

    /// Snapshot of the subject when it is a tower.
    #[must_use]
    pub fn tower(&self) -> Option<TowerSnapshot> {
        match self.subject {
            EntityRef::Tower(id) => query::tower(self.world, id),
            EntityRef::Enemy(_) => None,
        }
    }
}

impl fmt::Debug for HookContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookContext")
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

/// Periodic hook with its own interval.
#[derive(Clone, Copy)]
pub(crate) struct PeriodicHook {
    pub(crate) every: u32,
    pub(crate) run: HookFn,
}

/// Dispatch table of content hooks.
#[derive(Clone, Default)]
pub struct HookTable {
    single: BTreeMap<(HookEvent, Tag), HookFn>,
    periodic: BTreeMap<Tag, Vec<PeriodicHook>>,
}

impl HookTable {
    /// Creates an empty hook table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the hook run once when an enemy of `kind` is created.
    #[must_use]
    pub fn on_spawn(mut self, kind: EnemyKind, run: HookFn) -> Self {
        let _ = self.single.insert((HookEvent::Spawn, kind.tag().clone()), run);
        self
    }

    /// Registers the hook run once when an enemy of `kind` dies.
    #[must_use]
    pub fn on_death(mut self, kind: EnemyKind, run: HookFn) -> Self {
        let _ = self.single.insert((HookEvent::Death, kind.tag().clone()), run);
        self
    }

    /// Registers the hook run for every tower of `kind` when a round ends.
    #[must_use]
    pub fn on_round_end(mut self, kind: TowerKind, run: HookFn) -> Self {
        let _ = self
            .single
            .insert((HookEvent::RoundEnd, kind.tag().clone()), run);
        self
    }

    /// Appends a hook run every `every` ticks while an enemy of `kind` lives.
    #[must_use]
    pub fn on_period(mut self, kind: EnemyKind, every: u32, run: HookFn) -> Self {
        self.periodic
            .entry(kind.tag().clone())
            .or_default()
            .push(PeriodicHook {
                every: every.max(1),
                run,
            });
        self
    }

    pub(crate) fn single(&self, event: HookEvent, kind: &Tag) -> Option<HookFn> {
        self.single.get(&(event, kind.clone())).copied()
    }

    pub(crate) fn periodic(&self, kind: &Tag) -> &[PeriodicHook] {
        self.periodic.get(kind).map_or(&[], Vec::as_slice)
    }
}

impl fmt::Debug for HookTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let single: Vec<_> = self.single.keys().collect();
        let periodic: Vec<_> = self
            .periodic
            .iter()
            .map(|(kind, hooks)| (kind, hooks.len()))
            .collect();
        f.debug_struct("HookTable")
            .field("single", &single)
            .field("periodic", &periodic)
            .finish()
    }
}
