//! Identity allocation and storage shared by every entity class.

use std::collections::BTreeMap;

use rampart_core::{EnemyId, ProjectileId, StatusId, TowerId, WorkId};

/// Identifier types that can be minted by a [`Registry`].
pub(crate) trait EntityId: Copy + Ord {
    fn from_raw(value: u32) -> Self;
    fn raw(self) -> u32;
}

macro_rules! impl_entity_id {
    ($($name:ty),* $(,)?) => {
        $(
            impl EntityId for $name {
                fn from_raw(value: u32) -> Self {
                    <$name>::new(value)
                }

                fn raw(self) -> u32 {
                    self.get()
                }
            }
        )*
    };
}

impl_entity_id!(EnemyId, TowerId, ProjectileId, StatusId, WorkId);

/// Ordered storage that owns every entity of one class.
///
/// Identifiers are minted from a monotonically increasing counter that
/// restarts at the registry's seed on [`Registry::reset`]. Lookups of missing
/// identifiers return `None`.
#[derive(Clone, Debug)]
pub(crate) struct Registry<I, T> {
    entries: BTreeMap<I, T>,
    seed: u32,
    next: u32,
}

impl<I: EntityId, T> Registry<I, T> {
    pub(crate) fn new(seed: u32) -> Self {
        Self {
            entries: BTreeMap::new(),
            seed,
            next: seed,
        }
    }

    /// Removes every entry and rewinds the identifier counter to the seed.
    pub(crate) fn reset(&mut self) {
        self.entries.clear();
        self.next = self.seed;
    }

    /// Allocates an identifier and stores the value built for it.
    pub(crate) fn create(&mut self, build: impl FnOnce(I) -> T) -> I {
        let id = I::from_raw(self.next);
        self.next = self.next.saturating_add(1);
        let _ = self.entries.insert(id, build(id));
        id
    }

    /// Stores a value under an identifier chosen by the caller, as done when
    /// restoring a snapshot.
    pub(crate) fn insert(&mut self, id: I, value: T) {
        let _ = self.entries.insert(id, value);
    }

    pub(crate) fn get(&self, id: I) -> Option<&T> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: I) -> Option<&mut T> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn remove(&mut self, id: I) -> Option<T> {
        self.entries.remove(&id)
    }

    pub(crate) fn contains(&self, id: I) -> bool {
        self.entries.contains_key(&id)
    }

    /// Stable snapshot of the identifiers currently stored.
    ///
    /// Passes iterate the snapshot and re-resolve every identifier so that
    /// insertions and removals made during the pass are tolerated.
    pub(crate) fn ids(&self) -> Vec<I> {
        self.entries.keys().copied().collect()
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Guarantees the next minted identifier exceeds `id`.
    pub(crate) fn reseed_above(&mut self, id: I) {
        self.next = self.next.max(id.raw().saturating_add(1));
    }

    /// Next identifier the registry will mint.
    pub(crate) fn peek_next(&self) -> I {
        I::from_raw(self.next)
    }

    /// Removes entries rejected by the predicate, returning their identifiers.
    pub(crate) fn drain_where(&mut self, mut reject: impl FnMut(&T) -> bool) -> Vec<I> {
        let doomed: Vec<I> = self
            .entries
            .iter()
            .filter(|(_, value)| reject(value))
            .map(|(id, _)| *id)
            .collect();
        for id in &doomed {
            let _ = self.entries.remove(id);
        }
        doomed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_start_at_seed_and_increase() {
        let mut registry: Registry<EnemyId, &str> = Registry::new(100_000);
        let first = registry.create(|_| "a");
        let second = registry.create(|_| "b");

        assert_eq!(first, EnemyId::new(100_000));
        assert_eq!(second, EnemyId::new(100_001));
        assert_eq!(registry.get(second), Some(&"b"));
    }

    #[test]
    fn missing_identifier_is_not_found() {
        let mut registry: Registry<TowerId, u8> = Registry::new(1);
        let id = registry.create(|_| 3);
        assert_eq!(registry.remove(id), Some(3));
        assert!(registry.get(id).is_none());
        assert!(registry.get_mut(TowerId::new(999)).is_none());
        assert!(registry.remove(id).is_none());
    }

    #[test]
    fn reset_rewinds_counter() {
        let mut registry: Registry<ProjectileId, ()> = Registry::new(1_000_000);
        let _ = registry.create(|_| ());
        let _ = registry.create(|_| ());
        registry.reset();

        assert_eq!(registry.len(), 0);
        assert_eq!(registry.create(|_| ()), ProjectileId::new(1_000_000));
    }

    #[test]
    fn ids_snapshot_survives_mutation_during_iteration() {
        let mut registry: Registry<StatusId, u32> = Registry::new(5_000_000);
        for value in 0..4 {
            let _ = registry.create(|_| value);
        }

        let mut visited = Vec::new();
        for id in registry.ids() {
            let Some(value) = registry.get(id).copied() else {
                continue;
            };
            visited.push(value);
            if value == 0 {
                let _ = registry.remove(StatusId::new(5_000_002));
                let _ = registry.create(|_| 99);
            }
        }

        assert_eq!(visited, vec![0, 1, 3]);
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn reseed_above_only_moves_forward() {
        let mut registry: Registry<TowerId, ()> = Registry::new(1);
        registry.reseed_above(TowerId::new(41));
        assert_eq!(registry.peek_next(), TowerId::new(42));
        registry.reseed_above(TowerId::new(3));
        assert_eq!(registry.peek_next(), TowerId::new(42));
    }

    #[test]
    fn drain_where_removes_matching_entries() {
        let mut registry: Registry<EnemyId, bool> = Registry::new(10);
        let keep = registry.create(|_| false);
        let drop = registry.create(|_| true);

        assert_eq!(registry.drain_where(|expired| *expired), vec![drop]);
        assert!(registry.contains(keep));
        assert!(!registry.contains(drop));
    }
}
