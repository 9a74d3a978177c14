//! Immutable snapshots handed to pure systems and adapters.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{
    AttackType, Discipline, EnemyId, EnemyKind, EntityRef, ProjectileId, StatusDuration,
    StatusId, StatusKind, Tag, TargetPreference, TowerId, TowerKind, WorldPoint,
};

/// Immutable representation of a single enemy's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct EnemySnapshot {
    /// Identifier assigned to the enemy.
    pub id: EnemyId,
    /// Kind of the enemy.
    pub kind: EnemyKind,
    /// Current position.
    pub position: WorldPoint,
    /// Distance travelled along the track.
    pub progress: f32,
    /// Remaining hit points.
    pub hp: f32,
    /// Maximum hit points.
    pub max_hp: f32,
    /// Collision radius.
    pub size: f32,
    /// Camouflage flag.
    pub camouflaged: bool,
    /// Static and status-granted immunity tags.
    pub immunities: BTreeSet<Tag>,
    /// Pending removal; never a valid target.
    pub expired: bool,
}

impl EnemySnapshot {
    /// Reports whether the enemy ignores effects carrying the tag.
    #[must_use]
    pub fn is_immune_to(&self, tag: &Tag) -> bool {
        self.immunities.contains(tag)
    }

    /// Reports whether an effect with the provided detection can see the enemy.
    #[must_use]
    pub const fn visible_to(&self, camo_detection: bool) -> bool {
        !self.camouflaged || camo_detection
    }
}

/// Read-only snapshot describing every enemy on the track.
#[derive(Clone, Debug, Default)]
pub struct EnemyView {
    snapshots: Vec<EnemySnapshot>,
}

impl EnemyView {
    /// Creates a new enemy view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<EnemySnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured enemy snapshots in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &EnemySnapshot> {
        self.snapshots.iter()
    }

    /// Looks up a single enemy by identifier.
    #[must_use]
    pub fn get(&self, id: EnemyId) -> Option<&EnemySnapshot> {
        self.snapshots
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .and_then(|index| self.snapshots.get(index))
    }

    /// Number of enemies captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view captured no enemies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<EnemySnapshot> {
        self.snapshots
    }
}

/// Phase of a tower's active ability.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbilityPhase {
    /// Ready to be activated.
    #[default]
    Idle,
    /// Casting; the ability resolves when the timer reaches zero.
    Casting {
        /// Ticks until resolution.
        remaining: u32,
    },
    /// Resolved and waiting out its cooldown.
    Cooling {
        /// Ticks until the ability is idle again.
        remaining: u32,
    },
}

/// Immutable representation of a single tower's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct TowerSnapshot {
    /// Identifier allocated to the tower by the world.
    pub id: TowerId,
    /// Kind of the tower.
    pub kind: TowerKind,
    /// Fixed location.
    pub position: WorldPoint,
    /// Current tier.
    pub tier: u32,
    /// Engagement radius after status modifiers.
    pub range: f32,
    /// Attack category.
    pub attack_type: AttackType,
    /// Camo detection after status modifiers.
    pub camo_detection: bool,
    /// Target selection rule.
    pub preference: TargetPreference,
    /// Cleared when the tower was deactivated by a configuration error.
    pub active: bool,
    /// Set while a status suppresses attacks.
    pub disabled: bool,
    /// Ticks until the tower may engage again.
    pub cooldown: u32,
    /// Ability state.
    pub ability: AbilityPhase,
    /// Whether casting suppresses regular attacks.
    pub channeled: bool,
    /// Accumulated counters such as kills and damage dealt.
    pub counters: BTreeMap<String, i64>,
}

impl TowerSnapshot {
    /// Reports whether the tower may engage this tick, ignoring cooldown.
    #[must_use]
    pub fn can_attack(&self) -> bool {
        let channeling = self.channeled && matches!(self.ability, AbilityPhase::Casting { .. });
        self.active && !self.disabled && !channeling
    }
}

/// Read-only snapshot describing every placed tower.
#[derive(Clone, Debug, Default)]
pub struct TowerView {
    snapshots: Vec<TowerSnapshot>,
}

impl TowerView {
    /// Creates a new tower view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<TowerSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured tower snapshots in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &TowerSnapshot> {
        self.snapshots.iter()
    }

    /// Looks up a single tower by identifier.
    #[must_use]
    pub fn get(&self, id: TowerId) -> Option<&TowerSnapshot> {
        self.snapshots
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .and_then(|index| self.snapshots.get(index))
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<TowerSnapshot> {
        self.snapshots
    }
}

/// Target chosen for a tower during the current tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TowerTarget {
    /// Tower that will engage.
    pub tower: TowerId,
    /// Enemy selected by the tower's preference.
    pub enemy: EnemyId,
}

/// Immutable representation of an active status effect.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Identifier of the status.
    pub id: StatusId,
    /// Entity carrying the status.
    pub owner: EntityRef,
    /// Kind of the status.
    pub kind: StatusKind,
    /// Current potency.
    pub potency: f32,
    /// Number of stacks accumulated.
    pub stacks: u32,
    /// Remaining duration.
    pub duration: StatusDuration,
    /// Tower credited with the status.
    pub source: Option<TowerId>,
}

/// Immutable representation of a live projectile.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectileSnapshot {
    /// Identifier of the projectile.
    pub id: ProjectileId,
    /// Current position.
    pub position: WorldPoint,
    /// Collision discipline.
    pub discipline: Discipline,
    /// Remaining pierce.
    pub pierce: u32,
    /// Remaining lifetime in ticks.
    pub lifetime: u32,
    /// Enemies already hit.
    pub collided: BTreeSet<EnemyId>,
    /// Pending removal.
    pub expired: bool,
}
