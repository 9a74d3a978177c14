//! Capability contracts implemented by content, and the lookup tables the
//! world uses to construct entities from kinds.

use std::{collections::BTreeMap, fmt};

use rampart_core::{
    AbilitySpec, Appearance, Command, ConfigError, Difficulty, EnemyKind, EnemySnapshot,
    EnemyStatBlock, ProjectileSpec, StatusKind, StatusPrototype, TowerKind, TowerSnapshot,
    TowerStats,
};

use crate::World;

/// Inputs available to a tower's attack behavior.
#[derive(Debug)]
pub struct AttackContext<'a> {
    /// Attacking tower with status modifiers already folded in.
    pub tower: &'a TowerSnapshot,
    /// Unmodified statistics for the tower's tier.
    pub stats: &'a TowerStats,
    /// Enemy selected by the targeting system.
    pub target: &'a EnemySnapshot,
    /// Difficulty of the running game.
    pub difficulty: Difficulty,
}

/// Inputs available when a tower's ability resolves.
#[derive(Debug)]
pub struct AbilityContext<'a> {
    /// World at the moment of resolution.
    pub world: &'a World,
    /// Tower whose cast completed.
    pub tower: &'a TowerSnapshot,
}

/// Behavior shared by every tower kind.
pub trait TowerArchetype {
    /// Kind served by this archetype.
    fn kind(&self) -> TowerKind;

    /// Highest tier the kind can reach. Tiers start at zero.
    fn max_tier(&self) -> u32;

    /// Statistics for a tier at the provided difficulty.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownTier`] when `tier` exceeds the kind's
    /// content.
    fn stats(&self, tier: u32, difficulty: Difficulty) -> Result<TowerStats, ConfigError>;

    /// Gold required to purchase the tower.
    fn cost(&self, difficulty: Difficulty) -> u32;

    /// Gold required to reach `tier`.
    fn upgrade_cost(&self, tier: u32, difficulty: Difficulty) -> u32;

    /// Produces the projectiles fired by one engagement.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the kind's projectile content is
    /// malformed; the world deactivates the tower.
    fn attack(
        &self,
        context: &AttackContext<'_>,
        out: &mut Vec<ProjectileSpec>,
    ) -> Result<(), ConfigError>;

    /// Active ability available at `tier`, if any.
    fn ability(&self, _tier: u32) -> Option<AbilitySpec> {
        None
    }

    /// Emits the commands produced when the ability resolves.
    fn resolve_ability(&self, _context: &AbilityContext<'_>, _out: &mut Vec<Command>) {}

    /// Presentation hints for the tier.
    fn appearance(&self, tier: u32) -> Appearance;
}

/// Behavior shared by every enemy kind.
pub trait EnemyArchetype {
    /// Kind served by this archetype.
    fn kind(&self) -> EnemyKind;

    /// Difficulty-branched statistics.
    fn stat_block(&self) -> &EnemyStatBlock;

    /// Presentation hints.
    fn appearance(&self) -> Appearance;
}

/// Lookup tables mapping kinds to archetypes and status prototypes.
#[derive(Default)]
pub struct Catalog {
    towers: BTreeMap<TowerKind, Box<dyn TowerArchetype>>,
    enemies: BTreeMap<EnemyKind, Box<dyn EnemyArchetype>>,
    statuses: BTreeMap<StatusKind, StatusPrototype>,
}

impl Catalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tower archetype, replacing any previous one for its kind.
    #[must_use]
    pub fn with_tower(mut self, archetype: impl TowerArchetype + 'static) -> Self {
        let _ = self.towers.insert(archetype.kind(), Box::new(archetype));
        self
    }

    /// Registers an enemy archetype, replacing any previous one for its kind.
    #[must_use]
    pub fn with_enemy(mut self, archetype: impl EnemyArchetype + 'static) -> Self {
        let _ = self.enemies.insert(archetype.kind(), Box::new(archetype));
        self
    }

    /// Registers a status prototype, replacing any previous one for its kind.
    #[must_use]
    pub fn with_status(mut self, prototype: StatusPrototype) -> Self {
        let _ = self.statuses.insert(prototype.kind.clone(), prototype);
        self
    }

    /// Archetype registered for a tower kind.
    #[must_use]
    pub fn tower(&self, kind: &TowerKind) -> Option<&dyn TowerArchetype> {
        self.towers.get(kind).map(Box::as_ref)
    }

    /// Archetype registered for an enemy kind.
    #[must_use]
    pub fn enemy(&self, kind: &EnemyKind) -> Option<&dyn EnemyArchetype> {
        self.enemies.get(kind).map(Box::as_ref)
    }

    /// Prototype registered for a status kind.
    #[must_use]
    pub fn status(&self, kind: &StatusKind) -> Option<&StatusPrototype> {
        self.statuses.get(kind)
    }

    /// Registered tower kinds in sorted order.
    pub fn tower_kinds(&self) -> impl Iterator<Item = &TowerKind> {
        self.towers.keys()
    }

    /// Registered enemy kinds in sorted order.
    pub fn enemy_kinds(&self) -> impl Iterator<Item = &EnemyKind> {
        self.enemies.keys()
    }
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalog")
            .field("towers", &self.towers.keys().collect::<Vec<_>>())
            .field("enemies", &self.enemies.keys().collect::<Vec<_>>())
            .field("statuses", &self.statuses.keys().collect::<Vec<_>>())
            .finish()
    }
}
