#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Rampart combat engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters and systems submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! describing what actually happened. Systems read immutable views such as
//! [`EnemyView`] and [`TowerView`] and respond exclusively with new command
//! batches.

mod geometry;
mod projectile;
mod stats;
mod status;
mod view;

use std::{borrow::Cow, fmt};

use serde::{Deserialize, Serialize};

pub use geometry::{Track, Velocity, WorldPoint};
pub use projectile::{Discipline, ExpireEffect, HitPayload, ProjectileSpec};
pub use stats::{
    AbilitySpec, Appearance, Difficulty, EnemyStatBlock, EnemyStats, TargetPreference, Tiered,
    TowerStats,
};
pub use status::{
    Modifier, Modifiers, Periodic, PeriodicPayload, StackingPolicy, StatusApplication,
    StatusDuration, StatusOutcome, StatusPrototype,
};
pub use view::{
    AbilityPhase, EnemySnapshot, EnemyView, ProjectileSnapshot, StatusSnapshot, TowerSnapshot,
    TowerTarget, TowerView,
};

/// Discrete simulation step counter.
pub type Tick = u64;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates a new identifier with the provided numeric value.
            #[must_use]
            pub const fn new(value: u32) -> Self {
                Self(value)
            }

            /// Retrieves the numeric representation of the identifier.
            #[must_use]
            pub const fn get(&self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

entity_id!(
    /// Unique identifier assigned to an enemy.
    EnemyId
);
entity_id!(
    /// Unique identifier assigned to a tower.
    TowerId
);
entity_id!(
    /// Unique identifier assigned to a projectile.
    ProjectileId
);
entity_id!(
    /// Unique identifier assigned to an active status effect.
    StatusId
);
entity_id!(
    /// Unique identifier assigned to a unit of delayed work.
    WorkId
);

/// Free-form label naming an attack category, a status category, or a
/// content kind. Immunities are expressed as sets of tags.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(Cow<'static, str>);

impl Tag {
    /// Creates a tag backed by a static string.
    #[must_use]
    pub const fn new(value: &'static str) -> Self {
        Self(Cow::Borrowed(value))
    }

    /// Creates a tag from an owned string, typically parsed from content data.
    #[must_use]
    pub fn owned(value: String) -> Self {
        Self(Cow::Owned(value))
    }

    /// String representation of the tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! tag_kind {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Tag);

        impl $name {
            /// Creates the kind from a static name.
            #[must_use]
            pub const fn new(value: &'static str) -> Self {
                Self(Tag::new(value))
            }

            /// Creates the kind from an owned name.
            #[must_use]
            pub fn owned(value: String) -> Self {
                Self(Tag::owned(value))
            }

            /// Name of the kind.
            #[must_use]
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }

            /// Tag used when checking immunities against this kind.
            #[must_use]
            pub const fn tag(&self) -> &Tag {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

tag_kind!(
    /// Attack category carried by towers and projectiles.
    AttackType
);
tag_kind!(
    /// Kind of status effect, keyed to a registered prototype.
    StatusKind
);
tag_kind!(
    /// Kind of tower, keyed to a registered archetype.
    TowerKind
);
tag_kind!(
    /// Kind of enemy, keyed to a registered archetype.
    EnemyKind
);

/// Reference to any entity capable of carrying status effects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityRef {
    /// An enemy on the track.
    Enemy(EnemyId),
    /// A placed tower.
    Tower(TowerId),
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enemy(id) => id.fmt(f),
            Self::Tower(id) => id.fmt(f),
        }
    }
}

/// Repetition policy attached to delayed work.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Repeat {
    /// Fires a single time and is then removed.
    Once,
    /// Fires the provided number of times at a fixed interval.
    Times(u32),
    /// Fires at a fixed interval until cancelled.
    Forever,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Starts a fresh game at the provided difficulty, clearing every registry
    /// and reseeding identity counters.
    ResetGame {
        /// Difficulty used to resolve stat blocks and the starting economy.
        difficulty: Difficulty,
    },
    /// Advances the simulation by one tick: delayed work, status effects,
    /// ability and cooldown timers, then enemy movement.
    Tick,
    /// Creates an enemy of the provided kind on the track.
    SpawnEnemy {
        /// Kind of enemy to construct.
        kind: EnemyKind,
        /// Distance along the track at which the enemy appears.
        progress: f32,
    },
    /// Purchases and places a tower.
    PlaceTower {
        /// Kind of tower to construct.
        kind: TowerKind,
        /// Fixed location of the tower.
        position: WorldPoint,
    },
    /// Purchases the next tier for a tower.
    UpgradeTower {
        /// Tower to upgrade.
        tower: TowerId,
    },
    /// Starts casting the tower's active ability.
    ActivateAbility {
        /// Tower whose ability should start.
        tower: TowerId,
    },
    /// Clears an in-progress cast without resolving it.
    CancelAbility {
        /// Tower whose cast should be cancelled.
        tower: TowerId,
    },
    /// Requests that a tower attack the provided enemy.
    Engage {
        /// Attacking tower.
        tower: TowerId,
        /// Enemy selected by the targeting system.
        enemy: EnemyId,
    },
    /// Moves every projectile, dispatches collisions and expiry bursts, then
    /// removes expired entities.
    ResolveProjectiles,
    /// Creates a projectile outside of a regular tower attack.
    SpawnProjectile {
        /// Description of the projectile to create.
        spec: ProjectileSpec,
    },
    /// Changes an enemy's hit points through the damage pipeline.
    ChangeHp {
        /// Enemy whose hit points change.
        enemy: EnemyId,
        /// Negative values damage, positive values heal.
        delta: f32,
        /// Attack category checked against immunities.
        attack_type: Option<AttackType>,
        /// Tower credited with the change.
        source: Option<TowerId>,
    },
    /// Applies a status effect through the status engine.
    ApplyStatus {
        /// Entity receiving the status.
        target: EntityRef,
        /// Status to apply.
        application: StatusApplication,
    },
    /// Removes a status effect of the provided kind.
    RemoveStatus {
        /// Entity carrying the status.
        target: EntityRef,
        /// Kind of status to remove.
        kind: StatusKind,
    },
    /// Adds gold to the player's economy.
    GrantGold {
        /// Amount of gold granted.
        amount: u32,
        /// Tower credited with generating the gold.
        source: Option<TowerId>,
    },
    /// Adjusts a free-form counter stored on a tower.
    AddCounter {
        /// Tower owning the counter.
        tower: TowerId,
        /// Counter name.
        name: String,
        /// Signed adjustment.
        amount: i64,
    },
    /// Queues a command to run after a delay, optionally repeating.
    Schedule {
        /// Ticks until the first invocation.
        delay: u32,
        /// Ticks between subsequent invocations.
        interval: u32,
        /// Repetition policy.
        repeat: Repeat,
        /// Command applied on every invocation.
        action: Box<Command>,
    },
    /// Cancels pending delayed work.
    CancelWork {
        /// Work to cancel.
        work: WorkId,
    },
    /// Completes the current round, invoking every tower's round-end hook.
    EndRound,
}

/// Reasons a player action may be rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectionReason {
    /// The player cannot afford the action.
    InsufficientGold {
        /// Gold required.
        cost: u32,
        /// Gold held by the player.
        available: u32,
    },
    /// The tower already reached its maximum tier.
    MaxTier,
    /// No archetype is registered for the requested kind.
    UnknownKind,
    /// The referenced tower does not exist.
    MissingTower,
    /// The tower is already casting or cooling down.
    Busy,
    /// The tower kind has no active ability.
    NoAbility,
    /// The tower was deactivated or the game is over.
    Inactive,
}

/// Content or data defects detected while running the simulation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A projectile discipline tag did not match any known discipline.
    #[error("unknown projectile discipline `{0}`")]
    UnknownDiscipline(String),
    /// A discipline requires an argument that was not supplied.
    #[error("projectile discipline `{0}` is missing its argument")]
    MissingDisciplineArgument(String),
    /// A tower tier outside the archetype's range was requested.
    #[error("tower kind `{kind}` has no tier {tier} (max {max})")]
    UnknownTier {
        /// Tower kind.
        kind: String,
        /// Requested tier.
        tier: u32,
        /// Highest supported tier.
        max: u32,
    },
    /// No tower archetype is registered for a kind.
    #[error("unknown tower kind `{0}`")]
    UnknownTowerKind(String),
    /// No enemy archetype is registered for a kind.
    #[error("unknown enemy kind `{0}`")]
    UnknownEnemyKind(String),
    /// No status prototype is registered for a kind.
    #[error("unknown status kind `{0}`")]
    UnknownStatusKind(String),
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// A new game started.
    GameReset {
        /// Difficulty of the new game.
        difficulty: Difficulty,
    },
    /// The simulation clock advanced.
    TimeAdvanced {
        /// Tick reached after advancing.
        tick: Tick,
    },
    /// An enemy entered the track.
    EnemySpawned {
        /// Identifier assigned to the enemy.
        enemy: EnemyId,
        /// Kind of the enemy.
        kind: EnemyKind,
        /// Initial position.
        position: WorldPoint,
    },
    /// An enemy's hit points reached zero.
    EnemyKilled {
        /// Enemy that died.
        enemy: EnemyId,
        /// Gold granted for the kill.
        reward: u32,
        /// Tower credited with the kill.
        source: Option<TowerId>,
    },
    /// An enemy reached the goal.
    EnemyLeaked {
        /// Enemy that leaked.
        enemy: EnemyId,
        /// Player hit points lost.
        damage: u32,
    },
    /// Damage was applied to an enemy.
    DamageDealt {
        /// Enemy that was damaged.
        enemy: EnemyId,
        /// Damage applied after modifiers.
        amount: f32,
        /// Hit points remaining.
        hp_after: f32,
        /// Tower credited with the damage.
        source: Option<TowerId>,
    },
    /// A hit was negated by an immunity.
    AttackAbsorbed {
        /// Enemy that absorbed the hit.
        enemy: EnemyId,
        /// Tag the enemy was immune to.
        tag: Tag,
    },
    /// An enemy recovered hit points.
    HealApplied {
        /// Enemy that was healed.
        enemy: EnemyId,
        /// Hit points restored.
        amount: f32,
        /// Hit points after healing.
        hp_after: f32,
    },
    /// Gold was added to the player's economy.
    GoldGranted {
        /// Amount granted.
        amount: u32,
        /// Tower credited with the gold.
        source: Option<TowerId>,
    },
    /// Gold was spent on a purchase.
    GoldSpent {
        /// Amount spent.
        amount: u32,
        /// Gold remaining.
        remaining: u32,
    },
    /// A new status effect was attached.
    StatusApplied {
        /// Entity carrying the status.
        target: EntityRef,
        /// Identifier of the status.
        status: StatusId,
        /// Kind of the status.
        kind: StatusKind,
    },
    /// An existing status effect was refreshed, stacked, or replaced.
    StatusRefreshed {
        /// Entity carrying the status.
        target: EntityRef,
        /// Identifier of the status.
        status: StatusId,
        /// Kind of the status.
        kind: StatusKind,
    },
    /// A status effect ran out of duration.
    StatusExpired {
        /// Entity that carried the status.
        target: EntityRef,
        /// Kind of the status.
        kind: StatusKind,
    },
    /// A status effect was explicitly removed.
    StatusRemoved {
        /// Entity that carried the status.
        target: EntityRef,
        /// Kind of the status.
        kind: StatusKind,
    },
    /// A projectile was created.
    ProjectileFired {
        /// Identifier of the projectile.
        projectile: ProjectileId,
        /// Tower that fired it.
        source: Option<TowerId>,
    },
    /// A projectile expired and was removed.
    ProjectileExpired {
        /// Identifier of the projectile.
        projectile: ProjectileId,
    },
    /// A tower was placed.
    TowerPlaced {
        /// Identifier assigned to the tower.
        tower: TowerId,
        /// Kind of the tower.
        kind: TowerKind,
        /// Location of the tower.
        position: WorldPoint,
    },
    /// A tower reached a new tier.
    TowerUpgraded {
        /// Upgraded tower.
        tower: TowerId,
        /// Tier reached.
        tier: u32,
    },
    /// A tower was deactivated because its content is misconfigured.
    TowerDeactivated {
        /// Deactivated tower.
        tower: TowerId,
        /// Defect that caused the deactivation.
        error: ConfigError,
    },
    /// A tower attacked an enemy.
    TowerEngaged {
        /// Attacking tower.
        tower: TowerId,
        /// Targeted enemy.
        enemy: EnemyId,
    },
    /// A tower started casting its ability.
    AbilityCast {
        /// Casting tower.
        tower: TowerId,
    },
    /// A tower's ability resolved.
    AbilityResolved {
        /// Tower whose ability resolved.
        tower: TowerId,
    },
    /// A tower's cast was cancelled.
    AbilityCancelled {
        /// Tower whose cast was cancelled.
        tower: TowerId,
    },
    /// A tower purchase was rejected.
    PurchaseRejected {
        /// Requested tower kind.
        kind: TowerKind,
        /// Reason for the rejection.
        reason: RejectionReason,
    },
    /// A tower upgrade was rejected.
    UpgradeRejected {
        /// Tower that could not be upgraded.
        tower: TowerId,
        /// Reason for the rejection.
        reason: RejectionReason,
    },
    /// An ability activation was rejected.
    AbilityRejected {
        /// Tower whose ability could not start.
        tower: TowerId,
        /// Reason for the rejection.
        reason: RejectionReason,
    },
    /// A round completed.
    RoundEnded {
        /// Round that just completed.
        round: u32,
    },
    /// The player's hit points reached zero.
    PlayerDefeated,
    /// Content data was found to be defective.
    ConfigurationError {
        /// The defect.
        error: ConfigError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn tower_id_round_trips_through_bincode() {
        assert_round_trip(&TowerId::new(42));
    }

    #[test]
    fn tower_kind_round_trips_through_bincode() {
        assert_round_trip(&TowerKind::new("dart"));
    }

    #[test]
    fn rejection_reason_round_trips_through_bincode() {
        assert_round_trip(&RejectionReason::InsufficientGold {
            cost: 120,
            available: 40,
        });
    }

    #[test]
    fn entity_ref_round_trips_through_bincode() {
        assert_round_trip(&EntityRef::Enemy(EnemyId::new(100_001)));
    }

    #[test]
    fn static_and_owned_tags_compare_equal() {
        let fixed = Tag::new("fire");
        let parsed = Tag::owned(String::from("fire"));
        assert_eq!(fixed, parsed);
        assert_eq!(AttackType::new("fire").tag(), &fixed);
    }

    #[test]
    fn identifiers_display_with_class_prefix() {
        assert_eq!(EnemyId::new(7).to_string(), "EnemyId#7");
        assert_eq!(StatusKind::new("slow").to_string(), "slow");
    }

    #[test]
    fn config_errors_render_readable_messages() {
        let error = ConfigError::UnknownTier {
            kind: String::from("dart"),
            tier: 9,
            max: 3,
        };
        assert_eq!(error.to_string(), "tower kind `dart` has no tier 9 (max 3)");
    }
}
