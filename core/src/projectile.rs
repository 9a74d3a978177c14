//! Projectile descriptions produced by tower attacks.

use serde::{Deserialize, Serialize};

use crate::{
    AttackType, ConfigError, EnemyId, StatusApplication, TowerId, Velocity, WorldPoint,
};

/// Rule a projectile follows when looking for collisions.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Discipline {
    /// Hits the first eligible enemy it touches, at most one per tick.
    NonTarget,
    /// Homes on a single enemy and ignores everything else.
    Target(EnemyId),
    /// Travels to a fixed point, hitting every eligible enemy on the way.
    Destinated(WorldPoint),
}

impl Discipline {
    /// Parses a discipline from its content tag.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownDiscipline`] for unrecognised tags and
    /// [`ConfigError::MissingDisciplineArgument`] when `target` or
    /// `destinated` lack their argument.
    pub fn from_tag(
        tag: &str,
        target: Option<EnemyId>,
        destination: Option<WorldPoint>,
    ) -> Result<Self, ConfigError> {
        match tag {
            "nontarget" => Ok(Self::NonTarget),
            "target" => target
                .map(Self::Target)
                .ok_or_else(|| ConfigError::MissingDisciplineArgument(tag.to_owned())),
            "destinated" => destination
                .map(Self::Destinated)
                .ok_or_else(|| ConfigError::MissingDisciplineArgument(tag.to_owned())),
            other => Err(ConfigError::UnknownDiscipline(other.to_owned())),
        }
    }

    /// Content tag naming the discipline.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::NonTarget => "nontarget",
            Self::Target(_) => "target",
            Self::Destinated(_) => "destinated",
        }
    }
}

/// Damage and statuses delivered to an enemy on a successful hit.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HitPayload {
    /// Damage dealt before the source tower's damage factor.
    pub damage: f32,
    /// Statuses applied to the enemy.
    pub statuses: Vec<StatusApplication>,
}

/// Effect fired exactly once when a projectile expires.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum ExpireEffect {
    /// The projectile simply disappears.
    #[default]
    Nothing,
    /// Every eligible enemy within the radius receives the payload.
    Burst {
        /// Radius of the burst around the projectile's final position.
        radius: f32,
        /// Payload applied to each enemy caught in the burst.
        payload: HitPayload,
    },
}

/// Complete description of a projectile to create.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectileSpec {
    /// Starting position.
    pub origin: WorldPoint,
    /// Per-tick displacement; homing projectiles keep its magnitude.
    pub velocity: Velocity,
    /// Collision discipline.
    pub discipline: Discipline,
    /// Number of enemies the projectile may affect.
    pub pierce: u32,
    /// Collision radius.
    pub radius: f32,
    /// Ticks before the projectile expires on its own.
    pub lifetime: u32,
    /// Attack category checked against immunities.
    pub attack_type: AttackType,
    /// Whether the projectile can affect camouflaged enemies.
    pub camo_detection: bool,
    /// Payload delivered on collision.
    pub on_collide: HitPayload,
    /// Effect fired on expiry.
    pub on_expire: ExpireEffect,
    /// Tower credited with the projectile's effects.
    pub source: Option<TowerId>,
}

impl ProjectileSpec {
    /// Projectile travelling from `origin` toward `aim` at `speed` with a
    /// single pierce and no expiry effect.
    #[must_use]
    pub fn aimed(
        origin: WorldPoint,
        aim: WorldPoint,
        speed: f32,
        discipline: Discipline,
        attack_type: AttackType,
    ) -> Self {
        Self {
            origin,
            velocity: Velocity::toward(origin, aim, speed),
            discipline,
            pierce: 1,
            radius: 2.0,
            lifetime: 120,
            attack_type,
            camo_detection: false,
            on_collide: HitPayload::default(),
            on_expire: ExpireEffect::Nothing,
            source: None,
        }
    }
}
