//! Difficulty-branched stat blocks resolved once at construction.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{AttackType, Tag};

/// Difficulty tier selected when a game starts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Difficulty {
    /// Forgiving economy and weaker enemies.
    Easy,
    /// Baseline tuning.
    #[default]
    Medium,
    /// Scarce gold and tougher enemies.
    Hard,
}

/// Value with one variant per difficulty tier.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tiered<T> {
    easy: T,
    medium: T,
    hard: T,
}

impl<T> Tiered<T> {
    /// Creates a tiered value from its three variants.
    #[must_use]
    pub const fn new(easy: T, medium: T, hard: T) -> Self {
        Self { easy, medium, hard }
    }

    /// Variant associated with the provided difficulty.
    #[must_use]
    pub const fn pick(&self, difficulty: Difficulty) -> &T {
        match difficulty {
            Difficulty::Easy => &self.easy,
            Difficulty::Medium => &self.medium,
            Difficulty::Hard => &self.hard,
        }
    }
}

impl<T: Copy> Tiered<T> {
    /// Creates a tiered value that is identical across difficulties.
    #[must_use]
    pub const fn uniform(value: T) -> Self {
        Self::new(value, value, value)
    }

    /// Copies out the variant associated with the provided difficulty.
    #[must_use]
    pub fn get(&self, difficulty: Difficulty) -> T {
        *self.pick(difficulty)
    }
}

/// Rule a tower uses to choose among the enemies in range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetPreference {
    /// Enemy furthest along the track.
    #[default]
    First,
    /// Enemy least advanced along the track.
    Last,
    /// Enemy with the most remaining hit points.
    Strongest,
    /// Enemy with the fewest remaining hit points.
    Weakest,
    /// Enemy closest to the tower.
    Closest,
}

/// Difficulty-branched statistics supplied by enemy content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnemyStatBlock {
    /// Distance travelled along the track per tick.
    pub speed: Tiered<f32>,
    /// Collision radius.
    pub size: f32,
    /// Maximum hit points.
    pub hp: Tiered<f32>,
    /// Gold granted when the enemy dies.
    pub reward: Tiered<u32>,
    /// Player hit points lost when the enemy reaches the goal.
    pub goal_damage: Tiered<u32>,
    /// Attack types and status kinds that have no effect on the enemy.
    pub immunities: Vec<Tag>,
    /// Hidden from effects lacking camo detection.
    pub camouflaged: bool,
}

impl EnemyStatBlock {
    /// Resolves the block into concrete statistics for a difficulty.
    #[must_use]
    pub fn resolve(&self, difficulty: Difficulty) -> EnemyStats {
        EnemyStats {
            speed: self.speed.get(difficulty),
            size: self.size,
            max_hp: self.hp.get(difficulty).max(0.0),
            reward: self.reward.get(difficulty),
            goal_damage: self.goal_damage.get(difficulty),
            immunities: self.immunities.iter().cloned().collect(),
            camouflaged: self.camouflaged,
        }
    }
}

/// Concrete enemy statistics chosen once at construction.
#[derive(Clone, Debug, PartialEq)]
pub struct EnemyStats {
    /// Distance travelled along the track per tick.
    pub speed: f32,
    /// Collision radius.
    pub size: f32,
    /// Maximum hit points.
    pub max_hp: f32,
    /// Gold granted on death.
    pub reward: u32,
    /// Player hit points lost on arrival at the goal.
    pub goal_damage: u32,
    /// Static immunity tags.
    pub immunities: BTreeSet<Tag>,
    /// Camouflage flag.
    pub camouflaged: bool,
}

/// Concrete tower statistics for a tier and difficulty.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TowerStats {
    /// Footprint radius of the tower.
    pub size: f32,
    /// Engagement radius before status modifiers.
    pub range: f32,
    /// Ticks between engagements before status modifiers.
    pub attack_period: u32,
    /// Damage dealt by each projectile hit before status modifiers.
    pub damage: f32,
    /// Attack category checked against enemy immunities.
    pub attack_type: AttackType,
    /// Whether the tower can see camouflaged enemies.
    pub camo_detection: bool,
    /// Target selection rule.
    pub preference: TargetPreference,
}

/// Active ability exposed by a tower kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilitySpec {
    /// Gold spent to start casting.
    pub cost: u32,
    /// Ticks spent casting before the ability resolves.
    pub cast_ticks: u32,
    /// Ticks the ability stays unavailable after resolving.
    pub cooldown_ticks: u32,
    /// Whether regular attacks are suppressed while casting.
    pub channeled: bool,
}

/// Presentation hints forwarded to rendering adapters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Appearance {
    /// Sprite identifier understood by the presentation layer.
    pub sprite: &'static str,
    /// Relative scale applied to the sprite.
    pub scale_percent: u16,
}
