//! Status effect prototypes, applications, and aggregated modifiers.

use serde::{Deserialize, Serialize};

use crate::{AttackType, StatusId, StatusKind, Tag, TowerId};

/// Rule applied when a status of a kind already present is applied again.
///
/// The policy belongs to the kind's prototype and never to the call site.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StackingPolicy {
    /// Keeps whichever application is stronger; ties keep the existing one.
    ReplaceIfStronger,
    /// Resets the remaining duration to the new application's duration.
    RefreshDuration,
    /// Adds potency up to a maximum number of stacks and keeps the longer
    /// remaining duration.
    AdditiveStack {
        /// Highest number of stacks the effect may reach.
        max_stacks: u32,
    },
    /// Leaves the existing effect untouched.
    IgnoreIfPresent,
}

/// Remaining lifetime of a status effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusDuration {
    /// Expires after the provided number of ticks.
    Ticks(u32),
    /// Never expires on its own.
    Persistent,
}

impl StatusDuration {
    /// Returns the longer of two durations.
    #[must_use]
    pub fn max(self, other: StatusDuration) -> StatusDuration {
        match (self, other) {
            (Self::Ticks(left), Self::Ticks(right)) => Self::Ticks(left.max(right)),
            _ => Self::Persistent,
        }
    }
}

/// Stat a status effect modulates while active.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modifier {
    /// No stat modulation; the status acts through its periodic payload or
    /// granted immunities only.
    None,
    /// Multiplies enemy movement speed by potency.
    Speed,
    /// Multiplies tower range by potency.
    Range,
    /// Multiplies tower damage by potency.
    Damage,
    /// Multiplies tower attack period by potency.
    AttackPeriod,
    /// Suppresses tower attacks or enemy movement.
    Disable,
    /// Grants camo detection to a tower.
    Detection,
}

impl Modifier {
    /// Strength of an application, used by the replace-if-stronger policy.
    ///
    /// Factor modifiers measure how far potency departs from neutral.
    #[must_use]
    pub fn strength(self, potency: f32) -> f32 {
        match self {
            Self::Speed | Self::Range | Self::Damage | Self::AttackPeriod => (potency - 1.0).abs(),
            Self::None | Self::Disable | Self::Detection => potency,
        }
    }
}

/// Payload delivered by a periodic status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodicPayload {
    /// Damages the owner by potency with the provided attack type.
    Damage {
        /// Attack type checked against the owner's immunities.
        attack_type: AttackType,
    },
    /// Heals the owner by potency.
    Heal,
    /// Grants potency gold, credited to the owning tower when applicable.
    Gold,
}

/// Periodic trigger attached to a status prototype.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Periodic {
    /// Ticks between payloads.
    pub every: u32,
    /// Payload delivered on each trigger.
    pub payload: PeriodicPayload,
}

/// Registered description of a status kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusPrototype {
    /// Kind described by the prototype.
    pub kind: StatusKind,
    /// Stacking rule for repeated applications.
    pub policy: StackingPolicy,
    /// Stat modulated by the status.
    pub modifier: Modifier,
    /// Optional periodic payload.
    pub periodic: Option<Periodic>,
    /// Tags the owner becomes immune to while the status is active.
    pub grants_immunity: Vec<Tag>,
}

/// Request to attach a status to an entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusApplication {
    /// Kind of status to attach.
    pub kind: StatusKind,
    /// Potency parameter interpreted by the kind's modifier and payload.
    pub potency: f32,
    /// Requested duration.
    pub duration: StatusDuration,
    /// Tower credited with the status.
    pub source: Option<TowerId>,
}

impl StatusApplication {
    /// Application lasting the provided number of ticks.
    #[must_use]
    pub fn timed(kind: StatusKind, potency: f32, ticks: u32) -> Self {
        Self {
            kind,
            potency,
            duration: StatusDuration::Ticks(ticks),
            source: None,
        }
    }

    /// Application that never expires on its own.
    #[must_use]
    pub fn persistent(kind: StatusKind, potency: f32) -> Self {
        Self {
            kind,
            potency,
            duration: StatusDuration::Persistent,
            source: None,
        }
    }

    /// Credits the application to a tower.
    #[must_use]
    pub fn from_tower(mut self, tower: TowerId) -> Self {
        self.source = Some(tower);
        self
    }
}

/// Multiplicative stat modifiers aggregated over an entity's statuses.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Modifiers {
    /// Movement speed multiplier.
    pub speed_factor: f32,
    /// Range multiplier.
    pub range_factor: f32,
    /// Damage multiplier.
    pub damage_factor: f32,
    /// Attack period multiplier.
    pub attack_period_factor: f32,
    /// Whether attacks or movement are suppressed.
    pub disabled: bool,
    /// Whether camo detection is granted.
    pub detection: bool,
}

impl Default for Modifiers {
    fn default() -> Self {
        Self {
            speed_factor: 1.0,
            range_factor: 1.0,
            damage_factor: 1.0,
            attack_period_factor: 1.0,
            disabled: false,
            detection: false,
        }
    }
}

impl Modifiers {
    /// Folds a single active status into the aggregate.
    pub fn absorb(&mut self, modifier: Modifier, potency: f32) {
        match modifier {
            Modifier::None => {}
            Modifier::Speed => self.speed_factor *= potency.max(0.0),
            Modifier::Range => self.range_factor *= potency.max(0.0),
            Modifier::Damage => self.damage_factor *= potency.max(0.0),
            Modifier::AttackPeriod => self.attack_period_factor *= potency.max(0.0),
            Modifier::Disable => self.disabled = true,
            Modifier::Detection => self.detection = true,
        }
    }
}

/// Result of applying a status through the status engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusOutcome {
    /// A new effect was attached.
    Applied(StatusId),
    /// The existing effect's duration was reset.
    Refreshed(StatusId),
    /// The existing effect gained potency.
    Stacked(StatusId),
    /// The existing effect was overwritten by a stronger application.
    Replaced(StatusId),
    /// The application was discarded in favour of the existing effect.
    Ignored,
    /// The target is immune to the status kind.
    Immune,
    /// The target no longer exists.
    Stale,
    /// No prototype is registered for the kind.
    Unknown,
}

impl StatusOutcome {
    /// Identifier of the effect that was attached or updated, if any.
    #[must_use]
    pub const fn status(&self) -> Option<StatusId> {
        match self {
            Self::Applied(id) | Self::Refreshed(id) | Self::Stacked(id) | Self::Replaced(id) => {
                Some(*id)
            }
            Self::Ignored | Self::Immune | Self::Stale | Self::Unknown => None,
        }
    }
}
