//! Tower lifecycle: placement, upgrades, engagements, abilities, and round
//! end triggers.

use std::collections::BTreeMap;

use rampart_core::{
    AbilityPhase, ConfigError, EnemyId, EntityRef, Event, RejectionReason, StatusId, StatusKind,
    TowerId, TowerKind, TowerSnapshot, TowerStats, WorldPoint,
};

use crate::{
    catalog::{AbilityContext, AttackContext},
    hooks::{HookContext, HookEvent},
    report_config_error, World,
};

/// Tower stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct Tower {
    pub(crate) id: TowerId,
    pub(crate) kind: TowerKind,
    pub(crate) position: WorldPoint,
    pub(crate) tier: u32,
    /// Statistics of the current tier before status modifiers.
    pub(crate) stats: TowerStats,
    /// Ticks until the tower may engage again.
    pub(crate) cooldown: u32,
    pub(crate) ability: AbilityPhase,
    pub(crate) statuses: BTreeMap<StatusKind, StatusId>,
    pub(crate) counters: BTreeMap<String, i64>,
    pub(crate) active: bool,
}

impl Tower {
    pub(crate) fn new(
        id: TowerId,
        kind: TowerKind,
        position: WorldPoint,
        tier: u32,
        stats: TowerStats,
    ) -> Self {
        Self {
            id,
            kind,
            position,
            tier,
            stats,
            cooldown: 0,
            ability: AbilityPhase::Idle,
            statuses: BTreeMap::new(),
            counters: BTreeMap::new(),
            active: true,
        }
    }
}

impl World {
    /// Purchases and places a tower of `kind` at its base tier.
    pub(crate) fn place_tower(
        &mut self,
        kind: TowerKind,
        position: WorldPoint,
        out_events: &mut Vec<Event>,
    ) -> Option<TowerId> {
        if self.defeated {
            reject_purchase(kind, RejectionReason::Inactive, out_events);
            return None;
        }

        let priced = self
            .catalog
            .tower(&kind)
            .map(|archetype| (archetype.stats(0, self.difficulty), archetype.cost(self.difficulty)));
        let (stats, cost) = match priced {
            None => {
                reject_purchase(kind, RejectionReason::UnknownKind, out_events);
                return None;
            }
            Some((Err(error), _)) => {
                report_config_error(error, out_events);
                reject_purchase(kind, RejectionReason::UnknownKind, out_events);
                return None;
            }
            Some((Ok(stats), cost)) => (stats, cost),
        };

        if let Err(reason) = self.spend(cost, out_events) {
            reject_purchase(kind, reason, out_events);
            return None;
        }

        let id = self
            .towers
            .create(|id| Tower::new(id, kind.clone(), position, 0, stats));
        tracing::debug!(tower = %id, %kind, cost, "tower placed");
        out_events.push(Event::TowerPlaced {
            tower: id,
            kind,
            position,
        });
        Some(id)
    }

    /// Raises a tower by one tier after checking the kind's limit and cost.
    pub(crate) fn upgrade_tower(&mut self, tower: TowerId, out_events: &mut Vec<Event>) {
        let Some(state) = self.towers.get(tower) else {
            reject_upgrade(tower, RejectionReason::MissingTower, out_events);
            return;
        };
        if !state.active {
            reject_upgrade(tower, RejectionReason::Inactive, out_events);
            return;
        }

        let next = state.tier.saturating_add(1);
        let Some((max_tier, stats, cost)) = self.catalog.tower(&state.kind).map(|archetype| {
            (
                archetype.max_tier(),
                archetype.stats(next, self.difficulty),
                archetype.upgrade_cost(next, self.difficulty),
            )
        }) else {
            let error = ConfigError::UnknownTowerKind(state.kind.to_string());
            self.deactivate(tower, error, out_events);
            return;
        };

        if next > max_tier {
            reject_upgrade(tower, RejectionReason::MaxTier, out_events);
            return;
        }
        let stats = match stats {
            Ok(stats) => stats,
            Err(error) => {
                self.deactivate(tower, error, out_events);
                return;
            }
        };
        if let Err(reason) = self.spend(cost, out_events) {
            reject_upgrade(tower, reason, out_events);
            return;
        }

        if let Some(state) = self.towers.get_mut(tower) {
            state.tier = next;
            state.stats = stats;
        }
        tracing::debug!(%tower, tier = next, cost, "tower upgraded");
        out_events.push(Event::TowerUpgraded { tower, tier: next });
    }

    /// Takes a tower out of play after a content defect.
    pub(crate) fn deactivate(&mut self, tower: TowerId, error: ConfigError, out_events: &mut Vec<Event>) {
        if let Some(state) = self.towers.get_mut(tower) {
            state.active = false;
        }
        report_config_error(error.clone(), out_events);
        out_events.push(Event::TowerDeactivated { tower, error });
    }

    /// Fires the tower at the enemy if the engagement is still valid.
    ///
    /// The targeting system works from a snapshot, so range, visibility,
    /// immunity, and cooldown are checked again against the live world.
    pub(crate) fn engage(&mut self, tower: TowerId, enemy: EnemyId, out_events: &mut Vec<Event>) {
        let Some(state) = self.towers.get(tower) else {
            tracing::trace!(%tower, "engage ignored for missing tower");
            return;
        };
        let snapshot = self.tower_snapshot(state);
        let stats = state.stats.clone();
        if !snapshot.can_attack() || snapshot.cooldown > 0 {
            tracing::trace!(%tower, cooldown = snapshot.cooldown, "tower not ready");
            return;
        }

        let Some(target) = self
            .enemies
            .get(enemy)
            .filter(|state| !state.expired)
            .map(|state| self.enemy_snapshot(state))
        else {
            tracing::trace!(%tower, %enemy, "engage target is gone");
            return;
        };
        let in_range = target.position.distance(snapshot.position) <= snapshot.range;
        if !in_range
            || !target.visible_to(snapshot.camo_detection)
            || target.is_immune_to(snapshot.attack_type.tag())
        {
            tracing::trace!(%tower, %enemy, in_range, "engage target no longer eligible");
            return;
        }

        let Some(archetype) = self.catalog.tower(&snapshot.kind) else {
            let error = ConfigError::UnknownTowerKind(snapshot.kind.to_string());
            self.deactivate(tower, error, out_events);
            return;
        };
        let mut specs = Vec::new();
        let context = AttackContext {
            tower: &snapshot,
            stats: &stats,
            target: &target,
            difficulty: self.difficulty,
        };
        if let Err(error) = archetype.attack(&context, &mut specs) {
            self.deactivate(tower, error, out_events);
            return;
        }

        let factor = self.modifiers(EntityRef::Tower(tower)).attack_period_factor;
        let period = (stats.attack_period as f32 * factor).ceil().max(1.0) as u32;
        if let Some(state) = self.towers.get_mut(tower) {
            state.cooldown = period;
        }
        tracing::trace!(%tower, %enemy, projectiles = specs.len(), period, "tower engaged");
        out_events.push(Event::TowerEngaged { tower, enemy });

        for mut spec in specs {
            spec.source = Some(tower);
            let _ = self.spawn_projectile(spec, out_events);
        }
    }

    /// Starts casting the tower's ability after charging its cost.
    pub(crate) fn activate_ability(&mut self, tower: TowerId, out_events: &mut Vec<Event>) {
        let Some(state) = self.towers.get(tower) else {
            reject_ability(tower, RejectionReason::MissingTower, out_events);
            return;
        };
        if !state.active {
            reject_ability(tower, RejectionReason::Inactive, out_events);
            return;
        }
        let Some(spec) = self
            .catalog
            .tower(&state.kind)
            .and_then(|archetype| archetype.ability(state.tier))
        else {
            reject_ability(tower, RejectionReason::NoAbility, out_events);
            return;
        };
        if state.ability != AbilityPhase::Idle {
            reject_ability(tower, RejectionReason::Busy, out_events);
            return;
        }
        if let Err(reason) = self.spend(spec.cost, out_events) {
            reject_ability(tower, reason, out_events);
            return;
        }

        if let Some(state) = self.towers.get_mut(tower) {
            state.ability = AbilityPhase::Casting {
                remaining: spec.cast_ticks,
            };
        }
        tracing::debug!(%tower, cast_ticks = spec.cast_ticks, "ability cast started");
        out_events.push(Event::AbilityCast { tower });
    }

    /// Clears a cast in progress without resolving it. The cost is not
    /// refunded.
    pub(crate) fn cancel_ability(&mut self, tower: TowerId, out_events: &mut Vec<Event>) {
        let Some(state) = self.towers.get_mut(tower) else {
            tracing::trace!(%tower, "cancel ignored for missing tower");
            return;
        };
        if !matches!(state.ability, AbilityPhase::Casting { .. }) {
            tracing::trace!(%tower, ability = ?state.ability, "cancel ignored, not casting");
            return;
        }
        state.ability = AbilityPhase::Idle;
        tracing::debug!(%tower, "ability cast cancelled");
        out_events.push(Event::AbilityCancelled { tower });
    }

    /// Counts down attack cooldowns and ability timers, resolving casts that
    /// complete this tick.
    pub(crate) fn advance_tower_timers(&mut self, out_events: &mut Vec<Event>) {
        for id in self.towers.ids() {
            let Some(state) = self.towers.get_mut(id) else {
                continue;
            };
            state.cooldown = state.cooldown.saturating_sub(1);
            let phase = state.ability;
            match phase {
                AbilityPhase::Idle => {}
                AbilityPhase::Casting { remaining } if remaining > 1 => {
                    state.ability = AbilityPhase::Casting {
                        remaining: remaining - 1,
                    };
                }
                AbilityPhase::Casting { .. } => self.resolve_ability(id, out_events),
                AbilityPhase::Cooling { remaining } => {
                    state.ability = if remaining > 1 {
                        AbilityPhase::Cooling {
                            remaining: remaining - 1,
                        }
                    } else {
                        AbilityPhase::Idle
                    };
                }
            }
        }
    }

    fn resolve_ability(&mut self, tower: TowerId, out_events: &mut Vec<Event>) {
        let Some(state) = self.towers.get(tower) else {
            return;
        };
        let snapshot = self.tower_snapshot(state);
        let mut commands = Vec::new();
        let mut cooldown = 0;
        if let Some(archetype) = self.catalog.tower(&snapshot.kind) {
            cooldown = archetype
                .ability(snapshot.tier)
                .map_or(0, |spec| spec.cooldown_ticks);
            let context = AbilityContext {
                world: self,
                tower: &snapshot,
            };
            archetype.resolve_ability(&context, &mut commands);
        }
        self.pending.extend(commands);

        if let Some(state) = self.towers.get_mut(tower) {
            state.ability = if cooldown > 0 {
                AbilityPhase::Cooling {
                    remaining: cooldown,
                }
            } else {
                AbilityPhase::Idle
            };
        }
        tracing::debug!(%tower, cooldown, "ability resolved");
        out_events.push(Event::AbilityResolved { tower });
    }

    /// Completes the current round, running every active tower's round end
    /// hook against the same world state.
    pub(crate) fn end_round(&mut self, out_events: &mut Vec<Event>) {
        let round = self.round;
        tracing::debug!(round, gold = self.gold, "round ended");
        out_events.push(Event::RoundEnded { round });

        let mut commands = Vec::new();
        for id in self.towers.ids() {
            let Some(state) = self.towers.get(id) else {
                continue;
            };
            if !state.active {
                continue;
            }
            if let Some(hook) = self.hooks.single(HookEvent::RoundEnd, state.kind.tag()) {
                hook(&HookContext::new(self, EntityRef::Tower(id)), &mut commands);
            }
        }
        self.pending.extend(commands);
        self.round = round.saturating_add(1);
    }

    pub(crate) fn tower_snapshot(&self, tower: &Tower) -> TowerSnapshot {
        let modifiers = self.modifiers(EntityRef::Tower(tower.id));
        let channeled = self
            .catalog
            .tower(&tower.kind)
            .and_then(|archetype| archetype.ability(tower.tier))
            .is_some_and(|spec| spec.channeled);
        TowerSnapshot {
            id: tower.id,
            kind: tower.kind.clone(),
            position: tower.position,
            tier: tower.tier,
            range: tower.stats.range * modifiers.range_factor,
            attack_type: tower.stats.attack_type.clone(),
            camo_detection: tower.stats.camo_detection || modifiers.detection,
            preference: tower.stats.preference,
            active: tower.active,
            disabled: modifiers.disabled,
            cooldown: tower.cooldown,
            ability: tower.ability,
            channeled,
            counters: tower.counters.clone(),
        }
    }
}

fn reject_purchase(kind: TowerKind, reason: RejectionReason, out_events: &mut Vec<Event>) {
    tracing::warn!(%kind, ?reason, "tower purchase rejected");
    out_events.push(Event::PurchaseRejected { kind, reason });
}

fn reject_upgrade(tower: TowerId, reason: RejectionReason, out_events: &mut Vec<Event>) {
    tracing::warn!(%tower, ?reason, "tower upgrade rejected");
    out_events.push(Event::UpgradeRejected { tower, reason });
}

fn reject_ability(tower: TowerId, reason: RejectionReason, out_events: &mut Vec<Event>) {
    tracing::warn!(%tower, ?reason, "ability activation rejected");
    out_events.push(Event::AbilityRejected { tower, reason });
}
