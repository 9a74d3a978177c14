//! Status effect engine: application under per-kind stacking policies,
//! immunity checks, periodic payloads, and expiry.

use std::collections::{BTreeMap, BTreeSet};

use rampart_core::{
    Command, ConfigError, EntityRef, Event, Modifier, Modifiers, PeriodicPayload, StackingPolicy,
    StatusApplication, StatusDuration, StatusId, StatusKind, StatusOutcome, StatusSnapshot, Tag,
    TowerId,
};

use crate::{hooks::HookContext, report_config_error, World};

/// Active status effect owned by an enemy or a tower.
#[derive(Clone, Debug)]
pub(crate) struct StatusEffect {
    pub(crate) owner: EntityRef,
    pub(crate) kind: StatusKind,
    pub(crate) potency: f32,
    pub(crate) stacks: u32,
    pub(crate) duration: StatusDuration,
    pub(crate) accumulator: u32,
    pub(crate) source: Option<TowerId>,
}

impl StatusEffect {
    pub(crate) fn new(owner: EntityRef, application: StatusApplication) -> Self {
        Self {
            owner,
            kind: application.kind,
            potency: application.potency,
            stacks: 1,
            duration: application.duration,
            accumulator: 0,
            source: application.source,
        }
    }

    pub(crate) fn snapshot(&self, id: StatusId) -> StatusSnapshot {
        StatusSnapshot {
            id,
            owner: self.owner,
            kind: self.kind.clone(),
            potency: self.potency,
            stacks: self.stacks,
            duration: self.duration,
            source: self.source,
        }
    }

    /// Folds a repeated application into the existing effect.
    fn merge(
        &mut self,
        id: StatusId,
        policy: StackingPolicy,
        modifier: Modifier,
        application: StatusApplication,
    ) -> StatusOutcome {
        match policy {
            StackingPolicy::ReplaceIfStronger => {
                if modifier.strength(application.potency) > modifier.strength(self.potency) {
                    self.potency = application.potency;
                    self.duration = application.duration;
                    self.source = application.source;
                    self.stacks = 1;
                    StatusOutcome::Replaced(id)
                } else {
                    StatusOutcome::Ignored
                }
            }
            StackingPolicy::RefreshDuration => {
                self.duration = application.duration;
                StatusOutcome::Refreshed(id)
            }
            StackingPolicy::AdditiveStack { max_stacks } => {
                self.duration = self.duration.max(application.duration);
                if self.stacks < max_stacks {
                    self.potency += application.potency;
                    self.stacks += 1;
                    StatusOutcome::Stacked(id)
                } else {
                    StatusOutcome::Refreshed(id)
                }
            }
            StackingPolicy::IgnoreIfPresent => StatusOutcome::Ignored,
        }
    }

    /// Counts down one tick, reporting whether the effect ran out.
    fn elapse(&mut self) -> bool {
        match &mut self.duration {
            StatusDuration::Ticks(remaining) => {
                *remaining = remaining.saturating_sub(1);
                *remaining == 0
            }
            StatusDuration::Persistent => false,
        }
    }
}

impl World {
    fn status_map(&self, target: EntityRef) -> Option<&BTreeMap<StatusKind, StatusId>> {
        match target {
            EntityRef::Enemy(id) => self.enemies.get(id).map(|enemy| &enemy.statuses),
            EntityRef::Tower(id) => self.towers.get(id).map(|tower| &tower.statuses),
        }
    }

    fn status_map_mut(&mut self, target: EntityRef) -> Option<&mut BTreeMap<StatusKind, StatusId>> {
        match target {
            EntityRef::Enemy(id) => self.enemies.get_mut(id).map(|enemy| &mut enemy.statuses),
            EntityRef::Tower(id) => self.towers.get_mut(id).map(|tower| &mut tower.statuses),
        }
    }

    /// Identifiers of the statuses carried by an entity, ordered by kind.
    pub(crate) fn status_ids(&self, target: EntityRef) -> Vec<StatusId> {
        self.status_map(target)
            .map(|statuses| statuses.values().copied().collect())
            .unwrap_or_default()
    }

    fn is_alive(&self, target: EntityRef) -> bool {
        match target {
            EntityRef::Enemy(id) => self.enemies.get(id).is_some_and(|enemy| !enemy.expired),
            EntityRef::Tower(id) => self.towers.contains(id),
        }
    }

    /// Applies a status, resolving repeats through the kind's stacking policy.
    pub(crate) fn set_status(
        &mut self,
        target: EntityRef,
        application: StatusApplication,
        out_events: &mut Vec<Event>,
    ) -> StatusOutcome {
        let Some((policy, modifier)) = self
            .catalog
            .status(&application.kind)
            .map(|prototype| (prototype.policy, prototype.modifier))
        else {
            report_config_error(
                ConfigError::UnknownStatusKind(application.kind.to_string()),
                out_events,
            );
            return StatusOutcome::Unknown;
        };

        if !self.is_alive(target) {
            tracing::trace!(%target, kind = %application.kind, "status target is gone");
            return StatusOutcome::Stale;
        }

        if self.is_immune_to(target, application.kind.tag()) {
            tracing::trace!(%target, kind = %application.kind, "status rejected by immunity");
            return StatusOutcome::Immune;
        }

        let kind = application.kind.clone();
        let existing = self
            .status_map(target)
            .and_then(|statuses| statuses.get(&kind).copied());
        if let Some(id) = existing {
            if let Some(effect) = self.statuses.get_mut(id) {
                let outcome = effect.merge(id, policy, modifier, application);
                if let Some(status) = outcome.status() {
                    out_events.push(Event::StatusRefreshed {
                        target,
                        status,
                        kind,
                    });
                }
                return outcome;
            }
        }

        let id = self
            .statuses
            .create(|_| StatusEffect::new(target, application));
        if let Some(statuses) = self.status_map_mut(target) {
            let _ = statuses.insert(kind.clone(), id);
        }
        out_events.push(Event::StatusApplied {
            target,
            status: id,
            kind,
        });
        StatusOutcome::Applied(id)
    }

    /// Removes the status of `kind` from an entity, reporting whether one
    /// was present.
    pub(crate) fn remove_status(
        &mut self,
        target: EntityRef,
        kind: &StatusKind,
        out_events: &mut Vec<Event>,
    ) -> bool {
        let Some(id) = self
            .status_map_mut(target)
            .and_then(|statuses| statuses.remove(kind))
        else {
            return false;
        };
        let _ = self.statuses.remove(id);
        out_events.push(Event::StatusRemoved {
            target,
            kind: kind.clone(),
        });
        true
    }

    /// Runs one tick of every status on the entity: periodic payloads fire
    /// when their accumulator fills, independent of expiry, then durations
    /// count down and finished effects are dropped.
    fn advance_statuses(&mut self, target: EntityRef, out_events: &mut Vec<Event>) {
        for id in self.status_ids(target) {
            let Some(effect) = self.statuses.get_mut(id) else {
                continue;
            };
            let periodic = self
                .catalog
                .status(&effect.kind)
                .and_then(|prototype| prototype.periodic.clone());

            if let Some(periodic) = periodic {
                effect.accumulator = effect.accumulator.saturating_add(1);
                if effect.accumulator >= periodic.every.max(1) {
                    effect.accumulator = 0;
                    if let Some(command) =
                        periodic_command(target, &periodic.payload, effect.potency, effect.source)
                    {
                        self.pending.push_back(command);
                    }
                }
            }

            if !effect.elapse() {
                continue;
            }
            let kind = effect.kind.clone();
            let _ = self.statuses.remove(id);
            if let Some(statuses) = self.status_map_mut(target) {
                let _ = statuses.remove(&kind);
            }
            out_events.push(Event::StatusExpired { target, kind });
        }
    }

    /// Status pass over every living enemy, including their periodic hooks.
    pub(crate) fn advance_enemy_statuses(&mut self, out_events: &mut Vec<Event>) {
        for id in self.enemies.ids() {
            if !self.is_alive(EntityRef::Enemy(id)) {
                continue;
            }
            self.advance_statuses(EntityRef::Enemy(id), out_events);
            self.run_period_hooks(id);
        }
    }

    /// Status pass over every tower.
    pub(crate) fn advance_tower_statuses(&mut self, out_events: &mut Vec<Event>) {
        for id in self.towers.ids() {
            self.advance_statuses(EntityRef::Tower(id), out_events);
        }
    }

    fn run_period_hooks(&mut self, id: rampart_core::EnemyId) {
        let Some(enemy) = self.enemies.get_mut(id) else {
            return;
        };
        let hooks = self.hooks.periodic(enemy.kind.tag());
        if hooks.is_empty() {
            return;
        }

        enemy.period_counters.resize(hooks.len(), 0);
        let mut due = Vec::new();
        for (counter, hook) in enemy.period_counters.iter_mut().zip(hooks) {
            *counter = counter.saturating_add(1);
            if *counter >= hook.every {
                *counter = 0;
                due.push(hook.run);
            }
        }

        let mut commands = Vec::new();
        let context = HookContext::new(self, EntityRef::Enemy(id));
        for run in due {
            run(&context, &mut commands);
        }
        self.pending.extend(commands);
    }

    fn granted_immunities(&self, target: EntityRef) -> impl Iterator<Item = &Tag> {
        self.status_map(target)
            .into_iter()
            .flat_map(|statuses| statuses.keys())
            .filter_map(|kind| self.catalog.status(kind))
            .flat_map(|prototype| prototype.grants_immunity.iter())
    }

    /// Reports whether the entity ignores effects carrying `tag`, through
    /// either static immunities or an active status.
    pub(crate) fn is_immune_to(&self, target: EntityRef, tag: &Tag) -> bool {
        let innate = match target {
            EntityRef::Enemy(id) => self
                .enemies
                .get(id)
                .is_some_and(|enemy| enemy.stats.immunities.contains(tag)),
            EntityRef::Tower(_) => false,
        };
        innate || self.granted_immunities(target).any(|granted| granted == tag)
    }

    /// Static and status-granted immunities of an entity.
    pub(crate) fn effective_immunities(&self, target: EntityRef) -> BTreeSet<Tag> {
        let mut tags: BTreeSet<Tag> = match target {
            EntityRef::Enemy(id) => self
                .enemies
                .get(id)
                .map(|enemy| enemy.stats.immunities.clone())
                .unwrap_or_default(),
            EntityRef::Tower(_) => BTreeSet::new(),
        };
        tags.extend(self.granted_immunities(target).cloned());
        tags
    }

    /// Multiplicative aggregate of every active status modifier.
    pub(crate) fn modifiers(&self, target: EntityRef) -> Modifiers {
        let mut modifiers = Modifiers::default();
        for id in self.status_ids(target) {
            let Some(effect) = self.statuses.get(id) else {
                continue;
            };
            if let Some(prototype) = self.catalog.status(&effect.kind) {
                modifiers.absorb(prototype.modifier, effect.potency);
            }
        }
        modifiers
    }
}

fn periodic_command(
    target: EntityRef,
    payload: &PeriodicPayload,
    potency: f32,
    source: Option<TowerId>,
) -> Option<Command> {
    match (payload, target) {
        (PeriodicPayload::Damage { attack_type }, EntityRef::Enemy(enemy)) => {
            Some(Command::ChangeHp {
                enemy,
                delta: -potency,
                attack_type: Some(attack_type.clone()),
                source,
            })
        }
        (PeriodicPayload::Heal, EntityRef::Enemy(enemy)) => Some(Command::ChangeHp {
            enemy,
            delta: potency,
            attack_type: None,
            source: None,
        }),
        (PeriodicPayload::Gold, EntityRef::Tower(tower)) => Some(Command::GrantGold {
            amount: gold_amount(potency),
            source: Some(tower),
        }),
        (PeriodicPayload::Gold, EntityRef::Enemy(_)) => Some(Command::GrantGold {
            amount: gold_amount(potency),
            source,
        }),
        (PeriodicPayload::Damage { .. } | PeriodicPayload::Heal, EntityRef::Tower(tower)) => {
            tracing::trace!(%tower, "hit point payload ignored on tower");
            None
        }
    }
}

fn gold_amount(potency: f32) -> u32 {
    potency.round().max(0.0) as u32
}

#[cfg(test)]
mod tests {
    use rampart_core::{Command, EntityRef, Event, StatusApplication, StatusDuration, StatusOutcome};

    use crate::{apply, query, test_content as content};

    fn spawn_grunt(world: &mut crate::World) -> rampart_core::EnemyId {
        let mut events = Vec::new();
        apply(
            world,
            Command::SpawnEnemy {
                kind: content::GRUNT,
                progress: 0.0,
            },
            &mut events,
        );
        query::enemy_view(world)
            .iter()
            .last()
            .map(|enemy| enemy.id)
            .expect("spawned enemy")
    }

    fn apply_status(
        world: &mut crate::World,
        target: EntityRef,
        application: StatusApplication,
    ) -> StatusOutcome {
        let mut events = Vec::new();
        world.set_status(target, application, &mut events)
    }

    #[test]
    fn refresh_duration_takes_latest_duration_not_sum() {
        let mut world = content::world();
        let enemy = EntityRef::Enemy(spawn_grunt(&mut world));

        let first = apply_status(
            &mut world,
            enemy,
            StatusApplication::timed(content::STUN, 1.0, 40),
        );
        let second = apply_status(
            &mut world,
            enemy,
            StatusApplication::timed(content::STUN, 1.0, 15),
        );

        let id = first.status().expect("applied");
        assert_eq!(second, StatusOutcome::Refreshed(id));
        let statuses = query::statuses(&world, enemy);
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].duration, StatusDuration::Ticks(15));
    }

    #[test]
    fn replace_if_stronger_keeps_the_stronger_slow() {
        let mut world = content::world();
        let enemy = EntityRef::Enemy(spawn_grunt(&mut world));

        let id = apply_status(
            &mut world,
            enemy,
            StatusApplication::timed(content::SLOW, 0.5, 30),
        )
        .status()
        .expect("applied");
        assert_eq!(
            apply_status(
                &mut world,
                enemy,
                StatusApplication::timed(content::SLOW, 0.8, 90)
            ),
            StatusOutcome::Ignored
        );
        assert_eq!(
            apply_status(
                &mut world,
                enemy,
                StatusApplication::timed(content::SLOW, 0.25, 10)
            ),
            StatusOutcome::Replaced(id)
        );
        assert_eq!(query::modifiers(&world, enemy).speed_factor, 0.25);
    }

    #[test]
    fn additive_stack_caps_at_max_stacks() {
        let mut world = content::world();
        let enemy = EntityRef::Enemy(spawn_grunt(&mut world));

        for _ in 0..5 {
            let _ = apply_status(
                &mut world,
                enemy,
                StatusApplication::timed(content::POISON, 2.0, 50),
            );
        }

        let statuses = query::statuses(&world, enemy);
        assert_eq!(statuses[0].stacks, 3);
        assert_eq!(statuses[0].potency, 6.0);
    }

    #[test]
    fn ignore_if_present_leaves_first_application() {
        let mut world = content::world();
        let enemy = EntityRef::Enemy(spawn_grunt(&mut world));

        let _ = apply_status(
            &mut world,
            enemy,
            StatusApplication::persistent(content::REGEN, 1.0),
        );
        assert_eq!(
            apply_status(
                &mut world,
                enemy,
                StatusApplication::persistent(content::REGEN, 9.0)
            ),
            StatusOutcome::Ignored
        );
        assert_eq!(query::statuses(&world, enemy)[0].potency, 1.0);
    }

    #[test]
    fn granted_immunity_blocks_status_kind() {
        let mut world = content::world();
        let enemy = EntityRef::Enemy(spawn_grunt(&mut world));

        let _ = apply_status(
            &mut world,
            enemy,
            StatusApplication::timed(content::WARD, 1.0, 100),
        );
        assert!(query::is_immune_to(&world, enemy, content::POISON.tag()));
        assert_eq!(
            apply_status(
                &mut world,
                enemy,
                StatusApplication::timed(content::POISON, 2.0, 50)
            ),
            StatusOutcome::Immune
        );
    }

    #[test]
    fn unknown_status_kind_is_reported() {
        let mut world = content::world();
        let enemy = EntityRef::Enemy(spawn_grunt(&mut world));
        let mut events = Vec::new();

        let outcome = world.set_status(
            enemy,
            StatusApplication::timed(rampart_core::StatusKind::new("mystery"), 1.0, 5),
            &mut events,
        );

        assert_eq!(outcome, StatusOutcome::Unknown);
        assert!(matches!(
            events.as_slice(),
            [Event::ConfigurationError { .. }]
        ));
    }

    #[test]
    fn periodic_payload_fires_on_the_expiring_tick() {
        let mut world = content::world();
        let id = spawn_grunt(&mut world);
        let enemy = EntityRef::Enemy(id);
        let _ = apply_status(
            &mut world,
            enemy,
            StatusApplication::timed(content::POISON, 3.0, content::POISON_PERIOD),
        );

        let mut events = Vec::new();
        for _ in 0..content::POISON_PERIOD {
            apply(&mut world, Command::Tick, &mut events);
        }

        assert!(events
            .iter()
            .any(|event| matches!(event, Event::StatusExpired { .. })));
        let damage: f32 = events
            .iter()
            .filter_map(|event| match event {
                Event::DamageDealt { amount, .. } => Some(*amount),
                _ => None,
            })
            .sum();
        assert_eq!(damage, 3.0);
        assert!(query::statuses(&world, enemy).is_empty());
    }

    #[test]
    fn persistent_status_never_expires() {
        let mut world = content::world();
        let enemy = EntityRef::Enemy(spawn_grunt(&mut world));
        let _ = apply_status(
            &mut world,
            enemy,
            StatusApplication::persistent(content::WARD, 1.0),
        );

        let mut events = Vec::new();
        for _ in 0..200 {
            apply(&mut world, Command::Tick, &mut events);
        }
        assert_eq!(query::statuses(&world, enemy).len(), 1);
    }

    #[test]
    fn removed_status_emits_event_once() {
        let mut world = content::world();
        let enemy = EntityRef::Enemy(spawn_grunt(&mut world));
        let _ = apply_status(
            &mut world,
            enemy,
            StatusApplication::timed(content::SLOW, 0.5, 30),
        );

        let mut events = Vec::new();
        assert!(world.remove_status(enemy, &content::SLOW, &mut events));
        assert!(!world.remove_status(enemy, &content::SLOW, &mut events));
        assert_eq!(events.len(), 1);
        assert_eq!(query::modifiers(&world, enemy).speed_factor, 1.0);
    }
}
