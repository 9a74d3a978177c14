//! Projectile flight and collision resolution.

use std::collections::BTreeSet;

use rampart_core::{
    AttackType, Discipline, EnemyId, EntityRef, Event, ExpireEffect, HitPayload, ProjectileId,
    ProjectileSnapshot, ProjectileSpec, TowerId, Velocity, WorldPoint,
};

use crate::World;

/// Projectile stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct Projectile {
    pub(crate) id: ProjectileId,
    pub(crate) position: WorldPoint,
    pub(crate) velocity: Velocity,
    pub(crate) discipline: Discipline,
    pub(crate) pierce: u32,
    pub(crate) radius: f32,
    pub(crate) lifetime: u32,
    pub(crate) attack_type: AttackType,
    pub(crate) camo_detection: bool,
    /// Enemies already hit; never hit twice.
    pub(crate) collided: BTreeSet<EnemyId>,
    pub(crate) on_collide: HitPayload,
    pub(crate) on_expire: ExpireEffect,
    pub(crate) source: Option<TowerId>,
    pub(crate) expired: bool,
}

impl Projectile {
    fn new(id: ProjectileId, spec: ProjectileSpec) -> Self {
        Self {
            id,
            position: spec.origin,
            velocity: spec.velocity,
            discipline: spec.discipline,
            pierce: spec.pierce,
            radius: spec.radius,
            lifetime: spec.lifetime,
            attack_type: spec.attack_type,
            camo_detection: spec.camo_detection,
            collided: BTreeSet::new(),
            on_collide: spec.on_collide,
            on_expire: spec.on_expire,
            source: spec.source,
            expired: false,
        }
    }

    pub(crate) fn snapshot(&self) -> ProjectileSnapshot {
        ProjectileSnapshot {
            id: self.id,
            position: self.position,
            discipline: self.discipline,
            pierce: self.pierce,
            lifetime: self.lifetime,
            collided: self.collided.clone(),
            expired: self.expired,
        }
    }

    /// Moves one step, homing on `homing` when provided, and burns one tick
    /// of lifetime.
    fn advance(&mut self, homing: Option<WorldPoint>) {
        let step = self.velocity.speed();
        match (self.discipline, homing) {
            (Discipline::Target(_), Some(target)) => {
                if self.position.distance(target) <= step {
                    self.position = target;
                } else {
                    self.velocity = Velocity::toward(self.position, target, step);
                    self.position = self.position.offset(self.velocity);
                }
            }
            (Discipline::Destinated(destination), _) => {
                if self.position.distance(destination) <= step {
                    self.position = destination;
                    self.expired = true;
                } else {
                    self.position = self.position.offset(self.velocity);
                }
            }
            _ => self.position = self.position.offset(self.velocity),
        }

        self.lifetime = self.lifetime.saturating_sub(1);
        if self.lifetime == 0 {
            self.expired = true;
        }
    }
}

/// Copy of the projectile fields a collision scan reads.
struct Probe {
    id: ProjectileId,
    position: WorldPoint,
    radius: f32,
    attack_type: AttackType,
    camo_detection: bool,
    source: Option<TowerId>,
}

impl World {
    pub(crate) fn spawn_projectile(
        &mut self,
        spec: ProjectileSpec,
        out_events: &mut Vec<Event>,
    ) -> ProjectileId {
        let source = spec.source;
        let id = self.projectiles.create(|id| Projectile::new(id, spec));
        tracing::trace!(projectile = %id, ?source, "projectile fired");
        out_events.push(Event::ProjectileFired {
            projectile: id,
            source,
        });
        id
    }

    /// Moves every live projectile, resolves its collisions, and fires the
    /// expiry effect of those that finished this tick.
    pub(crate) fn resolve_projectiles(&mut self, out_events: &mut Vec<Event>) {
        for id in self.projectiles.ids() {
            let Some(projectile) = self.projectiles.get(id) else {
                continue;
            };
            if projectile.expired {
                continue;
            }
            let homing = match projectile.discipline {
                Discipline::Target(enemy) => self.live_position(enemy),
                Discipline::NonTarget | Discipline::Destinated(_) => None,
            };
            let Some(projectile) = self.projectiles.get_mut(id) else {
                continue;
            };
            projectile.advance(homing);
            let skip_dispatch = projectile.expired;
            let discipline = projectile.discipline;

            if !skip_dispatch {
                match discipline {
                    Discipline::NonTarget => self.collide_first(id, out_events),
                    Discipline::Target(enemy) => self.collide_target(id, enemy, out_events),
                    Discipline::Destinated(_) => self.collide_all(id, out_events),
                }
            }

            if self.projectiles.get(id).is_some_and(|projectile| projectile.expired) {
                self.expire_projectile(id, out_events);
            }
        }
    }

    fn live_position(&self, enemy: EnemyId) -> Option<WorldPoint> {
        self.enemies
            .get(enemy)
            .filter(|enemy| !enemy.expired)
            .map(|enemy| enemy.position)
    }

    fn probe(&self, id: ProjectileId) -> Option<Probe> {
        self.projectiles.get(id).map(|projectile| Probe {
            id,
            position: projectile.position,
            radius: projectile.radius,
            attack_type: projectile.attack_type.clone(),
            camo_detection: projectile.camo_detection,
            source: projectile.source,
        })
    }

    /// Reports whether a living enemy touches the circle and can be seen
    /// with the provided detection.
    fn touches(&self, enemy: EnemyId, center: WorldPoint, radius: f32, camo_detection: bool) -> bool {
        self.enemies.get(enemy).is_some_and(|enemy| {
            !enemy.expired
                && enemy.position.distance(center) <= radius + enemy.stats.size
                && (!enemy.stats.camouflaged || camo_detection)
        })
    }

    fn fresh_candidates(&self, probe: &Probe) -> Vec<EnemyId> {
        let collided = self
            .projectiles
            .get(probe.id)
            .map(|projectile| &projectile.collided);
        self.enemies
            .ids()
            .into_iter()
            .filter(|enemy| !collided.is_some_and(|collided| collided.contains(enemy)))
            .filter(|enemy| self.touches(*enemy, probe.position, probe.radius, probe.camo_detection))
            .collect()
    }

    /// Records the hit; returns false when the enemy absorbed it.
    fn record_hit(&mut self, probe: &Probe, enemy: EnemyId, out_events: &mut Vec<Event>) -> bool {
        if let Some(projectile) = self.projectiles.get_mut(probe.id) {
            let _ = projectile.collided.insert(enemy);
        }
        self.lands(probe, enemy, out_events)
    }

    /// Returns false and reports the absorption when the enemy is immune.
    fn lands(&self, probe: &Probe, enemy: EnemyId, out_events: &mut Vec<Event>) -> bool {
        if self.is_immune_to(EntityRef::Enemy(enemy), probe.attack_type.tag()) {
            out_events.push(Event::AttackAbsorbed {
                enemy,
                tag: probe.attack_type.tag().clone(),
            });
            return false;
        }
        true
    }

    fn spend_pierce(&mut self, id: ProjectileId) {
        if let Some(projectile) = self.projectiles.get_mut(id) {
            projectile.pierce = projectile.pierce.saturating_sub(1);
            if projectile.pierce == 0 {
                projectile.expired = true;
            }
        }
    }

    fn mark_expired(&mut self, id: ProjectileId) {
        if let Some(projectile) = self.projectiles.get_mut(id) {
            projectile.expired = true;
        }
    }

    /// At most one new hit per tick; an immune hit consumes the projectile.
    fn collide_first(&mut self, id: ProjectileId, out_events: &mut Vec<Event>) {
        let Some(probe) = self.probe(id) else {
            return;
        };
        let Some(enemy) = self.fresh_candidates(&probe).into_iter().next() else {
            return;
        };
        if !self.record_hit(&probe, enemy, out_events) {
            self.mark_expired(id);
            return;
        }
        self.deliver_collision(&probe, enemy, out_events);
        self.spend_pierce(id);
    }

    /// Only the fixed target can be hit, at most once per pass, and it may be
    /// hit again on later passes while pierce remains. A vanished target
    /// leaves the projectile flying until its lifetime runs out.
    fn collide_target(&mut self, id: ProjectileId, enemy: EnemyId, out_events: &mut Vec<Event>) {
        let Some(probe) = self.probe(id) else {
            return;
        };
        if self.live_position(enemy).is_none() {
            tracing::trace!(projectile = %id, %enemy, "projectile target is gone");
            return;
        }
        if !self.touches(enemy, probe.position, probe.radius, probe.camo_detection) {
            return;
        }
        if !self.lands(&probe, enemy, out_events) {
            self.mark_expired(id);
            return;
        }
        self.deliver_collision(&probe, enemy, out_events);
        self.spend_pierce(id);
    }

    /// Every touching enemy is recorded; payloads land while pierce remains.
    /// Neither immunity nor spent pierce expires the projectile.
    fn collide_all(&mut self, id: ProjectileId, out_events: &mut Vec<Event>) {
        let Some(probe) = self.probe(id) else {
            return;
        };
        for enemy in self.fresh_candidates(&probe) {
            if !self.touches(enemy, probe.position, probe.radius, probe.camo_detection) {
                continue;
            }
            if !self.record_hit(&probe, enemy, out_events) {
                continue;
            }
            let Some(projectile) = self.projectiles.get_mut(id) else {
                return;
            };
            if projectile.pierce == 0 {
                continue;
            }
            projectile.pierce -= 1;
            self.deliver_collision(&probe, enemy, out_events);
        }
    }

    fn deliver_collision(&mut self, probe: &Probe, enemy: EnemyId, out_events: &mut Vec<Event>) {
        let Some(payload) = self
            .projectiles
            .get(probe.id)
            .map(|projectile| projectile.on_collide.clone())
        else {
            return;
        };
        self.deliver(enemy, &payload, &probe.attack_type, probe.source, out_events);
    }

    fn deliver(
        &mut self,
        enemy: EnemyId,
        payload: &HitPayload,
        attack_type: &AttackType,
        source: Option<TowerId>,
        out_events: &mut Vec<Event>,
    ) {
        if payload.damage > 0.0 {
            let _ = self.change_hp(enemy, -payload.damage, Some(attack_type), source, out_events);
        }
        for application in &payload.statuses {
            let mut application = application.clone();
            if application.source.is_none() {
                application.source = source;
            }
            let _ = self.set_status(EntityRef::Enemy(enemy), application, out_events);
        }
    }

    /// Fires the expiry effect. Runs once per projectile since expired
    /// projectiles are skipped by later passes and removed at cleanup.
    fn expire_projectile(&mut self, id: ProjectileId, out_events: &mut Vec<Event>) {
        let Some(probe) = self.probe(id) else {
            return;
        };
        let effect = self
            .projectiles
            .get(id)
            .map(|projectile| projectile.on_expire.clone())
            .unwrap_or_default();

        if let ExpireEffect::Burst { radius, payload } = effect {
            let caught: Vec<EnemyId> = self
                .enemies
                .ids()
                .into_iter()
                .filter(|enemy| self.touches(*enemy, probe.position, radius, probe.camo_detection))
                .collect();
            tracing::trace!(projectile = %id, caught = caught.len(), "projectile burst");
            for enemy in caught {
                if self.is_immune_to(EntityRef::Enemy(enemy), probe.attack_type.tag()) {
                    out_events.push(Event::AttackAbsorbed {
                        enemy,
                        tag: probe.attack_type.tag().clone(),
                    });
                    continue;
                }
                self.deliver(enemy, &payload, &probe.attack_type, probe.source, out_events);
            }
        }
        out_events.push(Event::ProjectileExpired { projectile: id });
    }
}

#[cfg(test)]
mod tests {
    use rampart_core::{
        AttackType, Command, Discipline, EnemyId, EnemyKind, Event, ExpireEffect, HitPayload,
        ProjectileSpec, StatusApplication, Velocity, WorldPoint,
    };

    use crate::{apply, query, test_content as content, World};

    fn spawn(world: &mut World, kind: EnemyKind, progress: f32) -> EnemyId {
        let mut events = Vec::new();
        apply(world, Command::SpawnEnemy { kind, progress }, &mut events);
        events
            .iter()
            .find_map(|event| match event {
                Event::EnemySpawned { enemy, .. } => Some(*enemy),
                _ => None,
            })
            .expect("spawned")
    }

    fn bolt(origin: WorldPoint, discipline: Discipline, pierce: u32, damage: f32) -> ProjectileSpec {
        let mut spec = ProjectileSpec::aimed(
            origin,
            origin,
            0.0,
            discipline,
            AttackType::new(content::SHARP),
        );
        spec.pierce = pierce;
        spec.lifetime = 20;
        spec.on_collide = HitPayload {
            damage,
            statuses: Vec::new(),
        };
        spec
    }

    fn fire(world: &mut World, spec: ProjectileSpec) {
        let mut events = Vec::new();
        apply(world, Command::SpawnProjectile { spec }, &mut events);
    }

    fn resolve(world: &mut World) -> Vec<Event> {
        let mut events = Vec::new();
        apply(world, Command::ResolveProjectiles, &mut events);
        events
    }

    fn count(events: &[Event], predicate: impl Fn(&Event) -> bool) -> usize {
        events.iter().filter(|event| predicate(event)).count()
    }

    fn hits(events: &[Event]) -> usize {
        count(events, |event| matches!(event, Event::DamageDealt { .. }))
    }

    fn expirations(events: &[Event]) -> usize {
        count(events, |event| matches!(event, Event::ProjectileExpired { .. }))
    }

    #[test]
    fn nontarget_with_single_pierce_hits_one_enemy() {
        let mut world = content::world();
        let _ = spawn(&mut world, content::GRUNT, 100.0);
        let _ = spawn(&mut world, content::GRUNT, 101.0);
        fire(
            &mut world,
            bolt(WorldPoint::new(100.0, 0.0), Discipline::NonTarget, 1, 5.0),
        );

        let events = resolve(&mut world);

        assert_eq!(hits(&events), 1);
        assert_eq!(expirations(&events), 1);
        assert!(query::projectiles(&world).is_empty());
    }

    #[test]
    fn nontarget_pierce_hits_one_new_enemy_per_tick() {
        let mut world = content::world();
        for offset in 0..3 {
            let _ = spawn(&mut world, content::GRUNT, 100.0 + offset as f32);
        }
        fire(
            &mut world,
            bolt(WorldPoint::new(100.0, 0.0), Discipline::NonTarget, 2, 5.0),
        );

        let first = resolve(&mut world);
        assert_eq!(hits(&first), 1);
        assert_eq!(expirations(&first), 0);
        assert_eq!(query::projectiles(&world)[0].collided.len(), 1);

        let second = resolve(&mut world);
        assert_eq!(hits(&second), 1);
        assert_eq!(expirations(&second), 1);
    }

    #[test]
    fn nontarget_immune_hit_is_recorded_and_consumes_projectile() {
        let mut world = content::world();
        let golem = spawn(&mut world, content::GOLEM, 100.0);
        fire(
            &mut world,
            bolt(WorldPoint::new(100.0, 0.0), Discipline::NonTarget, 3, 5.0),
        );

        let mut events = Vec::new();
        world.resolve_projectiles(&mut events);

        let projectile = &query::projectiles(&world)[0];
        assert!(projectile.collided.contains(&golem));
        assert!(projectile.expired);
        assert_eq!(hits(&events), 0);
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::AttackAbsorbed { .. })));
        let golem = query::enemy(&world, golem).expect("alive");
        assert_eq!(golem.hp, golem.max_hp);
    }

    #[test]
    fn destinated_survives_immune_hits_until_arrival() {
        let mut world = content::world();
        let golem = spawn(&mut world, content::GOLEM, 140.0);
        let grunt = spawn(&mut world, content::GRUNT, 100.0);
        let mut spec = bolt(
            WorldPoint::new(100.0, 0.0),
            Discipline::Destinated(WorldPoint::new(200.0, 0.0)),
            5,
            5.0,
        );
        spec.velocity = Velocity::new(40.0, 0.0);
        fire(&mut world, spec);

        // (100,0) -> (140,0) -> (180,0) -> arrival at (200,0)
        let first = resolve(&mut world);
        assert_eq!(expirations(&first), 0);
        assert_eq!(
            count(&first, |event| matches!(
                event,
                Event::AttackAbsorbed { enemy, .. } if *enemy == golem
            )),
            1
        );
        let second = resolve(&mut world);
        assert_eq!(expirations(&second), 0);
        let third = resolve(&mut world);
        assert_eq!(expirations(&third), 1);

        assert!(query::projectiles(&world).is_empty());
        let grunt = query::enemy(&world, grunt).expect("alive");
        assert_eq!(grunt.hp, grunt.max_hp, "grunt was behind the first step");
    }

    #[test]
    fn destinated_payloads_stop_when_pierce_runs_out() {
        let mut world = content::world();
        for _ in 0..3 {
            let _ = spawn(&mut world, content::GRUNT, 100.0);
        }
        fire(
            &mut world,
            bolt(
                WorldPoint::new(100.0, 0.0),
                Discipline::Destinated(WorldPoint::new(100.0, 500.0)),
                2,
                5.0,
            ),
        );

        let mut events = Vec::new();
        world.resolve_projectiles(&mut events);

        assert_eq!(hits(&events), 2);
        let projectile = &query::projectiles(&world)[0];
        assert_eq!(projectile.collided.len(), 3);
        assert_eq!(projectile.pierce, 0);
        assert!(!projectile.expired);
    }

    #[test]
    fn target_projectile_waits_out_a_vanished_target() {
        let mut world = content::world();
        let target = spawn(&mut world, content::GRUNT, 300.0);
        let mut spec = bolt(
            WorldPoint::new(0.0, 0.0),
            Discipline::Target(target),
            1,
            5.0,
        );
        spec.velocity = Velocity::new(1.0, 0.0);
        spec.lifetime = 3;
        fire(&mut world, spec);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::ChangeHp {
                enemy: target,
                delta: -100.0,
                attack_type: None,
                source: None,
            },
            &mut events,
        );

        assert_eq!(expirations(&resolve(&mut world)), 0);
        assert_eq!(expirations(&resolve(&mut world)), 0);
        assert_eq!(expirations(&resolve(&mut world)), 1);
    }

    #[test]
    fn target_projectile_homes_and_hits_only_its_target() {
        let mut world = content::world();
        let bystander = spawn(&mut world, content::GRUNT, 10.0);
        let target = spawn(&mut world, content::GRUNT, 60.0);
        let mut spec = bolt(
            WorldPoint::new(0.0, 0.0),
            Discipline::Target(target),
            1,
            5.0,
        );
        spec.velocity = Velocity::new(0.0, 30.0);

        fire(&mut world, spec);
        let mut events = resolve(&mut world);
        events.extend(resolve(&mut world));

        let damaged: Vec<EnemyId> = events
            .iter()
            .filter_map(|event| match event {
                Event::DamageDealt { enemy, .. } => Some(*enemy),
                _ => None,
            })
            .collect();
        assert_eq!(damaged, vec![target]);
        let bystander = query::enemy(&world, bystander).expect("alive");
        assert_eq!(bystander.hp, bystander.max_hp);
    }

    #[test]
    fn target_projectile_spends_pierce_on_repeated_hits() {
        let mut world = content::world();
        let target = spawn(&mut world, content::GRUNT, 100.0);
        let mut spec = bolt(
            WorldPoint::new(100.0, 0.0),
            Discipline::Target(target),
            2,
            5.0,
        );
        spec.lifetime = 50;
        fire(&mut world, spec);

        let first = resolve(&mut world);
        assert_eq!(hits(&first), 1);
        assert_eq!(expirations(&first), 0);
        assert!(query::projectiles(&world)[0].collided.is_empty());

        let second = resolve(&mut world);
        assert_eq!(hits(&second), 1);
        assert_eq!(expirations(&second), 1);
        assert!(query::projectiles(&world).is_empty());
        let target = query::enemy(&world, target).expect("alive");
        assert_eq!(target.hp, target.max_hp - 10.0);
    }

    #[test]
    fn camouflage_requires_detection() {
        let mut world = content::world();
        let ghost = spawn(&mut world, content::GHOST, 100.0);
        fire(
            &mut world,
            bolt(WorldPoint::new(100.0, 0.0), Discipline::NonTarget, 1, 5.0),
        );
        assert_eq!(hits(&resolve(&mut world)), 0);

        let mut spec = bolt(WorldPoint::new(100.0, 0.0), Discipline::NonTarget, 1, 5.0);
        spec.camo_detection = true;
        fire(&mut world, spec);
        let events = resolve(&mut world);

        assert_eq!(hits(&events), 1);
        let ghost = query::enemy(&world, ghost).expect("alive");
        assert_eq!(ghost.hp, ghost.max_hp - 5.0);
    }

    #[test]
    fn killed_enemy_is_not_matched_again_in_the_same_pass() {
        let mut world = content::world();
        let grunt = spawn(&mut world, content::GRUNT, 100.0);
        fire(
            &mut world,
            bolt(WorldPoint::new(100.0, 0.0), Discipline::NonTarget, 1, 60.0),
        );
        fire(
            &mut world,
            bolt(WorldPoint::new(100.0, 0.0), Discipline::NonTarget, 1, 60.0),
        );

        let events = resolve(&mut world);

        assert_eq!(hits(&events), 1);
        assert_eq!(
            count(&events, |event| matches!(event, Event::EnemyKilled { .. })),
            1
        );
        assert!(query::enemy(&world, grunt).is_none());
        assert_eq!(query::projectiles(&world).len(), 1, "second bolt flies on");
    }

    #[test]
    fn burst_fires_once_on_expiry() {
        let mut world = content::world();
        let near = spawn(&mut world, content::GRUNT, 110.0);
        let far = spawn(&mut world, content::GRUNT, 400.0);
        let mut spec = bolt(WorldPoint::new(100.0, 0.0), Discipline::NonTarget, 1, 0.0);
        spec.radius = 0.0;
        spec.lifetime = 1;
        spec.on_expire = ExpireEffect::Burst {
            radius: 20.0,
            payload: HitPayload {
                damage: 7.0,
                statuses: vec![StatusApplication::timed(content::SLOW, 0.5, 30)],
            },
        };
        fire(&mut world, spec);

        let events = resolve(&mut world);
        let later = resolve(&mut world);

        assert_eq!(hits(&events), 1);
        assert_eq!(expirations(&events), 1);
        assert!(later.is_empty());
        assert_eq!(query::enemy(&world, near).expect("alive").hp, 33.0);
        assert_eq!(query::enemy(&world, far).expect("alive").hp, 40.0);
        assert_eq!(
            query::modifiers(&world, rampart_core::EntityRef::Enemy(near)).speed_factor,
            0.5
        );
    }
}
