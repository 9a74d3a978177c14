//! Enemy lifecycle: spawning onto the track, movement, and leaking.

use std::collections::BTreeMap;

use rampart_core::{
    ConfigError, EnemyId, EnemyKind, EnemySnapshot, EnemyStats, EntityRef, Event, StatusId,
    StatusKind, WorldPoint,
};

use crate::{
    hooks::{HookContext, HookEvent},
    report_config_error, World,
};

/// Enemy stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct Enemy {
    pub(crate) id: EnemyId,
    pub(crate) kind: EnemyKind,
    /// Distance travelled along the track.
    pub(crate) progress: f32,
    pub(crate) position: WorldPoint,
    /// Statistics resolved for the difficulty at spawn time.
    pub(crate) stats: EnemyStats,
    pub(crate) hp: f32,
    pub(crate) statuses: BTreeMap<StatusKind, StatusId>,
    /// One accumulator per periodic hook registered for the kind.
    pub(crate) period_counters: Vec<u32>,
    /// Set on death or leak; the enemy is removed at the next cleanup.
    pub(crate) expired: bool,
}

impl World {
    /// Creates an enemy of `kind` at `progress` along the track and runs its
    /// spawn hook.
    pub(crate) fn spawn_enemy(
        &mut self,
        kind: &EnemyKind,
        progress: f32,
        out_events: &mut Vec<Event>,
    ) -> Option<EnemyId> {
        let Some(archetype) = self.catalog.enemy(kind) else {
            report_config_error(ConfigError::UnknownEnemyKind(kind.to_string()), out_events);
            return None;
        };
        let stats = archetype.stat_block().resolve(self.difficulty);
        let progress = progress.max(0.0);
        let position = self.config.track.point_at(progress);

        let id = self.enemies.create(|id| Enemy {
            id,
            kind: kind.clone(),
            progress,
            position,
            hp: stats.max_hp,
            stats,
            statuses: BTreeMap::new(),
            period_counters: Vec::new(),
            expired: false,
        });
        tracing::debug!(enemy = %id, %kind, progress, alive = self.enemies.len(), "enemy spawned");
        out_events.push(Event::EnemySpawned {
            enemy: id,
            kind: kind.clone(),
            position,
        });

        if let Some(hook) = self.hooks.single(HookEvent::Spawn, kind.tag()) {
            let mut commands = Vec::new();
            hook(&HookContext::new(self, EntityRef::Enemy(id)), &mut commands);
            self.pending.extend(commands);
        }
        Some(id)
    }

    /// Moves every living enemy along the track. Enemies reaching the end
    /// leak: they expire and damage the player.
    pub(crate) fn advance_enemies(&mut self, out_events: &mut Vec<Event>) {
        let length = self.config.track.length();
        for id in self.enemies.ids() {
            let modifiers = self.modifiers(EntityRef::Enemy(id));
            let Some(enemy) = self.enemies.get_mut(id) else {
                continue;
            };
            if enemy.expired || modifiers.disabled {
                continue;
            }

            enemy.progress += enemy.stats.speed * modifiers.speed_factor;
            enemy.position = self.config.track.point_at(enemy.progress);
            if enemy.progress < length {
                continue;
            }

            enemy.expired = true;
            let damage = enemy.stats.goal_damage;
            self.damage_player(id, damage, out_events);
        }
    }

    pub(crate) fn enemy_snapshot(&self, enemy: &Enemy) -> EnemySnapshot {
        EnemySnapshot {
            id: enemy.id,
            kind: enemy.kind.clone(),
            position: enemy.position,
            progress: enemy.progress,
            hp: enemy.hp,
            max_hp: enemy.stats.max_hp,
            size: enemy.stats.size,
            camouflaged: enemy.stats.camouflaged,
            immunities: self.effective_immunities(EntityRef::Enemy(enemy.id)),
            expired: enemy.expired,
        }
    }
}
