#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for the Rampart combat engine.
//!
//! The world owns every entity through per-class registries and exposes a
//! single mutation entry point, [`apply`]. Commands produced while a pass is
//! running (hook callbacks, delayed work, ability resolutions) are queued and
//! applied once the pass completes, so no pass ever observes a collection it
//! is iterating change underneath it.

mod catalog;
mod damage;
mod enemies;
mod hooks;
mod projectiles;
mod registry;
mod scheduler;
pub mod snapshot;
mod status;
#[cfg(any(test, feature = "test_content"))]
pub mod test_content;
mod towers;

use std::collections::VecDeque;

use rampart_core::{
    Command, ConfigError, Difficulty, EnemyId, EntityRef, Event, ProjectileId, StatusId, Tick,
    Tiered, TowerId, Track,
};

pub use catalog::{AbilityContext, AttackContext, Catalog, EnemyArchetype, TowerArchetype};
pub use damage::{COUNTER_DAMAGE, COUNTER_GOLD, COUNTER_KILLS};
pub use hooks::{HookContext, HookEvent, HookFn, HookTable};

use enemies::Enemy;
use projectiles::Projectile;
use registry::Registry;
use scheduler::Scheduler;
use status::StatusEffect;
use towers::Tower;

const TOWER_ID_SEED: u32 = 1;
const ENEMY_ID_SEED: u32 = 100_000;
const PROJECTILE_ID_SEED: u32 = 1_000_000;
const STATUS_ID_SEED: u32 = 5_000_000;

const DEFAULT_CASCADE_LIMIT: usize = 10_000;

/// Configuration parameters that shape a game independent of content.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Path enemies follow from the entrance to the goal.
    pub track: Track,
    /// Gold available when a game starts.
    pub starting_gold: Tiered<u32>,
    /// Player hit points when a game starts.
    pub starting_hp: Tiered<u32>,
    /// Upper bound on queued commands applied by a single [`apply`] call.
    pub cascade_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            track: Track::default(),
            starting_gold: Tiered::new(850, 650, 500),
            starting_hp: Tiered::new(200, 150, 100),
            cascade_limit: DEFAULT_CASCADE_LIMIT,
        }
    }
}

/// Represents the authoritative Rampart world state.
#[derive(Debug)]
pub struct World {
    config: Config,
    catalog: Catalog,
    hooks: HookTable,
    difficulty: Difficulty,
    tick: Tick,
    round: u32,
    player_hp: u32,
    gold: u32,
    defeated: bool,
    enemies: Registry<EnemyId, Enemy>,
    towers: Registry<TowerId, Tower>,
    projectiles: Registry<ProjectileId, Projectile>,
    statuses: Registry<StatusId, StatusEffect>,
    scheduler: Scheduler,
    pending: VecDeque<Command>,
    cascade_budget: usize,
}

impl World {
    /// Creates a world at the default difficulty using the provided content.
    #[must_use]
    pub fn new(config: Config, catalog: Catalog, hooks: HookTable) -> Self {
        let difficulty = Difficulty::default();
        let mut world = Self {
            player_hp: config.starting_hp.get(difficulty),
            gold: config.starting_gold.get(difficulty),
            cascade_budget: config.cascade_limit,
            config,
            catalog,
            hooks,
            difficulty,
            tick: 0,
            round: 1,
            defeated: false,
            enemies: Registry::new(ENEMY_ID_SEED),
            towers: Registry::new(TOWER_ID_SEED),
            projectiles: Registry::new(PROJECTILE_ID_SEED),
            statuses: Registry::new(STATUS_ID_SEED),
            scheduler: Scheduler::new(),
            pending: VecDeque::new(),
        };
        world.reset(difficulty);
        world
    }

    fn reset(&mut self, difficulty: Difficulty) {
        self.difficulty = difficulty;
        self.tick = 0;
        self.round = 1;
        self.player_hp = self.config.starting_hp.get(difficulty);
        self.gold = self.config.starting_gold.get(difficulty);
        self.defeated = false;
        self.enemies.reset();
        self.towers.reset();
        self.projectiles.reset();
        self.statuses.reset();
        self.scheduler.reset();
        self.pending.clear();
    }

    fn execute(&mut self, command: Command, out_events: &mut Vec<Event>) {
        match command {
            Command::ResetGame { difficulty } => {
                self.reset(difficulty);
                tracing::debug!(?difficulty, "game reset");
                out_events.push(Event::GameReset { difficulty });
            }
            Command::Tick => self.advance_tick(out_events),
            Command::SpawnEnemy { kind, progress } => {
                let _ = self.spawn_enemy(&kind, progress, out_events);
            }
            Command::PlaceTower { kind, position } => {
                let _ = self.place_tower(kind, position, out_events);
            }
            Command::UpgradeTower { tower } => self.upgrade_tower(tower, out_events),
            Command::ActivateAbility { tower } => self.activate_ability(tower, out_events),
            Command::CancelAbility { tower } => self.cancel_ability(tower, out_events),
            Command::Engage { tower, enemy } => self.engage(tower, enemy, out_events),
            Command::ResolveProjectiles => {
                self.resolve_projectiles(out_events);
                self.flush_pending(out_events);
                self.cleanup();
            }
            Command::SpawnProjectile { spec } => {
                let _ = self.spawn_projectile(spec, out_events);
            }
            Command::ChangeHp {
                enemy,
                delta,
                attack_type,
                source,
            } => {
                let _ = self.change_hp(enemy, delta, attack_type.as_ref(), source, out_events);
            }
            Command::ApplyStatus {
                target,
                application,
            } => {
                let _ = self.set_status(target, application, out_events);
            }
            Command::RemoveStatus { target, kind } => {
                let _ = self.remove_status(target, &kind, out_events);
            }
            Command::GrantGold { amount, source } => self.grant_gold(amount, source, out_events),
            Command::AddCounter {
                tower,
                name,
                amount,
            } => self.add_counter(tower, &name, amount),
            Command::Schedule {
                delay,
                interval,
                repeat,
                action,
            } => {
                let work = self.scheduler.schedule(delay, interval, repeat, *action);
                tracing::trace!(%work, delay, ?repeat, "delayed work scheduled");
            }
            Command::CancelWork { work } => {
                if !self.scheduler.cancel(work) {
                    tracing::trace!(%work, "cancel ignored for unknown work");
                }
            }
            Command::EndRound => self.end_round(out_events),
        }
    }

    fn advance_tick(&mut self, out_events: &mut Vec<Event>) {
        self.tick = self.tick.saturating_add(1);
        out_events.push(Event::TimeAdvanced { tick: self.tick });

        let due = self.scheduler.advance();
        self.pending.extend(due);
        self.flush_pending(out_events);

        self.advance_enemy_statuses(out_events);
        self.flush_pending(out_events);

        self.advance_tower_statuses(out_events);
        self.flush_pending(out_events);

        self.advance_tower_timers(out_events);
        self.flush_pending(out_events);

        self.advance_enemies(out_events);
        self.flush_pending(out_events);
    }

    /// Applies commands queued during the previous pass, including any they
    /// queue in turn, until the queue drains or the cascade budget runs out.
    fn flush_pending(&mut self, out_events: &mut Vec<Event>) {
        while let Some(command) = self.pending.pop_front() {
            if self.cascade_budget == 0 {
                tracing::warn!(
                    dropped = self.pending.len() + 1,
                    "cascade limit reached, dropping queued commands"
                );
                self.pending.clear();
                return;
            }
            self.cascade_budget -= 1;
            self.execute(command, out_events);
        }
    }

    /// Removes expired enemies, projectiles, and the statuses they carried.
    fn cleanup(&mut self) {
        let enemies = self.enemies.drain_where(|enemy| enemy.expired);
        let projectiles = self.projectiles.drain_where(|projectile| projectile.expired);
        let orphaned = self.statuses.drain_where(|status| match status.owner {
            EntityRef::Enemy(id) => enemies.contains(&id),
            EntityRef::Tower(_) => false,
        });
        if !enemies.is_empty() || !projectiles.is_empty() {
            tracing::trace!(
                enemies = enemies.len(),
                projectiles = projectiles.len(),
                statuses = orphaned.len(),
                "cleanup removed expired entities"
            );
        }
    }
}

/// Logs a content defect and surfaces it to observers.
pub(crate) fn report_config_error(error: ConfigError, out_events: &mut Vec<Event>) {
    tracing::error!(%error, "configuration error");
    out_events.push(Event::ConfigurationError { error });
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Commands queued while the command runs are applied before returning.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    world.cascade_budget = world.config.cascade_limit;
    world.execute(command, out_events);
    world.flush_pending(out_events);
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use rampart_core::{
        Difficulty, EnemyId, EnemySnapshot, EnemyView, EntityRef, Modifiers, ProjectileSnapshot,
        StatusSnapshot, Tag, Tick, TowerId, TowerSnapshot, TowerView, Track, WorldPoint,
    };

    use super::{Catalog, World};

    /// Difficulty of the running game.
    #[must_use]
    pub fn difficulty(world: &World) -> Difficulty {
        world.difficulty
    }

    /// Number of ticks simulated since the game started.
    #[must_use]
    pub fn tick(world: &World) -> Tick {
        world.tick
    }

    /// Round currently in progress, starting at one.
    #[must_use]
    pub fn round(world: &World) -> u32 {
        world.round
    }

    /// Player hit points remaining.
    #[must_use]
    pub fn player_hp(world: &World) -> u32 {
        world.player_hp
    }

    /// Gold held by the player.
    #[must_use]
    pub fn gold(world: &World) -> u32 {
        world.gold
    }

    /// Reports whether the player has been defeated.
    #[must_use]
    pub fn is_defeated(world: &World) -> bool {
        world.defeated
    }

    /// Track enemies follow.
    #[must_use]
    pub fn track(world: &World) -> &Track {
        &world.config.track
    }

    /// Content catalog backing the world.
    #[must_use]
    pub fn catalog(world: &World) -> &Catalog {
        &world.catalog
    }

    /// Number of delayed work entries still pending.
    #[must_use]
    pub fn pending_work(world: &World) -> usize {
        world.scheduler.pending()
    }

    /// Captures a read-only view of every enemy, including those pending
    /// removal.
    #[must_use]
    pub fn enemy_view(world: &World) -> EnemyView {
        EnemyView::from_snapshots(
            world
                .enemies
                .values()
                .map(|enemy| world.enemy_snapshot(enemy))
                .collect(),
        )
    }

    /// Captures a read-only view of every tower.
    #[must_use]
    pub fn tower_view(world: &World) -> TowerView {
        TowerView::from_snapshots(
            world
                .towers
                .values()
                .map(|tower| world.tower_snapshot(tower))
                .collect(),
        )
    }

    /// Snapshot of a single enemy.
    #[must_use]
    pub fn enemy(world: &World, id: EnemyId) -> Option<EnemySnapshot> {
        world
            .enemies
            .get(id)
            .map(|enemy| world.enemy_snapshot(enemy))
    }

    /// Snapshot of a single tower.
    #[must_use]
    pub fn tower(world: &World, id: TowerId) -> Option<TowerSnapshot> {
        world
            .towers
            .get(id)
            .map(|tower| world.tower_snapshot(tower))
    }

    /// Status effects carried by an entity, ordered by kind.
    #[must_use]
    pub fn statuses(world: &World, target: EntityRef) -> Vec<StatusSnapshot> {
        world
            .status_ids(target)
            .into_iter()
            .filter_map(|id| world.statuses.get(id).map(|status| status.snapshot(id)))
            .collect()
    }

    /// Live projectiles ordered by identifier.
    #[must_use]
    pub fn projectiles(world: &World) -> Vec<ProjectileSnapshot> {
        world
            .projectiles
            .values()
            .map(|projectile| projectile.snapshot())
            .collect()
    }

    /// Aggregated status modifiers of an entity.
    #[must_use]
    pub fn modifiers(world: &World, target: EntityRef) -> Modifiers {
        world.modifiers(target)
    }

    /// Reports whether an entity ignores effects carrying `tag`.
    #[must_use]
    pub fn is_immune_to(world: &World, target: EntityRef, tag: &Tag) -> bool {
        world.is_immune_to(target, tag)
    }

    /// Towers whose position lies within `radius` of `point`.
    ///
    /// An empty result is a valid answer, never an error.
    #[must_use]
    pub fn towers_within(world: &World, point: WorldPoint, radius: f32) -> Vec<TowerId> {
        let radius_sq = radius * radius;
        world
            .towers
            .values()
            .filter(|tower| tower.position.distance_squared(point) <= radius_sq)
            .map(|tower| tower.id)
            .collect()
    }

    /// Living enemies whose collision circle touches the circle at `point`.
    #[must_use]
    pub fn enemies_within(world: &World, point: WorldPoint, radius: f32) -> Vec<EnemyId> {
        world
            .enemies
            .values()
            .filter(|enemy| !enemy.expired)
            .filter(|enemy| enemy.position.distance(point) <= radius + enemy.stats.size)
            .map(|enemy| enemy.id)
            .collect()
    }

    /// Value of a tower counter; missing towers and counters read as zero.
    #[must_use]
    pub fn counter(world: &World, tower: TowerId, name: &str) -> i64 {
        world
            .towers
            .get(tower)
            .and_then(|tower| tower.counters.get(name).copied())
            .unwrap_or(0)
    }
}
