//! Persistence surface: extraction and restoration of the durable parts of
//! a game.
//!
//! Only towers, their statuses, and the economy survive a snapshot. Enemies
//! and projectiles are transient and are never exported.

use std::collections::BTreeMap;

use rampart_core::{
    ConfigError, Difficulty, EntityRef, Event, StackingPolicy, StatusApplication, StatusDuration,
    StatusId, StatusKind, Tick, TowerId, TowerKind, WorldPoint,
};
use serde::{Deserialize, Serialize};

use crate::{report_config_error, status::StatusEffect, towers::Tower, World};

/// Durable state of a game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Difficulty the game runs at.
    pub difficulty: Difficulty,
    /// Round in progress.
    pub round: u32,
    /// Ticks simulated so far.
    pub tick: Tick,
    /// Player hit points remaining.
    pub player_hp: u32,
    /// Gold held by the player.
    pub gold: u32,
    /// Every placed tower in identifier order.
    pub towers: Vec<TowerRecord>,
}

/// Exported state of a single tower.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TowerRecord {
    /// Identifier of the tower.
    pub id: TowerId,
    /// Kind used to look the archetype up on restore.
    pub kind: TowerKind,
    /// Location of the tower.
    pub position: WorldPoint,
    /// Tier reached.
    pub tier: u32,
    /// Accumulated counters.
    pub counters: BTreeMap<String, i64>,
    /// Statuses carried by the tower, ordered by kind.
    pub statuses: Vec<StatusRecord>,
}

/// Exported state of a single status effect.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    /// Identifier of the status.
    pub id: StatusId,
    /// Kind used to look the prototype up on restore.
    pub kind: StatusKind,
    /// Strength of the effect.
    pub potency: f32,
    /// Number of stacked applications.
    pub stacks: u32,
    /// Remaining duration.
    pub duration: StatusDuration,
    /// Tower credited with the status.
    pub source: Option<TowerId>,
}

/// Exports the durable state of the world.
#[must_use]
pub fn extract(world: &World) -> WorldSnapshot {
    let towers = world
        .towers
        .values()
        .map(|tower| TowerRecord {
            id: tower.id,
            kind: tower.kind.clone(),
            position: tower.position,
            tier: tower.tier,
            counters: tower.counters.clone(),
            statuses: tower
                .statuses
                .values()
                .filter_map(|id| world.statuses.get(*id).map(|effect| (*id, effect)))
                .map(|(id, effect)| StatusRecord {
                    id,
                    kind: effect.kind.clone(),
                    potency: effect.potency,
                    stacks: effect.stacks,
                    duration: effect.duration,
                    source: effect.source,
                })
                .collect(),
        })
        .collect();

    WorldSnapshot {
        difficulty: world.difficulty,
        round: world.round,
        tick: world.tick,
        player_hp: world.player_hp,
        gold: world.gold,
        towers,
    }
}

/// Replaces the world's state with the snapshot.
///
/// Towers are rebuilt through the catalog and statuses through their
/// prototypes. Records naming unknown kinds are reported and skipped; a tower
/// whose tier no longer exists is restored deactivated. Identifier counters
/// are moved past every restored identifier.
pub fn restore(world: &mut World, snapshot: &WorldSnapshot, out_events: &mut Vec<Event>) {
    world.reset(snapshot.difficulty);
    world.round = snapshot.round.max(1);
    world.tick = snapshot.tick;
    world.player_hp = snapshot.player_hp;
    world.gold = snapshot.gold;
    world.defeated = snapshot.player_hp == 0;

    for record in &snapshot.towers {
        restore_tower(world, record, out_events);
    }

    tracing::debug!(
        towers = world.towers.len(),
        next_tower = %world.towers.peek_next(),
        next_status = %world.statuses.peek_next(),
        "snapshot restored"
    );
}

fn restore_tower(world: &mut World, record: &TowerRecord, out_events: &mut Vec<Event>) {
    let difficulty = world.difficulty;
    let Some(archetype) = world.catalog.tower(&record.kind) else {
        report_config_error(
            ConfigError::UnknownTowerKind(record.kind.to_string()),
            out_events,
        );
        return;
    };
    let (stats, defect) = match archetype.stats(record.tier, difficulty) {
        Ok(stats) => (stats, None),
        Err(error) => match archetype.stats(0, difficulty) {
            Ok(stats) => (stats, Some(error)),
            Err(base) => {
                report_config_error(base, out_events);
                return;
            }
        },
    };

    let mut tower = Tower::new(
        record.id,
        record.kind.clone(),
        record.position,
        record.tier,
        stats,
    );
    tower.counters = record.counters.clone();
    world.towers.insert(record.id, tower);
    world.towers.reseed_above(record.id);
    out_events.push(Event::TowerPlaced {
        tower: record.id,
        kind: record.kind.clone(),
        position: record.position,
    });
    if let Some(error) = defect {
        world.deactivate(record.id, error, out_events);
    }

    for status in &record.statuses {
        restore_status(world, record.id, status, out_events);
    }
}

fn restore_status(
    world: &mut World,
    tower: TowerId,
    record: &StatusRecord,
    out_events: &mut Vec<Event>,
) {
    let Some(policy) = world
        .catalog
        .status(&record.kind)
        .map(|prototype| prototype.policy)
    else {
        report_config_error(
            ConfigError::UnknownStatusKind(record.kind.to_string()),
            out_events,
        );
        return;
    };

    let owner = EntityRef::Tower(tower);
    let mut effect = StatusEffect::new(
        owner,
        StatusApplication {
            kind: record.kind.clone(),
            potency: record.potency,
            duration: record.duration,
            source: record.source,
        },
    );
    effect.stacks = match policy {
        StackingPolicy::AdditiveStack { max_stacks } => record.stacks.clamp(1, max_stacks.max(1)),
        StackingPolicy::ReplaceIfStronger
        | StackingPolicy::RefreshDuration
        | StackingPolicy::IgnoreIfPresent => 1,
    };

    world.statuses.insert(record.id, effect);
    world.statuses.reseed_above(record.id);
    if let Some(tower) = world.towers.get_mut(tower) {
        let _ = tower.statuses.insert(record.kind.clone(), record.id);
    }
    out_events.push(Event::StatusApplied {
        target: owner,
        status: record.id,
        kind: record.kind.clone(),
    });
}

#[cfg(test)]
mod tests {
    use rampart_core::{
        Command, EntityRef, Event, RejectionReason, StatusApplication, StatusDuration, TowerId,
        TowerKind, WorldPoint,
    };

    use super::{extract, restore, StatusRecord, TowerRecord};
    use crate::{apply, query, test_content as content, COUNTER_KILLS};

    fn populated() -> crate::World {
        let mut world = content::world();
        let mut events = Vec::new();
        let dart = content::place(&mut world, content::DART, WorldPoint::new(10.0, 20.0));
        let _ = content::place(&mut world, content::CASTER, WorldPoint::new(60.0, 20.0));
        apply(&mut world, Command::UpgradeTower { tower: dart }, &mut events);
        apply(
            &mut world,
            Command::AddCounter {
                tower: dart,
                name: COUNTER_KILLS.to_owned(),
                amount: 4,
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::ApplyStatus {
                target: EntityRef::Tower(dart),
                application: StatusApplication::timed(content::RALLY, 1.5, 90),
            },
            &mut events,
        );
        world
    }

    #[test]
    fn restore_reproduces_extracted_state() {
        let source = populated();
        let snapshot = extract(&source);

        let mut restored = content::world();
        let mut events = Vec::new();
        restore(&mut restored, &snapshot, &mut events);

        assert_eq!(extract(&restored), snapshot);
        assert_eq!(query::gold(&restored), query::gold(&source));
        let dart = query::tower(&restored, TowerId::new(1)).expect("restored");
        assert_eq!(dart.tier, 1);
        assert_eq!(query::counter(&restored, TowerId::new(1), COUNTER_KILLS), 4);
        assert_eq!(
            query::modifiers(&restored, EntityRef::Tower(TowerId::new(1))).damage_factor,
            1.5
        );
    }

    #[test]
    fn restore_reseeds_identifiers_above_restored_ones() {
        let mut snapshot = extract(&populated());
        snapshot.towers[0].id = TowerId::new(40);
        snapshot.towers[0].statuses[0].id = rampart_core::StatusId::new(5_000_300);

        let mut world = content::world();
        let mut events = Vec::new();
        restore(&mut world, &snapshot, &mut events);

        let fresh = content::place(&mut world, content::DART, WorldPoint::new(0.0, 50.0));
        assert_eq!(fresh, TowerId::new(41));

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::ApplyStatus {
                target: EntityRef::Tower(fresh),
                application: StatusApplication::timed(content::RALLY, 1.2, 10),
            },
            &mut events,
        );
        assert!(matches!(
            events.as_slice(),
            [Event::StatusApplied { status, .. }] if status.get() == 5_000_301
        ));
    }

    #[test]
    fn unknown_kinds_are_reported_and_skipped() {
        let mut snapshot = extract(&populated());
        snapshot.towers.push(TowerRecord {
            id: TowerId::new(9),
            kind: TowerKind::new("catapult"),
            position: WorldPoint::new(0.0, 0.0),
            tier: 0,
            counters: Default::default(),
            statuses: Vec::new(),
        });
        snapshot.towers[0].statuses.push(StatusRecord {
            id: rampart_core::StatusId::new(5_000_100),
            kind: rampart_core::StatusKind::new("mystery"),
            potency: 1.0,
            stacks: 1,
            duration: StatusDuration::Persistent,
            source: None,
        });

        let mut world = content::world();
        let mut events = Vec::new();
        restore(&mut world, &snapshot, &mut events);

        let errors = events
            .iter()
            .filter(|event| matches!(event, Event::ConfigurationError { .. }))
            .count();
        assert_eq!(errors, 2);
        assert_eq!(query::tower_view(&world).into_vec().len(), 2);
        assert!(query::tower(&world, TowerId::new(9)).is_none());
    }

    #[test]
    fn missing_tier_restores_tower_deactivated() {
        let mut snapshot = extract(&populated());
        snapshot.towers[0].tier = 7;

        let mut world = content::world();
        let mut events = Vec::new();
        restore(&mut world, &snapshot, &mut events);

        let tower = query::tower(&world, TowerId::new(1)).expect("restored");
        assert!(!tower.active);
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::TowerDeactivated { .. })));

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::UpgradeTower {
                tower: TowerId::new(1),
            },
            &mut events,
        );
        assert!(matches!(
            events.as_slice(),
            [Event::UpgradeRejected {
                reason: RejectionReason::Inactive,
                ..
            }]
        ));
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let snapshot = extract(&populated());

        let json = serde_json::to_string(&snapshot).expect("serialize");
        let parsed: super::WorldSnapshot = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(parsed, snapshot);
    }
}
