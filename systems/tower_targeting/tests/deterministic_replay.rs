use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use rampart_core::{Command, EnemyId, Event, TowerId, TowerTarget, WorldPoint};
use rampart_system_tower_targeting::TowerTargeting;
use rampart_world::{self as world, query, test_content as content};

#[test]
fn deterministic_replay_prefers_leading_visible_enemy() {
    let script = scripted_commands();
    let script_len = script.len();
    let first = replay(script.clone());
    let second = replay(script);

    assert_eq!(first, second, "replay diverged between runs");
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert_eq!(first.assignments.len(), script_len);

    let spawned: Vec<EnemyId> = first
        .events
        .iter()
        .filter_map(|event| match event {
            EventRecord::EnemySpawned { enemy } => Some(EnemyId::new(*enemy)),
            _ => None,
        })
        .collect();
    assert_eq!(spawned.len(), 3, "expected three spawn events");
    let leading_grunt = spawned[1];

    assert!(
        first.assignments[..3].iter().all(|snapshot| snapshot.targets.is_empty()),
        "no tower exists before placement"
    );

    for snapshot in &first.assignments[3..] {
        assert_eq!(snapshot.targets.len(), 1);
        assert_eq!(snapshot.targets[0].enemy, leading_grunt);
    }
}

#[test]
fn empty_world_produces_no_targets() {
    let world = content::world();
    let mut targeting = TowerTargeting::new();
    let mut targets = vec![TowerTarget {
        tower: TowerId::new(1),
        enemy: EnemyId::new(1),
    }];

    targeting.handle(
        &query::tower_view(&world),
        &query::enemy_view(&world),
        &mut targets,
    );

    assert!(targets.is_empty());
}

fn replay(commands: Vec<Command>) -> ReplayOutcome {
    let mut world = content::world();
    let mut targeting = TowerTargeting::new();
    let mut current_targets = Vec::new();
    let mut assignments = Vec::new();
    let mut events = Vec::new();

    for command in commands {
        let mut generated = Vec::new();
        world::apply(&mut world, command, &mut generated);
        events.extend(generated.iter().filter_map(EventRecord::from_event));

        let towers = query::tower_view(&world);
        let enemies = query::enemy_view(&world);
        targeting.handle(&towers, &enemies, &mut current_targets);

        assignments.push(TargetSnapshot::from(&current_targets));
    }

    ReplayOutcome {
        events,
        assignments,
    }
}

fn scripted_commands() -> Vec<Command> {
    vec![
        Command::SpawnEnemy {
            kind: content::GRUNT,
            progress: 50.0,
        },
        Command::SpawnEnemy {
            kind: content::GRUNT,
            progress: 150.0,
        },
        Command::SpawnEnemy {
            kind: content::GHOST,
            progress: 170.0,
        },
        Command::PlaceTower {
            kind: content::DART,
            position: WorldPoint::new(100.0, 20.0),
        },
        Command::Tick,
        Command::Tick,
        Command::Tick,
    ]
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum EventRecord {
    EnemySpawned { enemy: u32 },
    TowerPlaced { tower: u32 },
    TimeAdvanced { tick: u64 },
}

impl EventRecord {
    fn from_event(event: &Event) -> Option<Self> {
        match event {
            Event::EnemySpawned { enemy, .. } => Some(Self::EnemySpawned { enemy: enemy.get() }),
            Event::TowerPlaced { tower, .. } => Some(Self::TowerPlaced { tower: tower.get() }),
            Event::TimeAdvanced { tick } => Some(Self::TimeAdvanced { tick: *tick }),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct TargetSnapshot {
    targets: Vec<TargetRecord>,
}

impl From<&Vec<TowerTarget>> for TargetSnapshot {
    fn from(targets: &Vec<TowerTarget>) -> Self {
        Self {
            targets: targets
                .iter()
                .map(|target| TargetRecord {
                    tower: target.tower,
                    enemy: target.enemy,
                })
                .collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct TargetRecord {
    tower: TowerId,
    enemy: EnemyId,
}

#[derive(Debug, PartialEq, Eq)]
struct ReplayOutcome {
    events: Vec<EventRecord>,
    assignments: Vec<TargetSnapshot>,
}

impl ReplayOutcome {
    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.events.hash(&mut hasher);
        self.assignments.hash(&mut hasher);
        hasher.finish()
    }
}
