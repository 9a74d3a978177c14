use rampart_core::{Command, EntityRef, Event, StatusApplication, WorldPoint};
use rampart_engine::Simulation;
use rampart_world::{query, test_content as content};

#[test]
fn tower_waits_out_its_period_while_a_target_stays_in_range() {
    let mut world = content::world();
    let dart = content::place(&mut world, content::DART, WorldPoint::new(100.0, 20.0));
    let mut simulation = Simulation::new(world);

    let spawned = simulation.apply_now(Command::SpawnEnemy {
        kind: content::GRUNT,
        progress: 100.0,
    });
    let grunt = spawned
        .iter()
        .find_map(|event| match event {
            Event::EnemySpawned { enemy, .. } => Some(*enemy),
            _ => None,
        })
        .expect("grunt spawned");
    let _ = simulation.apply_now(Command::ApplyStatus {
        target: EntityRef::Enemy(grunt),
        application: StatusApplication::persistent(content::STUN, 1.0),
    });

    let mut engaged_at = Vec::new();
    for step in 1..=150_u32 {
        let events = simulation.step();
        if events.iter().any(|event| {
            matches!(event, Event::TowerEngaged { tower, enemy } if *tower == dart && *enemy == grunt)
        }) {
            engaged_at.push(step);
        }
    }

    assert_eq!(engaged_at, vec![1, 1 + content::DART_PERIOD, 1 + 2 * content::DART_PERIOD]);
    let grunt = query::enemy(simulation.world(), grunt).expect("three darts do not kill a grunt");
    assert_eq!(grunt.progress, 100.0);
    assert_eq!(grunt.hp, grunt.max_hp - 30.0);
}
