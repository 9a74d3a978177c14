use proptest::prelude::*;
use rampart_core::{Command, EnemyId, EntityRef, Event, StatusApplication, StatusDuration};
use rampart_world::{self as world, query, test_content as content, World};

fn spawn_grunt(world: &mut World) -> EnemyId {
    let mut events = Vec::new();
    world::apply(
        world,
        Command::SpawnEnemy {
            kind: content::GRUNT,
            progress: 100.0,
        },
        &mut events,
    );
    events
        .iter()
        .find_map(|event| match event {
            Event::EnemySpawned { enemy, .. } => Some(*enemy),
            _ => None,
        })
        .expect("grunt spawned")
}

proptest! {
    #[test]
    fn hp_stays_within_bounds(deltas in prop::collection::vec(-60.0_f32..40.0, 1..40)) {
        let mut world = content::world();
        let enemy = spawn_grunt(&mut world);
        let mut deaths = 0;

        for delta in deltas {
            let mut events = Vec::new();
            world::apply(
                &mut world,
                Command::ChangeHp { enemy, delta, attack_type: None, source: None },
                &mut events,
            );
            deaths += events
                .iter()
                .filter(|event| matches!(event, Event::EnemyKilled { .. }))
                .count();

            if let Some(snapshot) = query::enemy(&world, enemy) {
                prop_assert!(snapshot.hp >= 0.0);
                prop_assert!(snapshot.hp <= snapshot.max_hp);
            }
        }

        prop_assert!(deaths <= 1);
    }

    #[test]
    fn refresh_resets_remaining_duration(first in 5_u32..50, elapsed in 0_u32..4, second in 1_u32..50) {
        let mut world = content::world();
        let enemy = spawn_grunt(&mut world);
        let target = EntityRef::Enemy(enemy);
        let mut events = Vec::new();

        world::apply(
            &mut world,
            Command::ApplyStatus { target, application: StatusApplication::timed(content::STUN, 1.0, first) },
            &mut events,
        );
        for _ in 0..elapsed {
            world::apply(&mut world, Command::Tick, &mut events);
        }
        world::apply(
            &mut world,
            Command::ApplyStatus { target, application: StatusApplication::timed(content::STUN, 1.0, second) },
            &mut events,
        );

        let statuses = query::statuses(&world, target);
        prop_assert_eq!(statuses.len(), 1);
        prop_assert_eq!(statuses[0].duration, StatusDuration::Ticks(second));
        prop_assert_eq!(statuses[0].stacks, 1);
    }

    #[test]
    fn additive_stacks_are_capped(applications in 1_u32..10) {
        let mut world = content::world();
        let enemy = spawn_grunt(&mut world);
        let target = EntityRef::Enemy(enemy);
        let mut events = Vec::new();

        for _ in 0..applications {
            world::apply(
                &mut world,
                Command::ApplyStatus { target, application: StatusApplication::timed(content::POISON, 1.0, 100) },
                &mut events,
            );
        }

        let statuses = query::statuses(&world, target);
        prop_assert_eq!(statuses.len(), 1);
        prop_assert_eq!(statuses[0].stacks, applications.min(3));
    }
}
