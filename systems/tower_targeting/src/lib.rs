#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that computes deterministic tower targets from world snapshots.

use std::cmp::Ordering;

use rampart_core::{
    EnemyId, EnemyView, TargetPreference, TowerId, TowerTarget, TowerView, WorldPoint,
};

/// Tower targeting system that reuses scratch buffers to avoid repeated allocations.
#[derive(Debug, Default)]
pub struct TowerTargeting {
    tower_workspace: Vec<TowerWorkspace>,
    enemy_workspace: Vec<EnemyCandidate>,
}

impl TowerTargeting {
    /// Creates a new tower targeting system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes tower targets for the provided world snapshot.
    ///
    /// Only towers that may attack and whose cooldown elapsed are considered.
    /// Each picks, among the visible enemies within its effective range that
    /// are not immune to its attack type, the best one by its preference;
    /// ties go to the enemy closer to the tower, then to the lower
    /// identifier. The output buffer is cleared before populating it.
    pub fn handle(&mut self, towers: &TowerView, enemies: &EnemyView, out: &mut Vec<TowerTarget>) {
        out.clear();

        if towers.iter().next().is_none() || enemies.is_empty() {
            return;
        }

        self.prepare_tower_workspace(towers);
        if self.tower_workspace.is_empty() {
            return;
        }

        self.prepare_enemy_workspace(enemies);
        if self.enemy_workspace.is_empty() {
            return;
        }

        for tower in &self.tower_workspace {
            let Some(snapshot) = towers.get(tower.id) else {
                continue;
            };
            let max_distance = tower.range * tower.range;

            let mut best: Option<BestCandidate> = None;

            for candidate in &self.enemy_workspace {
                if candidate.camouflaged && !tower.camo_detection {
                    continue;
                }

                let distance_sq = candidate.position.distance_squared(tower.position);
                if distance_sq > max_distance {
                    continue;
                }

                let immune = enemies
                    .get(candidate.id)
                    .is_some_and(|enemy| enemy.is_immune_to(snapshot.attack_type.tag()));
                if immune {
                    continue;
                }

                let current = BestCandidate {
                    score: score(tower.preference, candidate, distance_sq),
                    distance_sq,
                    enemy: candidate.id,
                };

                match &mut best {
                    Some(existing) => {
                        if current.precedes(existing) {
                            *existing = current;
                        }
                    }
                    None => best = Some(current),
                }
            }

            if let Some(best_candidate) = best {
                out.push(TowerTarget {
                    tower: tower.id,
                    enemy: best_candidate.enemy,
                });
            }
        }
    }

    fn prepare_tower_workspace(&mut self, towers: &TowerView) {
        self.tower_workspace.clear();
        let (lower, _) = towers.iter().size_hint();
        self.tower_workspace.reserve(lower);

        for snapshot in towers.iter() {
            if !snapshot.can_attack() || snapshot.cooldown > 0 || snapshot.range <= 0.0 {
                continue;
            }

            self.tower_workspace.push(TowerWorkspace {
                id: snapshot.id,
                position: snapshot.position,
                range: snapshot.range,
                camo_detection: snapshot.camo_detection,
                preference: snapshot.preference,
            });
        }
    }

    fn prepare_enemy_workspace(&mut self, enemies: &EnemyView) {
        self.enemy_workspace.clear();
        self.enemy_workspace.reserve(enemies.len());

        for snapshot in enemies.iter() {
            if snapshot.expired || snapshot.hp <= 0.0 {
                continue;
            }

            self.enemy_workspace.push(EnemyCandidate {
                id: snapshot.id,
                position: snapshot.position,
                progress: snapshot.progress,
                hp: snapshot.hp,
                camouflaged: snapshot.camouflaged,
            });
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct TowerWorkspace {
    id: TowerId,
    position: WorldPoint,
    range: f32,
    camo_detection: bool,
    preference: TargetPreference,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct EnemyCandidate {
    id: EnemyId,
    position: WorldPoint,
    progress: f32,
    hp: f32,
    camouflaged: bool,
}

/// Preference key; larger is better.
fn score(preference: TargetPreference, candidate: &EnemyCandidate, distance_sq: f32) -> f32 {
    match preference {
        TargetPreference::First => candidate.progress,
        TargetPreference::Last => -candidate.progress,
        TargetPreference::Strongest => candidate.hp,
        TargetPreference::Weakest => -candidate.hp,
        TargetPreference::Closest => -distance_sq,
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct BestCandidate {
    score: f32,
    distance_sq: f32,
    enemy: EnemyId,
}

impl BestCandidate {
    fn precedes(&self, other: &Self) -> bool {
        match self.score.total_cmp(&other.score) {
            Ordering::Greater => return true,
            Ordering::Less => return false,
            Ordering::Equal => {}
        }

        match self.distance_sq.total_cmp(&other.distance_sq) {
            Ordering::Less => return true,
            Ordering::Greater => return false,
            Ordering::Equal => {}
        }

        self.enemy < other.enemy
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use super::{TowerTarget, TowerTargeting};
    use rampart_core::{
        AbilityPhase, AttackType, EnemyId, EnemyKind, EnemySnapshot, EnemyView, Tag,
        TargetPreference, TowerId, TowerKind, TowerSnapshot, TowerView, WorldPoint,
    };

    fn tower(id: u32, position: (f32, f32), range: f32, preference: TargetPreference) -> TowerSnapshot {
        TowerSnapshot {
            id: TowerId::new(id),
            kind: TowerKind::new("dart"),
            position: WorldPoint::new(position.0, position.1),
            tier: 0,
            range,
            attack_type: AttackType::new("sharp"),
            camo_detection: false,
            preference,
            active: true,
            disabled: false,
            cooldown: 0,
            ability: AbilityPhase::Idle,
            channeled: false,
            counters: BTreeMap::new(),
        }
    }

    fn enemy(id: u32, progress: f32, hp: f32) -> EnemySnapshot {
        EnemySnapshot {
            id: EnemyId::new(id),
            kind: EnemyKind::new("grunt"),
            position: WorldPoint::new(progress, 0.0),
            progress,
            hp,
            max_hp: 100.0,
            size: 5.0,
            camouflaged: false,
            immunities: BTreeSet::new(),
            expired: false,
        }
    }

    fn run(towers: Vec<TowerSnapshot>, enemies: Vec<EnemySnapshot>) -> Vec<TowerTarget> {
        let mut system = TowerTargeting::new();
        let mut out = Vec::new();
        system.handle(
            &TowerView::from_snapshots(towers),
            &EnemyView::from_snapshots(enemies),
            &mut out,
        );
        out
    }

    fn chosen(preference: TargetPreference) -> EnemyId {
        let out = run(
            vec![tower(1, (50.0, 10.0), 100.0, preference)],
            vec![
                enemy(100_000, 20.0, 30.0),
                enemy(100_001, 80.0, 10.0),
                enemy(100_002, 45.0, 90.0),
            ],
        );
        assert_eq!(out.len(), 1);
        out[0].enemy
    }

    #[test]
    fn preference_orders_candidates() {
        assert_eq!(chosen(TargetPreference::First), EnemyId::new(100_001));
        assert_eq!(chosen(TargetPreference::Last), EnemyId::new(100_000));
        assert_eq!(chosen(TargetPreference::Strongest), EnemyId::new(100_002));
        assert_eq!(chosen(TargetPreference::Weakest), EnemyId::new(100_001));
        assert_eq!(chosen(TargetPreference::Closest), EnemyId::new(100_002));
    }

    #[test]
    fn enemy_outside_range_is_ignored() {
        let out = run(
            vec![tower(1, (0.0, 0.0), 50.0, TargetPreference::First)],
            vec![enemy(100_000, 200.0, 10.0)],
        );

        assert!(out.is_empty());
    }

    #[test]
    fn equal_scores_prefer_closer_enemy_then_lower_id() {
        let mut near = enemy(100_007, 40.0, 10.0);
        near.position = WorldPoint::new(40.0, 0.0);
        let mut far = enemy(100_003, 40.0, 10.0);
        far.position = WorldPoint::new(40.0, 30.0);

        let out = run(
            vec![tower(1, (40.0, 5.0), 100.0, TargetPreference::Strongest)],
            vec![far, near],
        );
        assert_eq!(out[0].enemy, EnemyId::new(100_007));

        let out = run(
            vec![tower(1, (40.0, 10.0), 100.0, TargetPreference::Strongest)],
            vec![
                enemy(100_009, 30.0, 10.0),
                enemy(100_004, 50.0, 10.0),
            ],
        );
        assert_eq!(out[0].enemy, EnemyId::new(100_004));
    }

    #[test]
    fn camouflaged_enemy_requires_detection() {
        let mut ghost = enemy(100_000, 10.0, 10.0);
        ghost.camouflaged = true;

        let out = run(
            vec![tower(1, (10.0, 0.0), 50.0, TargetPreference::First)],
            vec![ghost.clone()],
        );
        assert!(out.is_empty());

        let mut spotter = tower(1, (10.0, 0.0), 50.0, TargetPreference::First);
        spotter.camo_detection = true;
        let out = run(vec![spotter], vec![ghost]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn immune_and_expired_enemies_are_skipped() {
        let mut golem = enemy(100_000, 30.0, 50.0);
        let _ = golem.immunities.insert(Tag::new("sharp"));
        let mut dead = enemy(100_001, 35.0, 0.0);
        dead.expired = true;
        let grunt = enemy(100_002, 20.0, 10.0);

        let out = run(
            vec![tower(1, (25.0, 0.0), 50.0, TargetPreference::First)],
            vec![golem, dead, grunt],
        );

        assert_eq!(
            out,
            vec![TowerTarget {
                tower: TowerId::new(1),
                enemy: EnemyId::new(100_002),
            }]
        );
    }

    #[test]
    fn cooling_disabled_or_channeling_towers_do_not_target() {
        let mut cooling = tower(1, (0.0, 0.0), 100.0, TargetPreference::First);
        cooling.cooldown = 5;
        let mut disabled = tower(2, (0.0, 0.0), 100.0, TargetPreference::First);
        disabled.disabled = true;
        let mut channeling = tower(3, (0.0, 0.0), 100.0, TargetPreference::First);
        channeling.channeled = true;
        channeling.ability = AbilityPhase::Casting { remaining: 2 };
        let mut inactive = tower(4, (0.0, 0.0), 100.0, TargetPreference::First);
        inactive.active = false;
        let ready = tower(5, (0.0, 0.0), 100.0, TargetPreference::First);

        let out = run(
            vec![cooling, disabled, channeling, inactive, ready],
            vec![enemy(100_000, 10.0, 10.0)],
        );

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].tower, TowerId::new(5));
    }

    #[test]
    fn stale_output_is_cleared() {
        let mut system = TowerTargeting::new();
        let mut out = vec![TowerTarget {
            tower: TowerId::new(99),
            enemy: EnemyId::new(99),
        }];

        system.handle(
            &TowerView::from_snapshots(Vec::new()),
            &EnemyView::from_snapshots(vec![enemy(100_000, 0.0, 1.0)]),
            &mut out,
        );

        assert!(out.is_empty());
    }
}
