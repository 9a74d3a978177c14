//! Demo catalog and hooks used by the headless runner.

use rampart_core::{
    AbilitySpec, Appearance, AttackType, Command, ConfigError, Difficulty, Discipline, EnemyKind,
    EnemyStatBlock, EntityRef, ExpireEffect, HitPayload, Modifier, Periodic, PeriodicPayload,
    ProjectileSpec, StackingPolicy, StatusApplication, StatusKind, StatusPrototype, Tag,
    TargetPreference, Tiered, TowerKind, TowerStats,
};
use rampart_world::{
    query, AbilityContext, AttackContext, Catalog, EnemyArchetype, HookContext, HookTable,
    TowerArchetype,
};

pub(crate) const DART: TowerKind = TowerKind::new("dart");
pub(crate) const CANNON: TowerKind = TowerKind::new("cannon");
pub(crate) const SNIPER: TowerKind = TowerKind::new("sniper");
pub(crate) const FROST: TowerKind = TowerKind::new("frost");
pub(crate) const BANK: TowerKind = TowerKind::new("bank");
pub(crate) const SHRINE: TowerKind = TowerKind::new("shrine");

pub(crate) const GRUNT: EnemyKind = EnemyKind::new("grunt");
pub(crate) const SCOUT: EnemyKind = EnemyKind::new("scout");
pub(crate) const SHADE: EnemyKind = EnemyKind::new("shade");
pub(crate) const BRUTE: EnemyKind = EnemyKind::new("brute");
pub(crate) const SPLITTER: EnemyKind = EnemyKind::new("splitter");
pub(crate) const MEDIC: EnemyKind = EnemyKind::new("medic");

const SLOW: StatusKind = StatusKind::new("slow");
const BURN: StatusKind = StatusKind::new("burn");
const HASTE: StatusKind = StatusKind::new("haste");

const SHARP: &str = "sharp";

/// Gold paid by a bank at the end of every round.
pub(crate) const BANK_BASE_INCOME: u32 = 60;
/// Extra gold per neighbouring bank.
pub(crate) const BANK_NEIGHBOUR_BONUS: u32 = 15;
/// Radius within which banks count as neighbours.
pub(crate) const BANK_NEIGHBOUR_RADIUS: f32 = 120.0;

const MEDIC_PERIOD: u32 = 60;
const MEDIC_RADIUS: f32 = 80.0;
const MEDIC_HEAL: f32 = 10.0;
const SHRINE_RADIUS: f32 = 150.0;

#[derive(Clone, Debug)]
struct Shot {
    discipline: &'static str,
    speed: f32,
    pierce: u32,
    radius: f32,
    lifetime: u32,
    statuses: Vec<StatusApplication>,
    burst: Option<f32>,
}

impl Shot {
    fn new(discipline: &'static str, speed: f32) -> Self {
        Self {
            discipline,
            speed,
            pierce: 1,
            radius: 3.0,
            lifetime: 90,
            statuses: Vec::new(),
            burst: None,
        }
    }
}

#[derive(Clone, Debug)]
struct DemoTower {
    kind: TowerKind,
    sprite: &'static str,
    cost: Tiered<u32>,
    upgrade_cost: u32,
    tiers: Vec<TowerStats>,
    shot: Option<Shot>,
    ability: Option<AbilitySpec>,
}

impl TowerArchetype for DemoTower {
    fn kind(&self) -> TowerKind {
        self.kind.clone()
    }

    fn max_tier(&self) -> u32 {
        u32::try_from(self.tiers.len().saturating_sub(1)).unwrap_or(u32::MAX)
    }

    fn stats(&self, tier: u32, _difficulty: Difficulty) -> Result<TowerStats, ConfigError> {
        self.tiers
            .get(tier as usize)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownTier {
                kind: self.kind.to_string(),
                tier,
                max: self.max_tier(),
            })
    }

    fn cost(&self, difficulty: Difficulty) -> u32 {
        self.cost.get(difficulty)
    }

    fn upgrade_cost(&self, tier: u32, _difficulty: Difficulty) -> u32 {
        self.upgrade_cost.saturating_mul(tier)
    }

    fn attack(
        &self,
        context: &AttackContext<'_>,
        out: &mut Vec<ProjectileSpec>,
    ) -> Result<(), ConfigError> {
        let Some(shot) = &self.shot else {
            return Ok(());
        };
        let aim = context.target.position;
        let discipline = Discipline::from_tag(shot.discipline, Some(context.target.id), Some(aim))?;
        let payload = HitPayload {
            damage: context.stats.damage,
            statuses: shot.statuses.clone(),
        };

        let mut spec = ProjectileSpec::aimed(
            context.tower.position,
            aim,
            shot.speed,
            discipline,
            context.stats.attack_type.clone(),
        );
        spec.pierce = shot.pierce + context.tower.tier;
        spec.radius = shot.radius;
        spec.lifetime = shot.lifetime;
        spec.camo_detection = context.tower.camo_detection;
        match shot.burst {
            Some(radius) => spec.on_expire = ExpireEffect::Burst { radius, payload },
            None => spec.on_collide = payload,
        }
        out.push(spec);
        Ok(())
    }

    fn ability(&self, _tier: u32) -> Option<AbilitySpec> {
        self.ability
    }

    fn resolve_ability(&self, context: &AbilityContext<'_>, out: &mut Vec<Command>) {
        let origin = context.tower;
        for tower in query::towers_within(context.world, origin.position, SHRINE_RADIUS) {
            if tower == origin.id {
                continue;
            }
            out.push(Command::ApplyStatus {
                target: EntityRef::Tower(tower),
                application: StatusApplication::timed(HASTE, 0.5, 300).from_tower(origin.id),
            });
        }
    }

    fn appearance(&self, tier: u32) -> Appearance {
        Appearance {
            sprite: self.sprite,
            scale_percent: 100 + 15 * tier.min(4) as u16,
        }
    }
}

#[derive(Clone, Debug)]
struct DemoEnemy {
    kind: EnemyKind,
    sprite: &'static str,
    block: EnemyStatBlock,
}

impl EnemyArchetype for DemoEnemy {
    fn kind(&self) -> EnemyKind {
        self.kind.clone()
    }

    fn stat_block(&self) -> &EnemyStatBlock {
        &self.block
    }

    fn appearance(&self) -> Appearance {
        Appearance {
            sprite: self.sprite,
            scale_percent: 100,
        }
    }
}

fn stats(range: f32, attack_period: u32, damage: f32, attack_type: &'static str) -> TowerStats {
    TowerStats {
        size: 12.0,
        range,
        attack_period,
        damage,
        attack_type: AttackType::new(attack_type),
        camo_detection: false,
        preference: TargetPreference::First,
    }
}

fn tower(kind: TowerKind, sprite: &'static str, cost: Tiered<u32>, tiers: Vec<TowerStats>) -> DemoTower {
    DemoTower {
        kind,
        sprite,
        cost,
        upgrade_cost: 120,
        tiers,
        shot: None,
        ability: None,
    }
}

fn enemy(
    kind: EnemyKind,
    sprite: &'static str,
    speed: f32,
    hp: Tiered<f32>,
    reward: Tiered<u32>,
    goal_damage: u32,
) -> DemoEnemy {
    DemoEnemy {
        kind,
        sprite,
        block: EnemyStatBlock {
            speed: Tiered::uniform(speed),
            size: 8.0,
            hp,
            reward,
            goal_damage: Tiered::uniform(goal_damage),
            immunities: Vec::new(),
            camouflaged: false,
        },
    }
}

/// Catalog holding every demo tower, enemy and status.
pub(crate) fn catalog() -> Catalog {
    let dart = DemoTower {
        shot: Some(Shot::new("nontarget", 14.0)),
        ..tower(
            DART,
            "dart-monkey",
            Tiered::new(170, 200, 230),
            vec![
                stats(110.0, 40, 8.0, SHARP),
                stats(130.0, 35, 12.0, SHARP),
                stats(150.0, 30, 18.0, SHARP),
            ],
        )
    };
    let cannon = DemoTower {
        shot: Some(Shot {
            burst: Some(40.0),
            statuses: vec![StatusApplication::timed(BURN, 2.0, 120)],
            ..Shot::new("destinated", 9.0)
        }),
        ..tower(
            CANNON,
            "cannon",
            Tiered::new(400, 475, 550),
            vec![stats(180.0, 80, 20.0, "explosive"), stats(200.0, 70, 30.0, "explosive")],
        )
    };
    let mut sniper_tiers = vec![stats(400.0, 90, 35.0, "piercing"), stats(450.0, 75, 60.0, "piercing")];
    for tier in &mut sniper_tiers {
        tier.camo_detection = true;
        tier.preference = TargetPreference::Strongest;
    }
    let sniper = DemoTower {
        shot: Some(Shot {
            lifetime: 120,
            ..Shot::new("target", 25.0)
        }),
        ..tower(SNIPER, "sniper", Tiered::new(300, 350, 400), sniper_tiers)
    };
    let frost = DemoTower {
        shot: Some(Shot {
            pierce: 3,
            radius: 6.0,
            statuses: vec![StatusApplication::timed(SLOW, 0.6, 60)],
            ..Shot::new("nontarget", 10.0)
        }),
        ..tower(
            FROST,
            "ice-tower",
            Tiered::new(250, 280, 320),
            vec![stats(90.0, 50, 2.0, "cold")],
        )
    };
    let bank = tower(
        BANK,
        "banana-farm",
        Tiered::new(500, 550, 650),
        vec![stats(0.0, 1, 0.0, "none")],
    );
    let shrine = DemoTower {
        ability: Some(AbilitySpec {
            cost: 100,
            cast_ticks: 60,
            cooldown_ticks: 600,
            channeled: true,
        }),
        shot: Some(Shot::new("nontarget", 12.0)),
        ..tower(
            SHRINE,
            "shrine",
            Tiered::new(350, 400, 450),
            vec![stats(100.0, 60, 6.0, "arcane")],
        )
    };

    let mut shade = enemy(SHADE, "shade", 3.0, Tiered::new(20.0, 30.0, 40.0), Tiered::uniform(15), 1);
    shade.block.camouflaged = true;
    let mut brute = enemy(BRUTE, "brute", 1.0, Tiered::new(150.0, 200.0, 260.0), Tiered::uniform(40), 5);
    brute.block.size = 14.0;
    brute.block.immunities.push(Tag::new(SHARP));

    let burn = StatusPrototype {
        kind: BURN,
        policy: StackingPolicy::AdditiveStack { max_stacks: 5 },
        modifier: Modifier::None,
        periodic: Some(Periodic {
            every: 20,
            payload: PeriodicPayload::Damage {
                attack_type: AttackType::new("fire"),
            },
        }),
        grants_immunity: Vec::new(),
    };

    Catalog::new()
        .with_tower(dart)
        .with_tower(cannon)
        .with_tower(sniper)
        .with_tower(frost)
        .with_tower(bank)
        .with_tower(shrine)
        .with_enemy(enemy(GRUNT, "grunt", 2.0, Tiered::new(30.0, 40.0, 55.0), Tiered::new(12, 10, 8), 1))
        .with_enemy(enemy(SCOUT, "scout", 5.0, Tiered::new(12.0, 15.0, 20.0), Tiered::new(8, 6, 5), 1))
        .with_enemy(shade)
        .with_enemy(brute)
        .with_enemy(enemy(SPLITTER, "splitter", 1.5, Tiered::new(60.0, 80.0, 100.0), Tiered::uniform(20), 2))
        .with_enemy(enemy(MEDIC, "medic", 1.5, Tiered::new(40.0, 50.0, 60.0), Tiered::uniform(25), 1))
        .with_status(plain(SLOW, StackingPolicy::ReplaceIfStronger, Modifier::Speed))
        .with_status(burn)
        .with_status(plain(HASTE, StackingPolicy::RefreshDuration, Modifier::AttackPeriod))
}

fn plain(kind: StatusKind, policy: StackingPolicy, modifier: Modifier) -> StatusPrototype {
    StatusPrototype {
        kind,
        policy,
        modifier,
        periodic: None,
        grants_immunity: Vec::new(),
    }
}

/// Hooks wiring the demo's scripted behaviors.
pub(crate) fn hooks() -> HookTable {
    HookTable::new()
        .on_death(SPLITTER, split_hook)
        .on_period(MEDIC, MEDIC_PERIOD, medic_hook)
        .on_round_end(BANK, bank_income_hook)
}

fn split_hook(context: &HookContext<'_>, out: &mut Vec<Command>) {
    let Some(enemy) = context.enemy() else {
        return;
    };
    for offset in [0.0, 6.0] {
        out.push(Command::SpawnEnemy {
            kind: SCOUT,
            progress: (enemy.progress - offset).max(0.0),
        });
    }
}

fn medic_hook(context: &HookContext<'_>, out: &mut Vec<Command>) {
    let Some(medic) = context.enemy() else {
        return;
    };
    for patient in query::enemies_within(context.world(), medic.position, MEDIC_RADIUS) {
        out.push(Command::ChangeHp {
            enemy: patient,
            delta: MEDIC_HEAL,
            attack_type: None,
            source: None,
        });
    }
}

/// Income of a bank with the provided number of neighbouring banks.
pub(crate) fn bank_income(neighbours: usize) -> u32 {
    let bonus = u32::try_from(neighbours)
        .unwrap_or(u32::MAX)
        .saturating_mul(BANK_NEIGHBOUR_BONUS);
    BANK_BASE_INCOME.saturating_add(bonus)
}

fn bank_income_hook(context: &HookContext<'_>, out: &mut Vec<Command>) {
    let Some(bank) = context.tower() else {
        return;
    };
    let world = context.world();
    let neighbours = query::towers_within(world, bank.position, BANK_NEIGHBOUR_RADIUS)
        .into_iter()
        .filter(|id| *id != bank.id)
        .filter_map(|id| query::tower(world, id))
        .filter(|tower| tower.active && tower.kind == BANK)
        .count();

    out.push(Command::GrantGold {
        amount: bank_income(neighbours),
        source: Some(bank.id),
    });
}
