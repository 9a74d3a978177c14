//! Small content catalog used by tests across the workspace.
//!
//! Enabled for the crate's own tests and, through the `test_content`
//! feature, for downstream crates that need a populated world.

use rampart_core::{
    AbilitySpec, Appearance, AttackType, Command, ConfigError, Difficulty, Discipline, EnemyKind,
    EnemyStatBlock, EntityRef, Event, ExpireEffect, HitPayload, Modifier, Periodic,
    PeriodicPayload, ProjectileSpec, StackingPolicy, StatusApplication, StatusKind,
    StatusPrototype, Tag, TargetPreference, Tiered, TowerId, TowerKind, TowerStats, Track,
    WorldPoint,
};

use crate::{
    apply, AbilityContext, AttackContext, Catalog, Config, EnemyArchetype, HookContext,
    HookTable, TowerArchetype, World,
};

/// Attack type of darts; golems are immune to it.
pub const SHARP: &str = "sharp";

/// Single-pierce dart thrower with one upgrade.
pub const DART: TowerKind = TowerKind::new("dart");
/// Purchase cost of a dart tower.
pub const DART_COST: u32 = 100;
/// Attack period of a base-tier dart tower.
pub const DART_PERIOD: u32 = 60;
/// Tower firing homing bolts.
pub const HOMING: TowerKind = TowerKind::new("homing");
/// Tower lobbing shells at a point that burst on arrival.
pub const MORTAR: TowerKind = TowerKind::new("mortar");
/// Tower whose projectile content names an unknown discipline.
pub const BROKEN: TowerKind = TowerKind::new("broken");
/// Tower advertising a tier its content does not define.
pub const UNFINISHED: TowerKind = TowerKind::new("unfinished");
/// Tower with a channeled ability that pays out gold.
pub const CASTER: TowerKind = TowerKind::new("caster");
/// Gold cost of the caster's ability.
pub const CASTER_ABILITY_COST: u32 = 50;
/// Ticks the caster's ability takes to resolve.
pub const CASTER_CAST_TICKS: u32 = 3;
/// Gold granted when the caster's ability resolves.
pub const CASTER_ABILITY_GOLD: u32 = 75;

/// Baseline enemy.
pub const GRUNT: EnemyKind = EnemyKind::new("grunt");
/// Grunt movement per tick.
pub const GRUNT_SPEED: f32 = 2.0;
/// Grunt hit points on hard difficulty.
pub const GRUNT_HARD_HP: f32 = 60.0;
/// Gold granted for killing a grunt.
pub const GRUNT_REWARD: u32 = 10;
/// Camouflaged enemy.
pub const GHOST: EnemyKind = EnemyKind::new("ghost");
/// Slow enemy immune to sharp attacks.
pub const GOLEM: EnemyKind = EnemyKind::new("golem");
/// Fast, fragile enemy.
pub const RUNNER: EnemyKind = EnemyKind::new("runner");
/// Player hit points lost when a runner leaks.
pub const RUNNER_GOAL_DAMAGE: u32 = 2;

/// Speed multiplier; the stronger slow wins.
pub const SLOW: StatusKind = StatusKind::new("slow");
/// Movement and attack suppression; re-application refreshes.
pub const STUN: StatusKind = StatusKind::new("stun");
/// Stacking damage over time.
pub const POISON: StatusKind = StatusKind::new("poison");
/// Ticks between poison payloads.
pub const POISON_PERIOD: u32 = 10;
/// Healing over time; never stacks.
pub const REGEN: StatusKind = StatusKind::new("regen");
/// Attack period multiplier for towers.
pub const OVERCLOCK: StatusKind = StatusKind::new("overclock");
/// Damage multiplier for towers.
pub const RALLY: StatusKind = StatusKind::new("rally");
/// Grants camo detection to towers.
pub const RADAR: StatusKind = StatusKind::new("radar");
/// Immunity to poison.
pub const WARD: StatusKind = StatusKind::new("ward");
/// Periodic gold for towers.
pub const INCOME: StatusKind = StatusKind::new("income");
/// Ticks between income payloads.
pub const INCOME_PERIOD: u32 = 10;

/// Gold granted by [`bounty_hook`].
pub const BOUNTY: u32 = 25;
/// Gold granted per tower by [`tithe_hook`].
pub const TITHE: u32 = 15;

/// Tower archetype driven entirely by data.
#[derive(Clone, Debug)]
pub struct ScriptedTower {
    /// Kind served.
    pub kind: TowerKind,
    /// Purchase cost.
    pub cost: u32,
    /// Cost of every upgrade.
    pub upgrade_cost: u32,
    /// Highest advertised tier.
    pub max_tier: u32,
    /// Statistics per tier; may be shorter than advertised.
    pub tiers: Vec<TowerStats>,
    /// Discipline tag of fired projectiles.
    pub discipline: &'static str,
    /// Projectile speed per tick.
    pub projectile_speed: f32,
    /// Projectile pierce.
    pub pierce: u32,
    /// Projectile lifetime in ticks.
    pub lifetime: u32,
    /// Statuses applied on hit.
    pub statuses: Vec<StatusApplication>,
    /// Burst radius fired on expiry.
    pub burst: Option<f32>,
    /// Active ability available at every tier.
    pub ability: Option<AbilitySpec>,
    /// Gold granted when the ability resolves.
    pub ability_gold: u32,
}

impl ScriptedTower {
    fn new(kind: TowerKind, discipline: &'static str, tiers: Vec<TowerStats>) -> Self {
        Self {
            kind,
            cost: DART_COST,
            upgrade_cost: 150,
            max_tier: 1,
            tiers,
            discipline,
            projectile_speed: 20.0,
            pierce: 1,
            lifetime: 30,
            statuses: Vec::new(),
            burst: None,
            ability: None,
            ability_gold: 0,
        }
    }
}

impl TowerArchetype for ScriptedTower {
    fn kind(&self) -> TowerKind {
        self.kind.clone()
    }

    fn max_tier(&self) -> u32 {
        self.max_tier
    }

    fn stats(&self, tier: u32, _difficulty: Difficulty) -> Result<TowerStats, ConfigError> {
        self.tiers
            .get(tier as usize)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownTier {
                kind: self.kind.to_string(),
                tier,
                max: self.max_tier,
            })
    }

    fn cost(&self, _difficulty: Difficulty) -> u32 {
        self.cost
    }

    fn upgrade_cost(&self, _tier: u32, _difficulty: Difficulty) -> u32 {
        self.upgrade_cost
    }

    fn attack(
        &self,
        context: &AttackContext<'_>,
        out: &mut Vec<ProjectileSpec>,
    ) -> Result<(), ConfigError> {
        let aim = context.target.position;
        let discipline = Discipline::from_tag(self.discipline, Some(context.target.id), Some(aim))?;
        let mut spec = ProjectileSpec::aimed(
            context.tower.position,
            aim,
            self.projectile_speed,
            discipline,
            context.stats.attack_type.clone(),
        );
        spec.pierce = self.pierce;
        spec.lifetime = self.lifetime;
        spec.camo_detection = context.tower.camo_detection;
        spec.on_collide = HitPayload {
            damage: context.stats.damage,
            statuses: self.statuses.clone(),
        };
        if let Some(radius) = self.burst {
            spec.on_collide.damage = 0.0;
            spec.on_expire = ExpireEffect::Burst {
                radius,
                payload: HitPayload {
                    damage: context.stats.damage,
                    statuses: self.statuses.clone(),
                },
            };
        }
        out.push(spec);
        Ok(())
    }

    fn ability(&self, _tier: u32) -> Option<AbilitySpec> {
        self.ability
    }

    fn resolve_ability(&self, context: &AbilityContext<'_>, out: &mut Vec<Command>) {
        out.push(Command::GrantGold {
            amount: self.ability_gold,
            source: Some(context.tower.id),
        });
    }

    fn appearance(&self, tier: u32) -> Appearance {
        Appearance {
            sprite: "scripted-tower",
            scale_percent: 100 + 10 * tier.min(10) as u16,
        }
    }
}

/// Enemy archetype driven entirely by data.
#[derive(Clone, Debug)]
pub struct ScriptedEnemy {
    /// Kind served.
    pub kind: EnemyKind,
    /// Statistics per difficulty.
    pub block: EnemyStatBlock,
}

impl EnemyArchetype for ScriptedEnemy {
    fn kind(&self) -> EnemyKind {
        self.kind.clone()
    }

    fn stat_block(&self) -> &EnemyStatBlock {
        &self.block
    }

    fn appearance(&self) -> Appearance {
        Appearance {
            sprite: "scripted-enemy",
            scale_percent: 100,
        }
    }
}

fn tower_stats(range: f32, attack_period: u32, damage: f32, attack_type: &'static str) -> TowerStats {
    TowerStats {
        size: 10.0,
        range,
        attack_period,
        damage,
        attack_type: AttackType::new(attack_type),
        camo_detection: false,
        preference: TargetPreference::First,
    }
}

fn enemy(kind: EnemyKind, speed: f32, size: f32, hp: Tiered<f32>, reward: u32, goal_damage: u32) -> ScriptedEnemy {
    ScriptedEnemy {
        kind,
        block: EnemyStatBlock {
            speed: Tiered::uniform(speed),
            size,
            hp,
            reward: Tiered::uniform(reward),
            goal_damage: Tiered::uniform(goal_damage),
            immunities: Vec::new(),
            camouflaged: false,
        },
    }
}

fn prototype(kind: StatusKind, policy: StackingPolicy, modifier: Modifier) -> StatusPrototype {
    StatusPrototype {
        kind,
        policy,
        modifier,
        periodic: None,
        grants_immunity: Vec::new(),
    }
}

/// Catalog holding every test tower, enemy, and status.
#[must_use]
pub fn catalog() -> Catalog {
    let dart = ScriptedTower::new(
        DART,
        "nontarget",
        vec![
            tower_stats(100.0, DART_PERIOD, 10.0, SHARP),
            tower_stats(120.0, 50, 15.0, SHARP),
        ],
    );
    let homing = ScriptedTower {
        projectile_speed: 12.0,
        lifetime: 60,
        ..ScriptedTower::new(HOMING, "target", vec![tower_stats(150.0, 30, 8.0, "arcane")])
    };
    let mortar = ScriptedTower {
        projectile_speed: 10.0,
        lifetime: 90,
        burst: Some(30.0),
        ..ScriptedTower::new(MORTAR, "destinated", vec![tower_stats(300.0, 90, 20.0, "explosive")])
    };
    let broken = ScriptedTower::new(BROKEN, "boomerang", vec![tower_stats(100.0, 30, 5.0, SHARP)]);
    let unfinished =
        ScriptedTower::new(UNFINISHED, "nontarget", vec![tower_stats(100.0, 30, 5.0, SHARP)]);
    let caster = ScriptedTower {
        ability: Some(AbilitySpec {
            cost: CASTER_ABILITY_COST,
            cast_ticks: CASTER_CAST_TICKS,
            cooldown_ticks: 30,
            channeled: true,
        }),
        ability_gold: CASTER_ABILITY_GOLD,
        max_tier: 0,
        ..ScriptedTower::new(CASTER, "nontarget", vec![tower_stats(80.0, 40, 5.0, "arcane")])
    };

    let grunt = enemy(GRUNT, GRUNT_SPEED, 5.0, Tiered::new(30.0, 40.0, GRUNT_HARD_HP), GRUNT_REWARD, 1);
    let mut ghost = enemy(GHOST, 2.0, 5.0, Tiered::uniform(20.0), 15, 1);
    ghost.block.camouflaged = true;
    let mut golem = enemy(GOLEM, 1.0, 8.0, Tiered::uniform(100.0), 30, 5);
    golem.block.immunities.push(Tag::new(SHARP));
    let runner = enemy(RUNNER, 8.0, 4.0, Tiered::uniform(10.0), 5, RUNNER_GOAL_DAMAGE);

    let poison = StatusPrototype {
        periodic: Some(Periodic {
            every: POISON_PERIOD,
            payload: PeriodicPayload::Damage {
                attack_type: AttackType::new("toxic"),
            },
        }),
        ..prototype(POISON, StackingPolicy::AdditiveStack { max_stacks: 3 }, Modifier::None)
    };
    let regen = StatusPrototype {
        periodic: Some(Periodic {
            every: 5,
            payload: PeriodicPayload::Heal,
        }),
        ..prototype(REGEN, StackingPolicy::IgnoreIfPresent, Modifier::None)
    };
    let ward = StatusPrototype {
        grants_immunity: vec![POISON.tag().clone()],
        ..prototype(WARD, StackingPolicy::IgnoreIfPresent, Modifier::None)
    };
    let income = StatusPrototype {
        periodic: Some(Periodic {
            every: INCOME_PERIOD,
            payload: PeriodicPayload::Gold,
        }),
        ..prototype(INCOME, StackingPolicy::RefreshDuration, Modifier::None)
    };

    Catalog::new()
        .with_tower(dart)
        .with_tower(homing)
        .with_tower(mortar)
        .with_tower(broken)
        .with_tower(unfinished)
        .with_tower(caster)
        .with_enemy(grunt)
        .with_enemy(ghost)
        .with_enemy(golem)
        .with_enemy(runner)
        .with_status(prototype(SLOW, StackingPolicy::ReplaceIfStronger, Modifier::Speed))
        .with_status(prototype(STUN, StackingPolicy::RefreshDuration, Modifier::Disable))
        .with_status(poison)
        .with_status(regen)
        .with_status(prototype(
            OVERCLOCK,
            StackingPolicy::RefreshDuration,
            Modifier::AttackPeriod,
        ))
        .with_status(prototype(RALLY, StackingPolicy::ReplaceIfStronger, Modifier::Damage))
        .with_status(prototype(RADAR, StackingPolicy::RefreshDuration, Modifier::Detection))
        .with_status(ward)
        .with_status(income)
}

/// Straight thousand unit track with a generous, difficulty-flat economy.
#[must_use]
pub fn config() -> Config {
    Config {
        track: Track::new(vec![WorldPoint::new(0.0, 0.0), WorldPoint::new(1000.0, 0.0)]),
        starting_gold: Tiered::uniform(1000),
        starting_hp: Tiered::uniform(20),
        ..Config::default()
    }
}

/// World built from [`config`] and [`catalog`] without hooks.
#[must_use]
pub fn world() -> World {
    world_with_hooks(HookTable::new())
}

/// World built from [`config`] and [`catalog`] with the provided hooks.
#[must_use]
pub fn world_with_hooks(hooks: HookTable) -> World {
    World::new(config(), catalog(), hooks)
}

/// Places a tower and returns its identifier.
///
/// # Panics
///
/// Panics when the placement is rejected.
pub fn place(world: &mut World, kind: TowerKind, position: WorldPoint) -> TowerId {
    let mut events = Vec::new();
    apply(world, Command::PlaceTower { kind, position }, &mut events);
    events
        .iter()
        .find_map(|event| match event {
            Event::TowerPlaced { tower, .. } => Some(*tower),
            _ => None,
        })
        .unwrap_or_else(|| panic!("tower placement rejected: {events:?}"))
}

/// Death hook paying a flat bounty.
pub fn bounty_hook(_context: &HookContext<'_>, out: &mut Vec<Command>) {
    out.push(Command::GrantGold {
        amount: BOUNTY,
        source: None,
    });
}

/// Spawn hook adding a runner alongside the spawned enemy.
pub fn escort_hook(context: &HookContext<'_>, out: &mut Vec<Command>) {
    if let Some(enemy) = context.enemy() {
        out.push(Command::SpawnEnemy {
            kind: RUNNER,
            progress: enemy.progress,
        });
    }
}

/// Round end hook paying a flat amount to the tower's owner.
pub fn tithe_hook(context: &HookContext<'_>, out: &mut Vec<Command>) {
    if let EntityRef::Tower(tower) = context.subject() {
        out.push(Command::GrantGold {
            amount: TITHE,
            source: Some(tower),
        });
    }
}
