//! Damage and death pipeline: the only path that mutates enemy hit points,
//! the player's hit points, or the player's gold.

use rampart_core::{AttackType, EnemyId, EntityRef, Event, RejectionReason, TowerId};

use crate::{
    hooks::{HookContext, HookEvent},
    World,
};

/// Tower counter tracking enemies killed.
pub const COUNTER_KILLS: &str = "kills";
/// Tower counter tracking damage dealt, rounded to whole points.
pub const COUNTER_DAMAGE: &str = "damage";
/// Tower counter tracking gold generated.
pub const COUNTER_GOLD: &str = "gold";

/// Result of a hit point change.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum HpChange {
    Damaged,
    Killed,
    Healed,
    Absorbed,
    Unchanged,
    Stale,
}

impl World {
    /// Applies a signed hit point change to an enemy.
    ///
    /// Damage passes the immunity gate and is scaled by the source tower's
    /// damage factor; healing is clamped to maximum hit points. Reaching zero
    /// marks the enemy expired, grants its reward once, and runs its death
    /// hook. Expired or missing enemies are left untouched.
    pub(crate) fn change_hp(
        &mut self,
        id: EnemyId,
        delta: f32,
        attack_type: Option<&AttackType>,
        source: Option<TowerId>,
        out_events: &mut Vec<Event>,
    ) -> HpChange {
        if !self.enemies.get(id).is_some_and(|enemy| !enemy.expired) {
            tracing::trace!(enemy = %id, "hit point change on stale enemy");
            return HpChange::Stale;
        }

        if delta > 0.0 {
            return self.heal(id, delta, out_events);
        }
        if delta == 0.0 || delta.is_nan() {
            return HpChange::Unchanged;
        }

        if let Some(attack_type) = attack_type {
            if self.is_immune_to(EntityRef::Enemy(id), attack_type.tag()) {
                out_events.push(Event::AttackAbsorbed {
                    enemy: id,
                    tag: attack_type.tag().clone(),
                });
                return HpChange::Absorbed;
            }
        }

        let factor = source
            .filter(|tower| self.towers.contains(*tower))
            .map_or(1.0, |tower| {
                self.modifiers(EntityRef::Tower(tower)).damage_factor
            });
        let Some(enemy) = self.enemies.get_mut(id) else {
            return HpChange::Stale;
        };
        let before = enemy.hp;
        enemy.hp = (before + delta * factor).max(0.0);
        let dealt = before - enemy.hp;
        let hp_after = enemy.hp;
        let killed = hp_after <= 0.0;
        if killed {
            enemy.expired = true;
        }
        let reward = enemy.stats.reward;
        let kind = enemy.kind.clone();

        out_events.push(Event::DamageDealt {
            enemy: id,
            amount: dealt,
            hp_after,
            source,
        });
        if let Some(tower) = source {
            self.add_counter(tower, COUNTER_DAMAGE, dealt.round() as i64);
        }
        if !killed {
            return HpChange::Damaged;
        }

        self.gold = self.gold.saturating_add(reward);
        tracing::debug!(enemy = %id, %kind, reward, ?source, "enemy killed");
        out_events.push(Event::EnemyKilled {
            enemy: id,
            reward,
            source,
        });
        if let Some(tower) = source {
            self.add_counter(tower, COUNTER_KILLS, 1);
        }

        if let Some(hook) = self.hooks.single(HookEvent::Death, kind.tag()) {
            let mut commands = Vec::new();
            hook(&HookContext::new(self, EntityRef::Enemy(id)), &mut commands);
            self.pending.extend(commands);
        }
        HpChange::Killed
    }

    fn heal(&mut self, id: EnemyId, amount: f32, out_events: &mut Vec<Event>) -> HpChange {
        let Some(enemy) = self.enemies.get_mut(id) else {
            return HpChange::Stale;
        };
        let before = enemy.hp;
        enemy.hp = (before + amount).min(enemy.stats.max_hp);
        let restored = enemy.hp - before;
        if restored <= 0.0 {
            return HpChange::Unchanged;
        }
        out_events.push(Event::HealApplied {
            enemy: id,
            amount: restored,
            hp_after: enemy.hp,
        });
        HpChange::Healed
    }

    /// Adds gold to the economy, crediting the source tower.
    pub(crate) fn grant_gold(
        &mut self,
        amount: u32,
        source: Option<TowerId>,
        out_events: &mut Vec<Event>,
    ) {
        self.gold = self.gold.saturating_add(amount);
        if let Some(tower) = source {
            self.add_counter(tower, COUNTER_GOLD, i64::from(amount));
        }
        out_events.push(Event::GoldGranted { amount, source });
    }

    /// Deducts `cost` from the player's gold.
    pub(crate) fn spend(
        &mut self,
        cost: u32,
        out_events: &mut Vec<Event>,
    ) -> Result<(), RejectionReason> {
        if self.gold < cost {
            return Err(RejectionReason::InsufficientGold {
                cost,
                available: self.gold,
            });
        }
        self.gold -= cost;
        out_events.push(Event::GoldSpent {
            amount: cost,
            remaining: self.gold,
        });
        Ok(())
    }

    /// Applies goal damage from a leaking enemy to the player.
    pub(crate) fn damage_player(&mut self, enemy: EnemyId, damage: u32, out_events: &mut Vec<Event>) {
        self.player_hp = self.player_hp.saturating_sub(damage);
        tracing::debug!(%enemy, damage, player_hp = self.player_hp, "enemy leaked");
        out_events.push(Event::EnemyLeaked { enemy, damage });
        if self.player_hp == 0 && !self.defeated {
            self.defeated = true;
            tracing::info!(tick = self.tick, round = self.round, "player defeated");
            out_events.push(Event::PlayerDefeated);
        }
    }

    pub(crate) fn add_counter(&mut self, tower: TowerId, name: &str, amount: i64) {
        let Some(state) = self.towers.get_mut(tower) else {
            tracing::trace!(%tower, name, "counter update on missing tower");
            return;
        };
        let counter = state.counters.entry(name.to_owned()).or_insert(0);
        *counter = counter.saturating_add(amount);
    }
}

#[cfg(test)]
mod tests {
    use rampart_core::{AttackType, Command, EnemyId, Event, WorldPoint};

    use super::HpChange;
    use crate::{apply, query, test_content as content, World};

    fn spawn(world: &mut World, kind: rampart_core::EnemyKind) -> EnemyId {
        let mut events = Vec::new();
        apply(
            world,
            Command::SpawnEnemy {
                kind,
                progress: 10.0,
            },
            &mut events,
        );
        events
            .iter()
            .find_map(|event| match event {
                Event::EnemySpawned { enemy, .. } => Some(*enemy),
                _ => None,
            })
            .expect("spawned")
    }

    #[test]
    fn overkill_clamps_to_zero_and_rewards_once() {
        let mut world = content::world();
        let enemy = spawn(&mut world, content::GRUNT);
        let gold_before = query::gold(&world);
        let mut events = Vec::new();

        let first = world.change_hp(enemy, -60.0, None, None, &mut events);
        let second = world.change_hp(enemy, -60.0, None, None, &mut events);

        assert_eq!(first, HpChange::Killed);
        assert_eq!(second, HpChange::Stale);
        let snapshot = query::enemy(&world, enemy).expect("kept until cleanup");
        assert_eq!(snapshot.hp, 0.0);
        assert!(snapshot.expired);
        assert_eq!(query::gold(&world), gold_before + content::GRUNT_REWARD);
        assert_eq!(
            events
                .iter()
                .filter(|event| matches!(event, Event::EnemyKilled { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn death_hook_runs_exactly_once() {
        let mut world = content::world_with_hooks(
            crate::HookTable::new().on_death(content::GRUNT, content::bounty_hook),
        );
        let enemy = spawn(&mut world, content::GRUNT);
        let gold_before = query::gold(&world);
        let mut events = Vec::new();

        for _ in 0..3 {
            apply(
                &mut world,
                Command::ChangeHp {
                    enemy,
                    delta: -60.0,
                    attack_type: None,
                    source: None,
                },
                &mut events,
            );
        }

        let bounties = events
            .iter()
            .filter(|event| {
                matches!(
                    event,
                    Event::GoldGranted {
                        amount: content::BOUNTY,
                        ..
                    }
                )
            })
            .count();
        assert_eq!(bounties, 1);
        assert_eq!(
            query::gold(&world),
            gold_before + content::GRUNT_REWARD + content::BOUNTY
        );
    }

    #[test]
    fn immune_enemy_absorbs_matching_attack_type() {
        let mut world = content::world();
        let enemy = spawn(&mut world, content::GOLEM);
        let mut events = Vec::new();

        let outcome = world.change_hp(
            enemy,
            -10.0,
            Some(&AttackType::new(content::SHARP)),
            None,
            &mut events,
        );

        assert_eq!(outcome, HpChange::Absorbed);
        let snapshot = query::enemy(&world, enemy).expect("alive");
        assert_eq!(snapshot.hp, snapshot.max_hp);
    }

    #[test]
    fn healing_clamps_to_max_hp() {
        let mut world = content::world();
        let enemy = spawn(&mut world, content::GRUNT);
        let mut events = Vec::new();

        let _ = world.change_hp(enemy, -15.0, None, None, &mut events);
        assert_eq!(
            world.change_hp(enemy, 100.0, None, None, &mut events),
            HpChange::Healed
        );
        assert_eq!(
            world.change_hp(enemy, 5.0, None, None, &mut events),
            HpChange::Unchanged
        );

        let snapshot = query::enemy(&world, enemy).expect("alive");
        assert_eq!(snapshot.hp, snapshot.max_hp);
    }

    #[test]
    fn damage_credits_source_tower_counters() {
        let mut world = content::world();
        let tower = content::place(&mut world, content::DART, WorldPoint::new(0.0, 50.0));
        let enemy = spawn(&mut world, content::GRUNT);
        let mut events = Vec::new();

        let _ = world.change_hp(enemy, -25.0, None, Some(tower), &mut events);
        let _ = world.change_hp(enemy, -25.0, None, Some(tower), &mut events);

        assert_eq!(query::counter(&world, tower, super::COUNTER_DAMAGE), 40);
        assert_eq!(query::counter(&world, tower, super::COUNTER_KILLS), 1);
    }

    #[test]
    fn leaks_defeat_the_player_once() {
        let mut world = content::world();
        let mut events = Vec::new();
        let hp = query::player_hp(&world);

        for _ in 0..hp + 2 {
            world.damage_player(EnemyId::new(1), 1, &mut events);
        }

        assert_eq!(query::player_hp(&world), 0);
        assert!(query::is_defeated(&world));
        assert_eq!(
            events
                .iter()
                .filter(|event| matches!(event, Event::PlayerDefeated))
                .count(),
            1
        );
    }
}
