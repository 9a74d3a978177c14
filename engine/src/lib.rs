#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-tick driver wiring the authoritative world to the pure systems.
//!
//! Every call to [`Simulation::step`] runs one tick in a fixed order:
//!
//! 1. queued external commands, preceded by whatever the wave spawner emits;
//! 2. `Command::Tick`: delayed work, statuses, ability and cooldown timers,
//!    enemy movement;
//! 3. targeting, then combat, whose `Command::Engage` entries are applied;
//! 4. `Command::ResolveProjectiles`: collisions, expiry bursts and cleanup.
//!
//! The same world, inputs and spawner seed always produce the same events.

use rampart_core::{Command, Event, TowerTarget};
use rampart_system_spawning::Spawning;
use rampart_system_tower_combat::TowerCombat;
use rampart_system_tower_targeting::TowerTargeting;
use rampart_world::{self as world, query, snapshot::{self, WorldSnapshot}, World};

/// Deterministic tick loop over a [`World`].
#[derive(Debug)]
pub struct Simulation {
    world: World,
    targeting: TowerTargeting,
    combat: TowerCombat,
    spawning: Option<Spawning>,
    inputs: Vec<Command>,
    targets: Vec<TowerTarget>,
    engagements: Vec<Command>,
    events: Vec<Event>,
}

impl Simulation {
    /// Creates a simulation over the provided world without a wave spawner.
    #[must_use]
    pub fn new(world: World) -> Self {
        Self {
            world,
            targeting: TowerTargeting::new(),
            combat: TowerCombat::new(),
            spawning: None,
            inputs: Vec::new(),
            targets: Vec::new(),
            engagements: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Attaches a wave spawner consulted at the start of every tick.
    #[must_use]
    pub fn with_spawning(mut self, spawning: Spawning) -> Self {
        self.spawning = Some(spawning);
        self
    }

    /// Queues an external command for the next tick.
    pub fn submit(&mut self, command: Command) {
        self.inputs.push(command);
    }

    /// Applies a command immediately, outside the tick order.
    ///
    /// Intended for setup before the first tick, such as initial placements.
    pub fn apply_now(&mut self, command: Command) -> Vec<Event> {
        let mut events = Vec::new();
        world::apply(&mut self.world, command, &mut events);
        events
    }

    /// Replaces the world's durable state with a saved snapshot.
    ///
    /// Queued external commands are discarded with the previous state.
    pub fn restore(&mut self, saved: &WorldSnapshot) -> Vec<Event> {
        self.inputs.clear();
        self.events.clear();
        let mut events = Vec::new();
        snapshot::restore(&mut self.world, saved, &mut events);
        events
    }

    /// Runs a single tick and returns the events it produced.
    pub fn step(&mut self) -> &[Event] {
        let mut events = std::mem::take(&mut self.events);
        let mut commands = Vec::new();

        if let Some(spawning) = self.spawning.as_mut() {
            let alive = query::enemy_view(&self.world).len();
            spawning.handle(&events, alive, &mut commands);
        }
        commands.append(&mut self.inputs);
        events.clear();

        for command in commands {
            world::apply(&mut self.world, command, &mut events);
        }

        world::apply(&mut self.world, Command::Tick, &mut events);

        let towers = query::tower_view(&self.world);
        let enemies = query::enemy_view(&self.world);
        self.targeting.handle(&towers, &enemies, &mut self.targets);
        self.engagements.clear();
        self.combat
            .handle(&towers, &self.targets, &mut self.engagements);
        for command in self.engagements.drain(..) {
            world::apply(&mut self.world, command, &mut events);
        }

        world::apply(&mut self.world, Command::ResolveProjectiles, &mut events);

        tracing::trace!(
            tick = query::tick(&self.world),
            events = events.len(),
            targets = self.targets.len(),
            "tick simulated"
        );
        self.events = events;
        &self.events
    }

    /// Runs up to `ticks` ticks, handing each tick's events to the observer.
    ///
    /// Stops early once the player is defeated or the attached spawner has
    /// released and completed every wave. Returns the number of ticks run.
    pub fn run<F>(&mut self, ticks: u64, mut observer: F) -> u64
    where
        F: FnMut(&[Event]),
    {
        let mut ran = 0;
        while ran < ticks {
            observer(self.step());
            ran += 1;
            if self.is_over() {
                tracing::debug!(ticks = ran, "simulation over");
                break;
            }
        }
        ran
    }

    /// Reports whether the game reached a terminal state.
    #[must_use]
    pub fn is_over(&self) -> bool {
        if query::is_defeated(&self.world) {
            return true;
        }
        self.spawning
            .as_ref()
            .is_some_and(|spawning| spawning.is_finished())
    }

    /// Targets chosen during the most recent tick.
    #[must_use]
    pub fn last_targets(&self) -> &[TowerTarget] {
        &self.targets
    }

    /// Read-only access to the world for queries.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Attached wave spawner, if any.
    #[must_use]
    pub fn spawning(&self) -> Option<&Spawning> {
        self.spawning.as_ref()
    }
}
