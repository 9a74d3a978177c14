#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic wave spawner responsible for emitting enemy spawn and round
//! completion commands.

use std::collections::VecDeque;

use rampart_core::{Command, EnemyKind, Event};
use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Group of identical enemies within a wave.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaveEntry {
    /// Kind of enemy spawned.
    pub kind: EnemyKind,
    /// Number of enemies of this kind.
    pub count: u32,
}

/// Enemies released during a single round.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Wave {
    /// Ticks between consecutive spawns; zero releases one enemy per tick.
    pub interval: u32,
    /// Groups making up the wave. Their members are shuffled together.
    pub entries: Vec<WaveEntry>,
}

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Debug)]
pub struct Config {
    waves: Vec<Wave>,
    rng_seed: u64,
    round_gap: u32,
}

impl Config {
    /// Creates a new configuration using the provided waves and seed.
    #[must_use]
    pub fn new(waves: Vec<Wave>, rng_seed: u64) -> Self {
        Self {
            waves,
            rng_seed,
            round_gap: 0,
        }
    }

    /// Sets the number of ticks to wait between the end of a round and the
    /// first spawn of the next.
    #[must_use]
    pub fn with_round_gap(mut self, round_gap: u32) -> Self {
        self.round_gap = round_gap;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Waiting { remaining: u32 },
    Releasing,
    Draining,
    Finished,
}

/// Pure system that releases configured waves one round at a time.
///
/// A wave's enemies are shuffled deterministically from the seed and released
/// every `interval` ticks. Once the queue is empty and no enemy remains on the
/// track, `Command::EndRound` is emitted and the next wave starts after the
/// configured gap.
#[derive(Debug)]
pub struct Spawning {
    waves: Vec<Wave>,
    round_gap: u32,
    rng: ChaCha8Rng,
    queue: VecDeque<EnemyKind>,
    wave_index: usize,
    countdown: u32,
    phase: Phase,
}

impl Spawning {
    /// Creates a new spawning system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let phase = if config.waves.is_empty() {
            Phase::Finished
        } else {
            Phase::Waiting { remaining: 0 }
        };
        Self {
            waves: config.waves,
            round_gap: config.round_gap,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            queue: VecDeque::new(),
            wave_index: 0,
            countdown: 0,
            phase,
        }
    }

    /// Reports whether every wave was released and completed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Number of waves fully completed.
    #[must_use]
    pub fn completed_waves(&self) -> usize {
        match self.phase {
            Phase::Finished => self.waves.len(),
            Phase::Waiting { .. } | Phase::Releasing | Phase::Draining => self.wave_index,
        }
    }

    /// Consumes the events of a tick and the number of enemies still on the
    /// track to emit spawn and round completion commands.
    pub fn handle(&mut self, events: &[Event], enemies_alive: usize, out: &mut Vec<Command>) {
        if self.phase == Phase::Finished {
            return;
        }

        let mut elapsed = 0_u32;
        for event in events {
            match event {
                Event::TimeAdvanced { .. } => elapsed = elapsed.saturating_add(1),
                Event::PlayerDefeated => {
                    tracing::debug!(wave = self.wave_index, "player defeated; spawning stops");
                    self.queue.clear();
                    self.phase = Phase::Finished;
                    return;
                }
                _ => {}
            }
        }

        for _ in 0..elapsed {
            self.step(enemies_alive, out);
            if self.phase == Phase::Finished {
                break;
            }
        }
    }

    fn step(&mut self, enemies_alive: usize, out: &mut Vec<Command>) {
        match self.phase {
            Phase::Waiting { remaining } if remaining > 0 => {
                self.phase = Phase::Waiting {
                    remaining: remaining - 1,
                };
            }
            Phase::Waiting { .. } => {
                self.fill_queue();
                self.countdown = 0;
                self.phase = Phase::Releasing;
                self.release(out);
            }
            Phase::Releasing => self.release(out),
            Phase::Draining => {
                if enemies_alive == 0 {
                    self.complete_wave(out);
                }
            }
            Phase::Finished => {}
        }
    }

    fn release(&mut self, out: &mut Vec<Command>) {
        if self.countdown > 0 {
            self.countdown -= 1;
            return;
        }

        if let Some(kind) = self.queue.pop_front() {
            out.push(Command::SpawnEnemy {
                kind,
                progress: 0.0,
            });
            self.countdown = self.current_interval();
        }

        if self.queue.is_empty() {
            self.phase = Phase::Draining;
        }
    }

    fn complete_wave(&mut self, out: &mut Vec<Command>) {
        out.push(Command::EndRound);
        self.wave_index += 1;
        tracing::debug!(completed = self.wave_index, "wave completed");
        self.phase = if self.wave_index >= self.waves.len() {
            Phase::Finished
        } else {
            Phase::Waiting {
                remaining: self.round_gap,
            }
        };
    }

    fn fill_queue(&mut self) {
        self.queue.clear();
        let Some(wave) = self.waves.get(self.wave_index) else {
            return;
        };

        let mut kinds: Vec<EnemyKind> = wave
            .entries
            .iter()
            .flat_map(|entry| std::iter::repeat(entry.kind.clone()).take(entry.count as usize))
            .collect();
        kinds.shuffle(&mut self.rng);
        tracing::debug!(
            wave = self.wave_index,
            enemies = kinds.len(),
            "wave started"
        );
        self.queue.extend(kinds);
    }

    fn current_interval(&self) -> u32 {
        self.waves
            .get(self.wave_index)
            .map_or(0, |wave| wave.interval.saturating_sub(1))
    }
}
