//! TOML scenario files describing the track, economy, waves and opening
//! tower placements.

use std::{fs, path::Path};

use anyhow::{ensure, Context, Result};
use rampart_core::{Difficulty, Tiered, TowerKind, Track, WorldPoint};
use rampart_system_spawning::{Wave, WaveEntry};
use rampart_world::Config;
use serde::{Deserialize, Serialize};

use crate::content;

/// Tower placed before the first tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct Placement {
    /// Kind of tower to purchase.
    pub kind: TowerKind,
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
}

/// Complete description of a headless game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    /// Difficulty used unless overridden on the command line.
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Seed for the wave shuffler unless overridden on the command line.
    #[serde(default)]
    pub seed: u64,
    /// Ticks between the end of a round and the next wave.
    #[serde(default)]
    pub round_gap: u32,
    /// Track waypoints as `[x, y]` pairs.
    pub track: Vec<[f32; 2]>,
    /// Starting gold per difficulty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_gold: Option<Tiered<u32>>,
    /// Starting player hit points per difficulty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_hp: Option<Tiered<u32>>,
    /// Towers purchased before the first tick.
    #[serde(default)]
    pub towers: Vec<Placement>,
    /// Waves released in order.
    pub waves: Vec<Wave>,
}

impl Scenario {
    /// Parses a scenario from TOML text.
    pub(crate) fn parse(text: &str) -> Result<Self> {
        let scenario: Self = toml::from_str(text).context("malformed scenario")?;
        ensure!(
            scenario.track.len() >= 2,
            "scenario track needs at least two waypoints, found {}",
            scenario.track.len()
        );
        ensure!(!scenario.waves.is_empty(), "scenario declares no waves");
        Ok(scenario)
    }

    /// Reads and parses a scenario file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid scenario {}", path.display()))
    }

    /// Scenario used when no file is provided.
    pub(crate) fn builtin() -> Self {
        let entry = |kind, count| WaveEntry { kind, count };
        Self {
            difficulty: Difficulty::Medium,
            seed: 0x0bad_5eed,
            round_gap: 90,
            track: vec![[0.0, 0.0], [300.0, 0.0], [300.0, 200.0], [700.0, 200.0]],
            starting_gold: Some(Tiered::new(1_000, 850, 800)),
            starting_hp: None,
            towers: vec![
                Placement {
                    kind: content::DART,
                    x: 150.0,
                    y: 30.0,
                },
                Placement {
                    kind: content::FROST,
                    x: 330.0,
                    y: 100.0,
                },
                Placement {
                    kind: content::DART,
                    x: 450.0,
                    y: 170.0,
                },
            ],
            waves: vec![
                Wave {
                    interval: 30,
                    entries: vec![entry(content::GRUNT, 8), entry(content::SCOUT, 4)],
                },
                Wave {
                    interval: 25,
                    entries: vec![
                        entry(content::GRUNT, 10),
                        entry(content::SHADE, 3),
                        entry(content::MEDIC, 2),
                    ],
                },
                Wave {
                    interval: 40,
                    entries: vec![entry(content::BRUTE, 2), entry(content::SPLITTER, 4)],
                },
            ],
        }
    }

    /// World configuration described by the scenario.
    pub(crate) fn world_config(&self) -> Config {
        let defaults = Config::default();
        Config {
            track: Track::new(
                self.track
                    .iter()
                    .map(|[x, y]| WorldPoint::new(*x, *y))
                    .collect(),
            ),
            starting_gold: self.starting_gold.unwrap_or(defaults.starting_gold),
            starting_hp: self.starting_hp.unwrap_or(defaults.starting_hp),
            ..defaults
        }
    }
}
