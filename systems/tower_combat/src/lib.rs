#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that emits engagement commands from targeting data.

use rampart_core::{Command, TowerTarget, TowerView};

/// Tower combat system that queues engagement commands for ready towers.
#[derive(Debug, Default)]
pub struct TowerCombat {
    scratch: Vec<Command>,
}

impl TowerCombat {
    /// Creates a new tower combat system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits `Command::Engage` entries for targeted towers ready to attack.
    ///
    /// Targets naming towers missing from the view, still cooling down or
    /// unable to attack are dropped. Commands keep the order of the targets.
    pub fn handle(&mut self, towers: &TowerView, targets: &[TowerTarget], out: &mut Vec<Command>) {
        if targets.is_empty() {
            return;
        }

        self.scratch.clear();

        for target in targets {
            let Some(snapshot) = towers.get(target.tower) else {
                continue;
            };
            if snapshot.cooldown == 0 && snapshot.can_attack() {
                self.scratch.push(Command::Engage {
                    tower: target.tower,
                    enemy: target.enemy,
                });
            }
        }

        if self.scratch.is_empty() {
            return;
        }

        out.reserve(self.scratch.len());
        out.append(&mut self.scratch);
    }
}
