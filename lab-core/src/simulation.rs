//! Per-tick orchestrator.
//!
//! One call to [`Simulation::step`] advances a whole scene by one tick and
//! returns a new snapshot; the input is never mutated. Within a tick:
//!
//! 1. Tracks settle, tilt, tip or fall ([`crate::stability`]).
//! 2. Atwood pairings are detected against the updated tracks.
//! 3. Every other body is integrated ([`crate::integrator`]), except hangers
//!    driven by an Atwood pairing.
//! 4. String constraints are applied ([`crate::strings`]).

use tracing::trace;

use crate::config::{LabConfig, TableBounds};
use crate::integrator::Integrator;
use crate::stability::update_track;
use crate::strings::{atwood_pairs, StringSolver};
use crate::types::{ItemId, World};

/// Result of one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    pub world: World,
    /// Items whose state differs from the input snapshot.
    pub changed: Vec<ItemId>,
}

#[derive(Debug, Clone, Default)]
pub struct Simulation {
    config: LabConfig,
}

impl Simulation {
    pub fn new(config: LabConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LabConfig {
        &self.config
    }

    /// Advance `world` by `dt` seconds on a stage `stage_width` px wide.
    ///
    /// `dt` is clamped to `[0, max_dt]`; a zero tick returns the scene as is.
    pub fn step(&self, world: &World, dt: f64, stage_width: f64) -> StepOutput {
        let dt = self.config.clamp_dt(dt);
        let table = TableBounds::centered(stage_width, &self.config);
        let gravity = self.config.gravity_px();
        let mut items = world.items.clone();

        if dt > 0.0 {
            for i in 0..items.len() {
                if items[i].is_track() && items[i].is_simulated() {
                    items[i] = update_track(&items[i], &items, &table, &self.config, dt);
                }
            }

            let pairs = atwood_pairs(&world.connections, &items, &table);

            let settled = items.clone();
            let integrator = Integrator::new(&settled, &table, gravity, dt);
            for item in items.iter_mut() {
                if item.is_track() || pairs.iter().any(|p| p.hanger == item.id) {
                    continue;
                }
                *item = integrator.advance(item);
            }

            StringSolver::new(&table, gravity, dt).solve(&world.connections, &pairs, &mut items);
            trace!(dt, items = items.len(), atwood_pairs = pairs.len(), "tick");
        }

        let changed = items
            .iter()
            .zip(&world.items)
            .filter(|(after, before)| after != before)
            .map(|(after, _)| after.id)
            .collect();

        StepOutput {
            world: World::new(items, world.connections.clone()),
            changed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Item, ItemKind, MassHanger, Vec2};

    fn hanger(id: u32, x: f64, y: f64) -> Item {
        Item::new(
            ItemId(id),
            ItemKind::MassHanger(MassHanger { mass: 0.05 }),
            Vec2::new(20.0, 60.0),
        )
        .placed_at(Vec2::new(x, y))
    }

    #[test]
    fn test_step_does_not_mutate_input() {
        let world = World::new(vec![hanger(1, 400.0, 100.0)], Vec::new());
        let before = world.clone();
        let out = Simulation::default().step(&world, 0.016, 1000.0);
        assert_eq!(world, before);
        assert!(out.world.items[0].pos.y > 100.0);
        assert_eq!(out.changed, vec![ItemId(1)]);
    }

    #[test]
    fn test_resting_and_stored_items_unchanged() {
        let mut stored = hanger(2, 0.0, 0.0);
        stored.in_tray = true;
        let resting = hanger(1, 400.0, 380.0);
        let world = World::new(vec![resting, stored], Vec::new());

        let out = Simulation::default().step(&world, 0.016, 1000.0);
        assert!(out.changed.is_empty(), "changed: {:?}", out.changed);
        assert_eq!(out.world, world);
    }

    #[test]
    fn test_long_frames_are_clamped() {
        let world = World::new(vec![hanger(1, 400.0, 100.0)], Vec::new());
        let sim = Simulation::default();
        let clamped = sim.step(&world, 5.0, 1000.0);
        let max = sim.step(&world, 0.05, 1000.0);
        assert_eq!(clamped.world, max.world);
    }

    #[test]
    fn test_zero_tick_is_identity() {
        let world = World::new(vec![hanger(1, 400.0, 100.0)], Vec::new());
        let out = Simulation::default().step(&world, 0.0, 1000.0);
        assert_eq!(out.world, world);
        assert!(out.changed.is_empty());
    }
}
