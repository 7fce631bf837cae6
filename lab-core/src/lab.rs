//! A lab session: the scene plus the editing operations a host drives it with.
//!
//! The host calls the editing methods from its input handlers and
//! [`Lab::step`] once per frame. Everything runs on the caller's thread.
//!
//! # Example
//! ```ignore
//! let mut lab = Lab::new(LabConfig::default(), Catalog::builtin()).seeded(42);
//! let track = lab.spawn(ItemType::Track);
//! lab.place(track, Vec2::new(200.0, 410.0))?;
//! lab.set_foot_height(track, Side::Right, 0.0)?;
//! let cart = lab.spawn(ItemType::Cart);
//! lab.place(cart, Vec2::new(300.0, 370.0))?;
//! for _ in 0..60 {
//!     lab.step(1.0 / 60.0);
//! }
//! ```

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, trace};

use crate::attach::attach_point;
use crate::catalog::Catalog;
use crate::collision::separate_after_drop;
use crate::config::LabConfig;
use crate::error::LabError;
use crate::geometry::{nearest_track_under, resting_y_on};
use crate::recording::{Recorder, Recording};
use crate::sensor;
use crate::simulation::Simulation;
use crate::strings::string_path;
use crate::types::{
    Endpoint, Facing, Item, ItemId, ItemKind, ItemType, Side, StringConnection, StringEnd, Vec2, World,
};

/// Width of the playable area when the host does not set one (px).
const DEFAULT_STAGE_WIDTH: f64 = 1000.0;

pub struct Lab {
    world: World,
    catalog: Catalog,
    simulation: Simulation,
    rng: StdRng,
    next_id: u32,
    stage_width: f64,
    time: f64,
    recorder: Option<Recorder>,
    finished: Option<Recording>,
}

impl Lab {
    pub fn new(config: LabConfig, catalog: Catalog) -> Self {
        Self {
            world: World::default(),
            catalog,
            simulation: Simulation::new(config),
            rng: StdRng::from_entropy(),
            next_id: 1,
            stage_width: DEFAULT_STAGE_WIDTH,
            time: 0.0,
            recorder: None,
            finished: None,
        }
    }

    /// Use a fixed seed for the random track tilts.
    pub fn seeded(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn config(&self) -> &LabConfig {
        self.simulation.config()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn items(&self) -> &[Item] {
        &self.world.items
    }

    /// Simulated seconds since the session started.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn stage_width(&self) -> f64 {
        self.stage_width
    }

    pub fn set_stage_width(&mut self, width: f64) {
        self.stage_width = width.max(0.0);
    }

    pub fn item(&self, id: ItemId) -> Result<&Item, LabError> {
        self.world.get(id).ok_or(LabError::UnknownItem(id))
    }

    fn item_mut(&mut self, id: ItemId) -> Result<&mut Item, LabError> {
        self.world.get_mut(id).ok_or(LabError::UnknownItem(id))
    }

    fn item_of_type(&self, id: ItemId, expected: ItemType) -> Result<&Item, LabError> {
        let item = self.item(id)?;
        let actual = item.item_type();
        if actual != expected {
            return Err(LabError::WrongKind { id, expected, actual });
        }
        Ok(item)
    }

    fn placed(&self, id: ItemId) -> Result<&Item, LabError> {
        let item = self.item(id)?;
        if !item.is_placed() {
            return Err(LabError::InTray(id));
        }
        Ok(item)
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Create a new item of type `ty` in the tray.
    pub fn spawn(&mut self, ty: ItemType) -> ItemId {
        let id = ItemId(self.next_id);
        self.next_id += 1;
        let item = self.catalog.instantiate(ty, id, &mut self.rng);
        if ty == ItemType::String {
            self.world.connections.push(StringConnection::new(id));
        }
        self.world.items.push(item);
        info!(item = %id, kind = ?ty, "spawned");
        id
    }

    /// Put an item into the scene at `pos` with all motion cleared.
    pub fn place(&mut self, id: ItemId, pos: Vec2) -> Result<(), LabError> {
        let item = self.item_mut(id)?;
        item.pos = pos;
        item.in_tray = false;
        item.dragging = false;
        item.locked_to = None;
        reset_motion(item);
        self.snap_cart(id);
        info!(item = %id, x = pos.x, y = pos.y, "placed");
        Ok(())
    }

    /// Return an item to the tray, cutting every string tied to it.
    pub fn recall(&mut self, id: ItemId) -> Result<(), LabError> {
        let item = self.item_mut(id)?;
        item.in_tray = true;
        item.dragging = false;
        item.locked_to = None;
        reset_motion(item);
        if let Some(cart) = item.as_cart_mut() {
            cart.on_track = false;
        }
        self.sever(id);
        info!(item = %id, "recalled to tray");
        Ok(())
    }

    /// Delete an item and its connections.
    pub fn remove(&mut self, id: ItemId) -> Result<(), LabError> {
        self.item(id)?;
        self.world.items.retain(|i| i.id != id);
        self.world.connections.retain(|c| c.string_id != id);
        self.sever(id);
        if self.recorder.as_ref().is_some_and(|r| r.detector() == id) {
            self.recorder = None;
        }
        info!(item = %id, "removed");
        Ok(())
    }

    /// Clear every reference to `id`: string ends, their fixed lengths, and locks.
    fn sever(&mut self, id: ItemId) {
        let mut loosened = Vec::new();
        for conn in &mut self.world.connections {
            if conn.string_id == id {
                conn.a = None;
                conn.b = None;
                loosened.push(conn.string_id);
                continue;
            }
            for end in [StringEnd::A, StringEnd::B] {
                let slot = conn.end_mut(end);
                if slot.as_ref().is_some_and(|e| e.item_id == id) {
                    *slot = None;
                    loosened.push(conn.string_id);
                }
            }
        }
        for item in &mut self.world.items {
            if loosened.contains(&item.id) {
                set_string_length(item, None);
            }
            if item.locked_to == Some(id) {
                item.locked_to = None;
            }
        }
    }

    // -------------------------------------------------------------------------
    // Manual moves
    // -------------------------------------------------------------------------

    pub fn begin_drag(&mut self, id: ItemId) -> Result<(), LabError> {
        self.placed(id)?;
        let item = self.item_mut(id)?;
        item.dragging = true;
        item.locked_to = None;
        reset_motion(item);
        debug!(item = %id, "drag started");
        Ok(())
    }

    pub fn drag_to(&mut self, id: ItemId, pos: Vec2) -> Result<(), LabError> {
        self.placed(id)?;
        let item = self.item_mut(id)?;
        item.pos = pos;
        item.vel = Vec2::ZERO;
        Ok(())
    }

    /// Release a dragged item: push it out of any overlap and re-seat carts.
    pub fn end_drag(&mut self, id: ItemId) -> Result<(), LabError> {
        self.placed(id)?;
        let item = self.item_mut(id)?;
        item.dragging = false;
        reset_motion(item);

        let separated = separate_after_drop(self.item(id)?, &self.world.items);
        if let Some(pos) = separated {
            self.item_mut(id)?.pos = pos;
            debug!(item = %id, x = pos.x, y = pos.y, "separated after drop");
        }
        self.snap_cart(id);
        info!(item = %id, "dropped");
        Ok(())
    }

    /// Seat a cart on the track under it, or mark it off-track.
    fn snap_cart(&mut self, id: ItemId) {
        let Some(item) = self.world.get(id) else {
            return;
        };
        if item.as_cart().is_none() || !item.is_placed() {
            return;
        }
        let seat = nearest_track_under(item, &self.world.items).map(|t| resting_y_on(t, item));
        if let Some(item) = self.world.get_mut(id) {
            if let Some(y) = seat {
                item.pos.y = y;
            }
            if let Some(cart) = item.as_cart_mut() {
                cart.on_track = seat.is_some();
            }
        }
    }

    // -------------------------------------------------------------------------
    // Adjustments
    // -------------------------------------------------------------------------

    /// Set a leveling-screw extension (px) on one foot of a track.
    pub fn set_foot_height(&mut self, track: ItemId, side: Side, offset: f64) -> Result<(), LabError> {
        self.item_of_type(track, ItemType::Track)?;
        if let Some(t) = self.item_mut(track)?.as_track_mut() {
            match side {
                Side::Left => t.left_foot = offset,
                Side::Right => t.right_foot = offset,
            }
        }
        debug!(track = %track, ?side, offset, "foot height set");
        Ok(())
    }

    pub fn set_facing(&mut self, detector: ItemId, facing: Facing) -> Result<(), LabError> {
        self.item_of_type(detector, ItemType::MotionDetector)?;
        if let ItemKind::MotionDetector(d) = &mut self.item_mut(detector)?.kind {
            d.facing = facing;
        }
        Ok(())
    }

    /// Change the mass of a cart or mass hanger (kg).
    pub fn set_mass(&mut self, id: ItemId, mass: f64) -> Result<(), LabError> {
        let item = self.item_mut(id)?;
        match &mut item.kind {
            ItemKind::Cart(c) => c.mass = mass,
            ItemKind::MassHanger(h) => h.mass = mass,
            other => {
                return Err(LabError::Massless {
                    id,
                    actual: other.item_type(),
                })
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Strings
    // -------------------------------------------------------------------------

    /// Tie one end of a string to a named attach point.
    ///
    /// Once both ends are tied the string's current path length becomes its
    /// fixed length.
    pub fn attach_string(
        &mut self,
        string: ItemId,
        end: StringEnd,
        target: ItemId,
        point: &str,
    ) -> Result<(), LabError> {
        self.item_of_type(string, ItemType::String)?;
        self.placed(string)?;
        let target_item = self.placed(target)?;
        if attach_point(target_item, point).is_none() {
            return Err(LabError::UnknownAttachPoint {
                id: target,
                point: point.to_string(),
            });
        }

        let conn = match self.world.connections.iter().position(|c| c.string_id == string) {
            Some(i) => &mut self.world.connections[i],
            None => {
                self.world.connections.push(StringConnection::new(string));
                let last = self.world.connections.len() - 1;
                &mut self.world.connections[last]
            }
        };
        *conn.end_mut(end) = Some(Endpoint::new(target, point));

        let length = self
            .world
            .connection(string)
            .and_then(|c| string_path(c, &self.world.items))
            .map(|p| p.length);
        set_string_length(self.item_mut(string)?, length);
        info!(string = %string, ?end, target = %target, point, length = ?length, "string attached");
        Ok(())
    }

    pub fn detach_string(&mut self, string: ItemId, end: StringEnd) -> Result<(), LabError> {
        self.item_of_type(string, ItemType::String)?;
        if let Some(conn) = self.world.connections.iter_mut().find(|c| c.string_id == string) {
            *conn.end_mut(end) = None;
        }
        set_string_length(self.item_mut(string)?, None);
        info!(string = %string, ?end, "string detached");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Simulation
    // -------------------------------------------------------------------------

    /// Advance the scene by one frame of `frame_dt` real seconds. Returns the
    /// items that changed.
    ///
    /// Physics advances by the clamped tick. An active recording runs on the
    /// unclamped frame time, so it lasts its duration in real time even
    /// across frame hitches.
    pub fn step(&mut self, frame_dt: f64) -> Vec<ItemId> {
        let dt = self.config().clamp_dt(frame_dt);
        let wall_dt = if frame_dt.is_finite() { frame_dt.max(0.0) } else { 0.0 };
        let out = self.simulation.step(&self.world, dt, self.stage_width);
        self.world = out.world;
        self.time += dt;

        if let Some(mut recorder) = self.recorder.take() {
            let reading = self
                .world
                .get(recorder.detector())
                .and_then(|d| sensor::range_reading(d, &self.world.items, self.config().px_per_meter));
            recorder.record(wall_dt, reading);
            if recorder.is_finished() {
                let recording = recorder.finish();
                info!(samples = recording.times.len(), "recording finished");
                self.finished = Some(recording);
            } else {
                self.recorder = Some(recorder);
            }
        }

        trace!(time = self.time, changed = out.changed.len(), "stepped");
        out.changed
    }

    // -------------------------------------------------------------------------
    // Instruments
    // -------------------------------------------------------------------------

    /// Current motion-detector reading in meters.
    pub fn range_reading(&self, detector: ItemId) -> Result<Option<f64>, LabError> {
        let d = self.item_of_type(detector, ItemType::MotionDetector)?;
        Ok(sensor::range_reading(d, &self.world.items, self.config().px_per_meter))
    }

    /// Tilt in degrees shown by a bubble level.
    pub fn bubble_reading(&self, level: ItemId) -> Result<Option<f64>, LabError> {
        let l = self.item_of_type(level, ItemType::BubbleLevel)?;
        Ok(sensor::bubble_reading(l, &self.world.items))
    }

    /// Sample a motion detector every tick for `duration` seconds.
    pub fn start_recording(&mut self, detector: ItemId, duration: f64) -> Result<(), LabError> {
        self.item_of_type(detector, ItemType::MotionDetector)?;
        self.placed(detector)?;
        self.recorder = Some(Recorder::new(detector, duration));
        self.finished = None;
        info!(detector = %detector, duration, "recording started");
        Ok(())
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_some()
    }

    /// The last finished recording, if it has not been taken yet.
    pub fn take_recording(&mut self) -> Option<Recording> {
        self.finished.take()
    }
}

impl Default for Lab {
    fn default() -> Self {
        Self::new(LabConfig::default(), Catalog::builtin())
    }
}

fn reset_motion(item: &mut Item) {
    item.vel = Vec2::ZERO;
    if let Some(track) = item.as_track_mut() {
        track.angular_velocity = 0.0;
        track.instability_tilt = 0.0;
    }
}

fn set_string_length(item: &mut Item, length: Option<f64>) {
    if let ItemKind::String(s) = &mut item.kind {
        s.length = length;
    }
}

// =============================================================================
// Tests
// =============================================================================
