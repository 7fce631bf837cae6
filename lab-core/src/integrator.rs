//! Per-body integration: advances one item by one tick.
//!
//! Integration is semi-implicit Euler (velocity first, then position), which is
//! stable for the stiff contacts used here and cheap enough to run for every
//! item each frame.
//!
//! ## Body kinds
//!
//! - **Carts on a track** move in 1-D along the incline under gravity and
//!   Coulomb friction, glued to the track surface. Running past either end of
//!   the track releases them into free fall.
//! - **Free bodies** (hangers, pulleys, detectors, bubble levels, carts off a
//!   track) fall under gravity with slight horizontal drag, and land on the
//!   nearest surface below. Landing on a track locks them to it until it moves
//!   out from under them.
//! - **Measuring tools** never move. Tracks are handled by
//!   [`crate::stability`]; strings have no body.

use crate::collision::{crossed, land, nearest_surface_below};
use crate::config::TableBounds;
use crate::forces::InclineForces;
use crate::geometry::{nearest_track_under, resting_y_on, track_tilt};
use crate::types::{constants, find_item, Item, ItemKind, Vec2};

/// Advances bodies against a read-only view of the scene.
pub struct Integrator<'a> {
    pub items: &'a [Item],
    pub table: &'a TableBounds,
    pub forces: InclineForces,
    pub dt: f64,
}

impl<'a> Integrator<'a> {
    pub fn new(items: &'a [Item], table: &'a TableBounds, gravity_px: f64, dt: f64) -> Self {
        Self {
            items,
            table,
            forces: InclineForces::new(gravity_px),
            dt,
        }
    }

    /// The item one tick later. In-tray and hand-held items are returned as-is.
    pub fn advance(&self, item: &Item) -> Item {
        if !item.is_simulated() {
            return item.clone();
        }
        match &item.kind {
            ItemKind::Track(_) | ItemKind::String(_) => item.clone(),
            ItemKind::MeterStick | ItemKind::Protractor => item.clone(),
            ItemKind::Cart(cart) if cart.on_track => self.advance_cart_on_track(item),
            _ => self.advance_free_body(item),
        }
    }

    fn advance_cart_on_track(&self, item: &Item) -> Item {
        let Some(track) = nearest_track_under(item, self.items) else {
            let mut released = item.clone();
            if let Some(cart) = released.as_cart_mut() {
                cart.on_track = false;
            }
            return self.advance_free_body(&released);
        };

        let tilt = track_tilt(track);
        let friction = track.as_track().map_or(0.0, |t| t.friction);
        let vx = self.forces.step_velocity(item.vel.x, tilt, friction, self.dt);

        let mut next = item.clone();
        next.vel = Vec2::new(vx, 0.0);
        next.pos.x += vx * self.dt;

        if track.rect().contains_x(next.center().x) {
            next.pos.y = resting_y_on(track, &next);
        } else if let Some(cart) = next.as_cart_mut() {
            // ran off the end; falls from the next tick on
            cart.on_track = false;
        }
        next
    }

    fn advance_free_body(&self, item: &Item) -> Item {
        let mut next = item.clone();

        if let Some(track_id) = item.locked_to {
            let support = find_item(self.items, track_id)
                .filter(|t| t.is_placed() && t.rect().contains_x(item.center().x));
            if let Some(track) = support {
                next.pos.y = resting_y_on(track, item);
                next.vel = Vec2::ZERO;
                return next;
            }
            next.locked_to = None;
        }

        let prev_bottom = item.bottom();
        let dt = self.dt;
        next.vel.y += self.forces.gravity * dt;
        next.pos.y += next.vel.y * dt;
        next.vel.x *= constants::HORIZONTAL_DAMPING;
        next.pos.x += next.vel.x * dt;

        let hit = nearest_surface_below(
            next.center().x,
            prev_bottom - constants::RESTING_GAP_PX,
            self.items,
            self.table,
            Some(item.id),
        );
        if !crossed(prev_bottom, &next, &hit) {
            return next;
        }

        land(&mut next, &hit);
        let landed_on_track = hit
            .object()
            .and_then(|id| find_item(self.items, id))
            .filter(|o| o.is_track())
            .map(|t| t.id);
        if let Some(track_id) = landed_on_track {
            match next.as_cart_mut() {
                Some(cart) => cart.on_track = true,
                None => {
                    next.locked_to = Some(track_id);
                    next.vel = Vec2::ZERO;
                }
            }
        }
        next
    }
}

// =============================================================================
// Tests
// =============================================================================
