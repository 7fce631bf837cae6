//! Fixed-length string constraints.
//!
//! A string with a fixed length and both ends tied to placed items is
//! inextensible: once its path grows past the length (plus a small tolerance)
//! the ends are pulled back by a single positional correction per tick. Slack
//! strings exert nothing.
//!
//! The path is straight, or wraps over a pulley wheel when one sits between the
//! ends and close to the straight line:
//!
//! ```text
//!   a ─────────────╮ (wheel)
//!                  │
//!                  b
//! ```
//!
//! length = tangent(a) + π·r + tangent(b)
//!
//! ## Corrections
//!
//! - **Atwood pair** (cart on a track, hanger over a track-mounted pulley): the
//!   hanger is driven by the closed-form two-body acceleration and the cart's
//!   speed is slaved to it; any residual stretch is nudged out.
//! - **Hanger over a pulley without a cart partner**: the hanger is held at the
//!   string's length.
//! - **No pulley**: both free ends move toward each other along the string.

use std::f64::consts::PI;

use tracing::{debug, trace};

use crate::attach::attach_point;
use crate::collision::{crossed, is_resting, land, nearest_surface_below};
use crate::config::TableBounds;
use crate::forces::atwood_acceleration;
use crate::geometry::{nearest_track_under, resting_y_on};
use crate::types::{constants, find_item, index_of, Endpoint, Item, ItemId, ItemKind, StringConnection, Vec2};

/// Current geometry of a string whose ends both resolve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StringPath {
    pub a_item: ItemId,
    pub a: Vec2,
    pub b_item: ItemId,
    pub b: Vec2,
    pub pulley: Option<ItemId>,
    pub length: f64,
}

/// Cart and hanger coupled through a track-mounted pulley.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtwoodPair {
    pub string: ItemId,
    pub cart: ItemId,
    pub hanger: ItemId,
    pub pulley: ItemId,
    pub length: f64,
}

/// Wheel centre and radius. The wheel sits at the top of the pulley's box.
fn wheel(pulley: &Item) -> Option<(Vec2, f64)> {
    let r = pulley.as_pulley()?.radius;
    Some((Vec2::new(pulley.center().x, pulley.pos.y + r), r))
}

/// y of the straight segment a→b at `x`, clamped to the segment.
fn line_y_at(a: Vec2, b: Vec2, x: f64) -> f64 {
    let dx = b.x - a.x;
    if dx.abs() < constants::EPSILON {
        return a.y.min(b.y);
    }
    let t = ((x - a.x) / dx).clamp(0.0, 1.0);
    a.y + (b.y - a.y) * t
}

fn tangent_length(p: Vec2, center: Vec2, radius: f64) -> f64 {
    ((p - center).magnitude_squared() - radius * radius).max(0.0).sqrt()
}

/// Length of a string from `a` over a wheel to `b`.
pub fn wrapped_length(a: Vec2, b: Vec2, center: Vec2, radius: f64) -> f64 {
    tangent_length(a, center, radius) + PI * radius + tangent_length(b, center, radius)
}

/// The pulley a string between `a` and `b` drapes over, if any.
///
/// A wheel qualifies when it lies horizontally between the ends (widened by its
/// radius), its top is within the ends' vertical band widened by the capture
/// distance, and the straight line passes no further than that above its top.
/// The wheel whose top is closest to the straight line wins.
pub fn find_pulley<'a, I>(a: Vec2, b: Vec2, pulleys: I) -> Option<&'a Item>
where
    I: IntoIterator<Item = &'a Item>,
{
    let (lo_x, hi_x) = (a.x.min(b.x), a.x.max(b.x));
    let (lo_y, hi_y) = (a.y.min(b.y), a.y.max(b.y));
    let capture = constants::PULLEY_CAPTURE_PX;

    pulleys
        .into_iter()
        .filter_map(|p| wheel(p).map(|(c, r)| (p, c, r)))
        .filter(|(_, c, r)| c.x >= lo_x - r && c.x <= hi_x + r)
        .filter_map(|(p, c, r)| {
            let top = c.y - r;
            if top < lo_y - capture || top > hi_y + capture {
                return None;
            }
            let clearance = line_y_at(a, b, c.x) - top;
            (clearance >= -capture).then_some((p, clearance.abs()))
        })
        .min_by(|x, y| x.1.total_cmp(&y.1))
        .map(|(p, _)| p)
}

fn resolve_end(end: &Endpoint, items: &[Item]) -> Option<(ItemId, Vec2)> {
    let item = find_item(items, end.item_id).filter(|i| i.is_placed())?;
    Some((item.id, attach_point(item, &end.point)?))
}

/// Resolve both ends of a connection and measure the path between them.
pub fn string_path(conn: &StringConnection, items: &[Item]) -> Option<StringPath> {
    let (a_item, a) = resolve_end(conn.a.as_ref()?, items)?;
    let (b_item, b) = resolve_end(conn.b.as_ref()?, items)?;

    let candidates = items
        .iter()
        .filter(|p| p.is_placed() && p.id != a_item && p.id != b_item);
    let pulley = find_pulley(a, b, candidates);

    let length = match pulley.and_then(wheel) {
        Some((center, radius)) => wrapped_length(a, b, center, radius),
        None => a.distance(&b),
    };
    Some(StringPath {
        a_item,
        a,
        b_item,
        b,
        pulley: pulley.map(|p| p.id),
        length,
    })
}

/// Fixed length of a placed string item.
fn fixed_length(items: &[Item], string_id: ItemId) -> Option<f64> {
    find_item(items, string_id)
        .filter(|s| s.is_placed())
        .and_then(|s| s.as_string())
        .and_then(|s| s.length)
}

/// The Atwood pairing a connection forms this tick, if any.
pub fn atwood_pair(conn: &StringConnection, items: &[Item], table: &TableBounds) -> Option<AtwoodPair> {
    let length = fixed_length(items, conn.string_id)?;
    let path = string_path(conn, items)?;
    let pulley = find_item(items, path.pulley?)?;
    let mounted = pulley
        .locked_to
        .and_then(|id| find_item(items, id))
        .is_some_and(|t| t.is_track());
    if !mounted {
        return None;
    }

    let a = find_item(items, path.a_item)?;
    let b = find_item(items, path.b_item)?;
    let (cart, hanger) = match (&a.kind, &b.kind) {
        (ItemKind::Cart(c), ItemKind::MassHanger(_)) if c.on_track => (a, b),
        (ItemKind::MassHanger(_), ItemKind::Cart(c)) if c.on_track => (b, a),
        _ => return None,
    };
    if cart.dragging || hanger.dragging || is_resting(hanger, items, table) {
        return None;
    }
    if path.length < length - constants::STRING_TOLERANCE_PX {
        return None;
    }

    Some(AtwoodPair {
        string: conn.string_id,
        cart: cart.id,
        hanger: hanger.id,
        pulley: pulley.id,
        length,
    })
}

pub fn atwood_pairs(connections: &[StringConnection], items: &[Item], table: &TableBounds) -> Vec<AtwoodPair> {
    connections
        .iter()
        .filter_map(|conn| atwood_pair(conn, items, table))
        .collect()
}

/// Free to be moved by a string: not hand-held, not a track or pulley.
fn is_free(item: &Item) -> bool {
    !item.dragging && !item.is_track() && item.as_pulley().is_none()
}

/// Applies every string's correction to a working copy of the scene.
pub struct StringSolver<'a> {
    pub table: &'a TableBounds,
    /// px/s²
    pub gravity: f64,
    pub dt: f64,
}

impl<'a> StringSolver<'a> {
    pub fn new(table: &'a TableBounds, gravity: f64, dt: f64) -> Self {
        Self { table, gravity, dt }
    }

    pub fn solve(&self, connections: &[StringConnection], pairs: &[AtwoodPair], items: &mut [Item]) {
        for conn in connections {
            match pairs.iter().find(|p| p.string == conn.string_id) {
                Some(pair) => self.solve_atwood(pair, conn, items),
                None => self.solve_string(conn, items),
            }
        }
    }

    fn solve_atwood(&self, pair: &AtwoodPair, conn: &StringConnection, items: &mut [Item]) {
        let (Some(ci), Some(hi)) = (index_of(items, pair.cart), index_of(items, pair.hanger)) else {
            return;
        };
        let Some(pulley_x) = find_item(items, pair.pulley).map(|p| p.center().x) else {
            return;
        };
        let cart_mass = items[ci].as_cart().map_or(0.0, |c| c.mass);
        let hanger_mass = items[hi].as_hanger().map_or(0.0, |h| h.mass);
        let accel = atwood_acceleration(cart_mass, hanger_mass, self.gravity);

        let prev_bottom = items[hi].bottom();
        let hit = nearest_surface_below(
            items[hi].center().x,
            prev_bottom - constants::RESTING_GAP_PX,
            items,
            self.table,
            Some(pair.hanger),
        );
        let hanger = &mut items[hi];
        hanger.vel.y += accel * self.dt;
        hanger.pos.y += hanger.vel.y * self.dt;
        if crossed(prev_bottom, hanger, &hit) {
            land(hanger, &hit);
        }
        let hanger_vy = hanger.vel.y;

        let side = if pulley_x >= items[ci].center().x { 1.0 } else { -1.0 };
        items[ci].vel.x = side * hanger_vy;

        if let Some(path) = string_path(conn, items) {
            let overshoot = path.length - pair.length;
            if overshoot > constants::STRING_TOLERANCE_PX {
                let nudge = constants::ATWOOD_NUDGE * overshoot * 0.5;
                items[ci].pos.x += side * nudge;
                items[hi].pos.y -= nudge;
            }
        }

        let glued = nearest_track_under(&items[ci], items).map(|t| resting_y_on(t, &items[ci]));
        if let Some(y) = glued {
            items[ci].pos.y = y;
        }
        trace!(cart = %pair.cart, hanger = %pair.hanger, vy = hanger_vy, "atwood pair advanced");
    }

    fn solve_string(&self, conn: &StringConnection, items: &mut [Item]) {
        let Some(length) = fixed_length(items, conn.string_id) else {
            return;
        };
        let Some(path) = string_path(conn, items) else {
            debug!(string = %conn.string_id, "string end unresolved, skipped");
            return;
        };
        let overshoot = path.length - length;
        if overshoot <= constants::STRING_TOLERANCE_PX {
            return;
        }
        match path.pulley {
            Some(pulley) => hold_hangers(&path, pulley, overshoot, items),
            None => pull_together(&path, overshoot, items),
        }
    }
}

/// Lift the hanging ends over a pulley back to the string's length.
fn hold_hangers(path: &StringPath, pulley: ItemId, overshoot: f64, items: &mut [Item]) {
    let hangers: Vec<usize> = [path.a_item, path.b_item]
        .into_iter()
        .filter_map(|id| index_of(items, id))
        .filter(|&i| items[i].as_hanger().is_some() && !items[i].dragging)
        .collect();
    if hangers.is_empty() {
        trace!(pulley = %pulley, "no hanging end over pulley");
        return;
    }

    let share = overshoot / hangers.len() as f64;
    for i in hangers {
        let hanger = &mut items[i];
        hanger.pos.y -= share;
        hanger.vel.y = hanger.vel.y.min(0.0);
    }
}

/// Pull the free ends toward each other along the straight string.
fn pull_together(path: &StringPath, overshoot: f64, items: &mut [Item]) {
    let Some(dir) = (path.b - path.a).try_normalized() else {
        return;
    };
    let free = |items: &[Item], id: ItemId| index_of(items, id).filter(|&i| is_free(&items[i]));

    let moves: Vec<(usize, Vec2)> = match (free(items, path.a_item), free(items, path.b_item)) {
        (Some(i), Some(j)) if i == j => Vec::new(),
        (Some(i), Some(j)) => vec![(i, dir * (overshoot * 0.5)), (j, -dir * (overshoot * 0.5))],
        (Some(i), None) => vec![(i, dir * overshoot)],
        (None, Some(j)) => vec![(j, -dir * overshoot)],
        (None, None) => Vec::new(),
    };

    for (i, shift) in moves {
        let item = &mut items[i];
        item.pos += shift;
        // drop the velocity component that keeps stretching the string
        let pull = shift.try_normalized().unwrap_or(Vec2::ZERO);
        let outward = item.vel.dot(&pull);
        if outward < 0.0 {
            item.vel -= pull * outward;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
