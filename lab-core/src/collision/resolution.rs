//! Contact resolution: landings and post-drop overlap separation.
//!
//! ## Model Assumptions
//!
//! - **Perfectly inelastic landings**: a body that reaches a surface stops
//!   vertically. Floor contact also kills horizontal motion; anything else keeps
//!   a share of it.
//! - **One pair per drop**: a dropped item is pushed out of at most one other
//!   item, along the axis of least overlap.

use crate::collision::detection::SurfaceHit;
use crate::types::{constants, Item, Vec2};

/// Clamp a descending body onto `hit` and damp its velocity.
pub fn land(item: &mut Item, hit: &SurfaceHit) {
    item.pos.y = hit.y - item.size.y;
    item.vel.y = 0.0;
    if hit.is_floor() {
        item.vel.x = 0.0;
    } else {
        item.vel.x *= constants::LANDING_RETAIN;
    }
}

/// True if the body's bottom moved from above `hit` to at or below it while
/// descending.
pub fn crossed(prev_bottom: f64, item: &Item, hit: &SurfaceHit) -> bool {
    item.vel.y > 0.0 && prev_bottom <= hit.y + constants::RESTING_GAP_PX && item.bottom() >= hit.y
}

fn blocks_drop(item: &Item) -> bool {
    item.is_placed() && !item.is_track() && !item.is_string()
}

/// New position for `moved` that clears the first placed item it overlaps.
///
/// Returns `None` when there is no overlap. Tracks and strings neither get
/// pushed nor push.
pub fn separate_after_drop(moved: &Item, items: &[Item]) -> Option<Vec2> {
    if !blocks_drop(moved) {
        return None;
    }
    let a = moved.rect();

    let (other, (ox, oy)) = items
        .iter()
        .filter(|o| o.id != moved.id && blocks_drop(o))
        .find_map(|o| a.overlap(&o.rect()).map(|overlap| (o, overlap)))?;

    let ac = a.center();
    let bc = other.rect().center();
    let away = |d: f64| if d < 0.0 { -1.0 } else { 1.0 };

    let mut pos = moved.pos;
    if ox < oy {
        pos.x += away(ac.x - bc.x) * (ox + constants::SEPARATION_MARGIN_PX);
    } else {
        pos.y += away(ac.y - bc.y) * (oy + constants::SEPARATION_MARGIN_PX);
    }
    Some(pos)
}

// =============================================================================
// Tests
// =============================================================================
