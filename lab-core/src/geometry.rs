//! Track geometry: tilt, surface height, feet and track lookup.
//!
//! A track's top surface pivots about its horizontal centre. With a positive
//! tilt the right end is raised, so the surface height (screen y) at a local
//! offset `u` from the left end is
//!
//! ```text
//! y(u) = pos.y + (W/2 - u) * tan(tilt)
//! ```
//!
//! Feet sit at both ends, `size.y` below the surface plus the leveling-screw
//! extension of that side.

use crate::types::{constants, Item, Side, Vec2};

/// Tilt produced by the leveling screws alone.
pub fn static_tilt(item: &Item) -> f64 {
    match item.as_track() {
        Some(track) => (track.right_foot - track.left_foot).atan2(item.size.x),
        None => 0.0,
    }
}

/// Total tilt: static tilt plus the dynamic instability tilt.
pub fn track_tilt(item: &Item) -> f64 {
    match item.as_track() {
        Some(track) => static_tilt(item) + track.instability_tilt,
        None => 0.0,
    }
}

/// Screen y of the track's top surface at `local_x` px from its left end.
pub fn surface_height_at(item: &Item, local_x: f64) -> f64 {
    let tilt = track_tilt(item);
    item.pos.y + (item.size.x * 0.5 - local_x) * tilt.tan()
}

/// World position of the bottom of a foot.
pub fn foot_position(item: &Item, side: Side) -> Vec2 {
    let (local_x, extension) = match (side, item.as_track()) {
        (Side::Left, Some(t)) => (0.0, t.left_foot),
        (Side::Right, Some(t)) => (item.size.x, t.right_foot),
        (Side::Left, None) => (0.0, 0.0),
        (Side::Right, None) => (item.size.x, 0.0),
    };
    Vec2::new(
        item.pos.x + local_x,
        surface_height_at(item, local_x) + item.size.y + extension,
    )
}

/// Among all placed tracks, the one whose span holds the item's horizontal
/// centre and whose surface lies within snapping distance of the item's bottom.
pub fn nearest_track_under<'a>(item: &Item, items: &'a [Item]) -> Option<&'a Item> {
    let cx = item.center().x;
    let bottom = item.bottom();

    items
        .iter()
        .filter(|t| t.is_track() && t.is_placed() && t.id != item.id)
        .filter(|t| t.rect().contains_x(cx))
        .map(|t| {
            let gap = (surface_height_at(t, cx - t.pos.x) - bottom).abs();
            (t, gap)
        })
        .filter(|(_, gap)| *gap <= constants::TRACK_SNAP_PX)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(t, _)| t)
}

/// y an item's top-left must have to rest its bottom on the track at its centre.
pub fn resting_y_on(track: &Item, item: &Item) -> f64 {
    let cx = item.center().x;
    surface_height_at(track, cx - track.pos.x) - item.size.y
}
