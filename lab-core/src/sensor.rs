//! Simulated instruments: the motion detector's range reading and the bubble
//! level's tilt reading.

use crate::geometry::{nearest_track_under, track_tilt};
use crate::types::{constants, find_item, Item, ItemKind};

/// Distance in meters from a motion detector's face to the nearest item ahead.
///
/// An item qualifies when its near edge lies strictly ahead of the face and the
/// detector's mid-height falls within its vertical span widened by the sensor
/// band. Tracks and strings are invisible to the detector. Returns `None` for
/// non-detectors and when nothing qualifies.
pub fn range_reading(detector: &Item, items: &[Item], px_per_meter: f64) -> Option<f64> {
    let ItemKind::MotionDetector(d) = &detector.kind else {
        return None;
    };
    if !detector.is_placed() || px_per_meter <= 0.0 {
        return None;
    }
    let r = detector.rect();
    let mid_y = r.center().y;
    let facing = d.facing.sign();
    let face_x = if facing > 0.0 { r.right() } else { r.left };

    items
        .iter()
        .filter(|o| o.id != detector.id && o.is_placed() && !o.is_track() && !o.is_string())
        .filter(|o| {
            let or = o.rect();
            mid_y >= or.top - constants::SENSOR_BAND_PX && mid_y <= or.bottom() + constants::SENSOR_BAND_PX
        })
        .filter_map(|o| {
            let or = o.rect();
            let edge = if facing > 0.0 { or.left } else { or.right() };
            let ahead = (edge - face_x) * facing;
            (ahead > 0.0).then_some(ahead)
        })
        .min_by(|a, b| a.total_cmp(b))
        .map(|px| px / px_per_meter)
}

/// Total tilt in degrees of the track a bubble level sits on.
pub fn bubble_reading(level: &Item, items: &[Item]) -> Option<f64> {
    if !matches!(level.kind, ItemKind::BubbleLevel) || !level.is_placed() {
        return None;
    }
    let track = match level.locked_to.and_then(|id| find_item(items, id)) {
        Some(t) if t.is_track() && t.is_placed() => t,
        _ => nearest_track_under(level, items)?,
    };
    Some(track_tilt(track).to_degrees())
}
