//! Named attach points: the world coordinates a string end can be tied to.

use crate::geometry::{foot_position, surface_height_at};
use crate::types::{Item, ItemKind, Side, Vec2};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttachPoint {
    pub key: &'static str,
    pub pos: Vec2,
}

fn point(key: &'static str, x: f64, y: f64) -> AttachPoint {
    AttachPoint {
        key,
        pos: Vec2::new(x, y),
    }
}

/// All attach points of an item. Strings have none.
pub fn attach_points(item: &Item) -> Vec<AttachPoint> {
    let r = item.rect();
    let c = r.center();
    match &item.kind {
        ItemKind::Cart(_) => vec![
            point("left_hole", r.left, c.y),
            point("right_hole", r.right(), c.y),
            point("left_wheel", r.left + r.width * 0.2, r.bottom()),
            point("right_wheel", r.left + r.width * 0.8, r.bottom()),
        ],
        ItemKind::Track(_) => {
            let left = foot_position(item, Side::Left);
            let right = foot_position(item, Side::Right);
            vec![
                point("left_leg", left.x, left.y),
                point("right_leg", right.x, right.y),
                point("left_end", r.left, surface_height_at(item, 0.0)),
                point("right_end", r.right(), surface_height_at(item, r.width)),
            ]
        }
        ItemKind::Pulley(p) => vec![
            point("drape", c.x, r.top),
            point("axle", c.x, r.top + p.radius),
        ],
        ItemKind::MassHanger(_) => vec![point("hook", c.x, r.top)],
        ItemKind::MotionDetector(d) => {
            let face_x = if d.facing.sign() > 0.0 { r.right() } else { r.left };
            vec![point("face", face_x, c.y), point("center", c.x, c.y)]
        }
        ItemKind::BubbleLevel | ItemKind::MeterStick | ItemKind::Protractor => {
            vec![point("center", c.x, c.y)]
        }
        ItemKind::String(_) => Vec::new(),
    }
}

/// Resolve one named attach point.
pub fn attach_point(item: &Item, key: &str) -> Option<Vec2> {
    attach_points(item)
        .into_iter()
        .find(|p| p.key == key)
        .map(|p| p.pos)
}
