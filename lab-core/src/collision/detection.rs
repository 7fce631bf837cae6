//! Downward surface ray-cast.

use crate::config::TableBounds;
use crate::geometry::surface_height_at;
use crate::types::{constants, Item, ItemId};

/// What a downward ray landed on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceKind {
    Table,
    Floor,
    Object(ItemId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    /// Screen y of the surface.
    pub y: f64,
    pub kind: SurfaceKind,
}

impl SurfaceHit {
    pub fn is_floor(&self) -> bool {
        self.kind == SurfaceKind::Floor
    }

    pub fn object(&self) -> Option<ItemId> {
        match self.kind {
            SurfaceKind::Object(id) => Some(id),
            _ => None,
        }
    }
}

/// Top of `item` at world x, following the tilted surface for tracks.
fn top_at(item: &Item, x: f64) -> f64 {
    if item.is_track() {
        surface_height_at(item, x - item.pos.x)
    } else {
        item.pos.y
    }
}

/// Cast a ray straight down from `(x, y)` and return the nearest surface.
///
/// Candidates are the table top (within its x-range), the floor, and the top
/// edge of any placed item other than `exclude` whose span holds `x` and whose
/// top is at or below `y`. Measuring tools and strings never block.
pub fn nearest_surface_below(
    x: f64,
    y: f64,
    items: &[Item],
    table: &TableBounds,
    exclude: Option<ItemId>,
) -> SurfaceHit {
    let mut best = SurfaceHit {
        y: table.floor,
        kind: SurfaceKind::Floor,
    };

    if table.contains_x(x) && table.top >= y && table.top < best.y {
        best = SurfaceHit {
            y: table.top,
            kind: SurfaceKind::Table,
        };
    }

    for item in items {
        if !item.is_placed()
            || Some(item.id) == exclude
            || item.is_measuring_tool()
            || item.is_string()
            || !item.rect().contains_x(x)
        {
            continue;
        }
        let top = top_at(item, x);
        if top >= y && top < best.y {
            best = SurfaceHit {
                y: top,
                kind: SurfaceKind::Object(item.id),
            };
        }
    }

    best
}

/// True when the body's bottom sits on the surface under its centre.
pub fn is_resting(item: &Item, items: &[Item], table: &TableBounds) -> bool {
    let bottom = item.bottom();
    let hit = nearest_surface_below(
        item.center().x,
        bottom - constants::RESTING_GAP_PX,
        items,
        table,
        Some(item.id),
    );
    (hit.y - bottom).abs() <= constants::RESTING_GAP_PX && item.vel.y.abs() < 1.0
}

// =============================================================================
// Tests
// =============================================================================
