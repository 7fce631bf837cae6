//! Track stability: how a track sits, tilts, tips and falls.
//!
//! The support state is never stored. Every tick it is re-derived from where
//! the two feet are relative to the table and what lies under each of them, so
//! the result stays consistent however the scene was edited in between. The
//! only dynamic memory is the track's angular velocity, which keeps a tip-over
//! going once it has started.
//!
//! | State      | Cause                                              | Behaviour                                   |
//! |------------|----------------------------------------------------|---------------------------------------------|
//! | `Level`    | both feet on the table, supports within 20 px       | settle onto supports, decay instability     |
//! | `Uneven`   | supports differ, COM within 40% of the high foot    | ease to the resting tilt (max ±7°)          |
//! | `Overhang` | one foot off the table, COM still over it           | droop toward the overhang (max ±7°)         |
//! | `Airborne` | neither foot on the table                          | fall, settle level on landing               |
//! | `Tipping`  | support judged unstable                            | rotate, slide, fall past 45°, settle        |

use tracing::debug;

use crate::collision::{nearest_surface_below, SurfaceHit};
use crate::config::{LabConfig, TableBounds};
use crate::geometry::{foot_position, nearest_track_under, static_tilt};
use crate::types::{constants, Item, Side, Vec2};

/// Largest instability tilt magnitude kept while tipping (just short of 90°).
const MAX_TIP_ANGLE: f64 = std::f64::consts::FRAC_PI_2 - 0.05;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SupportState {
    Level,
    /// Resting on supports of different height, pivoting on the higher one.
    Uneven { target_tilt: f64, pivot: Side },
    /// One foot beyond the table edge, pivoting on the supported one.
    Overhang { target_tilt: f64, pivot: Side },
    Airborne,
    /// Rotating toward `direction` (sign of the tilt change).
    Tipping { direction: f64 },
}

/// A foot and what is under it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FootContact {
    pub side: Side,
    pub pos: Vec2,
    pub surface: SurfaceHit,
    pub on_table: bool,
}

/// Surface under a foot, probed from just above the track's top at that end
/// so a foot sunk by instability tilt still finds what it stands on.
fn support_under(item: &Item, side: Side, items: &[Item], table: &TableBounds) -> SurfaceHit {
    let foot = foot_position(item, side);
    let extension = item.as_track().map_or(0.0, |t| t.foot(side));
    let origin = foot.y - item.size.y - extension - constants::FOOT_PROBE_PX;
    nearest_surface_below(foot.x, origin, items, table, Some(item.id))
}

pub fn foot_contact(item: &Item, side: Side, items: &[Item], table: &TableBounds) -> FootContact {
    let pos = foot_position(item, side);
    let surface = support_under(item, side, items, table);
    FootContact {
        side,
        pos,
        surface,
        on_table: table.contains_x(pos.x) && pos.y <= table.top + constants::TABLE_CONTACT_PX,
    }
}

/// Horizontal centre of mass of a track plus the carts riding it.
pub fn center_of_mass_x(item: &Item, items: &[Item], track_mass: f64) -> f64 {
    let mut mass = track_mass.max(0.0);
    let mut moment = mass * item.center().x;

    for other in items.iter().filter(|o| o.is_placed()) {
        let Some(cart) = other.as_cart() else {
            continue;
        };
        if !cart.on_track {
            continue;
        }
        if nearest_track_under(other, items).map(|t| t.id) == Some(item.id) {
            mass += cart.mass;
            moment += cart.mass * other.center().x;
        }
    }

    if mass <= constants::EPSILON {
        item.center().x
    } else {
        moment / mass
    }
}

/// Classify how a track is supported this tick.
pub fn classify(item: &Item, items: &[Item], table: &TableBounds, config: &LabConfig) -> SupportState {
    let left = foot_contact(item, Side::Left, items, table);
    let right = foot_contact(item, Side::Right, items, table);
    let angular_velocity = item.as_track().map_or(0.0, |t| t.angular_velocity);
    let width = item.size.x;

    if !left.on_table && !right.on_table {
        return SupportState::Airborne;
    }
    if angular_velocity.abs() > constants::EPSILON {
        return SupportState::Tipping {
            direction: angular_velocity.signum(),
        };
    }

    if left.on_table && right.on_table {
        // positive when the right support is lower
        let diff = right.surface.y - left.surface.y;
        if diff.abs() <= constants::LEVEL_TOLERANCE_PX {
            return SupportState::Level;
        }
        let target = (-diff).atan2(width);
        let pivot = if diff > 0.0 { left } else { right };
        let com = center_of_mass_x(item, items, config.track_mass);
        if (com - pivot.pos.x).abs() <= constants::COM_STABLE_FRACTION * width {
            return SupportState::Uneven {
                target_tilt: target.clamp(-constants::MAX_STABLE_TILT, constants::MAX_STABLE_TILT),
                pivot: pivot.side,
            };
        }
        return SupportState::Tipping {
            direction: target.signum(),
        };
    }

    // exactly one foot off the table; `droop` is the tilt sign that lowers it
    let (pivot, overhang, droop) = if right.on_table {
        (Side::Right, table.left - item.pos.x, 1.0)
    } else {
        (Side::Left, item.pos.x + width - table.right, -1.0)
    };
    let overhang = overhang.max(0.0);
    let com = center_of_mass_x(item, items, config.track_mass);

    if table.contains_x(com) && overhang < width * 0.5 {
        let share = (overhang / (width * 0.5)).min(1.0);
        SupportState::Overhang {
            target_tilt: droop * constants::MAX_STABLE_TILT * share,
            pivot,
        }
    } else {
        SupportState::Tipping { direction: droop }
    }
}

/// Keep the total tilt within ±7° by adjusting the instability component only.
fn clamp_supported_tilt(item: &mut Item) {
    let static_t = static_tilt(item);
    if let Some(track) = item.as_track_mut() {
        let total = (static_t + track.instability_tilt)
            .clamp(-constants::MAX_STABLE_TILT, constants::MAX_STABLE_TILT);
        track.instability_tilt = total - static_t;
    }
}

/// The track one tick later, given its support state.
pub fn resolve(
    item: &Item,
    state: SupportState,
    items: &[Item],
    table: &TableBounds,
    config: &LabConfig,
    dt: f64,
) -> Item {
    let mut next = item.clone();
    let static_t = static_tilt(item);
    let gravity = config.gravity_px();

    match state {
        SupportState::Level => {
            if let Some(track) = next.as_track_mut() {
                track.instability_tilt *= 1.0 - constants::INSTABILITY_DECAY;
                track.angular_velocity = 0.0;
            }
            next.vel = Vec2::ZERO;
            clamp_supported_tilt(&mut next);

            let l = foot_contact(&next, Side::Left, items, table);
            let r = foot_contact(&next, Side::Right, items, table);
            let dy = ((l.surface.y - l.pos.y) + (r.surface.y - r.pos.y)) * 0.5;
            next.pos.y += dy * constants::HEIGHT_EASE;
        }
        SupportState::Uneven { target_tilt, pivot } | SupportState::Overhang { target_tilt, pivot } => {
            if let Some(track) = next.as_track_mut() {
                let wanted = target_tilt - static_t;
                track.instability_tilt += (wanted - track.instability_tilt) * constants::TILT_EASE;
                track.angular_velocity = 0.0;
            }
            next.vel = Vec2::ZERO;
            if matches!(state, SupportState::Uneven { .. }) {
                clamp_supported_tilt(&mut next);
            }

            let p = foot_contact(&next, pivot, items, table);
            next.pos.y += (p.surface.y - p.pos.y) * constants::HEIGHT_EASE;
        }
        SupportState::Airborne => {
            if let Some(track) = next.as_track_mut() {
                track.angular_velocity = 0.0;
            }
            let probes =
                [Side::Left, Side::Right].map(|side| (side, support_under(item, side, items, table)));

            next.vel.x = 0.0;
            next.vel.y += gravity * dt;
            next.pos.y += next.vel.y * dt;

            let landed = probes
                .iter()
                .any(|(side, hit)| foot_position(&next, *side).y >= hit.y);
            if landed && next.vel.y > 0.0 {
                if let Some(track) = next.as_track_mut() {
                    track.instability_tilt = 0.0;
                }
                let penetration = probes
                    .iter()
                    .map(|(side, hit)| foot_position(&next, *side).y - hit.y)
                    .fold(f64::NEG_INFINITY, f64::max);
                next.pos.y -= penetration;
                next.vel = Vec2::ZERO;
            }
        }
        SupportState::Tipping { direction } => {
            if item.as_track().is_some_and(|t| t.angular_velocity == 0.0) {
                debug!(track = %item.id, direction, "track started tipping over");
            }
            let falling = if direction < 0.0 { Side::Right } else { Side::Left };
            let before = foot_position(item, falling);
            let surface = support_under(item, falling, items, table);

            let mut free_fall = false;
            if let Some(track) = next.as_track_mut() {
                track.angular_velocity += direction * constants::TIP_ANGULAR_ACCEL * dt;
                track.instability_tilt = (track.instability_tilt + track.angular_velocity * dt)
                    .clamp(-MAX_TIP_ANGLE, MAX_TIP_ANGLE);
                free_fall = track.instability_tilt.abs() > constants::FREE_FALL_TILT;
            }
            next.pos.x -= direction * constants::TIP_SLIDE_PX * dt;
            if free_fall {
                next.vel.y += gravity * dt;
                next.pos.y += next.vel.y * dt;
            }

            let after = foot_position(&next, falling);
            if after.y >= surface.y && after.y > before.y {
                if let Some(track) = next.as_track_mut() {
                    track.instability_tilt = 0.0;
                    track.angular_velocity = 0.0;
                }
                next.vel = Vec2::ZERO;
                next.pos.y += surface.y - foot_position(&next, falling).y;
                debug!(track = %item.id, surface = ?surface.kind, "tipped track came to rest");
            } else {
                let l = foot_position(&next, Side::Left);
                let r = foot_position(&next, Side::Right);
                if !table.contains_x(l.x) && !table.contains_x(r.x) {
                    // cleared the table; plain free fall takes over
                    if let Some(track) = next.as_track_mut() {
                        track.angular_velocity = 0.0;
                    }
                }
            }
        }
    }
    next
}

/// Classify and resolve in one go.
pub fn update_track(
    item: &Item,
    items: &[Item],
    table: &TableBounds,
    config: &LabConfig,
    dt: f64,
) -> Item {
    let state = classify(item, items, table, config);
    resolve(item, state, items, table, config, dt)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::track_tilt;
    use crate::types::{Cart, ItemId, ItemKind, MassHanger, Track};

    fn table() -> TableBounds {
        TableBounds::centered(1000.0, &LabConfig::default()) // x 175..825, top 440, floor 720
    }

    fn track_at(x: f64, y: f64) -> Item {
        Item::new(
            ItemId(1),
            ItemKind::Track(Track {
                left_foot: 0.0,
                right_foot: 0.0,
                instability_tilt: 0.0,
                angular_velocity: 0.0,
                friction: 0.0,
            }),
            Vec2::new(600.0, 30.0),
        )
        .placed_at(Vec2::new(x, y))
    }

    fn block(x: f64, top: f64, height: f64) -> Item {
        Item::new(
            ItemId(2),
            ItemKind::MassHanger(MassHanger { mass: 1.0 }),
            Vec2::new(40.0, height),
        )
        .placed_at(Vec2::new(x, top))
    }

    fn run(mut track: Item, others: &[Item], ticks: usize) -> Item {
        let config = LabConfig::default();
        let table = table();
        for _ in 0..ticks {
            let mut items = vec![track.clone()];
            items.extend_from_slice(others);
            track = update_track(&track, &items, &table, &config, 0.016);
        }
        track
    }

    fn instability(item: &Item) -> f64 {
        item.as_track().unwrap().instability_tilt
    }

    #[test]
    fn test_level_on_table() {
        let config = LabConfig::default();
        let t = track_at(200.0, 410.0);
        let items = vec![t.clone()];
        assert_eq!(classify(&t, &items, &table(), &config), SupportState::Level);
    }

    #[test]
    fn test_level_decays_instability() {
        let mut t = track_at(200.0, 410.0);
        t.as_track_mut().unwrap().instability_tilt = 0.05;
        let t = run(t, &[], 1);
        assert!((instability(&t) - 0.046).abs() < 1e-12);
        let t = run(t, &[], 200);
        assert!(instability(&t).abs() < 1e-6);
    }

    #[test]
    fn test_level_settles_onto_table() {
        let t = run(track_at(200.0, 300.0), &[], 100);
        let foot = foot_position(&t, Side::Left);
        assert!((foot.y - 440.0).abs() < 0.01, "foot at {}", foot.y);
    }

    #[test]
    fn test_static_tilt_clamped_by_instability() {
        // feet at 350 + 30 + 300·tan 10° ≈ 433, just above the table
        let mut t = track_at(200.0, 350.0);
        t.as_track_mut().unwrap().right_foot = 600.0 * 10.0f64.to_radians().tan();
        let t = run(t, &[], 1);
        assert!((track_tilt(&t) - constants::MAX_STABLE_TILT).abs() < 1e-9);
        assert!(static_tilt(&t) > constants::MAX_STABLE_TILT);
    }

    fn cart_near_left_end(mass: f64) -> Item {
        // centre at x 240, riding a track whose surface is at y 380
        Item::new(
            ItemId(3),
            ItemKind::Cart(Cart { mass, on_track: true }),
            Vec2::new(80.0, 40.0),
        )
        .placed_at(Vec2::new(200.0, 340.0))
    }

    #[test]
    fn test_uneven_small_step_tilts_to_rest() {
        // left foot on a 30 px block, right foot over the bare table,
        // load over the left end keeps the COM at 28% of the span
        let t = track_at(200.0, 380.0);
        let b = block(180.0, 410.0, 30.0);
        let cart = cart_near_left_end(1.0);
        let config = LabConfig::default();
        let items = vec![t.clone(), b.clone(), cart.clone()];
        let expected = (-30.0f64).atan2(600.0);
        assert_eq!(
            classify(&t, &items, &table(), &config),
            SupportState::Uneven { target_tilt: expected, pivot: Side::Left }
        );

        let t = run(t, &[b, cart], 200);
        assert!((track_tilt(&t) - expected).abs() < 1e-4);
        // right end lowered toward the table
        let right = foot_position(&t, Side::Right);
        assert!((right.y - 440.0).abs() < 1.0, "right foot at {}", right.y);
    }

    #[test]
    fn test_bare_track_on_small_step_tips() {
        // COM at mid-span, 50% from the higher foot
        let t = track_at(200.0, 380.0);
        let b = block(180.0, 410.0, 30.0);
        let items = vec![t.clone(), b];
        assert_eq!(
            classify(&t, &items, &table(), &LabConfig::default()),
            SupportState::Tipping { direction: -1.0 }
        );
    }

    #[test]
    fn test_center_of_mass_fraction_boundary() {
        let t = track_at(200.0, 380.0);
        let b = block(180.0, 410.0, 30.0);
        let config = LabConfig::default();

        // (500 + 240·0.35) / 1.35 = 432.6, 38.8% of the span from the left foot
        let items = vec![t.clone(), b.clone(), cart_near_left_end(0.35)];
        let com = center_of_mass_x(&t, &items, config.track_mass);
        assert!((com - 200.0) < constants::COM_STABLE_FRACTION * 600.0);
        assert!(matches!(
            classify(&t, &items, &table(), &config),
            SupportState::Uneven { pivot: Side::Left, .. }
        ));

        // (500 + 240·0.25) / 1.25 = 448, 41.3% of the span
        let items = vec![t.clone(), b, cart_near_left_end(0.25)];
        let com = center_of_mass_x(&t, &items, config.track_mass);
        assert!((com - 200.0) > constants::COM_STABLE_FRACTION * 600.0);
        assert_eq!(
            classify(&t, &items, &table(), &config),
            SupportState::Tipping { direction: -1.0 }
        );
    }

    #[test]
    fn test_loaded_large_step_clamps_target_tilt() {
        // a 100 px step needs about 9.5°
        let t = track_at(200.0, 310.0);
        let b = block(180.0, 340.0, 100.0);
        let mut cart = cart_near_left_end(2.0);
        cart.pos.y = 270.0;
        let items = vec![t.clone(), b, cart];
        assert_eq!(
            classify(&t, &items, &table(), &LabConfig::default()),
            SupportState::Uneven {
                target_tilt: -constants::MAX_STABLE_TILT,
                pivot: Side::Left
            }
        );
    }

    #[test]
    fn test_uneven_large_step_tips() {
        let t = track_at(200.0, 310.0);
        let b = block(180.0, 340.0, 100.0);
        let items = vec![t.clone(), b];
        let state = classify(&t, &items, &table(), &LabConfig::default());
        assert_eq!(state, SupportState::Tipping { direction: -1.0 });
    }

    #[test]
    fn test_small_overhang_droops() {
        let t = track_at(300.0, 410.0); // right end at 900, table edge 825
        let items = vec![t.clone()];
        match classify(&t, &items, &table(), &LabConfig::default()) {
            SupportState::Overhang { target_tilt, pivot } => {
                assert_eq!(pivot, Side::Left);
                let expected = -constants::MAX_STABLE_TILT * 75.0 / 300.0;
                assert!((target_tilt - expected).abs() < 1e-12);
            }
            other => panic!("expected overhang, got {:?}", other),
        }
        let t = run(t, &[], 200);
        assert!(track_tilt(&t) < 0.0 && track_tilt(&t) > -constants::MAX_STABLE_TILT);
    }

    #[test]
    fn test_center_of_mass_off_table_tips_and_lands() {
        let t = track_at(560.0, 410.0); // centre at 860, past the edge at 825
        let items = vec![t.clone()];
        assert_eq!(
            classify(&t, &items, &table(), &LabConfig::default()),
            SupportState::Tipping { direction: -1.0 }
        );

        let t = run(t, &[], 1);
        assert!(t.as_track().unwrap().angular_velocity < 0.0);
        assert!(t.pos.x > 560.0, "slides toward the falling side");

        let t = run(t, &[], 300);
        let track = t.as_track().unwrap();
        assert_eq!(track.angular_velocity, 0.0);
        assert_eq!(track.instability_tilt, 0.0);
        assert!(t.pos.y > 440.0, "ended below the table top");
    }

    #[test]
    fn test_airborne_falls_then_settles() {
        let mut t = track_at(900.0, 100.0);
        t.as_track_mut().unwrap().instability_tilt = 0.1;
        let config = LabConfig::default();
        let table = table();
        assert_eq!(
            classify(&t, &[t.clone()], &table, &config),
            SupportState::Airborne
        );

        let mut last_vy = 0.0;
        for _ in 0..500 {
            t = update_track(&t, &[t.clone()], &table, &config, 0.016);
            if t.vel.y == 0.0 {
                break;
            }
            assert!(t.vel.y > last_vy, "fall speed must grow");
            last_vy = t.vel.y;
        }
        assert_eq!(t.vel.y, 0.0);
        assert_eq!(instability(&t), 0.0);
        let lowest = foot_position(&t, Side::Left).y.max(foot_position(&t, Side::Right).y);
        assert!((lowest - 720.0).abs() < 1e-9);
    }

    #[test]
    fn test_loaded_end_shifts_center_of_mass() {
        let t = track_at(200.0, 410.0);
        let mut cart = Item::new(
            ItemId(3),
            ItemKind::Cart(Cart { mass: 1.0, on_track: true }),
            Vec2::new(80.0, 40.0),
        )
        .placed_at(Vec2::new(200.0, 370.0));
        let items = vec![t.clone(), cart.clone()];
        let com = center_of_mass_x(&t, &items, 1.0);
        assert!((com - (500.0 + 240.0) / 2.0).abs() < 1e-9);

        cart.as_cart_mut().unwrap().on_track = false;
        let items = vec![t.clone(), cart];
        assert!((center_of_mass_x(&t, &items, 1.0) - 500.0).abs() < 1e-9);
    }
}
