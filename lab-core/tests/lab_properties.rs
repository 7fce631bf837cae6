//! Whole-scene behaviour driven through the public `Lab` API.

use lab_core::collision::{nearest_surface_below, SurfaceKind};
use lab_core::forces::atwood_acceleration;
use lab_core::geometry::{foot_position, track_tilt};
use lab_core::strings::string_path;
use lab_core::types::{Facing, ItemId, Side, StringEnd, Vec2};
use lab_core::{Catalog, EquipmentSpec, ItemType, Lab, LabConfig, TableBounds};

const DT: f64 = 1.0 / 60.0;
const G: f64 = 3924.0;
const TABLE_TOP: f64 = 440.0;

fn lab_with_friction(friction: f64) -> Lab {
    let mut catalog = Catalog::builtin();
    catalog.set(
        ItemType::Track,
        EquipmentSpec {
            friction: Some(friction),
            ..EquipmentSpec::builtin(ItemType::Track)
        },
    );
    Lab::new(LabConfig::default(), catalog).seeded(5)
}

/// A 600 px track at `x` whose right foot is raised to give `tilt_deg`,
/// placed so both feet stand on the table.
fn tilted_track(lab: &mut Lab, x: f64, tilt_deg: f64) -> ItemId {
    let t = lab.spawn(ItemType::Track);
    let tan = tilt_deg.to_radians().tan();
    lab.place(t, Vec2::new(x, TABLE_TOP - 30.0 - 300.0 * tan)).unwrap();
    lab.set_foot_height(t, Side::Left, 0.0).unwrap();
    lab.set_foot_height(t, Side::Right, 600.0 * tan).unwrap();
    t
}

fn cart_on(lab: &mut Lab, track: ItemId, x: f64) -> ItemId {
    let c = lab.spawn(ItemType::Cart);
    let y = lab.item(track).unwrap().pos.y - 40.0 - 5.0;
    lab.place(c, Vec2::new(x, y)).unwrap();
    assert!(lab.item(c).unwrap().as_cart().unwrap().on_track);
    c
}

#[test]
fn level_frictionless_cart_stays_put() {
    let mut lab = lab_with_friction(0.0);
    let t = tilted_track(&mut lab, 200.0, 0.0);
    let c = cart_on(&mut lab, t, 500.0);
    let start = lab.item(c).unwrap().pos;

    for _ in 0..600 {
        lab.step(DT);
    }
    let cart = lab.item(c).unwrap();
    assert_eq!(cart.vel, Vec2::ZERO);
    assert!((cart.pos.x - start.x).abs() < 1e-9);
    assert!((cart.pos.y - start.y).abs() < 1e-9);
}

#[test]
fn cart_slides_down_five_degrees() {
    let mut lab = lab_with_friction(0.002);
    let t = tilted_track(&mut lab, 200.0, 5.0);
    let c = cart_on(&mut lab, t, 500.0);

    for _ in 0..60 {
        lab.step(DT);
    }
    let tilt = track_tilt(lab.item(t).unwrap());
    assert!((tilt.to_degrees() - 5.0).abs() < 1e-6, "tilt {}", tilt.to_degrees());

    let cart = lab.item(c).unwrap();
    let expected = G * (tilt.sin() - 0.002 * tilt.cos()) * 60.0 * DT;
    assert!(cart.vel.x < 0.0, "slides toward the lower left end");
    assert!(
        (cart.vel.x.abs() - expected).abs() / expected < 1e-3,
        "speed {} expected {}",
        cart.vel.x.abs(),
        expected
    );
    assert!(cart.as_cart().unwrap().on_track);
}

#[test]
fn static_friction_holds_on_gentle_slope() {
    let mut lab = lab_with_friction(0.05);
    let t = tilted_track(&mut lab, 200.0, 1.0);
    let c = cart_on(&mut lab, t, 500.0);
    let x = lab.item(c).unwrap().pos.x;

    for _ in 0..300 {
        lab.step(DT);
        assert_eq!(lab.item(c).unwrap().vel.x, 0.0);
    }
    assert_eq!(lab.item(c).unwrap().pos.x, x);
}

#[test]
fn surface_ray_cast_finds_track_table_and_floor() {
    let mut lab = lab_with_friction(0.0);
    let t = tilted_track(&mut lab, 200.0, 0.0);
    let table = TableBounds::centered(lab.stage_width(), lab.config());

    let on_track = nearest_surface_below(500.0, 0.0, lab.items(), &table, None);
    assert_eq!(on_track.kind, SurfaceKind::Object(t));
    assert!((on_track.y - 410.0).abs() < 1e-9);

    let on_table = nearest_surface_below(190.0, 0.0, lab.items(), &table, None);
    assert_eq!(on_table.kind, SurfaceKind::Table);
    assert_eq!(on_table.y, TABLE_TOP);

    let below_track = nearest_surface_below(500.0, 420.0, lab.items(), &table, None);
    assert_eq!(below_track.kind, SurfaceKind::Table);

    let off_table = nearest_surface_below(900.0, 0.0, lab.items(), &table, None);
    assert!(off_table.is_floor());
    assert_eq!(off_table.y, 720.0);
}

#[test]
fn dropped_hangers_land_on_the_surface_below() {
    let mut lab = lab_with_friction(0.0);
    let t = tilted_track(&mut lab, 200.0, 0.0);
    let over_track = lab.spawn(ItemType::MassHanger);
    let over_floor = lab.spawn(ItemType::MassHanger);
    lab.place(over_track, Vec2::new(400.0, 100.0)).unwrap();
    lab.place(over_floor, Vec2::new(900.0, 100.0)).unwrap();

    for _ in 0..120 {
        lab.step(DT);
    }
    let h = lab.item(over_track).unwrap();
    assert_eq!(h.locked_to, Some(t));
    assert!((h.bottom() - 410.0).abs() < 1e-9);

    let h = lab.item(over_floor).unwrap();
    assert!((h.bottom() - 720.0).abs() < 1e-9);
    assert_eq!(h.vel.y, 0.0);
}

#[test]
fn stretched_string_is_pulled_back_to_length() {
    let mut lab = lab_with_friction(0.0);
    let a = lab.spawn(ItemType::MassHanger);
    let b = lab.spawn(ItemType::MassHanger);
    let s = lab.spawn(ItemType::String);
    lab.place(a, Vec2::new(300.0, 380.0)).unwrap();
    lab.place(b, Vec2::new(500.0, 380.0)).unwrap();
    lab.place(s, Vec2::new(400.0, 200.0)).unwrap();
    lab.attach_string(s, StringEnd::A, a, "hook").unwrap();
    lab.attach_string(s, StringEnd::B, b, "hook").unwrap();

    lab.begin_drag(b).unwrap();
    lab.drag_to(b, Vec2::new(600.0, 380.0)).unwrap();
    lab.step(DT);

    let path = string_path(lab.world().connection(s).unwrap(), lab.items()).unwrap();
    assert!((path.length - 200.0).abs() < 1e-6, "length {}", path.length);
    assert!((lab.item(a).unwrap().pos.x - 400.0).abs() < 1e-6);
    assert_eq!(lab.item(b).unwrap().pos.x, 600.0);

    lab.end_drag(b).unwrap();
    for _ in 0..30 {
        lab.step(DT);
        let path = string_path(lab.world().connection(s).unwrap(), lab.items()).unwrap();
        assert!(path.length <= 202.0 + 1e-9);
    }
}

#[test]
fn atwood_machine_accelerates_at_closed_form_rate() {
    let mut lab = lab_with_friction(0.002);
    let t = tilted_track(&mut lab, 225.0, 0.0);
    let c = cart_on(&mut lab, t, 300.0);
    let p = lab.spawn(ItemType::Pulley);
    lab.place(p, Vec2::new(790.0, 370.0)).unwrap();
    lab.step(DT);
    assert_eq!(lab.item(p).unwrap().locked_to, Some(t));

    let h = lab.spawn(ItemType::MassHanger);
    let s = lab.spawn(ItemType::String);
    lab.place(h, Vec2::new(830.0, 420.0)).unwrap();
    lab.place(s, Vec2::new(500.0, 200.0)).unwrap();
    lab.attach_string(s, StringEnd::A, c, "right_hole").unwrap();
    lab.attach_string(s, StringEnd::B, h, "hook").unwrap();
    let path = string_path(lab.world().connection(s).unwrap(), lab.items()).unwrap();
    assert_eq!(path.pulley, Some(p));

    let ticks = 30;
    for _ in 0..ticks {
        lab.step(DT);
    }
    let a = atwood_acceleration(0.5, 0.05, G);
    assert!((a - 356.73).abs() < 0.01);

    let hanger = lab.item(h).unwrap();
    let expected = a * DT * ticks as f64;
    assert!(
        (hanger.vel.y - expected).abs() < 1e-6,
        "hanger vy {} expected {}",
        hanger.vel.y,
        expected
    );
    let cart = lab.item(c).unwrap();
    assert!((cart.vel.x - expected).abs() < 1e-6, "cart follows the hanger toward the pulley");
    assert!(cart.pos.x > 300.0);
    assert!((cart.bottom() - 410.0).abs() < 1e-9);
}

#[test]
fn raised_track_comes_down_and_settles_level() {
    let mut lab = lab_with_friction(0.0);
    let t = lab.spawn(ItemType::Track);
    lab.place(t, Vec2::new(200.0, 100.0)).unwrap();
    lab.set_foot_height(t, Side::Right, 0.0).unwrap();

    let mut last_y = 100.0;
    for _ in 0..120 {
        lab.step(DT);
        let y = lab.item(t).unwrap().pos.y;
        assert!(y >= last_y, "track rose from {} to {}", last_y, y);
        last_y = y;
    }
    let track = lab.item(t).unwrap();
    assert_eq!(track.vel, Vec2::ZERO);
    assert!((foot_position(track, Side::Left).y - TABLE_TOP).abs() < 1e-9);
    assert!((foot_position(track, Side::Right).y - TABLE_TOP).abs() < 1e-9);
    assert!(track_tilt(track).abs() < 1e-9);
}

#[test]
fn placing_again_resets_a_falling_track() {
    let mut lab = lab_with_friction(0.0);
    let t = lab.spawn(ItemType::Track);
    lab.place(t, Vec2::new(900.0, 0.0)).unwrap(); // no foot over the table
    for _ in 0..5 {
        lab.step(DT);
    }
    assert!(lab.item(t).unwrap().vel.y > 0.0);

    lab.recall(t).unwrap();
    assert!(lab.item(t).unwrap().in_tray);
    lab.place(t, Vec2::new(900.0, 0.0)).unwrap();
    let track = lab.item(t).unwrap();
    assert_eq!(track.vel, Vec2::ZERO);
    assert_eq!(track.as_track().unwrap().angular_velocity, 0.0);
    assert_eq!(track.as_track().unwrap().instability_tilt, 0.0);
}

#[test]
fn off_table_track_speeds_up_until_it_hits_the_floor() {
    let mut lab = lab_with_friction(0.0);
    let t = lab.spawn(ItemType::Track);
    lab.place(t, Vec2::new(900.0, 100.0)).unwrap();
    lab.set_foot_height(t, Side::Right, 0.0).unwrap();

    let mut last_vy = 0.0;
    let mut landed = false;
    for _ in 0..120 {
        lab.step(DT);
        let track = lab.item(t).unwrap();
        if track.vel.y == 0.0 {
            assert_eq!(track.as_track().unwrap().instability_tilt, 0.0);
            landed = true;
            break;
        }
        assert!(track.vel.y > last_vy);
        last_vy = track.vel.y;
    }
    assert!(landed);
    let track = lab.item(t).unwrap();
    assert!((foot_position(track, Side::Left).y - 720.0).abs() < 1e-9);
}

#[test]
fn range_reading_sees_only_what_is_ahead() {
    let mut lab = lab_with_friction(0.0);
    let d = lab.spawn(ItemType::MotionDetector);
    lab.place(d, Vec2::new(200.0, 400.0)).unwrap();
    assert_eq!(lab.range_reading(d).unwrap(), None);

    let h = lab.spawn(ItemType::MassHanger);
    lab.place(h, Vec2::new(640.0, 380.0)).unwrap();
    let reading = lab.range_reading(d).unwrap().unwrap();
    assert!((reading - 1.0).abs() < 1e-9);

    lab.set_facing(d, Facing::Left).unwrap();
    assert_eq!(lab.range_reading(d).unwrap(), None);

    lab.recall(d).unwrap();
    assert_eq!(lab.range_reading(d).unwrap(), None);
}

#[test]
fn bubble_level_reads_track_tilt() {
    let mut lab = lab_with_friction(0.0);
    let t = tilted_track(&mut lab, 200.0, 3.0);
    let level = lab.spawn(ItemType::BubbleLevel);
    lab.place(level, Vec2::new(470.0, 380.0)).unwrap();

    let reading = lab.bubble_reading(level).unwrap().unwrap();
    assert!((reading - 3.0).abs() < 1e-6, "reading {}", reading);

    lab.set_foot_height(t, Side::Right, 0.0).unwrap();
    assert!(lab.bubble_reading(level).unwrap().unwrap().abs() < 1e-9);
}

#[test]
fn recording_series_share_one_timeline() {
    let mut lab = lab_with_friction(0.0);
    let d = lab.spawn(ItemType::MotionDetector);
    let h = lab.spawn(ItemType::MassHanger);
    lab.place(d, Vec2::new(200.0, 400.0)).unwrap();
    lab.place(h, Vec2::new(640.0, 380.0)).unwrap();

    lab.start_recording(d, 0.5).unwrap();
    let mut ticks = 0;
    while lab.is_recording() && ticks < 200 {
        lab.step(0.05);
        ticks += 1;
    }
    let rec = lab.take_recording().unwrap();
    assert_eq!(rec.detector, Some(d));
    assert_eq!(rec.times.len(), rec.positions.len());
    assert_eq!(rec.times.len(), rec.velocities.len());
    assert_eq!(rec.times.len(), rec.accelerations.len());
    assert!(rec.times.windows(2).all(|w| w[1] > w[0]));
}
