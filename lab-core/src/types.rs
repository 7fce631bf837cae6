//! Core types for the lab simulation.
//!
//! All geometry is in scene pixels with y growing downward:
//! - Position: top-left corner of an item's box (px)
//! - Velocity: px/s
//! - Tilt: radians, positive when a track's right end is raised
//! - Mass: kilograms (kg)
//!
//! 400 px correspond to one meter (see [`crate::config::LabConfig::px_per_meter`]).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

// =============================================================================
// Vec2 - 2D Vector
// =============================================================================

/// A 2D vector in scene coordinates (x right, y down).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared magnitude (avoids sqrt for comparisons)
    pub fn magnitude_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude_squared().sqrt()
    }

    /// Unit vector in the same direction, or `None` when the vector is degenerate.
    pub fn try_normalized(&self) -> Option<Self> {
        let mag = self.magnitude();
        if mag < constants::EPSILON {
            None
        } else {
            Some(*self / mag)
        }
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn distance(&self, other: &Self) -> f64 {
        (*other - *self).magnitude()
    }
}

impl Add for Vec2 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, other: Self) {
        self.x -= other.x;
        self.y -= other.y;
    }
}

impl Mul<f64> for Vec2 {
    type Output = Self;
    fn mul(self, scalar: f64) -> Self {
        Self::new(self.x * scalar, self.y * scalar)
    }
}

impl Div<f64> for Vec2 {
    type Output = Self;
    fn div(self, scalar: f64) -> Self {
        Self::new(self.x / scalar, self.y / scalar)
    }
}

impl Neg for Vec2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl Default for Vec2 {
    fn default() -> Self {
        Self::ZERO
    }
}

// =============================================================================
// Rect - axis-aligned box
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.left + self.width * 0.5, self.top + self.height * 0.5)
    }

    pub fn contains_x(&self, x: f64) -> bool {
        x >= self.left && x <= self.right()
    }

    /// Overlap extents along x and y, or `None` if the boxes do not intersect.
    pub fn overlap(&self, other: &Rect) -> Option<(f64, f64)> {
        let ox = self.right().min(other.right()) - self.left.max(other.left);
        let oy = self.bottom().min(other.bottom()) - self.top.max(other.top);
        if ox > 0.0 && oy > 0.0 {
            Some((ox, oy))
        } else {
            None
        }
    }
}

// =============================================================================
// Identity and tags
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u32);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Equipment type tag, used as the catalog key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Track,
    Cart,
    Pulley,
    String,
    MassHanger,
    MotionDetector,
    BubbleLevel,
    MeterStick,
    Protractor,
}

impl ItemType {
    pub const ALL: [ItemType; 9] = [
        ItemType::Track,
        ItemType::Cart,
        ItemType::Pulley,
        ItemType::String,
        ItemType::MassHanger,
        ItemType::MotionDetector,
        ItemType::BubbleLevel,
        ItemType::MeterStick,
        ItemType::Protractor,
    ];

    /// File stem of this type's catalog entry.
    pub fn file_stem(&self) -> &'static str {
        match self {
            ItemType::Track => "track",
            ItemType::Cart => "cart",
            ItemType::Pulley => "pulley",
            ItemType::String => "string",
            ItemType::MassHanger => "mass_hanger",
            ItemType::MotionDetector => "motion_detector",
            ItemType::BubbleLevel => "bubble_level",
            ItemType::MeterStick => "meter_stick",
            ItemType::Protractor => "protractor",
        }
    }

    pub fn from_file_stem(stem: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.file_stem() == stem)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    Left,
    Right,
}

impl Facing {
    pub fn sign(&self) -> f64 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }
}

/// Left or right foot of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

/// One of the two ends of a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StringEnd {
    A,
    B,
}

// =============================================================================
// Per-kind attributes
// =============================================================================

/// Support rail with two adjustable feet.
///
/// `left_foot`/`right_foot` are leveling-screw extensions in px; the static tilt
/// follows from their difference. `instability_tilt` is the dynamic component
/// produced by uneven or missing support.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub left_foot: f64,
    pub right_foot: f64,
    pub instability_tilt: f64,
    pub angular_velocity: f64,
    pub friction: f64,
}

impl Track {
    pub fn foot(&self, side: Side) -> f64 {
        match side {
            Side::Left => self.left_foot,
            Side::Right => self.right_foot,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub mass: f64,
    pub on_track: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pulley {
    /// Wheel radius in px. The wheel sits at the top of the pulley's box.
    pub radius: f64,
}

/// A string item. Without a fixed length it is decorative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StringItem {
    pub length: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MassHanger {
    /// Total hanging mass including slotted weights.
    pub mass: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionDetector {
    pub facing: Facing,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ItemKind {
    Track(Track),
    Cart(Cart),
    Pulley(Pulley),
    String(StringItem),
    MassHanger(MassHanger),
    MotionDetector(MotionDetector),
    BubbleLevel,
    MeterStick,
    Protractor,
}

impl ItemKind {
    pub fn item_type(&self) -> ItemType {
        match self {
            ItemKind::Track(_) => ItemType::Track,
            ItemKind::Cart(_) => ItemType::Cart,
            ItemKind::Pulley(_) => ItemType::Pulley,
            ItemKind::String(_) => ItemType::String,
            ItemKind::MassHanger(_) => ItemType::MassHanger,
            ItemKind::MotionDetector(_) => ItemType::MotionDetector,
            ItemKind::BubbleLevel => ItemType::BubbleLevel,
            ItemKind::MeterStick => ItemType::MeterStick,
            ItemKind::Protractor => ItemType::Protractor,
        }
    }
}

// =============================================================================
// Item
// =============================================================================

/// One piece of equipment in the scene or in the tray.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub pos: Vec2,
    pub size: Vec2,
    pub vel: Vec2,
    /// Stored in the tray: not simulated, not part of the scene.
    pub in_tray: bool,
    /// Being moved by the pointer this tick; excluded from integration.
    pub dragging: bool,
    /// Track this body is resting on, carried over between ticks.
    pub locked_to: Option<ItemId>,
    pub kind: ItemKind,
}

impl Item {
    pub fn new(id: ItemId, kind: ItemKind, size: Vec2) -> Self {
        Self {
            id,
            pos: Vec2::ZERO,
            size,
            vel: Vec2::ZERO,
            in_tray: true,
            dragging: false,
            locked_to: None,
            kind,
        }
    }

    /// Builder used mostly by tests and hosts that construct scenes directly.
    pub fn placed_at(mut self, pos: Vec2) -> Self {
        self.pos = pos;
        self.in_tray = false;
        self
    }

    pub fn item_type(&self) -> ItemType {
        self.kind.item_type()
    }

    pub fn rect(&self) -> Rect {
        Rect {
            left: self.pos.x,
            top: self.pos.y,
            width: self.size.x,
            height: self.size.y,
        }
    }

    pub fn center(&self) -> Vec2 {
        self.rect().center()
    }

    pub fn bottom(&self) -> f64 {
        self.pos.y + self.size.y
    }

    pub fn is_placed(&self) -> bool {
        !self.in_tray
    }

    /// Placed and not being moved by hand.
    pub fn is_simulated(&self) -> bool {
        !self.in_tray && !self.dragging
    }

    /// Meter sticks and protractors: no gravity, never block a ray-cast.
    pub fn is_measuring_tool(&self) -> bool {
        matches!(self.kind, ItemKind::MeterStick | ItemKind::Protractor)
    }

    pub fn as_track(&self) -> Option<&Track> {
        match &self.kind {
            ItemKind::Track(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_track_mut(&mut self) -> Option<&mut Track> {
        match &mut self.kind {
            ItemKind::Track(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_cart(&self) -> Option<&Cart> {
        match &self.kind {
            ItemKind::Cart(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_cart_mut(&mut self) -> Option<&mut Cart> {
        match &mut self.kind {
            ItemKind::Cart(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_pulley(&self) -> Option<&Pulley> {
        match &self.kind {
            ItemKind::Pulley(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_hanger(&self) -> Option<&MassHanger> {
        match &self.kind {
            ItemKind::MassHanger(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&StringItem> {
        match &self.kind {
            ItemKind::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_track(&self) -> bool {
        matches!(self.kind, ItemKind::Track(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self.kind, ItemKind::String(_))
    }
}

// =============================================================================
// String connections
// =============================================================================

/// A string end tied to a named attach point on a target item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub item_id: ItemId,
    pub point: String,
}

impl Endpoint {
    pub fn new(item_id: ItemId, point: impl Into<String>) -> Self {
        Self {
            item_id,
            point: point.into(),
        }
    }
}

/// Connection record owned by a string item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringConnection {
    pub string_id: ItemId,
    pub a: Option<Endpoint>,
    pub b: Option<Endpoint>,
}

impl StringConnection {
    pub fn new(string_id: ItemId) -> Self {
        Self {
            string_id,
            a: None,
            b: None,
        }
    }

    pub fn end(&self, end: StringEnd) -> Option<&Endpoint> {
        match end {
            StringEnd::A => self.a.as_ref(),
            StringEnd::B => self.b.as_ref(),
        }
    }

    pub fn end_mut(&mut self, end: StringEnd) -> &mut Option<Endpoint> {
        match end {
            StringEnd::A => &mut self.a,
            StringEnd::B => &mut self.b,
        }
    }

    /// True when either end is tied to `id`.
    pub fn references(&self, id: ItemId) -> bool {
        [&self.a, &self.b]
            .into_iter()
            .flatten()
            .any(|e| e.item_id == id)
    }
}

// =============================================================================
// World snapshot
// =============================================================================

/// Immutable scene snapshot consumed and produced by the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub items: Vec<Item>,
    pub connections: Vec<StringConnection>,
}

impl World {
    pub fn new(items: Vec<Item>, connections: Vec<StringConnection>) -> Self {
        Self { items, connections }
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.iter_mut().find(|i| i.id == id)
    }

    pub fn connection(&self, string_id: ItemId) -> Option<&StringConnection> {
        self.connections.iter().find(|c| c.string_id == string_id)
    }
}

/// Find an item by id in a slice.
pub fn find_item(items: &[Item], id: ItemId) -> Option<&Item> {
    items.iter().find(|i| i.id == id)
}

pub fn index_of(items: &[Item], id: ItemId) -> Option<usize> {
    items.iter().position(|i| i.id == id)
}

// =============================================================================
// Engine constants
// =============================================================================

/// Fixed thresholds and tuning factors of the engine.
pub mod constants {
    /// Small value for floating-point comparisons
    pub const EPSILON: f64 = 1e-9;

    /// Max gap between a body's bottom and a track surface to count as "on" it (px)
    pub const TRACK_SNAP_PX: f64 = 35.0;

    /// Stretch a fixed-length string tolerates before it is corrected (px)
    pub const STRING_TOLERANCE_PX: f64 = 2.0;

    /// Share of the overshoot removed per tick in an Atwood pairing
    pub const ATWOOD_NUDGE: f64 = 0.6;

    /// Per-tick horizontal velocity retention of a free body (air drag)
    pub const HORIZONTAL_DAMPING: f64 = 0.999;

    /// Horizontal velocity kept after landing on anything but the floor
    pub const LANDING_RETAIN: f64 = 0.7;

    /// Speed below which a cart on a near-flat track is snapped to rest (px/s)
    pub const REST_SPEED_PX: f64 = 0.5;

    /// Tilt below which a track counts as near-flat (rad)
    pub const NEAR_FLAT_TILT: f64 = 0.002;

    /// Foot surfaces closer than this are treated as level (px)
    pub const LEVEL_TOLERANCE_PX: f64 = 20.0;

    /// Instability tilt decay per tick on level support
    pub const INSTABILITY_DECAY: f64 = 0.08;

    /// Largest tilt a supported track can hold (rad, 7°)
    pub const MAX_STABLE_TILT: f64 = 7.0 * std::f64::consts::PI / 180.0;

    /// Centre of mass must stay within this share of the span from the pivot foot
    pub const COM_STABLE_FRACTION: f64 = 0.4;

    /// Tilt beyond which a tipping track also drops (rad, 45°)
    pub const FREE_FALL_TILT: f64 = std::f64::consts::FRAC_PI_4;

    /// Effective angular acceleration of a tipping track (rad/s²)
    pub const TIP_ANGULAR_ACCEL: f64 = 6.0;

    /// Horizontal slide speed of a tipping track toward its falling side (px/s)
    pub const TIP_SLIDE_PX: f64 = 60.0;

    /// Per-tick easing factor for instability tilt targets
    pub const TILT_EASE: f64 = 0.15;

    /// Per-tick easing factor for a supported track's height
    pub const HEIGHT_EASE: f64 = 0.3;

    /// Feet probe for their support from this far above the track top at that end (px)
    pub const FOOT_PROBE_PX: f64 = 5.0;

    /// A foot lower than the table top by more than this is no longer on the table (px)
    pub const TABLE_CONTACT_PX: f64 = 25.0;

    /// Vertical half-band of a motion detector's line of sight (px)
    pub const SENSOR_BAND_PX: f64 = 10.0;

    /// Extra push applied when separating overlapping items (px)
    pub const SEPARATION_MARGIN_PX: f64 = 2.0;

    /// Slack beyond a pulley's wheel within which the wheel still catches a string (px)
    pub const PULLEY_CAPTURE_PX: f64 = 30.0;

    /// Gap below which a body counts as resting on the surface under it (px)
    pub const RESTING_GAP_PX: f64 = 1.0;
}

// =============================================================================
// Tests
// =============================================================================
