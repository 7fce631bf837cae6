//! Support and contact queries for bodies in the scene.
//!
//! This module handles:
//! - **Detection**: ray-casting straight down to the nearest supporting surface
//!   (table top, floor, or the top of another item)
//! - **Resolution**: clamping a descending body onto what it hit, and pushing a
//!   dropped item out of whatever it overlaps
//!
//! ```text
//!        ● body bottom (x, y)
//!        │
//!   ┌────┼────┐  object top   <- nearest candidate wins
//!   │    │    │
//! ══╪════╪════╪══ table top   (only within the table's x-range)
//!        │
//! ───────┴─────── floor       (always available)
//! ```

pub mod detection;
pub mod resolution;

pub use detection::*;
pub use resolution::*;
