//! # Lab Core
//!
//! A physics engine for a 2D virtual mechanics lab: carts on tiltable tracks,
//! pulleys, hanging masses, strings and motion detectors.
//!
//! ## Architecture
//!
//! - `types`: Core data structures (Vec2, items, string connections, constants)
//! - `config`: Scene configuration and table layout
//! - `geometry`: Track tilt, surface height, feet and track lookup
//! - `attach`: Named string attach points
//! - `collision`: Surface ray-cast, landings and post-drop separation
//! - `forces`: Incline gravity, Coulomb friction and Atwood coupling
//! - `integrator`: Per-body semi-implicit Euler step
//! - `stability`: Track support classification and tilt/tip/fall response
//! - `strings`: Fixed-length string constraints and pulley wrapping
//! - `sensor`: Motion detector and bubble level readings
//! - `analysis`: Numerical differentiation of recorded series
//! - `recording`: Motion detector recordings
//! - `catalog`: YAML-backed equipment defaults
//! - `simulation`: Main orchestrator
//! - `lab`: Session layer driven by the host

pub mod analysis;
pub mod attach;
pub mod catalog;
pub mod collision;
pub mod config;
pub mod error;
pub mod forces;
pub mod geometry;
pub mod integrator;
pub mod lab;
pub mod recording;
pub mod sensor;
pub mod simulation;
pub mod stability;
pub mod strings;
pub mod types;

pub use catalog::{Catalog, CatalogLoader, EquipmentSpec};
pub use config::{LabConfig, TableBounds};
pub use error::{CatalogError, ConfigError, LabError};
pub use lab::Lab;
pub use recording::Recording;
pub use simulation::{Simulation, StepOutput};
pub use types::{Item, ItemId, ItemKind, ItemType, Side, StringEnd, Vec2, World};
