//! Equipment catalog: default dimensions and physical attributes per item type.
//!
//! Built-in defaults cover every type. A catalog directory may override them
//! with one YAML file per type:
//!
//! ```text
//! catalog/
//! ├── track.yaml
//! ├── cart.yaml
//! ├── mass_hanger.yaml
//! └── ...
//! ```
//!
//! ```yaml
//! width: 80.0
//! height: 40.0
//! mass: 0.5
//! ```
//!
//! Attributes a file leaves out fall back to the type's built-in value.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CatalogError;
use crate::types::{
    Cart, Facing, Item, ItemId, ItemKind, ItemType, MassHanger, MotionDetector, Pulley, StringItem,
    Track, Vec2,
};

/// Range of the random leveling-screw offset given to a new track (px).
const TRACK_OFFSET_MIN_PX: f64 = 4.0;
const TRACK_OFFSET_MAX_PX: f64 = 14.0;

const DEFAULT_CART_MASS: f64 = 0.5;
const DEFAULT_HANGER_MASS: f64 = 0.05;
const DEFAULT_TRACK_FRICTION: f64 = 0.002;
const DEFAULT_PULLEY_RADIUS: f64 = 15.0;

/// Default attributes of one equipment type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentSpec {
    /// Box width (px)
    pub width: f64,
    /// Box height (px)
    pub height: f64,
    /// Mass in kg, for carts and mass hangers
    #[serde(default)]
    pub mass: Option<f64>,
    /// Coulomb friction coefficient of a track surface
    #[serde(default)]
    pub friction: Option<f64>,
    /// Wheel radius of a pulley (px)
    #[serde(default)]
    pub radius: Option<f64>,
}

impl EquipmentSpec {
    fn sized(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            mass: None,
            friction: None,
            radius: None,
        }
    }

    /// Built-in defaults for `ty`.
    pub fn builtin(ty: ItemType) -> Self {
        match ty {
            ItemType::Track => Self {
                friction: Some(DEFAULT_TRACK_FRICTION),
                ..Self::sized(600.0, 30.0)
            },
            ItemType::Cart => Self {
                mass: Some(DEFAULT_CART_MASS),
                ..Self::sized(80.0, 40.0)
            },
            ItemType::Pulley => Self {
                radius: Some(DEFAULT_PULLEY_RADIUS),
                ..Self::sized(30.0, 40.0)
            },
            ItemType::String => Self::sized(20.0, 20.0),
            ItemType::MassHanger => Self {
                mass: Some(DEFAULT_HANGER_MASS),
                ..Self::sized(20.0, 60.0)
            },
            ItemType::MotionDetector => Self::sized(40.0, 40.0),
            ItemType::BubbleLevel => Self::sized(60.0, 20.0),
            ItemType::MeterStick => Self::sized(400.0, 12.0),
            ItemType::Protractor => Self::sized(120.0, 60.0),
        }
    }
}

/// One catalog file as written on disk. Every attribute is optional.
#[derive(Debug, Clone, Default, Deserialize)]
struct CatalogEntry {
    #[serde(default)]
    width: Option<f64>,
    #[serde(default)]
    height: Option<f64>,
    #[serde(default)]
    mass: Option<f64>,
    #[serde(default)]
    friction: Option<f64>,
    #[serde(default)]
    radius: Option<f64>,
}

impl CatalogEntry {
    /// Fill the attributes the file leaves out from `defaults`.
    fn or_defaults(self, defaults: EquipmentSpec) -> EquipmentSpec {
        EquipmentSpec {
            width: self.width.unwrap_or(defaults.width),
            height: self.height.unwrap_or(defaults.height),
            mass: self.mass.or(defaults.mass),
            friction: self.friction.or(defaults.friction),
            radius: self.radius.or(defaults.radius),
        }
    }
}

/// Equipment defaults for every item type.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    specs: HashMap<ItemType, EquipmentSpec>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Catalog {
    pub fn builtin() -> Self {
        let specs = ItemType::ALL
            .into_iter()
            .map(|ty| (ty, EquipmentSpec::builtin(ty)))
            .collect();
        Self { specs }
    }

    pub fn spec(&self, ty: ItemType) -> EquipmentSpec {
        self.specs
            .get(&ty)
            .cloned()
            .unwrap_or_else(|| EquipmentSpec::builtin(ty))
    }

    pub fn set(&mut self, ty: ItemType, spec: EquipmentSpec) {
        self.specs.insert(ty, spec);
    }

    /// A new in-tray item of type `ty`.
    ///
    /// Tracks start with a random leveling-screw offset on their right foot so
    /// they need leveling before use.
    pub fn instantiate<R: Rng + ?Sized>(&self, ty: ItemType, id: ItemId, rng: &mut R) -> Item {
        let spec = self.spec(ty);
        let kind = match ty {
            ItemType::Track => {
                let offset = rng.gen_range(TRACK_OFFSET_MIN_PX..=TRACK_OFFSET_MAX_PX);
                let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
                ItemKind::Track(Track {
                    left_foot: 0.0,
                    right_foot: sign * offset,
                    instability_tilt: 0.0,
                    angular_velocity: 0.0,
                    friction: spec.friction.unwrap_or(DEFAULT_TRACK_FRICTION),
                })
            }
            ItemType::Cart => ItemKind::Cart(Cart {
                mass: spec.mass.unwrap_or(DEFAULT_CART_MASS),
                on_track: false,
            }),
            ItemType::Pulley => ItemKind::Pulley(Pulley {
                radius: spec.radius.unwrap_or(DEFAULT_PULLEY_RADIUS),
            }),
            ItemType::String => ItemKind::String(StringItem { length: None }),
            ItemType::MassHanger => ItemKind::MassHanger(MassHanger {
                mass: spec.mass.unwrap_or(DEFAULT_HANGER_MASS),
            }),
            ItemType::MotionDetector => ItemKind::MotionDetector(MotionDetector {
                facing: Facing::Right,
            }),
            ItemType::BubbleLevel => ItemKind::BubbleLevel,
            ItemType::MeterStick => ItemKind::MeterStick,
            ItemType::Protractor => ItemKind::Protractor,
        };
        Item::new(id, kind, Vec2::new(spec.width, spec.height))
    }
}

/// Reads catalog entries from a directory of YAML files.
pub struct CatalogLoader {
    base_path: PathBuf,
}

impl CatalogLoader {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Load one type's entry from `<dir>/<type>.yaml`. Attributes the file
    /// leaves out take the type's built-in value.
    ///
    /// # Example
    /// ```ignore
    /// let loader = CatalogLoader::new("catalog");
    /// let cart = loader.load(ItemType::Cart)?;
    /// ```
    pub fn load(&self, ty: ItemType) -> Result<EquipmentSpec, CatalogError> {
        let name = ty.file_stem();
        let path = self.base_path.join(format!("{}.yaml", name));
        if !path.exists() {
            return Err(CatalogError::NotFound(name.to_string()));
        }
        let contents = fs::read_to_string(&path)?;
        let entry: CatalogEntry = serde_yaml::from_str(&contents)?;
        Ok(entry.or_defaults(EquipmentSpec::builtin(ty)))
    }

    /// Types with an entry in the directory, in catalog order.
    pub fn list(&self) -> Result<Vec<ItemType>, CatalogError> {
        if !self.base_path.exists() {
            return Ok(vec![]);
        }

        let mut found = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let name = file_name.to_string_lossy();
            if let Some(ty) = name
                .strip_suffix(".yaml")
                .and_then(ItemType::from_file_stem)
            {
                found.push(ty);
            }
        }
        found.sort_by_key(|ty| ItemType::ALL.iter().position(|t| t == ty));
        Ok(found)
    }

    /// The built-in catalog with every entry found on disk laid over it.
    pub fn load_catalog(&self) -> Result<Catalog, CatalogError> {
        let mut catalog = Catalog::builtin();
        for ty in ItemType::ALL {
            match self.load(ty) {
                Ok(spec) => catalog.set(ty, spec),
                Err(CatalogError::NotFound(name)) => {
                    debug!(entry = %name, "no catalog file, using built-in defaults");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(catalog)
    }
}

// =============================================================================
// Tests
// =============================================================================
