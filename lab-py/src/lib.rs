//! Python bindings for the lab-core mechanics lab engine.
//!
//! Provides a simple Python API:
//!
//! ```python
//! from lab_physics import Lab
//!
//! lab = Lab(seed=42)
//! track = lab.spawn("track")
//! lab.place(track, 200.0, 410.0)
//! lab.set_foot_height(track, "right", 0.0)
//!
//! cart = lab.spawn("cart")
//! lab.place(cart, 300.0, 370.0)
//!
//! for _ in range(60):
//!     lab.step(1 / 60)
//!     print(lab.item_state(cart)["x"])
//! ```

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;
use tracing_subscriber::EnvFilter;

use lab_core::catalog::{Catalog, CatalogLoader};
use lab_core::config::LabConfig;
use lab_core::geometry::track_tilt;
use lab_core::lab::Lab as CoreLab;
use lab_core::types::{Facing, ItemId, ItemKind, ItemType, Side, StringEnd, Vec2 as CoreVec2};

fn value_error(e: impl std::fmt::Display) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn parse_type(name: &str) -> PyResult<ItemType> {
    ItemType::from_file_stem(name).ok_or_else(|| value_error(format!("unknown item type: {}", name)))
}

fn parse_side(name: &str) -> PyResult<Side> {
    match name {
        "left" => Ok(Side::Left),
        "right" => Ok(Side::Right),
        _ => Err(value_error(format!("side must be 'left' or 'right', got {}", name))),
    }
}

fn parse_end(name: &str) -> PyResult<StringEnd> {
    match name {
        "a" | "A" => Ok(StringEnd::A),
        "b" | "B" => Ok(StringEnd::B),
        _ => Err(value_error(format!("string end must be 'a' or 'b', got {}", name))),
    }
}

fn parse_facing(name: &str) -> PyResult<Facing> {
    match name {
        "left" => Ok(Facing::Left),
        "right" => Ok(Facing::Right),
        _ => Err(value_error(format!("facing must be 'left' or 'right', got {}", name))),
    }
}

/// 2D vector in scene pixels.
#[pyclass]
#[derive(Clone, Copy)]
pub struct Vec2 {
    #[pyo3(get, set)]
    pub x: f64,
    #[pyo3(get, set)]
    pub y: f64,
}

#[pymethods]
impl Vec2 {
    #[new]
    fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn __repr__(&self) -> String {
        format!("Vec2({:.2}, {:.2})", self.x, self.y)
    }

    fn to_tuple(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

impl From<CoreVec2> for Vec2 {
    fn from(v: CoreVec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

/// A lab session.
///
/// Items are referred to by their integer id. Item types, sides and string
/// ends are given as lowercase strings ("mass_hanger", "left", "a").
#[pyclass]
pub struct Lab {
    inner: CoreLab,
}

#[pymethods]
impl Lab {
    /// Create a session, optionally from a YAML config file and a catalog directory.
    #[new]
    #[pyo3(signature = (seed=None, stage_width=1000.0, config_path=None, catalog_dir=None))]
    fn new(
        seed: Option<u64>,
        stage_width: f64,
        config_path: Option<String>,
        catalog_dir: Option<String>,
    ) -> PyResult<Self> {
        let config = match config_path {
            Some(path) => LabConfig::load(path).map_err(value_error)?,
            None => LabConfig::default(),
        };
        let catalog = match catalog_dir {
            Some(dir) => CatalogLoader::new(dir).load_catalog().map_err(value_error)?,
            None => Catalog::builtin(),
        };
        let mut inner = CoreLab::new(config, catalog);
        if let Some(seed) = seed {
            inner = inner.seeded(seed);
        }
        inner.set_stage_width(stage_width);
        Ok(Self { inner })
    }

    /// Simulated time in seconds.
    #[getter]
    fn time(&self) -> f64 {
        self.inner.time()
    }

    #[getter]
    fn stage_width(&self) -> f64 {
        self.inner.stage_width()
    }

    #[setter]
    fn set_stage_width(&mut self, width: f64) {
        self.inner.set_stage_width(width);
    }

    /// Ids of every item, placed or in the tray.
    fn item_ids(&self) -> Vec<u32> {
        self.inner.items().iter().map(|i| i.id.0).collect()
    }

    /// Create an item in the tray and return its id.
    fn spawn(&mut self, item_type: &str) -> PyResult<u32> {
        Ok(self.inner.spawn(parse_type(item_type)?).0)
    }

    fn place(&mut self, id: u32, x: f64, y: f64) -> PyResult<()> {
        self.inner
            .place(ItemId(id), CoreVec2::new(x, y))
            .map_err(value_error)
    }

    fn recall(&mut self, id: u32) -> PyResult<()> {
        self.inner.recall(ItemId(id)).map_err(value_error)
    }

    fn remove(&mut self, id: u32) -> PyResult<()> {
        self.inner.remove(ItemId(id)).map_err(value_error)
    }

    fn begin_drag(&mut self, id: u32) -> PyResult<()> {
        self.inner.begin_drag(ItemId(id)).map_err(value_error)
    }

    fn drag_to(&mut self, id: u32, x: f64, y: f64) -> PyResult<()> {
        self.inner
            .drag_to(ItemId(id), CoreVec2::new(x, y))
            .map_err(value_error)
    }

    fn end_drag(&mut self, id: u32) -> PyResult<()> {
        self.inner.end_drag(ItemId(id)).map_err(value_error)
    }

    /// Set the leveling-screw extension (px) of a track's "left" or "right" foot.
    fn set_foot_height(&mut self, track: u32, side: &str, offset: f64) -> PyResult<()> {
        self.inner
            .set_foot_height(ItemId(track), parse_side(side)?, offset)
            .map_err(value_error)
    }

    fn set_facing(&mut self, detector: u32, facing: &str) -> PyResult<()> {
        self.inner
            .set_facing(ItemId(detector), parse_facing(facing)?)
            .map_err(value_error)
    }

    fn set_mass(&mut self, id: u32, mass: f64) -> PyResult<()> {
        self.inner.set_mass(ItemId(id), mass).map_err(value_error)
    }

    fn attach_string(&mut self, string: u32, end: &str, target: u32, point: &str) -> PyResult<()> {
        self.inner
            .attach_string(ItemId(string), parse_end(end)?, ItemId(target), point)
            .map_err(value_error)
    }

    fn detach_string(&mut self, string: u32, end: &str) -> PyResult<()> {
        self.inner
            .detach_string(ItemId(string), parse_end(end)?)
            .map_err(value_error)
    }

    /// Advance by dt seconds. Returns the ids of items that changed.
    fn step(&mut self, dt: f64) -> Vec<u32> {
        self.inner.step(dt).into_iter().map(|id| id.0).collect()
    }

    /// Run multiple steps at once (more efficient).
    fn step_n(&mut self, dt: f64, steps: usize) {
        for _ in 0..steps {
            self.inner.step(dt);
        }
    }

    /// Motion detector reading in meters, or None.
    fn range_reading(&self, detector: u32) -> PyResult<Option<f64>> {
        self.inner.range_reading(ItemId(detector)).map_err(value_error)
    }

    /// Bubble level reading in degrees, or None.
    fn bubble_reading(&self, level: u32) -> PyResult<Option<f64>> {
        self.inner.bubble_reading(ItemId(level)).map_err(value_error)
    }

    fn start_recording(&mut self, detector: u32, duration: f64) -> PyResult<()> {
        self.inner
            .start_recording(ItemId(detector), duration)
            .map_err(value_error)
    }

    fn is_recording(&self) -> bool {
        self.inner.is_recording()
    }

    /// Finished recording as a dict of lists, or None.
    fn take_recording(&mut self) -> PyResult<Option<PyObject>> {
        let Some(rec) = self.inner.take_recording() else {
            return Ok(None);
        };
        Python::with_gil(|py| {
            let dict = PyDict::new(py);
            dict.set_item("times", rec.times)?;
            dict.set_item("positions", rec.positions)?;
            dict.set_item("velocities", rec.velocities)?;
            dict.set_item("accelerations", rec.accelerations)?;
            Ok(Some(dict.into_any().unbind()))
        })
    }

    fn position(&self, id: u32) -> PyResult<Vec2> {
        Ok(self.inner.item(ItemId(id)).map_err(value_error)?.pos.into())
    }

    fn velocity(&self, id: u32) -> PyResult<Vec2> {
        Ok(self.inner.item(ItemId(id)).map_err(value_error)?.vel.into())
    }

    /// Get an item's state as dict for easy inspection.
    fn item_state(&self, id: u32) -> PyResult<PyObject> {
        let item = self.inner.item(ItemId(id)).map_err(value_error)?;
        Python::with_gil(|py| {
            let dict = PyDict::new(py);
            dict.set_item("id", item.id.0)?;
            dict.set_item("type", item.item_type().file_stem())?;
            dict.set_item("x", item.pos.x)?;
            dict.set_item("y", item.pos.y)?;
            dict.set_item("vx", item.vel.x)?;
            dict.set_item("vy", item.vel.y)?;
            dict.set_item("width", item.size.x)?;
            dict.set_item("height", item.size.y)?;
            dict.set_item("in_tray", item.in_tray)?;
            dict.set_item("dragging", item.dragging)?;
            match &item.kind {
                ItemKind::Track(t) => {
                    dict.set_item("tilt_deg", track_tilt(item).to_degrees())?;
                    dict.set_item("left_foot", t.left_foot)?;
                    dict.set_item("right_foot", t.right_foot)?;
                    dict.set_item("friction", t.friction)?;
                }
                ItemKind::Cart(c) => {
                    dict.set_item("mass", c.mass)?;
                    dict.set_item("on_track", c.on_track)?;
                }
                ItemKind::MassHanger(h) => dict.set_item("mass", h.mass)?,
                ItemKind::Pulley(p) => dict.set_item("radius", p.radius)?,
                ItemKind::String(s) => dict.set_item("length", s.length)?,
                _ => {}
            }
            Ok(dict.into_any().unbind())
        })
    }
}

/// Install a stderr log subscriber filtered by `RUST_LOG`.
///
/// Returns False when a subscriber was already installed.
#[pyfunction]
fn enable_logging() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
        .is_ok()
}

/// Python module definition.
#[pymodule]
fn lab_physics(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<Vec2>()?;
    m.add_class::<Lab>()?;
    m.add_function(wrap_pyfunction!(enable_logging, m)?)?;
    Ok(())
}
