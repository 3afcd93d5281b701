//! The unified, versioned scene schema.
//!
//! Every backend is fed from this representation, either directly or
//! through one of the adapters in [`crate::adapters`]. A `Scene` is an
//! immutable snapshot once handed to a renderer.

use std::path::Path;

use glyph_math::CameraPose;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::atlas::Atlas;
use crate::error::{SceneError, SceneResult};
use crate::geometry::{Plane, Quad, Sphere, Triangle};
use crate::light::Lights;
use crate::material::{Material, MaterialTable};

/// Newest schema version this crate reads and the one it writes.
pub const SCENE_VERSION: u32 = 1;

/// Geometry lists of a scene.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Geometry {
    pub spheres: Vec<Sphere>,
    pub triangles: Vec<Triangle>,
    pub quads: Vec<Quad>,
    pub planes: Vec<Plane>,
}

impl Geometry {
    pub fn is_empty(&self) -> bool {
        self.spheres.is_empty()
            && self.triangles.is_empty()
            && self.quads.is_empty()
            && self.planes.is_empty()
    }
}

/// A complete scene: camera, materials, geometry, lights and atlas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scene {
    pub version: u32,
    pub camera: CameraPose,
    pub materials: Vec<Material>,
    pub geometry: Geometry,
    pub lights: Lights,
    pub atlas: Atlas,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            version: SCENE_VERSION,
            camera: CameraPose::default(),
            materials: MaterialTable::with_legacy().into_vec(),
            geometry: Geometry::default(),
            lights: Lights::default(),
            atlas: Atlas::default(),
        }
    }
}

impl Scene {
    /// Deserialize from a loosely-populated JSON object. Missing fields
    /// take their defaults one by one.
    pub fn from_value(value: &Value) -> SceneResult<Self> {
        let scene: Scene = serde_json::from_value(value.clone())?;
        scene.check_version()?;
        Ok(scene)
    }

    /// Parse a scene from JSON text.
    pub fn from_json_str(json: &str) -> SceneResult<Self> {
        let scene: Scene = serde_json::from_str(json)?;
        scene.check_version()?;
        Ok(scene)
    }

    /// Load a scene from a JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> SceneResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let scene = Self::from_json_str(&text)?;
        log::info!(
            "Loaded scene {} ({} primitives, {} materials)",
            path.as_ref().display(),
            scene.primitive_count(),
            scene.materials.len()
        );
        Ok(scene)
    }

    /// Serialize to a JSON value.
    pub fn to_value(&self) -> SceneResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Serialize to pretty JSON text.
    pub fn to_json_string(&self) -> SceneResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Material by table index.
    pub fn material(&self, index: usize) -> Option<&Material> {
        self.materials.get(index)
    }

    /// Total number of geometry primitives (the area light excluded).
    pub fn primitive_count(&self) -> usize {
        self.geometry.spheres.len()
            + self.geometry.triangles.len()
            + self.geometry.quads.len()
            + self.geometry.planes.len()
    }

    fn check_version(&self) -> SceneResult<()> {
        if self.version > SCENE_VERSION {
            return Err(SceneError::UnsupportedVersion {
                found: self.version,
                supported: SCENE_VERSION,
            });
        }
        Ok(())
    }
}
