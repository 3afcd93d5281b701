//! Fluent, validating scene builder.
//!
//! Every method checks its numeric inputs and fails with a descriptive
//! [`SceneError`] on malformed vectors or non-finite numbers. Geometry
//! inserts past the configured [`Capacity`] are dropped without error.

use glyph_math::{CameraPose, Vec3};
use serde_json::Value;

use crate::adapters::{PathTracerScene, RasterScene, RayTraceScene};
use crate::atlas::Atlas;
use crate::error::{check_finite, SceneError, SceneResult};
use crate::geometry::{Plane, Quad, QuadDiagonal, Sphere, TexelUv, Triangle};
use crate::light::{AreaLight, DirectionalLight, EnvLight, Lights, PointLight};
use crate::material::{Material, MaterialRef, MaterialTable};
use crate::mesh::Mesh;
use crate::scene::{Geometry, Scene, SCENE_VERSION};

/// Fixed per-list limits shared by every backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capacity {
    pub spheres: usize,
    pub triangles: usize,
    pub quads: usize,
    pub planes: usize,
    pub point_lights: usize,
    pub directional_lights: usize,
}

impl Default for Capacity {
    fn default() -> Self {
        Self {
            spheres: 32,
            triangles: 512,
            quads: 64,
            planes: 8,
            point_lights: 8,
            directional_lights: 4,
        }
    }
}

/// Anything that can be read as a list of floats: glam vectors, arrays,
/// slices and `Vec<f32>`.
pub trait VecArg {
    fn components(&self) -> Vec<f32>;
}

impl VecArg for Vec3 {
    fn components(&self) -> Vec<f32> {
        self.to_array().to_vec()
    }
}

impl<const N: usize> VecArg for [f32; N] {
    fn components(&self) -> Vec<f32> {
        self.to_vec()
    }
}

impl VecArg for &[f32] {
    fn components(&self) -> Vec<f32> {
        self.to_vec()
    }
}

impl VecArg for Vec<f32> {
    fn components(&self) -> Vec<f32> {
        self.clone()
    }
}

/// Read a 3-vector, rejecting wrong arity and non-finite components.
pub fn vec3_arg(field: &'static str, value: impl VecArg) -> SceneResult<Vec3> {
    let c = value.components();
    if c.len() != 3 {
        return Err(SceneError::InvalidVector {
            field,
            reason: format!("expected 3 components, got {}", c.len()),
        });
    }
    if let Some(i) = c.iter().position(|v| !v.is_finite()) {
        return Err(SceneError::InvalidVector {
            field,
            reason: format!("component {} is not finite ({})", i, c[i]),
        });
    }
    Ok(Vec3::new(c[0], c[1], c[2]))
}

fn unit_arg(field: &'static str, value: impl VecArg) -> SceneResult<Vec3> {
    vec3_arg(field, value)?
        .try_normalize()
        .ok_or_else(|| SceneError::InvalidVector {
            field,
            reason: "zero length".into(),
        })
}

fn non_negative(field: &'static str, value: f32) -> SceneResult<f32> {
    let value = check_finite(field, value)?;
    if value < 0.0 {
        return Err(SceneError::InvalidValue {
            field,
            reason: format!("must be non-negative, got {value}"),
        });
    }
    Ok(value)
}

fn positive(field: &'static str, value: f32) -> SceneResult<f32> {
    let value = check_finite(field, value)?;
    if value <= 0.0 {
        return Err(SceneError::InvalidValue {
            field,
            reason: format!("must be positive, got {value}"),
        });
    }
    Ok(value)
}

/// Mutable working copy of a scene.
#[derive(Clone, Debug)]
pub struct SceneBuilder {
    capacity: Capacity,
    camera: CameraPose,
    materials: MaterialTable,
    geometry: Geometry,
    lights: Lights,
    atlas: Atlas,
    dropped: usize,
}

impl Default for SceneBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneBuilder {
    /// Empty scene with the legacy material table and default capacity.
    pub fn new() -> Self {
        Self::with_capacity(Capacity::default())
    }

    pub fn with_capacity(capacity: Capacity) -> Self {
        Self {
            capacity,
            camera: CameraPose::default(),
            materials: MaterialTable::with_legacy(),
            geometry: Geometry::default(),
            lights: Lights::default(),
            atlas: Atlas::default(),
            dropped: 0,
        }
    }

    /// Start from an existing scene. Lists longer than the capacity are
    /// truncated the same way inserts would be.
    pub fn from_scene(scene: Scene) -> Self {
        Self::from_scene_with_capacity(scene, Capacity::default())
    }

    pub fn from_scene_with_capacity(scene: Scene, capacity: Capacity) -> Self {
        let mut builder = Self {
            capacity,
            camera: scene.camera,
            materials: MaterialTable::from_vec(scene.materials),
            geometry: scene.geometry,
            lights: scene.lights,
            atlas: scene.atlas,
            dropped: 0,
        };
        builder.truncate_to_capacity();

        let count = builder.materials.len();
        let g = &builder.geometry;
        let out_of_range = g.spheres.iter().map(|s| s.material)
            .chain(g.triangles.iter().map(|t| t.material))
            .chain(g.quads.iter().map(|q| q.material))
            .chain(g.planes.iter().map(|p| p.material))
            .filter(|&m| m >= count)
            .count();
        if out_of_range > 0 {
            log::warn!(
                "{} primitives reference materials outside the table ({} entries); they render gray",
                out_of_range,
                count
            );
        }
        builder
    }

    /// Deserialize a loosely-populated JSON object.
    pub fn from_object(value: &Value) -> SceneResult<Self> {
        Ok(Self::from_scene(Scene::from_value(value)?))
    }

    pub fn from_json_str(json: &str) -> SceneResult<Self> {
        Ok(Self::from_scene(Scene::from_json_str(json)?))
    }

    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn lights(&self) -> &Lights {
        &self.lights
    }

    pub fn materials(&self) -> &MaterialTable {
        &self.materials
    }

    pub fn camera(&self) -> &CameraPose {
        &self.camera
    }

    /// Number of inserts dropped at capacity so far.
    pub fn dropped_count(&self) -> usize {
        self.dropped
    }

    /// Append (or find by name) a material and return its index.
    pub fn add_material(&mut self, material: Material) -> SceneResult<usize> {
        self.materials.add(material)
    }

    /// Resolve a material reference without adding geometry.
    pub fn material_index(&mut self, material: impl Into<MaterialRef>) -> SceneResult<usize> {
        self.materials.resolve(material)
    }

    pub fn add_sphere(
        &mut self,
        center: impl VecArg,
        radius: f32,
        material: impl Into<MaterialRef>,
    ) -> SceneResult<&mut Self> {
        let center = vec3_arg("center", center)?;
        let radius = positive("radius", radius)?;
        if !self.has_room("sphere", self.geometry.spheres.len(), self.capacity.spheres) {
            return Ok(self);
        }
        let material = self.materials.resolve(material)?;
        self.geometry.spheres.push(Sphere::new(center, radius, material));
        Ok(self)
    }

    /// Untextured triangle, counter-clockwise front face.
    pub fn add_triangle(
        &mut self,
        a: impl VecArg,
        b: impl VecArg,
        c: impl VecArg,
        material: impl Into<MaterialRef>,
    ) -> SceneResult<&mut Self> {
        self.add_triangle_uv(a, b, c, material, [[0, 0]; 3])
    }

    /// Triangle with texel-space UVs into the scene atlas.
    pub fn add_triangle_uv(
        &mut self,
        a: impl VecArg,
        b: impl VecArg,
        c: impl VecArg,
        material: impl Into<MaterialRef>,
        uv: [TexelUv; 3],
    ) -> SceneResult<&mut Self> {
        let (a, b, c) = (vec3_arg("a", a)?, vec3_arg("b", b)?, vec3_arg("c", c)?);
        if !self.has_room("triangle", self.geometry.triangles.len(), self.capacity.triangles) {
            return Ok(self);
        }
        let material = self.materials.resolve(material)?;
        self.geometry
            .triangles
            .push(Triangle::new(a, b, c, material).with_uv(uv));
        Ok(self)
    }

    pub fn add_quad(
        &mut self,
        a: impl VecArg,
        b: impl VecArg,
        c: impl VecArg,
        d: impl VecArg,
        material: impl Into<MaterialRef>,
    ) -> SceneResult<&mut Self> {
        self.add_quad_uv(a, b, c, d, material, [[0, 0]; 4], QuadDiagonal::Ac)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_quad_uv(
        &mut self,
        a: impl VecArg,
        b: impl VecArg,
        c: impl VecArg,
        d: impl VecArg,
        material: impl Into<MaterialRef>,
        uv: [TexelUv; 4],
        diagonal: QuadDiagonal,
    ) -> SceneResult<&mut Self> {
        let (a, b) = (vec3_arg("a", a)?, vec3_arg("b", b)?);
        let (c, d) = (vec3_arg("c", c)?, vec3_arg("d", d)?);
        if !self.has_room("quad", self.geometry.quads.len(), self.capacity.quads) {
            return Ok(self);
        }
        let material = self.materials.resolve(material)?;
        self.geometry.quads.push(
            Quad::new(a, b, c, d, material)
                .with_uv(uv)
                .with_diagonal(diagonal),
        );
        Ok(self)
    }

    /// Infinite plane `normal · p = d`. Only the ray tracer and the
    /// rasterizer draw planes.
    pub fn add_plane(
        &mut self,
        normal: impl VecArg,
        d: f32,
        material: impl Into<MaterialRef>,
    ) -> SceneResult<&mut Self> {
        let normal = unit_arg("normal", normal)?;
        let d = check_finite("d", d)?;
        if !self.has_room("plane", self.geometry.planes.len(), self.capacity.planes) {
            return Ok(self);
        }
        let material = self.materials.resolve(material)?;
        self.geometry.planes.push(Plane::new(normal, d, material));
        Ok(self)
    }

    /// Add every triangle of a mesh; stops quietly when the triangle list is full.
    pub fn add_mesh(&mut self, mesh: &Mesh, material: impl Into<MaterialRef>) -> SceneResult<&mut Self> {
        let material = self.materials.resolve(material)?;
        for tri in mesh.triangles() {
            let [a, b, c] = tri.positions;
            self.add_triangle_uv(a, b, c, material, tri.uvs)?;
        }
        Ok(self)
    }

    pub fn set_camera_pose(
        &mut self,
        position: impl VecArg,
        yaw: f32,
        pitch: f32,
        fov_y: f32,
    ) -> SceneResult<&mut Self> {
        let position = vec3_arg("position", position)?;
        let yaw = check_finite("yaw", yaw)?;
        let pitch = check_finite("pitch", pitch)?;
        let fov_y = positive("fov_y", fov_y)?;
        if fov_y >= std::f32::consts::PI {
            return Err(SceneError::InvalidValue {
                field: "fov_y",
                reason: format!("must be below pi radians, got {fov_y}"),
            });
        }
        self.camera = CameraPose::new(position, yaw, pitch, fov_y);
        Ok(self)
    }

    /// Flat environment color seen by rays that miss.
    pub fn set_env_light(&mut self, color: impl VecArg, intensity: f32) -> SceneResult<&mut Self> {
        let color = vec3_arg("color", color)?;
        let intensity = non_negative("intensity", intensity)?;
        self.lights.env = EnvLight::flat(color, intensity);
        Ok(self)
    }

    /// Environment blending from `ground` (looking down) to `sky` (looking up).
    pub fn set_env_gradient(
        &mut self,
        sky: impl VecArg,
        ground: impl VecArg,
        intensity: f32,
    ) -> SceneResult<&mut Self> {
        let sky = vec3_arg("sky", sky)?;
        let ground = vec3_arg("ground", ground)?;
        let intensity = non_negative("intensity", intensity)?;
        self.lights.env = EnvLight {
            color: sky,
            intensity,
            ground: Some(ground),
        };
        Ok(self)
    }

    pub fn add_point_light(
        &mut self,
        position: impl VecArg,
        color: impl VecArg,
        intensity: f32,
    ) -> SceneResult<&mut Self> {
        let position = vec3_arg("position", position)?;
        let color = vec3_arg("color", color)?;
        let intensity = non_negative("intensity", intensity)?;
        if !self.has_room("point light", self.lights.points.len(), self.capacity.point_lights) {
            return Ok(self);
        }
        self.lights.points.push(PointLight {
            position,
            color,
            intensity,
        });
        Ok(self)
    }

    /// `direction` points toward the light and is normalized here.
    pub fn add_directional_light(
        &mut self,
        direction: impl VecArg,
        color: impl VecArg,
        intensity: f32,
    ) -> SceneResult<&mut Self> {
        let direction = unit_arg("direction", direction)?;
        let color = vec3_arg("color", color)?;
        let intensity = non_negative("intensity", intensity)?;
        if !self.has_room(
            "directional light",
            self.lights.directionals.len(),
            self.capacity.directional_lights,
        ) {
            return Ok(self);
        }
        self.lights.directionals.push(DirectionalLight {
            direction,
            color,
            intensity,
        });
        Ok(self)
    }

    /// Place the single area light. Emission is kept.
    pub fn set_area_light(&mut self, center: impl VecArg, radius: f32, auto: bool) -> SceneResult<&mut Self> {
        let center = vec3_arg("center", center)?;
        let radius = positive("radius", radius)?;
        self.lights.area = AreaLight {
            center,
            radius,
            auto,
            ..self.lights.area
        };
        Ok(self)
    }

    pub fn set_area_light_emission(&mut self, emission: impl VecArg) -> SceneResult<&mut Self> {
        let emission = vec3_arg("emission", emission)?;
        if emission.min_element() < 0.0 {
            return Err(SceneError::InvalidVector {
                field: "emission",
                reason: "radiance must be non-negative".into(),
            });
        }
        self.lights.area.emission = emission;
        Ok(self)
    }

    /// Install the shared texture atlas. A pixel buffer whose length does
    /// not match the dimensions is rejected.
    pub fn set_atlas(&mut self, atlas: Atlas) -> SceneResult<&mut Self> {
        if let Some(bytes) = &atlas.pixels {
            let expected = atlas.width as usize * atlas.height as usize * 4;
            if bytes.len() != expected {
                return Err(SceneError::AtlasSize {
                    width: atlas.width,
                    height: atlas.height,
                    expected,
                    actual: bytes.len(),
                });
            }
        }
        self.atlas = atlas;
        Ok(self)
    }

    /// Snapshot of the unified scene.
    pub fn to_unified(&self) -> Scene {
        Scene {
            version: SCENE_VERSION,
            camera: self.camera,
            materials: self.materials.as_slice().to_vec(),
            geometry: self.geometry.clone(),
            lights: self.lights.clone(),
            atlas: self.atlas.clone(),
        }
    }

    pub fn to_path_tracer(&self) -> PathTracerScene {
        PathTracerScene::from_scene(&self.to_unified())
    }

    pub fn to_raytrace(&self) -> RayTraceScene {
        RayTraceScene::from_scene(&self.to_unified())
    }

    pub fn to_raster(&self) -> RasterScene {
        RasterScene::from_scene(&self.to_unified())
    }

    fn has_room(&mut self, kind: &str, len: usize, cap: usize) -> bool {
        if len < cap {
            return true;
        }
        if self.dropped == 0 {
            log::debug!("{} capacity ({}) reached, further inserts are dropped", kind, cap);
        }
        self.dropped += 1;
        false
    }

    fn truncate_to_capacity(&mut self) {
        let cap = self.capacity;
        let before = self.geometry.spheres.len()
            + self.geometry.triangles.len()
            + self.geometry.quads.len()
            + self.geometry.planes.len()
            + self.lights.points.len()
            + self.lights.directionals.len();
        self.geometry.spheres.truncate(cap.spheres);
        self.geometry.triangles.truncate(cap.triangles);
        self.geometry.quads.truncate(cap.quads);
        self.geometry.planes.truncate(cap.planes);
        self.lights.points.truncate(cap.point_lights);
        self.lights.directionals.truncate(cap.directional_lights);
        let after = self.geometry.spheres.len()
            + self.geometry.triangles.len()
            + self.geometry.quads.len()
            + self.geometry.planes.len()
            + self.lights.points.len()
            + self.lights.directionals.len();
        if after < before {
            log::debug!("dropped {} entries over capacity while loading scene", before - after);
            self.dropped += before - after;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::LegacyMaterial;
    use serde_json::json;

    #[test]
    fn test_vec_arg_forms() {
        assert_eq!(vec3_arg("v", Vec3::X).unwrap(), Vec3::X);
        assert_eq!(vec3_arg("v", [1.0, 2.0, 3.0]).unwrap(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(vec3_arg("v", vec![0.0, 1.0, 0.0]).unwrap(), Vec3::Y);
        let slice: &[f32] = &[0.0, 0.0, 1.0];
        assert_eq!(vec3_arg("v", slice).unwrap(), Vec3::Z);
    }

    #[test]
    fn test_malformed_vectors_are_rejected() {
        let mut builder = SceneBuilder::new();
        let err = builder.add_sphere([0.0, 1.0], 1.0, 1usize).unwrap_err();
        assert!(
            matches!(err, SceneError::InvalidVector { field: "center", .. }),
            "got {err:?}"
        );

        let err = builder
            .add_sphere([0.0, f32::NAN, 0.0], 1.0, 1usize)
            .unwrap_err();
        assert!(err.to_string().contains("not finite"));

        assert!(matches!(
            builder.add_sphere([0.0; 3], f32::INFINITY, 1usize),
            Err(SceneError::NonFinite { field: "radius", .. })
        ));
        assert!(builder.add_plane([0.0; 3], 0.0, 1usize).is_err());
        assert!(builder.add_point_light([0.0; 4], [1.0; 3], 1.0).is_err());
        assert!(builder.set_camera_pose([0.0; 3], 0.0, f32::NAN, 1.0).is_err());
        assert_eq!(builder.geometry().spheres.len(), 0);
    }

    #[test]
    fn test_unknown_material_is_an_error() {
        let mut builder = SceneBuilder::new();
        assert!(matches!(
            builder.add_sphere([0.0; 3], 1.0, "chrome"),
            Err(SceneError::UnknownMaterial(_))
        ));
        assert!(builder.add_sphere([0.0; 3], 1.0, 42usize).is_err());
    }

    #[test]
    fn test_capacity_drops_silently() {
        let mut builder = SceneBuilder::new();
        let cap = builder.capacity();
        for i in 0..=cap.spheres {
            builder.add_sphere([i as f32, 0.0, 0.0], 0.5, 1usize).unwrap();
        }
        for _ in 0..=cap.triangles {
            builder
                .add_triangle([0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], 1usize)
                .unwrap();
        }
        for _ in 0..=cap.quads {
            builder
                .add_quad([0.0; 3], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0], 2usize)
                .unwrap();
        }

        let g = builder.geometry();
        assert_eq!(g.spheres.len(), cap.spheres);
        assert_eq!(g.triangles.len(), cap.triangles);
        assert_eq!(g.quads.len(), cap.quads);
        assert_eq!(builder.dropped_count(), 3);
        // The surviving entries are the first ones added
        assert_eq!(g.spheres.last().unwrap().center.x, (cap.spheres - 1) as f32);
    }

    #[test]
    fn test_material_roundtrip_through_json() {
        let mut builder = SceneBuilder::new();
        let mut brushed = Material::reflective("brushed", Vec3::new(0.31, 0.62, 0.93));
        brushed.roughness = 0.37;
        let lamp = Material::emissive("lamp", Vec3::new(3.5, 2.25, 0.125));
        let paint = Material::diffuse("paint", Vec3::new(0.123456, 0.654321, 0.5));
        for m in [brushed, lamp, paint] {
            let id = builder.add_material(m).unwrap();
            builder.add_sphere([0.0; 3], 1.0, id).unwrap();
        }

        let original = builder.to_unified();
        let text = original.to_json_string().unwrap();
        let restored = SceneBuilder::from_object(&serde_json::from_str(&text).unwrap())
            .unwrap()
            .to_unified();

        assert_eq!(restored.materials.len(), original.materials.len());
        for (a, b) in original.materials.iter().zip(&restored.materials) {
            assert_eq!(a.name, b.name);
            assert!((a.albedo - b.albedo).abs().max_element() <= 1e-6);
            assert!((a.emission - b.emission).abs().max_element() <= 1e-6);
            assert!((a.roughness - b.roughness).abs() <= 1e-6);
            assert_eq!(a.emissive, b.emissive);
            assert_eq!(a.reflective, b.reflective);
        }
        assert_eq!(restored.geometry, original.geometry);
    }

    #[test]
    fn test_from_object_partial_and_truncating() {
        let spheres: Vec<Value> = (0..40)
            .map(|i| json!({ "center": [i as f32, 0.0, 0.0] }))
            .collect();
        let builder = SceneBuilder::from_object(&json!({
            "geometry": { "spheres": spheres },
            "lights": { "area": { "auto": true } }
        }))
        .unwrap();

        assert_eq!(builder.geometry().spheres.len(), 32);
        assert!(builder.lights().area.auto);
        assert_eq!(builder.lights().area.radius, AreaLight::default().radius);
        assert_eq!(builder.materials().len(), 8);
    }

    #[test]
    fn test_add_mesh_respects_capacity() {
        let mut builder = SceneBuilder::with_capacity(Capacity {
            triangles: 10,
            ..Capacity::default()
        });
        let mesh = Mesh::uv_sphere(Vec3::ZERO, 1.0, 4, 6);
        builder.add_mesh(&mesh, LegacyMaterial::Red).unwrap();
        assert_eq!(builder.geometry().triangles.len(), 10);
        assert!(builder.geometry().triangles.iter().all(|t| t.material == 3));
    }

    #[test]
    fn test_lights_and_camera() {
        let mut builder = SceneBuilder::new();
        builder
            .set_camera_pose([0.0, 5.0, 0.0], 0.0, -1.5, 1.0)
            .unwrap()
            .add_directional_light([0.0, 2.0, 0.0], [1.0; 3], 1.0)
            .unwrap()
            .set_area_light([1.0, 2.0, 3.0], 0.25, true)
            .unwrap()
            .set_env_light([0.5; 3], 1.0)
            .unwrap();

        let scene = builder.to_unified();
        assert_eq!(scene.camera.position, Vec3::new(0.0, 5.0, 0.0));
        assert_eq!(scene.lights.directionals[0].direction, Vec3::Y);
        assert_eq!(scene.lights.area.radius, 0.25);
        assert_eq!(scene.lights.area.emission, crate::material::LIGHT_EMISSION);
        assert_eq!(scene.lights.env.ambient(), Vec3::splat(0.5));
        assert!(builder.set_camera_pose([0.0; 3], 0.0, 0.0, 4.0).is_err());
    }

    #[test]
    fn test_set_atlas_checks_size() {
        let mut builder = SceneBuilder::new();
        let bad = Atlas {
            width: 2,
            height: 2,
            pixels: Some(vec![0; 3]),
        };
        assert!(matches!(builder.set_atlas(bad), Err(SceneError::AtlasSize { .. })));
        builder.set_atlas(Atlas::new(2, 2)).unwrap();
        assert!(builder.to_unified().atlas.is_enabled());
    }
}
