//! Per-backend reshaping of the unified scene.
//!
//! All adapters are pure: they read a [`Scene`] and build a new value.
//! Material indices that fall outside the table resolve to a flat gray
//! diffuse material.

use glyph_math::{CameraPose, Vec3};

use crate::atlas::Atlas;
use crate::geometry::{Plane, Quad, Sphere, Triangle};
use crate::light::{AreaLight, DirectionalLight, EnvLight, PointLight};
use crate::material::{LegacyMaterial, Material, MaterialKind};
use crate::mesh::Mesh;
use crate::scene::Scene;

/// Side length of the finite quad that stands in for a plane.
pub const RASTER_PLANE_EXTENT: f32 = 100.0;
/// Latitude bands used when tessellating spheres.
pub const RASTER_SPHERE_STACKS: u32 = 12;
/// Longitude bands used when tessellating spheres.
pub const RASTER_SPHERE_SLICES: u32 = 24;
/// Point lights the rasterizer evaluates per fragment.
pub const MAX_RASTER_POINT_LIGHTS: usize = 4;

fn material_or_gray(scene: &Scene, index: usize) -> Material {
    scene.material(index).cloned().unwrap_or_default()
}

/// Scene shape for the path tracer: one legacy code per primitive.
#[derive(Clone, Debug, PartialEq)]
pub struct PathTracerScene {
    pub camera: CameraPose,
    pub spheres: Vec<Sphere<LegacyMaterial>>,
    pub triangles: Vec<Triangle<LegacyMaterial>>,
    pub quads: Vec<Quad<LegacyMaterial>>,
    pub area_light: AreaLight,
    pub env: EnvLight,
    pub atlas: Atlas,
}

impl PathTracerScene {
    /// Quantize every material to its legacy code. Planes are not traced
    /// by the path tracer and are dropped.
    pub fn from_scene(scene: &Scene) -> Self {
        let code = |index: usize| LegacyMaterial::encode(&material_or_gray(scene, index));
        let g = &scene.geometry;
        if !g.planes.is_empty() {
            log::debug!("path tracer ignores {} planes", g.planes.len());
        }
        Self {
            camera: scene.camera,
            spheres: g.spheres.iter().map(|s| s.with_material(code(s.material))).collect(),
            triangles: g.triangles.iter().map(|t| t.with_material(code(t.material))).collect(),
            quads: g.quads.iter().map(|q| q.with_material(code(q.material))).collect(),
            area_light: scene.lights.area,
            env: scene.lights.env,
            atlas: scene.atlas.clone(),
        }
    }
}

/// Flat shading record resolved from a material.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shade {
    pub kind: MaterialKind,
    pub albedo: Vec3,
    pub emission: Vec3,
}

impl Default for Shade {
    fn default() -> Self {
        Self::from_material(&Material::default())
    }
}

impl Shade {
    pub fn from_material(material: &Material) -> Self {
        Self {
            kind: material.kind(),
            albedo: material.albedo,
            emission: if material.emissive {
                material.emission
            } else {
                Vec3::ZERO
            },
        }
    }
}

/// Scene shape for the deterministic ray tracer. Quads are split into
/// triangles.
#[derive(Clone, Debug, PartialEq)]
pub struct RayTraceScene {
    pub camera: CameraPose,
    pub spheres: Vec<Sphere<Shade>>,
    pub triangles: Vec<Triangle<Shade>>,
    pub planes: Vec<Plane<Shade>>,
    pub points: Vec<PointLight>,
    pub directionals: Vec<DirectionalLight>,
    pub env: EnvLight,
    pub atlas: Atlas,
}

impl RayTraceScene {
    pub fn from_scene(scene: &Scene) -> Self {
        let shade = |index: usize| Shade::from_material(&material_or_gray(scene, index));
        let g = &scene.geometry;

        let mut triangles: Vec<Triangle<Shade>> = g
            .triangles
            .iter()
            .map(|t| t.with_material(shade(t.material)))
            .collect();
        for quad in &g.quads {
            triangles.extend(quad.with_material(shade(quad.material)).triangles());
        }

        Self {
            camera: scene.camera,
            spheres: g.spheres.iter().map(|s| s.with_material(shade(s.material))).collect(),
            triangles,
            planes: g
                .planes
                .iter()
                .map(|p| Plane {
                    normal: p.normal,
                    d: p.d,
                    material: shade(p.material),
                })
                .collect(),
            points: scene.lights.points.clone(),
            directionals: scene.lights.directionals.clone(),
            env: scene.lights.env,
            atlas: scene.atlas.clone(),
        }
    }
}

/// One rasterizer vertex with its flat material color.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RasterVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub color: Vec3,
    /// Emissive surfaces skip lighting
    pub unlit: bool,
}

/// Explicit triangle list for the rasterizer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RasterScene {
    pub camera: CameraPose,
    pub vertices: Vec<RasterVertex>,
    pub indices: Vec<u32>,
    pub directional: Option<DirectionalLight>,
    pub points: Vec<PointLight>,
    pub env: EnvLight,
}

impl RasterScene {
    /// Tessellate spheres and planes, split quads and flatten materials to
    /// vertex colors.
    pub fn from_scene(scene: &Scene) -> Self {
        let mut raster = Self {
            camera: scene.camera,
            directional: scene.lights.directionals.first().copied(),
            points: scene
                .lights
                .points
                .iter()
                .take(MAX_RASTER_POINT_LIGHTS)
                .copied()
                .collect(),
            env: scene.lights.env,
            ..Default::default()
        };

        let g = &scene.geometry;
        for sphere in &g.spheres {
            let mesh = Mesh::uv_sphere(
                sphere.center,
                sphere.radius,
                RASTER_SPHERE_STACKS,
                RASTER_SPHERE_SLICES,
            );
            raster.push_mesh(&mesh, &material_or_gray(scene, sphere.material));
        }
        for tri in &g.triangles {
            raster.push_triangle([tri.a, tri.b, tri.c], &material_or_gray(scene, tri.material));
        }
        for quad in &g.quads {
            let material = material_or_gray(scene, quad.material);
            for tri in quad.triangles() {
                raster.push_triangle([tri.a, tri.b, tri.c], &material);
            }
        }
        for plane in &g.planes {
            let quad = plane_quad(plane, RASTER_PLANE_EXTENT);
            let material = material_or_gray(scene, plane.material);
            for tri in quad.triangles() {
                raster.push_triangle([tri.a, tri.b, tri.c], &material);
            }
        }
        raster
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    fn vertex_color(material: &Material) -> (Vec3, bool) {
        match material.kind() {
            MaterialKind::Emissive => (material.emission, true),
            _ => (material.albedo, false),
        }
    }

    fn push_triangle(&mut self, positions: [Vec3; 3], material: &Material) {
        let normal = (positions[1] - positions[0])
            .cross(positions[2] - positions[0])
            .normalize_or_zero();
        let (color, unlit) = Self::vertex_color(material);
        let base = self.vertices.len() as u32;
        for position in positions {
            self.vertices.push(RasterVertex {
                position,
                normal,
                color,
                unlit,
            });
        }
        self.indices.extend_from_slice(&[base, base + 1, base + 2]);
    }

    fn push_mesh(&mut self, mesh: &Mesh, material: &Material) {
        let (color, unlit) = Self::vertex_color(material);
        for tri in mesh.triangles() {
            let base = self.vertices.len() as u32;
            for (position, normal) in tri.positions.into_iter().zip(tri.normals) {
                self.vertices.push(RasterVertex {
                    position,
                    normal,
                    color,
                    unlit,
                });
            }
            self.indices.extend_from_slice(&[base, base + 1, base + 2]);
        }
    }
}

/// Square of side `extent` centered on the plane's anchor, wound so its
/// front face looks along the plane normal.
pub fn plane_quad<M: Copy>(plane: &Plane<M>, extent: f32) -> Quad<M> {
    let n = plane.normal;
    let helper = if n.y.abs() < 0.999 { Vec3::Y } else { Vec3::X };
    let t = helper.cross(n).normalize_or_zero();
    let b = n.cross(t);
    let h = extent * 0.5;
    let o = plane.anchor();
    Quad::new(
        o + (-t - b) * h,
        o + (t - b) * h,
        o + (t + b) * h,
        o + (-t + b) * h,
        plane.material,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SceneBuilder;

    fn sample_builder() -> SceneBuilder {
        let mut builder = SceneBuilder::new();
        let teal = builder
            .add_material(Material::diffuse("teal", Vec3::new(0.1, 0.5, 0.2)))
            .unwrap();
        let mut rough = Material::reflective("rough", Vec3::new(0.7, 0.1, 0.1));
        rough.roughness = 0.8;
        let rough = builder.add_material(rough).unwrap();
        let lamp = builder
            .add_material(Material::emissive("lamp", Vec3::splat(4.0)))
            .unwrap();
        let chrome = builder
            .add_material(Material::reflective("chrome", Vec3::ONE))
            .unwrap();

        builder
            .add_sphere([0.0, 1.0, 0.0], 1.0, teal)
            .unwrap()
            .add_sphere([2.0, 1.0, 0.0], 0.5, rough)
            .unwrap()
            .add_sphere([0.0, 3.0, 0.0], 0.2, lamp)
            .unwrap()
            .add_quad([0.0; 3], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0], chrome)
            .unwrap()
            .add_plane([0.0, 1.0, 0.0], 0.0, 1usize)
            .unwrap();
        builder
    }

    #[test]
    fn test_path_tracer_quantization() {
        let pt = sample_builder().to_path_tracer();
        let codes: Vec<_> = pt.spheres.iter().map(|s| s.material).collect();
        assert_eq!(
            codes,
            vec![LegacyMaterial::Green, LegacyMaterial::Red, LegacyMaterial::Light]
        );
        assert_eq!(pt.quads[0].material, LegacyMaterial::Glass);
        assert!(pt.triangles.is_empty());
    }

    #[test]
    fn test_out_of_range_material_is_gray() {
        let mut scene = Scene::default();
        scene.geometry.spheres.push(Sphere::new(Vec3::ZERO, 1.0, 99));
        let rt = RayTraceScene::from_scene(&scene);
        assert_eq!(rt.spheres[0].material, Shade::default());
        assert_eq!(rt.spheres[0].material.albedo, Vec3::splat(0.5));
        let pt = PathTracerScene::from_scene(&scene);
        assert_eq!(pt.spheres[0].material, LegacyMaterial::White);
    }

    #[test]
    fn test_raytrace_splits_quads() {
        let rt = sample_builder().to_raytrace();
        assert_eq!(rt.triangles.len(), 2);
        assert_eq!(rt.planes.len(), 1);
        assert_eq!(rt.triangles[0].material.kind, MaterialKind::Reflective);
        assert_eq!(rt.spheres[2].material.emission, Vec3::splat(4.0));
    }

    #[test]
    fn test_raster_tessellation() {
        let raster = sample_builder().to_raster();
        let per_sphere = (RASTER_SLICES_TRIS) as usize;
        // 3 spheres + 2 quad triangles + 2 plane triangles
        assert_eq!(raster.triangle_count(), 3 * per_sphere + 2 + 2);
        assert_eq!(raster.vertices.len(), raster.indices.len());

        let lamp_vertex = raster.vertices[2 * per_sphere * 3];
        assert!(lamp_vertex.unlit);
        assert_eq!(lamp_vertex.color, Vec3::splat(4.0));
    }

    const RASTER_SLICES_TRIS: u32 = RASTER_SPHERE_SLICES * (2 * RASTER_SPHERE_STACKS - 2);

    #[test]
    fn test_plane_quad_faces_normal() {
        for normal in [Vec3::Y, Vec3::NEG_Y, Vec3::X, Vec3::new(1.0, 1.0, 0.0).normalize()] {
            let plane = Plane::new(normal, 2.0, 0usize);
            let quad = plane_quad(&plane, 10.0);
            for tri in quad.triangles() {
                assert!((tri.normal() - normal).length() < 1e-5, "normal {normal:?}");
                assert!((normal.dot(tri.a) - 2.0).abs() < 1e-4);
            }
            assert!((quad.a - quad.c).length() > 14.0);
        }
    }

    #[test]
    fn test_raster_caps_point_lights() {
        let mut builder = SceneBuilder::new();
        for i in 0..6 {
            builder
                .add_point_light([i as f32, 3.0, 0.0], [1.0; 3], 1.0)
                .unwrap();
        }
        let raster = builder.to_raster();
        assert_eq!(raster.points.len(), MAX_RASTER_POINT_LIGHTS);
        assert!(raster.directional.is_none());
    }
}
