//! Deterministic Whitted-style ray tracer.
//!
//! One center ray per cell, hard shadows and a single mirror bounce. No
//! randomness, so every frame of a static scene is identical.

use glyph_core::{MaterialKind, RayTraceScene, Scene, Shade, TexelKind};
use glyph_math::{Interval, Ray, Vec3, RAY_EPSILON};

use crate::backend::{Backend, FrameContext, FrameStatus};
use crate::bucket::render_tiles;
use crate::camera::Camera;
use crate::config::RayTracerConfig;
use crate::error::{check_buffer, RenderResult};
use crate::hittable::{any_hit, closest_hit, HitRecord};
use crate::material::{reflect, Color};
use crate::pixel::{FrameBuffer, Pixel};

fn nearest(scene: &RayTraceScene, ray: &Ray) -> Option<HitRecord<Shade>> {
    let ray_t = Interval::forward();
    let best = closest_hit(&scene.spheres, ray, ray_t, None);
    let best = closest_hit(&scene.triangles, ray, ray_t, best);
    closest_hit(&scene.planes, ray, ray_t, best)
}

fn blocked(scene: &RayTraceScene, ray: &Ray, ray_t: Interval) -> bool {
    any_hit(&scene.spheres, ray, ray_t) || any_hit(&scene.triangles, ray, ray_t) || any_hit(&scene.planes, ray, ray_t)
}

/// Material albedo, replaced by the atlas texel when one is mapped.
fn surface_albedo(scene: &RayTraceScene, rec: &HitRecord<Shade>) -> Color {
    rec.texel
        .and_then(|[u, v]| scene.atlas.texel(u, v))
        .filter(|texel| texel.kind() != TexelKind::Empty)
        .map_or(rec.material.albedo, |texel| texel.rgb())
}

/// Lambert shading from the environment ambient plus every directional
/// and point light that is not shadowed.
pub fn direct_lighting(scene: &RayTraceScene, point: Vec3, normal: Vec3, albedo: Color) -> Color {
    let mut light = scene.env.ambient();

    for directional in &scene.directionals {
        let n_dot_l = normal.dot(directional.direction);
        if n_dot_l <= 0.0 {
            continue;
        }
        let shadow = Ray::offset(point, normal, directional.direction);
        if !blocked(scene, &shadow, Interval::forward()) {
            light += directional.radiance() * n_dot_l;
        }
    }

    for point_light in &scene.points {
        let to_light = point_light.position - point;
        let distance = to_light.length();
        if distance <= RAY_EPSILON {
            continue;
        }
        let dir = to_light / distance;
        let n_dot_l = normal.dot(dir);
        if n_dot_l <= 0.0 {
            continue;
        }
        let shadow = Ray::offset(point, normal, dir);
        if !blocked(scene, &shadow, Interval::segment(distance)) {
            light += point_light.radiance_at(distance) * n_dot_l;
        }
    }

    albedo * light
}

/// Color seen along `ray`. Reflective surfaces bounce once at depth 0 and
/// shade like diffuse ones after that.
pub fn shade_ray(scene: &RayTraceScene, ray: &Ray, depth: u32) -> Color {
    let Some(rec) = nearest(scene, ray) else {
        return scene.env.ambient();
    };
    let albedo = surface_albedo(scene, &rec);
    match rec.material.kind {
        MaterialKind::Emissive => rec.material.emission,
        MaterialKind::Reflective if depth == 0 => {
            let mirrored = Ray::offset(rec.p, rec.normal, reflect(ray.direction(), rec.normal));
            albedo * shade_ray(scene, &mirrored, depth + 1)
        }
        _ => direct_lighting(scene, rec.p, rec.normal, albedo),
    }
}

/// Ray tracing backend.
pub struct RayTracer {
    config: RayTracerConfig,
    scene: Option<RayTraceScene>,
    frame: FrameBuffer,
}

impl RayTracer {
    pub const NAME: &'static str = "raytrace";

    pub fn new(config: RayTracerConfig) -> RenderResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            scene: None,
            frame: FrameBuffer::default(),
        })
    }
}

impl Backend for RayTracer {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn set_scene(&mut self, scene: &Scene) {
        let shaped = RayTraceScene::from_scene(scene);
        log::debug!(
            "Ray tracer scene: {} spheres, {} triangles, {} planes, {} lights",
            shaped.spheres.len(),
            shaped.triangles.len(),
            shaped.planes.len(),
            shaped.points.len() + shaped.directionals.len()
        );
        self.scene = Some(shaped);
    }

    fn render(&mut self, _time: f32, buffer: &mut [u8], context: &FrameContext) -> RenderResult<FrameStatus> {
        let (width, height) = (context.cols, context.rows);
        check_buffer(buffer, width, height)?;
        let Some(scene) = &self.scene else {
            return Ok(FrameStatus::NoScene);
        };

        let camera = Camera::new(&context.camera_or(&scene.camera), width, height, self.config.pixel_aspect);
        let pixels = render_tiles(width, height, self.config.bucket_size, |x, y| {
            let color = shade_ray(scene, &camera.center_ray(x, y), 0);
            Pixel::opaque(color.clamp(Color::ZERO, Color::ONE))
        });
        self.frame = FrameBuffer::from_pixels(width, height, pixels);
        self.frame.write_rgba(buffer);
        Ok(FrameStatus::Rendered {
            traced: context.pixel_count(),
        })
    }

    fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    fn dispose(&mut self) {
        self.scene = None;
        self.frame = FrameBuffer::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glyph_core::{LegacyMaterial, Material, SceneBuilder};
    use glyph_math::luminance;
    use std::f32::consts::FRAC_PI_2;

    fn lum_at(buffer: &[u8], cols: u32, x: u32, y: u32) -> f32 {
        let i = ((y * cols + x) * 4) as usize;
        luminance(Vec3::new(buffer[i] as f32, buffer[i + 1] as f32, buffer[i + 2] as f32) / 255.0)
    }

    #[test]
    fn test_top_of_lit_sphere_is_brightest() {
        let mut builder = SceneBuilder::new();
        builder
            .set_camera_pose([0.0, 5.0, 0.0], 0.0, -FRAC_PI_2, 60f32.to_radians())
            .unwrap()
            .set_env_light([0.0, 0.0, 0.0], 0.0)
            .unwrap()
            .add_point_light([0.0, 3.0, 0.0], [1.0, 1.0, 1.0], 8.0)
            .unwrap()
            .add_sphere([0.0, 0.0, 0.0], 1.0, LegacyMaterial::White)
            .unwrap();
        let (cols, rows) = (16, 8);
        let mut tracer = RayTracer::new(RayTracerConfig::default()).unwrap();
        tracer.set_scene(&builder.to_unified());
        let mut buffer = vec![0u8; (cols * rows * 4) as usize];
        tracer.render(0.0, &mut buffer, &FrameContext::new(cols, rows)).unwrap();

        let center = lum_at(&buffer, cols, cols / 2, rows / 2);
        let edge = lum_at(&buffer, cols, 0, rows / 2);
        assert!(center > edge, "center {center} vs edge {edge}");
        assert!(buffer.chunks_exact(4).all(|px| px[3] == 255));
    }

    #[test]
    fn test_hard_shadow_leaves_ambient() {
        let mut builder = SceneBuilder::new();
        builder
            .set_env_light([0.1, 0.1, 0.1], 1.0)
            .unwrap()
            .add_point_light([0.0, 4.0, 0.0], [1.0, 1.0, 1.0], 10.0)
            .unwrap()
            .add_sphere([0.0, 2.0, 0.0], 0.5, LegacyMaterial::White)
            .unwrap()
            .add_plane([0.0, 1.0, 0.0], 0.0, LegacyMaterial::White)
            .unwrap();
        let scene = builder.to_raytrace();
        let albedo = LegacyMaterial::White.albedo();

        let shadowed = direct_lighting(&scene, Vec3::ZERO, Vec3::Y, albedo);
        assert!((shadowed - albedo * 0.1).length() < 1e-6);

        let lit = direct_lighting(&scene, Vec3::new(3.0, 0.0, 0.0), Vec3::Y, albedo);
        assert!(lit.x > shadowed.x);
    }

    #[test]
    fn test_mirror_shows_emitter() {
        let mut builder = SceneBuilder::new();
        builder
            .set_env_light([0.0, 0.0, 0.0], 0.0)
            .unwrap()
            .add_plane([0.0, 1.0, 0.0], 0.0, Material::reflective("mirror", Vec3::splat(0.8)))
            .unwrap()
            .add_sphere([0.0, 5.0, 0.0], 1.0, Material::emissive("lamp", Vec3::ONE))
            .unwrap();
        let scene = builder.to_raytrace();
        let down = Ray::new(Vec3::new(0.0, 2.0, 0.0), Vec3::NEG_Y);
        let color = shade_ray(&scene, &down, 0);
        assert!((color - Vec3::splat(0.8)).length() < 1e-5, "{color:?}");
    }

    #[test]
    fn test_miss_returns_env() {
        let mut builder = SceneBuilder::new();
        builder.set_env_light([0.5, 0.5, 0.5], 1.0).unwrap();
        let mut tracer = RayTracer::new(RayTracerConfig::default()).unwrap();
        tracer.set_scene(&builder.to_unified());
        let mut buffer = vec![0u8; 6 * 3 * 4];
        tracer.render(0.0, &mut buffer, &FrameContext::new(6, 3)).unwrap();
        assert!(buffer.chunks_exact(4).all(|px| px == [128, 128, 128, 255]));
    }

    #[test]
    fn test_repeated_frames_match() {
        let scene = glyph_core::presets::showcase().unwrap();
        let mut tracer = RayTracer::new(RayTracerConfig::default()).unwrap();
        tracer.set_scene(&scene);
        let ctx = FrameContext::new(20, 10);
        let mut a = vec![0u8; 800];
        let mut b = vec![0u8; 800];
        tracer.render(0.0, &mut a, &ctx).unwrap();
        tracer.render(3.0, &mut b, &ctx).unwrap();
        assert_eq!(a, b);
    }
}
