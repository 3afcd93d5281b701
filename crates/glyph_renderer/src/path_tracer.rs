//! Progressive path tracer.
//!
//! Iterative Monte Carlo paths with next-event estimation toward the
//! spherical area light, Fresnel glass, optional Russian roulette and
//! atlas glyph overrides on primary hits. Frames feed an adaptive
//! controller and a temporal accumulator so a static view keeps
//! refining while converged pixels are skipped.

use glyph_core::{PathTracerScene, Scene, Texel, TexelKind};
use glyph_core::material::{LegacyMaterial, LIGHT_EMISSION};
use glyph_math::intersect::hit_sphere;
use glyph_math::{CameraPose, Interval, Ray, Vec3};
use rand::Rng;

use crate::adaptive::{AdaptiveController, TemporalAccumulator};
use crate::backend::{Backend, FrameContext, FrameStatus};
use crate::bucket::render_tiles;
use crate::camera::Camera;
use crate::config::PathTracerConfig;
use crate::error::{check_buffer, RenderResult};
use crate::hittable::{any_hit, closest_hit, HitRecord};
use crate::material::{cosine_hemisphere, sample_cone, specular_bounce, Color};
use crate::pixel::{FrameBuffer, Pixel};
use crate::rng::SineHashRng;

/// Bounce index from which Russian roulette may end a path.
pub const RR_START_BOUNCE: u32 = 2;
const RR_MIN_SURVIVAL: f32 = 0.05;
const RR_MAX_SURVIVAL: f32 = 0.95;

/// Result of one camera path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSample {
    Radiance(Color),
    /// The primary hit landed on a glyph texel
    Glyph(Texel),
}

enum SurfaceHit {
    AreaLight,
    Surface(HitRecord<LegacyMaterial>),
}

fn closest_surface(scene: &PathTracerScene, ray: &Ray, ray_t: Interval) -> Option<HitRecord<LegacyMaterial>> {
    let best = closest_hit(&scene.spheres, ray, ray_t, None);
    let best = closest_hit(&scene.triangles, ray, ray_t, best);
    closest_hit(&scene.quads, ray, ray_t, best)
}

/// Nearest thing along `ray`. The area light is tested last and only wins
/// when strictly closer than all geometry.
fn scene_hit(scene: &PathTracerScene, ray: &Ray, light_center: Vec3) -> Option<SurfaceHit> {
    let ray_t = Interval::forward();
    let surface = closest_surface(scene, ray, ray_t);
    let max_t = surface.map_or(ray_t.max, |rec| rec.t);
    let light = &scene.area_light;
    if light.radius > 0.0 && hit_sphere(ray, light_center, light.radius, ray_t.with_max(max_t)).is_some() {
        return Some(SurfaceHit::AreaLight);
    }
    surface.map(SurfaceHit::Surface)
}

fn occluded(scene: &PathTracerScene, ray: &Ray, ray_t: Interval) -> bool {
    any_hit(&scene.spheres, ray, ray_t) || any_hit(&scene.triangles, ray, ray_t) || any_hit(&scene.quads, ray, ray_t)
}

/// One next-event estimate of the area light at a diffuse point.
///
/// Samples a direction uniformly inside the cone the light subtends and
/// returns `Le · 2(1 - cos θmax) · cos θ`, the cosine-weighted solid angle
/// estimate with the Lambertian `1/π` folded in. The caller multiplies by
/// the path throughput (albedo included). Zero when the light is behind
/// the surface, when the point is inside the light or when anything
/// blocks the shadow ray.
pub fn sample_area_light<R: Rng + ?Sized>(
    scene: &PathTracerScene,
    point: Vec3,
    normal: Vec3,
    light_center: Vec3,
    rng: &mut R,
) -> Color {
    let light = &scene.area_light;
    if light.radius <= 0.0 {
        return Color::ZERO;
    }
    let to_light = light_center - point;
    let dist2 = to_light.length_squared();
    let r2 = light.radius * light.radius;
    if dist2 <= r2 {
        return Color::ZERO;
    }

    let cos_max = (1.0 - r2 / dist2).max(0.0).sqrt();
    let dir = sample_cone(to_light, cos_max, rng);
    let cos_surface = dir.dot(normal);
    if cos_surface <= 0.0 {
        return Color::ZERO;
    }

    let shadow = Ray::offset(point, normal, dir);
    let Some(t_light) = hit_sphere(&shadow, light_center, light.radius, Interval::forward()) else {
        return Color::ZERO;
    };
    if occluded(scene, &shadow, Interval::segment(t_light)) {
        return Color::ZERO;
    }
    light.emission * (2.0 * (1.0 - cos_max)) * cos_surface
}

/// Trace one path.
///
/// With `allow_glyph`, a glyph texel on the primary hit ends the path as
/// [`PathSample::Glyph`]; otherwise glyph texels act as albedo like opaque
/// ones.
pub fn trace_path<R: Rng + ?Sized>(
    scene: &PathTracerScene,
    ray: Ray,
    light_center: Vec3,
    config: &PathTracerConfig,
    allow_glyph: bool,
    rng: &mut R,
) -> PathSample {
    let mut radiance = Color::ZERO;
    let mut throughput = Color::ONE;
    let mut ray = ray;
    // The camera ray sees emitters directly
    let mut specular = true;

    for bounce in 0..config.bounces {
        let rec = match scene_hit(scene, &ray, light_center) {
            None => {
                radiance += throughput * scene.env.radiance(ray.direction());
                break;
            }
            Some(SurfaceHit::AreaLight) => {
                // After a diffuse bounce the light was already sampled directly
                if specular {
                    radiance += throughput * scene.area_light.emission;
                }
                break;
            }
            Some(SurfaceHit::Surface(rec)) => rec,
        };

        if rec.material == LegacyMaterial::Light {
            if specular {
                radiance += throughput * LIGHT_EMISSION;
            }
            break;
        }

        let mut albedo = rec.material.albedo();
        if let Some(texel) = rec.texel.and_then(|[u, v]| scene.atlas.texel(u, v)) {
            match texel.kind() {
                TexelKind::Empty => {}
                TexelKind::Glyph(_) if allow_glyph && bounce == 0 => return PathSample::Glyph(texel),
                _ => albedo = texel.rgb(),
            }
        }

        if rec.material.is_specular() {
            let bounce_dir = specular_bounce(ray.direction(), rec.normal, rec.front_face, rng);
            if bounce_dir.refracted {
                throughput *= albedo;
            }
            ray = Ray::offset(rec.p, rec.normal, bounce_dir.direction);
            specular = true;
        } else {
            throughput *= albedo;
            if bounce + 1 < config.bounces {
                radiance += throughput * sample_area_light(scene, rec.p, rec.normal, light_center, rng);
            }
            ray = Ray::offset(rec.p, rec.normal, cosine_hemisphere(rec.normal, rng));
            specular = false;
        }

        if config.russian_roulette && bounce >= RR_START_BOUNCE {
            let survival = throughput.max_element().clamp(RR_MIN_SURVIVAL, RR_MAX_SURVIVAL);
            if rng.gen::<f32>() > survival {
                break;
            }
            throughput /= survival;
        }
    }

    PathSample::Radiance(radiance)
}

/// Per-frame inputs shared by every pixel.
struct FrameTracer<'a> {
    scene: &'a PathTracerScene,
    camera: Camera,
    light_center: Vec3,
    config: &'a PathTracerConfig,
    stream: u32,
    dither: f32,
}

impl FrameTracer<'_> {
    fn trace(&self, x: u32, y: u32) -> Pixel {
        let mut rng = SineHashRng::with_offset(x, y, self.stream, self.dither);
        let mut sum = Color::ZERO;
        for s in 0..self.config.samples {
            let ray = self.camera.get_ray(x, y, &mut rng);
            match trace_path(self.scene, ray, self.light_center, self.config, s == 0, &mut rng) {
                PathSample::Radiance(radiance) => sum += radiance,
                PathSample::Glyph(texel) => {
                    // Lock the cell to whatever glyph sits under its center
                    let center = self.camera.center_ray(x, y);
                    let locked = match trace_path(self.scene, center, self.light_center, self.config, true, &mut rng) {
                        PathSample::Glyph(center_texel) => center_texel,
                        PathSample::Radiance(_) => texel,
                    };
                    return Pixel::glyph(locked);
                }
            }
        }
        let mean = sum / self.config.samples as f32;
        Pixel::shaded(mean.clamp(Color::ZERO, Color::ONE))
    }
}

/// Path tracing backend.
pub struct PathTracer {
    config: PathTracerConfig,
    scene: Option<PathTracerScene>,
    frame: FrameBuffer,
    adaptive: AdaptiveController,
    temporal: TemporalAccumulator,
    last_camera: Option<CameraPose>,
    last_light: Option<Vec3>,
    frame_index: u32,
}

impl PathTracer {
    pub const NAME: &'static str = "pathtrace";

    pub fn new(config: PathTracerConfig) -> RenderResult<Self> {
        config.validate()?;
        Ok(Self {
            adaptive: AdaptiveController::new(config.adaptive.clone(), config.temporal.camera_epsilon),
            temporal: TemporalAccumulator::new(config.temporal.clone()),
            config,
            scene: None,
            frame: FrameBuffer::default(),
            last_camera: None,
            last_light: None,
            frame_index: 0,
        })
    }

    pub fn config(&self) -> &PathTracerConfig {
        &self.config
    }

    /// Swap settings. Accumulated state is dropped when they differ.
    pub fn set_config(&mut self, config: PathTracerConfig) -> RenderResult<()> {
        config.validate()?;
        if config != self.config {
            self.adaptive.set_config(config.adaptive.clone());
            self.temporal.set_config(config.temporal.clone());
            self.config = config;
            self.reset_accumulation();
        }
        Ok(())
    }

    /// Per-pixel convergence mask of the last frame (255 = still tracing).
    pub fn adaptive_mask(&self) -> Vec<u8> {
        self.adaptive.active_mask()
    }

    /// Batches rendered since the last reset.
    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }

    fn reset_accumulation(&mut self) {
        self.adaptive.reset();
        self.temporal.reset();
        self.last_camera = None;
        self.last_light = None;
        self.frame_index = 0;
    }
}

impl Backend for PathTracer {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn set_scene(&mut self, scene: &Scene) {
        let shaped = PathTracerScene::from_scene(scene);
        log::debug!(
            "Path tracer scene: {} spheres, {} triangles, {} quads",
            shaped.spheres.len(),
            shaped.triangles.len(),
            shaped.quads.len()
        );
        self.scene = Some(shaped);
        self.reset_accumulation();
    }

    fn render(&mut self, time: f32, buffer: &mut [u8], context: &FrameContext) -> RenderResult<FrameStatus> {
        let (width, height) = (context.cols, context.rows);
        check_buffer(buffer, width, height)?;
        let Some(scene) = &self.scene else {
            return Ok(FrameStatus::NoScene);
        };

        let pose = context.camera_or(&scene.camera);
        let epsilon = self.config.temporal.camera_epsilon;
        let light_center = scene.area_light.center_at(time);
        // An orbiting light invalidates both the statistics and the history
        let light_moved = self
            .last_light
            .is_some_and(|last| last.distance(light_center) > epsilon);
        if light_moved {
            log::debug!("Area light moved to {light_center}, restarting accumulation");
            self.adaptive.reset();
        }
        let restart = light_moved
            || self.last_camera.map_or(true, |last| last.moved_from(&pose, epsilon))
            || self.frame.width != width
            || self.frame.height != height;
        if restart {
            self.frame_index = 0;
        }

        let pixel_count = width as usize * height as usize;
        let active: Vec<bool> = if self.config.adaptive.enabled {
            self.adaptive.prepare(width, height, &pose);
            (0..pixel_count).map(|i| self.adaptive.is_active(i)).collect()
        } else {
            vec![true; pixel_count]
        };

        let tracer = FrameTracer {
            scene,
            camera: Camera::new(&pose, width, height, self.config.pixel_aspect),
            light_center,
            config: &self.config,
            stream: self.frame_index,
            dither: if self.config.time_dither { time } else { 0.0 },
        };
        let traced: Vec<Option<Pixel>> = render_tiles(width, height, self.config.bucket_size, |x, y| {
            let i = y as usize * width as usize + x as usize;
            active[i].then(|| tracer.trace(x, y))
        });

        let traced_mask: Vec<bool> = traced.iter().map(Option::is_some).collect();
        let traced_count = traced_mask.iter().filter(|&&t| t).count();
        let previous = if restart { None } else { Some(&self.frame.pixels) };
        let pixels = traced
            .into_iter()
            .enumerate()
            .map(|(i, p)| p.unwrap_or_else(|| previous.and_then(|prev| prev.get(i).copied()).unwrap_or_default()))
            .collect();
        let current = FrameBuffer::from_pixels(width, height, pixels);

        if self.config.adaptive.enabled {
            self.adaptive.record_frame(&current, &traced_mask);
        }
        self.frame = if self.config.temporal.enabled {
            self.temporal.resolve(&current, &traced_mask, restart)
        } else {
            current
        };
        self.frame.write_rgba(buffer);
        self.last_camera = Some(pose);
        self.last_light = Some(light_center);
        self.frame_index = self.frame_index.wrapping_add(1);

        log::trace!(
            "Path traced frame {} at {}x{}: {} of {} pixels",
            self.frame_index,
            width,
            height,
            traced_count,
            pixel_count
        );
        Ok(FrameStatus::Rendered { traced: traced_count })
    }

    fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    fn dispose(&mut self) {
        self.scene = None;
        self.frame = FrameBuffer::default();
        self.reset_accumulation();
    }
}
