//! Software forward rasterizer.
//!
//! Triangles go through the shared [`ViewFrame`] so the rasterizer and the
//! tracers agree on where every point lands. Each triangle is clipped
//! against the near plane, fan-triangulated and filled at pixel centers
//! with perspective-correct attributes and a depth buffer.

use glyph_core::{RasterScene, RasterVertex, Scene};
use glyph_math::{Vec2, Vec3, ViewFrame};

use crate::backend::{Backend, FrameContext, FrameStatus};
use crate::config::RasterConfig;
use crate::error::{check_buffer, RenderResult};
use crate::material::Color;
use crate::pixel::{FrameBuffer, Pixel};

/// Vertex in camera space with its interpolated attributes.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ClipVertex {
    view: Vec3,
    world: Vec3,
    normal: Vec3,
    color: Vec3,
}

impl ClipVertex {
    fn lerp(&self, other: &ClipVertex, t: f32) -> ClipVertex {
        ClipVertex {
            view: self.view.lerp(other.view, t),
            world: self.world.lerp(other.world, t),
            normal: self.normal.lerp(other.normal, t),
            color: self.color.lerp(other.color, t),
        }
    }
}

/// Sutherland-Hodgman against `z >= near`.
fn clip_near(polygon: &[ClipVertex], near: f32) -> Vec<ClipVertex> {
    let mut out = Vec::with_capacity(polygon.len() + 2);
    for (i, current) in polygon.iter().enumerate() {
        let next = &polygon[(i + 1) % polygon.len()];
        let current_in = current.view.z >= near;
        let next_in = next.view.z >= near;
        if current_in {
            out.push(*current);
        }
        if current_in != next_in {
            let t = (near - current.view.z) / (next.view.z - current.view.z);
            out.push(current.lerp(next, t));
        }
    }
    out
}

#[inline]
fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Lambert shading of one fragment. `normal` faces the viewer.
pub fn shade_fragment(scene: &RasterScene, world: Vec3, normal: Vec3, albedo: Color) -> Color {
    let mut light = scene.env.ambient();
    if let Some(directional) = &scene.directional {
        light += directional.radiance() * normal.dot(directional.direction).max(0.0);
    }
    for point in &scene.points {
        let to_light = point.position - world;
        let distance = to_light.length();
        if distance > 0.0 {
            light += point.radiance_at(distance) * normal.dot(to_light / distance).max(0.0);
        }
    }
    albedo * light
}

struct Target<'a> {
    frame: &'a ViewFrame,
    pixels: &'a mut [Pixel],
    depth: &'a mut [f32],
}

impl Target<'_> {
    fn fill(&mut self, scene: &RasterScene, tri: [&ClipVertex; 3], unlit: bool) {
        let (w, h) = (self.frame.width, self.frame.height);
        let mut screen = [Vec2::ZERO; 3];
        for (s, v) in screen.iter_mut().zip(tri) {
            match self.frame.view_to_pixel(v.view) {
                Some(p) => *s = p,
                None => return,
            }
        }
        let area = edge(screen[0], screen[1], screen[2]);
        if area.abs() < 1e-12 {
            return;
        }

        let min = screen[0].min(screen[1]).min(screen[2]);
        let max = screen[0].max(screen[1]).max(screen[2]);
        let x0 = min.x.floor().max(0.0) as u32;
        let y0 = min.y.floor().max(0.0) as u32;
        let x1 = (max.x.ceil().max(0.0) as u32).min(w);
        let y1 = (max.y.ceil().max(0.0) as u32).min(h);
        let inv_z = [1.0 / tri[0].view.z, 1.0 / tri[1].view.z, 1.0 / tri[2].view.z];

        for y in y0..y1 {
            for x in x0..x1 {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let b = [
                    edge(screen[1], screen[2], p) / area,
                    edge(screen[2], screen[0], p) / area,
                    edge(screen[0], screen[1], p) / area,
                ];
                if b.iter().any(|&wgt| wgt < 0.0) {
                    continue;
                }

                let iz = b[0] * inv_z[0] + b[1] * inv_z[1] + b[2] * inv_z[2];
                let z = 1.0 / iz;
                let i = (y * w + x) as usize;
                if z >= self.depth[i] {
                    continue;
                }
                self.depth[i] = z;

                let pc = [b[0] * inv_z[0] * z, b[1] * inv_z[1] * z, b[2] * inv_z[2] * z];
                let mix = |f: fn(&ClipVertex) -> Vec3| f(tri[0]) * pc[0] + f(tri[1]) * pc[1] + f(tri[2]) * pc[2];
                let color = mix(|v| v.color);
                let shaded = if unlit {
                    color
                } else {
                    let world = mix(|v| v.world);
                    let mut normal = mix(|v| v.normal).normalize_or_zero();
                    if normal.dot(self.frame.origin - world) < 0.0 {
                        normal = -normal;
                    }
                    shade_fragment(scene, world, normal, color)
                };
                self.pixels[i] = Pixel::opaque(shaded.clamp(Color::ZERO, Color::ONE));
            }
        }
    }
}

/// Rasterize a whole scene into a new frame.
pub fn rasterize(scene: &RasterScene, frame: &ViewFrame, near: f32) -> FrameBuffer {
    let (w, h) = (frame.width, frame.height);
    let background = Pixel::opaque(scene.env.ambient().clamp(Color::ZERO, Color::ONE));
    let mut pixels = vec![background; w as usize * h as usize];
    let mut depth = vec![f32::INFINITY; pixels.len()];
    let mut target = Target {
        frame,
        pixels: &mut pixels,
        depth: &mut depth,
    };

    let to_clip = |v: &RasterVertex| ClipVertex {
        view: frame.to_view(v.position),
        world: v.position,
        normal: v.normal,
        color: v.color,
    };

    for indices in scene.indices.chunks_exact(3) {
        let Some(corners) = indices
            .iter()
            .map(|&i| scene.vertices.get(i as usize))
            .collect::<Option<Vec<_>>>()
        else {
            continue;
        };
        let unlit = corners[0].unlit;
        let polygon: Vec<ClipVertex> = corners.iter().map(|&v| to_clip(v)).collect();
        let clipped = clip_near(&polygon, near);
        for k in 1..clipped.len().saturating_sub(1) {
            target.fill(scene, [&clipped[0], &clipped[k], &clipped[k + 1]], unlit);
        }
    }

    FrameBuffer::from_pixels(w, h, pixels)
}

/// Rasterizer backend.
pub struct Rasterizer {
    config: RasterConfig,
    scene: Option<RasterScene>,
    frame: FrameBuffer,
}

impl Rasterizer {
    pub const NAME: &'static str = "raster";

    pub fn new(config: RasterConfig) -> RenderResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            scene: None,
            frame: FrameBuffer::default(),
        })
    }
}

impl Backend for Rasterizer {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn set_scene(&mut self, scene: &Scene) {
        let shaped = RasterScene::from_scene(scene);
        log::debug!(
            "Raster scene: {} vertices, {} triangles",
            shaped.vertices.len(),
            shaped.triangle_count()
        );
        self.scene = Some(shaped);
    }

    fn render(&mut self, _time: f32, buffer: &mut [u8], context: &FrameContext) -> RenderResult<FrameStatus> {
        let (width, height) = (context.cols, context.rows);
        check_buffer(buffer, width, height)?;
        let Some(scene) = &self.scene else {
            return Ok(FrameStatus::NoScene);
        };
        let frame = ViewFrame::new(&context.camera_or(&scene.camera), width, height, self.config.pixel_aspect);
        self.frame = rasterize(scene, &frame, self.config.near);
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
