//! Glyph Renderer - CPU backends that draw scenes into character-cell frames.
//!
//! Three backends share one camera mapping and one output contract:
//!
//! - **pathtrace**: progressive Monte Carlo path tracer with next-event
//!   estimation, adaptive sampling and temporal accumulation
//! - **raytrace**: deterministic center-ray tracer with hard shadows
//! - **raster**: forward rasterizer with near clipping and a depth buffer
//!
//! A [`Router`] keeps one of them live and swaps them at runtime. Frames
//! come out as RGBA8 whose alpha byte tags each cell (see [`PixelKind`]),
//! and [`GlyphGrid`] turns that into text.

mod adaptive;
mod backend;
mod bucket;
mod camera;
mod config;
mod error;
mod glyph;
mod hittable;
mod material;
mod path_tracer;
mod pixel;
mod rasterizer;
mod raytracer;
mod rng;
mod router;

pub use adaptive::{AdaptiveController, AdaptiveState, TemporalAccumulator};
pub use backend::{Backend, FrameContext, FrameStatus, RenderArgs};
pub use bucket::{generate_buckets, render_bucket, render_tiles, Bucket, DEFAULT_BUCKET_SIZE};
pub use camera::Camera;
pub use config::{
    AdaptiveConfig, GlyphConfig, PathTracerConfig, RasterConfig, RayTracerConfig, RenderSettings, TemporalConfig,
    DEFAULT_PIXEL_ASPECT,
};
pub use error::{check_buffer, RenderError, RenderResult};
pub use glyph::{AsciiRamp, GlyphCell, GlyphGrid, DEFAULT_RAMP};
pub use hittable::{any_hit, closest_hit, HitRecord, Hittable};
pub use material::{cosine_hemisphere, reflect, reflectance, refract, sample_cone, Color, GLASS_IOR};
pub use path_tracer::{sample_area_light, trace_path, PathSample, PathTracer};
pub use pixel::{quantize, FrameBuffer, Pixel, PixelKind, PixelRequest};
pub use rasterizer::{rasterize, shade_fragment, Rasterizer};
pub use raytracer::{direct_lighting, shade_ray, RayTracer};
pub use rng::{sine_hash, SineHashRng};
pub use router::{canonical_name, BackendFactory, Router};
