//! Render settings.
//!
//! Everything is serde with field-by-field defaults, so a settings file
//! only needs the values it changes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult};

/// Width/height of one character cell relative to a square pixel.
pub const DEFAULT_PIXEL_ASPECT: f32 = 0.5;

fn invalid(section: &'static str, reason: impl Into<String>) -> RenderError {
    RenderError::InvalidConfig {
        section,
        reason: reason.into(),
    }
}

fn check_pixel_aspect(section: &'static str, pixel_aspect: f32) -> RenderResult<()> {
    if !(pixel_aspect.is_finite() && pixel_aspect > 0.0) {
        return Err(invalid(section, format!("pixel_aspect must be positive, got {pixel_aspect}")));
    }
    Ok(())
}

/// Per-pixel convergence control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveConfig {
    pub enabled: bool,
    /// Relative half-width of the 95% interval at which a pixel is done
    pub tolerance: f32,
    /// Batches a pixel always receives before it may converge
    pub min_samples: u32,
    /// Hard cap on batches per pixel
    pub max_samples: u32,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tolerance: 0.05,
            min_samples: 4,
            max_samples: 64,
        }
    }
}

impl AdaptiveConfig {
    pub fn validate(&self) -> RenderResult<()> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(invalid("adaptive", format!("tolerance must be positive, got {}", self.tolerance)));
        }
        if self.min_samples < 2 {
            return Err(invalid("adaptive", "min_samples must be at least 2"));
        }
        if self.max_samples < self.min_samples {
            return Err(invalid(
                "adaptive",
                format!(
                    "max_samples ({}) is below min_samples ({})",
                    self.max_samples, self.min_samples
                ),
            ));
        }
        Ok(())
    }
}

/// Edge-aware temporal blending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporalConfig {
    pub enabled: bool,
    /// Upper bound on the history weight
    pub max_history: f32,
    /// Spatial sigma of the edge term, in luminance units
    pub sigma: f32,
    /// Exponent of the difference term
    pub power: f32,
    /// Camera change that counts as movement
    pub camera_epsilon: f32,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_history: 0.95,
            sigma: 0.25,
            power: 2.0,
            camera_epsilon: 1e-4,
        }
    }
}

impl TemporalConfig {
    pub fn validate(&self) -> RenderResult<()> {
        if !(0.0..1.0).contains(&self.max_history) {
            return Err(invalid("temporal", format!("max_history must be in [0, 1), got {}", self.max_history)));
        }
        if !(self.sigma.is_finite() && self.sigma > 0.0) {
            return Err(invalid("temporal", format!("sigma must be positive, got {}", self.sigma)));
        }
        if !(self.power.is_finite() && self.power >= 0.0) {
            return Err(invalid("temporal", format!("power must be non-negative, got {}", self.power)));
        }
        if !(self.camera_epsilon.is_finite() && self.camera_epsilon >= 0.0) {
            return Err(invalid("temporal", "camera_epsilon must be non-negative"));
        }
        Ok(())
    }
}

/// Path tracer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathTracerConfig {
    /// Camera rays per pixel per batch
    pub samples: u32,
    /// Maximum path segments
    pub bounces: u32,
    pub pixel_aspect: f32,
    pub russian_roulette: bool,
    /// Perturb the per-pixel seed by elapsed time
    pub time_dither: bool,
    pub bucket_size: u32,
    pub adaptive: AdaptiveConfig,
    pub temporal: TemporalConfig,
}

impl Default for PathTracerConfig {
    fn default() -> Self {
        Self {
            samples: 4,
            bounces: 4,
            pixel_aspect: DEFAULT_PIXEL_ASPECT,
            russian_roulette: true,
            time_dither: false,
            bucket_size: crate::bucket::DEFAULT_BUCKET_SIZE,
            adaptive: AdaptiveConfig::default(),
            temporal: TemporalConfig::default(),
        }
    }
}

impl PathTracerConfig {
    /// Plain single-batch rendering: no adaptive state, no history.
    pub fn single_pass(samples: u32, bounces: u32) -> Self {
        Self {
            samples,
            bounces,
            adaptive: AdaptiveConfig {
                enabled: false,
                ..Default::default()
            },
            temporal: TemporalConfig {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn validate(&self) -> RenderResult<()> {
        if self.samples == 0 {
            return Err(invalid("path_tracer", "samples must be at least 1"));
        }
        if self.bounces == 0 {
            return Err(invalid("path_tracer", "bounces must be at least 1"));
        }
        if self.bucket_size == 0 {
            return Err(invalid("path_tracer", "bucket_size must be at least 1"));
        }
        check_pixel_aspect("path_tracer", self.pixel_aspect)?;
        self.adaptive.validate()?;
        self.temporal.validate()
    }
}

/// Ray tracer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RayTracerConfig {
    pub pixel_aspect: f32,
    pub bucket_size: u32,
}

impl Default for RayTracerConfig {
    fn default() -> Self {
        Self {
            pixel_aspect: DEFAULT_PIXEL_ASPECT,
            bucket_size: crate::bucket::DEFAULT_BUCKET_SIZE,
        }
    }
}

impl RayTracerConfig {
    pub fn validate(&self) -> RenderResult<()> {
        if self.bucket_size == 0 {
            return Err(invalid("raytracer", "bucket_size must be at least 1"));
        }
        check_pixel_aspect("raytracer", self.pixel_aspect)
    }
}

/// Rasterizer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterConfig {
    pub pixel_aspect: f32,
    /// Near clipping distance along the view direction
    pub near: f32,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            pixel_aspect: DEFAULT_PIXEL_ASPECT,
            near: 0.05,
        }
    }
}

impl RasterConfig {
    pub fn validate(&self) -> RenderResult<()> {
        if !(self.near.is_finite() && self.near > 0.0) {
            return Err(invalid("raster", format!("near must be positive, got {}", self.near)));
        }
        check_pixel_aspect("raster", self.pixel_aspect)
    }
}

/// ASCII output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlyphConfig {
    /// Characters from darkest to brightest
    pub ramp: String,
    /// Emit ANSI truecolor escapes
    pub color: bool,
}

impl Default for GlyphConfig {
    fn default() -> Self {
        Self {
            ramp: crate::glyph::DEFAULT_RAMP.to_string(),
            color: true,
        }
    }
}

impl GlyphConfig {
    pub fn validate(&self) -> RenderResult<()> {
        crate::glyph::AsciiRamp::new(&self.ramp).map(|_| ())
    }
}

/// All settings of a rendering session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Initial backend name or alias
    pub backend: String,
    pub path_tracer: PathTracerConfig,
    pub raytracer: RayTracerConfig,
    pub raster: RasterConfig,
    pub glyph: GlyphConfig,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            backend: "pathtrace".to_string(),
            path_tracer: PathTracerConfig::default(),
            raytracer: RayTracerConfig::default(),
            raster: RasterConfig::default(),
            glyph: GlyphConfig::default(),
        }
    }
}

impl RenderSettings {
    pub fn from_json_str(json: &str) -> RenderResult<Self> {
        let settings: RenderSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load and validate settings from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> RenderResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let settings = Self::from_json_str(&text)?;
        log::info!("Loaded render settings from {}", path.as_ref().display());
        Ok(settings)
    }

    pub fn validate(&self) -> RenderResult<()> {
        self.path_tracer.validate()?;
        self.raytracer.validate()?;
        self.raster.validate()?;
        self.glyph.validate()
    }
}
