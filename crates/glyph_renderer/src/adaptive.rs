//! Adaptive sampling and temporal accumulation.
//!
//! [`AdaptiveController`] keeps a Welford mean/variance of each pixel's
//! luminance across traced batches and switches a pixel off once its 95%
//! confidence half-width is within tolerance of the mean, or once it hits
//! the sample cap. [`TemporalAccumulator`] blends each new frame into a
//! ping-pong history with edge- and difference-aware weights.

use glyph_math::{luminance, CameraPose, Vec3};

use crate::config::{AdaptiveConfig, TemporalConfig};
use crate::pixel::{FrameBuffer, Pixel};

/// Two-sided 95% normal quantile.
pub const Z_95: f32 = 1.96;

/// Running statistics of one pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveState {
    pub sample_count: u32,
    pub mean: f32,
    pub m2: f32,
    pub active: bool,
}

impl Default for AdaptiveState {
    fn default() -> Self {
        Self {
            sample_count: 0,
            mean: 0.0,
            m2: 0.0,
            active: true,
        }
    }
}

impl AdaptiveState {
    /// Welford update.
    pub fn push(&mut self, x: f32) {
        self.sample_count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.sample_count as f32;
        self.m2 += delta * (x - self.mean);
    }

    /// Unbiased sample variance.
    pub fn variance(&self) -> f32 {
        if self.sample_count < 2 {
            0.0
        } else {
            self.m2 / (self.sample_count - 1) as f32
        }
    }

    /// Half-width of the 95% confidence interval of the mean.
    pub fn half_width(&self) -> f32 {
        if self.sample_count == 0 {
            return f32::INFINITY;
        }
        Z_95 * (self.variance() / self.sample_count as f32).sqrt()
    }

    fn update_active(&mut self, config: &AdaptiveConfig) {
        if self.sample_count >= config.max_samples {
            self.active = false;
        } else if self.sample_count >= config.min_samples
            && self.half_width() <= config.tolerance * self.mean.abs()
        {
            self.active = false;
        }
    }
}

/// Per-pixel convergence tracker.
#[derive(Debug, Clone)]
pub struct AdaptiveController {
    config: AdaptiveConfig,
    camera_epsilon: f32,
    width: u32,
    height: u32,
    camera: Option<CameraPose>,
    states: Vec<AdaptiveState>,
}

impl AdaptiveController {
    pub fn new(config: AdaptiveConfig, camera_epsilon: f32) -> Self {
        Self {
            config,
            camera_epsilon,
            width: 0,
            height: 0,
            camera: None,
            states: Vec::new(),
        }
    }

    pub fn config(&self) -> &AdaptiveConfig {
        &self.config
    }

    /// Swap the configuration; any change resets the statistics.
    pub fn set_config(&mut self, config: AdaptiveConfig) {
        if config != self.config {
            self.config = config;
            self.reset();
        }
    }

    /// Make the state match this frame. Returns `true` when it was reset
    /// (first frame, new resolution or a camera move).
    pub fn prepare(&mut self, width: u32, height: u32, camera: &CameraPose) -> bool {
        let resized = width != self.width || height != self.height || self.states.is_empty();
        let moved = self
            .camera
            .map_or(true, |last| last.moved_from(camera, self.camera_epsilon));
        self.camera = Some(*camera);
        if resized || moved {
            self.width = width;
            self.height = height;
            self.states = vec![AdaptiveState::default(); width as usize * height as usize];
            log::debug!(
                "Adaptive state reset ({}x{}, resized: {}, camera moved: {})",
                width,
                height,
                resized,
                moved
            );
            return true;
        }
        false
    }

    /// Drop all statistics; the next `prepare` starts over.
    pub fn reset(&mut self) {
        self.states.clear();
        self.camera = None;
        self.width = 0;
        self.height = 0;
    }

    pub fn state(&self, index: usize) -> Option<&AdaptiveState> {
        self.states.get(index)
    }

    pub fn is_active(&self, index: usize) -> bool {
        self.states.get(index).map_or(true, |s| s.active)
    }

    pub fn active_count(&self) -> usize {
        self.states.iter().filter(|s| s.active).count()
    }

    /// One byte per pixel: 255 keeps tracing, 0 is converged.
    pub fn active_mask(&self) -> Vec<u8> {
        self.states
            .iter()
            .map(|s| if s.active { 255 } else { 0 })
            .collect()
    }

    /// Feed one traced luminance value to an active pixel.
    pub fn record(&mut self, index: usize, luminance: f32) {
        let config = &self.config;
        if let Some(state) = self.states.get_mut(index) {
            if state.active {
                state.push(luminance);
                state.update_active(config);
            }
        }
    }

    /// Feed a whole batch; pixels that were not traced are skipped.
    pub fn record_frame(&mut self, frame: &FrameBuffer, traced: &[bool]) {
        for (index, (pixel, &was_traced)) in frame.pixels.iter().zip(traced).enumerate() {
            if was_traced {
                self.record(index, luminance(pixel.color));
            }
        }
    }
}

/// Ping-pong history blending.
#[derive(Debug, Clone)]
pub struct TemporalAccumulator {
    config: TemporalConfig,
    width: u32,
    height: u32,
    history: [Vec<Pixel>; 2],
    counts: Vec<u32>,
    read: usize,
}

impl TemporalAccumulator {
    pub fn new(config: TemporalConfig) -> Self {
        Self {
            config,
            width: 0,
            height: 0,
            history: [Vec::new(), Vec::new()],
            counts: Vec::new(),
            read: 0,
        }
    }

    pub fn set_config(&mut self, config: TemporalConfig) {
        if config != self.config {
            self.config = config;
            self.reset();
        }
    }

    pub fn reset(&mut self) {
        self.history = [Vec::new(), Vec::new()];
        self.counts.clear();
        self.width = 0;
        self.height = 0;
        self.read = 0;
    }

    /// Frames blended into a pixel's history.
    pub fn history_len(&self, index: usize) -> u32 {
        self.counts.get(index).copied().unwrap_or(0)
    }

    /// Blend `current` into the history and return the resolved frame.
    ///
    /// Untraced pixels repeat their history. Glyph pixels are copied
    /// through and restart their history. `overwrite` discards all
    /// history (first frame, camera move).
    pub fn resolve(&mut self, current: &FrameBuffer, traced: &[bool], overwrite: bool) -> FrameBuffer {
        let (w, h) = (current.width, current.height);
        let len = current.pixels.len();
        if overwrite || w != self.width || h != self.height || self.history[self.read].len() != len {
            self.width = w;
            self.height = h;
            self.history = [current.pixels.clone(), vec![Pixel::default(); len]];
            self.counts = vec![0; len];
            self.read = 0;
        }

        let lum: Vec<f32> = current.pixels.iter().map(|p| luminance(p.color)).collect();
        let write = 1 - self.read;
        let two_sigma2 = 2.0 * self.config.sigma * self.config.sigma;

        for y in 0..h {
            for x in 0..w {
                let i = (y * w + x) as usize;
                let prev = self.history[self.read][i];
                let cur = current.pixels[i];
                let n = self.counts[i];

                let resolved = if !traced.get(i).copied().unwrap_or(true) {
                    prev
                } else if cur.kind.is_glyph() || prev.kind.is_glyph() || n == 0 {
                    self.counts[i] = if cur.kind.is_glyph() { 0 } else { 1 };
                    cur
                } else {
                    let edge = edge_strength(&lum, w, h, x, y);
                    let diff = (lum[i] - luminance(prev.color)).abs().min(1.0);
                    let weight = (n as f32 / (n as f32 + 1.0)).min(self.config.max_history)
                        * (-(edge * edge) / two_sigma2).exp()
                        * (1.0 - diff).powf(self.config.power);
                    self.counts[i] = n + 1;
                    Pixel {
                        color: blend(cur.color, prev.color, weight),
                        kind: cur.kind,
                    }
                };
                self.history[write][i] = resolved;
            }
        }

        self.read = write;
        FrameBuffer::from_pixels(w, h, self.history[self.read].clone())
    }
}

#[inline]
fn blend(current: Vec3, history: Vec3, history_weight: f32) -> Vec3 {
    current * (1.0 - history_weight) + history * history_weight
}

/// Central-difference luminance gradient magnitude, clamped at borders.
fn edge_strength(lum: &[f32], w: u32, h: u32, x: u32, y: u32) -> f32 {
    let at = |x: u32, y: u32| lum[(y * w + x) as usize];
    let gx = (at((x + 1).min(w - 1), y) - at(x.saturating_sub(1), y)) * 0.5;
    let gy = (at(x, (y + 1).min(h - 1)) - at(x, y.saturating_sub(1))) * 0.5;
    (gx * gx + gy * gy).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::PixelKind;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn uniform_frame(w: u32, h: u32, value: f32) -> FrameBuffer {
        FrameBuffer::from_pixels(w, h, vec![Pixel::shaded(Vec3::splat(value)); (w * h) as usize])
    }

    #[test]
    fn test_welford_matches_two_pass() {
        let mut rng = StdRng::seed_from_u64(9);
        let xs: Vec<f32> = (0..500).map(|_| rng.gen::<f32>()).collect();
        let mut state = AdaptiveState::default();
        for &x in &xs {
            state.push(x);
        }
        let mean = xs.iter().sum::<f32>() / xs.len() as f32;
        let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / (xs.len() - 1) as f32;
        assert!((state.mean - mean).abs() < 1e-4);
        assert!((state.variance() - var).abs() < 1e-4);
        assert!((state.half_width() - 1.96 * (var / 500.0).sqrt()).abs() < 1e-4);
    }

    #[test]
    fn test_constant_pixel_converges_at_min_samples() {
        let config = AdaptiveConfig {
            enabled: true,
            tolerance: 0.05,
            min_samples: 3,
            max_samples: 10,
        };
        let mut ctl = AdaptiveController::new(config, 1e-4);
        assert!(ctl.prepare(2, 1, &CameraPose::default()));
        for k in 1..=3 {
            assert!(ctl.is_active(0), "active before batch {k}");
            ctl.record(0, 0.5);
        }
        assert!(!ctl.is_active(0));
        assert_eq!(ctl.active_mask(), vec![0, 255]);
    }

    #[test]
    fn test_noisy_pixel_hits_cap() {
        let config = AdaptiveConfig {
            enabled: true,
            tolerance: 0.001,
            min_samples: 2,
            max_samples: 6,
        };
        let mut ctl = AdaptiveController::new(config, 1e-4);
        ctl.prepare(1, 1, &CameraPose::default());
        for i in 0..20 {
            ctl.record(0, if i % 2 == 0 { 0.0 } else { 1.0 });
        }
        assert_eq!(ctl.state(0).unwrap().sample_count, 6);
        assert_eq!(ctl.active_count(), 0);
    }

    #[test]
    fn test_prepare_resets_on_resize_and_camera_move() {
        let mut ctl = AdaptiveController::new(AdaptiveConfig::default(), 1e-4);
        let pose = CameraPose::default();
        assert!(ctl.prepare(4, 4, &pose));
        ctl.record(0, 0.3);
        assert!(!ctl.prepare(4, 4, &pose));
        assert_eq!(ctl.state(0).unwrap().sample_count, 1);

        let mut nudged = pose;
        nudged.yaw += 1e-6;
        assert!(!ctl.prepare(4, 4, &nudged), "below epsilon");
        nudged.yaw += 0.1;
        assert!(ctl.prepare(4, 4, &nudged));
        assert!(ctl.prepare(5, 4, &nudged));

        ctl.set_config(AdaptiveConfig {
            tolerance: 0.5,
            ..AdaptiveConfig::default()
        });
        assert!(ctl.prepare(5, 4, &nudged), "config change resets");
    }

    #[test]
    fn test_temporal_converges_to_running_mean() {
        let config = TemporalConfig {
            max_history: 0.99,
            power: 0.0,
            ..TemporalConfig::default()
        };
        let mut acc = TemporalAccumulator::new(config);
        let traced = vec![true; 4];
        let values = [0.2, 0.4, 0.6, 0.8];
        let out = values
            .iter()
            .enumerate()
            .map(|(i, v)| acc.resolve(&uniform_frame(2, 2, *v), &traced, i == 0))
            .last()
            .unwrap();
        // Uniform frames have no edges, so this is the plain average
        assert!((out.get(1, 1).color.x - 0.5).abs() < 1e-5);
        assert_eq!(acc.history_len(0), 4);
    }

    #[test]
    fn test_overwrite_discards_history() {
        let mut acc = TemporalAccumulator::new(TemporalConfig::default());
        let traced = vec![true; 1];
        acc.resolve(&uniform_frame(1, 1, 0.9), &traced, true);
        acc.resolve(&uniform_frame(1, 1, 0.9), &traced, false);
        let out = acc.resolve(&uniform_frame(1, 1, 0.1), &traced, true);
        assert_eq!(out.get(0, 0).color, Vec3::splat(0.1));
    }

    #[test]
    fn test_untraced_pixels_keep_history_and_glyphs_pass_through() {
        let mut acc = TemporalAccumulator::new(TemporalConfig::default());
        acc.resolve(&uniform_frame(2, 1, 0.7), &[true, true], true);

        let mut next = uniform_frame(2, 1, 0.1);
        next.pixels[1] = Pixel {
            color: Vec3::new(1.0, 0.0, 0.0),
            kind: PixelKind::GlyphOverride(b'#'),
        };
        let out = acc.resolve(&next, &[false, true], false);
        assert_eq!(out.get(0, 0).color, Vec3::splat(0.7));
        assert_eq!(out.get(1, 0), next.pixels[1]);
    }

    #[test]
    fn test_large_difference_limits_blending() {
        let mut acc = TemporalAccumulator::new(TemporalConfig::default());
        let traced = vec![true];
        acc.resolve(&uniform_frame(1, 1, 0.0), &traced, true);
        let out = acc.resolve(&uniform_frame(1, 1, 1.0), &traced, false);
        // diff = 1 zeroes the history weight
        assert!((out.get(0, 0).color.x - 1.0).abs() < 1e-6);
    }
}
