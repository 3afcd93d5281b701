//! Camera for ray generation.
//!
//! A thin per-frame wrapper over the shared [`ViewFrame`], so every
//! backend maps the same pose to the same pixels.

use glyph_math::{CameraPose, Ray, Vec2, ViewFrame};
use rand::Rng;

/// Camera for generating rays into the scene.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    frame: ViewFrame,
}

impl Camera {
    pub fn new(pose: &CameraPose, width: u32, height: u32, pixel_aspect: f32) -> Self {
        Self {
            frame: ViewFrame::new(pose, width, height, pixel_aspect),
        }
    }

    pub fn frame(&self) -> &ViewFrame {
        &self.frame
    }

    pub fn width(&self) -> u32 {
        self.frame.width
    }

    pub fn height(&self) -> u32 {
        self.frame.height
    }

    /// Ray through the exact center of pixel `(x, y)`.
    pub fn center_ray(&self, x: u32, y: u32) -> Ray {
        self.frame.ray_through(x as f32 + 0.5, y as f32 + 0.5)
    }

    /// Ray through a uniformly jittered point of pixel `(x, y)` (box filter).
    pub fn get_ray<R: Rng + ?Sized>(&self, x: u32, y: u32, rng: &mut R) -> Ray {
        let jitter = Vec2::new(rng.gen::<f32>(), rng.gen::<f32>());
        self.frame.ray_through(x as f32 + jitter.x, y as f32 + jitter.y)
    }
}
