/// Distance skipped at a ray origin so a query does not report the surface
/// the ray starts on.
pub const RAY_EPSILON: f32 = 1e-3;

/// Open range `(min, max)` of ray parameters a hit query accepts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f32,
    pub max: f32,
}

impl Interval {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Everything in front of the origin.
    pub fn forward() -> Self {
        Self::new(RAY_EPSILON, f32::INFINITY)
    }

    /// Shadow segment ending just short of `max`.
    pub fn segment(max: f32) -> Self {
        Self::new(RAY_EPSILON, max)
    }

    pub fn surrounds(&self, t: f32) -> bool {
        self.min < t && t < self.max
    }

    /// Pulls the far end in to `max`; closest-hit scans call this after each hit.
    pub fn with_max(&self, max: f32) -> Interval {
        Interval::new(self.min, max.min(self.max))
    }
}
