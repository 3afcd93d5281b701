// Re-export glam for convenience
pub use glam::*;

// glyphray math types
mod camera;
mod interval;
pub mod intersect;
mod ray;

pub use camera::{CameraPose, ViewFrame};
pub use interval::{Interval, RAY_EPSILON};
pub use ray::Ray;

/// Rec. 709 luminance of a linear RGB color.
#[inline]
pub fn luminance(rgb: Vec3) -> f32 {
    0.2126 * rgb.x + 0.7152 * rgb.y + 0.0722 * rgb.z
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luminance_weights_sum_to_one() {
        assert!((luminance(Vec3::ONE) - 1.0).abs() < 1e-6);
        assert_eq!(luminance(Vec3::ZERO), 0.0);
    }

    #[test]
    fn test_luminance_green_dominates() {
        let green = luminance(Vec3::new(0.0, 1.0, 0.0));
        let red = luminance(Vec3::new(1.0, 0.0, 0.0));
        let blue = luminance(Vec3::new(0.0, 0.0, 1.0));
        assert!(green > red && red > blue);
    }
}
