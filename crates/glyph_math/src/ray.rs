use crate::interval::RAY_EPSILON;
use crate::Vec3;

/// Half-line `origin + t * direction`.
///
/// Camera and bounce rays carry unit directions; hit distances are only
/// meaningful as world units when that holds.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Secondary ray leaving `point`. The origin is pushed along `normal` to
    /// whichever side `direction` points into, so reflected rays start above
    /// the surface and refracted ones below it.
    #[inline]
    pub fn offset(point: Vec3, normal: Vec3, direction: Vec3) -> Self {
        let push = if direction.dot(normal) >= 0.0 { RAY_EPSILON } else { -RAY_EPSILON };
        Self::new(point + normal * push, direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_walks_along_direction() {
        let ray = Ray::new(Vec3::new(1.0, 0.0, 0.0), Vec3::NEG_Z);
        assert_eq!(ray.at(0.0), ray.origin());
        assert_eq!(ray.at(3.0), Vec3::new(1.0, 0.0, -3.0));
    }

    #[test]
    fn test_offset_follows_direction_side() {
        let reflected = Ray::offset(Vec3::ZERO, Vec3::Y, Vec3::new(1.0, 1.0, 0.0).normalize());
        assert!(reflected.origin.y > 0.0);

        let refracted = Ray::offset(Vec3::ZERO, Vec3::Y, Vec3::NEG_Y);
        assert!(refracted.origin.y < 0.0);
        assert_eq!(refracted.direction(), Vec3::NEG_Y);
    }
}
