//! Hittable trait and HitRecord for ray-object intersection.
//!
//! Implemented for the core primitives, generic over whatever material
//! handle a backend's scene shape carries.

use glyph_core::{Plane, Quad, Sphere, Triangle};
use glyph_math::intersect::{hit_plane, hit_sphere, hit_triangle};
use glyph_math::{Interval, Ray, Vec3};

/// Record of a ray-object intersection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitRecord<M> {
    /// Point of intersection
    pub p: Vec3,
    /// Surface normal at intersection (always points against ray)
    pub normal: Vec3,
    /// Parameter t where the intersection occurs
    pub t: f32,
    /// Whether the ray hit the front face (outside) of the surface
    pub front_face: bool,
    /// Material handle of the primitive
    pub material: M,
    /// Nearest atlas texel, for textured triangles and quads
    pub texel: Option<[i64; 2]>,
}

impl<M> HitRecord<M> {
    pub fn new(ray: &Ray, t: f32, outward_normal: Vec3, material: M) -> Self {
        let mut rec = Self {
            p: ray.at(t),
            normal: outward_normal,
            t,
            front_face: true,
            material,
            texel: None,
        };
        rec.set_face_normal(ray, outward_normal);
        rec
    }

    /// Set the face normal based on ray direction and outward normal.
    ///
    /// The normal is always stored pointing against the ray direction,
    /// so we need to track whether we hit the front or back face.
    pub fn set_face_normal(&mut self, ray: &Ray, outward_normal: Vec3) {
        self.front_face = ray.direction().dot(outward_normal) < 0.0;
        self.normal = if self.front_face {
            outward_normal
        } else {
            -outward_normal
        };
    }
}

/// Trait for objects that can be hit by rays.
pub trait Hittable {
    type Material: Copy;

    /// Nearest hit strictly inside `ray_t`.
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<HitRecord<Self::Material>>;
}

impl<M: Copy> Hittable for Sphere<M> {
    type Material = M;

    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<HitRecord<M>> {
        let t = hit_sphere(ray, self.center, self.radius, ray_t)?;
        let outward = (ray.at(t) - self.center) / self.radius;
        Some(HitRecord::new(ray, t, outward, self.material))
    }
}

impl<M: Copy> Hittable for Triangle<M> {
    type Material = M;

    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<HitRecord<M>> {
        let hit = hit_triangle(ray, self.a, self.b, self.c, ray_t)?;
        let mut rec = HitRecord::new(ray, hit.t, self.normal(), self.material);
        rec.texel = self.texel_coord(hit.weights());
        Some(rec)
    }
}

impl<M: Copy> Hittable for Quad<M> {
    type Material = M;

    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<HitRecord<M>> {
        let [first, second] = self.triangles();
        match first.hit(ray, ray_t) {
            Some(rec) => Some(second.hit(ray, ray_t.with_max(rec.t)).unwrap_or(rec)),
            None => second.hit(ray, ray_t),
        }
    }
}

impl<M: Copy> Hittable for Plane<M> {
    type Material = M;

    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<HitRecord<M>> {
        let t = hit_plane(ray, self.normal, self.d, ray_t)?;
        Some(HitRecord::new(ray, t, self.normal, self.material))
    }
}

/// Closest hit over a list, starting from an existing best candidate.
/// Ties keep the earlier candidate.
pub fn closest_hit<H: Hittable>(
    objects: &[H],
    ray: &Ray,
    ray_t: Interval,
    best: Option<HitRecord<H::Material>>,
) -> Option<HitRecord<H::Material>> {
    let mut best = best;
    let mut closest = best.map_or(ray_t.max, |rec| rec.t);
    for object in objects {
        if let Some(rec) = object.hit(ray, ray_t.with_max(closest)) {
            closest = rec.t;
            best = Some(rec);
        }
    }
    best
}

/// True when anything in the list blocks the ray inside `ray_t`.
pub fn any_hit<H: Hittable>(objects: &[H], ray: &Ray, ray_t: Interval) -> bool {
    objects.iter().any(|object| object.hit(ray, ray_t).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_hit_front_and_back() {
        let sphere = Sphere::new(Vec3::new(0.0, 0.0, -3.0), 1.0, 7u8);
        let outside = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let rec = sphere.hit(&outside, Interval::forward()).unwrap();
        assert!((rec.t - 2.0).abs() < 1e-5);
        assert!(rec.front_face);
        assert!((rec.normal - Vec3::Z).length() < 1e-5);
        assert_eq!(rec.material, 7);

        let inside = Ray::new(Vec3::new(0.0, 0.0, -3.0), Vec3::NEG_Z);
        let rec = sphere.hit(&inside, Interval::forward()).unwrap();
        assert!(!rec.front_face);
        assert!((rec.normal - Vec3::Z).length() < 1e-5, "normal faces the ray");
    }

    #[test]
    fn test_quad_hits_both_halves() {
        let quad = Quad::new(
            Vec3::new(-1.0, -1.0, -2.0),
            Vec3::new(1.0, -1.0, -2.0),
            Vec3::new(1.0, 1.0, -2.0),
            Vec3::new(-1.0, 1.0, -2.0),
            (),
        );
        for dir in [Vec3::new(0.3, -0.2, -1.0), Vec3::new(-0.3, 0.2, -1.0)] {
            let rec = quad.hit(&Ray::new(Vec3::ZERO, dir), Interval::forward());
            assert!(rec.is_some(), "dir {dir:?}");
        }
        assert!(quad.hit(&Ray::new(Vec3::ZERO, Vec3::Z), Interval::forward()).is_none());
    }

    #[test]
    fn test_textured_triangle_reports_texel() {
        let tri = Triangle::new(
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(-1.0, 1.0, -1.0),
            0usize,
        )
        .with_uv([[0, 0], [10, 0], [0, 10]]);
        // (-0.8, -0.8) is 10% of the way toward both b and c
        let ray = Ray::new(Vec3::ZERO, Vec3::new(-0.8, -0.8, -1.0));
        let rec = tri.hit(&ray, Interval::forward()).unwrap();
        assert_eq!(rec.texel, Some([1, 1]));
    }

    #[test]
    fn test_closest_keeps_first_on_tie() {
        let spheres = [
            Sphere::new(Vec3::new(0.0, 0.0, -5.0), 1.0, 'a'),
            Sphere::new(Vec3::new(0.0, 0.0, -5.0), 1.0, 'b'),
            Sphere::new(Vec3::new(0.0, 0.0, -9.0), 1.0, 'c'),
        ];
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let rec = closest_hit(&spheres, &ray, Interval::forward(), None).unwrap();
        assert_eq!(rec.material, 'a');
        assert!((rec.t - 4.0).abs() < 1e-5);

        assert!(any_hit(&spheres, &ray, Interval::segment(4.5)));
        assert!(!any_hit(&spheres, &ray, Interval::segment(3.5)));
    }

    #[test]
    fn test_plane_hit() {
        let plane = Plane::new(Vec3::Y, 0.0, ());
        let ray = Ray::new(Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.0, -1.0, -1.0).normalize());
        let rec = plane.hit(&ray, Interval::forward()).unwrap();
        assert!(rec.p.y.abs() < 1e-5);
        assert!((rec.normal - Vec3::Y).length() < 1e-6);
    }
}
