//! Ray-primitive intersection tests shared by every backend.
//!
//! Each test returns the ray parameter of the nearest hit inside `ray_t`.

use crate::{Interval, Ray, Vec3};

/// Sphere hit. Returns the nearest root inside `ray_t`.
pub fn hit_sphere(ray: &Ray, center: Vec3, radius: f32, ray_t: Interval) -> Option<f32> {
    let oc = center - ray.origin();
    let a = ray.direction().length_squared();
    let h = ray.direction().dot(oc);
    let c = oc.length_squared() - radius * radius;

    let discriminant = h * h - a * c;
    if discriminant < 0.0 {
        return None;
    }

    let sqrtd = discriminant.sqrt();

    // Find the nearest root in the acceptable range
    let mut root = (h - sqrtd) / a;
    if !ray_t.surrounds(root) {
        root = (h + sqrtd) / a;
        if !ray_t.surrounds(root) {
            return None;
        }
    }
    Some(root)
}

/// Barycentric hit on a triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    pub t: f32,
    /// Weight of vertex `b`
    pub u: f32,
    /// Weight of vertex `c`
    pub v: f32,
}

impl TriangleHit {
    /// Weights for `(a, b, c)`.
    pub fn weights(&self) -> Vec3 {
        Vec3::new(1.0 - self.u - self.v, self.u, self.v)
    }
}

/// Möller-Trumbore ray-triangle intersection.
pub fn hit_triangle(ray: &Ray, a: Vec3, b: Vec3, c: Vec3, ray_t: Interval) -> Option<TriangleHit> {
    let edge1 = b - a;
    let edge2 = c - a;

    let h = ray.direction().cross(edge2);
    let det = edge1.dot(h);

    // Ray is parallel to triangle
    if det.abs() < 1e-8 {
        return None;
    }

    let f = 1.0 / det;
    let s = ray.origin() - a;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * ray.direction().dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    if !ray_t.surrounds(t) {
        return None;
    }

    Some(TriangleHit { t, u, v })
}

/// Infinite plane `normal · p = d`.
pub fn hit_plane(ray: &Ray, normal: Vec3, d: f32, ray_t: Interval) -> Option<f32> {
    let denom = normal.dot(ray.direction());
    if denom.abs() < 1e-8 {
        return None;
    }
    let t = (d - normal.dot(ray.origin())) / denom;
    ray_t.surrounds(t).then_some(t)
}

/// Barycentric weights of `p` with respect to triangle `(a, b, c)`.
///
/// `p` is assumed to lie in the triangle's plane. Degenerate triangles
/// put all weight on `a`.
pub fn barycentric(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let d00 = v0.dot(v0);
    let d01 = v0.dot(v1);
    let d11 = v1.dot(v1);
    let d20 = v2.dot(v0);
    let d21 = v2.dot(v1);
    let denom = d00 * d11 - d01 * d01;
    if denom.abs() < 1e-12 {
        return Vec3::X;
    }
    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    Vec3::new(1.0 - v - w, v, w)
}
