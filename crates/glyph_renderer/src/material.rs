//! Scattering helpers shared by the path tracer and the ray tracer.

use std::f32::consts::PI;

use glyph_math::Vec3;
use rand::Rng;

/// Color type alias (RGB values typically 0-1)
pub type Color = Vec3;

/// Index of refraction used for every specular material.
pub const GLASS_IOR: f32 = 1.5;

/// Reflect a vector about a normal.
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

/// Refract a vector through a surface.
#[inline]
pub fn refract(uv: Vec3, n: Vec3, etai_over_etat: f32) -> Vec3 {
    let cos_theta = (-uv).dot(n).min(1.0);
    let r_out_perp = etai_over_etat * (uv + cos_theta * n);
    let r_out_parallel = -(1.0 - r_out_perp.length_squared()).abs().sqrt() * n;
    r_out_perp + r_out_parallel
}

/// Schlick's approximation for reflectance
#[inline]
pub fn reflectance(cosine: f32, ior: f32) -> f32 {
    let r0 = ((1.0 - ior) / (1.0 + ior)).powi(2);
    r0 + (1.0 - r0) * (1.0 - cosine).powi(5)
}

/// Outcome of a specular bounce.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpecularBounce {
    pub direction: Vec3,
    /// The ray crossed the surface instead of reflecting off it
    pub refracted: bool,
}

/// Fresnel-weighted reflect-or-refract at a glass interface.
///
/// `normal` faces the incoming ray; `front_face` says whether the ray
/// arrives from outside. Total internal reflection always reflects.
pub fn specular_bounce<R: Rng + ?Sized>(
    direction: Vec3,
    normal: Vec3,
    front_face: bool,
    rng: &mut R,
) -> SpecularBounce {
    let unit = direction.normalize();
    let ratio = if front_face { 1.0 / GLASS_IOR } else { GLASS_IOR };
    let cos_theta = (-unit).dot(normal).min(1.0);
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();

    let cannot_refract = ratio * sin_theta > 1.0;
    if cannot_refract || reflectance(cos_theta, ratio) > rng.gen::<f32>() {
        SpecularBounce {
            direction: reflect(unit, normal),
            refracted: false,
        }
    } else {
        SpecularBounce {
            direction: refract(unit, normal, ratio).normalize(),
            refracted: true,
        }
    }
}

/// Orthonormal basis with `w` along the given axis.
#[derive(Debug, Clone, Copy)]
pub struct Onb {
    pub u: Vec3,
    pub v: Vec3,
    pub w: Vec3,
}

impl Onb {
    pub fn new(axis: Vec3) -> Self {
        let w = axis.normalize();
        let helper = if w.x.abs() > 0.9 { Vec3::Y } else { Vec3::X };
        let v = w.cross(helper).normalize();
        let u = w.cross(v);
        Self { u, v, w }
    }

    #[inline]
    pub fn local(&self, a: Vec3) -> Vec3 {
        a.x * self.u + a.y * self.v + a.z * self.w
    }
}

/// Cosine-weighted direction in the hemisphere around `normal`.
pub fn cosine_hemisphere<R: Rng + ?Sized>(normal: Vec3, rng: &mut R) -> Vec3 {
    let r1: f32 = rng.gen();
    let r2: f32 = rng.gen();
    let phi = 2.0 * PI * r1;
    let r = r2.sqrt();
    let local = Vec3::new(phi.cos() * r, phi.sin() * r, (1.0 - r2).max(0.0).sqrt());
    Onb::new(normal).local(local).normalize()
}

/// Uniform direction inside the cone around `axis` with half angle
/// `acos(cos_theta_max)`.
pub fn sample_cone<R: Rng + ?Sized>(axis: Vec3, cos_theta_max: f32, rng: &mut R) -> Vec3 {
    let r1: f32 = rng.gen();
    let r2: f32 = rng.gen();
    let cos_theta = 1.0 - r1 * (1.0 - cos_theta_max);
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let phi = 2.0 * PI * r2;
    let local = Vec3::new(phi.cos() * sin_theta, phi.sin() * sin_theta, cos_theta);
    Onb::new(axis).local(local).normalize()
}
