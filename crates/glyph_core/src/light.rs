//! Light sources: point, directional, environment and the single area light.

use glyph_math::Vec3;
use serde::{Deserialize, Serialize};

use crate::material::LIGHT_EMISSION;

/// Radius of the automatic area-light orbit.
pub const AREA_LIGHT_ORBIT_RADIUS: f32 = 1.5;
/// Angular speed of the automatic area-light orbit (radians per second).
pub const AREA_LIGHT_ORBIT_SPEED: f32 = 0.6;

/// A point light.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 3.0, 0.0),
            color: Vec3::ONE,
            intensity: 1.0,
        }
    }
}

impl PointLight {
    /// Distance falloff shared by the ray tracer and the rasterizer.
    #[inline]
    pub fn attenuation(distance: f32) -> f32 {
        1.0 / (1.0 + distance * distance)
    }

    /// Incident radiance scale at `distance`.
    pub fn radiance_at(&self, distance: f32) -> Vec3 {
        self.color * self.intensity * Self::attenuation(distance)
    }
}

/// A directional light. `direction` points toward the light.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionalLight {
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(0.3, 1.0, 0.5).normalize(),
            color: Vec3::ONE,
            intensity: 1.0,
        }
    }
}

impl DirectionalLight {
    pub fn radiance(&self) -> Vec3 {
        self.color * self.intensity
    }
}

/// Environment term seen by rays that miss all geometry.
///
/// Flat when `ground` is unset; otherwise blends from `ground` (looking
/// down) to `color` (looking up).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvLight {
    pub color: Vec3,
    pub intensity: f32,
    pub ground: Option<Vec3>,
}

impl Default for EnvLight {
    fn default() -> Self {
        Self {
            color: Vec3::new(0.6, 0.7, 0.9),
            intensity: 0.25,
            ground: None,
        }
    }
}

impl EnvLight {
    pub fn flat(color: Vec3, intensity: f32) -> Self {
        Self {
            color,
            intensity,
            ground: None,
        }
    }

    /// Flat tint, ignoring any gradient.
    pub fn ambient(&self) -> Vec3 {
        self.color * self.intensity
    }

    /// Sky/ground gradient for a unit direction.
    pub fn radiance(&self, direction: Vec3) -> Vec3 {
        match self.ground {
            None => self.ambient(),
            Some(ground) => {
                let a = 0.5 * (direction.y + 1.0);
                ground.lerp(self.color, a.clamp(0.0, 1.0)) * self.intensity
            }
        }
    }
}

/// The spherical area light used for next-event estimation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AreaLight {
    pub center: Vec3,
    pub radius: f32,
    /// Follow the built-in orbit instead of the stored center
    pub auto: bool,
    pub emission: Vec3,
}

impl Default for AreaLight {
    fn default() -> Self {
        Self {
            center: Vec3::new(0.0, 3.0, 0.0),
            radius: 0.5,
            auto: false,
            emission: LIGHT_EMISSION,
        }
    }
}

impl AreaLight {
    /// Center at `time` seconds. Deterministic in `time`.
    pub fn center_at(&self, time: f32) -> Vec3 {
        if !self.auto {
            return self.center;
        }
        let (s, c) = (time * AREA_LIGHT_ORBIT_SPEED).sin_cos();
        self.center + Vec3::new(c, 0.0, s) * AREA_LIGHT_ORBIT_RADIUS
    }
}

/// All lights of a scene.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lights {
    pub points: Vec<PointLight>,
    pub directionals: Vec<DirectionalLight>,
    pub env: EnvLight,
    pub area: AreaLight,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attenuation_decreases() {
        assert_eq!(PointLight::attenuation(0.0), 1.0);
        assert!(PointLight::attenuation(2.0) < PointLight::attenuation(1.0));
    }

    #[test]
    fn test_flat_env_ignores_direction() {
        let env = EnvLight::flat(Vec3::splat(0.5), 1.0);
        assert_eq!(env.radiance(Vec3::Y), Vec3::splat(0.5));
        assert_eq!(env.radiance(Vec3::NEG_Y), Vec3::splat(0.5));
    }

    #[test]
    fn test_gradient_env() {
        let env = EnvLight {
            color: Vec3::new(0.0, 0.0, 1.0),
            intensity: 1.0,
            ground: Some(Vec3::new(1.0, 0.0, 0.0)),
        };
        assert!((env.radiance(Vec3::Y) - Vec3::Z).length() < 1e-6);
        assert!((env.radiance(Vec3::NEG_Y) - Vec3::X).length() < 1e-6);
    }

    #[test]
    fn test_area_light_orbit() {
        let fixed = AreaLight::default();
        assert_eq!(fixed.center_at(12.0), fixed.center);

        let orbiting = AreaLight {
            auto: true,
            ..AreaLight::default()
        };
        let a = orbiting.center_at(1.0);
        let b = orbiting.center_at(1.0);
        assert_eq!(a, b);
        assert!((a.y - orbiting.center.y).abs() < 1e-6);
        assert!(((a - orbiting.center).length() - AREA_LIGHT_ORBIT_RADIUS).abs() < 1e-5);
        assert_ne!(orbiting.center_at(2.0), a);
    }
}
