use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::Ray;

/// Camera pose shared by every backend.
///
/// Yaw rotates about +Y, pitch tilts toward +Y. At `yaw = pitch = 0` the
/// camera looks down -Z with +X to the right.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraPose {
    pub position: Vec3,
    /// Radians
    pub yaw: f32,
    /// Radians
    pub pitch: f32,
    /// Vertical field of view in radians
    pub fov_y: f32,
}

impl Default for CameraPose {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 1.0, 5.0),
            yaw: 0.0,
            pitch: 0.0,
            fov_y: 60.0_f32.to_radians(),
        }
    }
}

impl CameraPose {
    /// Create a new camera pose.
    pub fn new(position: Vec3, yaw: f32, pitch: f32, fov_y: f32) -> Self {
        Self {
            position,
            yaw,
            pitch,
            fov_y,
        }
    }

    /// Unit view direction.
    pub fn forward(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        Vec3::new(sy * cp, sp, -cy * cp)
    }

    /// Unit right vector. Independent of pitch, so looking straight up or
    /// down stays well defined.
    pub fn right(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        Vec3::new(cy, 0.0, sy)
    }

    /// Unit up vector.
    pub fn up(&self) -> Vec3 {
        self.right().cross(self.forward())
    }

    /// True when any component differs by more than `epsilon`.
    pub fn moved_from(&self, other: &CameraPose, epsilon: f32) -> bool {
        (self.position - other.position).abs().max_element() > epsilon
            || (self.yaw - other.yaw).abs() > epsilon
            || (self.pitch - other.pitch).abs() > epsilon
            || (self.fov_y - other.fov_y).abs() > epsilon
    }
}

/// Camera basis resolved for one output resolution.
///
/// `pixel_aspect` is the width/height ratio of one output cell (character
/// cells are usually about half as wide as they are tall).
#[derive(Debug, Clone, Copy)]
pub struct ViewFrame {
    pub origin: Vec3,
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
    pub width: u32,
    pub height: u32,
    tan_half_fov: f32,
    aspect: f32,
}

impl ViewFrame {
    /// Depth below which a point counts as behind the camera.
    pub const NEAR: f32 = 1e-4;

    pub fn new(pose: &CameraPose, width: u32, height: u32, pixel_aspect: f32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let aspect = (width as f32 / height as f32) * pixel_aspect;
        Self {
            origin: pose.position,
            forward: pose.forward(),
            right: pose.right(),
            up: pose.up(),
            width,
            height,
            tan_half_fov: (pose.fov_y * 0.5).tan(),
            aspect,
        }
    }

    /// Image-plane aspect ratio (cells × cell shape).
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn tan_half_fov(&self) -> f32 {
        self.tan_half_fov
    }

    /// Primary ray through continuous pixel coordinates.
    ///
    /// Pixel `(x, y)` covers `[x, x+1) × [y, y+1)`; its center is at `+0.5`.
    /// Row 0 is the top of the image.
    pub fn ray_through(&self, px: f32, py: f32) -> Ray {
        let ndc_x = (px / self.width as f32) * 2.0 - 1.0;
        let ndc_y = 1.0 - (py / self.height as f32) * 2.0;
        let direction = self.forward
            + self.right * (ndc_x * self.tan_half_fov * self.aspect)
            + self.up * (ndc_y * self.tan_half_fov);
        Ray::new(self.origin, direction.normalize())
    }

    /// World point into camera space: x right, y up, z along the view direction.
    pub fn to_view(&self, point: Vec3) -> Vec3 {
        let d = point - self.origin;
        Vec3::new(d.dot(self.right), d.dot(self.up), d.dot(self.forward))
    }

    /// Camera-space point to continuous pixel coordinates.
    ///
    /// Inverse of [`ViewFrame::ray_through`]. Returns `None` behind the camera.
    pub fn view_to_pixel(&self, view: Vec3) -> Option<Vec2> {
        if view.z <= Self::NEAR {
            return None;
        }
        let ndc_x = view.x / (view.z * self.tan_half_fov * self.aspect);
        let ndc_y = view.y / (view.z * self.tan_half_fov);
        Some(Vec2::new(
            (ndc_x + 1.0) * 0.5 * self.width as f32,
            (1.0 - ndc_y) * 0.5 * self.height as f32,
        ))
    }

    /// Project a world point to continuous pixel coordinates.
    pub fn project(&self, point: Vec3) -> Option<Vec2> {
        self.view_to_pixel(self.to_view(point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_default_pose_looks_down_negative_z() {
        let pose = CameraPose::new(Vec3::ZERO, 0.0, 0.0, 1.0);
        assert!((pose.forward() - Vec3::NEG_Z).length() < 1e-6);
        assert!((pose.right() - Vec3::X).length() < 1e-6);
        assert!((pose.up() - Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn test_basis_is_orthonormal_when_looking_down() {
        let pose = CameraPose::new(Vec3::new(0.0, 5.0, 0.0), 0.3, -FRAC_PI_2, 1.0);
        let (f, r, u) = (pose.forward(), pose.right(), pose.up());
        assert!((f - Vec3::NEG_Y).length() < 1e-5);
        assert!(f.dot(r).abs() < 1e-5);
        assert!(f.dot(u).abs() < 1e-5);
        assert!((u.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_center_ray_is_forward() {
        let pose = CameraPose::new(Vec3::new(1.0, 2.0, 3.0), 0.7, 0.2, 1.0);
        let frame = ViewFrame::new(&pose, 80, 40, 0.5);
        let ray = frame.ray_through(40.0, 20.0);
        assert!((ray.direction - pose.forward()).length() < 1e-5);
        assert_eq!(ray.origin, pose.position);
    }

    #[test]
    fn test_project_inverts_ray_through() {
        let pose = CameraPose::new(Vec3::new(0.5, 1.0, 4.0), -0.4, 0.1, 0.9);
        let frame = ViewFrame::new(&pose, 64, 32, 0.5);

        for &(px, py) in &[(3.5, 2.5), (60.25, 30.0), (32.0, 16.0), (10.0, 28.75)] {
            let ray = frame.ray_through(px, py);
            let world = ray.at(7.0);
            let pixel = frame.project(world).expect("point is in front of the camera");
            assert!((pixel.x - px).abs() < 1e-3, "x: {} vs {}", pixel.x, px);
            assert!((pixel.y - py).abs() < 1e-3, "y: {} vs {}", pixel.y, py);
        }
    }

    #[test]
    fn test_project_behind_camera() {
        let frame = ViewFrame::new(&CameraPose::new(Vec3::ZERO, 0.0, 0.0, 1.0), 10, 10, 1.0);
        assert!(frame.project(Vec3::new(0.0, 0.0, 5.0)).is_none());
    }

    #[test]
    fn test_moved_from() {
        let a = CameraPose::default();
        let mut b = a;
        assert!(!a.moved_from(&b, 1e-4));
        b.yaw += 0.01;
        assert!(a.moved_from(&b, 1e-4));
    }

    #[test]
    fn test_pose_deserializes_partial_json() {
        let pose: CameraPose = serde_json::from_str(r#"{"yaw": 0.5}"#).unwrap();
        assert_eq!(pose.yaw, 0.5);
        assert_eq!(pose.position, CameraPose::default().position);
    }
}
