//! Geometry primitives.
//!
//! Primitives are generic over the material handle: the unified scene uses
//! table indices (`usize`), the path-tracer shape carries a
//! [`LegacyMaterial`](crate::LegacyMaterial) code instead.

use glyph_math::Vec3;
use serde::{Deserialize, Serialize};

/// Texel-space UV coordinate into the shared atlas.
pub type TexelUv = [u16; 2];

/// A sphere primitive.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, bound(deserialize = "M: Deserialize<'de> + Default"))]
pub struct Sphere<M = usize> {
    pub center: Vec3,
    pub radius: f32,
    pub material: M,
}

impl<M: Default> Default for Sphere<M> {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            radius: 1.0,
            material: M::default(),
        }
    }
}

impl<M> Sphere<M> {
    pub fn new(center: Vec3, radius: f32, material: M) -> Self {
        Self {
            center,
            radius,
            material,
        }
    }

    pub fn with_material<N>(self, material: N) -> Sphere<N> {
        Sphere::new(self.center, self.radius, material)
    }
}

/// A triangle with per-vertex texel UVs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, bound(deserialize = "M: Deserialize<'de> + Default"))]
pub struct Triangle<M = usize> {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
    pub material: M,
    pub uv: [TexelUv; 3],
}

impl<M: Default> Default for Triangle<M> {
    fn default() -> Self {
        Self {
            a: Vec3::ZERO,
            b: Vec3::X,
            c: Vec3::Y,
            material: M::default(),
            uv: [[0, 0]; 3],
        }
    }
}

impl<M> Triangle<M> {
    pub fn new(a: Vec3, b: Vec3, c: Vec3, material: M) -> Self {
        Self {
            a,
            b,
            c,
            material,
            uv: [[0, 0]; 3],
        }
    }

    pub fn with_uv(mut self, uv: [TexelUv; 3]) -> Self {
        self.uv = uv;
        self
    }

    pub fn with_material<N>(self, material: N) -> Triangle<N> {
        Triangle {
            a: self.a,
            b: self.b,
            c: self.c,
            material,
            uv: self.uv,
        }
    }

    /// Geometric normal from the winding `a → b → c` (counter-clockwise = front).
    pub fn normal(&self) -> Vec3 {
        (self.b - self.a).cross(self.c - self.a).normalize_or_zero()
    }

    /// All-zero UVs mean "not textured".
    pub fn has_uv(&self) -> bool {
        self.uv.iter().any(|uv| uv[0] != 0 || uv[1] != 0)
    }

    /// Nearest texel for barycentric weights `(a, b, c)`, or `None` when untextured.
    pub fn texel_coord(&self, weights: Vec3) -> Option<[i64; 2]> {
        if !self.has_uv() {
            return None;
        }
        let w = weights.to_array();
        let mut uv = [0.0f32; 2];
        for (vertex, weight) in self.uv.iter().zip(w) {
            uv[0] += vertex[0] as f32 * weight;
            uv[1] += vertex[1] as f32 * weight;
        }
        Some([uv[0].round() as i64, uv[1].round() as i64])
    }
}

/// Which diagonal splits a quad into two triangles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuadDiagonal {
    /// Triangles (a, b, c) and (a, c, d)
    #[default]
    Ac,
    /// Triangles (a, b, d) and (b, c, d)
    Bd,
}

/// A planar quad `a → b → c → d`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, bound(deserialize = "M: Deserialize<'de> + Default"))]
pub struct Quad<M = usize> {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
    pub d: Vec3,
    pub material: M,
    pub uv: [TexelUv; 4],
    pub diagonal: QuadDiagonal,
}

impl<M: Default> Default for Quad<M> {
    fn default() -> Self {
        Self {
            a: Vec3::ZERO,
            b: Vec3::X,
            c: Vec3::new(1.0, 1.0, 0.0),
            d: Vec3::Y,
            material: M::default(),
            uv: [[0, 0]; 4],
            diagonal: QuadDiagonal::Ac,
        }
    }
}

impl<M: Copy> Quad<M> {
    pub fn new(a: Vec3, b: Vec3, c: Vec3, d: Vec3, material: M) -> Self {
        Self {
            a,
            b,
            c,
            d,
            material,
            uv: [[0, 0]; 4],
            diagonal: QuadDiagonal::Ac,
        }
    }

    pub fn with_uv(mut self, uv: [TexelUv; 4]) -> Self {
        self.uv = uv;
        self
    }

    pub fn with_diagonal(mut self, diagonal: QuadDiagonal) -> Self {
        self.diagonal = diagonal;
        self
    }

    pub fn with_material<N: Copy>(self, material: N) -> Quad<N> {
        Quad {
            a: self.a,
            b: self.b,
            c: self.c,
            d: self.d,
            material,
            uv: self.uv,
            diagonal: self.diagonal,
        }
    }

    /// The two triangles sharing the selected diagonal, UVs carried along.
    pub fn triangles(&self) -> [Triangle<M>; 2] {
        let p = [self.a, self.b, self.c, self.d];
        let [i, j] = match self.diagonal {
            QuadDiagonal::Ac => [[0, 1, 2], [0, 2, 3]],
            QuadDiagonal::Bd => [[0, 1, 3], [1, 2, 3]],
        };
        let tri = |idx: [usize; 3]| {
            Triangle::new(p[idx[0]], p[idx[1]], p[idx[2]], self.material)
                .with_uv([self.uv[idx[0]], self.uv[idx[1]], self.uv[idx[2]]])
        };
        [tri(i), tri(j)]
    }
}

/// Infinite plane `normal · p = d`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, bound(deserialize = "M: Deserialize<'de> + Default"))]
pub struct Plane<M = usize> {
    pub normal: Vec3,
    pub d: f32,
    pub material: M,
}

impl<M: Default> Default for Plane<M> {
    fn default() -> Self {
        Self {
            normal: Vec3::Y,
            d: 0.0,
            material: M::default(),
        }
    }
}

impl<M> Plane<M> {
    pub fn new(normal: Vec3, d: f32, material: M) -> Self {
        Self {
            normal: normal.normalize_or_zero(),
            d,
            material,
        }
    }

    /// Point of the plane closest to the origin.
    pub fn anchor(&self) -> Vec3 {
        self.normal * self.d
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_diagonals() {
        let q = Quad::new(Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y, 0usize)
            .with_uv([[0, 0], [10, 0], [10, 10], [0, 10]]);

        let [t0, t1] = q.triangles();
        assert_eq!((t0.a, t0.b, t0.c), (q.a, q.b, q.c));
        assert_eq!((t1.a, t1.b, t1.c), (q.a, q.c, q.d));
        assert_eq!(t1.uv, [[0, 0], [10, 10], [0, 10]]);

        let [s0, s1] = q.with_diagonal(QuadDiagonal::Bd).triangles();
        assert_eq!((s0.a, s0.b, s0.c), (q.a, q.b, q.d));
        assert_eq!((s1.a, s1.b, s1.c), (q.b, q.c, q.d));
        assert_eq!(s1.uv, [[10, 0], [10, 10], [0, 10]]);
    }

    #[test]
    fn test_texel_coord_rounds_to_nearest() {
        let t = Triangle::new(Vec3::ZERO, Vec3::X, Vec3::Y, 0usize).with_uv([[0, 0], [4, 0], [0, 4]]);
        assert_eq!(t.texel_coord(Vec3::new(1.0, 0.0, 0.0)), Some([0, 0]));
        assert_eq!(t.texel_coord(Vec3::new(0.0, 1.0, 0.0)), Some([4, 0]));
        // 0.4 * 4 = 1.6 -> 2
        assert_eq!(t.texel_coord(Vec3::new(0.2, 0.4, 0.4)), Some([2, 2]));
    }

    #[test]
    fn test_untextured_triangle() {
        let t = Triangle::new(Vec3::ZERO, Vec3::X, Vec3::Y, 0usize);
        assert!(!t.has_uv());
        assert_eq!(t.texel_coord(Vec3::splat(1.0 / 3.0)), None);
    }

    #[test]
    fn test_triangle_normal_ccw() {
        let t = Triangle::new(Vec3::ZERO, Vec3::X, Vec3::Y, ());
        assert!((t.normal() - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn test_plane_anchor() {
        let p = Plane::new(Vec3::new(0.0, 2.0, 0.0), -1.0, 0usize);
        assert_eq!(p.normal, Vec3::Y);
        assert_eq!(p.anchor(), Vec3::new(0.0, -1.0, 0.0));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let s: Sphere = serde_json::from_str(r#"{"radius": 2.5}"#).unwrap();
        assert_eq!(s.radius, 2.5);
        assert_eq!(s.center, Vec3::ZERO);
        assert_eq!(s.material, 0);

        let q: Quad = serde_json::from_str(r#"{"diagonal": "bd"}"#).unwrap();
        assert_eq!(q.diagonal, QuadDiagonal::Bd);
    }
}
