//! Indexed triangle meshes.
//!
//! Used as input to [`SceneBuilder::add_mesh`](crate::SceneBuilder::add_mesh)
//! and as the tessellated form of spheres and planes for the rasterizer.

use std::f32::consts::PI;

use glyph_math::Vec3;

use crate::geometry::TexelUv;

/// A mesh consisting of vertex positions, optional normals and texel UVs,
/// and triangle indices.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    /// Vertex positions (one Vec3 per vertex)
    pub positions: Vec<Vec3>,

    /// Vertex normals (optional - will be computed on demand)
    pub normals: Option<Vec<Vec3>>,

    /// Texel-space UVs (optional - one per vertex)
    pub uvs: Option<Vec<TexelUv>>,

    /// Triangle indices (every 3 indices form a triangle, counter-clockwise front)
    pub indices: Vec<u32>,
}

/// One resolved mesh triangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshTriangle {
    pub positions: [Vec3; 3],
    pub normals: [Vec3; 3],
    pub uvs: [TexelUv; 3],
}

impl Mesh {
    /// Create a new mesh from positions and indices.
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            normals: None,
            uvs: None,
            indices,
        }
    }

    /// Attach per-vertex texel UVs.
    pub fn with_uvs(mut self, uvs: Vec<TexelUv>) -> Self {
        self.uvs = Some(uvs);
        self
    }

    /// Latitude/longitude sphere with outward smooth normals.
    pub fn uv_sphere(center: Vec3, radius: f32, stacks: u32, slices: u32) -> Self {
        let stacks = stacks.max(2);
        let slices = slices.max(3);
        let mut positions = Vec::with_capacity(((stacks + 1) * (slices + 1)) as usize);
        let mut normals = Vec::with_capacity(positions.capacity());

        for i in 0..=stacks {
            let theta = PI * i as f32 / stacks as f32;
            let (st, ct) = theta.sin_cos();
            for j in 0..=slices {
                let phi = 2.0 * PI * j as f32 / slices as f32;
                let (sp, cp) = phi.sin_cos();
                let n = Vec3::new(st * cp, ct, -st * sp);
                normals.push(n);
                positions.push(center + n * radius);
            }
        }

        let row = slices + 1;
        let mut indices = Vec::with_capacity((stacks * slices * 6) as usize);
        for i in 0..stacks {
            for j in 0..slices {
                let a = i * row + j;
                let b = a + row;
                // Skip the zero-area triangles at the poles
                if i != 0 {
                    indices.extend_from_slice(&[a, b, a + 1]);
                }
                if i != stacks - 1 {
                    indices.extend_from_slice(&[a + 1, b, b + 1]);
                }
            }
        }

        Self {
            positions,
            normals: Some(normals),
            uvs: None,
            indices,
        }
    }

    /// Compute smooth vertex normals by averaging face normals.
    pub fn compute_normals(&mut self) {
        let vertex_count = self.positions.len();
        let mut normals = vec![Vec3::ZERO; vertex_count];

        for face in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [face[0] as usize, face[1] as usize, face[2] as usize];
            if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
                continue;
            }
            let p0 = self.positions[i0];
            let face_normal = (self.positions[i1] - p0).cross(self.positions[i2] - p0);
            normals[i0] += face_normal;
            normals[i1] += face_normal;
            normals[i2] += face_normal;
        }

        for normal in &mut normals {
            *normal = normal.try_normalize().unwrap_or(Vec3::Y);
        }

        self.normals = Some(normals);
    }

    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Resolve indices into triangles. Triangles with out-of-range indices
    /// are skipped with a warning; missing normals use the face normal.
    pub fn triangles(&self) -> Vec<MeshTriangle> {
        let mut triangles = Vec::with_capacity(self.triangle_count());
        let vertex_count = self.positions.len();

        for chunk in self.indices.chunks_exact(3) {
            let idx = [chunk[0] as usize, chunk[1] as usize, chunk[2] as usize];
            if idx.iter().any(|&i| i >= vertex_count) {
                log::warn!(
                    "Invalid triangle indices: {:?}, vertex count: {}",
                    idx,
                    vertex_count
                );
                continue;
            }

            let positions = idx.map(|i| self.positions[i]);
            let face_normal = (positions[1] - positions[0])
                .cross(positions[2] - positions[0])
                .normalize_or_zero();
            let normals = match &self.normals {
                Some(n) if n.len() == vertex_count => idx.map(|i| n[i]),
                _ => [face_normal; 3],
            };
            let uvs = match &self.uvs {
                Some(uv) if uv.len() == vertex_count => idx.map(|i| uv[i]),
                _ => [[0, 0]; 3],
            };

            triangles.push(MeshTriangle {
                positions,
                normals,
                uvs,
            });
        }

        triangles
    }
}
