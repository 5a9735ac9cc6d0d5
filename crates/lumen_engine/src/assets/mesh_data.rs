//! CPU-side mesh data and built-in primitives

use crate::foundation::math::Vec3;
use std::collections::HashMap;

/// Vertex layout shared by the opaque pipeline and the shaders
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    /// Object-space position
    pub position: [f32; 3],
    /// Vertex colour
    pub color: [f32; 3],
    /// Object-space normal
    pub normal: [f32; 3],
    /// Texture coordinate
    pub uv: [f32; 2],
}

unsafe impl bytemuck::Pod for Vertex {}
unsafe impl bytemuck::Zeroable for Vertex {}

impl Vertex {
    fn key(&self) -> [u32; 11] {
        let mut key = [0u32; 11];
        let floats = self.position.iter().chain(&self.color).chain(&self.normal).chain(&self.uv);
        for (dst, value) in key.iter_mut().zip(floats) {
            *dst = value.to_bits();
        }
        key
    }
}

/// Indexed triangle list
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    /// Unique vertices
    pub vertices: Vec<Vertex>,
    /// Triangle indices into `vertices`
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Build from unindexed triangle-list vertices, merging identical vertices
    pub fn from_triangles(triangles: impl IntoIterator<Item = Vertex>) -> Self {
        let mut unique: HashMap<[u32; 11], u32> = HashMap::new();
        let mut mesh = Self::default();
        for vertex in triangles {
            let index = *unique.entry(vertex.key()).or_insert_with(|| {
                mesh.vertices.push(vertex);
                mesh.vertices.len() as u32 - 1
            });
            mesh.indices.push(index);
        }
        mesh
    }

    /// Axis-aligned cube of side 1 centred on the origin, one colour per face
    pub fn cube() -> Self {
        // (normal, u, v, colour) with u x v == normal
        let faces: [([f32; 3], [f32; 3], [f32; 3], [f32; 3]); 6] = [
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0], [0.9, 0.9, 0.9]),
            ([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.8, 0.8, 0.1]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.9, 0.6, 0.1]),
            ([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.8, 0.1, 0.1]),
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.1, 0.1, 0.8]),
            ([0.0, 0.0, -1.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.1, 0.8, 0.1]),
        ];

        let mut triangles = Vec::with_capacity(36);
        for (normal, u, v, color) in faces {
            let (n, u, v) = (Vec3::from(normal), Vec3::from(u), Vec3::from(v));
            let corner = |su: f32, sv: f32, uv: [f32; 2]| Vertex {
                position: ((n + u * su + v * sv) * 0.5).into(),
                color,
                normal,
                uv,
            };
            let quad = [
                corner(-1.0, -1.0, [0.0, 0.0]),
                corner(1.0, -1.0, [1.0, 0.0]),
                corner(1.0, 1.0, [1.0, 1.0]),
                corner(-1.0, 1.0, [0.0, 1.0]),
            ];
            triangles.extend([quad[0], quad[1], quad[2], quad[0], quad[2], quad[3]]);
        }
        Self::from_triangles(triangles)
    }

    /// Unit quad in the XZ plane facing -Y (up in the renderer's Y-down world)
    pub fn quad() -> Self {
        let normal = [0.0, -1.0, 0.0];
        let color = [1.0, 1.0, 1.0];
        let corner = |x: f32, z: f32, uv: [f32; 2]| Vertex {
            position: [x, 0.0, z],
            color,
            normal,
            uv,
        };
        Self {
            vertices: vec![
                corner(-0.5, -0.5, [0.0, 0.0]),
                corner(0.5, -0.5, [1.0, 0.0]),
                corner(0.5, 0.5, [1.0, 1.0]),
                corner(-0.5, 0.5, [0.0, 1.0]),
            ],
            indices: vec![0, 1, 2, 0, 2, 3],
        }
    }

    /// Vertex data as bytes
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Index data as bytes
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}
