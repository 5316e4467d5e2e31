//! Backend-agnostic mesh data

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};

/// Interleaved vertex as consumed by the textured pipeline
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    /// Object-space position
    pub position: [f32; 3],
    /// Vertex color
    pub color: [f32; 3],
    /// Object-space normal
    pub normal: [f32; 3],
    /// Texture coordinate
    pub uv: [f32; 2],
}

impl Vertex {
    /// Key hashing the exact bit pattern of every field
    fn bit_key(self) -> [u32; 11] {
        bytemuck::cast(self)
    }
}

/// Vertices and triangle-list indices
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    /// Unique vertices
    pub vertices: Vec<Vertex>,
    /// Three indices per triangle
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Build indexed mesh data from an unindexed triangle list,
    /// merging bitwise-identical vertices
    #[must_use]
    pub fn from_triangles(triangle_vertices: &[Vertex]) -> Self {
        let mut builder = MeshBuilder::default();
        for vertex in triangle_vertices {
            builder.push(*vertex);
        }
        builder.finish()
    }

    /// Unit cube centered on the origin with per-face normals and UVs
    #[must_use]
    pub fn cube() -> Self {
        // (normal, tangent u, tangent v) per face
        const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ];
        const CORNERS: [(f32, f32); 4] = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

        let mut mesh = Self::default();
        for (normal, u, v) in FACES {
            let base = u32::try_from(mesh.vertices.len()).unwrap_or(u32::MAX);
            for (su, sv) in CORNERS {
                let position = [0, 1, 2].map(|i| 0.5 * (normal[i] + su * u[i] + sv * v[i]));
                mesh.vertices.push(Vertex {
                    position,
                    color: [1.0, 1.0, 1.0],
                    normal,
                    uv: [0.5 * (su + 1.0), 0.5 * (1.0 - sv)],
                });
            }
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        mesh
    }

    /// Number of triangles
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Incremental deduplicating mesh builder
#[derive(Default)]
pub(crate) struct MeshBuilder {
    mesh: MeshData,
    unique: HashMap<[u32; 11], u32>,
}

impl MeshBuilder {
    pub(crate) fn push(&mut self, vertex: Vertex) {
        let next = u32::try_from(self.mesh.vertices.len()).unwrap_or(u32::MAX);
        let index = *self.unique.entry(vertex.bit_key()).or_insert_with(|| {
            self.mesh.vertices.push(vertex);
            next
        });
        self.mesh.indices.push(index);
    }

    pub(crate) fn finish(self) -> MeshData {
        self.mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(x: f32) -> Vertex {
        Vertex {
            position: [x, 0.0, 0.0],
            ..Vertex::default()
        }
    }

    #[test]
    fn test_vertex_layout_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 44);
    }

    #[test]
    fn test_duplicate_vertices_are_merged() {
        let mesh = MeshData::from_triangles(&[vertex(0.0), vertex(1.0), vertex(2.0), vertex(2.0), vertex(1.0), vertex(3.0)]);
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 2, 1, 3]);
        assert_eq!(mesh.triangle_count(), 2);
    }

    #[test]
    fn test_negative_zero_is_distinct_bitwise() {
        let mesh = MeshData::from_triangles(&[vertex(0.0), vertex(-0.0), vertex(0.0)]);
        assert_eq!(mesh.vertices.len(), 2);
    }

    #[test]
    fn test_cube_faces_wind_outward() {
        let cube = MeshData::cube();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.triangle_count(), 12);

        for triangle in cube.indices.chunks(3) {
            let [a, b, c] = [0, 1, 2].map(|i| cube.vertices[triangle[i] as usize]);
            let e1 = [0, 1, 2].map(|i| b.position[i] - a.position[i]);
            let e2 = [0, 1, 2].map(|i| c.position[i] - a.position[i]);
            let cross = [
                e1[1] * e2[2] - e1[2] * e2[1],
                e1[2] * e2[0] - e1[0] * e2[2],
                e1[0] * e2[1] - e1[1] * e2[0],
            ];
            let dot: f32 = (0..3).map(|i| cross[i] * a.normal[i]).sum();
            assert!(dot > 0.0, "triangle {triangle:?} winds inward");
        }
    }
}
