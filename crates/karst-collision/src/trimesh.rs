use karst_geom::Vec3;

use crate::buffer::GeometryBuffer;

/// Upstream sections wind their triangles clockwise, while cooking backends
/// expect counter-clockwise, so the flip is unconditional.
pub const FLIP_NORMALS: bool = true;

/// A merged complex-collision mesh: one vertex array, triangle triples
/// referencing it, and one material tag per triangle naming the section the
/// triangle came from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TriMeshData {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
    pub material_indices: Vec<u16>,
}

impl TriMeshData {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}

/// Merges the sections into a single mesh. Vertices are appended verbatim in
/// section order; indices are rebased by the running vertex count so they
/// address the merged array; every triangle is tagged with its section's
/// position in `buffers`.
pub fn assemble_tri_mesh(buffers: &[GeometryBuffer]) -> TriMeshData {
    let mut num_vertices = 0usize;
    let mut num_triangles = 0usize;
    for buffer in buffers {
        num_vertices += buffer.vertex_count();
        num_triangles += buffer.triangle_count();
    }

    // Reserve once so the copy loop never reallocates.
    let mut out = TriMeshData::default();
    out.vertices.reserve(num_vertices);
    out.triangles.reserve(num_triangles);
    out.material_indices.reserve(num_triangles);

    let mut vertex_offset = 0u32;
    for (section, buffer) in buffers.iter().enumerate() {
        out.vertices.extend_from_slice(&buffer.positions);

        let triangles = buffer.triangle_count();
        for t in 0..triangles {
            out.triangles.push([
                buffer.indices.get(3 * t) + vertex_offset,
                buffer.indices.get(3 * t + 1) + vertex_offset,
                buffer.indices.get(3 * t + 2) + vertex_offset,
            ]);
            out.material_indices.push(section as u16);
        }

        vertex_offset = out.vertices.len() as u32;
    }

    out
}
