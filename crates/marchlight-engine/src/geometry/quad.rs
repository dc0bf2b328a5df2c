use bytemuck::{Pod, Zeroable};

use crate::gfx::{AttributeFormat, GeometryHandle, RenderBackend, VertexAttribute, VertexLayout};

/// Quad corner in normalized device coordinates.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub pos: [f32; 2],
}

/// CPU-side data for a quad covering the whole viewport.
///
/// Four corners at (±1, ±1) and two counter-clockwise triangles
/// `(0, 1, 2)` and `(2, 3, 0)`.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadMesh {
    pub vertices: [QuadVertex; 4],
    pub indices: [u16; 6],
}

impl QuadMesh {
    const ATTRS: [VertexAttribute; 1] = [VertexAttribute {
        location: 0,
        format: AttributeFormat::Float32x2,
        offset: 0,
    }];

    /// One `vec2<f32>` at location 0, tightly packed.
    pub const LAYOUT: VertexLayout = VertexLayout {
        array_stride: std::mem::size_of::<QuadVertex>() as u64,
        attributes: &Self::ATTRS,
    };

    pub const fn screen() -> Self {
        Self {
            vertices: [
                QuadVertex { pos: [-1.0, -1.0] },
                QuadVertex { pos: [1.0, -1.0] },
                QuadVertex { pos: [1.0, 1.0] },
                QuadVertex { pos: [-1.0, 1.0] },
            ],
            indices: [0, 1, 2, 2, 3, 0],
        }
    }

    pub fn triangles(&self) -> impl Iterator<Item = [u16; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Number of distinct vertices referenced by the index buffer.
    pub fn unique_vertex_count(&self) -> usize {
        let mut seen = [false; 4];
        for &i in &self.indices {
            seen[i as usize] = true;
        }
        seen.iter().filter(|s| **s).count()
    }

    /// Twice the signed area of triangle `t`; positive means counter-clockwise.
    pub fn signed_area(&self, t: [u16; 3]) -> f32 {
        let [a, b, c] = t.map(|i| self.vertices[i as usize].pos);
        (b[0] - a[0]) * (c[1] - a[1]) - (c[0] - a[0]) * (b[1] - a[1])
    }
}

impl Default for QuadMesh {
    fn default() -> Self {
        Self::screen()
    }
}

/// Uploaded quad: vertex buffer, index buffer and layout behind one handle.
///
/// Immutable after upload. The draw binds it explicitly every frame; no
/// binding is left active once `upload` returns.
#[derive(Debug)]
pub struct ScreenQuad {
    handle: GeometryHandle,
    index_count: u32,
}

impl ScreenQuad {
    pub fn upload<B>(backend: &mut B, mesh: &QuadMesh) -> Self
    where
        B: RenderBackend + ?Sized,
    {
        let handle = backend.create_geometry(
            bytemuck::cast_slice(&mesh.vertices),
            &mesh.indices,
            &QuadMesh::LAYOUT,
        );
        log::debug!("screen quad uploaded ({} indices)", mesh.index_count());
        Self {
            handle,
            index_count: mesh.index_count(),
        }
    }

    pub fn handle(&self) -> GeometryHandle {
        self.handle
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn release<B>(self, backend: &mut B)
    where
        B: RenderBackend + ?Sized,
    {
        backend.release_geometry(self.handle);
    }
}
