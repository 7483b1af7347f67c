use crate::render::device::VertexArrayHandle;

/// One uploaded part of a mesh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubMesh {
    /// Vertex array holding this part
    pub vao: VertexArrayHandle,
    /// Number of indices to draw
    pub index_count: u32,
    /// Texture drawn when the instance does not override it
    pub texture: Option<String>,
}

/// Uploaded mesh, immutable once loaded
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MeshDrawDescriptor {
    /// Parts in file order
    pub sub_meshes: Vec<SubMesh>,
}

impl MeshDrawDescriptor {
    /// Total index count over all parts
    pub fn index_count(&self) -> u32 {
        self.sub_meshes.iter().map(|sub| sub.index_count).sum()
    }
}
