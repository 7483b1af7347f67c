//! Vertex format and built-in geometry

use bytemuck::{Pod, Zeroable};

/// Vertex with position, normal, texture coordinate and colour
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Object-space position
    pub position: [f32; 3],
    /// Object-space normal
    pub normal: [f32; 3],
    /// Texture coordinate
    pub uv: [f32; 2],
    /// Per-vertex RGBA colour
    pub color: [f32; 4],
}

impl Vertex {
    /// White vertex with no normal
    pub fn new(position: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal: [0.0, 0.0, 1.0],
            uv,
            color: [1.0; 4],
        }
    }
}

/// A named vertex attribute inside an interleaved vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Attribute name in the shader
    pub name: &'static str,
    /// Number of float components
    pub components: u32,
    /// Byte offset inside the vertex
    pub offset: usize,
}

/// Interleaved vertex layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    /// Bytes per vertex
    pub stride: usize,
    /// Attributes in declaration order
    pub attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    /// Layout of [`Vertex`]
    pub fn standard() -> Self {
        Self {
            stride: std::mem::size_of::<Vertex>(),
            attributes: vec![
                VertexAttribute { name: "vPosition", components: 3, offset: 0 },
                VertexAttribute { name: "vNormal", components: 3, offset: 12 },
                VertexAttribute { name: "vUV", components: 2, offset: 24 },
                VertexAttribute { name: "vColor", components: 4, offset: 32 },
            ],
        }
    }

    /// Position-only layout used by the skybox cube
    pub fn position_only() -> Self {
        Self {
            stride: 3 * std::mem::size_of::<f32>(),
            attributes: vec![VertexAttribute { name: "vPosition", components: 3, offset: 0 }],
        }
    }
}

/// Unit quad spanning `[0, 1]` on X and Y, used for widgets and glyphs
pub fn unit_quad() -> ([Vertex; 4], [u32; 6]) {
    (
        [
            Vertex::new([0.0, 0.0, 0.0], [0.0, 1.0]),
            Vertex::new([1.0, 0.0, 0.0], [1.0, 1.0]),
            Vertex::new([1.0, 1.0, 0.0], [1.0, 0.0]),
            Vertex::new([0.0, 1.0, 0.0], [0.0, 0.0]),
        ],
        [0, 1, 2, 0, 2, 3],
    )
}

/// Number of vertices in [`SKYBOX_VERTICES`]
pub const SKYBOX_VERTEX_COUNT: u32 = 36;

/// Inward-facing unit cube, 12 triangles, positions only
#[rustfmt::skip]
pub const SKYBOX_VERTICES: [f32; 108] = [
    -1.0,  1.0, -1.0,  -1.0, -1.0, -1.0,   1.0, -1.0, -1.0,
     1.0, -1.0, -1.0,   1.0,  1.0, -1.0,  -1.0,  1.0, -1.0,

    -1.0, -1.0,  1.0,  -1.0, -1.0, -1.0,  -1.0,  1.0, -1.0,
    -1.0,  1.0, -1.0,  -1.0,  1.0,  1.0,  -1.0, -1.0,  1.0,

     1.0, -1.0, -1.0,   1.0, -1.0,  1.0,   1.0,  1.0,  1.0,
     1.0,  1.0,  1.0,   1.0,  1.0, -1.0,   1.0, -1.0, -1.0,

    -1.0, -1.0,  1.0,  -1.0,  1.0,  1.0,   1.0,  1.0,  1.0,
     1.0,  1.0,  1.0,   1.0, -1.0,  1.0,  -1.0, -1.0,  1.0,

    -1.0,  1.0, -1.0,   1.0,  1.0, -1.0,   1.0,  1.0,  1.0,
     1.0,  1.0,  1.0,  -1.0,  1.0,  1.0,  -1.0,  1.0, -1.0,

    -1.0, -1.0, -1.0,  -1.0, -1.0,  1.0,   1.0, -1.0, -1.0,
     1.0, -1.0, -1.0,  -1.0, -1.0,  1.0,   1.0, -1.0,  1.0,
];
