//! Graphics device abstraction
//!
//! Every GPU call the render core makes goes through [`GraphicsDevice`]. The
//! trait mirrors a classic bind-and-draw API: programs, uniform locations,
//! vertex arrays, buffers with sub-range updates, 2D and cubemap textures,
//! and indexed/instanced draws. Calls are synchronous and issued in program
//! order; nothing here waits on GPU completion.

mod recording;

pub use recording::{DeviceCommand, RecordingDevice, UploadCounts};

use crate::assets::ImageData;
use crate::foundation::math::{Mat4, Vec2, Vec3, Vec4};
use crate::render::primitives::VertexLayout;
use thiserror::Error;

/// Handle to a linked shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramHandle(pub u32);

/// Handle to a vertex array object (vertex + index buffers with layout)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexArrayHandle(pub u32);

/// Handle to a raw GPU buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub u32);

/// Handle to a texture object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u32);

/// Resolved location of a uniform inside a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub i32);

/// Value pushed to a uniform
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    /// Boolean flag
    Bool(bool),
    /// Integer (also sampler units)
    Int(i32),
    /// Scalar
    Float(f32),
    /// 2-component vector
    Vec2(Vec2),
    /// 3-component vector
    Vec3(Vec3),
    /// 4-component vector
    Vec4(Vec4),
    /// 4x4 matrix
    Mat4(Mat4),
}

/// Expected update frequency of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Written once
    Static,
    /// Rewritten often (particles, glyphs)
    Dynamic,
}

/// Texture binding target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureTarget {
    /// Ordinary 2D texture
    Texture2D,
    /// Six-face cubemap
    CubeMap,
}

/// Depth comparison function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthFunc {
    /// Strict comparison, the default for opaque geometry
    Less,
    /// Relaxed comparison used by the skybox
    LessEqual,
}

/// Errors surfaced by a graphics device
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Shader stage failed to compile
    #[error("{stage} shader failed to compile: {log}")]
    CompileFailed {
        /// "vertex" or "fragment"
        stage: &'static str,
        /// Driver info log
        log: String,
    },

    /// Program failed to link
    #[error("program failed to link: {0}")]
    LinkFailed(String),

    /// A handle did not refer to a live object
    #[error("invalid handle: {0}")]
    InvalidHandle(String),

    /// Data could not be uploaded
    #[error("upload failed: {0}")]
    UploadFailed(String),
}

/// Result type for device operations
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Graphics device trait
///
/// Object safe so the manager can hold a `Box<dyn GraphicsDevice>`.
pub trait GraphicsDevice {
    /// Compile and link a program from vertex and fragment source
    fn create_program(&mut self, vertex_src: &str, fragment_src: &str) -> DeviceResult<ProgramHandle>;

    /// Make a program current
    fn use_program(&mut self, program: ProgramHandle);

    /// Destroy a program
    fn delete_program(&mut self, program: ProgramHandle);

    /// Query the location of a uniform; `None` when the uniform is inactive
    fn uniform_location(&mut self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;

    /// Set a uniform on the current program
    fn set_uniform(&mut self, location: UniformLocation, value: &UniformValue);

    /// Upload vertex and index data with the given layout
    ///
    /// Attribute locations are resolved against `program`, which is why a
    /// mesh is uploaded once per program that draws it.
    fn create_vertex_array(
        &mut self,
        program: ProgramHandle,
        layout: &VertexLayout,
        vertex_bytes: &[u8],
        indices: &[u32],
    ) -> DeviceResult<VertexArrayHandle>;

    /// Destroy a vertex array and its buffers
    fn delete_vertex_array(&mut self, vao: VertexArrayHandle);

    /// Create a raw buffer initialised with `bytes`
    fn create_buffer(&mut self, bytes: &[u8], usage: BufferUsage) -> DeviceResult<BufferHandle>;

    /// Overwrite a sub-range of a buffer
    fn update_buffer(&mut self, buffer: BufferHandle, byte_offset: usize, bytes: &[u8]) -> DeviceResult<()>;

    /// Destroy a buffer
    fn delete_buffer(&mut self, buffer: BufferHandle);

    /// Bind `buffer` as the per-instance `vec4` offset attribute of `program`
    fn bind_instance_offsets(&mut self, program: ProgramHandle, buffer: BufferHandle);

    /// Upload an RGBA8 2D texture
    fn create_texture_2d(&mut self, image: &ImageData) -> DeviceResult<TextureHandle>;

    /// Upload six RGBA8 faces (+X, -X, +Y, -Y, +Z, -Z) as a cubemap
    fn create_cubemap(&mut self, faces: &[ImageData; 6]) -> DeviceResult<TextureHandle>;

    /// Bind a texture to a texture unit
    fn bind_texture(&mut self, unit: u32, target: TextureTarget, texture: TextureHandle);

    /// Destroy a texture
    fn delete_texture(&mut self, texture: TextureHandle);

    /// Set the depth comparison function
    fn set_depth_func(&mut self, func: DepthFunc);

    /// Indexed triangle draw
    fn draw_indexed(&mut self, vao: VertexArrayHandle, index_count: u32);

    /// Instanced indexed triangle draw
    fn draw_indexed_instanced(&mut self, vao: VertexArrayHandle, index_count: u32, instance_count: u32);

    /// Non-indexed triangle draw
    fn draw_arrays(&mut self, vao: VertexArrayHandle, vertex_count: u32);

    /// Downcast to the concrete backend
    fn as_any(&self) -> &dyn std::any::Any;

    /// Mutable downcast to the concrete backend
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}
