//! Headless graphics device
//!
//! [`RecordingDevice`] implements [`GraphicsDevice`] without a GPU. It hands
//! out handles, keeps buffer contents in memory, and appends every call to a
//! command log. Tools use it to dry-run frames; tests use it to assert on the
//! exact draw order and upload counts.

use super::{
    BufferHandle, BufferUsage, DepthFunc, DeviceError, DeviceResult, GraphicsDevice, ProgramHandle,
    TextureHandle, TextureTarget, UniformLocation, UniformValue, VertexArrayHandle,
};
use crate::assets::ImageData;
use crate::render::primitives::VertexLayout;
use std::collections::HashMap;

/// One recorded device call
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    /// A program was made current
    UseProgram(ProgramHandle),
    /// A uniform was set on the current program
    SetUniform {
        /// Program current at the time of the call
        program: Option<ProgramHandle>,
        /// Uniform name, resolved back from its location
        name: String,
        /// Pushed value
        value: UniformValue,
    },
    /// A buffer sub-range was rewritten
    UpdateBuffer {
        /// Target buffer
        buffer: BufferHandle,
        /// Byte offset of the write
        byte_offset: usize,
        /// Bytes written
        len: usize,
    },
    /// Instance offsets were bound
    BindInstanceOffsets(BufferHandle),
    /// A texture was bound
    BindTexture {
        /// Texture unit
        unit: u32,
        /// Binding target
        target: TextureTarget,
        /// Bound texture
        texture: TextureHandle,
    },
    /// Depth function changed
    DepthFunc(DepthFunc),
    /// Indexed draw
    DrawIndexed {
        /// Vertex array drawn
        vao: VertexArrayHandle,
        /// Index count
        index_count: u32,
    },
    /// Instanced indexed draw
    DrawIndexedInstanced {
        /// Vertex array drawn
        vao: VertexArrayHandle,
        /// Index count
        index_count: u32,
        /// Instance count
        instance_count: u32,
    },
    /// Non-indexed draw
    DrawArrays {
        /// Vertex array drawn
        vao: VertexArrayHandle,
        /// Vertex count
        vertex_count: u32,
    },
}

impl DeviceCommand {
    /// Whether this command is a draw call
    pub fn is_draw(&self) -> bool {
        matches!(
            self,
            Self::DrawIndexed { .. } | Self::DrawIndexedInstanced { .. } | Self::DrawArrays { .. }
        )
    }
}

/// Number of GPU objects created, per kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadCounts {
    /// Programs linked
    pub programs: usize,
    /// Vertex arrays created
    pub vertex_arrays: usize,
    /// Raw buffers created
    pub buffers: usize,
    /// 2D textures uploaded
    pub textures: usize,
    /// Cubemaps uploaded
    pub cubemaps: usize,
}

/// In-memory [`GraphicsDevice`]
#[derive(Debug, Default)]
pub struct RecordingDevice {
    next_id: u32,
    commands: Vec<DeviceCommand>,
    uploads: UploadCounts,
    location_queries: usize,
    current_program: Option<ProgramHandle>,
    programs: HashMap<ProgramHandle, Vec<String>>,
    locations: HashMap<UniformLocation, (ProgramHandle, String)>,
    buffers: HashMap<BufferHandle, Vec<u8>>,
    vertex_arrays: HashMap<VertexArrayHandle, usize>,
    textures: HashMap<TextureHandle, TextureTarget>,
    reject_marker: Option<String>,
    inactive_uniforms: Vec<String>,
    refuse_buffers: bool,
}

impl RecordingDevice {
    /// Create an empty device
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail compilation of any source containing `marker`
    pub fn reject_sources_containing(mut self, marker: impl Into<String>) -> Self {
        self.reject_marker = Some(marker.into());
        self
    }

    /// Report `name` as inactive: location queries for it return `None`
    pub fn with_inactive_uniform(mut self, name: impl Into<String>) -> Self {
        self.inactive_uniforms.push(name.into());
        self
    }

    /// Stop failing compilations
    pub fn accept_all_sources(&mut self) {
        self.reject_marker = None;
    }

    /// Fail every buffer creation while `refuse` is set
    pub fn refuse_buffers(&mut self, refuse: bool) {
        self.refuse_buffers = refuse;
    }

    /// Recorded commands since the last [`clear_commands`](Self::clear_commands)
    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    /// Forget recorded commands (objects and counters are kept)
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Recorded draw calls only
    pub fn draw_calls(&self) -> impl Iterator<Item = &DeviceCommand> {
        self.commands.iter().filter(|c| c.is_draw())
    }

    /// Values pushed to a named uniform, in order
    pub fn uniform_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a UniformValue> + 'a {
        self.commands.iter().filter_map(move |c| match c {
            DeviceCommand::SetUniform { name: n, value, .. } if n == name => Some(value),
            _ => None,
        })
    }

    /// Objects created so far
    pub fn uploads(&self) -> UploadCounts {
        self.uploads
    }

    /// Number of driver uniform-location queries
    pub fn location_queries(&self) -> usize {
        self.location_queries
    }

    /// Current contents of a buffer
    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(Vec::as_slice)
    }

    /// Number of live GPU objects of every kind
    pub fn live_objects(&self) -> usize {
        self.programs.len() + self.buffers.len() + self.vertex_arrays.len() + self.textures.len()
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn check_source(&self, stage: &'static str, source: &str) -> DeviceResult<()> {
        match &self.reject_marker {
            Some(marker) if source.contains(marker.as_str()) => Err(DeviceError::CompileFailed {
                stage,
                log: format!("rejected source containing '{marker}'"),
            }),
            _ => Ok(()),
        }
    }
}

impl GraphicsDevice for RecordingDevice {
    fn create_program(&mut self, vertex_src: &str, fragment_src: &str) -> DeviceResult<ProgramHandle> {
        self.check_source("vertex", vertex_src)?;
        self.check_source("fragment", fragment_src)?;

        let handle = ProgramHandle(self.next());
        self.programs.insert(handle, Vec::new());
        self.uploads.programs += 1;
        Ok(handle)
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.current_program = Some(program);
        self.commands.push(DeviceCommand::UseProgram(program));
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        self.programs.remove(&program);
        self.locations.retain(|_, (owner, _)| *owner != program);
        if self.current_program == Some(program) {
            self.current_program = None;
        }
    }

    fn uniform_location(&mut self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        self.location_queries += 1;
        if self.inactive_uniforms.iter().any(|n| n == name) {
            return None;
        }
        let uniforms = self.programs.get_mut(&program)?;

        let index = match uniforms.iter().position(|n| n == name) {
            Some(index) => index,
            None => {
                uniforms.push(name.to_string());
                uniforms.len() - 1
            }
        };

        // Unique across programs so the command log can name them.
        let location = UniformLocation(i32::try_from(program.0 * 1000 + index as u32).ok()?);
        self.locations.insert(location, (program, name.to_string()));
        Some(location)
    }

    fn set_uniform(&mut self, location: UniformLocation, value: &UniformValue) {
        let name = self
            .locations
            .get(&location)
            .map_or_else(|| format!("<location {}>", location.0), |(_, n)| n.clone());
        self.commands.push(DeviceCommand::SetUniform {
            program: self.current_program,
            name,
            value: value.clone(),
        });
    }

    fn create_vertex_array(
        &mut self,
        program: ProgramHandle,
        layout: &VertexLayout,
        vertex_bytes: &[u8],
        indices: &[u32],
    ) -> DeviceResult<VertexArrayHandle> {
        if !self.programs.contains_key(&program) {
            return Err(DeviceError::InvalidHandle(format!("program {}", program.0)));
        }
        if layout.stride == 0 || vertex_bytes.len() % layout.stride != 0 {
            return Err(DeviceError::UploadFailed(format!(
                "{} vertex bytes do not match stride {}",
                vertex_bytes.len(),
                layout.stride
            )));
        }

        let handle = VertexArrayHandle(self.next());
        self.vertex_arrays.insert(handle, indices.len());
        self.uploads.vertex_arrays += 1;
        Ok(handle)
    }

    fn delete_vertex_array(&mut self, vao: VertexArrayHandle) {
        self.vertex_arrays.remove(&vao);
    }

    fn create_buffer(&mut self, bytes: &[u8], _usage: BufferUsage) -> DeviceResult<BufferHandle> {
        if self.refuse_buffers {
            return Err(DeviceError::UploadFailed(format!("buffer of {} bytes refused", bytes.len())));
        }
        let handle = BufferHandle(self.next());
        self.buffers.insert(handle, bytes.to_vec());
        self.uploads.buffers += 1;
        Ok(handle)
    }

    fn update_buffer(&mut self, buffer: BufferHandle, byte_offset: usize, bytes: &[u8]) -> DeviceResult<()> {
        let storage = self
            .buffers
            .get_mut(&buffer)
            .ok_or_else(|| DeviceError::InvalidHandle(format!("buffer {}", buffer.0)))?;

        let end = byte_offset + bytes.len();
        if end > storage.len() {
            return Err(DeviceError::UploadFailed(format!(
                "write of {} bytes at {} overflows buffer of {} bytes",
                bytes.len(),
                byte_offset,
                storage.len()
            )));
        }

        storage[byte_offset..end].copy_from_slice(bytes);
        self.commands.push(DeviceCommand::UpdateBuffer {
            buffer,
            byte_offset,
            len: bytes.len(),
        });
        Ok(())
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        self.buffers.remove(&buffer);
    }

    fn bind_instance_offsets(&mut self, _program: ProgramHandle, buffer: BufferHandle) {
        self.commands.push(DeviceCommand::BindInstanceOffsets(buffer));
    }

    fn create_texture_2d(&mut self, image: &ImageData) -> DeviceResult<TextureHandle> {
        if image.data.len() != image.expected_len() {
            return Err(DeviceError::UploadFailed(format!(
                "{}x{} image carries {} bytes",
                image.width,
                image.height,
                image.data.len()
            )));
        }

        let handle = TextureHandle(self.next());
        self.textures.insert(handle, TextureTarget::Texture2D);
        self.uploads.textures += 1;
        Ok(handle)
    }

    fn create_cubemap(&mut self, faces: &[ImageData; 6]) -> DeviceResult<TextureHandle> {
        if let Some(face) = faces.iter().find(|f| f.data.len() != f.expected_len()) {
            return Err(DeviceError::UploadFailed(format!(
                "cubemap face {}x{} carries {} bytes",
                face.width,
                face.height,
                face.data.len()
            )));
        }

        let handle = TextureHandle(self.next());
        self.textures.insert(handle, TextureTarget::CubeMap);
        self.uploads.cubemaps += 1;
        Ok(handle)
    }

    fn bind_texture(&mut self, unit: u32, target: TextureTarget, texture: TextureHandle) {
        self.commands.push(DeviceCommand::BindTexture { unit, target, texture });
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        self.textures.remove(&texture);
    }

    fn set_depth_func(&mut self, func: DepthFunc) {
        self.commands.push(DeviceCommand::DepthFunc(func));
    }

    fn draw_indexed(&mut self, vao: VertexArrayHandle, index_count: u32) {
        self.commands.push(DeviceCommand::DrawIndexed { vao, index_count });
    }

    fn draw_indexed_instanced(&mut self, vao: VertexArrayHandle, index_count: u32, instance_count: u32) {
        self.commands.push(DeviceCommand::DrawIndexedInstanced {
            vao,
            index_count,
            instance_count,
        });
    }

    fn draw_arrays(&mut self, vao: VertexArrayHandle, vertex_count: u32) {
        self.commands.push(DeviceCommand::DrawArrays { vao, vertex_count });
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
