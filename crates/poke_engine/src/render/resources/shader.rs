use crate::render::device::{ProgramHandle, UniformLocation};
use crate::render::resources::MeshDrawDescriptor;
use std::collections::HashMap;

/// A linked program plus everything cached against it
#[derive(Debug, Clone)]
pub struct ShaderProgram {
    /// Device handle
    pub handle: ProgramHandle,
    /// Resolved uniform locations; `None` records an inactive uniform
    pub uniform_locations: HashMap<String, Option<UniformLocation>>,
    /// Meshes loaded for this program, by file name
    pub meshes: HashMap<String, MeshDrawDescriptor>,
}

impl ShaderProgram {
    pub(crate) fn new(handle: ProgramHandle) -> Self {
        Self {
            handle,
            uniform_locations: HashMap::new(),
            meshes: HashMap::new(),
        }
    }
}
