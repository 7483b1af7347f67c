//! In-memory asset loader
//!
//! Serves assets registered in code. The demo uses it to run without an
//! asset directory; tests use its load counters to check that the cache
//! only reads each asset once.

use crate::assets::{AssetError, AssetLoader, FontSource, ImageData, MeshData};
use crate::config::ShaderNames;
use std::cell::Cell;
use std::collections::HashMap;

/// Loads assets from maps keyed by file name
#[derive(Debug, Default)]
pub struct MemoryAssetLoader {
    shaders: HashMap<String, String>,
    meshes: HashMap<String, MeshData>,
    images: HashMap<String, ImageData>,
    fonts: HashMap<(String, u32), FontSource>,
    loads: Cell<usize>,
}

impl MemoryAssetLoader {
    /// Create an empty loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shader source file
    pub fn with_shader(mut self, file: impl Into<String>, source: impl Into<String>) -> Self {
        self.insert_shader(file, source);
        self
    }

    /// Register both stages of a program with placeholder sources
    pub fn with_program(mut self, program: &str) -> Self {
        self.insert_program(program, &format!("// {program} vertex"), &format!("// {program} fragment"));
        self
    }

    /// Register a mesh file
    pub fn with_mesh(mut self, file: impl Into<String>, mesh: MeshData) -> Self {
        self.insert_mesh(file, mesh);
        self
    }

    /// Register an image file
    pub fn with_image(mut self, file: impl Into<String>, image: ImageData) -> Self {
        self.insert_image(file, image);
        self
    }

    /// Register a font at one glyph size
    pub fn with_font(mut self, name: impl Into<String>, font: FontSource) -> Self {
        self.insert_font(name, font);
        self
    }

    /// Register a shader source file
    pub fn insert_shader(&mut self, file: impl Into<String>, source: impl Into<String>) {
        self.shaders.insert(file.into(), source.into());
    }

    /// Register both stages of a program
    pub fn insert_program(&mut self, program: &str, vertex_src: &str, fragment_src: &str) {
        self.insert_shader(ShaderNames::vertex_file(program), vertex_src);
        self.insert_shader(ShaderNames::fragment_file(program), fragment_src);
    }

    /// Register a mesh file
    pub fn insert_mesh(&mut self, file: impl Into<String>, mesh: MeshData) {
        self.meshes.insert(file.into(), mesh);
    }

    /// Register an image file
    pub fn insert_image(&mut self, file: impl Into<String>, image: ImageData) {
        self.images.insert(file.into(), image);
    }

    /// Register a font; the size comes from its metrics
    pub fn insert_font(&mut self, name: impl Into<String>, font: FontSource) {
        self.fonts.insert((name.into(), font.metrics.glyph_size), font);
    }

    /// Successful loads served so far
    pub fn load_count(&self) -> usize {
        self.loads.get()
    }

    fn served<T: Clone>(&self, found: Option<&T>, name: &str) -> Result<T, AssetError> {
        let value = found.cloned().ok_or_else(|| AssetError::NotFound(name.to_string()))?;
        self.loads.set(self.loads.get() + 1);
        Ok(value)
    }
}

impl AssetLoader for MemoryAssetLoader {
    fn load_shader_source(&self, file: &str) -> Result<String, AssetError> {
        self.served(self.shaders.get(file), file)
    }

    fn load_mesh(&self, file: &str) -> Result<MeshData, AssetError> {
        let mesh = self.served(self.meshes.get(file), file)?;
        mesh.validate(file)?;
        Ok(mesh)
    }

    fn load_image(&self, file: &str) -> Result<ImageData, AssetError> {
        self.served(self.images.get(file), file)
    }

    fn load_font(&self, name: &str, glyph_size: u32) -> Result<FontSource, AssetError> {
        let key = (name.to_string(), glyph_size);
        self.served(self.fonts.get(&key), &format!("{name}_{glyph_size}"))
    }
}
