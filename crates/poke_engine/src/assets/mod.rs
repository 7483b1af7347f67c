//! Asset loading
//!
//! The render core never parses files itself during a frame; it asks an
//! [`AssetLoader`] for ready-to-upload data. [`FileAssetLoader`] reads the
//! on-disk layout described by [`AssetPaths`](crate::config::AssetPaths),
//! [`MemoryAssetLoader`] serves assets registered in code.

pub mod file_loader;
pub mod image_loader;
pub mod memory_loader;
pub mod obj_loader;

pub use file_loader::FileAssetLoader;
pub use image_loader::ImageData;
pub use memory_loader::MemoryAssetLoader;
pub use obj_loader::ObjLoader;

use crate::render::primitives::Vertex;
use crate::render::resources::GlyphMetrics;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Asset loading errors
#[derive(Error, Debug)]
pub enum AssetError {
    /// The file could not be read
    #[error("IO error reading '{path}': {source}")]
    Io {
        /// Path that failed
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The file was read but its contents are malformed
    #[error("Failed to parse '{name}': {reason}")]
    Parse {
        /// Asset name
        name: String,
        /// What went wrong
        reason: String,
    },

    /// No asset with that name exists
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// Image decoding failed
    #[error("Failed to load image: {0}")]
    LoadFailed(String),
}

/// One drawable part of a mesh file
#[derive(Debug, Clone, PartialEq)]
pub struct SubMeshData {
    /// Interleaved vertices
    pub vertices: Vec<Vertex>,
    /// Triangle list indices
    pub indices: Vec<u32>,
    /// Texture the file associates with this part
    pub texture_name: Option<String>,
}

/// Parsed mesh file
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshData {
    /// Sub-meshes in file order
    pub sub_meshes: Vec<SubMeshData>,
}

impl MeshData {
    /// Single sub-mesh mesh
    pub fn single(vertices: Vec<Vertex>, indices: Vec<u32>, texture_name: Option<String>) -> Self {
        Self {
            sub_meshes: vec![SubMeshData { vertices, indices, texture_name }],
        }
    }

    /// Reject meshes that would produce an undrawable descriptor
    pub fn validate(&self, name: &str) -> Result<(), AssetError> {
        if self.sub_meshes.is_empty() {
            return Err(AssetError::Parse {
                name: name.to_string(),
                reason: "mesh has no geometry".to_string(),
            });
        }

        for (i, sub) in self.sub_meshes.iter().enumerate() {
            if sub.indices.len() % 3 != 0 {
                return Err(AssetError::Parse {
                    name: name.to_string(),
                    reason: format!("sub-mesh {i} index count {} is not a triangle list", sub.indices.len()),
                });
            }
            if let Some(bad) = sub.indices.iter().find(|&&idx| idx as usize >= sub.vertices.len()) {
                return Err(AssetError::Parse {
                    name: name.to_string(),
                    reason: format!("sub-mesh {i} index {bad} out of range"),
                });
            }
        }

        Ok(())
    }
}

/// Glyph metrics file stored next to a font atlas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontMetrics {
    /// Pixel size the atlas was rendered at
    pub glyph_size: u32,
    /// Metrics per character
    pub characters: BTreeMap<char, GlyphMetrics>,
}

/// Font atlas bitmap plus its metrics
#[derive(Debug, Clone)]
pub struct FontSource {
    /// Atlas bitmap
    pub atlas: ImageData,
    /// Per-character metrics
    pub metrics: FontMetrics,
}

/// Source of ready-to-upload asset data
pub trait AssetLoader {
    /// Read a shader source file
    fn load_shader_source(&self, file: &str) -> Result<String, AssetError>;

    /// Read a mesh file
    fn load_mesh(&self, file: &str) -> Result<MeshData, AssetError>;

    /// Read an image as RGBA8
    fn load_image(&self, file: &str) -> Result<ImageData, AssetError>;

    /// Read a font atlas rendered at `glyph_size`
    fn load_font(&self, name: &str, glyph_size: u32) -> Result<FontSource, AssetError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_out_of_range_index() {
        let mesh = MeshData::single(vec![Vertex::new([0.0; 3], [0.0; 2])], vec![0, 0, 1], None);
        assert!(matches!(mesh.validate("bad.obj"), Err(AssetError::Parse { .. })));
    }

    #[test]
    fn test_validate_rejects_empty_mesh() {
        assert!(MeshData::default().validate("empty.obj").is_err());
    }
}
