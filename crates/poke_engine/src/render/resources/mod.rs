//! GPU resource cache
//!
//! Name-keyed storage for everything the draw passes look up by name:
//! programs (with their uniform locations and per-program meshes), textures,
//! sprite sheets, cubemaps and fonts.
//!
//! Loads are idempotent and never leave a partial entry behind, so a failed
//! load can be retried. Lookups return `Option`; a miss means the draw step
//! asking for it is skipped.

mod cache;
mod font;
mod mesh;
mod shader;
mod texture;

pub use cache::{ResourceCache, TEXTURE_SAMPLER_UNIFORM};
pub use font::{FontData, GlyphMetrics, UvRect, FONT_ATLAS_COLS, FONT_ATLAS_ROWS};
pub use mesh::{MeshDrawDescriptor, SubMesh};
pub use shader::ShaderProgram;
pub use texture::{SpriteSheet, Texture};

use crate::assets::AssetError;
use crate::render::device::DeviceError;
use std::fmt;
use thiserror::Error;

/// Kind of cached resource, used in error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Shader program
    Program,
    /// Mesh loaded for a program
    Mesh,
    /// 2D texture
    Texture,
    /// Sprite sheet
    SpriteSheet,
    /// Cubemap
    Cubemap,
    /// Font atlas
    Font,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Program => "program",
            Self::Mesh => "mesh",
            Self::Texture => "texture",
            Self::SpriteSheet => "sprite sheet",
            Self::Cubemap => "cubemap",
            Self::Font => "font",
        };
        f.write_str(name)
    }
}

/// Resource cache errors
#[derive(Debug, Error)]
pub enum ResourceError {
    /// A named resource the operation depends on is not cached
    #[error("{kind} '{name}' not found")]
    NotFound {
        /// What was looked up
        kind: ResourceKind,
        /// Name that missed
        name: String,
    },

    /// The asset was read but cannot become a GPU resource
    #[error("Failed to load '{name}': {reason}")]
    LoadFailed {
        /// Asset name
        name: String,
        /// What went wrong
        reason: String,
    },

    /// The device rejected an upload
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// The asset could not be read
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),
}

impl ResourceError {
    pub(crate) fn not_found(kind: ResourceKind, name: &str) -> Self {
        Self::NotFound {
            kind,
            name: name.to_string(),
        }
    }
}
