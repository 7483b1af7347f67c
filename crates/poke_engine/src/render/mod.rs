//! # Rendering System
//!
//! Frame composition for the overworld, battle and menu screens.
//!
//! ## Architecture
//!
//! - **Device**: the [`GraphicsDevice`] seam every GPU call goes through
//! - **Resources**: name-keyed cache of programs, meshes, textures, fonts
//! - **Environment**: weather state machine driving fog and weather particles
//! - **Manager**: [`RenderManager`], which owns all of the above and issues
//!   the fixed per-frame draw order

pub mod device;
pub mod environment;
pub mod lighting;
pub mod manager;
pub mod primitives;
pub mod resources;
pub mod stats;

pub use device::{
    BufferHandle, BufferUsage, DepthFunc, DeviceError, GraphicsDevice, ProgramHandle, RecordingDevice,
    TextureHandle, TextureTarget, UniformLocation, UniformValue, VertexArrayHandle,
};
pub use environment::{Environment, FogState, Weather, WeatherFamily};
pub use lighting::{FrameContext, Light};
pub use manager::{RenderManager, SpawnerHandle};
pub use primitives::{Vertex, VertexLayout};
pub use resources::{
    FontData, GlyphMetrics, MeshDrawDescriptor, ResourceCache, ResourceError, ResourceKind, ShaderProgram,
    SpriteSheet, SubMesh, Texture,
};
pub use stats::FrameStats;

use crate::assets::AssetError;
use crate::config::ConfigError;
use crate::ui::UiError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which rendering context is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RenderMode {
    /// Overworld map
    #[default]
    Map,
    /// Battle scene
    Battle,
    /// Menu screens
    Menu,
}

impl RenderMode {
    /// Every mode, in declaration order
    pub const ALL: [Self; 3] = [Self::Map, Self::Battle, Self::Menu];

    /// Human-readable name
    pub fn name(self) -> &'static str {
        match self {
            Self::Map => "Map",
            Self::Battle => "Battle",
            Self::Menu => "Menu",
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One value per render mode
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerMode<T> {
    map: T,
    battle: T,
    menu: T,
}

impl<T> PerMode<T> {
    /// Build from one value per mode
    pub fn new(map: T, battle: T, menu: T) -> Self {
        Self { map, battle, menu }
    }

    /// Value for a mode
    pub fn get(&self, mode: RenderMode) -> &T {
        match mode {
            RenderMode::Map => &self.map,
            RenderMode::Battle => &self.battle,
            RenderMode::Menu => &self.menu,
        }
    }

    /// Mutable value for a mode
    pub fn get_mut(&mut self, mode: RenderMode) -> &mut T {
        match mode {
            RenderMode::Map => &mut self.map,
            RenderMode::Battle => &mut self.battle,
            RenderMode::Menu => &mut self.menu,
        }
    }

    /// Iterate over all values with their mode
    pub fn iter(&self) -> impl Iterator<Item = (RenderMode, &T)> {
        RenderMode::ALL.into_iter().map(move |mode| (mode, self.get(mode)))
    }

    /// Iterate mutably over all values
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        [&mut self.map, &mut self.battle, &mut self.menu].into_iter()
    }
}

/// Top-level error for the render core
#[derive(Debug, Error)]
pub enum RenderError {
    /// A cache operation failed
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    /// The graphics device rejected a call
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// An asset could not be read
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    /// UI composition was rejected
    #[error("UI error: {0}")]
    Ui(#[from] UiError),

    /// Configuration was invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_mode_get_mut_targets_one_mode() {
        let mut values = PerMode::new(1, 2, 3);
        *values.get_mut(RenderMode::Battle) += 10;
        assert_eq!(*values.get(RenderMode::Map), 1);
        assert_eq!(*values.get(RenderMode::Battle), 12);
        assert_eq!(*values.get(RenderMode::Menu), 3);
    }

    #[test]
    fn test_render_mode_names() {
        assert_eq!(RenderMode::Map.to_string(), "Map");
        assert_eq!(RenderMode::ALL.map(RenderMode::name), ["Map", "Battle", "Menu"]);
    }
}
