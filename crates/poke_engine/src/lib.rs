//! # Poke Engine
//!
//! Rendering and scene-composition core for an overworld/battle 3D game.
//!
//! ## Features
//!
//! - **Resource Cache**: name-keyed programs, meshes, textures, sprite sheets and fonts
//! - **Particles**: bounded particle pools mirrored into GPU buffers
//! - **UI**: percent-based widget trees with anchored layout and glyph text
//! - **Render Manager**: map/battle/menu modes, weather and the per-frame draw order
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use poke_engine::prelude::*;
//!
//! fn main() -> Result<(), RenderError> {
//!     let config = EngineConfig::default();
//!     init_logging(&config.logging);
//!
//!     let loader = FileAssetLoader::new(config.assets.clone());
//!     let mut renderer = RenderManager::new(Box::new(RecordingDevice::new()), &loader, config)?;
//!     renderer.load_mesh(&loader, "Grass.obj", "scene")?;
//!     renderer.create_instance(RenderMode::Map, RenderableInstance::new("Grass.obj", "scene"));
//!
//!     renderer.update(1.0 / 60.0, Vec3::zeros());
//!     let stats = renderer.draw_frame(&FrameContext::default());
//!     println!("{stats}");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::too_many_arguments,
    clippy::cast_precision_loss
)]

pub mod assets;
pub mod config;
pub mod foundation;
pub mod particles;
pub mod render;
pub mod scene;
pub mod ui;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        assets::{AssetLoader, FileAssetLoader, ImageData, MemoryAssetLoader, MeshData},
        config::{Config, EngineConfig},
        foundation::{
            logging::init_logging,
            math::{Mat4, Vec2, Vec3, Vec4},
            time::{FrameTimer, Stopwatch},
        },
        particles::{ParticleModel, ParticleSpawner, ParticleSpawnerConfig},
        render::{
            FrameContext, FrameStats, GraphicsDevice, Light, RecordingDevice, RenderError, RenderManager,
            RenderMode, SpawnerHandle, Weather,
        },
        scene::{InstanceHandle, InstanceMaterial, RenderableInstance},
        ui::{Anchor, TextContent, UiTree, WidgetBuilder, WidgetId},
    };
}
