//! # Configuration System
//!
//! Serializable engine settings: viewport, asset locations, program names,
//! per-mode draw settings, fog defaults and the frame budget. Any type that
//! implements [`Config`] can be loaded from or saved to TOML or RON.

pub use serde::{Deserialize, Serialize};

use crate::foundation::logging::LoggingConfig;
use crate::render::{PerMode, RenderMode};
use std::path::{Path, PathBuf};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        match extension(path) {
            Some("toml") => toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            Some("ron") => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match extension(path) {
            Some("toml") => toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?,
            Some("ron") => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
            _ => return Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A value failed validation
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Window-space size the UI resolves against
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportConfig {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self { width: 1200, height: 640 }
    }
}

/// On-disk asset layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetPaths {
    /// Base directory for all assets
    pub root: PathBuf,
    /// Shader source pairs, relative to `root`
    pub shaders: PathBuf,
    /// Mesh files
    pub models: PathBuf,
    /// Textures, sprite sheets and cubemap faces
    pub textures: PathBuf,
    /// Font atlases and glyph metrics
    pub fonts: PathBuf,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            root: PathBuf::from("assets"),
            shaders: PathBuf::from("shaders"),
            models: PathBuf::from("models"),
            textures: PathBuf::from("textures"),
            fonts: PathBuf::from("fonts"),
        }
    }
}

impl AssetPaths {
    /// Use a different asset root
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Full path of a shader file
    pub fn shader(&self, file: &str) -> PathBuf {
        self.root.join(&self.shaders).join(file)
    }

    /// Full path of a mesh file
    pub fn model(&self, file: &str) -> PathBuf {
        self.root.join(&self.models).join(file)
    }

    /// Full path of a texture file
    pub fn texture(&self, file: &str) -> PathBuf {
        self.root.join(&self.textures).join(file)
    }

    /// Full path of a font file
    pub fn font(&self, file: &str) -> PathBuf {
        self.root.join(&self.fonts).join(file)
    }
}

/// Names of the programs the draw pipeline binds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderNames {
    /// Default 3D scene program
    pub scene: String,
    /// Cubemap skybox program
    pub skybox: String,
    /// Textured UI quad program
    pub ui: String,
    /// Glyph quad program
    pub text: String,
}

impl ShaderNames {
    /// Vertex stage source file of a program
    pub fn vertex_file(program: &str) -> String {
        format!("{program}.vert")
    }

    /// Fragment stage source file of a program
    pub fn fragment_file(program: &str) -> String {
        format!("{program}.frag")
    }
}

impl Default for ShaderNames {
    fn default() -> Self {
        Self {
            scene: "scene".to_string(),
            skybox: "skybox".to_string(),
            ui: "ui".to_string(),
            text: "text".to_string(),
        }
    }
}

/// What a render mode draws
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeSettings {
    /// Program bound for the opaque scene pass
    pub scene_shader: String,
    /// Draw the skybox in this mode
    pub draw_skybox: bool,
    /// Draw particle spawners in this mode
    pub draw_particles: bool,
    /// Full-screen texture drawn after the UI, if any
    pub overlay_texture: Option<String>,
}

impl ModeSettings {
    fn world(scene_shader: &str) -> Self {
        Self {
            scene_shader: scene_shader.to_string(),
            draw_skybox: true,
            draw_particles: true,
            overlay_texture: None,
        }
    }
}

/// Default per-mode settings: the menu draws neither skybox nor particles
fn default_modes() -> PerMode<ModeSettings> {
    PerMode::new(
        ModeSettings::world("scene"),
        ModeSettings::world("scene"),
        ModeSettings {
            draw_skybox: false,
            draw_particles: false,
            ..ModeSettings::world("scene")
        },
    )
}

/// Fog parameters applied when no weather overrides them
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FogSettings {
    /// Exponential fog density
    pub density: f32,
    /// Fog falloff gradient
    pub gradient: f32,
    /// RGB fog colour
    pub color: [f32; 3],
}

impl Default for FogSettings {
    fn default() -> Self {
        Self {
            density: 0.0,
            gradient: 0.1,
            color: [0.89, 0.89, 0.89],
        }
    }
}

/// # Engine Configuration
///
/// Top-level configuration consumed by the render manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Logger setup
    pub logging: LoggingConfig,
    /// Initial viewport
    pub viewport: ViewportConfig,
    /// Asset layout on disk
    pub assets: AssetPaths,
    /// Program names used by the fixed passes
    pub shaders: ShaderNames,
    /// Per-mode draw settings
    pub modes: PerMode<ModeSettings>,
    /// Default fog
    pub fog: FogSettings,
    /// Frame budget in milliseconds; longer frames are logged
    pub frame_budget_ms: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            viewport: ViewportConfig::default(),
            assets: AssetPaths::default(),
            shaders: ShaderNames::default(),
            modes: default_modes(),
            fog: FogSettings::default(),
            frame_budget_ms: 16.6,
        }
    }
}

impl EngineConfig {
    /// Set the viewport size
    pub fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = ViewportConfig { width, height };
        self
    }

    /// Set the asset root
    pub fn with_asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.assets = self.assets.with_root(root);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "viewport must be non-zero, got {}x{}",
                self.viewport.width, self.viewport.height
            )));
        }

        let names = [
            &self.shaders.scene,
            &self.shaders.skybox,
            &self.shaders.ui,
            &self.shaders.text,
        ];
        let mode_programs = RenderMode::ALL.map(|mode| &self.modes.get(mode).scene_shader);
        if names.iter().chain(mode_programs.iter()).any(|name| name.is_empty()) {
            return Err(ConfigError::Invalid("program names cannot be empty".to_string()));
        }

        if !(self.frame_budget_ms.is_finite() && self.frame_budget_ms > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "frame budget must be positive, got {}",
                self.frame_budget_ms
            )));
        }

        Ok(())
    }
}

impl Config for EngineConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.viewport.height, 640);
        assert!(!config.modes.get(RenderMode::Menu).draw_skybox);
    }

    #[test]
    fn test_validation_rejects_zero_viewport() {
        let config = EngineConfig::default().with_viewport(0, 480);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_toml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");

        let mut config = EngineConfig::default().with_viewport(800, 600);
        config.modes.get_mut(RenderMode::Battle).overlay_texture = Some("BattleFrame.png".to_string());
        config.save_to_file(&path).unwrap();

        let loaded = EngineConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_ron_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.ron");
        std::fs::write(&path, "(frame_budget_ms: 33.0)").unwrap();

        let loaded = EngineConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.frame_budget_ms, 33.0);
        assert_eq!(loaded.shaders, ShaderNames::default());
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.ini");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(
            EngineConfig::load_from_file(&path),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }
}
