//! Asset loader backed by the on-disk asset layout

use crate::assets::{AssetError, AssetLoader, FontMetrics, FontSource, ImageData, MeshData, ObjLoader};
use crate::config::AssetPaths;
use std::path::Path;

/// Reads assets from the directories named by [`AssetPaths`]
#[derive(Debug, Clone)]
pub struct FileAssetLoader {
    paths: AssetPaths,
}

impl FileAssetLoader {
    /// Create a loader over an asset layout
    pub fn new(paths: AssetPaths) -> Self {
        Self { paths }
    }

    /// The layout this loader reads from
    pub fn paths(&self) -> &AssetPaths {
        &self.paths
    }

    fn read_to_string(path: &Path) -> Result<String, AssetError> {
        std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                AssetError::NotFound(path.display().to_string())
            } else {
                AssetError::Io {
                    path: path.display().to_string(),
                    source,
                }
            }
        })
    }
}

impl AssetLoader for FileAssetLoader {
    fn load_shader_source(&self, file: &str) -> Result<String, AssetError> {
        Self::read_to_string(&self.paths.shader(file))
    }

    fn load_mesh(&self, file: &str) -> Result<MeshData, AssetError> {
        let path = self.paths.model(file);
        let source = Self::read_to_string(&path)?;
        ObjLoader::parse(file, &source)
    }

    fn load_image(&self, file: &str) -> Result<ImageData, AssetError> {
        let path = self.paths.texture(file);
        if !path.exists() {
            return Err(AssetError::NotFound(path.display().to_string()));
        }
        ImageData::from_file(path)
    }

    fn load_font(&self, name: &str, glyph_size: u32) -> Result<FontSource, AssetError> {
        let stem = format!("{name}_{glyph_size}");
        let atlas_path = self.paths.font(&format!("{stem}.png"));
        if !atlas_path.exists() {
            return Err(AssetError::NotFound(atlas_path.display().to_string()));
        }
        let atlas = ImageData::from_file(&atlas_path)?;

        let metrics_file = format!("{stem}.ron");
        let metrics_text = Self::read_to_string(&self.paths.font(&metrics_file))?;
        let metrics: FontMetrics = ron::from_str(&metrics_text).map_err(|e| AssetError::Parse {
            name: metrics_file.clone(),
            reason: e.to_string(),
        })?;

        if metrics.glyph_size != glyph_size {
            return Err(AssetError::Parse {
                name: metrics_file,
                reason: format!("metrics are for size {}, expected {}", metrics.glyph_size, glyph_size),
            });
        }

        log::debug!("Read font {} ({} characters)", stem, metrics.characters.len());
        Ok(FontSource { atlas, metrics })
    }
}
